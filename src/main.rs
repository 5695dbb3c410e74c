use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use hapax::config::Config;
use hapax::output::terminal;
use hapax::perseus::client::PerseusClient;
use hapax::perseus::retry::Pacer;
use hapax::pipeline::{fetch, run};
use hapax::prune;
use hapax::stage::Stage;
use hapax::table::clean::FrequencyMetric;
use hapax::table::ingest::Grouping;
use hapax::table::similarity::SimilarityMatrix;

/// Hapax: word-frequency pipelines for the Perseus digital library.
///
/// Scrapes the Greco-Roman collection catalog, downloads per-work vocabulary
/// lists, and distills them into merged frequency tables, percentage profiles,
/// and a cosine-similarity matrix between sources.
#[derive(Parser)]
#[command(name = "hapax", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the collection catalog into works.csv plus per-language splits
    Catalog,

    /// Download per-work vocabulary XML for cataloged works
    Fetch {
        /// Only fetch works in this language (e.g. latin, greek)
        #[arg(long)]
        language: Option<String>,

        /// Re-download works whose XML is already on disk
        #[arg(long)]
        refresh: bool,
    },

    /// Convert downloaded vocabulary XML into raw per-work CSVs
    Convert {
        /// Rebuild CSVs that already exist
        #[arg(long)]
        refresh: bool,
    },

    /// Clean raw CSVs: apply a stoplist, drop duplicates, keep one metric
    Clean {
        /// CSV whose first column lists headwords to drop
        #[arg(long)]
        stoplist: Option<PathBuf>,

        /// Frequency metric to keep: max, min, weighted, or keyterm (default: weighted)
        #[arg(long, default_value = "weighted")]
        metric: String,

        /// Rebuild cleaned files that already exist
        #[arg(long)]
        refresh: bool,
    },

    /// Merge cleaned CSVs into one dense word-by-source table
    Merge {
        /// Group columns by author instead of by individual work
        #[arg(long)]
        by_author: bool,

        /// Rebuild the merged table if it already exists
        #[arg(long)]
        refresh: bool,
    },

    /// Rescale the merged table so each source column sums to 100
    Normalize {
        /// Use the author-grouped table
        #[arg(long)]
        by_author: bool,

        /// Rebuild the normalized table if it already exists
        #[arg(long)]
        refresh: bool,
    },

    /// Split the normalized table into a numbered dictionary and a numeric matrix
    Dictionary {
        /// Use the author-grouped table
        #[arg(long)]
        by_author: bool,

        /// Rebuild the dictionary if it already exists
        #[arg(long)]
        refresh: bool,
    },

    /// Score cosine similarity between every pair of sources
    Similarity {
        /// Use the author-grouped table
        #[arg(long)]
        by_author: bool,

        /// Rebuild the matrix if it already exists
        #[arg(long)]
        refresh: bool,
    },

    /// Show the most similar source pairs from the scored matrix
    Report {
        /// How many pairs to show (default: 10)
        #[arg(long, default_value = "10")]
        top: usize,

        /// Use the author-grouped matrix
        #[arg(long)]
        by_author: bool,
    },

    /// Delete stub XML downloads, stage artifacts, and empty directories
    Prune {
        /// Delete XML files below the size threshold
        #[arg(long)]
        small_xml: bool,

        /// Size threshold in bytes for --small-xml (default: 10240)
        #[arg(long, default_value = "10240")]
        threshold: u64,

        /// Delete one stage's per-work artifacts: raw or cleaned
        #[arg(long)]
        stage: Option<String>,

        /// Remove directories left empty
        #[arg(long)]
        empty_dirs: bool,
    },

    /// Run the whole pipeline: catalog, fetch, prune, and every transform
    Run {
        /// Only fetch works in this language (e.g. latin, greek)
        #[arg(long)]
        language: Option<String>,

        /// CSV whose first column lists headwords to drop
        #[arg(long)]
        stoplist: Option<PathBuf>,

        /// Frequency metric to keep: max, min, weighted, or keyterm (default: weighted)
        #[arg(long, default_value = "weighted")]
        metric: String,

        /// Group analysis tables by author instead of by work
        #[arg(long)]
        by_author: bool,

        /// Rebuild artifacts that already exist
        #[arg(long)]
        refresh: bool,
    },

    /// Show pipeline status (catalog, downloads, analysis artifacts)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hapax=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Catalog => {
            let config = Config::load()?;
            let client = PerseusClient::new(&config.catalog_url, &config.vocab_url)?;
            let pacer = Pacer::new(config.request_delay_ms);

            let summary = fetch::scrape_catalog(&config, &client, &pacer).await?;

            println!("\n{}", format!("Cataloged {} works.", summary.works).bold());
            for (language, count) in &summary.languages {
                println!("  {language}: {count}");
            }
            println!("\nNext: run `hapax fetch` to download the vocabulary lists.");
        }

        Commands::Fetch { language, refresh } => {
            let config = Config::load()?;
            let client = PerseusClient::new(&config.catalog_url, &config.vocab_url)?;
            let pacer = Pacer::new(config.request_delay_ms);

            let summary =
                fetch::fetch_frequencies(&config, &client, &pacer, language.as_deref(), refresh)
                    .await?;

            println!("\n{}", "Downloads complete.".bold());
            println!(
                "  {} new, {} already present, {} failed",
                summary.downloaded, summary.skipped, summary.failed
            );
            if summary.failed > 0 {
                println!("{}", "  Rerun `hapax fetch` to retry the failures.".dimmed());
            }
        }

        Commands::Convert { refresh } => {
            let config = Config::load()?;
            let summary = run::convert(&config, refresh)?;
            println!(
                "Converted {} vocabulary lists ({} skipped, {} failed).",
                summary.converted, summary.skipped, summary.failed
            );
        }

        Commands::Clean {
            stoplist,
            metric,
            refresh,
        } => {
            let config = Config::load()?;
            let metric = FrequencyMetric::from_flag(&metric)?;
            let totals = run::clean(&config, stoplist.as_deref(), metric, refresh)?;

            println!("\n{}", "Cleaning complete.".bold());
            println!(
                "  {} files cleaned, {} skipped, {} failed",
                totals.files, totals.skipped, totals.failed
            );
            println!(
                "  {} rows in, {} stoplisted, {} duplicates, {} rows kept",
                totals.rows_in, totals.stopped, totals.duplicates, totals.rows_out
            );
        }

        Commands::Merge { by_author, refresh } => {
            let config = Config::load()?;
            if let Some(m) = run::merge(&config, grouping_of(by_author), refresh)? {
                println!("\n{}", "Merge complete.".bold());
                println!(
                    "  {} files into {} sources x {} words ({} duplicate headwords dropped)",
                    m.files, m.sources, m.rows, m.deduped
                );
                if m.unknown_dropped > 0 {
                    println!(
                        "  {} records dropped for unregistered sources",
                        m.unknown_dropped
                    );
                }
            }
        }

        Commands::Normalize { by_author, refresh } => {
            let config = Config::load()?;
            if let Some(n) = run::normalize(&config, grouping_of(by_author), refresh)? {
                println!(
                    "Normalized {} sources across {} words.",
                    n.sources, n.rows
                );
            }
        }

        Commands::Dictionary { by_author, refresh } => {
            let config = Config::load()?;
            if let Some(s) = run::dictionary(&config, grouping_of(by_author), refresh)? {
                println!("Numbered {} dictionary entries.", s.entries);
            }
        }

        Commands::Similarity { by_author, refresh } => {
            let config = Config::load()?;
            if let Some(s) = run::similarity(&config, grouping_of(by_author), refresh)? {
                println!("Scored a {} x {} similarity matrix.", s.sources, s.sources);
                println!("Run `hapax report` to see the closest pairs.");
            }
        }

        Commands::Report { top, by_author } => {
            let config = Config::load()?;
            let path = run::artifact_path(&config, grouping_of(by_author), Stage::Similarity);
            if !path.exists() {
                anyhow::bail!(
                    "No similarity matrix at {}\nRun `hapax similarity` first.",
                    path.display()
                );
            }
            let matrix = SimilarityMatrix::read_csv(&path)?;
            terminal::display_similarity_report(&matrix, top);
        }

        Commands::Prune {
            small_xml,
            threshold,
            stage,
            empty_dirs,
        } => {
            let config = Config::load()?;
            config.require_frequencies()?;
            let root = config.frequencies_dir();

            // With no selection flags, do the default housekeeping pass.
            let default_pass = !small_xml && stage.is_none() && !empty_dirs;

            if small_xml || default_pass {
                let deleted = prune::prune_small_xml(&root, threshold)?;
                println!("Deleted {} undersized XML files.", deleted.len());
            }
            if let Some(name) = stage {
                let stage = parse_stage(&name)?;
                let deleted = prune::prune_stage(&root, stage)?;
                println!("Deleted {} {} artifacts.", deleted.len(), stage);
            }
            if empty_dirs || default_pass {
                let deleted = prune::prune_empty_dirs(&root)?;
                println!("Removed {} empty directories.", deleted.len());
            }
        }

        Commands::Run {
            language,
            stoplist,
            metric,
            by_author,
            refresh,
        } => {
            let config = Config::load()?;
            let client = PerseusClient::new(&config.catalog_url, &config.vocab_url)?;
            let pacer = Pacer::new(config.request_delay_ms);

            let opts = run::RunOptions {
                language,
                stoplist,
                metric: FrequencyMetric::from_flag(&metric)?,
                grouping: grouping_of(by_author),
                refresh,
            };
            run::run_all(&config, &client, &pacer, &opts).await?;

            println!("\n{}", "Pipeline complete.".bold());
            println!("Run `hapax report` to see the most similar sources.");
        }

        Commands::Status => {
            let config = Config::load()?;
            hapax::status::show(&config)?;
        }
    }

    Ok(())
}

/// Work-level tables unless `--by-author` asked for the author rollup.
fn grouping_of(by_author: bool) -> Grouping {
    if by_author {
        Grouping::Author
    } else {
        Grouping::Work
    }
}

/// Parse the `--stage` value for prune.
fn parse_stage(value: &str) -> Result<Stage> {
    match value.to_lowercase().as_str() {
        "raw" => Ok(Stage::Raw),
        "cleaned" => Ok(Stage::Cleaned),
        other => anyhow::bail!("unknown stage {other:?} (expected raw or cleaned)"),
    }
}
