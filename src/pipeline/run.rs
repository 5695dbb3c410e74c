// On-disk transform stages: XML conversion through the similarity matrix.
//
// Every stage reads the previous stage's artifact from disk and writes its
// own, so each can be rerun independently and a finished artifact is a
// checkpoint. Stages that find their output already present return `None`
// instead of rebuilding; `refresh` forces the rebuild.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::perseus::catalog::read_catalog;
use crate::perseus::client::PerseusClient;
use crate::perseus::retry::Pacer;
use crate::perseus::vocab;
use crate::pipeline::fetch::{self, FetchSummary};
use crate::prune;
use crate::stage::Stage;
use crate::table::clean::{clean_file, load_stoplist, FrequencyMetric};
use crate::table::dictionary::{split_identifiers, NumericTable};
use crate::table::ingest::{discover_cleaned, read_cleaned, Grouping};
use crate::table::normalize::NormalizedTable;
use crate::table::similarity::SimilarityMatrix;
use crate::table::wide::WideTable;

/// Where a grouping's artifact for `stage` lives under the analysis dir.
pub fn artifact_path(config: &Config, grouping: Grouping, stage: Stage) -> PathBuf {
    let base = config
        .analysis_dir()
        .join(format!("{}.csv", grouping.table_name()));
    stage.artifact_path(&base)
}

#[derive(Debug, Default)]
pub struct ConvertSummary {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Convert every downloaded vocabulary XML into a raw per-work CSV.
///
/// A work whose CSV already exists is skipped unless `refresh`; a work whose
/// XML won't parse is logged and counted, not fatal.
pub fn convert(config: &Config, refresh: bool) -> Result<ConvertSummary> {
    config.require_frequencies()?;
    let files = files_with_extension(&config.frequencies_dir(), "xml")?;

    if files.is_empty() {
        println!("No vocabulary XML found; nothing to convert.");
        return Ok(ConvertSummary::default());
    }

    println!("Converting {} vocabulary lists to CSV...", files.len());
    let pb = progress_bar("Convert", files.len());

    let mut summary = ConvertSummary::default();
    for xml_path in files {
        let csv_path = Stage::Raw.artifact_path(&xml_path);
        if csv_path.exists() && !refresh {
            summary.skipped += 1;
            pb.inc(1);
            continue;
        }

        let outcome = fs::read_to_string(&xml_path)
            .with_context(|| format!("failed to read {}", xml_path.display()))
            .and_then(|xml| vocab::parse_vocablist(&xml))
            .and_then(|entries| vocab::write_raw_csv(&entries, &csv_path));

        match outcome {
            Ok(()) => summary.converted += 1,
            Err(e) => {
                warn!(path = %xml_path.display(), error = %e, "Failed to convert, skipping");
                summary.failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(summary)
}

#[derive(Debug, Default)]
pub struct CleanTotals {
    pub files: usize,
    pub skipped: usize,
    pub failed: usize,
    pub rows_in: usize,
    pub stopped: usize,
    pub duplicates: usize,
    pub rows_out: usize,
}

/// Clean every raw per-work CSV under the frequencies tree.
///
/// With no stoplist, cleaning still deduplicates and reduces columns.
pub fn clean(
    config: &Config,
    stoplist: Option<&Path>,
    metric: FrequencyMetric,
    refresh: bool,
) -> Result<CleanTotals> {
    config.require_frequencies()?;

    let stop_words = match stoplist {
        Some(path) => load_stoplist(path)?,
        None => Default::default(),
    };
    info!(words = stop_words.len(), metric = %metric, "cleaning with stoplist");

    let files = stage_files(&config.frequencies_dir(), Stage::Raw)?;
    if files.is_empty() {
        println!("No raw CSVs found; nothing to clean.");
        return Ok(CleanTotals::default());
    }

    println!("Cleaning {} raw CSVs ({} metric)...", files.len(), metric);
    let pb = progress_bar("Clean", files.len());

    let mut totals = CleanTotals::default();
    for raw in files {
        let cleaned = Stage::Cleaned.artifact_path(&raw);
        if cleaned.exists() && !refresh {
            totals.skipped += 1;
            pb.inc(1);
            continue;
        }

        match clean_file(&raw, &cleaned, &stop_words, metric) {
            Ok(summary) => {
                totals.files += 1;
                totals.rows_in += summary.rows_in;
                totals.stopped += summary.stopped;
                totals.duplicates += summary.duplicates;
                totals.rows_out += summary.rows_out;
            }
            Err(e) => {
                warn!(path = %raw.display(), error = %e, "Failed to clean, skipping");
                totals.failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(totals)
}

#[derive(Debug)]
pub struct MergeSummary {
    pub files: usize,
    pub sources: usize,
    pub rows: usize,
    pub deduped: usize,
    pub unknown_dropped: usize,
}

/// Pivot all cleaned files into the dense merged table for `grouping`.
///
/// Returns `None` without writing when there is nothing to do: the merged
/// table already exists and `refresh` is off, or no cleaned files were found.
pub fn merge(config: &Config, grouping: Grouping, refresh: bool) -> Result<Option<MergeSummary>> {
    config.require_frequencies()?;

    let out = artifact_path(config, grouping, Stage::Merged);
    if out.exists() && !refresh {
        println!(
            "Merged table already present at {} (use --refresh to rebuild).",
            out.display()
        );
        return Ok(None);
    }

    let files = discover_cleaned(&config.frequencies_dir())?;
    if files.is_empty() {
        println!("No cleaned CSVs found; nothing to merge.");
        return Ok(None);
    }

    let labels: Vec<String> = files
        .iter()
        .map(|path| grouping.label_for(&file_name_of(path)))
        .collect();

    let mut table = WideTable::new(labels);
    for path in &files {
        let label = grouping.label_for(&file_name_of(path));
        table.extend(read_cleaned(path, &label)?);
    }

    let deduped = table.dedup_by_headword();
    if table.unknown_dropped() > 0 {
        warn!(
            dropped = table.unknown_dropped(),
            labels = ?table.unknown_labels(),
            "records dropped for unregistered sources"
        );
    }

    table.write_csv(&out)?;
    info!(path = %out.display(), rows = table.len(), "wrote merged table");

    Ok(Some(MergeSummary {
        files: files.len(),
        sources: table.sources().len(),
        rows: table.len(),
        deduped,
        unknown_dropped: table.unknown_dropped(),
    }))
}

#[derive(Debug)]
pub struct NormalizeSummary {
    pub sources: usize,
    pub rows: usize,
}

/// Rescale the merged table to percentages.
pub fn normalize(
    config: &Config,
    grouping: Grouping,
    refresh: bool,
) -> Result<Option<NormalizeSummary>> {
    let merged_path = artifact_path(config, grouping, Stage::Merged);
    if !merged_path.exists() {
        bail!(
            "No merged table at {}\nRun `hapax merge` first.",
            merged_path.display()
        );
    }

    let out = artifact_path(config, grouping, Stage::Normalized);
    if out.exists() && !refresh {
        println!(
            "Normalized table already present at {} (use --refresh to rebuild).",
            out.display()
        );
        return Ok(None);
    }

    let wide = WideTable::read_csv(&merged_path)?;
    let normalized = NormalizedTable::from_wide(&wide);
    normalized.write_csv(&out)?;
    info!(path = %out.display(), "wrote normalized table");

    Ok(Some(NormalizeSummary {
        sources: normalized.sources().len(),
        rows: normalized.len(),
    }))
}

#[derive(Debug)]
pub struct SplitSummary {
    pub entries: usize,
}

/// Split the normalized table into the numbered dictionary and the numeric
/// matrix.
pub fn dictionary(
    config: &Config,
    grouping: Grouping,
    refresh: bool,
) -> Result<Option<SplitSummary>> {
    let normalized_path = artifact_path(config, grouping, Stage::Normalized);
    if !normalized_path.exists() {
        bail!(
            "No normalized table at {}\nRun `hapax normalize` first.",
            normalized_path.display()
        );
    }

    let dict_path = artifact_path(config, grouping, Stage::Dictionary);
    let numeric_path = artifact_path(config, grouping, Stage::Numeric);
    if dict_path.exists() && numeric_path.exists() && !refresh {
        println!(
            "Dictionary already present at {} (use --refresh to rebuild).",
            dict_path.display()
        );
        return Ok(None);
    }

    let normalized = NormalizedTable::read_csv(&normalized_path)?;
    let (dict, numeric) = split_identifiers(&normalized);
    dict.write_csv(&dict_path)?;
    numeric.write_csv(&numeric_path)?;
    info!(entries = dict.len(), "wrote dictionary and numeric table");

    Ok(Some(SplitSummary {
        entries: dict.len(),
    }))
}

#[derive(Debug)]
pub struct SimilaritySummary {
    pub sources: usize,
}

/// Score the numeric table into the similarity matrix.
pub fn similarity(
    config: &Config,
    grouping: Grouping,
    refresh: bool,
) -> Result<Option<SimilaritySummary>> {
    let numeric_path = artifact_path(config, grouping, Stage::Numeric);
    if !numeric_path.exists() {
        bail!(
            "No numeric table at {}\nRun `hapax dictionary` first.",
            numeric_path.display()
        );
    }

    let out = artifact_path(config, grouping, Stage::Similarity);
    if out.exists() && !refresh {
        println!(
            "Similarity matrix already present at {} (use --refresh to rebuild).",
            out.display()
        );
        return Ok(None);
    }

    let numeric = NumericTable::read_csv(&numeric_path)?;
    let matrix = SimilarityMatrix::from_numeric(&numeric);
    matrix.write_csv(&out)?;
    info!(path = %out.display(), sources = matrix.len(), "wrote similarity matrix");

    Ok(Some(SimilaritySummary {
        sources: matrix.len(),
    }))
}

/// Options for the end-to-end run.
pub struct RunOptions {
    pub language: Option<String>,
    pub stoplist: Option<PathBuf>,
    pub metric: FrequencyMetric,
    pub grouping: Grouping,
    pub refresh: bool,
}

/// Run the whole pipeline: catalog, downloads, housekeeping, and every
/// transform stage through the similarity matrix.
pub async fn run_all(
    config: &Config,
    client: &PerseusClient,
    pacer: &Pacer,
    opts: &RunOptions,
) -> Result<()> {
    // Catalog, unless one is already on disk.
    if config.works_path().exists() && !opts.refresh {
        let works = read_catalog(&config.works_path())?;
        println!("Catalog present ({} works).", works.len());
    } else {
        let summary = fetch::scrape_catalog(config, client, pacer).await?;
        println!("Cataloged {} works.", summary.works);
    }

    let FetchSummary {
        downloaded,
        skipped,
        failed,
    } = fetch::fetch_frequencies(config, client, pacer, opts.language.as_deref(), opts.refresh)
        .await?;
    println!("Downloads: {downloaded} new, {skipped} already present, {failed} failed.");

    // Stub responses and the directories they empty out.
    let small = prune::prune_small_xml(&config.frequencies_dir(), prune::SMALL_XML_THRESHOLD)?;
    let dirs = prune::prune_empty_dirs(&config.frequencies_dir())?;
    println!("Pruned {} stub XMLs, {} empty directories.", small.len(), dirs.len());

    let converted = convert(config, opts.refresh)?;
    println!(
        "Converted {} ({} skipped, {} failed).",
        converted.converted, converted.skipped, converted.failed
    );

    let cleaned = clean(config, opts.stoplist.as_deref(), opts.metric, opts.refresh)?;
    println!(
        "Cleaned {} files: {} rows kept, {} stoplisted, {} duplicates.",
        cleaned.files, cleaned.rows_out, cleaned.stopped, cleaned.duplicates
    );

    if let Some(m) = merge(config, opts.grouping, opts.refresh)? {
        println!(
            "Merged {} files into {} sources x {} words.",
            m.files, m.sources, m.rows
        );
    }
    if !artifact_path(config, opts.grouping, Stage::Merged).exists() {
        println!("No merged table produced; stopping before analysis stages.");
        return Ok(());
    }
    if let Some(n) = normalize(config, opts.grouping, opts.refresh)? {
        println!("Normalized {} sources.", n.sources);
    }
    if let Some(s) = dictionary(config, opts.grouping, opts.refresh)? {
        println!("Numbered {} dictionary entries.", s.entries);
    }
    if let Some(s) = similarity(config, opts.grouping, opts.refresh)? {
        println!("Scored {} x {} similarity matrix.", s.sources, s.sources);
    }

    Ok(())
}

fn progress_bar(label: &str, len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!("  {label} [{{bar:30}}] {{pos}}/{{len}} ({{eta}})"))
            .expect("valid template"),
    );
    pb
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// All files under `root` with the given extension, in stable sorted order.
fn files_with_extension(root: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some(ext)
        {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// All artifacts of `stage` under `root`, in stable sorted order.
fn stage_files(root: &Path, stage: Stage) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if stage.matches(&entry.file_name().to_string_lossy()) {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}
