// Network-facing pipeline stages: catalog scrape and vocabulary downloads.
//
// Downloads are resumable: a work whose XML already exists on disk is
// skipped, so an interrupted run picks up where it stopped. One misbehaving
// work never kills a batch; its failure is logged and the loop moves on.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::perseus::catalog::{self, Work};
use crate::perseus::client::PerseusClient;
use crate::perseus::retry::{with_retry, Pacer};

/// What a catalog scrape produced.
pub struct CatalogSummary {
    pub works: usize,
    /// Distinct languages with their work counts, sorted by language.
    pub languages: Vec<(String, usize)>,
}

/// What a download run did.
#[derive(Debug, Default)]
pub struct FetchSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Scrape the collection page and write the catalog CSVs.
///
/// Writes the full catalog plus one slice per language found. An empty
/// collection page isn't an error; it just produces an empty catalog.
pub async fn scrape_catalog(
    config: &Config,
    client: &PerseusClient,
    pacer: &Pacer,
) -> Result<CatalogSummary> {
    println!("Fetching the collection page...");
    let html = with_retry(pacer, || client.fetch_catalog_page()).await?;

    let works = catalog::parse_collection(&html)?;
    if works.is_empty() {
        warn!("collection page yielded no works");
    }
    info!(works = works.len(), "parsed collection page");

    catalog::write_catalog(&works, &config.works_path())?;

    let mut languages = Vec::new();
    for language in catalog::languages(&works) {
        let slice: Vec<Work> = catalog::filter_language(&works, &language)
            .into_iter()
            .cloned()
            .collect();
        catalog::write_catalog(&slice, &config.language_works_path(&language))?;
        languages.push((language, slice.len()));
    }

    Ok(CatalogSummary {
        works: works.len(),
        languages,
    })
}

/// Download vocabulary lists for cataloged works.
///
/// `language` restricts the run to one catalog slice; `refresh` re-downloads
/// files that already exist instead of skipping them.
pub async fn fetch_frequencies(
    config: &Config,
    client: &PerseusClient,
    pacer: &Pacer,
    language: Option<&str>,
    refresh: bool,
) -> Result<FetchSummary> {
    config.require_catalog()?;
    let works = catalog::read_catalog(&config.works_path())?;

    let targets: Vec<&Work> = match language {
        Some(language) => catalog::filter_language(&works, language),
        // Works the scraper couldn't attribute a language to have no
        // directory to land in, so they are left out of full runs too.
        None => works.iter().filter(|w| !w.language.is_empty()).collect(),
    };

    if targets.is_empty() {
        println!("No cataloged works match; nothing to fetch.");
        return Ok(FetchSummary::default());
    }

    println!("Fetching {} vocabulary lists...", targets.len());
    let pb = ProgressBar::new(targets.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Vocab [{bar:30}] {pos}/{len} ({eta})")
            .expect("valid template"),
    );

    let mut summary = FetchSummary::default();
    for work in targets {
        let path = vocab_path(config, work);
        if path.exists() && !refresh {
            debug!(path = %path.display(), "vocabulary list already present, skipping");
            summary.skipped += 1;
            pb.inc(1);
            continue;
        }

        let language = work.language.to_lowercase();
        let fetched = with_retry(pacer, || {
            client.fetch_vocablist(&work.work_id, &language, config.filter_percent)
        })
        .await;

        match fetched {
            Ok(xml) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                fs::write(&path, xml)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                summary.downloaded += 1;
            }
            Err(e) => {
                warn!(
                    work_id = %work.work_id,
                    error = %e,
                    "Failed to fetch vocabulary list, skipping"
                );
                summary.failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(summary)
}

/// Where a work's vocabulary XML lives:
/// `frequencies/<language>/<author>/<author> - <title>.xml`.
pub fn vocab_path(config: &Config, work: &Work) -> PathBuf {
    let author = sanitize_component(&work.author);
    let title = sanitize_component(&work.title);
    config
        .frequencies_dir()
        .join(work.language.to_lowercase())
        .join(&author)
        .join(format!("{author} - {title}.xml"))
}

const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make a catalog string safe to use as a path component.
fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|ch| {
            if INVALID_FILENAME_CHARS.contains(&ch) {
                '_'
            } else {
                ch
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".into()
    } else {
        cleaned
    }
}
