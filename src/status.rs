// Pipeline status display: catalog counts, download totals, analysis artifacts.

use std::collections::BTreeMap;

use anyhow::Result;
use walkdir::WalkDir;

use crate::config::Config;
use crate::perseus::catalog::read_catalog;
use crate::stage::Stage;
use crate::table::ingest::Grouping;

/// Display pipeline status to the terminal.
pub fn show(config: &Config) -> Result<()> {
    println!("Data directory: {}", config.data_dir.display());

    let works_path = config.works_path();
    if !works_path.exists() {
        println!("Catalog: not scraped yet");
        println!("\nRun `hapax catalog` to scrape the collection.");
        return Ok(());
    }

    let works = read_catalog(&works_path)?;
    let mut by_language: BTreeMap<String, usize> = BTreeMap::new();
    for work in &works {
        if !work.language.is_empty() {
            *by_language.entry(work.language.to_lowercase()).or_default() += 1;
        }
    }
    let breakdown: Vec<String> = by_language
        .iter()
        .map(|(lang, n)| format!("{lang}: {n}"))
        .collect();
    println!("Catalog: {} works ({})", works.len(), breakdown.join(", "));

    // Downloaded and converted files under the frequencies tree.
    let freq_dir = config.frequencies_dir();
    if !freq_dir.exists() {
        println!("Frequencies: none downloaded yet");
        println!("  Run `hapax fetch` to download vocabulary lists");
    } else {
        let mut xml = 0usize;
        let mut raw = 0usize;
        let mut cleaned = 0usize;
        for entry in WalkDir::new(&freq_dir) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if entry.path().extension().and_then(|e| e.to_str()) == Some("xml") {
                xml += 1;
            } else if Stage::Cleaned.matches(&name) {
                cleaned += 1;
            } else if Stage::Raw.matches(&name) {
                raw += 1;
            }
        }
        println!("Frequencies: {xml} XML, {raw} raw CSV, {cleaned} cleaned CSV");
    }

    // Analysis artifacts, per grouping and stage.
    let mut artifacts = Vec::new();
    for grouping in [Grouping::Work, Grouping::Author] {
        for stage in [
            Stage::Merged,
            Stage::Normalized,
            Stage::Dictionary,
            Stage::Numeric,
            Stage::Similarity,
        ] {
            let path = crate::pipeline::run::artifact_path(config, grouping, stage);
            if let Ok(meta) = std::fs::metadata(&path) {
                artifacts.push((path, meta.len()));
            }
        }
    }
    if artifacts.is_empty() {
        println!("Analysis: no artifacts yet");
        println!("  Run `hapax merge` to build the merged table");
    } else {
        println!("Analysis: {} artifacts", artifacts.len());
        for (path, size) in &artifacts {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!("  {} ({})", name, format_bytes(*size));
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
