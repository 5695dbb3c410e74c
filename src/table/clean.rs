// Cleaning of raw per-work frequency CSVs.
//
// Raw files carry every metric column the vocabulary tool reports plus a lot
// of words nobody wants to compare on (particles, conjunctions, the rest of
// the stoplist). Cleaning cuts each file down to
// `headword,shortDefinition,<metric>`: stoplisted words are dropped, repeated
// headwords keep their first row, and all but the chosen metric column go.
// Metric values pass through verbatim; nothing numeric happens here.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Which frequency metric survives the column reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyMetric {
    Max,
    Min,
    /// Frequency weighted by how securely the word is attributed (default).
    #[default]
    Weighted,
    KeyTerm,
}

impl FrequencyMetric {
    /// The raw-CSV column this metric lives in.
    pub fn column_name(&self) -> &'static str {
        match self {
            FrequencyMetric::Max => "maxFrequency",
            FrequencyMetric::Min => "minFrequency",
            FrequencyMetric::Weighted => "weightedFrequency",
            FrequencyMetric::KeyTerm => "keyTermScore",
        }
    }

    /// Parse a CLI flag value.
    pub fn from_flag(value: &str) -> Result<Self> {
        match value {
            "max" => Ok(FrequencyMetric::Max),
            "min" => Ok(FrequencyMetric::Min),
            "weighted" => Ok(FrequencyMetric::Weighted),
            "keyterm" => Ok(FrequencyMetric::KeyTerm),
            other => bail!(
                "unknown metric {other:?} (expected one of: max, min, weighted, keyterm)"
            ),
        }
    }
}

impl std::fmt::Display for FrequencyMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FrequencyMetric::Max => "max",
            FrequencyMetric::Min => "min",
            FrequencyMetric::Weighted => "weighted",
            FrequencyMetric::KeyTerm => "keyterm",
        };
        write!(f, "{name}")
    }
}

/// What one cleaning pass did to one file.
#[derive(Debug, Default, Clone, Copy)]
pub struct CleanSummary {
    pub rows_in: usize,
    pub stopped: usize,
    pub duplicates: usize,
    pub rows_out: usize,
}

/// Load a stoplist: one word per line, first CSV field if there are several.
///
/// Blank lines are skipped. Matching is exact, so the list must use the same
/// lemma forms the vocabulary tool emits.
pub fn load_stoplist(path: &Path) -> Result<HashSet<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open stoplist {}", path.display()))?;

    let mut words = HashSet::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("malformed stoplist {}", path.display()))?;
        if let Some(word) = row.get(0) {
            let word = word.trim();
            if !word.is_empty() {
                words.insert(word.to_string());
            }
        }
    }
    Ok(words)
}

/// Clean one raw CSV into `cleaned`, keeping only `metric`'s column.
pub fn clean_file(
    raw: &Path,
    cleaned: &Path,
    stoplist: &HashSet<String>,
    metric: FrequencyMetric,
) -> Result<CleanSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(raw)
        .with_context(|| format!("failed to open {}", raw.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header of {}", raw.display()))?
        .clone();
    let headword_col = find_column(&headers, "headword", raw)?;
    let definition_col = find_column(&headers, "shortDefinition", raw)?;
    let metric_col = find_column(&headers, metric.column_name(), raw)?;

    if let Some(parent) = cleaned.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(cleaned)
        .with_context(|| format!("failed to create {}", cleaned.display()))?;
    writer.write_record(["headword", "shortDefinition", metric.column_name()])?;

    let mut summary = CleanSummary::default();
    let mut seen = HashSet::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.with_context(|| {
            format!("malformed CSV row in {} (line {})", raw.display(), i + 2)
        })?;
        summary.rows_in += 1;

        let headword = row.get(headword_col).unwrap_or("").trim();
        if headword.is_empty() {
            continue;
        }
        if stoplist.contains(headword) {
            summary.stopped += 1;
            continue;
        }
        if !seen.insert(headword.to_string()) {
            summary.duplicates += 1;
            continue;
        }

        writer.write_record([
            headword,
            row.get(definition_col).unwrap_or("").trim(),
            row.get(metric_col).unwrap_or("").trim(),
        ])?;
        summary.rows_out += 1;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", cleaned.display()))?;
    Ok(summary)
}

fn find_column(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .with_context(|| format!("column {name:?} not found in {}", path.display()))
}
