// Ingestion of cleaned per-work frequency CSVs.
//
// Each cleaned file contributes one source column to the wide table. The
// source label is derived from the file name, which follows the download
// layout convention `<author> - <title> - cleaned.csv`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::stage::Stage;

/// One row of a cleaned per-work CSV, tagged with the source it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyRecord {
    pub headword: String,
    pub definition: String,
    pub value: f64,
    pub source: String,
}

/// How cleaned files map onto wide-table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One column per work (`Author-Title`).
    Work,
    /// One column per author; all of an author's works sum into it.
    Author,
}

impl Grouping {
    /// Base name of the analysis artifacts produced under this grouping.
    pub fn table_name(&self) -> &'static str {
        match self {
            Grouping::Work => "works",
            Grouping::Author => "authors",
        }
    }

    /// Derive the column label for a cleaned file name.
    ///
    /// File stems look like `Vergil - Aeneid - cleaned`; the work label joins
    /// the first two ` - ` segments with a hyphen (`Vergil-Aeneid`), the
    /// author label is just the first. A stem with no separator is used
    /// whole, so ad-hoc files still land in a column.
    pub fn label_for(&self, file_name: &str) -> String {
        let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
        let parts: Vec<&str> = stem.split(" - ").collect();
        match self {
            Grouping::Work if parts.len() >= 2 => format!("{}-{}", parts[0], parts[1]),
            Grouping::Author if parts.len() >= 2 => parts[0].to_string(),
            _ => stem.to_string(),
        }
    }
}

impl std::fmt::Display for Grouping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grouping::Work => write!(f, "by work"),
            Grouping::Author => write!(f, "by author"),
        }
    }
}

/// Find every cleaned CSV under `root`, in stable sorted order.
///
/// Sorted traversal keeps column order deterministic across runs, which in
/// turn keeps the similarity matrix comparable between reruns.
pub fn discover_cleaned(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if Stage::Cleaned.matches(&name) {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Read one cleaned CSV into records labeled with `source`.
///
/// Cleaned files carry `headword,shortDefinition,<metric>` columns; rows are
/// read positionally so the metric column's name doesn't matter here. A file
/// with only a header row yields no records, which is fine: empty works
/// simply contribute an all-zero column. A row missing its value field is a
/// format error, not a zero.
pub fn read_cleaned(path: &Path, source: &str) -> Result<Vec<FrequencyRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        // Header is line 1, so data row i sits on line i + 2.
        let line = i + 2;
        let row = row.with_context(|| {
            format!("malformed CSV row in {} (line {line})", path.display())
        })?;
        let headword = row.get(0).unwrap_or("").trim();
        if headword.is_empty() {
            continue;
        }
        let raw_value = row
            .get(2)
            .with_context(|| {
                format!(
                    "row with fewer than 3 fields in {} (line {line})",
                    path.display()
                )
            })?
            .trim();
        let value: f64 = if raw_value.is_empty() {
            0.0
        } else {
            raw_value.parse().with_context(|| {
                format!(
                    "non-numeric frequency {:?} in {} (line {line})",
                    raw_value,
                    path.display()
                )
            })?
        };
        records.push(FrequencyRecord {
            headword: headword.to_string(),
            definition: row.get(1).unwrap_or("").trim().to_string(),
            value,
            source: source.to_string(),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_work_label_joins_author_and_title() {
        let label = Grouping::Work.label_for("Vergil - Aeneid - cleaned.csv");
        assert_eq!(label, "Vergil-Aeneid");
    }

    #[test]
    fn test_author_label_takes_first_segment() {
        let label = Grouping::Author.label_for("Ovid - Amores - cleaned.csv");
        assert_eq!(label, "Ovid");
    }

    #[test]
    fn test_label_for_unseparated_name_is_whole_stem() {
        assert_eq!(Grouping::Work.label_for("scratch.csv"), "scratch");
        assert_eq!(Grouping::Author.label_for("scratch.csv"), "scratch");
    }

    #[test]
    fn test_read_cleaned_parses_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Vergil - Aeneid - cleaned.csv");
        fs::write(
            &path,
            "headword,shortDefinition,weightedFrequency\n\
             lupus,wolf,12.5\n\
             canis,dog,3\n",
        )
        .unwrap();

        let records = read_cleaned(&path, "Vergil-Aeneid").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].headword, "lupus");
        assert_eq!(records[0].definition, "wolf");
        assert_eq!(records[0].value, 12.5);
        assert_eq!(records[0].source, "Vergil-Aeneid");
    }

    #[test]
    fn test_read_cleaned_header_only_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty - cleaned.csv");
        fs::write(&path, "headword,shortDefinition,weightedFrequency\n").unwrap();

        let records = read_cleaned(&path, "empty").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_read_cleaned_reports_file_and_line_for_bad_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad - cleaned.csv");
        fs::write(
            &path,
            "headword,shortDefinition,weightedFrequency\n\
             lupus,wolf,12.5\n\
             canis,dog,not-a-number\n",
        )
        .unwrap();

        let err = read_cleaned(&path, "bad").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("not-a-number"), "got: {msg}");
        assert!(msg.contains("line 3"), "got: {msg}");
    }

    #[test]
    fn test_read_cleaned_rejects_rows_missing_the_value_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short - cleaned.csv");
        fs::write(
            &path,
            "headword,shortDefinition,weightedFrequency\n\
             lupus,wolf\n",
        )
        .unwrap();

        let err = read_cleaned(&path, "short").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("fewer than 3 fields"), "got: {msg}");
        assert!(msg.contains("line 2"), "got: {msg}");
    }

    #[test]
    fn test_read_cleaned_blank_value_counts_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse - cleaned.csv");
        fs::write(
            &path,
            "headword,shortDefinition,weightedFrequency\n\
             lupus,wolf,\n",
        )
        .unwrap();

        let records = read_cleaned(&path, "sparse").unwrap();
        assert_eq!(records[0].value, 0.0);
    }

    #[test]
    fn test_discover_cleaned_skips_other_stages() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("latin").join("Vergil");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("Vergil - Aeneid.csv"), "a").unwrap();
        fs::write(nested.join("Vergil - Aeneid - cleaned.csv"), "a").unwrap();
        fs::write(nested.join("Vergil - Aeneid.xml"), "a").unwrap();

        let found = discover_cleaned(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("latin/Vergil/Vergil - Aeneid - cleaned.csv"));
    }
}
