// The sparse-to-dense pivot.
//
// Per-work files are tall and sparse: each lists only the words that occur in
// that work. The wide table is the dense pivot of all of them, one row per
// word, one column per source, absent cells zero-filled. Repeated
// observations of the same word from the same source accumulate by summation,
// never by overwrite, so by-author grouping adds an author's works together
// instead of keeping whichever file happened to be read last.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::table::ingest::FrequencyRecord;

/// One row of the wide table.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub headword: String,
    pub definition: String,
    /// One value per source column, zero where the word never occurred.
    pub values: Vec<f64>,
}

/// Dense word-by-source table.
///
/// Columns are fixed at construction; records carrying a label that was never
/// registered are dropped and counted rather than silently widening the
/// table (see [`WideTable::unknown_dropped`]).
#[derive(Debug)]
pub struct WideTable {
    sources: Vec<String>,
    source_index: HashMap<String, usize>,
    rows: Vec<WideRow>,
    row_index: HashMap<(String, String), usize>,
    unknown_dropped: usize,
    unknown_labels: BTreeSet<String>,
}

impl WideTable {
    /// Create an empty table with the given source columns.
    ///
    /// Duplicate labels collapse into a single column (first position wins),
    /// which is what makes by-author grouping work: every file of an author
    /// registers the same label.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sources = Vec::new();
        let mut source_index = HashMap::new();
        for label in labels {
            let label = label.into();
            if !source_index.contains_key(&label) {
                source_index.insert(label.clone(), sources.len());
                sources.push(label);
            }
        }
        Self {
            sources,
            source_index,
            rows: Vec::new(),
            row_index: HashMap::new(),
            unknown_dropped: 0,
            unknown_labels: BTreeSet::new(),
        }
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn rows(&self) -> &[WideRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Records dropped because their source label had no column.
    pub fn unknown_dropped(&self) -> usize {
        self.unknown_dropped
    }

    /// The distinct unregistered labels seen so far.
    pub fn unknown_labels(&self) -> &BTreeSet<String> {
        &self.unknown_labels
    }

    /// Fold one record into the table.
    ///
    /// The row key is the (headword, definition) pair; two senses of the same
    /// word stay separate until [`dedup_by_headword`](Self::dedup_by_headword)
    /// runs.
    pub fn add(&mut self, record: FrequencyRecord) {
        let Some(&col) = self.source_index.get(&record.source) else {
            if self.unknown_labels.insert(record.source.clone()) {
                warn!(label = %record.source, "dropping records for unregistered source");
            }
            self.unknown_dropped += 1;
            return;
        };

        let key = (record.headword.clone(), record.definition.clone());
        let idx = match self.row_index.get(&key) {
            Some(&i) => i,
            None => {
                let i = self.rows.len();
                self.row_index.insert(key, i);
                self.rows.push(WideRow {
                    headword: record.headword,
                    definition: record.definition,
                    values: vec![0.0; self.sources.len()],
                });
                i
            }
        };
        self.rows[idx].values[col] += record.value;
    }

    pub fn extend<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = FrequencyRecord>,
    {
        for record in records {
            self.add(record);
        }
    }

    /// Collapse rows sharing a headword, keeping the first occurrence.
    ///
    /// Returns the number of rows removed. Row order is preserved.
    pub fn dedup_by_headword(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = BTreeSet::new();
        self.rows.retain(|row| seen.insert(row.headword.clone()));
        self.row_index = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| ((row.headword.clone(), row.definition.clone()), i))
            .collect();
        before - self.rows.len()
    }

    /// Write the table as `headword,shortDefinition,<source...>` CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        let mut header = vec!["headword".to_string(), "shortDefinition".to_string()];
        header.extend(self.sources.iter().cloned());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.headword.clone(), row.definition.clone()];
            record.extend(row.values.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Read a table previously written by [`write_csv`](Self::write_csv).
    pub fn read_csv(path: &Path) -> Result<Self> {
        let (sources, rows) = read_rows(path)?;
        let mut table = WideTable::new(sources);
        for row in rows {
            table
                .row_index
                .entry((row.headword.clone(), row.definition.clone()))
                .or_insert(table.rows.len());
            table.rows.push(row);
        }
        Ok(table)
    }
}

/// Parse a `headword,shortDefinition,<label...>` CSV into labels and rows.
///
/// Shared by the merged and normalized readers. The reader is strict: a row
/// whose field count disagrees with the header is an error naming the file
/// and line, not a row to guess at.
pub(crate) fn read_rows(path: &Path) -> Result<(Vec<String>, Vec<WideRow>)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?;
    let sources: Vec<String> = headers.iter().skip(2).map(str::to_string).collect();

    let mut rows = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let line = i + 2;
        let row = row.with_context(|| {
            format!("malformed CSV row in {} (line {line})", path.display())
        })?;
        let mut values = Vec::with_capacity(sources.len());
        for (j, cell) in row.iter().skip(2).enumerate() {
            let value: f64 = cell.trim().parse().with_context(|| {
                format!(
                    "non-numeric cell {:?} in {} (line {line}, column {})",
                    cell,
                    path.display(),
                    j + 3
                )
            })?;
            values.push(value);
        }
        rows.push(WideRow {
            headword: row.get(0).unwrap_or("").to_string(),
            definition: row.get(1).unwrap_or("").to_string(),
            values,
        });
    }
    Ok((sources, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(headword: &str, definition: &str, value: f64, source: &str) -> FrequencyRecord {
        FrequencyRecord {
            headword: headword.to_string(),
            definition: definition.to_string(),
            value,
            source: source.to_string(),
        }
    }

    // ── pivot shape ──

    #[test]
    fn test_shared_word_fills_both_columns() {
        let mut table = WideTable::new(["Vergil-Aeneid", "Ovid-Amores"]);
        table.add(rec("lupus", "wolf", 12.0, "Vergil-Aeneid"));
        table.add(rec("lupus", "wolf", 5.0, "Ovid-Amores"));
        table.add(rec("canis", "dog", 3.0, "Vergil-Aeneid"));

        assert_eq!(table.len(), 2);
        let lupus = &table.rows()[0];
        assert_eq!(lupus.headword, "lupus");
        assert_eq!(lupus.values, vec![12.0, 5.0]);
        // canis never occurs in the Amores, so its cell stays zero.
        let canis = &table.rows()[1];
        assert_eq!(canis.values, vec![3.0, 0.0]);
    }

    #[test]
    fn test_repeated_observations_sum_instead_of_overwrite() {
        let mut table = WideTable::new(["Ovid"]);
        table.add(rec("amor", "love", 10.0, "Ovid"));
        table.add(rec("amor", "love", 7.5, "Ovid"));

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].values, vec![17.5]);
    }

    #[test]
    fn test_column_sums_are_input_order_independent() {
        let records = [
            rec("lupus", "wolf", 5.0, "Vergil"),
            rec("canis", "dog", 2.0, "Ovid"),
            rec("lupus", "wolf", 3.0, "Vergil"),
            rec("amor", "love", 4.0, "Ovid"),
        ];

        let mut forward = WideTable::new(["Vergil", "Ovid"]);
        forward.extend(records.clone());
        let mut backward = WideTable::new(["Vergil", "Ovid"]);
        backward.extend(records.iter().rev().cloned());

        for (table, name) in [(&forward, "forward"), (&backward, "backward")] {
            for (j, label) in table.sources().iter().enumerate() {
                let column: f64 = table.rows().iter().map(|r| r.values[j]).sum();
                let expected: f64 = records
                    .iter()
                    .filter(|r| r.source == *label)
                    .map(|r| r.value)
                    .sum();
                assert_eq!(column, expected, "{name} column {label}");
            }
        }
    }

    #[test]
    fn test_duplicate_labels_collapse_to_one_column() {
        // Two files, same author label: grouping by author must not produce
        // two "Ovid" columns.
        let table = WideTable::new(["Ovid", "Ovid", "Vergil"]);
        assert_eq!(table.sources(), ["Ovid", "Vergil"]);
    }

    #[test]
    fn test_distinct_definitions_keep_separate_rows() {
        let mut table = WideTable::new(["a"]);
        table.add(rec("canis", "dog", 1.0, "a"));
        table.add(rec("canis", "a sea creature", 2.0, "a"));
        assert_eq!(table.len(), 2);
    }

    // ── unknown labels ──

    #[test]
    fn test_unknown_label_is_dropped_and_counted() {
        let mut table = WideTable::new(["Vergil-Aeneid"]);
        table.add(rec("lupus", "wolf", 12.0, "Vergil-Aeneid"));
        table.add(rec("lupus", "wolf", 99.0, "Nobody-Nothing"));
        table.add(rec("canis", "dog", 1.0, "Nobody-Nothing"));

        assert_eq!(table.unknown_dropped(), 2);
        assert!(table.unknown_labels().contains("Nobody-Nothing"));
        // The table itself is untouched by the dropped records.
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].values, vec![12.0]);
    }

    #[test]
    fn test_no_unknowns_reports_zero() {
        let mut table = WideTable::new(["a"]);
        table.add(rec("x", "", 1.0, "a"));
        assert_eq!(table.unknown_dropped(), 0);
        assert!(table.unknown_labels().is_empty());
    }

    // ── dedup ──

    #[test]
    fn test_dedup_keeps_first_headword_occurrence() {
        let mut table = WideTable::new(["a"]);
        table.add(rec("canis", "dog", 1.0, "a"));
        table.add(rec("lupus", "wolf", 5.0, "a"));
        table.add(rec("canis", "a sea creature", 2.0, "a"));

        let removed = table.dedup_by_headword();
        assert_eq!(removed, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].definition, "dog");
        assert_eq!(table.rows()[1].headword, "lupus");
    }

    #[test]
    fn test_dedup_on_unique_table_is_noop() {
        let mut table = WideTable::new(["a"]);
        table.add(rec("canis", "dog", 1.0, "a"));
        table.add(rec("lupus", "wolf", 5.0, "a"));
        assert_eq!(table.dedup_by_headword(), 0);
        assert_eq!(table.len(), 2);
    }

    // ── round trip ──

    #[test]
    fn test_write_then_read_preserves_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("works.csv");

        let mut table = WideTable::new(["Vergil-Aeneid", "Ovid-Amores"]);
        table.add(rec("lupus", "wolf", 12.5, "Vergil-Aeneid"));
        table.add(rec("canis", "dog", 3.0, "Ovid-Amores"));
        table.write_csv(&path).unwrap();

        let back = WideTable::read_csv(&path).unwrap();
        assert_eq!(back.sources(), table.sources());
        assert_eq!(back.len(), 2);
        assert_eq!(back.rows()[0].values, vec![12.5, 0.0]);
        assert_eq!(back.rows()[1].values, vec![0.0, 3.0]);
    }

    #[test]
    fn test_read_reports_file_and_line_for_bad_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("works.csv");
        std::fs::write(
            &path,
            "headword,shortDefinition,a,b\n\
             lupus,wolf,1.0,2.0\n\
             canis,dog,oops,4.0\n",
        )
        .unwrap();

        let err = WideTable::read_csv(&path).unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("line 3"), "got: {msg}");
        assert!(msg.contains("oops"), "got: {msg}");
    }

    #[test]
    fn test_read_rejects_rows_with_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("works.csv");
        std::fs::write(
            &path,
            "headword,shortDefinition,a,b\n\
             lupus,wolf,1.0,2.0\n\
             canis,dog,3.0\n",
        )
        .unwrap();

        let err = WideTable::read_csv(&path).unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("line 3"), "got: {msg}");
        assert!(msg.contains("works.csv"), "got: {msg}");
    }

    #[test]
    fn test_empty_table_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("works.csv");
        let table = WideTable::new(["a", "b"]);
        table.write_csv(&path).unwrap();

        let back = WideTable::read_csv(&path).unwrap();
        assert!(back.is_empty());
        assert_eq!(back.sources(), ["a", "b"]);
    }
}
