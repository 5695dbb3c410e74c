// Splitting identifiers away from the numeric matrix.
//
// Similarity scoring wants a purely numeric table, but the headwords can't
// just be thrown away. The split produces two aligned artifacts: a dictionary
// mapping each row to a sequential number, and the numeric remainder whose
// row N corresponds to dictionary entry N + 1.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::table::normalize::NormalizedTable;

/// One numbered dictionary entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DictEntry {
    pub headword: String,
    pub definition: String,
    /// 1-based row number in the numeric table.
    pub number: usize,
}

/// Identifier half of the split: headwords numbered in row order.
#[derive(Debug)]
pub struct Dictionary {
    entries: Vec<DictEntry>,
}

/// Numeric half of the split: the normalized values with identifiers gone.
#[derive(Debug)]
pub struct NumericTable {
    sources: Vec<String>,
    rows: Vec<Vec<f64>>,
}

/// Split a normalized table into its dictionary and numeric halves.
pub fn split_identifiers(table: &NormalizedTable) -> (Dictionary, NumericTable) {
    let entries = table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| DictEntry {
            headword: row.headword.clone(),
            definition: row.definition.clone(),
            number: i + 1,
        })
        .collect();

    let numeric = NumericTable {
        sources: table.sources().to_vec(),
        rows: table.rows().iter().map(|row| row.values.clone()).collect(),
    };

    (Dictionary { entries }, numeric)
}

impl Dictionary {
    pub fn entries(&self) -> &[DictEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write as `headword,shortDefinition,Number`, rows in number order.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        writer.write_record(["headword", "shortDefinition", "Number"])?;
        for entry in &self.entries {
            writer.write_record([
                entry.headword.as_str(),
                entry.definition.as_str(),
                &entry.number.to_string(),
            ])?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

impl NumericTable {
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Extract source column `j` as a vector.
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[j]).collect()
    }

    /// Write the matrix with a source-label header and no identifiers.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        writer.write_record(&self.sources)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|v| format!("{v:.4}")))?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Read a matrix previously written by [`write_csv`](Self::write_csv).
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let sources: Vec<String> = reader
            .headers()
            .with_context(|| format!("failed to read header of {}", path.display()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let line = i + 2;
            let row = row.with_context(|| {
                format!("malformed CSV row in {} (line {line})", path.display())
            })?;
            let mut values = Vec::with_capacity(sources.len());
            for cell in row.iter() {
                let value: f64 = cell.trim().parse().with_context(|| {
                    format!(
                        "non-numeric cell {:?} in {} (line {line})",
                        cell,
                        path.display()
                    )
                })?;
                values.push(value);
            }
            rows.push(values);
        }
        Ok(Self { sources, rows })
    }
}
