// Percentage normalization of the wide table.
//
// Raw frequency magnitudes aren't comparable across works of different
// length, so each source column is rescaled to percentages of its own total:
// cell = 100 * value / column_sum, rounded to four decimal places. A column
// that sums to zero (an empty work) stays all zeros instead of dividing by
// zero. Identifier columns are carried through untouched.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::table::wide::{read_rows, WideRow, WideTable};

/// Wide table with every source column rescaled to percentages.
#[derive(Debug)]
pub struct NormalizedTable {
    sources: Vec<String>,
    rows: Vec<WideRow>,
}

impl NormalizedTable {
    /// Rescale each column of `wide` to percentages of its own sum.
    pub fn from_wide(wide: &WideTable) -> Self {
        let sources: Vec<String> = wide.sources().to_vec();
        let mut sums = vec![0.0_f64; sources.len()];
        for row in wide.rows() {
            for (j, v) in row.values.iter().enumerate() {
                sums[j] += v;
            }
        }

        let rows = wide
            .rows()
            .iter()
            .map(|row| WideRow {
                headword: row.headword.clone(),
                definition: row.definition.clone(),
                values: row
                    .values
                    .iter()
                    .enumerate()
                    .map(|(j, v)| {
                        if sums[j] == 0.0 {
                            0.0
                        } else {
                            round4(100.0 * v / sums[j])
                        }
                    })
                    .collect(),
            })
            .collect();

        Self { sources, rows }
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

    /// Write the table with values fixed to four decimal places.
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
            record.extend(row.values.iter().map(|v| format!("{v:.4}")));
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
        Ok(Self { sources, rows })
    }
}

/// Round to four decimal places, matching the on-disk precision so in-memory
/// chaining and file round-trips see the same numbers.
fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
