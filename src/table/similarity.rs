// Pairwise cosine similarity over the numeric table's source columns.
//
// Each source is a vector of normalized word frequencies; the matrix scores
// every pair of sources by the cosine of the angle between their vectors.
// The upper triangle is computed once and mirrored, so the matrix is
// symmetric by construction rather than by floating-point luck.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::table::dictionary::NumericTable;

/// Symmetric source-by-source similarity matrix.
#[derive(Debug)]
pub struct SimilarityMatrix {
    labels: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    /// Score every pair of source columns in `table`.
    ///
    /// A column with zero norm (an all-zero source) scores 0 against
    /// everything, itself included; nonzero columns score exactly 1.0 against
    /// themselves.
    pub fn from_numeric(table: &NumericTable) -> Self {
        let n = table.sources().len();
        let columns: Vec<Vec<f64>> = (0..n).map(|j| table.column(j)).collect();
        let norms: Vec<f64> = columns.iter().map(|c| norm(c)).collect();

        let mut values = vec![vec![0.0; n]; n];
        for j in 0..n {
            if norms[j] > 0.0 {
                values[j][j] = 1.0;
            }
            for k in (j + 1)..n {
                let score = if norms[j] == 0.0 || norms[k] == 0.0 {
                    0.0
                } else {
                    dot(&columns[j], &columns[k]) / (norms[j] * norms[k])
                };
                values[j][k] = score;
                values[k][j] = score;
            }
        }

        Self {
            labels: table.sources().to_vec(),
            values,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, j: usize, k: usize) -> f64 {
        self.values[j][k]
    }

    /// The highest-scoring distinct pairs, best first.
    pub fn top_pairs(&self, limit: usize) -> Vec<(String, String, f64)> {
        let mut pairs = Vec::new();
        for j in 0..self.len() {
            for k in (j + 1)..self.len() {
                pairs.push((self.labels[j].clone(), self.labels[k].clone(), self.values[j][k]));
            }
        }
        pairs.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        pairs.truncate(limit);
        pairs
    }

    /// Write as a label header row followed by one value row per source.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        writer.write_record(&self.labels)?;
        for row in &self.values {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
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

        let labels: Vec<String> = reader
            .headers()
            .with_context(|| format!("failed to read header of {}", path.display()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut values = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let line = i + 2;
            let row = row.with_context(|| {
                format!("malformed CSV row in {} (line {line})", path.display())
            })?;
            let mut parsed = Vec::with_capacity(labels.len());
            for cell in row.iter() {
                let value: f64 = cell.trim().parse().with_context(|| {
                    format!(
                        "non-numeric cell {:?} in {} (line {line})",
                        cell,
                        path.display()
                    )
                })?;
                parsed.push(value);
            }
            values.push(parsed);
        }

        if values.len() != labels.len() {
            bail!(
                "similarity matrix in {} is not square: {} labels but {} rows",
                path.display(),
                labels.len(),
                values.len()
            );
        }
        Ok(Self { labels, values })
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_of(columns: &[(&str, Vec<f64>)]) -> SimilarityMatrix {
        // Build a NumericTable by transposing the given columns into rows.
        let sources: Vec<String> = columns.iter().map(|(l, _)| l.to_string()).collect();
        let height = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t - numeric.csv");
        let mut text = sources.join(",");
        text.push('\n');
        for i in 0..height {
            let row: Vec<String> = columns.iter().map(|(_, c)| c[i].to_string()).collect();
            text.push_str(&row.join(","));
            text.push('\n');
        }
        std::fs::write(&path, text).unwrap();
        SimilarityMatrix::from_numeric(&NumericTable::read_csv(&path).unwrap())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_orthogonal_columns_score_zero() {
        let m = matrix_of(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        assert!(approx(m.get(0, 1), 0.0));
    }

    #[test]
    fn test_parallel_columns_score_one() {
        let m = matrix_of(&[("a", vec![1.0, 2.0]), ("b", vec![2.0, 4.0])]);
        assert!(approx(m.get(0, 1), 1.0), "got {}", m.get(0, 1));
    }

    #[test]
    fn test_diagonal_is_exactly_one() {
        let m = matrix_of(&[("a", vec![3.0, 4.0]), ("b", vec![1.0, 7.0])]);
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(1, 1), 1.0);
    }

    #[test]
    fn test_zero_column_scores_zero_everywhere() {
        let m = matrix_of(&[("a", vec![1.0, 2.0]), ("empty", vec![0.0, 0.0])]);
        assert_eq!(m.get(0, 1), 0.0);
        assert_eq!(m.get(1, 0), 0.0);
        // An all-zero source isn't similar to anything, not even itself.
        assert_eq!(m.get(1, 1), 0.0);
    }

    #[test]
    fn test_matrix_is_symmetric() {
        let m = matrix_of(&[
            ("a", vec![1.0, 0.0, 2.0]),
            ("b", vec![0.5, 1.0, 0.0]),
            ("c", vec![1.0, 1.0, 1.0]),
        ]);
        for j in 0..3 {
            for k in 0..3 {
                assert_eq!(m.get(j, k), m.get(k, j), "asymmetry at ({j}, {k})");
            }
        }
    }

    #[test]
    fn test_known_angle() {
        // cos between (1,0) and (1,1) is 1/sqrt(2).
        let m = matrix_of(&[("a", vec![1.0, 0.0]), ("c", vec![1.0, 1.0])]);
        assert!(approx(m.get(0, 1), std::f64::consts::FRAC_1_SQRT_2));
    }

    #[test]
    fn test_top_pairs_orders_best_first_and_skips_diagonal() {
        let m = matrix_of(&[
            ("a", vec![1.0, 0.0]),
            ("b", vec![1.0, 0.1]),
            ("c", vec![0.0, 1.0]),
        ]);
        let pairs = m.top_pairs(2);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "a");
        assert_eq!(pairs[0].1, "b");
        assert!(pairs[0].2 > pairs[1].2);
    }

    #[test]
    fn test_csv_layout_is_header_plus_unlabeled_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("works - similarity.csv");

        let m = matrix_of(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        m.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "a,b");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,"), "got: {}", lines[1]);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("works - similarity.csv");

        let m = matrix_of(&[("a", vec![1.0, 2.0]), ("b", vec![2.0, 1.0])]);
        m.write_csv(&path).unwrap();

        let back = SimilarityMatrix::read_csv(&path).unwrap();
        assert_eq!(back.labels(), m.labels());
        assert_eq!(back.values(), m.values());
    }

    #[test]
    fn test_read_rejects_non_square() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("works - similarity.csv");
        std::fs::write(&path, "a,b\n1,0\n").unwrap();

        let err = SimilarityMatrix::read_csv(&path).unwrap_err();
        assert!(format!("{err}").contains("not square"));
    }
}
