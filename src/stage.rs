// Pipeline stage tags.
//
// Every intermediate artifact the pipeline writes belongs to exactly one stage,
// and the stage owns the artifact's file naming. Earlier generations of this
// pipeline inferred the stage by string-matching filename suffixes at each call
// site; the enum makes the convention explicit and keeps producers and
// consumers agreed on what matches what.

use std::path::{Path, PathBuf};

/// A pipeline stage, as reflected in artifact file names.
///
/// `Raw` and `Merged` artifacts are undecorated `.csv` files and are told apart
/// by the directory they live in (the frequencies tree vs. the analysis
/// directory). Every other stage appends ` - <suffix>` to the base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Per-work frequency CSV converted straight from vocablist XML.
    Raw,
    /// Raw table after stoplist filtering and column reduction, deduped
    /// by headword.
    Cleaned,
    /// Dense word-by-source table produced by the pivot.
    Merged,
    /// Merged table with each column rescaled to percentages.
    Normalized,
    /// Identifier-to-number lookup split off the normalized table.
    Dictionary,
    /// Normalized table with identifier columns stripped.
    Numeric,
    /// Cosine-similarity matrix over the numeric table's columns.
    Similarity,
}

impl Stage {
    /// The filename suffix for this stage, if it carries one.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Stage::Raw | Stage::Merged => None,
            Stage::Cleaned => Some("cleaned"),
            Stage::Normalized => Some("percent"),
            Stage::Dictionary => Some("dictionary"),
            Stage::Numeric => Some("numeric"),
            Stage::Similarity => Some("similarity"),
        }
    }

    /// Human-readable stage name for logs and status output.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::Cleaned => "cleaned",
            Stage::Merged => "merged",
            Stage::Normalized => "normalized",
            Stage::Dictionary => "dictionary",
            Stage::Numeric => "numeric",
            Stage::Similarity => "similarity",
        }
    }

    /// Derive this stage's artifact path from a base artifact path.
    ///
    /// Undecorated stages swap the extension for `.csv` (this is how the raw
    /// CSV path is derived from an XML path); suffixed stages insert
    /// ` - <suffix>` before it.
    pub fn artifact_path(&self, base: &Path) -> PathBuf {
        match self.suffix() {
            None => base.with_extension("csv"),
            Some(sfx) => {
                let stem = base
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                base.with_file_name(format!("{stem} - {sfx}.csv"))
            }
        }
    }

    /// Whether a file name is an artifact of this stage.
    pub fn matches(&self, file_name: &str) -> bool {
        match self.suffix() {
            Some(sfx) => file_name.ends_with(&format!(" - {sfx}.csv")),
            // Undecorated: any .csv that isn't claimed by a suffixed stage.
            None => {
                file_name.ends_with(".csv")
                    && !SUFFIXED.iter().any(|s| s.matches(file_name))
            }
        }
    }
}

const SUFFIXED: [Stage; 5] = [
    Stage::Cleaned,
    Stage::Normalized,
    Stage::Dictionary,
    Stage::Numeric,
    Stage::Similarity,
];

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
