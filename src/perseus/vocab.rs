// Vocabulary-list XML parsing.
//
// The vocab tool returns one `<frequency>` element per lemma, with the word
// itself nested under `<lemma>` and four metric elements alongside it.
// Metric values are kept verbatim as strings here; parsing them as numbers is
// the ingestion step's job, after cleaning has picked which column matters.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use roxmltree::{Document, Node};
use tracing::debug;

/// One lemma entry from a vocabulary list.
#[derive(Debug, Clone, PartialEq)]
pub struct VocabEntry {
    pub headword: String,
    pub definition: String,
    pub max_frequency: String,
    pub min_frequency: String,
    pub weighted_frequency: String,
    pub key_term_score: String,
}

/// Column order of the raw per-work CSVs produced from vocabulary XML.
pub const RAW_COLUMNS: [&str; 6] = [
    "headword",
    "shortDefinition",
    "maxFrequency",
    "minFrequency",
    "weightedFrequency",
    "keyTermScore",
];

/// Parse a vocabulary list document into entries.
///
/// Entries missing a headword are dropped; missing metric elements become
/// empty strings rather than failures, matching how sparsely the tool fills
/// in scores for rare lemmas.
pub fn parse_vocablist(xml: &str) -> Result<Vec<VocabEntry>> {
    let doc = Document::parse(xml).context("failed to parse vocabulary XML")?;

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for freq in doc
        .descendants()
        .filter(|n| n.has_tag_name("frequency"))
    {
        let lemma = freq.children().find(|n| n.has_tag_name("lemma"));
        let headword = lemma
            .map(|l| child_text(&l, "headword"))
            .unwrap_or_default();
        if headword.is_empty() {
            skipped += 1;
            continue;
        }

        entries.push(VocabEntry {
            definition: lemma
                .map(|l| child_text(&l, "shortDefinition"))
                .unwrap_or_default(),
            headword,
            max_frequency: child_text(&freq, "maxFrequency"),
            min_frequency: child_text(&freq, "minFrequency"),
            weighted_frequency: child_text(&freq, "weightedFrequency"),
            key_term_score: child_text(&freq, "keyTermScore"),
        });
    }

    if skipped > 0 {
        debug!(skipped = skipped, "skipped frequency entries without a headword");
    }
    Ok(entries)
}

fn child_text(node: &Node, name: &str) -> String {
    node.children()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Write entries as a raw per-work CSV with the [`RAW_COLUMNS`] layout.
pub fn write_raw_csv(entries: &[VocabEntry], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    writer.write_record(RAW_COLUMNS)?;
    for entry in entries {
        writer.write_record([
            entry.headword.as_str(),
            entry.definition.as_str(),
            entry.max_frequency.as_str(),
            entry.min_frequency.as_str(),
            entry.weighted_frequency.as_str(),
            entry.key_term_score.as_str(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
