// Housekeeping for the on-disk data tree.
//
// Downloads leave debris behind: works the vocab tool answered with a stub
// error document, intermediate artifacts that have served their purpose, and
// author directories emptied by either of those. Each pruning pass deletes
// one kind of debris and reports exactly what it removed so the caller can
// show its work.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use crate::stage::Stage;

/// XML files below this size are stub responses, not vocabulary lists.
///
/// A real list runs hundreds of kilobytes; the tool's "no vocabulary found"
/// document is well under ten.
pub const SMALL_XML_THRESHOLD: u64 = 10 * 1024;

/// Delete XML files smaller than `threshold` bytes under `root`.
///
/// Returns the deleted paths.
pub fn prune_small_xml(root: &Path, threshold: u64) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("xml") {
            continue;
        }
        let size = entry
            .metadata()
            .with_context(|| format!("failed to stat {}", entry.path().display()))?
            .len();
        if size < threshold {
            fs::remove_file(entry.path())
                .with_context(|| format!("failed to delete {}", entry.path().display()))?;
            debug!(path = %entry.path().display(), size = size, "pruned undersized XML");
            deleted.push(entry.into_path());
        }
    }
    Ok(deleted)
}

/// Delete every artifact of `stage` under `root`.
///
/// Returns the deleted paths.
pub fn prune_stage(root: &Path, stage: Stage) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if stage.matches(&name) {
            fs::remove_file(entry.path())
                .with_context(|| format!("failed to delete {}", entry.path().display()))?;
            debug!(path = %entry.path().display(), stage = %stage, "pruned stage artifact");
            deleted.push(entry.into_path());
        }
    }
    Ok(deleted)
}

/// Delete empty directories under `root`, deepest first, so a directory
/// emptied by its children's removal goes too. `root` itself is kept.
///
/// Returns the deleted paths.
pub fn prune_empty_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_dir() || entry.depth() == 0 {
            continue;
        }
        let mut contents = fs::read_dir(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        if contents.next().is_none() {
            fs::remove_dir(entry.path())
                .with_context(|| format!("failed to delete {}", entry.path().display()))?;
            debug!(path = %entry.path().display(), "pruned empty directory");
            deleted.push(entry.into_path());
        }
    }
    Ok(deleted)
}
