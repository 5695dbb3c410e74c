use std::env;
use std::path::PathBuf;

use anyhow::Result;

/// Central configuration loaded from environment variables.
///
/// Everything has a sensible default; the .env file is loaded
/// automatically at startup via dotenvy.
pub struct Config {
    /// Root of the on-disk data tree (catalog/, frequencies/, analysis/).
    pub data_dir: PathBuf,
    /// Collection page listing the works to catalog.
    pub catalog_url: String,
    /// Vocabulary-tool endpoint that serves per-work frequency XML.
    pub vocab_url: String,
    /// Minimum delay between requests to the library, in milliseconds.
    pub request_delay_ms: u64,
    /// Vocabulary coverage filter passed to the vocab tool (percent of
    /// the running word total to include, 100 = everything).
    pub filter_percent: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Nothing is required up front; commands that need an existing
    /// catalog or downloaded frequency data validate via `require_*`.
    pub fn load() -> Result<Self> {
        let request_delay_ms = env::var("HAPAX_REQUEST_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        let filter_percent = env::var("HAPAX_FILTER_PERCENT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);

        Ok(Self {
            data_dir: env::var("HAPAX_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            catalog_url: env::var("HAPAX_CATALOG_URL")
                .unwrap_or_else(|_| crate::perseus::client::DEFAULT_CATALOG_URL.to_string()),
            vocab_url: env::var("HAPAX_VOCAB_URL")
                .unwrap_or_else(|_| crate::perseus::client::DEFAULT_VOCAB_URL.to_string()),
            request_delay_ms,
            filter_percent,
        })
    }

    /// Directory holding the catalog CSVs.
    pub fn catalog_dir(&self) -> PathBuf {
        self.data_dir.join("catalog")
    }

    /// The full works catalog scraped from the collection page.
    pub fn works_path(&self) -> PathBuf {
        self.catalog_dir().join("works.csv")
    }

    /// Per-language slice of the catalog (e.g. `works_latin.csv`).
    pub fn language_works_path(&self, language: &str) -> PathBuf {
        self.catalog_dir()
            .join(format!("works_{}.csv", language.to_lowercase()))
    }

    /// Root of the per-work frequency tree (`frequencies/<lang>/<author>/`).
    pub fn frequencies_dir(&self) -> PathBuf {
        self.data_dir.join("frequencies")
    }

    /// Directory holding merged tables and everything derived from them.
    pub fn analysis_dir(&self) -> PathBuf {
        self.data_dir.join("analysis")
    }

    /// Check that a scraped catalog exists on disk.
    /// Call this before any operation that needs the works listing.
    pub fn require_catalog(&self) -> Result<()> {
        if !self.works_path().exists() {
            anyhow::bail!(
                "No catalog found at {}\n\
                 Run `hapax catalog` first to scrape the collection listing.",
                self.works_path().display()
            );
        }
        Ok(())
    }

    /// Check that downloaded frequency data exists on disk.
    /// Call this before any operation that reads the frequencies tree.
    pub fn require_frequencies(&self) -> Result<()> {
        if !self.frequencies_dir().is_dir() {
            anyhow::bail!(
                "No frequency data found at {}\n\
                 Run `hapax fetch` first to download vocabulary lists.",
                self.frequencies_dir().display()
            );
        }
        Ok(())
    }
}
