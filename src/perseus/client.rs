// Perseus HTTP client: plain GETs against the hopper endpoints.
//
// The library has no API to speak of: the catalog is an HTML collection page
// and the vocabulary tool returns XML when asked with `output=xml`. This
// client is a thin reqwest wrapper with a generic text GET helper; pacing and
// retry live in the `retry` module so callers decide how hard to push.

use anyhow::{Context, Result};
use tracing::debug;

/// Default collection page for the Greco-Roman materials.
pub const DEFAULT_CATALOG_URL: &str =
    "https://www.perseus.tufts.edu/hopper/collection?collection=Perseus:collection:Greco-Roman";

/// Default vocabulary-tool endpoint.
pub const DEFAULT_VOCAB_URL: &str = "https://www.perseus.tufts.edu/hopper/vocablist";

/// HTTP client for the Perseus hopper endpoints.
pub struct PerseusClient {
    client: reqwest::Client,
    catalog_url: String,
    vocab_url: String,
}

impl PerseusClient {
    /// Create a client pointing at the given endpoints.
    ///
    /// Pass different URLs for testing or for a local hopper mirror.
    pub fn new(catalog_url: &str, vocab_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("hapax/0.1 (classical word-frequency research)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            catalog_url: catalog_url.trim_end_matches('/').to_string(),
            vocab_url: vocab_url.trim_end_matches('/').to_string(),
        })
    }

    /// Make a GET request and return the response body as text.
    ///
    /// `params` are query string key-value pairs appended to `url`.
    pub async fn get_text(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        debug!(url = url, "GET request");

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .with_context(|| format!("Request failed: {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("GET {url} returned {status}");
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {url}"))
    }

    /// Fetch the collection page HTML.
    pub async fn fetch_catalog_page(&self) -> Result<String> {
        self.get_text(&self.catalog_url, &[])
            .await
            .context("Failed to fetch the collection page")
    }

    /// Fetch one work's vocabulary list as XML.
    ///
    /// `work_id` is the document identifier scraped from the catalog,
    /// `language` is the lowercase language name the tool expects, and
    /// `filter_percent` bounds how much of the running word total to include.
    pub async fn fetch_vocablist(
        &self,
        work_id: &str,
        language: &str,
        filter_percent: u32,
    ) -> Result<String> {
        let filt = filter_percent.to_string();
        let params: [(&str, &str); 6] = [
            ("works", work_id),
            ("sort", "weighted_freq"),
            ("filt", &filt),
            ("filt_custom", ""),
            ("output", "xml"),
            ("lang", language),
        ];

        self.get_text(&self.vocab_url, &params)
            .await
            .with_context(|| format!("Failed to fetch vocabulary list for {work_id}"))
    }
}
