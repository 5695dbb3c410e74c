// Hapax: word-frequency analysis for the Perseus digital library.
//
// This is the library root. Each module corresponds to a major step of the
// pipeline, from catalog scraping through the similarity matrix.

pub mod config;
pub mod output;
pub mod perseus;
pub mod pipeline;
pub mod prune;
pub mod stage;
pub mod status;
pub mod table;
