// Pipeline orchestration.
//
// `fetch` covers the network-facing stages (catalog scrape, vocabulary
// downloads); `run` covers the on-disk transform stages from raw XML through
// the similarity matrix, plus the end-to-end chain.

pub mod fetch;
pub mod run;
