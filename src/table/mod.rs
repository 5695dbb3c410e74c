// Tabular transforms over frequency data.
//
// Everything in here operates on in-memory tables and plain CSV files. The
// flow is: per-work cleaned CSVs are ingested and pivoted into one wide
// word-by-source table (`wide`), the wide table is rescaled to percentages
// (`normalize`), the identifier columns are split off into a numbered
// dictionary (`dictionary`), and the remaining numeric matrix is scored for
// pairwise cosine similarity (`similarity`).

pub mod clean;
pub mod dictionary;
pub mod ingest;
pub mod normalize;
pub mod similarity;
pub mod wide;

pub use clean::FrequencyMetric;
pub use dictionary::{split_identifiers, Dictionary, NumericTable};
pub use ingest::{FrequencyRecord, Grouping};
pub use normalize::NormalizedTable;
pub use similarity::SimilarityMatrix;
pub use wide::WideTable;
