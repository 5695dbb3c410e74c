// Perseus Digital Library access: catalog scraping and vocabulary downloads.
//
// Everything that talks to the library lives here. Each submodule handles one
// area: the HTTP client, request pacing with retry, the collection-page
// scraper, and the vocabulary-list XML parser.

pub mod catalog;
pub mod client;
pub mod retry;
pub mod vocab;
