pub mod fetcher;

pub use fetcher::{FetchOutcome, IncrementalFetcher};
