//! Source-specific scraper implementations

pub mod facebook;
pub mod olx;

pub use facebook::FacebookScraper;
pub use olx::OlxScraper;
