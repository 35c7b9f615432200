//! Scrapes rental listings, places them on a street and district, stores the
//! ones not seen before and emails a digest of them.

pub mod config;
pub mod database;
pub mod extract;
pub mod flat_finder;
pub mod models;
pub mod notifier;
pub mod scrapers;
pub mod traits;

pub use flat_finder::FlatFinder;
