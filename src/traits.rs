//! Traits and interfaces for source-agnostic listing scraping

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use crate::models::Listing;

/// A classifieds source that can be scraped for rental listings
#[async_trait]
pub trait ListingScraper: Send + Sync {
    /// Short source name, stored with every listing (e.g. `olx`)
    fn name(&self) -> &str;

    /// Fetch the current listings and parse them
    ///
    /// # Returns
    /// * `Result<Vec<Listing>>` - Listings found, or an error if the source
    ///   could not be reached at all
    async fn scrape(&self) -> Result<Vec<Listing>>;
}

/// Collection of configured scrapers
#[derive(Default)]
pub struct ScraperRegistry {
    scrapers: Vec<Box<dyn ListingScraper>>,
}

impl ScraperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, scraper: Box<dyn ListingScraper>) {
        self.scrapers.push(scraper);
    }

    pub fn names(&self) -> Vec<&str> {
        self.scrapers.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.scrapers.is_empty()
    }

    /// Runs every scraper in registration order. A failing scraper is logged
    /// and does not prevent the others from running.
    pub async fn scrape_all(&self) -> Vec<Listing> {
        let mut all_listings = Vec::new();

        for scraper in &self.scrapers {
            info!("Scraping listings from {}", scraper.name());

            match scraper.scrape().await {
                Ok(mut listings) => {
                    info!("Found {} listings on {}", listings.len(), scraper.name());
                    all_listings.append(&mut listings);
                }
                Err(e) => {
                    error!("Failed to scrape {}: {:#}", scraper.name(), e);
                }
            }
        }

        all_listings
    }
}
