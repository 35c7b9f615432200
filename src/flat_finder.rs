use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::config::Config;
use crate::database::Database;
use crate::extract::{DistrictGazetteer, Locator, StreetGazetteer};
use crate::models::Listing;
use crate::notifier::MailNotifier;
use crate::scrapers::{FacebookScraper, OlxScraper};
use crate::traits::ScraperRegistry;

#[derive(Clone)]
pub struct FlatFinder {
    scrapers: Arc<ScraperRegistry>,
    database: Database,
    notifier: MailNotifier,
}

impl FlatFinder {
    /// Wires scrapers, database and notifier from the configuration.
    pub async fn new(config: &Config) -> Result<Self> {
        let streets = StreetGazetteer::load(&config.street_names_path)?;
        info!("Loaded {} known street names", streets.len());
        let locator = Arc::new(Locator::new(streets, DistrictGazetteer::krakow()));

        let mut scrapers = ScraperRegistry::new();
        scrapers.register(Box::new(OlxScraper::new(
            &config.olx_search_url,
            &config.city,
            Arc::clone(&locator),
        )?));
        if let Some(facebook) = &config.facebook {
            scrapers.register(Box::new(FacebookScraper::new(
                &facebook.group_id,
                &facebook.access_token,
                &config.city,
                Arc::clone(&locator),
            )));
        }
        info!("Enabled scrapers: {}", scrapers.names().join(", "));

        let database = Database::new(&config.database_url)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_url))?;
        let notifier = MailNotifier::new(config.mail.clone());

        Ok(Self::with_parts(scrapers, database, notifier))
    }

    pub fn with_parts(scrapers: ScraperRegistry, database: Database, notifier: MailNotifier) -> Self {
        Self {
            scrapers: Arc::new(scrapers),
            database,
            notifier,
        }
    }

    /// Runs one scrape, stores unseen listings and emails a digest of every
    /// stored listing not yet notified, including ones whose earlier digest
    /// failed.
    ///
    /// Returns the listings that were new in this check.
    pub async fn check_for_new_listings(&self) -> Result<Vec<Listing>> {
        let listings = self.scrapers.scrape_all().await;
        let mut seen: HashSet<String> = self.database.get_existing_listing_ids().await?;
        let total = listings.len();

        let mut new_listings = Vec::new();

        for listing in listings {
            if seen.insert(listing.id.clone()) {
                info!(
                    "New listing found: {} - {}",
                    listing.title,
                    listing.street.as_deref().unwrap_or("unknown street")
                );

                self.database.save_listing(&listing).await?;
                new_listings.push(listing);
            }
        }

        info!("Scraped {} listings, {} new", total, new_listings.len());

        self.notify_pending().await?;

        Ok(new_listings)
    }

    /// Listings are marked notified only after the digest went out.
    async fn notify_pending(&self) -> Result<()> {
        let pending = self.database.get_unnotified_listings().await?;
        if pending.is_empty() {
            return Ok(());
        }

        info!("Sending digest for {} pending listings", pending.len());
        self.notifier
            .send_digest(&pending)
            .await
            .context("Digest not delivered, listings stay pending")?;

        let ids: Vec<String> = pending.into_iter().map(|listing| listing.id).collect();
        self.database.mark_notified(&ids, Utc::now()).await
    }

    /// Releases the database pool. Call once, after the scheduler has stopped.
    pub async fn shutdown(&self) {
        self.database.close().await;
    }
}
