//! Facebook group feed scraper using the Graph API

use std::sync::{Arc, LazyLock};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::DateTime;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::extract::Locator;
use crate::extract::fields::parse_decimal;
use crate::models::Listing;
use crate::traits::ListingScraper;

const SOURCE: &str = "facebook";
const GRAPH_API_URL: &str = "https://graph.facebook.com/v12.0";
const FEED_FIELDS: &str = "message,created_time,permalink_url,attachments{media}";

static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Cena:\s*([\d\s]+) PLN").expect("valid price pattern"));
static SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Powierzchnia:\s*([\d,]+) m2").expect("valid size pattern"));
static FLOOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Piętro:\s*(\d+)").expect("valid floor pattern"));
static ROOMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Pomieszczenia:\s*(\d+)").expect("valid rooms pattern"));

#[derive(Debug, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub data: Vec<FeedPost>,
}

#[derive(Debug, Deserialize)]
pub struct FeedPost {
    pub message: Option<String>,
    pub created_time: Option<String>,
    pub permalink_url: Option<String>,
    pub attachments: Option<Attachments>,
}

#[derive(Debug, Deserialize)]
pub struct Attachments {
    #[serde(default)]
    pub data: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
pub struct Attachment {
    pub media: Option<Media>,
}

#[derive(Debug, Deserialize)]
pub struct Media {
    pub image: MediaImage,
}

#[derive(Debug, Deserialize)]
pub struct MediaImage {
    pub src: String,
}

/// Scraper for posts in a Facebook housing group
pub struct FacebookScraper {
    client: Client,
    group_id: String,
    access_token: String,
    city: String,
    locator: Arc<Locator>,
}

impl FacebookScraper {
    pub fn new(group_id: &str, access_token: &str, city: &str, locator: Arc<Locator>) -> Self {
        Self {
            client: Client::new(),
            group_id: group_id.to_string(),
            access_token: access_token.to_string(),
            city: city.to_string(),
            locator,
        }
    }

    /// Turns a feed post into a listing. Posts without text or a permalink
    /// are skipped.
    pub fn parse_post(&self, post: &FeedPost) -> Option<Listing> {
        let text = post.message.as_deref().filter(|m| !m.trim().is_empty())?;
        let url = post.permalink_url.as_deref()?;
        let title = text.lines().next().unwrap_or_default().trim();

        let mut listing = Listing::new(SOURCE, url, title);
        listing.description = text.to_string();
        listing.price = capture(&PRICE, text).and_then(parse_decimal);
        listing.size = capture(&SIZE, text).and_then(parse_decimal);
        listing.floor = capture(&FLOOR, text).and_then(|v| v.parse().ok());
        listing.rooms = capture(&ROOMS, text).and_then(|v| v.parse().ok());
        listing.city.clone_from(&self.city);
        listing.listed_at = post
            .created_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S%z").ok())
            .map(|t| t.naive_local());
        listing.images = post
            .attachments
            .iter()
            .flat_map(|attachments| &attachments.data)
            .filter_map(|attachment| attachment.media.as_ref())
            .map(|media| media.image.src.clone())
            .collect();

        // Post text is the whole listing, so it is searched as-is
        let (street, district) = self.locator.locate(text);
        listing.street = street;
        listing.district = district;

        Some(listing)
    }
}

fn capture<'t>(regex: &Regex, text: &'t str) -> Option<&'t str> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[async_trait]
impl ListingScraper for FacebookScraper {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn scrape(&self) -> Result<Vec<Listing>> {
        info!("Fetching Facebook group feed {}", self.group_id);

        let url = format!("{GRAPH_API_URL}/{}/feed", self.group_id);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("fields", FEED_FIELDS),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to fetch Facebook feed for group {}: {}",
                self.group_id,
                response.status()
            ));
        }

        let feed: FeedResponse = response.json().await?;
        let listings = feed
            .data
            .iter()
            .filter_map(|post| {
                debug!("Processing post: {:?}", post.permalink_url);
                let listing = self.parse_post(post);
                if listing.is_none() {
                    warn!("Skipping Facebook post without text or permalink");
                }
                listing
            })
            .collect();

        Ok(listings)
    }
}
