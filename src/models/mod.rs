//! Data models for rental listings and mail API payloads

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A rental listing scraped from a classifieds source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub price: Option<f64>,
    pub size: Option<f64>,
    pub rooms: Option<u32>,
    pub floor: Option<i32>,
    pub rent: Option<f64>,
    pub building_type: Option<String>,
    pub has_elevator: Option<bool>,
    pub parking: Option<String>,
    pub street: Option<String>,
    pub district: Option<String>,
    pub city: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub images: Vec<String>,
    /// Posting time as reported by the source
    pub listed_at: Option<NaiveDateTime>,
    pub discovered_at: DateTime<Utc>,
}

impl Listing {
    /// Creates a listing with everything but the identity left empty.
    pub fn new(source: &str, url: &str, title: &str) -> Self {
        Self {
            id: listing_id(source, url),
            title: title.to_string(),
            price: None,
            size: None,
            rooms: None,
            floor: None,
            rent: None,
            building_type: None,
            has_elevator: None,
            parking: None,
            street: None,
            district: None,
            city: String::new(),
            description: String::new(),
            url: url.to_string(),
            source: source.to_string(),
            images: Vec::new(),
            listed_at: None,
            discovered_at: Utc::now(),
        }
    }

    /// Title and description, the text location extraction runs over.
    pub fn full_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Stable identifier derived from the listing's source and URL
pub fn listing_id(source: &str, url: &str) -> String {
    format!("{:x}", md5::compute(format!("{source}:{url}")))
}

/// Gmail `users.messages.send` request body
#[derive(Debug, Serialize)]
pub struct GmailMessage {
    /// RFC 822 message, base64url encoded
    pub raw: String,
}

/// Gmail `users.messages.send` response
#[derive(Debug, Deserialize)]
pub struct GmailSent {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_depends_on_source_and_url() {
        let url = "https://www.olx.pl/d/oferta/pokoj-CID3-ID1.html";
        assert_eq!(listing_id("olx", url), listing_id("olx", url));
        assert_ne!(listing_id("olx", url), listing_id("facebook", url));
        assert_eq!(Listing::new("olx", url, "Pokój").id, listing_id("olx", url));
    }
}
