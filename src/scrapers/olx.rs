//! OLX.pl specific scraper implementation

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use reqwest::Client;
use reqwest::header::USER_AGENT;
use scraper::{ElementRef, Html, Selector};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::extract::Locator;
use crate::extract::fields::{
    ListingDetails, parse_polish_date, parse_price, price_from_title, size_from_title,
};
use crate::models::Listing;
use crate::traits::ListingScraper;

const SOURCE: &str = "olx";
const BASE_URL: &str = "https://www.olx.pl";
const MAX_CONCURRENT_REQUESTS: usize = 12;
const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
];

/// CSS selectors for the OLX search and listing pages
#[derive(Debug, Clone)]
pub struct OlxSelectors {
    /// Anchor of a single result on the search page
    pub listing_link: String,
    /// Title inside the result anchor
    pub listing_title: String,
    /// Title on the listing page, overrides the search page title
    pub title: String,
    pub description: String,
    pub price: String,
    /// One `Label: value` parameter line
    pub parameter: String,
    pub posted_at: String,
    pub image: String,
}

impl Default for OlxSelectors {
    fn default() -> Self {
        Self {
            listing_link: "a.css-qo0cxu".to_string(),
            listing_title: "h4.css-1sq4ur2".to_string(),
            title: "h4.css-yde3oc".to_string(),
            description: "div.css-1o924a9".to_string(),
            price: "h3.css-fqcbii".to_string(),
            parameter: "p.css-1wgiva2".to_string(),
            posted_at: r#"span[data-cy="ad-posted-at"]"#.to_string(),
            image: "img.css-1bmvjcs".to_string(),
        }
    }
}

/// A result on the search page, before its listing page is fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLink {
    pub url: String,
    pub title: String,
}

/// Parsed selectors plus the gazetteers used to place a listing
pub struct OlxParser {
    listing_link: Selector,
    listing_title: Selector,
    title: Selector,
    description: Selector,
    price: Selector,
    parameter: Selector,
    posted_at: Selector,
    image: Selector,
    city: String,
    locator: Arc<Locator>,
}

fn parse_selector(name: &str, selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Failed to parse {name} selector: {e:?}"))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

impl OlxParser {
    pub fn new(selectors: &OlxSelectors, city: &str, locator: Arc<Locator>) -> Result<Self> {
        Ok(Self {
            listing_link: parse_selector("listing link", &selectors.listing_link)?,
            listing_title: parse_selector("listing title", &selectors.listing_title)?,
            title: parse_selector("title", &selectors.title)?,
            description: parse_selector("description", &selectors.description)?,
            price: parse_selector("price", &selectors.price)?,
            parameter: parse_selector("parameter", &selectors.parameter)?,
            posted_at: parse_selector("posted at", &selectors.posted_at)?,
            image: parse_selector("image", &selectors.image)?,
            city: city.to_string(),
            locator,
        })
    }

    /// Extracts result links from a search page, skipping otodom.pl
    /// cross-postings and duplicates.
    pub fn parse_search_page(&self, html: &str) -> Vec<ListingLink> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for anchor in document.select(&self.listing_link) {
            let Some(title) = anchor.select(&self.listing_title).next().map(element_text) else {
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };

            if href.contains("otodom.pl") {
                debug!("Skipping otodom listing: {}", href);
                continue;
            }

            let mut url = if href.starts_with("http") {
                href.to_string()
            } else {
                format!("{BASE_URL}{href}")
            };

            // Tracking parameters differ between page loads
            if let Some(query_start) = url.find('?') {
                url.truncate(query_start);
            }

            if seen.insert(url.clone()) {
                links.push(ListingLink { url, title });
            }
        }

        links
    }

    /// Builds a listing from its detail page. Missing fields stay empty.
    pub fn parse_listing_page(&self, link: &ListingLink, html: &str, now: NaiveDateTime) -> Listing {
        let document = Html::parse_document(html);
        let first_text = |selector: &Selector| {
            document
                .select(selector)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty())
        };

        let title = first_text(&self.title).unwrap_or_else(|| link.title.clone());
        let description = first_text(&self.description).unwrap_or_default();
        let price = first_text(&self.price)
            .and_then(|text| parse_price(&text))
            .or_else(|| price_from_title(&title));

        let parameters: Vec<String> = document.select(&self.parameter).map(element_text).collect();
        let details = ListingDetails::from_parameters(parameters.iter().map(String::as_str));

        let listed_at = first_text(&self.posted_at).and_then(|text| parse_polish_date(&text, now));
        let images = document
            .select(&self.image)
            .filter_map(|img| img.value().attr("src"))
            .map(str::to_string)
            .collect();

        let mut listing = Listing::new(SOURCE, &link.url, &title);
        listing.description = description;
        listing.price = price;
        listing.size = details.size.or_else(|| size_from_title(&title));
        listing.rooms = details.rooms;
        listing.floor = details.floor;
        listing.rent = details.rent;
        listing.building_type = details.building_type;
        listing.has_elevator = details.has_elevator;
        listing.parking = details.parking;
        listing.city.clone_from(&self.city);
        listing.images = images;
        listing.listed_at = listed_at;

        let (street, district) = self.locator.locate(&listing.full_text());
        listing.street = street;
        listing.district = district;

        listing
    }
}

/// Scraper implementation for OLX.pl rental listings
pub struct OlxScraper {
    client: Client,
    search_url: String,
    parser: Arc<OlxParser>,
}

impl OlxScraper {
    /// Create a new OLX scraper for a search results URL
    pub fn new(search_url: &str, city: &str, locator: Arc<Locator>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let parser = OlxParser::new(&OlxSelectors::default(), city, locator)?;

        Ok(Self {
            client,
            search_url: search_url.to_string(),
            parser: Arc::new(parser),
        })
    }

    /// Search URL for a category and city, newest first, with an optional
    /// price ceiling
    pub fn search_url(category: &str, city: &str, max_price: Option<u32>) -> String {
        let mut url = format!(
            "{BASE_URL}/nieruchomosci/{category}/{city}/?{}=created_at:desc",
            urlencoding::encode("search[order]")
        );
        if let Some(max_price) = max_price {
            url.push_str(&format!(
                "&{}={max_price}",
                urlencoding::encode("search[filter_float_price:to]")
            ));
        }
        url
    }
}

/// GET with linear backoff, rotating the user agent between attempts
async fn fetch_with_retry(client: &Client, url: &str) -> Result<String> {
    let mut last_error = anyhow!("no attempts made");

    for attempt in 0..MAX_RETRIES {
        let user_agent = USER_AGENTS[attempt as usize % USER_AGENTS.len()];

        match client.get(url).header(USER_AGENT, user_agent).send().await {
            Ok(response) if response.status().is_success() => {
                return Ok(response.text().await?);
            }
            Ok(response) => {
                warn!(
                    "Attempt {} failed with status {} for {}",
                    attempt + 1,
                    response.status(),
                    url
                );
                last_error = anyhow!("unexpected status {}", response.status());
            }
            Err(e) => {
                warn!("Attempt {} failed with error: {} for {}", attempt + 1, e, url);
                last_error = e.into();
            }
        }

        if attempt + 1 < MAX_RETRIES {
            tokio::time::sleep(RETRY_DELAY * (attempt + 1)).await;
        }
    }

    Err(last_error.context(format!("Failed to fetch {url} after {MAX_RETRIES} attempts")))
}

#[async_trait]
impl ListingScraper for OlxScraper {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn scrape(&self) -> Result<Vec<Listing>> {
        info!("Fetching OLX search page: {}", self.search_url);

        let html = fetch_with_retry(&self.client, &self.search_url).await?;
        let links = self.parser.parse_search_page(&html);
        info!("Found {} listing links on OLX", links.len());

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS));
        let mut tasks = JoinSet::new();

        for link in links {
            let client = self.client.clone();
            let parser = Arc::clone(&self.parser);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await?;
                debug!("Fetching listing details from: {}", link.url);
                let html = fetch_with_retry(&client, &link.url).await?;
                let now = Local::now().naive_local();
                Ok::<_, anyhow::Error>(parser.parse_listing_page(&link, &html, now))
            });
        }

        let mut listings = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(listing)) => listings.push(listing),
                Ok(Err(e)) => warn!("Skipping OLX listing: {:#}", e),
                Err(e) => error!("OLX listing task panicked: {}", e),
            }
        }

        info!("Scraping OLX completed, parsed {} listings", listings.len());
        Ok(listings)
    }
}
