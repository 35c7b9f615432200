//! Runtime configuration read from environment variables (and `.env`).

use anyhow::{Context, Result};

use crate::notifier::{MailCredentials, MailSettings};
use crate::scrapers::OlxScraper;

const DEFAULT_DATABASE_URL: &str = "sqlite:database/listings.db";
const DEFAULT_STREET_NAMES_PATH: &str = "street_names_krakow";
const DEFAULT_SCHEDULE: &str = "0 */5 * * * *";
const DEFAULT_CITY: &str = "Kraków";
const DEFAULT_OLX_CATEGORY: &str = "stancje-pokoje";
const DEFAULT_OLX_CITY: &str = "krakow";
const DEFAULT_OLX_MAX_PRICE: u32 = 1500;

#[derive(Debug, Clone)]
pub struct FacebookSettings {
    pub group_id: String,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub street_names_path: String,
    /// Cron expression with seconds, as understood by `tokio-cron-scheduler`
    pub check_schedule: String,
    /// City name stored on every listing
    pub city: String,
    pub olx_search_url: String,
    pub facebook: Option<FacebookSettings>,
    pub mail: Option<MailSettings>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let olx_search_url = match get("OLX_SEARCH_URL") {
            Some(url) => url,
            None => {
                let max_price = get("OLX_MAX_PRICE")
                    .map(|value| value.parse::<u32>())
                    .transpose()
                    .context("OLX_MAX_PRICE must be a whole number")?
                    .unwrap_or(DEFAULT_OLX_MAX_PRICE);
                OlxScraper::search_url(
                    &get_or("OLX_CATEGORY", DEFAULT_OLX_CATEGORY),
                    &get_or("OLX_CITY", DEFAULT_OLX_CITY),
                    Some(max_price),
                )
            }
        };

        let facebook = match (get("FACEBOOK_GROUP_ID"), get("FACEBOOK_ACCESS_TOKEN")) {
            (Some(group_id), Some(access_token)) => Some(FacebookSettings {
                group_id,
                access_token,
            }),
            _ => None,
        };

        let credentials = match (
            get("GMAIL_CLIENT_ID"),
            get("GMAIL_CLIENT_SECRET"),
            get("GMAIL_REFRESH_TOKEN"),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Some(MailCredentials::RefreshToken {
                    client_id,
                    client_secret,
                    refresh_token,
                })
            }
            _ => get("GMAIL_ACCESS_TOKEN").map(MailCredentials::AccessToken),
        };

        let mail = match (get("MAIL_FROM"), get("MAIL_TO"), credentials) {
            (Some(from), Some(to), Some(credentials)) => Some(MailSettings {
                from,
                to,
                credentials,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: get_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            street_names_path: get_or("STREET_NAMES_PATH", DEFAULT_STREET_NAMES_PATH),
            check_schedule: get_or("CHECK_SCHEDULE", DEFAULT_SCHEDULE),
            city: get_or("CITY", DEFAULT_CITY),
            olx_search_url,
            facebook,
            mail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]).unwrap();

        assert_eq!(config.database_url, "sqlite:database/listings.db");
        assert_eq!(config.check_schedule, "0 */5 * * * *");
        assert_eq!(config.city, "Kraków");
        assert!(config.olx_search_url.starts_with(
            "https://www.olx.pl/nieruchomosci/stancje-pokoje/krakow/"
        ));
        assert!(config.olx_search_url.ends_with("=1500"));
        assert!(config.facebook.is_none());
        assert!(config.mail.is_none());
    }

    #[test]
    fn city_can_be_overridden() {
        assert_eq!(config(&[("CITY", "Warszawa")]).unwrap().city, "Warszawa");
        assert_eq!(config(&[("CITY", " ")]).unwrap().city, "Kraków");
    }

    #[test]
    fn explicit_search_url_wins() {
        let config = config(&[
            ("OLX_SEARCH_URL", "https://www.olx.pl/nieruchomosci/mieszkania/krakow/"),
            ("OLX_MAX_PRICE", "not a number"),
        ])
        .unwrap();
        assert_eq!(
            config.olx_search_url,
            "https://www.olx.pl/nieruchomosci/mieszkania/krakow/"
        );
    }

    #[test]
    fn invalid_max_price_is_an_error() {
        assert!(config(&[("OLX_MAX_PRICE", "tanio")]).is_err());
    }

    #[test]
    fn refresh_credentials_take_precedence() {
        let config = config(&[
            ("MAIL_FROM", "bot@example.com"),
            ("MAIL_TO", "me@example.com"),
            ("GMAIL_ACCESS_TOKEN", "static"),
            ("GMAIL_CLIENT_ID", "id"),
            ("GMAIL_CLIENT_SECRET", "secret"),
            ("GMAIL_REFRESH_TOKEN", "refresh"),
        ])
        .unwrap();

        let mail = config.mail.unwrap();
        assert_eq!(mail.to, "me@example.com");
        assert!(matches!(
            mail.credentials,
            MailCredentials::RefreshToken { ref refresh_token, .. } if refresh_token == "refresh"
        ));
    }

    #[test]
    fn mail_needs_recipient() {
        let config = config(&[
            ("MAIL_FROM", "bot@example.com"),
            ("GMAIL_ACCESS_TOKEN", "static"),
            ("MAIL_TO", "  "),
        ])
        .unwrap();
        assert!(config.mail.is_none());
    }

    #[test]
    fn facebook_needs_group_and_token() {
        assert!(config(&[("FACEBOOK_GROUP_ID", "1")]).unwrap().facebook.is_none());
        let config = config(&[("FACEBOOK_GROUP_ID", "1"), ("FACEBOOK_ACCESS_TOKEN", "t")]).unwrap();
        assert_eq!(config.facebook.unwrap().group_id, "1");
    }
}
