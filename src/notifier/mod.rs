//! # Email Notifications
//!
//! This module sends the operator a digest email whenever a check finds new
//! rental listings. Messages go out through the Gmail REST API as raw RFC 822
//! messages, so no SMTP relay is needed.
//!
//! ## Digest Structure
//!
//! One email per check, never one per listing:
//! - **Subject**: "New Offers Found"
//! - **Body**: one block per listing with title, price, street and district
//!   (when extracted) and the listing URL
//!
//! ## Credentials
//!
//! Either a short-lived `GMAIL_ACCESS_TOKEN`, or the OAuth client triple
//! `GMAIL_CLIENT_ID` / `GMAIL_CLIENT_SECRET` / `GMAIL_REFRESH_TOKEN`, in which
//! case a fresh access token is requested through the `oauth2` refresh-token
//! grant before every send.
//!
//! ## Optional Integration
//!
//! Without `MAIL_TO`, `MAIL_FROM` and credentials the notifier is disabled:
//! listings are still stored and the skipped digest is logged.

use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{AuthUrl, ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use reqwest::Client;
use tracing::{error, info, warn};

use crate::models::{GmailMessage, GmailSent, Listing};

const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SUBJECT: &str = "New Offers Found";

/// How the notifier authenticates against the Gmail API.
#[derive(Debug, Clone)]
pub enum MailCredentials {
    /// A ready-to-use OAuth access token.
    AccessToken(String),
    /// OAuth client credentials exchanged for an access token before each send.
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

/// Sender, recipient and credentials for digest emails.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub from: String,
    pub to: String,
    pub credentials: MailCredentials,
}

/// Gmail notification client for new listings.
///
/// Holds a reusable HTTP client and the optional mail settings. When the
/// settings are `None` every send is skipped with a log line, so the rest of
/// the pipeline works the same with or without email configured.
///
/// Cloning is cheap: `reqwest::Client` shares its connection pool.
pub struct MailNotifier {
    /// Reusable HTTP client for token and send requests.
    client: Client,

    /// `None` disables notifications.
    settings: Option<MailSettings>,

    token_url: String,
    send_url: String,
}

impl MailNotifier {
    /// Creates a notifier. Pass `None` to disable email delivery.
    pub fn new(settings: Option<MailSettings>) -> Self {
        if settings.is_none() {
            warn!("Mail settings not configured - email notifications will be disabled");
        }

        Self {
            client: Client::new(),
            settings,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            send_url: GMAIL_SEND_URL.to_string(),
        }
    }

    /// Points the notifier at other OAuth token and message send endpoints.
    pub fn with_endpoints(mut self, token_url: &str, send_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.send_url = send_url.to_string();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.is_some()
    }

    /// Sends one digest email listing every new offer.
    ///
    /// ## Behavior
    ///
    /// - **Empty list**: nothing is sent
    /// - **Disabled notifier**: nothing is sent, an info line is logged
    /// - **Token or network failures**: propagated as `anyhow::Error`
    /// - **Non-success status from Gmail**: logged and returned as an error
    ///
    /// Only `Ok(())` from an enabled notifier means the digest was delivered.
    pub async fn send_digest(&self, listings: &[Listing]) -> Result<()> {
        if listings.is_empty() {
            return Ok(());
        }

        let Some(settings) = &self.settings else {
            info!(
                "Email notifications disabled, skipping digest of {} listings",
                listings.len()
            );
            return Ok(());
        };

        let body = render_digest(listings);
        let message = build_message(&settings.from, &settings.to, SUBJECT, &body);
        let payload = GmailMessage {
            raw: URL_SAFE.encode(message),
        };

        let token = self.access_token(&settings.credentials).await?;
        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Failed to send digest email: {}", status);
            bail!("Gmail rejected the digest with status {status}");
        }

        let sent: GmailSent = response.json().await?;
        info!(
            "Digest email {} sent for {} listings",
            sent.id,
            listings.len()
        );

        Ok(())
    }

    async fn access_token(&self, credentials: &MailCredentials) -> Result<String> {
        match credentials {
            MailCredentials::AccessToken(token) => Ok(token.clone()),
            MailCredentials::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
            } => {
                let client = BasicClient::new(
                    ClientId::new(client_id.clone()),
                    Some(ClientSecret::new(client_secret.clone())),
                    AuthUrl::new(GOOGLE_AUTH_URL.to_string())?,
                    Some(TokenUrl::new(self.token_url.clone())?),
                );

                let token = client
                    .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
                    .request_async(async_http_client)
                    .await?;

                Ok(token.access_token().secret().clone())
            }
        }
    }
}

impl Clone for MailNotifier {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            settings: self.settings.clone(),
            token_url: self.token_url.clone(),
            send_url: self.send_url.clone(),
        }
    }
}

/// Plain-text digest body.
pub fn render_digest(listings: &[Listing]) -> String {
    let mut body = String::from("New offers found:\n");

    for listing in listings {
        let price = listing
            .price
            .map_or_else(|| "unknown".to_string(), |price| format!("{price:.0} zł"));
        let location = [listing.street.as_deref(), listing.district.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        let location = if location.is_empty() {
            "unknown"
        } else {
            location.as_str()
        };

        body.push_str(&format!(
            "\n{}\n  Price: {}\n  Location: {}\n  Offer URL: {}\n",
            listing.title, price, location, listing.url
        ));
    }

    body
}

/// Minimal RFC 822 message with a UTF-8 plain-text body.
pub fn build_message(from: &str, to: &str, subject: &str, body: &str) -> String {
    format!(
        "From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\nMIME-Version: 1.0\r\n\
         Content-Type: text/plain; charset=\"UTF-8\"\r\nContent-Transfer-Encoding: 8bit\r\n\r\n{body}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(url: &str, street: Option<&str>, district: Option<&str>) -> Listing {
        let mut listing = Listing::new("olx", url, "Pokój jednoosobowy");
        listing.price = Some(1350.0);
        listing.street = street.map(str::to_string);
        listing.district = district.map(str::to_string);
        listing
    }

    #[test]
    fn digest_lists_every_listing() {
        let body = render_digest(&[
            listing("https://www.olx.pl/1", Some("Karmelicka"), Some("Krowodrza")),
            listing("https://www.olx.pl/2", None, Some("Dębniki")),
            listing("https://www.olx.pl/3", None, None),
        ]);

        assert!(body.starts_with("New offers found:\n"));
        assert!(body.contains("  Location: Karmelicka, Krowodrza\n  Offer URL: https://www.olx.pl/1\n"));
        assert!(body.contains("  Location: Dębniki\n"));
        assert!(body.contains("  Location: unknown\n  Offer URL: https://www.olx.pl/3\n"));
        assert_eq!(body.matches("Price: 1350 zł").count(), 3);
    }

    #[test]
    fn message_has_headers_then_body() {
        let message = build_message("a@example.com", "b@example.com", SUBJECT, "Treść");
        let (headers, body) = message.split_once("\r\n\r\n").unwrap();

        assert!(headers.starts_with("From: a@example.com\r\nTo: b@example.com\r\n"));
        assert!(headers.contains("Subject: New Offers Found"));
        assert!(headers.contains("charset=\"UTF-8\""));
        assert_eq!(body, "Treść");
    }

    #[test]
    fn raw_payload_is_url_safe_base64() {
        let message = build_message("a@example.com", "b@example.com", SUBJECT, "ą?>");
        let raw = URL_SAFE.encode(&message);

        assert!(!raw.contains('+') && !raw.contains('/'));
        assert_eq!(URL_SAFE.decode(raw).unwrap(), message.into_bytes());
    }

    // Nothing listens on the discard port, so requests fail fast.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn settings(credentials: MailCredentials) -> Option<MailSettings> {
        Some(MailSettings {
            from: "bot@example.com".to_string(),
            to: "me@example.com".to_string(),
            credentials,
        })
    }

    #[tokio::test]
    async fn failed_token_refresh_is_an_error() {
        let notifier = MailNotifier::new(settings(MailCredentials::RefreshToken {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
        }))
        .with_endpoints(&format!("{UNREACHABLE}/token"), &format!("{UNREACHABLE}/send"));

        let result = notifier
            .send_digest(&[listing("https://www.olx.pl/1", None, None)])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failed_send_is_an_error() {
        let notifier = MailNotifier::new(settings(MailCredentials::AccessToken(
            "token".to_string(),
        )))
        .with_endpoints(&format!("{UNREACHABLE}/token"), &format!("{UNREACHABLE}/send"));

        assert!(notifier.is_enabled());
        let result = notifier
            .send_digest(&[listing("https://www.olx.pl/1", None, None)])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn disabled_notifier_skips_sending() {
        let notifier = MailNotifier::new(None);
        assert!(!notifier.is_enabled());
        notifier
            .send_digest(&[listing("https://www.olx.pl/1", None, None)])
            .await
            .unwrap();
    }
}
