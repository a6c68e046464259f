#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/netcash/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Korea Investment & Securities pricing provider.
//!
//! This crate provides a KIS Open API provider that implements the
//! [`DataProvider`] and [`PricingProvider`] traits from `netcash-core`.
//!
//! # Features
//!
//! - Client-credentials access token, refreshed 30 seconds before expiry
//! - Built-in rate limiting (50 ms between requests by default)
//! - Current price, PER, PBR and listed share count for a six-digit code
//!
//! # Example
//!
//! ```no_run
//! use netcash_kis::KisProvider;
//! use netcash_core::PricingProvider;
//!
//! # async fn example() -> netcash_core::Result<()> {
//! let provider = KisProvider::new("app_key", "app_secret");
//! let quote = provider.quote("005930").await?;
//! println!("Price: {:?}, PER: {:?}", quote.current_price, quote.per);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use netcash_core::types::TICKER_LEN;
use netcash_core::{DataProvider, PricingProvider, Quote, Result, ValuationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Default base URL (paper-trading domain).
const DEFAULT_BASE_URL: &str = "https://openapivts.koreainvestment.com:29443";

/// Provider name used in errors and logs.
const PROVIDER_NAME: &str = "KIS";

/// Transaction id of the domestic price inquiry.
const PRICE_TR_ID: &str = "FHKST01010100";

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 50;

/// Tokens are refreshed this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Environment variables read by [`KisProvider::from_env`].
const APP_KEY_ENV: &str = "KIS_APP_KEY";
const APP_SECRET_ENV: &str = "KIS_APP_SECRET";
const BASE_URL_ENV: &str = "KIS_BASE_URL";

/// Cached access token.
#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

/// Korea Investment & Securities pricing provider.
///
/// Implements [`DataProvider`] and [`PricingProvider`].
pub struct KisProvider {
    client: reqwest::Client,
    app_key: String,
    app_secret: String,
    base_url: String,
    token: Mutex<Option<AccessToken>>,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
}

impl fmt::Debug for KisProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KisProvider")
            .field("app_key", &"[REDACTED]")
            .field("app_secret", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl KisProvider {
    /// Create a new provider against the default base URL.
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self::with_client(client, app_key, app_secret)
    }

    /// Create a new provider with a custom HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token: Mutex::new(None),
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Create a provider from `KIS_APP_KEY`, `KIS_APP_SECRET` and the optional `KIS_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let (Some(key), Some(secret)) = (read(APP_KEY_ENV), read(APP_SECRET_ENV)) else {
            return Err(ValuationError::ProviderNotConfigured(format!(
                "{PROVIDER_NAME}: set {APP_KEY_ENV} and {APP_SECRET_ENV}"
            )));
        };

        let provider = Self::new(key, secret);
        Ok(match read(BASE_URL_ENV) {
            Some(url) => provider.with_base_url(url),
            None => provider,
        })
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the minimum interval between requests.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit_ms = rate_limit.as_millis() as u64;
        self
    }

    fn token_url(&self) -> String {
        format!("{}/oauth2/tokenP", self.base_url)
    }

    fn price_url(&self) -> String {
        format!(
            "{}/uapi/domestic-stock/v1/quotations/inquire-price",
            self.base_url
        )
    }

    /// Apply rate limiting before making a request.
    async fn apply_rate_limit(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = now.saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            Ordering::Relaxed,
        );
    }

    /// Return a cached access token, requesting a new one when stale.
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        self.apply_rate_limit().await;
        debug!("Requesting KIS access token");

        let request = TokenRequest {
            grant_type: "client_credentials",
            appkey: &self.app_key,
            appsecret: &self.app_secret,
        };
        let response = self
            .client
            .post(self.token_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| ValuationError::upstream(PROVIDER_NAME, e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ValuationError::upstream(
                PROVIDER_NAME,
                format!("token request rejected: HTTP {status}"),
            ));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ValuationError::upstream(
                PROVIDER_NAME,
                format!("token request failed: HTTP {status} {text}"),
            ));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ValuationError::upstream(PROVIDER_NAME, e.to_string()))?;
        let value = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ValuationError::upstream(PROVIDER_NAME, "token response missing access_token")
            })?;

        let token = AccessToken {
            value: value.clone(),
            expires_at: token_expiry(Instant::now(), body.expires_in)?,
        };
        *guard = Some(token);
        Ok(value)
    }
}

/// Expiry instant of a token issued at `issued` and valid for `expires_in` seconds.
fn token_expiry(issued: Instant, expires_in: Option<u64>) -> Result<Instant> {
    issued
        .checked_add(Duration::from_secs(expires_in.unwrap_or(0)))
        .ok_or_else(|| {
            ValuationError::upstream(
                PROVIDER_NAME,
                format!("token lifetime out of range: {expires_in:?}"),
            )
        })
}

impl DataProvider for KisProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "Korea Investment & Securities Open API for domestic stock quotes"
    }
}

#[async_trait]
impl PricingProvider for KisProvider {
    async fn quote(&self, ticker_code: &str) -> Result<Quote> {
        if ticker_code.len() != TICKER_LEN || !ticker_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValuationError::InvalidParameter(format!(
                "ticker code must be six digits: {ticker_code:?}"
            )));
        }

        let token = self.access_token().await?;
        self.apply_rate_limit().await;
        debug!(ticker_code, "Fetching KIS price");

        let response = self
            .client
            .get(self.price_url())
            .header("authorization", format!("Bearer {token}"))
            .header("appkey", &self.app_key)
            .header("appsecret", &self.app_secret)
            .header("tr_id", PRICE_TR_ID)
            .query(&[
                ("FID_COND_MRKT_DIV_CODE", "J"),
                ("FID_INPUT_ISCD", ticker_code),
            ])
            .send()
            .await
            .map_err(|e| ValuationError::upstream(PROVIDER_NAME, e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ValuationError::upstream(PROVIDER_NAME, "rate limited"));
        }
        if !response.status().is_success() {
            return Err(ValuationError::upstream(
                PROVIDER_NAME,
                format!("HTTP {} for {ticker_code}", response.status()),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ValuationError::upstream(PROVIDER_NAME, e.to_string()))?;
        parse_price_response(ticker_code, &text)
    }
}

/// Decode a price inquiry body into a [`Quote`].
fn parse_price_response(ticker_code: &str, text: &str) -> Result<Quote> {
    let body: PriceResponse = serde_json::from_str(text).map_err(|e| {
        ValuationError::upstream(PROVIDER_NAME, format!("undecodable price payload: {e}"))
    })?;

    if body.rt_cd.as_deref().is_some_and(|c| c != "0") {
        let message = body.msg1.unwrap_or_default();
        warn!(ticker_code, message = %message, "KIS returned an error");
        return Err(ValuationError::upstream(PROVIDER_NAME, message.trim().to_string()));
    }

    let output = body.output.ok_or_else(|| {
        ValuationError::upstream(PROVIDER_NAME, format!("empty price output for {ticker_code}"))
    })?;

    Ok(Quote {
        current_price: parse_number(output.stck_prpr.as_deref()),
        per: parse_number(output.per.as_deref()),
        pbr: parse_number(output.pbr.as_deref()),
        listed_share_count: parse_number(output.lstn_stcn.as_deref()),
    })
}

/// Parse a numeric string field; blanks and non-numbers are absent.
fn parse_number(raw: Option<&str>) -> Option<Decimal> {
    let text = raw?.trim().replace(',', "");
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text).ok()
}

// ============================================================================
// KIS API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    appkey: &'a str,
    appsecret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    rt_cd: Option<String>,
    msg1: Option<String>,
    output: Option<PriceOutput>,
}

#[derive(Debug, Deserialize)]
struct PriceOutput {
    /// Current price
    stck_prpr: Option<String>,
    per: Option<String>,
    pbr: Option<String>,
    /// Listed share count
    lstn_stcn: Option<String>,
}
