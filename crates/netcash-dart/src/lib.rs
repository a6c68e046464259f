#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/netcash/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! OpenDART filing provider.
//!
//! This crate provides access to the Korean Financial Supervisory Service's
//! electronic disclosure API:
//!
//! - Periodic report discovery for a fiscal year
//! - Full account lists of a disclosed report
//! - Share issuance and treasury totals of a disclosed report
//!
//! # Example
//!
//! ```no_run
//! use netcash_dart::DartProvider;
//! use netcash_core::{FilingProvider, ReportKind, ReportPeriod};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = DartProvider::new("your_crtfc_key");
//!
//!     let periods = provider.list_report_periods("00126380", 2024).await?;
//!     for period in &periods {
//!         println!("{period} disclosed on {:?}", period.disclosure_date);
//!     }
//!
//!     let annual = ReportPeriod::new(2024, ReportKind::Annual);
//!     let items = provider.line_items("00126380", &annual).await?;
//!     println!("{} line items", items.len());
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use netcash_core::{
    DataProvider, FilingProvider, LineItem, LineItemSet, ReportKind, ReportPeriod, Result,
    ShareStatus, StatementScope, StatementType, ValuationError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// OpenDART API base URL
const DART_BASE_URL: &str = "https://opendart.fss.or.kr/api";

/// Provider name used in errors and logs
const PROVIDER_NAME: &str = "OpenDART";

/// Environment variable holding the API key
const DART_KEY_ENV: &str = "DART_KEY";

/// Default minimum interval between requests
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Maximum page size accepted by the disclosure search endpoint
const LIST_PAGE_COUNT: u32 = 100;

/// Status code for a successful response
const STATUS_OK: &str = "000";

/// Status code for "no data"
const STATUS_NO_DATA: &str = "013";

/// Share class label of common stock in share status rows
const COMMON_SHARE_LABEL: &str = "보통주";

/// Rate limiter to space out requests to the API
#[derive(Debug)]
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// OpenDART filing provider.
///
/// Implements [`FilingProvider`] on top of the OpenDART REST endpoints.
pub struct DartProvider {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for DartProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DartProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl DartProvider {
    /// Create a new OpenDART provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");

        Self::with_client(client, api_key)
    }

    /// Create a new OpenDART provider with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            api_key: api_key.into(),
            base_url: DART_BASE_URL.to_string(),
        }
    }

    /// Create a provider from the `DART_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        match std::env::var(DART_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(ValuationError::ProviderNotConfigured(format!(
                "{PROVIDER_NAME}: set {DART_KEY_ENV}"
            ))),
        }
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the URL of an endpoint.
    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    /// Call a list-style endpoint and unwrap the status envelope.
    ///
    /// A "no data" status yields an empty page rather than an error.
    async fn fetch_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<DartPage<T>> {
        self.rate_limiter.lock().await.wait().await;

        let url = self.url(endpoint);
        debug!(endpoint, "OpenDART request");

        let mut query: Vec<(&str, String)> = vec![("crtfc_key", self.api_key.clone())];
        query.extend(params.iter().cloned());

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ValuationError::upstream(PROVIDER_NAME, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ValuationError::upstream(
                PROVIDER_NAME,
                format!("{endpoint}: HTTP {}", response.status()),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ValuationError::upstream(PROVIDER_NAME, e.to_string()))?;

        parse_envelope(endpoint, &text)
    }

    /// Fetch every periodic disclosure filed between two dates.
    async fn fetch_disclosures(
        &self,
        registry_id: &str,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DisclosureRow>> {
        let mut rows = Vec::new();
        let mut page_no = 1;

        loop {
            let params = [
                ("corp_code", registry_id.to_string()),
                ("bgn_de", begin.format("%Y%m%d").to_string()),
                ("end_de", end.format("%Y%m%d").to_string()),
                ("pblntf_ty", "A".to_string()),
                ("page_no", page_no.to_string()),
                ("page_count", LIST_PAGE_COUNT.to_string()),
            ];
            let page: DartPage<DisclosureRow> = self.fetch_page("list.json", &params).await?;
            rows.extend(page.list);

            match next_page(page_no, page.total_page) {
                Some(next) => page_no = next,
                None => break,
            }
        }

        Ok(rows)
    }

    /// Fetch all accounts of a report for one statement division.
    async fn fetch_accounts(
        &self,
        registry_id: &str,
        period: &ReportPeriod,
        scope: StatementScope,
    ) -> Result<Vec<AccountRow>> {
        let fs_div = match scope {
            StatementScope::Consolidated => "CFS",
            StatementScope::Separate => "OFS",
        };
        let params = [
            ("corp_code", registry_id.to_string()),
            ("bsns_year", period.fiscal_year.to_string()),
            ("reprt_code", period.report_code().to_string()),
            ("fs_div", fs_div.to_string()),
        ];
        let page: DartPage<AccountRow> = self.fetch_page("fnlttSinglAcntAll.json", &params).await?;
        Ok(page.list)
    }
}

impl DataProvider for DartProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "OpenDART electronic disclosure API for periodic reports and share status"
    }
}

#[async_trait]
impl FilingProvider for DartProvider {
    async fn list_report_periods(
        &self,
        registry_id: &str,
        fiscal_year: i32,
    ) -> Result<Vec<ReportPeriod>> {
        // The annual report of a year is filed in the first months of the next one.
        let begin = NaiveDate::from_ymd_opt(fiscal_year, 1, 1).ok_or_else(|| {
            ValuationError::InvalidParameter(format!("fiscal year {fiscal_year}"))
        })?;
        let end = NaiveDate::from_ymd_opt(fiscal_year + 1, 12, 31).ok_or_else(|| {
            ValuationError::InvalidParameter(format!("fiscal year {fiscal_year}"))
        })?;

        let rows = self.fetch_disclosures(registry_id, begin, end).await?;
        let periods = collect_periods(fiscal_year, &rows);
        debug!(
            registry_id,
            fiscal_year,
            disclosed = periods.len(),
            "Listed periodic disclosures"
        );
        Ok(periods)
    }

    async fn line_items(&self, registry_id: &str, period: &ReportPeriod) -> Result<LineItemSet> {
        let mut scope = StatementScope::Consolidated;
        let mut rows = self.fetch_accounts(registry_id, period, scope).await?;

        if let Some(fallback) = fallback_scope(&rows) {
            debug!(registry_id, %period, "No consolidated statements, using separate");
            scope = fallback;
            rows = self.fetch_accounts(registry_id, period, scope).await?;
        }

        let items: LineItemSet = rows
            .iter()
            .filter_map(|row| row.to_line_item(scope))
            .collect();
        debug!(registry_id, %period, count = items.len(), "Fetched line items");
        Ok(items)
    }

    async fn share_status(&self, registry_id: &str, period: &ReportPeriod) -> Result<ShareStatus> {
        let params = [
            ("corp_code", registry_id.to_string()),
            ("bsns_year", period.fiscal_year.to_string()),
            ("reprt_code", period.report_code().to_string()),
        ];
        let page: DartPage<ShareStatusRow> =
            self.fetch_page("stockTotqySttus.json", &params).await?;

        Ok(select_common_shares(&page.list)
            .map(ShareStatusRow::to_share_status)
            .unwrap_or_default())
    }
}

// =============================================================================
// Parsing helpers
// =============================================================================

/// Parse a disclosed amount.
///
/// Commas are ignored, parenthesised values are negative, and blank, `-` or
/// `NaN` cells are treated as absent.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let text: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if text.is_empty() || text == "-" || text.eq_ignore_ascii_case("nan") {
        return None;
    }

    let text = match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => format!("-{}", inner.trim()),
        None => text,
    };

    Decimal::from_str(&text).ok()
}

fn parse_optional(raw: Option<&String>) -> Option<Decimal> {
    raw.and_then(|s| parse_amount(s))
}

/// Decode a response body and check its status envelope.
fn parse_envelope<T: DeserializeOwned>(endpoint: &str, text: &str) -> Result<DartPage<T>> {
    let envelope: DartEnvelope<T> = serde_json::from_str(text).map_err(|e| {
        ValuationError::upstream(PROVIDER_NAME, format!("{endpoint}: undecodable payload: {e}"))
    })?;

    match envelope.status.as_str() {
        STATUS_OK => Ok(DartPage {
            list: envelope.list.unwrap_or_default(),
            total_page: envelope.total_page,
        }),
        STATUS_NO_DATA => Ok(DartPage {
            list: Vec::new(),
            total_page: None,
        }),
        status => {
            let message = envelope.message.unwrap_or_default();
            warn!(endpoint, status, message = %message, "OpenDART returned an error status");
            Err(ValuationError::upstream(
                PROVIDER_NAME,
                format!("{endpoint}: status {status} {message}").trim().to_string(),
            ))
        }
    }
}

/// Page to request after `page_no`, or `None` once `total_page` is reached.
///
/// A missing page count means a single page.
fn next_page(page_no: u32, total_page: Option<u32>) -> Option<u32> {
    (page_no < total_page.unwrap_or(1)).then_some(page_no + 1)
}

/// Scope to fetch when the consolidated statements came back empty.
fn fallback_scope(consolidated: &[AccountRow]) -> Option<StatementScope> {
    consolidated.is_empty().then_some(StatementScope::Separate)
}

/// Classify a periodic report name such as `"[기재정정]분기보고서 (2024.09)"`.
///
/// Returns the fiscal year and kind, assuming a December fiscal year-end.
fn classify_report_name(report_name: &str) -> Option<(i32, ReportKind)> {
    let open = report_name.rfind('(')?;
    let close = report_name[open..].find(')')? + open;
    let (year, month) = report_name[open + 1..close].trim().split_once('.')?;
    let year: i32 = year.trim().parse().ok()?;
    let month: u32 = month.trim().parse().ok()?;

    let title = &report_name[..open];
    let kind = if title.contains("사업보고서") {
        ReportKind::Annual
    } else if title.contains("반기보고서") {
        ReportKind::Semiannual
    } else if title.contains("분기보고서") {
        match month {
            3 => ReportKind::Q1,
            9 => ReportKind::Q3,
            _ => return None,
        }
    } else {
        return None;
    };

    Some((year, kind))
}

/// Build the disclosed periods of one fiscal year, earliest receipt per kind.
fn collect_periods(fiscal_year: i32, rows: &[DisclosureRow]) -> Vec<ReportPeriod> {
    let mut earliest: HashMap<ReportKind, NaiveDate> = HashMap::new();

    for row in rows {
        let Some((year, kind)) = classify_report_name(&row.report_nm) else {
            continue;
        };
        if year != fiscal_year {
            continue;
        }
        let Ok(date) = NaiveDate::parse_from_str(row.rcept_dt.trim(), "%Y%m%d") else {
            warn!(report = %row.report_nm, rcept_dt = %row.rcept_dt, "Unparseable receipt date");
            continue;
        };
        earliest
            .entry(kind)
            .and_modify(|d| *d = (*d).min(date))
            .or_insert(date);
    }

    ReportKind::ALL
        .into_iter()
        .filter_map(|kind| {
            earliest
                .get(&kind)
                .map(|date| ReportPeriod::new(fiscal_year, kind).disclosed_on(*date))
        })
        .collect()
}

/// Pick the common-share row, or the first row when no row is labelled.
fn select_common_shares(rows: &[ShareStatusRow]) -> Option<&ShareStatusRow> {
    rows.iter()
        .find(|r| r.se.as_deref().map(str::trim) == Some(COMMON_SHARE_LABEL))
        .or_else(|| rows.first())
}

// =============================================================================
// OpenDART API Response Types
// =============================================================================

/// Status envelope shared by all list endpoints.
#[derive(Debug, Deserialize)]
struct DartEnvelope<T> {
    status: String,
    #[serde(default)]
    message: Option<String>,
    list: Option<Vec<T>>,
    #[serde(default)]
    total_page: Option<u32>,
}

/// Unwrapped page of rows.
#[derive(Debug)]
struct DartPage<T> {
    list: Vec<T>,
    total_page: Option<u32>,
}

/// A row of the disclosure search endpoint.
#[derive(Debug, Deserialize)]
struct DisclosureRow {
    /// Report title, e.g. "사업보고서 (2024.12)"
    report_nm: String,
    /// Receipt date as YYYYMMDD
    rcept_dt: String,
}

/// A row of the full account list endpoint.
#[derive(Debug, Deserialize)]
struct AccountRow {
    /// Statement division: BS, IS, CIS, CF, SCE
    sj_div: String,
    /// Account name
    account_nm: String,
    /// Current period amount
    #[serde(default)]
    thstrm_amount: Option<String>,
    /// Current period cumulative amount (interim income statements)
    #[serde(default)]
    thstrm_add_amount: Option<String>,
    /// Reporting currency
    #[serde(default)]
    currency: Option<String>,
}

impl AccountRow {
    fn to_line_item(&self, scope: StatementScope) -> Option<LineItem> {
        let statement_type = match self.sj_div.trim() {
            "BS" => StatementType::BalanceSheet,
            "IS" | "CIS" => StatementType::IncomeStatement,
            _ => return None,
        };
        let value = parse_optional(self.thstrm_amount.as_ref())
            .or_else(|| parse_optional(self.thstrm_add_amount.as_ref()))?;
        let currency = self
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("KRW");

        Some(
            LineItem::balance_sheet(self.account_nm.trim(), scope, value)
                .with_statement_type(statement_type)
                .with_currency(currency),
        )
    }
}

/// A row of the share status endpoint, one per share class.
#[derive(Debug, Deserialize)]
struct ShareStatusRow {
    /// Share class label
    #[serde(default)]
    se: Option<String>,
    /// Shares issued to date
    #[serde(default)]
    now_to_isu_stock_totqy: Option<String>,
    /// Shares decreased to date
    #[serde(default)]
    now_to_dcrs_stock_totqy: Option<String>,
    /// Treasury shares
    #[serde(default)]
    tesstk_co: Option<String>,
    /// Distributed (outstanding) shares
    #[serde(default)]
    distb_stock_co: Option<String>,
}

impl ShareStatusRow {
    fn to_share_status(&self) -> ShareStatus {
        ShareStatus {
            issued_total: parse_optional(self.now_to_isu_stock_totqy.as_ref()),
            decrease_total: parse_optional(self.now_to_dcrs_stock_totqy.as_ref()),
            treasury_shares_count: parse_optional(self.tesstk_co.as_ref()),
            distributed_count: parse_optional(self.distb_stock_co.as_ref()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
