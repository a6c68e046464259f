//! Provider traits for the upstream collaborators.
//!
//! This module defines the core provider traits:
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`FilingProvider`] - Disclosed reports, their line items and share status
//! - [`PricingProvider`] - Current price, ratios and listed share count
//!
//! Implementations own authentication, timeouts and rate limiting. Any
//! failure they cannot recover from is reported as
//! [`ValuationError::UpstreamUnavailable`](crate::ValuationError::UpstreamUnavailable).

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    period::ReportPeriod,
    types::{LineItemSet, Quote, ShareStatus},
};

/// Base trait for all data providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "OpenDART").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for regulatory filings.
#[async_trait]
pub trait FilingProvider: DataProvider {
    /// Lists the report periods of a fiscal year.
    ///
    /// Periods that have not been filed may be omitted or returned with a
    /// `None` disclosure date.
    async fn list_report_periods(
        &self,
        registry_id: &str,
        fiscal_year: i32,
    ) -> Result<Vec<ReportPeriod>>;

    /// Fetches the raw line items of a disclosed report.
    ///
    /// Amounts are returned in base currency units.
    async fn line_items(&self, registry_id: &str, period: &ReportPeriod) -> Result<LineItemSet>;

    /// Fetches the common-share status of a disclosed report.
    async fn share_status(&self, registry_id: &str, period: &ReportPeriod) -> Result<ShareStatus>;
}

/// Provider for market prices.
#[async_trait]
pub trait PricingProvider: DataProvider {
    /// Fetches a quote for a six-digit ticker code.
    async fn quote(&self, ticker_code: &str) -> Result<Quote>;
}
