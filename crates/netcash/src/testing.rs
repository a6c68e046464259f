//! In-process providers for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use netcash_core::{
    CompanyRef, DataProvider, FilingProvider, LineItemSet, PricingProvider, Quote, ReportPeriod,
    Result, ShareStatus, ValuationError,
};

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub(crate) fn samsung() -> CompanyRef {
    CompanyRef::new("삼성전자", "00126380", Some("005930")).unwrap()
}

#[derive(Debug, Default)]
pub(crate) struct MockFilings {
    periods: Vec<ReportPeriod>,
    items: LineItemSet,
    status: ShareStatus,
    failure: Option<String>,
}

impl MockFilings {
    pub(crate) fn with_period(mut self, period: ReportPeriod) -> Self {
        self.periods.push(period);
        self
    }

    pub(crate) fn with_items(mut self, items: LineItemSet) -> Self {
        self.items = items;
        self
    }

    pub(crate) fn with_status(mut self, status: ShareStatus) -> Self {
        self.status = status;
        self
    }

    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    fn check(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(ValuationError::upstream(self.name(), message.clone())),
            None => Ok(()),
        }
    }
}

impl DataProvider for MockFilings {
    fn name(&self) -> &str {
        "MockFilings"
    }

    fn description(&self) -> &str {
        "In-memory filings"
    }
}

#[async_trait]
impl FilingProvider for MockFilings {
    async fn list_report_periods(
        &self,
        _registry_id: &str,
        fiscal_year: i32,
    ) -> Result<Vec<ReportPeriod>> {
        self.check()?;
        Ok(self
            .periods
            .iter()
            .filter(|p| p.fiscal_year == fiscal_year)
            .cloned()
            .collect())
    }

    async fn line_items(&self, _registry_id: &str, _period: &ReportPeriod) -> Result<LineItemSet> {
        self.check()?;
        Ok(self.items.clone())
    }

    async fn share_status(
        &self,
        _registry_id: &str,
        _period: &ReportPeriod,
    ) -> Result<ShareStatus> {
        self.check()?;
        Ok(self.status.clone())
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockPricing {
    quote: Quote,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockPricing {
    pub(crate) fn with_quote(mut self, quote: Quote) -> Self {
        self.quote = quote;
        self
    }

    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataProvider for MockPricing {
    fn name(&self) -> &str {
        "MockPricing"
    }

    fn description(&self) -> &str {
        "In-memory quotes"
    }
}

#[async_trait]
impl PricingProvider for MockPricing {
    async fn quote(&self, _ticker_code: &str) -> Result<Quote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(ValuationError::upstream(self.name(), message.clone())),
            None => Ok(self.quote.clone()),
        }
    }
}
