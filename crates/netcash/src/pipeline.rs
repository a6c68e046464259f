//! End-to-end valuation requests.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use netcash_core::{
    CompanyRef, FilingProvider, NetCashResult, PricingProvider, Quote, ReportPeriod, Result,
    ShareCountSource, ShareStatus, ValuationError, ValuationResult,
};

use crate::calculator::compute_net_cash;
use crate::config::ValuationConfig;
use crate::resolver::{CorpRegistry, IdentifierResolver};
use crate::selector::{ReportSelector, SelectionMode};
use crate::shares::resolve_share_count;
use crate::valuation::aggregate;

/// Runs valuation requests against a registry and a set of providers.
///
/// A filing provider is required. The pricing provider is optional; without
/// one, price and ratios are empty and the external share-count tier is
/// unavailable.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use netcash::{CorpRegistry, SelectionMode, ValuationPipeline};
///
/// let registry = CorpRegistry::from_entries([("삼성전자", "00126380", Some("005930"))])?;
/// let pipeline = ValuationPipeline::new(Arc::new(registry))
///     .with_dart("dart-api-key")
///     .with_kis("app-key", "app-secret");
///
/// let result = pipeline
///     .compute_valuation("삼성전자", Some(2024), SelectionMode::Auto)
///     .await?;
/// println!("{} {}", result.net_cash_per_share_rounded(2), result.share_count_source);
/// ```
pub struct ValuationPipeline {
    resolver: IdentifierResolver,
    filing_provider: Option<Arc<dyn FilingProvider>>,
    pricing_provider: Option<Arc<dyn PricingProvider>>,
    config: ValuationConfig,
}

impl std::fmt::Debug for ValuationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValuationPipeline")
            .field("registry_entries", &self.resolver.registry().len())
            .field(
                "filing_provider",
                &self.filing_provider.as_ref().map(|p| p.name()),
            )
            .field(
                "pricing_provider",
                &self.pricing_provider.as_ref().map(|p| p.name()),
            )
            .field("config", &self.config)
            .finish()
    }
}

impl ValuationPipeline {
    /// Create a pipeline over a company registry, with no providers.
    #[must_use]
    pub fn new(registry: Arc<CorpRegistry>) -> Self {
        Self {
            resolver: IdentifierResolver::new(registry),
            filing_provider: None,
            pricing_provider: None,
            config: ValuationConfig::default(),
        }
    }

    /// Replace the settings.
    #[must_use]
    pub fn with_config(mut self, config: ValuationConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the settings.
    #[must_use]
    pub const fn config(&self) -> &ValuationConfig {
        &self.config
    }

    /// Register the filing provider, replacing any previous one.
    pub fn register_filing(&mut self, provider: Arc<dyn FilingProvider>) {
        debug!(provider = provider.name(), "Registering filing provider");
        self.filing_provider = Some(provider);
    }

    /// Register the pricing provider, replacing any previous one.
    pub fn register_pricing(&mut self, provider: Arc<dyn PricingProvider>) {
        debug!(provider = provider.name(), "Registering pricing provider");
        self.pricing_provider = Some(provider);
    }

    /// Builder form of [`Self::register_filing`].
    #[must_use]
    pub fn with_filing(mut self, provider: Arc<dyn FilingProvider>) -> Self {
        self.register_filing(provider);
        self
    }

    /// Builder form of [`Self::register_pricing`].
    #[must_use]
    pub fn with_pricing(mut self, provider: Arc<dyn PricingProvider>) -> Self {
        self.register_pricing(provider);
        self
    }

    /// Resolve a company query without valuing it.
    pub fn resolve(&self, query: &str) -> Result<CompanyRef> {
        self.resolver.resolve(query)
    }

    /// Value a company.
    ///
    /// Resolves `query`, then runs the filing branch (report selection, line
    /// items, share status) and the quote branch concurrently and joins them.
    /// The first failure of either branch ends the request.
    #[instrument(skip(self))]
    pub async fn compute_valuation(
        &self,
        query: &str,
        fiscal_year: Option<i32>,
        mode: SelectionMode,
    ) -> Result<ValuationResult> {
        let Some(filings) = self.filing_provider.clone() else {
            return Err(ValuationError::ProviderNotConfigured(
                "No filing provider registered".to_string(),
            ));
        };

        let company = self.resolver.resolve(query)?;
        let fiscal_year = self.config.target_year(fiscal_year);

        let ((period, net_cash, status), quote) = futures::try_join!(
            self.filing_branch(filings, &company, fiscal_year, mode),
            self.quote_branch(&company),
        )?;

        let listed_share_count = quote.as_ref().and_then(|q| q.listed_share_count);
        let shares = resolve_share_count(&company.registry_id, &status, listed_share_count)?;
        if shares.source != ShareCountSource::DartDirect {
            warn!(
                registry_id = %company.registry_id,
                source = %shares.source,
                "Share count taken from a fallback tier"
            );
        }

        aggregate(company, net_cash, shares, quote.as_ref(), period)
    }

    async fn filing_branch(
        &self,
        filings: Arc<dyn FilingProvider>,
        company: &CompanyRef,
        fiscal_year: i32,
        mode: SelectionMode,
    ) -> Result<(ReportPeriod, NetCashResult, ShareStatus)> {
        let period = ReportSelector::new(filings.clone())
            .select(company, fiscal_year, mode)
            .await?;

        let extractor = self.config.extractor();
        let (fields, status) = futures::try_join!(
            extractor.fetch_and_extract(filings.as_ref(), &company.registry_id, &period),
            filings.share_status(&company.registry_id, &period),
        )?;

        Ok((period, compute_net_cash(&fields), status))
    }

    async fn quote_branch(&self, company: &CompanyRef) -> Result<Option<Quote>> {
        let Some(ticker) = company.ticker_code.as_deref() else {
            debug!(registry_id = %company.registry_id, "Unlisted company, skipping quote");
            return Ok(None);
        };
        let Some(pricing) = &self.pricing_provider else {
            debug!(ticker, "No pricing provider registered, skipping quote");
            return Ok(None);
        };

        let quote = pricing.quote(ticker).await?;
        debug!(provider = pricing.name(), ticker, "Fetched quote");
        Ok(Some(quote))
    }

    // Builder methods for the bundled providers

    /// Use OpenDART as the filing provider.
    #[cfg(feature = "dart")]
    #[must_use]
    pub fn with_dart(self, api_key: &str) -> Self {
        self.with_filing(Arc::new(netcash_dart::DartProvider::new(api_key)))
    }

    /// Use Korea Investment & Securities as the pricing provider.
    #[cfg(feature = "kis")]
    #[must_use]
    pub fn with_kis(self, app_key: &str, app_secret: &str) -> Self {
        self.with_pricing(Arc::new(netcash_kis::KisProvider::new(app_key, app_secret)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ScopePolicy;
    use crate::testing::{MockFilings, MockPricing, date};
    use netcash_core::{ErrorKind, LineItem, LineItemSet, ReportKind, StatementScope};
    use rust_decimal::Decimal;

    fn million(value: i64) -> Decimal {
        Decimal::from(value) * Decimal::from(1_000_000)
    }

    fn registry() -> Arc<CorpRegistry> {
        Arc::new(
            CorpRegistry::from_entries([
                ("삼성전자", "00126380", Some("005930")),
                ("비상장전자", "00999999", None),
            ])
            .unwrap(),
        )
    }

    fn samsung_items() -> LineItemSet {
        let c = StatementScope::Consolidated;
        vec![
            LineItem::balance_sheet("현금및현금성자산", c, million(53_705_579)),
            LineItem::balance_sheet("단기금융상품", c, million(58_909_334)),
            LineItem::balance_sheet("단기당기손익-공정가치금융자산", c, million(36_877)),
            LineItem::balance_sheet("단기차입금", c, million(13_172_504)),
            LineItem::balance_sheet("유동성장기부채", c, million(2_207_290)),
            LineItem::balance_sheet("사채", c, million(14_530)),
            LineItem::balance_sheet("장기차입금", c, million(3_935_860)),
        ]
        .into_iter()
        .collect()
    }

    fn annual_2024() -> ReportPeriod {
        ReportPeriod::new(2024, ReportKind::Annual).disclosed_on(date(2025, 3, 11))
    }

    fn status(
        issued: Option<i64>,
        decrease: Option<i64>,
        treasury: Option<i64>,
        distributed: Option<i64>,
    ) -> ShareStatus {
        ShareStatus {
            issued_total: issued.map(Decimal::from),
            decrease_total: decrease.map(Decimal::from),
            treasury_shares_count: treasury.map(Decimal::from),
            distributed_count: distributed.map(Decimal::from),
        }
    }

    fn filings(status: ShareStatus) -> MockFilings {
        MockFilings::default()
            .with_period(annual_2024())
            .with_items(samsung_items())
            .with_status(status)
    }

    fn listed_quote(listed: i64) -> Quote {
        Quote {
            current_price: Some(Decimal::from(53_000)),
            per: Some(Decimal::new(1093, 2)),
            pbr: Some(Decimal::new(95, 2)),
            listed_share_count: Some(Decimal::from(listed)),
        }
    }

    #[tokio::test]
    async fn test_annual_only_direct_count() {
        let distributed = 5_940_082_550_i64;
        let pipeline = ValuationPipeline::new(registry())
            .with_filing(Arc::new(filings(status(None, None, None, Some(distributed)))))
            .with_pricing(Arc::new(
                MockPricing::default().with_quote(listed_quote(5_969_782_550)),
            ));

        let result = pipeline
            .compute_valuation("00126380", Some(2024), SelectionMode::Auto)
            .await
            .unwrap();

        assert_eq!(result.fiscal_context.report_kind, ReportKind::Annual);
        assert_eq!(result.net_cash.liquid_funds, million(112_651_790));
        assert_eq!(result.net_cash.borrowings, million(19_330_184));
        assert_eq!(result.net_cash_total, million(93_321_606));
        assert_eq!(result.share_count_source, ShareCountSource::DartDirect);
        assert_eq!(
            result.net_cash_per_share,
            million(93_321_606) / Decimal::from(distributed)
        );
        assert_eq!(result.net_cash_per_share_rounded(2), Decimal::new(1_571_049, 2));
        assert_eq!(result.current_price, Some(Decimal::from(53_000)));
        assert!(!result.is_fallback());
    }

    #[tokio::test]
    async fn test_derived_count() {
        let pipeline = ValuationPipeline::new(registry()).with_filing(Arc::new(filings(status(
            Some(7_780_466_850),
            Some(1_810_000_000),
            Some(30_384_300),
            None,
        ))));

        let result = pipeline
            .compute_valuation("삼성전자", Some(2024), SelectionMode::Auto)
            .await
            .unwrap();

        assert_eq!(result.share_count_source, ShareCountSource::DartDerived);
        assert_eq!(result.share_count, Decimal::from(5_940_082_550_i64));
        assert_eq!(result.fallback_marker(), Some("*"));
    }

    #[tokio::test]
    async fn test_external_fallback_count() {
        let pricing = Arc::new(MockPricing::default().with_quote(listed_quote(5_000_000_000)));
        let pipeline = ValuationPipeline::new(registry())
            .with_filing(Arc::new(filings(status(Some(100), None, None, None))))
            .with_pricing(pricing.clone());

        let result = pipeline
            .compute_valuation("005930", Some(2024), SelectionMode::Auto)
            .await
            .unwrap();

        assert_eq!(result.share_count_source, ShareCountSource::ExternalFallback);
        assert_eq!(result.share_count, Decimal::from(5_000_000_000_i64));
        assert!(result.is_fallback());
        assert_eq!(pricing.calls(), 1);
    }

    #[tokio::test]
    async fn test_share_count_unavailable_without_quote() {
        let pipeline = ValuationPipeline::new(registry())
            .with_filing(Arc::new(filings(ShareStatus::default())));

        let err = pipeline
            .compute_valuation("삼성전자", Some(2024), SelectionMode::Auto)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShareCountUnavailable);
    }

    #[tokio::test]
    async fn test_no_disclosed_report() {
        let pricing = Arc::new(MockPricing::default().with_quote(listed_quote(1)));
        let pipeline = ValuationPipeline::new(registry())
            .with_filing(Arc::new(filings(status(None, None, None, Some(1)))))
            .with_pricing(pricing);

        let err = pipeline
            .compute_valuation("삼성전자", Some(2023), SelectionMode::Auto)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoDisclosedReport);
    }

    #[tokio::test]
    async fn test_auto_prefers_q3_over_annual() {
        let filings = filings(status(None, None, None, Some(10)))
            .with_period(ReportPeriod::new(2024, ReportKind::Q3).disclosed_on(date(2024, 11, 14)));
        let pipeline = ValuationPipeline::new(registry()).with_filing(Arc::new(filings));

        let auto = pipeline
            .compute_valuation("삼성전자", Some(2024), SelectionMode::Auto)
            .await
            .unwrap();
        assert_eq!(auto.fiscal_context.report_kind, ReportKind::Q3);

        let explicit = pipeline
            .compute_valuation(
                "삼성전자",
                Some(2024),
                SelectionMode::Explicit(ReportKind::Annual),
            )
            .await
            .unwrap();
        assert_eq!(explicit.fiscal_context.report_kind, ReportKind::Annual);
    }

    #[tokio::test]
    async fn test_unlisted_company_skips_quote() {
        let pricing = Arc::new(MockPricing::default().with_quote(listed_quote(1)));
        let pipeline = ValuationPipeline::new(registry())
            .with_filing(Arc::new(filings(status(None, None, None, Some(1_000)))))
            .with_pricing(pricing.clone());

        let result = pipeline
            .compute_valuation("비상장전자", Some(2024), SelectionMode::Auto)
            .await
            .unwrap();

        assert_eq!(pricing.calls(), 0);
        assert_eq!(result.current_price, None);
        assert_eq!(result.per, None);
        assert_eq!(result.share_count_source, ShareCountSource::DartDirect);
    }

    #[tokio::test]
    async fn test_zero_share_count_is_undefined() {
        let pipeline = ValuationPipeline::new(registry())
            .with_filing(Arc::new(filings(status(None, None, None, Some(0)))));

        let err = pipeline
            .compute_valuation("삼성전자", Some(2024), SelectionMode::Auto)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DivisionUndefined);
    }

    #[tokio::test]
    async fn test_upstream_failures_propagate() {
        let pipeline = ValuationPipeline::new(registry())
            .with_filing(Arc::new(filings(status(None, None, None, Some(1)))))
            .with_pricing(Arc::new(MockPricing::default().failing("timed out")));
        let err = pipeline
            .compute_valuation("삼성전자", Some(2024), SelectionMode::Auto)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);

        let pipeline = ValuationPipeline::new(registry())
            .with_filing(Arc::new(MockFilings::default().failing("status 020")));
        let err = pipeline
            .compute_valuation("삼성전자", Some(2024), SelectionMode::Auto)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    }

    #[tokio::test]
    async fn test_resolution_errors() {
        let pipeline = ValuationPipeline::new(registry())
            .with_filing(Arc::new(filings(status(None, None, None, Some(1)))));

        let err = pipeline
            .compute_valuation("없는회사", Some(2024), SelectionMode::Auto)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCompany);

        let bare = ValuationPipeline::new(registry());
        let err = bare
            .compute_valuation("삼성전자", Some(2024), SelectionMode::Auto)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderNotConfigured);
    }

    #[tokio::test]
    async fn test_default_fiscal_year_from_config() {
        let config = ValuationConfig::default()
            .with_default_fiscal_year(2024)
            .with_scope_policy(ScopePolicy::PerField);
        let pipeline = ValuationPipeline::new(registry())
            .with_config(config)
            .with_filing(Arc::new(filings(status(None, None, None, Some(10)))));

        let result = pipeline
            .compute_valuation("삼성전자", None, SelectionMode::Auto)
            .await
            .unwrap();
        assert_eq!(result.fiscal_context.fiscal_year, 2024);
        assert_eq!(pipeline.config().scope_policy, ScopePolicy::PerField);
        assert!(format!("{pipeline:?}").contains("MockFilings"));
    }
}
