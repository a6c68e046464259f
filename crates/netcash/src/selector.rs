//! Report selection.
//!
//! AUTO mode walks [`AUTO_PRIORITY`] and takes the freshest disclosed kind.
//! EXPLICIT mode accepts only the requested kind. Neither walks back to an
//! earlier fiscal year.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use netcash_core::{
    CompanyRef, FilingProvider, ReportKind, ReportPeriod, Result, ValuationError,
};

/// Recency-first order used in AUTO mode.
pub const AUTO_PRIORITY: [ReportKind; 4] = [
    ReportKind::Q3,
    ReportKind::Semiannual,
    ReportKind::Q1,
    ReportKind::Annual,
];

/// How the report period of a fiscal year is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Freshest disclosed kind in [`AUTO_PRIORITY`] order.
    #[default]
    Auto,
    /// Exactly the given kind.
    Explicit(ReportKind),
}

impl SelectionMode {
    /// Kinds to try, in order.
    #[must_use]
    pub fn candidates(&self) -> &[ReportKind] {
        match self {
            Self::Auto => &AUTO_PRIORITY,
            Self::Explicit(kind) => std::slice::from_ref(kind),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("AUTO"),
            Self::Explicit(kind) => write!(f, "{kind}"),
        }
    }
}

impl FromStr for SelectionMode {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else {
            s.parse().map(Self::Explicit)
        }
    }
}

/// Pick a disclosed period for `fiscal_year` out of `periods`.
///
/// Periods of other fiscal years and periods without a disclosure date are
/// ignored.
pub fn select_report(
    registry_id: &str,
    fiscal_year: i32,
    mode: SelectionMode,
    periods: &[ReportPeriod],
) -> Result<ReportPeriod> {
    mode.candidates()
        .iter()
        .find_map(|&kind| {
            periods.iter().find(|p| {
                p.fiscal_year == fiscal_year && p.report_kind == kind && p.is_disclosed()
            })
        })
        .cloned()
        .ok_or_else(|| ValuationError::NoDisclosedReport {
            registry_id: registry_id.to_string(),
            fiscal_year,
        })
}

/// Selects report periods using a filing provider.
#[derive(Debug, Clone)]
pub struct ReportSelector {
    provider: Arc<dyn FilingProvider>,
}

impl ReportSelector {
    /// Create a selector backed by a filing provider.
    #[must_use]
    pub fn new(provider: Arc<dyn FilingProvider>) -> Self {
        Self { provider }
    }

    /// List the disclosed periods of `fiscal_year` and pick one.
    #[instrument(skip(self, company), fields(registry_id = %company.registry_id))]
    pub async fn select(
        &self,
        company: &CompanyRef,
        fiscal_year: i32,
        mode: SelectionMode,
    ) -> Result<ReportPeriod> {
        let periods = self
            .provider
            .list_report_periods(&company.registry_id, fiscal_year)
            .await?;
        debug!(
            provider = self.provider.name(),
            listed = periods.len(),
            "Listed report periods"
        );

        let period = select_report(&company.registry_id, fiscal_year, mode, &periods)?;
        debug!(period = %period, disclosed = ?period.disclosure_date, "Selected report");
        Ok(period)
    }
}
