//! Core data types for net-cash valuation.
//!
//! This module defines the values that flow through a valuation request:
//!
//! - [`CompanyRef`] - Resolved registry identity of a company
//! - [`LineItem`] / [`LineItemSet`] - Raw accounts of a disclosed report
//! - [`ShareStatus`] - Disclosed share totals of a report
//! - [`Quote`] - Price and ratios from the pricing collaborator
//! - [`NetCashResult`] - Liquid funds, borrowings, and their difference
//! - [`ShareCountResult`] - Share count tagged with the tier that produced it
//! - [`ValuationResult`] - Final per-share output

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Result, ValuationError};
use crate::period::ReportPeriod;

/// Length of a registry identifier.
pub const REGISTRY_ID_LEN: usize = 8;

/// Length of a listed ticker code.
pub const TICKER_LEN: usize = 6;

/// Resolved identity of a filing entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyRef {
    /// Registered company name.
    pub display_name: String,
    /// Eight-digit, zero-padded registry identifier.
    pub registry_id: String,
    /// Six-digit ticker code for listed companies.
    pub ticker_code: Option<String>,
}

impl CompanyRef {
    /// Creates a company reference, zero-padding the identifiers.
    ///
    /// Fails if either identifier contains non-digits or is longer than its
    /// fixed width.
    pub fn new(
        display_name: impl Into<String>,
        registry_id: &str,
        ticker_code: Option<&str>,
    ) -> Result<Self> {
        let registry_id = pad_digits(registry_id, REGISTRY_ID_LEN)?;
        let ticker_code = match ticker_code.map(str::trim) {
            Some(code) if !code.is_empty() => Some(pad_digits(code, TICKER_LEN)?),
            _ => None,
        };
        Ok(Self {
            display_name: display_name.into().trim().to_string(),
            registry_id,
            ticker_code,
        })
    }
}

impl fmt::Display for CompanyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.registry_id)
    }
}

fn pad_digits(raw: &str, width: usize) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > width || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValuationError::InvalidParameter(format!(
            "expected up to {width} digits, got {raw:?}"
        )));
    }
    Ok(format!("{raw:0>width$}"))
}

/// Whether a statement covers the group or the parent entity alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementScope {
    /// Consolidated (group) statements.
    Consolidated,
    /// Separate (parent-only) statements.
    Separate,
}

/// Which financial statement a line item belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementType {
    /// Statement of financial position.
    BalanceSheet,
    /// Income statement or statement of comprehensive income.
    IncomeStatement,
}

/// A single reported account of a disclosed report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Filer-supplied account name.
    pub account_name: String,
    /// Consolidated or separate.
    pub statement_scope: StatementScope,
    /// Balance sheet or income statement.
    pub statement_type: StatementType,
    /// Amount for the current period, in base currency units.
    pub current_value: Decimal,
    /// Reporting currency.
    pub currency: String,
}

impl LineItem {
    /// Creates a balance-sheet line item reported in KRW.
    #[must_use]
    pub fn balance_sheet(
        account_name: impl Into<String>,
        statement_scope: StatementScope,
        current_value: Decimal,
    ) -> Self {
        Self {
            account_name: account_name.into(),
            statement_scope,
            statement_type: StatementType::BalanceSheet,
            current_value,
            currency: "KRW".to_string(),
        }
    }

    /// Sets the statement type.
    #[must_use]
    pub const fn with_statement_type(mut self, statement_type: StatementType) -> Self {
        self.statement_type = statement_type;
        self
    }

    /// Sets the reporting currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }
}

/// Ordered collection of the line items of one disclosed report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemSet {
    items: Vec<LineItem>,
}

impl LineItemSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Creates a set from a vector of items, preserving their order.
    #[must_use]
    pub const fn from_items(items: Vec<LineItem>) -> Self {
        Self { items }
    }

    /// Appends an item.
    pub fn push(&mut self, item: LineItem) {
        self.items.push(item);
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns an iterator over the items in filing order.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter()
    }

    /// Returns true if any balance-sheet item has the given scope.
    #[must_use]
    pub fn has_balance_sheet_scope(&self, scope: StatementScope) -> bool {
        self.items.iter().any(|i| {
            i.statement_scope == scope && i.statement_type == StatementType::BalanceSheet
        })
    }
}

impl IntoIterator for LineItemSet {
    type Item = LineItem;
    type IntoIter = std::vec::IntoIter<LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<LineItem> for LineItemSet {
    fn from_iter<I: IntoIterator<Item = LineItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Disclosed share totals for the common-share class of a report.
///
/// Every field is optional because filers leave cells blank.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareStatus {
    /// Total shares issued to date.
    pub issued_total: Option<Decimal>,
    /// Total shares decreased (retired) to date.
    pub decrease_total: Option<Decimal>,
    /// Treasury shares held.
    pub treasury_shares_count: Option<Decimal>,
    /// Outstanding (distributed) shares.
    pub distributed_count: Option<Decimal>,
}

/// Price snapshot from the pricing collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Current price per share.
    pub current_price: Option<Decimal>,
    /// Price-to-earnings ratio.
    pub per: Option<Decimal>,
    /// Price-to-book ratio.
    pub pbr: Option<Decimal>,
    /// Number of listed shares.
    pub listed_share_count: Option<Decimal>,
}

/// Liquid funds, borrowings and net cash of a report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetCashResult {
    /// Sum of cash-like balance-sheet assets.
    pub liquid_funds: Decimal,
    /// Sum of interest-bearing debt.
    pub borrowings: Decimal,
    /// `liquid_funds - borrowings`, unrounded.
    pub net_cash: Decimal,
    /// Account names that contributed to the sums.
    pub components_used: BTreeSet<String>,
}

/// Which tier produced a share count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShareCountSource {
    /// Disclosed outstanding share count.
    DartDirect,
    /// Issued minus decreased minus treasury shares.
    DartDerived,
    /// Listed share count from the pricing collaborator.
    ExternalFallback,
}

impl fmt::Display for ShareCountSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DartDirect => "DART_DIRECT",
            Self::DartDerived => "DART_DERIVED",
            Self::ExternalFallback => "EXTERNAL_FALLBACK",
        };
        f.write_str(s)
    }
}

/// A share count tagged with its source tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareCountResult {
    /// Number of shares.
    pub count: Decimal,
    /// Tier that produced the count.
    pub source: ShareCountSource,
}

/// Final output of a valuation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Company the valuation is for.
    pub company: CompanyRef,
    /// Net cash divided by share count, unrounded.
    pub net_cash_per_share: Decimal,
    /// Net cash of the report.
    pub net_cash_total: Decimal,
    /// Full net-cash breakdown.
    pub net_cash: NetCashResult,
    /// Share count used as divisor.
    pub share_count: Decimal,
    /// Tier that produced the share count.
    pub share_count_source: ShareCountSource,
    /// Current price per share.
    pub current_price: Option<Decimal>,
    /// Price-to-earnings ratio.
    pub per: Option<Decimal>,
    /// Price-to-book ratio.
    pub pbr: Option<Decimal>,
    /// Report the figures were taken from.
    pub fiscal_context: ReportPeriod,
}

impl ValuationResult {
    /// Marker appended by front ends to low-confidence values.
    pub const FALLBACK_MARKER: &'static str = "*";

    /// Returns true if the share count did not come from the disclosed outstanding count.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.share_count_source != ShareCountSource::DartDirect
    }

    /// Returns the fallback marker when [`Self::is_fallback`] holds.
    #[must_use]
    pub fn fallback_marker(&self) -> Option<&'static str> {
        self.is_fallback().then_some(Self::FALLBACK_MARKER)
    }

    /// Per-share value rounded half away from zero to `dp` decimal places.
    #[must_use]
    pub fn net_cash_per_share_rounded(&self, dp: u32) -> Decimal {
        self.net_cash_per_share
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
    }
}
