//! Net-cash arithmetic.

use rust_decimal::Decimal;
use tracing::debug;

use netcash_core::NetCashResult;

use crate::aliases::LogicalField;
use crate::extractor::ExtractedFields;

/// Compute liquid funds, borrowings and their difference.
///
/// Absent fields count as zero. The sums are exact; nothing is rounded.
#[must_use]
pub fn compute_net_cash(fields: &ExtractedFields) -> NetCashResult {
    let liquid_funds: Decimal = LogicalField::LIQUID_FUNDS
        .iter()
        .map(|&f| fields.get(f))
        .sum();
    let borrowings: Decimal = LogicalField::BORROWINGS
        .iter()
        .map(|&f| fields.get(f))
        .sum();
    let net_cash = liquid_funds - borrowings;

    debug!(
        liquid_funds = %liquid_funds,
        borrowings = %borrowings,
        net_cash = %net_cash,
        "Computed net cash"
    );

    NetCashResult {
        liquid_funds,
        borrowings,
        net_cash,
        components_used: fields.components_used().clone(),
    }
}
