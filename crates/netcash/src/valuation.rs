//! Valuation aggregation.

use rust_decimal::Decimal;
use tracing::debug;

use netcash_core::{
    CompanyRef, NetCashResult, Quote, ReportPeriod, Result, ShareCountResult, ValuationError,
    ValuationResult,
};

/// Divide net cash by the share count and package the result.
///
/// Fails with [`ValuationError::DivisionUndefined`] when the count is zero or
/// negative. The quote is optional; without one, price and ratios are empty.
pub fn aggregate(
    company: CompanyRef,
    net_cash: NetCashResult,
    shares: ShareCountResult,
    quote: Option<&Quote>,
    fiscal_context: ReportPeriod,
) -> Result<ValuationResult> {
    if shares.count <= Decimal::ZERO {
        return Err(ValuationError::DivisionUndefined(shares.count));
    }
    let net_cash_per_share = net_cash
        .net_cash
        .checked_div(shares.count)
        .ok_or(ValuationError::DivisionUndefined(shares.count))?;

    debug!(
        company = %company,
        period = %fiscal_context,
        per_share = %net_cash_per_share,
        source = %shares.source,
        "Aggregated valuation"
    );

    Ok(ValuationResult {
        company,
        net_cash_per_share,
        net_cash_total: net_cash.net_cash,
        net_cash,
        share_count: shares.count,
        share_count_source: shares.source,
        current_price: quote.and_then(|q| q.current_price),
        per: quote.and_then(|q| q.per),
        pbr: quote.and_then(|q| q.pbr),
        fiscal_context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::samsung;
    use netcash_core::{ErrorKind, ReportKind, ShareCountSource};
    use std::collections::BTreeSet;

    fn net_cash(value: Decimal) -> NetCashResult {
        NetCashResult {
            liquid_funds: value,
            borrowings: Decimal::ZERO,
            net_cash: value,
            components_used: BTreeSet::new(),
        }
    }

    fn shares(count: i64, source: ShareCountSource) -> ShareCountResult {
        ShareCountResult {
            count: Decimal::from(count),
            source,
        }
    }

    #[test]
    fn test_samsung_per_share() {
        let total = Decimal::from(93_321_606_000_000_i64);
        let result = aggregate(
            samsung(),
            net_cash(total),
            shares(5_940_082_550, ShareCountSource::DartDirect),
            None,
            ReportPeriod::new(2024, ReportKind::Annual),
        )
        .unwrap();

        assert_eq!(result.net_cash_total, total);
        assert_eq!(result.net_cash_per_share_rounded(2), Decimal::new(1_571_049, 2));
        assert!(!result.is_fallback());
        assert_eq!(result.fallback_marker(), None);
        assert_eq!(result.current_price, None);
    }

    #[test]
    fn test_per_share_times_count_recovers_total() {
        for (total, count) in [
            (93_321_606_000_000_i64, 5_940_082_550_i64),
            (-1_000_000_007, 3),
            (1, 7),
            (123_456_789_012, 1_000_003),
        ] {
            let result = aggregate(
                samsung(),
                net_cash(Decimal::from(total)),
                shares(count, ShareCountSource::DartDerived),
                None,
                ReportPeriod::new(2024, ReportKind::Q3),
            )
            .unwrap();
            let recovered = result.net_cash_per_share * result.share_count;
            assert!(
                (recovered - result.net_cash_total).abs() < Decimal::ONE,
                "{total} / {count}"
            );
        }
    }

    #[test]
    fn test_non_positive_count_is_undefined() {
        for count in [0, -5] {
            let err = aggregate(
                samsung(),
                net_cash(Decimal::ONE),
                shares(count, ShareCountSource::DartDerived),
                None,
                ReportPeriod::new(2024, ReportKind::Annual),
            )
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DivisionUndefined);
        }
    }

    #[test]
    fn test_quote_fields_and_fallback_marker() {
        let quote = Quote {
            current_price: Some(Decimal::from(55_000)),
            per: Some(Decimal::new(1234, 2)),
            pbr: Some(Decimal::new(110, 2)),
            listed_share_count: Some(Decimal::from(5_000_000_000_i64)),
        };
        let result = aggregate(
            samsung(),
            net_cash(Decimal::from(10_000_000_000_i64)),
            shares(5_000_000_000, ShareCountSource::ExternalFallback),
            Some(&quote),
            ReportPeriod::new(2024, ReportKind::Annual),
        )
        .unwrap();

        assert_eq!(result.current_price, Some(Decimal::from(55_000)));
        assert_eq!(result.per, Some(Decimal::new(1234, 2)));
        assert_eq!(result.net_cash_per_share, Decimal::from(2));
        assert!(result.is_fallback());
        assert_eq!(result.fallback_marker(), Some("*"));
    }
}
