//! Share-count resolution.
//!
//! Tiers are tried in the order of [`SHARE_COUNT_TIERS`]; the first tier that
//! yields a count wins and tags the result with its source.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use netcash_core::{Result, ShareCountResult, ShareCountSource, ShareStatus, ValuationError};

/// A share-count strategy: disclosed status and the external listed count in,
/// count out.
pub type ShareCountTier = fn(&ShareStatus, Option<Decimal>) -> Option<Decimal>;

/// Share-count tiers in priority order.
pub const SHARE_COUNT_TIERS: [(ShareCountSource, ShareCountTier); 3] = [
    (ShareCountSource::DartDirect, direct_count),
    (ShareCountSource::DartDerived, derived_count),
    (ShareCountSource::ExternalFallback, external_count),
];

fn direct_count(status: &ShareStatus, _listed: Option<Decimal>) -> Option<Decimal> {
    status.distributed_count
}

fn derived_count(status: &ShareStatus, _listed: Option<Decimal>) -> Option<Decimal> {
    Some(status.issued_total? - status.decrease_total? - status.treasury_shares_count?)
}

fn external_count(_status: &ShareStatus, listed: Option<Decimal>) -> Option<Decimal> {
    listed
}

/// Resolve the share count of a report.
///
/// `listed_share_count` is the count reported by the pricing collaborator, if
/// any. Fails with [`ValuationError::ShareCountUnavailable`] when every tier
/// is empty.
pub fn resolve_share_count(
    registry_id: &str,
    status: &ShareStatus,
    listed_share_count: Option<Decimal>,
) -> Result<ShareCountResult> {
    for (source, tier) in SHARE_COUNT_TIERS {
        if let Some(count) = tier(status, listed_share_count) {
            debug!(registry_id, source = %source, count = %count, "Resolved share count");
            return Ok(ShareCountResult { count, source });
        }
    }

    warn!(registry_id, "No share-count tier produced a value");
    Err(ValuationError::ShareCountUnavailable(registry_id.to_string()))
}
