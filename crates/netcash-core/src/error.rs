//! Error types for valuation operations.
//!
//! This module defines [`ValuationError`] which covers every terminal failure
//! of a valuation request, from identifier resolution through the final
//! per-share division. Every variant maps to an [`ErrorKind`] so front ends can
//! render a message per kind without matching on payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during a valuation request.
#[derive(Error, Debug)]
pub enum ValuationError {
    /// No registry entry matches the query.
    #[error("Unknown company: {0}")]
    UnknownCompany(String),

    /// More than one registry entry matches the query.
    #[error("Ambiguous identifier {query:?}: matches {candidates:?}")]
    AmbiguousIdentifier {
        /// The query as supplied by the caller.
        query: String,
        /// Display names of the matching entries.
        candidates: Vec<String>,
    },

    /// None of the requested report kinds has been disclosed for the fiscal year.
    #[error("No disclosed report for {registry_id} in fiscal year {fiscal_year}")]
    NoDisclosedReport {
        /// Registry identifier of the company.
        registry_id: String,
        /// Fiscal year that was searched.
        fiscal_year: i32,
    },

    /// Every share-count tier came up empty.
    #[error("Share count unavailable for {0}")]
    ShareCountUnavailable(String),

    /// The share count is zero or negative, so a per-share value is undefined.
    #[error("Per-share value undefined for share count {0}")]
    DivisionUndefined(Decimal),

    /// An upstream collaborator failed, timed out, or returned an unusable payload.
    #[error("Upstream {provider} unavailable: {message}")]
    UpstreamUnavailable {
        /// Name of the failing provider.
        provider: String,
        /// Description of the failure.
        message: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested provider is not configured.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),
}

impl ValuationError {
    /// Shorthand for an [`ValuationError::UpstreamUnavailable`] error.
    pub fn upstream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns the payload-free kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCompany(_) => ErrorKind::UnknownCompany,
            Self::AmbiguousIdentifier { .. } => ErrorKind::AmbiguousIdentifier,
            Self::NoDisclosedReport { .. } => ErrorKind::NoDisclosedReport,
            Self::ShareCountUnavailable(_) => ErrorKind::ShareCountUnavailable,
            Self::DivisionUndefined(_) => ErrorKind::DivisionUndefined,
            Self::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::ProviderNotConfigured(_) => ErrorKind::ProviderNotConfigured,
        }
    }
}

/// Payload-free classification of a [`ValuationError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`ValuationError::UnknownCompany`].
    UnknownCompany,
    /// See [`ValuationError::AmbiguousIdentifier`].
    AmbiguousIdentifier,
    /// See [`ValuationError::NoDisclosedReport`].
    NoDisclosedReport,
    /// See [`ValuationError::ShareCountUnavailable`].
    ShareCountUnavailable,
    /// See [`ValuationError::DivisionUndefined`].
    DivisionUndefined,
    /// See [`ValuationError::UpstreamUnavailable`].
    UpstreamUnavailable,
    /// See [`ValuationError::InvalidParameter`].
    InvalidParameter,
    /// See [`ValuationError::ProviderNotConfigured`].
    ProviderNotConfigured,
}

/// Result type alias using [`ValuationError`].
pub type Result<T> = std::result::Result<T, ValuationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = ValuationError::NoDisclosedReport {
            registry_id: "00126380".to_string(),
            fiscal_year: 2024,
        };
        assert_eq!(err.kind(), ErrorKind::NoDisclosedReport);
        assert_eq!(
            ValuationError::upstream("OpenDART", "timeout").kind(),
            ErrorKind::UpstreamUnavailable
        );
    }

    #[test]
    fn test_display_keeps_context() {
        let err = ValuationError::upstream("KIS", "HTTP 500");
        assert_eq!(err.to_string(), "Upstream KIS unavailable: HTTP 500");

        let err = ValuationError::DivisionUndefined(Decimal::ZERO);
        assert!(err.to_string().contains('0'));
    }
}
