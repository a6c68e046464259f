#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/netcash/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for net-cash valuation.
//!
//! This crate provides the foundational abstractions shared by the valuation
//! core and the upstream clients:
//!
//! - [`DataProvider`](provider::DataProvider) - Base trait for all providers
//! - [`FilingProvider`](provider::FilingProvider) - Disclosed reports, line items, share status
//! - [`PricingProvider`](provider::PricingProvider) - Current price, PER, PBR, listed shares
//! - [`ReportKind`](period::ReportKind) - The four disclosed period kinds of a fiscal year

/// Error types for valuation operations.
pub mod error;
/// Report period kinds and their filing codes.
pub mod period;
/// Provider traits for the filing and pricing collaborators.
pub mod provider;
/// Core data types (CompanyRef, LineItemSet, ValuationResult, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{ErrorKind, Result, ValuationError};
pub use period::{ReportKind, ReportPeriod};
pub use provider::{DataProvider, FilingProvider, PricingProvider};
pub use types::{
    CompanyRef, LineItem, LineItemSet, NetCashResult, Quote, ShareCountResult, ShareCountSource,
    ShareStatus, StatementScope, StatementType, ValuationResult,
};
