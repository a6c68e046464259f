#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/netcash/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Net-cash-per-share valuation from disclosed financial reports.
//!
//! This crate re-exports the core types and the bundled providers, and
//! provides a [`ValuationPipeline`] that resolves a company, selects a
//! disclosed report, extracts its cash and debt accounts and divides net cash
//! by a tiered share count.
//!
//! # Features
//!
//! - `dart` - OpenDART filing provider
//! - `kis` - Korea Investment & Securities pricing provider
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use netcash::{CorpRegistry, SelectionMode, ValuationPipeline};
//!
//! #[tokio::main]
//! async fn main() -> netcash::Result<()> {
//!     let registry = CorpRegistry::from_entries([("삼성전자", "00126380", Some("005930"))])?;
//!     let pipeline = ValuationPipeline::new(Arc::new(registry))
//!         .with_dart("dart-api-key")
//!         .with_kis("app-key", "app-secret");
//!
//!     let result = pipeline
//!         .compute_valuation("삼성전자", Some(2024), SelectionMode::Auto)
//!         .await?;
//!     println!(
//!         "{}{}",
//!         result.net_cash_per_share_rounded(2),
//!         result.fallback_marker().unwrap_or_default()
//!     );
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use netcash_core::*;

// Providers
#[cfg(feature = "dart")]
pub use netcash_dart::DartProvider;
#[cfg(feature = "kis")]
pub use netcash_kis::KisProvider;

mod aliases;
pub use aliases::{AliasTable, LogicalField};

mod calculator;
pub use calculator::compute_net_cash;

mod config;
pub use config::ValuationConfig;

mod extractor;
pub use extractor::{ExtractedFields, LineItemExtractor, ScopePolicy};

mod pipeline;
pub use pipeline::ValuationPipeline;

mod resolver;
pub use resolver::{CorpRegistry, IdentifierResolver, normalize_name};

mod selector;
pub use selector::{AUTO_PRIORITY, ReportSelector, SelectionMode, select_report};

mod shares;
pub use shares::{SHARE_COUNT_TIERS, ShareCountTier, resolve_share_count};

mod valuation;
pub use valuation::aggregate;

#[cfg(test)]
mod testing;
