//! Valuation settings.

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

use crate::aliases::AliasTable;
use crate::extractor::{LineItemExtractor, ScopePolicy};

/// Settings of a [`ValuationPipeline`](crate::ValuationPipeline).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Scope reconciliation across fields.
    pub scope_policy: ScopePolicy,
    /// Account-name aliases.
    pub aliases: AliasTable,
    /// Fiscal year used when a request names none; `None` means the current
    /// calendar year.
    pub default_fiscal_year: Option<i32>,
}

impl ValuationConfig {
    /// Sets the scope policy.
    #[must_use]
    pub const fn with_scope_policy(mut self, scope_policy: ScopePolicy) -> Self {
        self.scope_policy = scope_policy;
        self
    }

    /// Sets the alias table.
    #[must_use]
    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    /// Sets the default fiscal year.
    #[must_use]
    pub const fn with_default_fiscal_year(mut self, fiscal_year: i32) -> Self {
        self.default_fiscal_year = Some(fiscal_year);
        self
    }

    /// Returns the fiscal year a request should target.
    #[must_use]
    pub fn target_year(&self, requested: Option<i32>) -> i32 {
        requested
            .or(self.default_fiscal_year)
            .unwrap_or_else(|| Local::now().year())
    }

    /// Build the line-item extractor these settings describe.
    #[must_use]
    pub fn extractor(&self) -> LineItemExtractor {
        LineItemExtractor::new(self.aliases.clone(), self.scope_policy)
    }
}
