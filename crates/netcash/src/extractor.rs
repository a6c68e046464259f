//! Line-item extraction.
//!
//! Maps the raw accounts of a disclosed report onto [`LogicalField`]s using an
//! [`AliasTable`]. Entries are preferred by statement scope first, then by
//! statement type, then by alias order.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use netcash_core::{
    FilingProvider, LineItem, LineItemSet, ReportPeriod, Result, StatementScope, StatementType,
};

use crate::aliases::{AliasTable, LogicalField};

/// Fields describing the current portion of long-term debt.
const CURRENT_PORTION_FIELDS: [LogicalField; 3] = [
    LogicalField::CurrentPortionLongTermDebt,
    LogicalField::CurrentPortionLongTermBorrowings,
    LogicalField::CurrentPortionBonds,
];

/// How statement scopes are reconciled across fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopePolicy {
    /// Take every field from one scope: consolidated when the report has a
    /// consolidated balance sheet, separate otherwise.
    #[default]
    Uniform,
    /// Let each field prefer consolidated and fall back to separate on its own.
    PerField,
}

/// Field values resolved from one report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    values: BTreeMap<LogicalField, Decimal>,
    components_used: BTreeSet<String>,
    combined_current_portion: bool,
}

impl ExtractedFields {
    /// Returns the value of a field, zero when nothing matched.
    #[must_use]
    pub fn get(&self, field: LogicalField) -> Decimal {
        self.values.get(&field).copied().unwrap_or_default()
    }

    /// Sets the value of a field.
    pub fn set(&mut self, field: LogicalField, value: Decimal) {
        self.values.insert(field, value);
    }

    /// Returns true if some account matched the field.
    #[must_use]
    pub fn contains(&self, field: LogicalField) -> bool {
        self.values.contains_key(&field)
    }

    /// Account names, as filed, that produced the values.
    #[must_use]
    pub const fn components_used(&self) -> &BTreeSet<String> {
        &self.components_used
    }

    /// True if the current portions of borrowings and bonds came from one
    /// combined account.
    #[must_use]
    pub const fn combined_current_portion(&self) -> bool {
        self.combined_current_portion
    }
}

/// Resolves logical fields from raw line items.
#[derive(Clone, Debug, Default)]
pub struct LineItemExtractor {
    aliases: AliasTable,
    scope_policy: ScopePolicy,
}

impl LineItemExtractor {
    /// Create an extractor over an alias table.
    #[must_use]
    pub const fn new(aliases: AliasTable, scope_policy: ScopePolicy) -> Self {
        Self {
            aliases,
            scope_policy,
        }
    }

    /// Returns the alias table in use.
    #[must_use]
    pub const fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Returns the scope policy in use.
    #[must_use]
    pub const fn scope_policy(&self) -> ScopePolicy {
        self.scope_policy
    }

    /// Fetch the line items of a report and extract its fields.
    pub async fn fetch_and_extract(
        &self,
        provider: &dyn FilingProvider,
        registry_id: &str,
        period: &ReportPeriod,
    ) -> Result<ExtractedFields> {
        let items = provider.line_items(registry_id, period).await?;
        debug!(
            provider = provider.name(),
            registry_id,
            period = %period,
            items = items.len(),
            "Fetched line items"
        );
        Ok(self.extract(&items))
    }

    /// Extract every net-cash field from a set of line items.
    ///
    /// Fields without a matching account are left out and read as zero. A
    /// combined current-portion account replaces the split current portions
    /// of borrowings and bonds.
    #[must_use]
    pub fn extract(&self, items: &LineItemSet) -> ExtractedFields {
        let scopes = self.scopes_for(items);
        let mut fields = ExtractedFields::default();

        let record = |fields: &mut ExtractedFields, field: LogicalField, item: &LineItem| {
            trace!(
                field = %field,
                account = %item.account_name,
                scope = ?item.statement_scope,
                value = %item.current_value,
                "Matched account"
            );
            fields.set(field, item.current_value);
            fields.components_used.insert(item.account_name.clone());
        };

        for field in LogicalField::LIQUID_FUNDS {
            if let Some(item) = self.find(items, field, &scopes) {
                record(&mut fields, field, item);
            }
        }

        // Current portions come from a single scope, combined or split.
        let portion_scopes: Vec<StatementScope> = scopes
            .iter()
            .copied()
            .find(|&scope| {
                CURRENT_PORTION_FIELDS
                    .iter()
                    .any(|&f| self.find(items, f, &[scope]).is_some())
            })
            .into_iter()
            .collect();
        let combined = self.find(
            items,
            LogicalField::CurrentPortionLongTermDebt,
            &portion_scopes,
        );
        for field in LogicalField::BORROWINGS {
            let is_split_portion = matches!(
                field,
                LogicalField::CurrentPortionLongTermBorrowings | LogicalField::CurrentPortionBonds
            );
            let field_scopes = if is_split_portion {
                &portion_scopes
            } else {
                &scopes
            };
            match combined {
                Some(item) if field == LogicalField::CurrentPortionLongTermBorrowings => {
                    record(&mut fields, field, item);
                }
                Some(_) if is_split_portion => {}
                _ => {
                    if let Some(item) = self.find(items, field, field_scopes) {
                        record(&mut fields, field, item);
                    }
                }
            }
        }
        fields.combined_current_portion = combined.is_some();

        debug!(
            scopes = ?scopes,
            matched = fields.values.len(),
            combined_current_portion = fields.combined_current_portion,
            "Extracted net-cash fields"
        );
        fields
    }

    fn scopes_for(&self, items: &LineItemSet) -> Vec<StatementScope> {
        match self.scope_policy {
            ScopePolicy::PerField => vec![StatementScope::Consolidated, StatementScope::Separate],
            ScopePolicy::Uniform if items.has_balance_sheet_scope(StatementScope::Consolidated) => {
                vec![StatementScope::Consolidated]
            }
            ScopePolicy::Uniform => vec![StatementScope::Separate],
        }
    }

    fn find<'a>(
        &self,
        items: &'a LineItemSet,
        field: LogicalField,
        scopes: &[StatementScope],
    ) -> Option<&'a LineItem> {
        let aliases: Vec<String> = self
            .aliases
            .aliases(field)
            .iter()
            .map(|a| normalize_account(a))
            .collect();
        if aliases.is_empty() {
            return None;
        }

        let preferred = field.statement_type();
        let types = [preferred, other_statement(preferred)];

        scopes.iter().find_map(|&scope| {
            types.iter().find_map(|&statement_type| {
                aliases.iter().find_map(|alias| {
                    items.iter().find(|item| {
                        item.statement_scope == scope
                            && item.statement_type == statement_type
                            && normalize_account(&item.account_name) == *alias
                    })
                })
            })
        })
    }
}

const fn other_statement(statement_type: StatementType) -> StatementType {
    match statement_type {
        StatementType::BalanceSheet => StatementType::IncomeStatement,
        StatementType::IncomeStatement => StatementType::BalanceSheet,
    }
}

/// Account names compare without whitespace and case.
fn normalize_account(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
