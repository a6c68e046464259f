//! Versioned account-name alias table.
//!
//! Filers name the same account in different ways. Each [`LogicalField`]
//! maps to an ordered list of accepted account names; earlier names win when
//! a report contains several.

use serde::{Deserialize, Serialize};
use std::fmt;

use netcash_core::StatementType;

/// Balance-sheet quantities that feed the net-cash formula.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogicalField {
    /// Cash and cash equivalents.
    CashAndEquivalents,
    /// Short-term financial instruments (deposits).
    ShortTermFinancialInstruments,
    /// Short-term financial assets at amortized cost.
    ShortTermAmortizedCostAssets,
    /// Short-term financial assets at fair value through profit or loss.
    ShortTermFvplAssets,
    /// Short-term borrowings.
    ShortTermBorrowings,
    /// Current portion of long-term borrowings.
    CurrentPortionLongTermBorrowings,
    /// Current portion of bonds.
    CurrentPortionBonds,
    /// Combined current portion of long-term borrowings and bonds.
    CurrentPortionLongTermDebt,
    /// Long-term borrowings.
    LongTermBorrowings,
    /// Bonds issued.
    Bonds,
}

impl LogicalField {
    /// Fields summed into liquid funds.
    pub const LIQUID_FUNDS: [Self; 4] = [
        Self::CashAndEquivalents,
        Self::ShortTermFinancialInstruments,
        Self::ShortTermAmortizedCostAssets,
        Self::ShortTermFvplAssets,
    ];

    /// Fields summed into borrowings, after combined current portions are split.
    pub const BORROWINGS: [Self; 5] = [
        Self::ShortTermBorrowings,
        Self::CurrentPortionLongTermBorrowings,
        Self::CurrentPortionBonds,
        Self::LongTermBorrowings,
        Self::Bonds,
    ];

    /// Statement the field is read from.
    #[must_use]
    pub const fn statement_type(&self) -> StatementType {
        StatementType::BalanceSheet
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Ordered accepted account names for each logical field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTable {
    version: u32,
    entries: Vec<(LogicalField, Vec<String>)>,
}

impl AliasTable {
    /// Version of the built-in table.
    pub const CURRENT_VERSION: u32 = 1;

    /// Create an empty table with the given version.
    #[must_use]
    pub const fn new(version: u32) -> Self {
        Self {
            version,
            entries: Vec::new(),
        }
    }

    /// Add or replace the aliases of a field.
    #[must_use]
    pub fn with_field<S: Into<String>>(
        mut self,
        field: LogicalField,
        aliases: impl IntoIterator<Item = S>,
    ) -> Self {
        let aliases: Vec<String> = aliases.into_iter().map(Into::into).collect();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = aliases,
            None => self.entries.push((field, aliases)),
        }
        self
    }

    /// Append extra aliases to a field, after its existing ones.
    #[must_use]
    pub fn extend_field<S: Into<String>>(
        mut self,
        field: LogicalField,
        aliases: impl IntoIterator<Item = S>,
    ) -> Self {
        let extra = aliases.into_iter().map(Into::into);
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => existing.extend(extra),
            None => self.entries.push((field, extra.collect())),
        }
        self
    }

    /// Returns the table version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns the accepted names of a field, in priority order.
    #[must_use]
    pub fn aliases(&self, field: LogicalField) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, a)| a.as_slice())
            .unwrap_or_default()
    }

    /// Iterates over the fields in the table.
    pub fn fields(&self) -> impl Iterator<Item = LogicalField> + '_ {
        self.entries.iter().map(|(f, _)| *f)
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::new(Self::CURRENT_VERSION)
            .with_field(
                LogicalField::CashAndEquivalents,
                ["현금및현금성자산", "현금및현금등가물", "현금및현금성자산(유동)"],
            )
            .with_field(
                LogicalField::ShortTermFinancialInstruments,
                ["단기금융상품", "단기금융자산", "단기예금"],
            )
            .with_field(
                LogicalField::ShortTermAmortizedCostAssets,
                [
                    "단기상각후원가금융자산",
                    "상각후원가측정금융자산(유동)",
                    "유동상각후원가측정금융자산",
                    "상각후원가금융자산(유동)",
                ],
            )
            .with_field(
                LogicalField::ShortTermFvplAssets,
                [
                    "단기당기손익-공정가치금융자산",
                    "당기손익-공정가치측정금융자산(유동)",
                    "유동당기손익-공정가치측정금융자산",
                    "단기당기손익인식금융자산",
                ],
            )
            .with_field(LogicalField::ShortTermBorrowings, ["단기차입금"])
            .with_field(
                LogicalField::CurrentPortionLongTermBorrowings,
                ["유동성장기차입금"],
            )
            .with_field(LogicalField::CurrentPortionBonds, ["유동성사채"])
            .with_field(
                LogicalField::CurrentPortionLongTermDebt,
                ["유동성장기부채", "유동성장기차입금및사채"],
            )
            .with_field(LogicalField::LongTermBorrowings, ["장기차입금"])
            .with_field(LogicalField::Bonds, ["사채"])
    }
}
