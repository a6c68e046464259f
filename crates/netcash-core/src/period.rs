//! Report period definitions.
//!
//! This module defines [`ReportKind`], the fixed catalog of four disclosed
//! period kinds per fiscal year, and [`ReportPeriod`], a kind bound to a
//! fiscal year together with its disclosure date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValuationError;

/// Kind of periodic report filed for a fiscal year.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    /// Full-year business report.
    Annual,
    /// Half-year report.
    Semiannual,
    /// First-quarter report.
    Q1,
    /// Third-quarter report.
    Q3,
}

impl ReportKind {
    /// All kinds in catalog order.
    pub const ALL: [Self; 4] = [Self::Q1, Self::Semiannual, Self::Q3, Self::Annual];

    /// Returns the five-character filing code used by the disclosure API.
    #[must_use]
    pub const fn report_code(&self) -> &'static str {
        match self {
            Self::Q1 => "11013",
            Self::Semiannual => "11012",
            Self::Q3 => "11014",
            Self::Annual => "11011",
        }
    }

    /// Looks a kind up by its filing code.
    #[must_use]
    pub fn from_report_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.report_code() == code)
    }

    /// Returns true for the three interim kinds.
    #[must_use]
    pub const fn is_interim(&self) -> bool {
        !matches!(self, Self::Annual)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Annual => "ANNUAL",
            Self::Semiannual => "SEMIANNUAL",
            Self::Q1 => "Q1",
            Self::Q3 => "Q3",
        };
        f.write_str(s)
    }
}

impl FromStr for ReportKind {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ANNUAL" | "11011" => Ok(Self::Annual),
            "SEMIANNUAL" | "11012" => Ok(Self::Semiannual),
            "Q1" | "11013" => Ok(Self::Q1),
            "Q3" | "11014" => Ok(Self::Q3),
            other => Err(ValuationError::InvalidParameter(format!(
                "unknown report kind: {other}"
            ))),
        }
    }
}

/// A report kind for a fiscal year, with its disclosure date once filed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportPeriod {
    /// Fiscal (business) year.
    pub fiscal_year: i32,
    /// Period kind.
    pub report_kind: ReportKind,
    /// Date the report was received by the regulator; `None` if not yet filed.
    pub disclosure_date: Option<NaiveDate>,
}

impl ReportPeriod {
    /// Creates a period that has not been disclosed.
    #[must_use]
    pub const fn new(fiscal_year: i32, report_kind: ReportKind) -> Self {
        Self {
            fiscal_year,
            report_kind,
            disclosure_date: None,
        }
    }

    /// Sets the disclosure date.
    #[must_use]
    pub const fn disclosed_on(mut self, date: NaiveDate) -> Self {
        self.disclosure_date = Some(date);
        self
    }

    /// Returns the five-character filing code of this period's kind.
    #[must_use]
    pub const fn report_code(&self) -> &'static str {
        self.report_kind.report_code()
    }

    /// Returns true once the report has a disclosure date.
    #[must_use]
    pub const fn is_disclosed(&self) -> bool {
        self.disclosure_date.is_some()
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY{} {}", self.fiscal_year, self.report_kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_codes() {
        assert_eq!(ReportKind::Annual.report_code(), "11011");
        assert_eq!(ReportKind::Semiannual.report_code(), "11012");
        assert_eq!(ReportKind::Q1.report_code(), "11013");
        assert_eq!(ReportKind::Q3.report_code(), "11014");
        assert_eq!(ReportKind::from_report_code("11014"), Some(ReportKind::Q3));
        assert_eq!(ReportKind::from_report_code("99999"), None);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("q3".parse::<ReportKind>().unwrap(), ReportKind::Q3);
        assert_eq!("annual".parse::<ReportKind>().unwrap(), ReportKind::Annual);
        assert!("Q2".parse::<ReportKind>().is_err());
    }

    #[test]
    fn test_disclosure_flag() {
        let period = ReportPeriod::new(2024, ReportKind::Annual);
        assert!(!period.is_disclosed());

        let date = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        let period = period.disclosed_on(date);
        assert!(period.is_disclosed());
        assert_eq!(period.to_string(), "FY2024 ANNUAL");
    }
}
