//! Company identifier resolution.
//!
//! [`CorpRegistry`] is an explicitly constructed, read-only index of filing
//! entities. [`IdentifierResolver`] maps free-form input onto exactly one
//! entry of it, or fails without guessing.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use netcash_core::types::{REGISTRY_ID_LEN, TICKER_LEN};
use netcash_core::{CompanyRef, Result, ValuationError};

/// Korean corporate designators, stripped from either end of a name.
const KOREAN_DESIGNATORS: &[&str] = &["주식회사", "(주)", "㈜", "유한회사", "(유)"];

/// Trailing English designator words, compared without surrounding punctuation.
const ENGLISH_DESIGNATORS: &[&str] = &[
    "co", "co.,ltd", "co.ltd", "company", "corp", "corporation", "inc", "incorporated", "ltd",
    "limited",
];

/// Normalize a company name for loose comparison.
///
/// Lowercases, drops trailing English designator words, removes all
/// whitespace and strips Korean designators from either end.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut words: Vec<&str> = lowered.split_whitespace().collect();
    while let Some(last) = words.last() {
        let bare = last.trim_matches(|c| c == ',' || c == '.');
        if words.len() > 1 && ENGLISH_DESIGNATORS.contains(&bare) {
            words.pop();
        } else {
            break;
        }
    }

    let mut norm = words.concat();
    loop {
        let before = norm.len();
        for designator in KOREAN_DESIGNATORS {
            if let Some(rest) = norm.strip_prefix(designator) {
                norm = rest.to_string();
            }
            if let Some(rest) = norm.strip_suffix(designator) {
                norm = rest.to_string();
            }
        }
        norm = norm.trim_matches(|c| c == ',' || c == '.').to_string();
        if norm.len() == before {
            break;
        }
    }

    norm
}

/// Read-only index of filing entities.
///
/// Built once from registry records; refreshing means building a new
/// registry.
#[derive(Debug, Default)]
pub struct CorpRegistry {
    entries: Vec<CompanyRef>,
    by_registry_id: HashMap<String, usize>,
    by_ticker: HashMap<String, Vec<usize>>,
    by_exact_name: HashMap<String, Vec<usize>>,
    by_normalized_name: HashMap<String, Vec<usize>>,
}

impl CorpRegistry {
    /// Build a registry from `(display name, registry id, ticker)` records.
    ///
    /// Identifiers are zero-padded. A duplicated registry id keeps the first
    /// record.
    pub fn from_entries<I, N, R, T>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, R, Option<T>)>,
        N: Into<String>,
        R: AsRef<str>,
        T: AsRef<str>,
    {
        let mut registry = Self::default();
        for (name, registry_id, ticker) in records {
            let company =
                CompanyRef::new(name, registry_id.as_ref(), ticker.as_ref().map(AsRef::as_ref))?;
            registry.insert(company);
        }
        debug!(entries = registry.len(), "Built company registry");
        Ok(registry)
    }

    fn insert(&mut self, company: CompanyRef) {
        if self.by_registry_id.contains_key(&company.registry_id) {
            return;
        }
        let idx = self.entries.len();
        self.by_registry_id.insert(company.registry_id.clone(), idx);
        if let Some(ticker) = &company.ticker_code {
            self.by_ticker.entry(ticker.clone()).or_default().push(idx);
        }
        self.by_exact_name
            .entry(company.display_name.clone())
            .or_default()
            .push(idx);
        self.by_normalized_name
            .entry(normalize_name(&company.display_name))
            .or_default()
            .push(idx);
        self.entries.push(company);
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks an entry up by its eight-digit registry id.
    #[must_use]
    pub fn get(&self, registry_id: &str) -> Option<&CompanyRef> {
        self.by_registry_id
            .get(registry_id)
            .map(|&idx| &self.entries[idx])
    }

    fn collect(&self, indices: Option<&Vec<usize>>) -> Vec<&CompanyRef> {
        indices
            .map(|v| v.iter().map(|&idx| &self.entries[idx]).collect())
            .unwrap_or_default()
    }
}

/// Resolves free-form company queries against a [`CorpRegistry`].
#[derive(Debug, Clone)]
pub struct IdentifierResolver {
    registry: Arc<CorpRegistry>,
}

impl IdentifierResolver {
    /// Create a resolver over a registry.
    #[must_use]
    pub const fn new(registry: Arc<CorpRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &CorpRegistry {
        &self.registry
    }

    /// Resolve a query to exactly one company.
    ///
    /// Six digits are looked up as a ticker and eight digits as a registry id.
    /// Anything else is matched against display names, exactly first and
    /// then normalized.
    pub fn resolve(&self, query: &str) -> Result<CompanyRef> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(ValuationError::InvalidParameter(
                "empty company query".to_string(),
            ));
        }

        let all_digits = trimmed.chars().all(|c| c.is_ascii_digit());
        let company = if all_digits && trimmed.len() == TICKER_LEN {
            let matches = self.registry.collect(self.registry.by_ticker.get(trimmed));
            single(trimmed, matches)?
        } else if all_digits && trimmed.len() == REGISTRY_ID_LEN {
            self.registry
                .get(trimmed)
                .cloned()
                .ok_or_else(|| ValuationError::UnknownCompany(trimmed.to_string()))?
        } else {
            let exact = self
                .registry
                .collect(self.registry.by_exact_name.get(trimmed));
            if exact.is_empty() {
                let normalized = normalize_name(trimmed);
                let matches = self
                    .registry
                    .collect(self.registry.by_normalized_name.get(&normalized));
                single(trimmed, matches)?
            } else {
                single(trimmed, exact)?
            }
        };

        debug!(query = trimmed, company = %company, "Resolved company");
        Ok(company)
    }
}

fn single(query: &str, matches: Vec<&CompanyRef>) -> Result<CompanyRef> {
    match matches.as_slice() {
        [] => Err(ValuationError::UnknownCompany(query.to_string())),
        [only] => Ok((*only).clone()),
        many => Err(ValuationError::AmbiguousIdentifier {
            query: query.to_string(),
            candidates: many
                .iter()
                .map(|c| format!("{} ({})", c.display_name, c.registry_id))
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcash_core::ErrorKind;

    fn resolver() -> IdentifierResolver {
        let registry = CorpRegistry::from_entries([
            ("삼성전자", "00126380", Some("005930")),
            ("SK하이닉스", "00164779", Some("000660")),
            ("(주)한빛소프트", "00410021", None),
            ("대한전선", "00111111", Some("001440")),
            ("대한 전선(주)", "00222222", None),
            ("Acme Holdings Co., Ltd.", "00333333", None),
        ])
        .unwrap();
        IdentifierResolver::new(Arc::new(registry))
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("삼성 전자"), "삼성전자");
        assert_eq!(normalize_name("(주)한빛소프트"), "한빛소프트");
        assert_eq!(normalize_name("한빛소프트 주식회사"), "한빛소프트");
        assert_eq!(normalize_name("Acme Holdings Co., Ltd."), "acmeholdings");
        assert_eq!(normalize_name("ACME Holdings Inc."), "acmeholdings");
        assert_eq!(normalize_name("Korea Zinc"), "koreazinc");
    }

    #[test]
    fn test_resolve_by_ticker() {
        let company = resolver().resolve("005930").unwrap();
        assert_eq!(company.registry_id, "00126380");
        assert_eq!(company.display_name, "삼성전자");
    }

    #[test]
    fn test_resolve_by_registry_id() {
        let company = resolver().resolve(" 00164779 ").unwrap();
        assert_eq!(company.ticker_code.as_deref(), Some("000660"));
    }

    #[test]
    fn test_resolve_exact_then_normalized() {
        let r = resolver();
        assert_eq!(r.resolve("삼성전자").unwrap().registry_id, "00126380");
        assert_eq!(r.resolve("sk하이닉스").unwrap().registry_id, "00164779");
        assert_eq!(r.resolve("한빛소프트").unwrap().registry_id, "00410021");
        assert_eq!(r.resolve("acme holdings").unwrap().registry_id, "00333333");
    }

    #[test]
    fn test_exact_match_wins_over_normalized_collision() {
        // "대한전선" and "대한 전선(주)" normalize identically; the exact name is unique.
        let company = resolver().resolve("대한전선").unwrap();
        assert_eq!(company.registry_id, "00111111");
    }

    #[test]
    fn test_ambiguous_normalized_match() {
        let err = resolver().resolve("대한  전선").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousIdentifier);
        match err {
            ValuationError::AmbiguousIdentifier { candidates, .. } => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_company() {
        let r = resolver();
        assert_eq!(r.resolve("없는회사").unwrap_err().kind(), ErrorKind::UnknownCompany);
        assert_eq!(r.resolve("999999").unwrap_err().kind(), ErrorKind::UnknownCompany);
        assert_eq!(r.resolve("99999999").unwrap_err().kind(), ErrorKind::UnknownCompany);
        assert_eq!(r.resolve("  ").unwrap_err().kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_registry_pads_and_dedupes() {
        let registry = CorpRegistry::from_entries([
            ("A", "126380", Some("5930")),
            ("B", "00126380", None::<&str>),
        ])
        .unwrap();
        assert_eq!(registry.len(), 1);
        let company = registry.get("00126380").unwrap();
        assert_eq!(company.display_name, "A");
        assert_eq!(company.ticker_code.as_deref(), Some("005930"));
    }
}
