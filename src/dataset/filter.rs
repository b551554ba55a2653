//! Row and line predicates.
//!
//! `RowFilter` is a conjunction of independent per-row predicates, so
//! applying it twice, or splitting it and applying the parts in any order,
//! keeps the same rows. `LineFilter` is a cheap raw-text prefilter for CSV
//! records; it may accept records the row filter later rejects, never the
//! reverse.

use crate::dataset::row::CanonicalRow;

/// Compare provider ids the way upstreams disagree on them: trimmed,
/// leading zeros stripped, case-insensitive.
pub fn normalize_provider_id(id: &str) -> String {
    id.trim().trim_start_matches('0').to_ascii_uppercase()
}

/// Post-fetch row predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    query: Option<String>,
    state: Option<String>,
    provider: Option<String>,
}

impl RowFilter {
    /// Free-text query on name/city and exact state match.
    pub fn search(query: Option<&str>, state: Option<&str>) -> Self {
        Self {
            query: non_blank(query).map(str::to_lowercase),
            state: non_blank(state).map(str::to_uppercase),
            provider: None,
        }
    }

    /// Exact provider id match.
    pub fn provider(id: &str) -> Self {
        Self {
            query: None,
            state: None,
            provider: non_blank(Some(id)).map(normalize_provider_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.state.is_none() && self.provider.is_none()
    }

    pub fn matches(&self, row: &CanonicalRow) -> bool {
        if let Some(query) = &self.query {
            let hit = |field: Option<&str>| {
                field.is_some_and(|value| value.to_lowercase().contains(query.as_str()))
            };
            if !hit(row.name()) && !hit(row.city()) {
                return false;
            }
        }

        if let Some(state) = &self.state {
            if !row.state().is_some_and(|s| s.trim().eq_ignore_ascii_case(state)) {
                return false;
            }
        }

        if let Some(provider) = &self.provider {
            if !row
                .provider_id()
                .is_some_and(|id| normalize_provider_id(id) == *provider)
            {
                return false;
            }
        }

        true
    }

    pub fn apply(&self, rows: Vec<CanonicalRow>) -> Vec<CanonicalRow> {
        if self.is_empty() {
            return rows;
        }
        rows.into_iter().filter(|row| self.matches(row)).collect()
    }
}

/// Raw CSV line prefilter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineFilter {
    query: Option<String>,
    state: Option<String>,
    id_variants: Vec<String>,
}

impl LineFilter {
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn search(query: Option<&str>, state: Option<&str>) -> Self {
        Self {
            query: non_blank(query).map(str::to_lowercase),
            state: non_blank(state).map(str::to_uppercase),
            id_variants: Vec::new(),
        }
    }

    /// Accept lines containing the id as given, without leading zeros, or zero-padded to six digits.
    pub fn provider(id: &str) -> Self {
        let raw = id.trim();
        let mut id_variants = Vec::with_capacity(3);
        for variant in [
            raw.to_string(),
            raw.trim_start_matches('0').to_string(),
            format!("{:0>6}", raw),
        ] {
            if !variant.is_empty() && !id_variants.contains(&variant) {
                id_variants.push(variant);
            }
        }
        Self {
            query: None,
            state: None,
            id_variants,
        }
    }

    pub fn accepts(&self, line: &str) -> bool {
        if let Some(query) = &self.query {
            if !line.to_lowercase().contains(query.as_str()) {
                return false;
            }
        }
        if let Some(state) = &self.state {
            if !line.to_uppercase().contains(state.as_str()) {
                return false;
            }
        }
        if !self.id_variants.is_empty() && !self.id_variants.iter().any(|v| line.contains(v.as_str())) {
            return false;
        }
        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
