//! GAQL Query Builder
//!
//! Fluent accumulator for Google Ads Query Language statements.
//!
//! ```ignore
//! let query = GaqlBuilder::new()
//!     .add_select(["campaign.name", "metrics.clicks"])
//!     .set_source("campaign")
//!     .add_filter("campaign.status = ENABLED")
//!     .add_date_range("LAST_30_DAYS")
//!     .add_order("metrics.clicks", true)
//!     .set_limit(50)
//!     .build()?;
//! ```

use std::fmt;

use crate::common::{AppResult, XwanderError};

/// Field every date convenience filter targets
pub const DATE_FIELD: &str = "segments.date";

/// In-progress GAQL query
///
/// Clause order in the output is fixed (select, source, filters, order,
/// limit) no matter in which order the `add_*` methods were called. Within
/// a clause, insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GaqlBuilder {
    select_fields: Vec<String>,
    source: Option<String>,
    filters: Vec<String>,
    order_by: Vec<(String, bool)>,
    limit: Option<u64>,
}

impl GaqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append fields to the SELECT clause (no deduplication)
    pub fn add_select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Set the FROM resource; last call wins
    pub fn set_source(mut self, name: impl Into<String>) -> Self {
        self.source = Some(name.into());
        self
    }

    /// Append a raw WHERE predicate
    ///
    /// The predicate is inserted verbatim; quoting literals is the caller's job.
    pub fn add_filter(mut self, predicate: impl Into<String>) -> Self {
        self.filters.push(predicate.into());
        self
    }

    /// Shortcut for `segments.date DURING <window>` (e.g. `LAST_7_DAYS`)
    pub fn add_date_range(self, window_keyword: &str) -> Self {
        self.add_filter(format!("{} DURING {}", DATE_FIELD, window_keyword))
    }

    /// Inclusive literal date range, both bounds quoted (`YYYY-MM-DD`)
    pub fn add_date_between(self, start: &str, end: &str) -> Self {
        self.add_filter(format!("{} BETWEEN '{}' AND '{}'", DATE_FIELD, start, end))
    }

    /// Append an ORDER BY key; repeated calls produce a multi-key sort
    pub fn add_order(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order_by.push((field.into(), descending));
        self
    }

    /// Cap the number of returned rows; last call wins
    pub fn set_limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn select_fields(&self) -> &[String] {
        &self.select_fields
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Assemble the query string
    ///
    /// Does not consume or mutate the builder, so it may be called again
    /// after further `add_*` calls.
    pub fn build(&self) -> AppResult<String> {
        if self.select_fields.is_empty() {
            return Err(XwanderError::malformed_query("SELECT clause is required"));
        }
        let source = match self.source.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => return Err(XwanderError::malformed_query("FROM clause is required")),
        };

        let mut parts = Vec::with_capacity(5);
        parts.push(format!("SELECT {}", self.select_fields.join(", ")));
        parts.push(format!("FROM {}", source));

        if !self.filters.is_empty() {
            parts.push(format!("WHERE {}", self.filters.join(" AND ")));
        }

        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|(field, desc)| format!("{} {}", field, if *desc { "DESC" } else { "ASC" }))
                .collect();
            parts.push(format!("ORDER BY {}", keys.join(", ")));
        }

        if let Some(limit) = self.limit {
            parts.push(format!("LIMIT {}", limit));
        }

        Ok(parts.join(" "))
    }
}

impl fmt::Display for GaqlBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.build() {
            Ok(query) => f.write_str(&query),
            Err(e) => write!(f, "<{}>", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_query_matches_expected_text() {
        let query = GaqlBuilder::new()
            .add_select(["campaign.id", "campaign.name"])
            .set_source("campaign")
            .add_filter("campaign.status = ENABLED")
            .add_order("metrics.clicks", true)
            .set_limit(50)
            .build()
            .unwrap();

        assert_eq!(
            query,
            "SELECT campaign.id, campaign.name FROM campaign WHERE campaign.status = ENABLED ORDER BY metrics.clicks DESC LIMIT 50"
        );
    }

    #[test]
    fn test_missing_select_is_malformed() {
        let err = GaqlBuilder::new().set_source("x").build().unwrap_err();
        assert!(matches!(err, XwanderError::MalformedQuery(_)));
        assert!(err.to_string().contains("SELECT clause is required"));
    }

    #[test]
    fn test_missing_source_is_malformed() {
        let err = GaqlBuilder::new().add_select(["a"]).build().unwrap_err();
        assert!(matches!(err, XwanderError::MalformedQuery(_)));
        assert!(err.to_string().contains("FROM clause is required"));
    }

    #[test]
    fn test_build_is_repeatable() {
        let builder = GaqlBuilder::new()
            .add_select(["campaign.name"])
            .set_source("campaign")
            .add_filter("campaign.status = ENABLED");

        assert_eq!(builder.build().unwrap(), builder.build().unwrap());

        // Still usable after build
        let extended = builder.clone().set_limit(5);
        assert!(extended.build().unwrap().ends_with("LIMIT 5"));
        assert!(!builder.build().unwrap().contains("LIMIT"));
    }

    #[test]
    fn test_clause_order_is_fixed() {
        // Deliberately call the setters out of clause order
        let query = GaqlBuilder::new()
            .set_limit(10)
            .add_order("metrics.cost_micros", false)
            .add_filter("campaign.status = ENABLED")
            .set_source("campaign")
            .add_select(["campaign.name"])
            .build()
            .unwrap();

        let where_pos = query.find("WHERE").unwrap();
        let order_pos = query.find("ORDER BY").unwrap();
        let limit_pos = query.find("LIMIT").unwrap();
        assert!(query.starts_with("SELECT"));
        assert!(where_pos < order_pos && order_pos < limit_pos);
    }

    #[test]
    fn test_filters_joined_with_and() {
        let query = GaqlBuilder::new()
            .add_select(["campaign.name", "metrics.clicks"])
            .set_source("campaign")
            .add_filter("campaign.status = ENABLED")
            .add_date_range("LAST_7_DAYS")
            .build()
            .unwrap();

        assert!(query.contains("WHERE campaign.status = ENABLED AND segments.date DURING LAST_7_DAYS"));
    }

    #[test]
    fn test_date_between_quotes_bounds() {
        let query = GaqlBuilder::new()
            .add_select(["campaign.name"])
            .set_source("campaign")
            .add_date_between("2025-01-01", "2025-01-31")
            .build()
            .unwrap();

        assert!(query.contains("segments.date BETWEEN '2025-01-01' AND '2025-01-31'"));
    }

    #[test]
    fn test_multi_key_order_and_last_wins() {
        let query = GaqlBuilder::new()
            .add_select(["a"])
            .add_select(["b", "a"])
            .set_source("first")
            .set_source("ad_group")
            .add_order("metrics.clicks", true)
            .add_order("ad_group.name", false)
            .set_limit(1)
            .set_limit(20)
            .build()
            .unwrap();

        assert_eq!(
            query,
            "SELECT a, b, a FROM ad_group ORDER BY metrics.clicks DESC, ad_group.name ASC LIMIT 20"
        );
    }

    #[test]
    fn test_display_renders_error_for_incomplete_builder() {
        let shown = GaqlBuilder::new().add_select(["a"]).to_string();
        assert!(shown.contains("FROM clause is required"));
    }
}
