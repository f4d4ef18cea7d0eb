// src/query.rs
//! App queries for `list_apps`
//!
//! A query is a set of optional filters. Every plugin states which filters
//! it can serve and rejects any query using another one with
//! [`Error::UnsupportedQuery`], so a filter is never silently ignored.

use crate::app::DedupFlags;
use crate::bitset::bitset;
use crate::error::{Error, Result};
use crate::plugin::RefineFlags;

bitset! {
    /// Filters set on an [`AppQuery`]
    pub struct QueryFilters: u32 {
        const KEYWORDS = 1 << 0;
        const CATEGORY = 1 << 1;
        const IS_FEATURED = 1 << 2;
        const IS_INSTALLED = 1 << 3;
        const IS_FOR_UPDATE = 1 << 4;
        const IS_CURATED = 1 << 5;
        const IS_LANGPACK_FOR_LOCALE = 1 << 6;
        const PROVIDES_TAG = 1 << 7;
        const DEVELOPERS = 1 << 8;
        const ALTERNATE_OF = 1 << 9;
    }
}

/// Filters and result shaping for one `list_apps` call
#[derive(Debug, Clone, Default)]
pub struct AppQuery {
    pub keywords: Option<Vec<String>>,
    pub category: Option<String>,
    pub is_featured: Option<bool>,
    pub is_installed: Option<bool>,
    pub is_for_update: Option<bool>,
    pub is_curated: Option<bool>,
    pub is_langpack_for_locale: Option<String>,
    pub provides_tag: Option<String>,
    pub developers: Option<Vec<String>>,
    pub alternate_of: Option<String>,

    /// Refinement applied to the combined result
    pub refine_flags: RefineFlags,
    /// Truncate the result to this many apps
    pub max_results: Option<usize>,
    pub dedupe_flags: DedupFlags,
}

impl AppQuery {
    pub fn new() -> Self {
        Self {
            dedupe_flags: DedupFlags::KEY_ID,
            ..Self::default()
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_featured(mut self, featured: bool) -> Self {
        self.is_featured = Some(featured);
        self
    }

    pub fn with_installed(mut self, installed: bool) -> Self {
        self.is_installed = Some(installed);
        self
    }

    pub fn with_for_update(mut self, for_update: bool) -> Self {
        self.is_for_update = Some(for_update);
        self
    }

    pub fn with_curated(mut self, curated: bool) -> Self {
        self.is_curated = Some(curated);
        self
    }

    pub fn with_langpack_for_locale(mut self, locale: &str) -> Self {
        self.is_langpack_for_locale = Some(locale.to_string());
        self
    }

    pub fn with_provides_tag(mut self, tag: &str) -> Self {
        self.provides_tag = Some(tag.to_string());
        self
    }

    pub fn with_developers<I, S>(mut self, developers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.developers = Some(developers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_alternate_of(mut self, id: &str) -> Self {
        self.alternate_of = Some(id.to_string());
        self
    }

    pub fn with_refine_flags(mut self, flags: RefineFlags) -> Self {
        self.refine_flags = flags;
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn with_dedupe_flags(mut self, flags: DedupFlags) -> Self {
        self.dedupe_flags = flags;
        self
    }

    /// Filters this query uses
    pub fn filters_set(&self) -> QueryFilters {
        let mut filters = QueryFilters::empty();
        let mut mark = |set: bool, flag| {
            if set {
                filters.insert(flag);
            }
        };
        mark(self.keywords.is_some(), QueryFilters::KEYWORDS);
        mark(self.category.is_some(), QueryFilters::CATEGORY);
        mark(self.is_featured.is_some(), QueryFilters::IS_FEATURED);
        mark(self.is_installed.is_some(), QueryFilters::IS_INSTALLED);
        mark(self.is_for_update.is_some(), QueryFilters::IS_FOR_UPDATE);
        mark(self.is_curated.is_some(), QueryFilters::IS_CURATED);
        mark(self.is_langpack_for_locale.is_some(), QueryFilters::IS_LANGPACK_FOR_LOCALE);
        mark(self.provides_tag.is_some(), QueryFilters::PROVIDES_TAG);
        mark(self.developers.is_some(), QueryFilters::DEVELOPERS);
        mark(self.alternate_of.is_some(), QueryFilters::ALTERNATE_OF);
        filters
    }

    /// Reject the query unless it sets at least one filter and only
    /// filters from `supported`
    pub fn ensure_supported(&self, supported: QueryFilters) -> Result<()> {
        let filters = self.filters_set();
        if filters.is_empty() {
            return Err(Error::UnsupportedQuery("query sets no filter".to_string()));
        }
        let unsupported = filters - supported;
        if !unsupported.is_empty() {
            return Err(Error::UnsupportedQuery(format!(
                "unsupported filters: {}",
                unsupported.names().join(", ").to_ascii_lowercase()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_set() {
        let query = AppQuery::new().with_category("games").with_featured(true).with_max_results(5);
        assert_eq!(query.filters_set(), QueryFilters::CATEGORY | QueryFilters::IS_FEATURED);
    }

    #[test]
    fn test_unsupported_combination_rejected() {
        let query = AppQuery::new()
            .with_langpack_for_locale("pt_BR")
            .with_keywords(["office"]);
        let err = query
            .ensure_supported(QueryFilters::IS_LANGPACK_FOR_LOCALE)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedQuery(_)));
        assert!(err.to_string().contains("keywords"));

        let query = AppQuery::new().with_langpack_for_locale("pt_BR");
        assert!(query.ensure_supported(QueryFilters::IS_LANGPACK_FOR_LOCALE).is_ok());
    }

    #[test]
    fn test_empty_query_rejected() {
        assert!(matches!(
            AppQuery::new().ensure_supported(QueryFilters::KEYWORDS),
            Err(Error::UnsupportedQuery(_))
        ));
    }
}
