use serde_json::{json, Value};

use crate::config::QueryConfig;

use super::filter::Filter;
use super::filter_order::FilterOrder;
use super::types::{FilterOrderInfo, FilterWhereInfo};

/// Normalized list request: filter, sort, pagination and relations to expand
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub filter: Filter,
    pub sort: Vec<FilterOrderInfo>,
    pub skip: u64,
    pub limit: u64,
    /// Zero-based page index
    pub page: u64,
    pub populate: Vec<String>,
}

impl QuerySpec {
    /// Decode a raw URL query string, keeping parameter order
    pub fn from_query_string(raw: Option<&str>, config: &QueryConfig) -> Self {
        let params: Vec<(String, String)> = raw
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self::parse(&params, config)
    }

    /// Build a `QuerySpec` from decoded parameters.
    ///
    /// - `search[<field>]=v` adds a case-insensitive substring condition
    /// - `sort[<field>]=asc|desc|1|-1` adds a sort term in declaration order
    /// - `limit`, `page`, `skip` drive pagination; explicit `skip` wins
    ///
    /// Malformed values fall back to defaults; this never fails.
    pub fn parse(params: &[(String, String)], config: &QueryConfig) -> Self {
        let mut filter = Filter::new();
        let mut sort_pairs: Vec<(&str, &str)> = Vec::new();
        let mut limit_raw = None;
        let mut page_raw = None;
        let mut skip_raw = None;

        for (key, value) in params {
            if let Some(field) = bracketed(key, "search") {
                filter.push(FilterWhereInfo::contains_ignore_case(field, value.as_str()));
            } else if let Some(field) = bracketed(key, "sort") {
                sort_pairs.push((field, value.as_str()));
            } else {
                match key.as_str() {
                    "limit" => limit_raw = Some(value.as_str()),
                    "page" => page_raw = Some(value.as_str()),
                    "skip" => skip_raw = Some(value.as_str()),
                    _ => {}
                }
            }
        }

        let mut limit = positive_int(limit_raw).unwrap_or(config.default_page_size);
        if let Some(max) = config.max_limit.filter(|max| *max > 0) {
            if limit > max {
                if config.debug_logging {
                    tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max);
                }
                limit = max;
            }
        }

        let page = positive_int(page_raw).unwrap_or(1) - 1;
        let skip = positive_int(skip_raw).unwrap_or_else(|| page.saturating_mul(limit));

        Self {
            filter,
            sort: FilterOrder::parse(sort_pairs),
            skip,
            limit,
            page,
            populate: Vec::new(),
        }
    }

    /// Relations to expand are chosen by the caller, never by the request
    pub fn with_populate(mut self, relations: &[&str]) -> Self {
        self.populate = relations.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Narrow the request-derived filter with a handler-imposed one
    pub fn with_filter(mut self, extra: &Filter) -> Self {
        self.filter = self.filter.and(extra);
        self
    }

    pub fn sort_json(&self) -> Value {
        let mut out = serde_json::Map::new();
        for info in &self.sort {
            out.insert(info.column.clone(), json!(info.sort));
        }
        Value::Object(out)
    }
}

/// `search[title]` with prefix `search` yields `title`
fn bracketed<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let inner = key.strip_prefix(prefix)?.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

fn positive_int(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::{FilterOp, SortDirection};

    fn config() -> QueryConfig {
        QueryConfig {
            default_page_size: 20,
            max_limit: Some(100),
            debug_logging: false,
        }
    }

    fn parse(query: &str) -> QuerySpec {
        QuerySpec::from_query_string(Some(query), &config())
    }

    #[test]
    fn empty_query_yields_defaults() {
        let spec = QuerySpec::from_query_string(None, &config());
        assert!(spec.filter.is_empty());
        assert!(spec.sort.is_empty());
        assert_eq!(spec.skip, 0);
        assert_eq!(spec.limit, 20);
        assert_eq!(spec.page, 0);
        assert_eq!(spec, parse("unrelated=1"));
    }

    #[test]
    fn page_and_limit_compute_skip() {
        for (page, limit) in [(1u64, 10u64), (2, 10), (3, 7), (5, 1)] {
            let spec = parse(&format!("page={}&limit={}", page, limit));
            assert_eq!(spec.skip, (page - 1) * limit);
            assert_eq!(spec.limit, limit);
            assert_eq!(spec.page, page - 1);
        }
    }

    #[test]
    fn explicit_skip_overrides_page() {
        let spec = parse("page=4&limit=10&skip=3");
        assert_eq!(spec.skip, 3);
        let spec = parse("skip=15");
        assert_eq!(spec.skip, 15);
        // zero or garbage skip falls back to the page-derived value
        let spec = parse("page=2&limit=10&skip=0");
        assert_eq!(spec.skip, 10);
        let spec = parse("page=2&limit=10&skip=abc");
        assert_eq!(spec.skip, 10);
    }

    #[test]
    fn malformed_pagination_degrades_to_defaults() {
        let spec = parse("page=-2&limit=zero");
        assert_eq!(spec.limit, 20);
        assert_eq!(spec.page, 0);
        assert_eq!(spec.skip, 0);

        let spec = parse("limit=0&page=0");
        assert_eq!(spec.limit, 20);
        assert_eq!(spec.skip, 0);
    }

    #[test]
    fn limit_is_capped() {
        assert_eq!(parse("limit=5000").limit, 100);
    }

    #[test]
    fn zero_max_limit_does_not_cap() {
        let config = QueryConfig { max_limit: Some(0), ..config() };
        let spec = QuerySpec::from_query_string(Some("page=2"), &config);
        assert_eq!(spec.limit, 20);
        assert_eq!(spec.skip, 20);
    }

    #[test]
    fn search_keys_become_substring_conditions() {
        let spec = parse("search%5Btitle%5D=Cat&search[content]=x&title=ignored");
        let conditions = spec.filter.conditions();
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].column, "title");
        assert_eq!(conditions[0].operator, FilterOp::ILike);
        assert_eq!(conditions[0].data, json!("Cat"));
        assert_eq!(conditions[1].column, "content");
    }

    #[test]
    fn empty_brackets_are_ignored() {
        let spec = parse("search[]=x&sort[]=desc");
        assert!(spec.filter.is_empty());
        assert!(spec.sort.is_empty());
    }

    #[test]
    fn sort_terms_follow_request_order() {
        let spec = parse("sort[views]=-1&sort[title]=ASC&sort[createdAt]=bogus");
        let columns: Vec<_> = spec.sort.iter().map(|s| s.column.as_str()).collect();
        assert_eq!(columns, vec!["views", "title", "createdAt"]);
        assert_eq!(spec.sort[0].sort, SortDirection::Desc);
        assert_eq!(spec.sort[1].sort, SortDirection::Asc);
        assert_eq!(spec.sort[2].sort, SortDirection::Asc);
    }

    #[test]
    fn populate_comes_from_caller() {
        let spec = parse("populate=userId").with_populate(&["blogCategoryId", "userId"]);
        assert_eq!(spec.populate, vec!["blogCategoryId".to_string(), "userId".to_string()]);
        assert!(parse("populate=userId").populate.is_empty());
    }
}
