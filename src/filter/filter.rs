use serde_json::{json, Map, Value};

use super::filter_where::FilterWhere;
use super::types::{FilterOp, FilterWhereInfo, SqlParam};

/// Ordered set of conditions a document must satisfy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<FilterWhereInfo>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the primary key lookup every resource needs
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().eq("_id", id.into())
    }

    pub fn eq(mut self, column: impl Into<String>, data: impl Into<Value>) -> Self {
        self.push(FilterWhereInfo::eq(column, data));
        self
    }

    pub fn one_of(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.push(FilterWhereInfo::one_of(column, values));
        self
    }

    pub fn contains_ignore_case(mut self, column: impl Into<String>, needle: impl Into<String>) -> Self {
        self.push(FilterWhereInfo::contains_ignore_case(column, needle));
        self
    }

    /// A repeated column replaces the earlier condition in place
    pub fn push(&mut self, info: FilterWhereInfo) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.column == info.column && c.operator == info.operator)
        {
            Some(existing) => *existing = info,
            None => self.conditions.push(info),
        }
    }

    /// Conditions of `other` are appended after ours
    pub fn and(mut self, other: &Filter) -> Self {
        for info in &other.conditions {
            self.push(info.clone());
        }
        self
    }

    pub fn conditions(&self) -> &[FilterWhereInfo] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, document: &Map<String, Value>) -> bool {
        FilterWhere::matches(document, &self.conditions)
    }

    pub fn to_where_sql(&self, params: &mut Vec<SqlParam>) -> String {
        FilterWhere::generate(&self.conditions, params)
    }

    /// Echo form used in list details
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for info in &self.conditions {
            let rendered = match info.operator {
                FilterOp::Eq => info.data.clone(),
                FilterOp::In => json!({ "$in": info.data }),
                FilterOp::ILike => json!({ "$ilike": info.data }),
            };
            out.insert(info.column.clone(), rendered);
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_column_replaces_condition() {
        let filter = Filter::new()
            .contains_ignore_case("title", "a")
            .eq("userId", "u1")
            .contains_ignore_case("title", "b");
        assert_eq!(filter.conditions().len(), 2);
        assert_eq!(filter.conditions()[0].data, json!("b"));
    }

    #[test]
    fn echoes_conditions() {
        let filter = Filter::new().contains_ignore_case("title", "cat").eq("isPublished", true);
        assert_eq!(
            filter.to_json(),
            json!({ "title": { "$ilike": "cat" }, "isPublished": true })
        );
    }
}
