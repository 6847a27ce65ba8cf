use serde_json::{Map, Value};

use super::types::{push_param, FilterOp, FilterWhereInfo, SqlParam};

/// Renders and evaluates filter conditions. Conditions are ANDed together.
pub struct FilterWhere;

impl FilterWhere {
    /// Build a WHERE predicate over the `data` JSONB column. Field paths and
    /// values are always bound, never spliced into the SQL text.
    pub fn generate(conditions: &[FilterWhereInfo], params: &mut Vec<SqlParam>) -> String {
        if conditions.is_empty() {
            return "TRUE".to_string();
        }
        conditions
            .iter()
            .map(|condition| Self::build_sql_condition(condition, params))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn build_sql_condition(condition: &FilterWhereInfo, params: &mut Vec<SqlParam>) -> String {
        let path = push_param(params, SqlParam::Path(condition.path()));
        let field = format!("(data #> {}::text[])", path);

        match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() {
                    return format!("({field} IS NULL OR {field} = 'null'::jsonb)");
                }
                let value = push_param(params, SqlParam::Json(condition.data.clone()));
                format!(
                    "({field} = {value}::jsonb OR (jsonb_typeof({field}) = 'array' AND {field} @> jsonb_build_array({value}::jsonb)))"
                )
            }
            FilterOp::In => {
                let values = match &condition.data {
                    Value::Array(values) if !values.is_empty() => values.clone(),
                    Value::Array(_) => return "FALSE".to_string(),
                    other => vec![other.clone()],
                };
                let set = push_param(params, SqlParam::Json(Value::Array(values)));
                format!("({set}::jsonb @> jsonb_build_array({field}))")
            }
            FilterOp::ILike => {
                let needle = match &condition.data {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let pattern = push_param(params, SqlParam::Text(format!("%{}%", escape_like(&needle))));
                format!(
                    "(jsonb_typeof({field}) = 'string' AND (data #>> {path}::text[]) ILIKE {pattern})"
                )
            }
        }
    }

    /// In-memory evaluation with the same semantics as the generated SQL
    pub fn matches(document: &Map<String, Value>, conditions: &[FilterWhereInfo]) -> bool {
        conditions
            .iter()
            .all(|condition| Self::matches_condition(document, condition))
    }

    fn matches_condition(document: &Map<String, Value>, condition: &FilterWhereInfo) -> bool {
        let value = lookup(document, &condition.path());

        match condition.operator {
            FilterOp::Eq => match value {
                None | Some(Value::Null) => condition.data.is_null(),
                Some(Value::Array(items)) => {
                    items.contains(&condition.data) || value == Some(&condition.data)
                }
                Some(v) => v == &condition.data,
            },
            FilterOp::In => {
                let candidates = match &condition.data {
                    Value::Array(values) => values.as_slice(),
                    other => std::slice::from_ref(other),
                };
                match value {
                    None => candidates.contains(&Value::Null),
                    Some(v) => candidates.contains(v),
                }
            }
            FilterOp::ILike => {
                let needle = match &condition.data {
                    Value::String(s) => s.to_lowercase(),
                    other => other.to_string().to_lowercase(),
                };
                match value {
                    Some(Value::String(s)) => s.to_lowercase().contains(&needle),
                    _ => false,
                }
            }
        }
    }
}

/// Resolve a dotted path inside a document
pub fn lookup<'a>(document: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = document.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Escape LIKE metacharacters so the needle matches literally
fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn substring_search_ignores_case() {
        let cond = vec![FilterWhereInfo::contains_ignore_case("title", "Cat")];
        assert!(FilterWhere::matches(&doc(json!({"title": "my cat"})), &cond));
        assert!(FilterWhere::matches(&doc(json!({"title": "Cat"})), &cond));
        assert!(FilterWhere::matches(&doc(json!({"title": "CATALOG"})), &cond));
        assert!(!FilterWhere::matches(&doc(json!({"title": "dog"})), &cond));
        assert!(!FilterWhere::matches(&doc(json!({"name": "cat"})), &cond));
    }

    #[test]
    fn substring_search_is_literal() {
        let cond = vec![FilterWhereInfo::contains_ignore_case("title", "c.t")];
        assert!(!FilterWhere::matches(&doc(json!({"title": "cat"})), &cond));
        assert!(FilterWhere::matches(&doc(json!({"title": "a c.t here"})), &cond));
    }

    #[test]
    fn equality_matches_scalars_and_array_members() {
        let cond = vec![FilterWhereInfo::eq("likes", "u1")];
        assert!(FilterWhere::matches(&doc(json!({"likes": ["u0", "u1"]})), &cond));
        assert!(!FilterWhere::matches(&doc(json!({"likes": []})), &cond));

        let cond = vec![FilterWhereInfo::eq("blogCategoryId", "c1")];
        assert!(FilterWhere::matches(&doc(json!({"blogCategoryId": "c1"})), &cond));
        assert!(!FilterWhere::matches(&doc(json!({"blogCategoryId": "c2"})), &cond));
    }

    #[test]
    fn nested_paths_resolve() {
        let cond = vec![FilterWhereInfo::contains_ignore_case("author.name", "ann")];
        assert!(FilterWhere::matches(&doc(json!({"author": {"name": "Joanna"}})), &cond));
        assert!(!FilterWhere::matches(&doc(json!({"author": "Joanna"})), &cond));
    }

    #[test]
    fn in_matches_any_candidate() {
        let cond = vec![FilterWhereInfo::one_of("_id", vec![json!("a"), json!("b")])];
        assert!(FilterWhere::matches(&doc(json!({"_id": "b"})), &cond));
        assert!(!FilterWhere::matches(&doc(json!({"_id": "c"})), &cond));
    }

    #[test]
    fn generates_bound_sql() {
        let mut params = vec![];
        let sql = FilterWhere::generate(
            &[
                FilterWhereInfo::contains_ignore_case("title", "50%"),
                FilterWhereInfo::eq("isPublished", true),
            ],
            &mut params,
        );
        assert!(sql.contains("ILIKE $2"));
        assert!(sql.contains(" AND "));
        assert_eq!(params[0], SqlParam::Path(vec!["title".to_string()]));
        assert_eq!(params[1], SqlParam::Text("%50\\%%".to_string()));
        assert_eq!(params[3], SqlParam::Json(json!(true)));
    }

    #[test]
    fn empty_conditions_match_everything() {
        let mut params = vec![];
        assert_eq!(FilterWhere::generate(&[], &mut params), "TRUE");
        assert!(params.is_empty());
        assert!(FilterWhere::matches(&doc(json!({})), &[]));
    }
}
