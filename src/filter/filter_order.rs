use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::filter_where::lookup;
use super::types::{push_param, FilterOrderInfo, SortDirection, SqlParam};

pub struct FilterOrder;

impl FilterOrder {
    /// Build sort terms from `(field, direction)` pairs, preserving their order.
    /// A field declared twice keeps its first position and its last direction.
    pub fn parse<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<FilterOrderInfo> {
        let mut out: Vec<FilterOrderInfo> = Vec::new();
        for (column, token) in pairs {
            if column.is_empty() {
                continue;
            }
            let sort = SortDirection::parse(token);
            match out.iter_mut().find(|info| info.column == column) {
                Some(existing) => existing.sort = sort,
                None => out.push(FilterOrderInfo { column: column.to_string(), sort }),
            }
        }
        out
    }

    /// ORDER BY clause with insertion order as the final tie-break
    pub fn generate(infos: &[FilterOrderInfo], params: &mut Vec<SqlParam>) -> String {
        let mut parts: Vec<String> = infos
            .iter()
            .map(|info| {
                let path = push_param(params, SqlParam::Path(info.path()));
                // missing fields rank with null: first ascending, last descending
                let nulls = match info.sort {
                    SortDirection::Asc => "NULLS FIRST",
                    SortDirection::Desc => "NULLS LAST",
                };
                format!("(data #> {}::text[]) {} {}", path, info.sort.to_sql(), nulls)
            })
            .collect();
        parts.push("seq ASC".to_string());
        format!("ORDER BY {}", parts.join(", "))
    }

    /// Compare two documents term by term
    pub fn compare(a: &Map<String, Value>, b: &Map<String, Value>, infos: &[FilterOrderInfo]) -> Ordering {
        for info in infos {
            let path = info.path();
            let ordering = compare_values(lookup(a, &path), lookup(b, &path));
            let ordering = match info.sort {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

// Missing and null sort first, then numbers, strings, objects, arrays, booleans
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x.len().cmp(&y.len()),
        (Some(Value::Object(x)), Some(Value::Object(y))) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
