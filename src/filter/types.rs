use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Match operators understood by both store backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Equal to the value, or an array field containing it
    #[serde(rename = "$eq")]
    Eq,
    /// Equal to any value of an array
    #[serde(rename = "$in")]
    In,
    /// Case-insensitive substring match against a string field
    #[serde(rename = "$ilike")]
    ILike,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: Value,
}

impl FilterWhereInfo {
    pub fn eq(column: impl Into<String>, data: impl Into<Value>) -> Self {
        Self { column: column.into(), operator: FilterOp::Eq, data: data.into() }
    }

    pub fn one_of(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self { column: column.into(), operator: FilterOp::In, data: Value::Array(values) }
    }

    pub fn contains_ignore_case(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Self { column: column.into(), operator: FilterOp::ILike, data: Value::String(needle.into()) }
    }

    /// Dotted field names address nested documents
    pub fn path(&self) -> Vec<String> {
        self.column.split('.').map(str::to_string).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Accepts asc/desc, ascending/descending and 1/-1; anything else sorts ascending
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "desc" | "descending" | "-1" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

impl FilterOrderInfo {
    pub fn path(&self) -> Vec<String> {
        self.column.split('.').map(str::to_string).collect()
    }
}

/// Bound parameter for generated SQL
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Path(Vec<String>),
    Json(Value),
    Int(i64),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Push a parameter and return its placeholder
pub fn push_param(params: &mut Vec<SqlParam>, param: SqlParam) -> String {
    params.push(param);
    format!("${}", params.len())
}
