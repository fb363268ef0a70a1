use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod intent;
pub mod raw;

pub use intent::{
    AggregateIntent, AggregateSpec, Aggregation, ColumnRef, Filter, FilterValue, JoinIntent,
    Operator, OrderBy, QueryIntent, SelectIntent, SortDirection,
};
pub use raw::{RawFilter, RawIntent, RawOrder};

/// Declared data type of a catalog column.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Number,
    Date,
    Boolean,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A literal value travelling out-of-band next to the statement text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Bool(b) => serde_json::Value::Bool(*b),
            SqlValue::Integer(i) => serde_json::Value::from(*i),
            SqlValue::Real(r) => serde_json::Number::from_f64(*r)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            SqlValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => Ok(()),
            SqlValue::Bool(b) => write!(f, "{b}"),
            SqlValue::Integer(i) => write!(f, "{i}"),
            SqlValue::Real(r) => write!(f, "{r}"),
            SqlValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

/// How positional placeholders are spelled in statement text.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `?` (SQLite, MySQL)
    #[default]
    Question,
    /// `?1`, `?2`, ...
    Numbered,
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
}

impl PlaceholderStyle {
    /// Placeholder token for the 1-based parameter `index`.
    pub fn render(self, index: usize) -> String {
        match self {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Numbered => format!("?{index}"),
            PlaceholderStyle::Dollar => format!("${index}"),
        }
    }

    fn marker(self) -> char {
        match self {
            PlaceholderStyle::Question | PlaceholderStyle::Numbered => '?',
            PlaceholderStyle::Dollar => '$',
        }
    }
}

impl FromStr for PlaceholderStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "?" | "question" | "sqlite" => Ok(PlaceholderStyle::Question),
            "?n" | "numbered" => Ok(PlaceholderStyle::Numbered),
            "$n" | "dollar" | "postgres" => Ok(PlaceholderStyle::Dollar),
            other => Err(format!("unknown placeholder style `{other}`")),
        }
    }
}

/// Output of synthesis: statement text plus positional bound values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub text: String,
    pub params: Vec<SqlValue>,
    pub style: PlaceholderStyle,
}

impl Statement {
    /// Number of placeholder tokens in `text`, ignoring quoted identifiers and string literals.
    pub fn placeholder_count(&self) -> usize {
        let marker = self.style.marker();
        let mut count = 0;
        let mut quote: Option<char> = None;
        for c in self.text.chars() {
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '"' || c == '\'' => quote = Some(c),
                None if c == marker => count += 1,
                None => {}
            }
        }
        count
    }
}

/// Rows returned by an execution engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The single value of a one-row, one-column result.
    pub fn scalar(&self) -> Option<&SqlValue> {
        match (self.columns.len(), self.rows.as_slice()) {
            (1, [row]) => row.first(),
            _ => None,
        }
    }

    /// Rows as JSON objects keyed by column name.
    pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect()
            })
            .collect()
    }
}

/// Table/column names handed to intent parsers for grounding.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub tables: Vec<TableTerms>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableTerms {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub columns: Vec<ColumnTerms>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnTerms {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub data_type: ColumnType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<Qualifier>,
}

/// A word placed before a table name that stands for a condition on one of
/// its columns: `female` in "female customers", `high spending` in "high
/// spending customers".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Qualifier {
    pub phrase: String,
    #[serde(default = "equals")]
    pub operator: Operator,
    #[serde(default)]
    pub value: SqlValue,
}

fn equals() -> Operator {
    Operator::Equals
}

impl Qualifier {
    pub fn new(phrase: impl Into<String>, operator: Operator, value: impl Into<SqlValue>) -> Self {
        Self {
            phrase: phrase.into(),
            operator,
            value: value.into(),
        }
    }

    /// Single-value comparisons, or a null check with no value.
    pub fn is_well_formed(&self) -> bool {
        if self.phrase.trim().is_empty() {
            return false;
        }
        match self.operator {
            Operator::IsNull | Operator::IsNotNull => self.value.is_null(),
            Operator::Between | Operator::InList => false,
            _ => !self.value.is_null(),
        }
    }

    /// The filter this qualifier stands for, on `column`.
    pub fn to_filter(&self, column: ColumnRef) -> Filter {
        let value = match self.operator {
            Operator::IsNull | Operator::IsNotNull => FilterValue::None,
            _ => FilterValue::Single(self.value.clone()),
        };
        Filter::new(column, self.operator, value)
    }
}

/// Failure reported by an intent parser. Terminal for the request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("query is empty")]
    Empty,
    #[error("could not understand query: {0}")]
    Unrecognized(String),
    #[error("unsupported construct: {0}")]
    Unsupported(String),
    #[error("malformed parser output: {0}")]
    Malformed(String),
    #[error("intent parser unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_count_skips_quoted_sections() {
        let stmt = Statement {
            text: r#"SELECT "why?" FROM "t" WHERE "a" = ? AND "b" LIKE ? ESCAPE '\'"#.into(),
            params: vec![SqlValue::Integer(1), SqlValue::from("%x%")],
            style: PlaceholderStyle::Question,
        };
        assert_eq!(stmt.placeholder_count(), 2);
    }

    #[test]
    fn dollar_placeholders_are_counted() {
        let stmt = Statement {
            text: r#"SELECT * FROM "t" WHERE "a" = $1 LIMIT $2"#.into(),
            params: vec![SqlValue::Integer(1), SqlValue::Integer(10)],
            style: PlaceholderStyle::Dollar,
        };
        assert_eq!(stmt.placeholder_count(), 2);
        assert_eq!(PlaceholderStyle::Dollar.render(2), "$2");
    }

    #[test]
    fn scalar_requires_single_cell() {
        let rs = ResultSet {
            columns: vec!["count".into()],
            rows: vec![vec![SqlValue::Integer(42)]],
        };
        assert_eq!(rs.scalar(), Some(&SqlValue::Integer(42)));

        let wide = ResultSet {
            columns: vec!["a".into(), "b".into()],
            rows: vec![vec![SqlValue::Integer(1), SqlValue::Integer(2)]],
        };
        assert!(wide.scalar().is_none());
    }

    #[test]
    fn records_are_keyed_by_column() {
        let rs = ResultSet {
            columns: vec!["city".into(), "total".into()],
            rows: vec![vec![SqlValue::from("Oslo"), SqlValue::Real(2.5)]],
        };
        let records = rs.records();
        assert_eq!(records[0]["city"], serde_json::json!("Oslo"));
        assert_eq!(records[0]["total"], serde_json::json!(2.5));
    }

    #[test]
    fn sql_value_is_untagged_json() {
        let values: Vec<SqlValue> = serde_json::from_str(r#"[null, true, 3, 1.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                SqlValue::Null,
                SqlValue::Bool(true),
                SqlValue::Integer(3),
                SqlValue::Real(1.5),
                SqlValue::from("x"),
            ]
        );
    }

    #[test]
    fn qualifier_defaults_to_equality() {
        let q: Qualifier = serde_json::from_str(r#"{"phrase": "female", "value": "Female"}"#).unwrap();
        assert_eq!(q, Qualifier::new("female", Operator::Equals, "Female"));
        assert!(q.is_well_formed());
        assert_eq!(
            q.to_filter(ColumnRef::new("gender")),
            Filter::compare("gender", Operator::Equals, "Female")
        );

        let null: Qualifier =
            serde_json::from_str(r#"{"phrase": "uncategorized", "operator": "is_null"}"#).unwrap();
        assert!(null.is_well_formed());
        assert_eq!(null.to_filter(ColumnRef::new("category")).value, FilterValue::None);

        assert!(!Qualifier::new("any", Operator::InList, "x").is_well_formed());
        assert!(!Qualifier::new("vague", Operator::GreaterThan, SqlValue::Null).is_well_formed());
    }
}
