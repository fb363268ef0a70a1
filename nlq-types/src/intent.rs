//! Strictly-typed query intents.
//!
//! Parsers produce one of these; the synthesizer never sees untyped parser output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ParseFailure, SqlValue};

/// A column reference as written by the parser, optionally qualified by table.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    /// Parse `column` or `table.column`.
    pub fn parse(text: &str) -> Self {
        match text.split_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                Self::qualified(table.trim(), column.trim())
            }
            _ => Self::new(text.trim()),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.column),
            None => f.write_str(&self.column),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    AtLeast,
    LessThan,
    AtMost,
    Contains,
    Between,
    InList,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::GreaterThan => "greater_than",
            Operator::AtLeast => "at_least",
            Operator::LessThan => "less_than",
            Operator::AtMost => "at_most",
            Operator::Contains => "contains",
            Operator::Between => "between",
            Operator::InList => "in_list",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ParseFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let op = match normalized.as_str() {
            "=" | "==" | "eq" | "equals" | "is" => Operator::Equals,
            "!=" | "<>" | "ne" | "not_equals" | "not_equal" | "is_not" => Operator::NotEquals,
            ">" | "gt" | "greater_than" | "more_than" | "over" => Operator::GreaterThan,
            ">=" | "gte" | "ge" | "at_least" => Operator::AtLeast,
            "<" | "lt" | "less_than" | "under" => Operator::LessThan,
            "<=" | "lte" | "le" | "at_most" => Operator::AtMost,
            "contains" | "like" | "includes" => Operator::Contains,
            "between" => Operator::Between,
            "in" | "in_list" | "one_of" => Operator::InList,
            "is_null" | "null" => Operator::IsNull,
            "is_not_null" | "not_null" => Operator::IsNotNull,
            _ => return Err(ParseFailure::Unsupported(format!("operator `{}`", s.trim()))),
        };
        Ok(op)
    }
}

/// Right-hand side of a filter; its shape must agree with the operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    None,
    Single(SqlValue),
    Range(SqlValue, SqlValue),
    List(Vec<SqlValue>),
}

impl FilterValue {
    pub fn shape(&self) -> &'static str {
        match self {
            FilterValue::None => "none",
            FilterValue::Single(_) => "single value",
            FilterValue::Range(_, _) => "range",
            FilterValue::List(_) => "list",
        }
    }
}

/// `(column, operator, value)` triple.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: ColumnRef,
    pub operator: Operator,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(column: ColumnRef, operator: Operator, value: FilterValue) -> Self {
        Self {
            column,
            operator,
            value,
        }
    }

    /// Single-valued comparison on an unqualified column.
    pub fn compare(column: &str, operator: Operator, value: impl Into<SqlValue>) -> Self {
        Self::new(
            ColumnRef::parse(column),
            operator,
            FilterValue::Single(value.into()),
        )
    }

    pub fn between(column: &str, low: impl Into<SqlValue>, high: impl Into<SqlValue>) -> Self {
        Self::new(
            ColumnRef::parse(column),
            Operator::Between,
            FilterValue::Range(low.into(), high.into()),
        )
    }

    pub fn in_list(column: &str, values: Vec<SqlValue>) -> Self {
        Self::new(ColumnRef::parse(column), Operator::InList, FilterValue::List(values))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    pub fn sql_name(self) -> &'static str {
        match self {
            Aggregation::Count => "COUNT",
            Aggregation::Sum => "SUM",
            Aggregation::Avg => "AVG",
            Aggregation::Min => "MIN",
            Aggregation::Max => "MAX",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Aggregation::Count => "count",
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }
}

impl FromStr for Aggregation {
    type Err = ParseFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let agg = match s.trim().to_ascii_lowercase().as_str() {
            "count" | "number" | "how_many" => Aggregation::Count,
            "sum" | "total" => Aggregation::Sum,
            "avg" | "average" | "mean" => Aggregation::Avg,
            "min" | "minimum" | "lowest" | "smallest" => Aggregation::Min,
            "max" | "maximum" | "highest" | "largest" => Aggregation::Max,
            _ => return Err(ParseFailure::Unsupported(format!("aggregation `{}`", s.trim()))),
        };
        Ok(agg)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql_keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: ColumnRef,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Aggregate function over a column, or over all rows when `column` is `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub function: Aggregation,
    #[serde(default)]
    pub column: Option<ColumnRef>,
}

/// Rows from a single table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectIntent {
    pub table: String,
    /// Empty means every column.
    #[serde(default)]
    pub columns: Vec<ColumnRef>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub distinct: bool,
}

impl SelectIntent {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            distinct: false,
        }
    }

    pub fn column(mut self, column: &str) -> Self {
        self.columns.push(ColumnRef::parse(column));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy {
            column: ColumnRef::parse(column),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// One aggregate over a single table, optionally grouped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateIntent {
    pub table: String,
    pub aggregate: AggregateSpec,
    #[serde(default)]
    pub group_by: Vec<ColumnRef>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Sort groups by the aggregate value.
    #[serde(default)]
    pub order: Option<SortDirection>,
    /// Then by grouped columns.
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub limit: Option<u64>,
}

impl AggregateIntent {
    pub fn new(table: impl Into<String>, function: Aggregation, column: Option<&str>) -> Self {
        Self {
            table: table.into(),
            aggregate: AggregateSpec {
                function,
                column: column.map(ColumnRef::parse),
            },
            group_by: Vec::new(),
            filters: Vec::new(),
            order: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(ColumnRef::parse(column));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, direction: SortDirection) -> Self {
        self.order = Some(direction);
        self
    }

    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy {
            column: ColumnRef::parse(column),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Rows (or one aggregate) spanning two tables connected by foreign keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JoinIntent {
    pub from: String,
    pub to: String,
    /// Disambiguating hint: a foreign-key column or an intermediate table.
    #[serde(default)]
    pub via: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnRef>,
    #[serde(default)]
    pub aggregate: Option<AggregateSpec>,
    #[serde(default)]
    pub group_by: Vec<ColumnRef>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub limit: Option<u64>,
}

impl JoinIntent {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            via: None,
            columns: Vec::new(),
            aggregate: None,
            group_by: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn via(mut self, hint: &str) -> Self {
        self.via = Some(hint.to_string());
        self
    }

    pub fn column(mut self, column: &str) -> Self {
        self.columns.push(ColumnRef::parse(column));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn aggregate(mut self, function: Aggregation, column: Option<&str>) -> Self {
        self.aggregate = Some(AggregateSpec {
            function,
            column: column.map(ColumnRef::parse),
        });
        self
    }

    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(ColumnRef::parse(column));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Canonical, request-scoped representation of a question.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryIntent {
    Select(SelectIntent),
    Aggregate(AggregateIntent),
    Join(JoinIntent),
}

impl QueryIntent {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryIntent::Select(_) => "select",
            QueryIntent::Aggregate(_) => "aggregate",
            QueryIntent::Join(_) => "join",
        }
    }

    pub fn filters(&self) -> &[Filter] {
        match self {
            QueryIntent::Select(i) => &i.filters,
            QueryIntent::Aggregate(i) => &i.filters,
            QueryIntent::Join(i) => &i.filters,
        }
    }

    /// True when the answer is a single aggregate value rather than a table.
    pub fn is_scalar(&self) -> bool {
        match self {
            QueryIntent::Aggregate(i) => i.group_by.is_empty(),
            QueryIntent::Join(i) => i.aggregate.is_some() && i.group_by.is_empty(),
            QueryIntent::Select(_) => false,
        }
    }
}

impl From<SelectIntent> for QueryIntent {
    fn from(value: SelectIntent) -> Self {
        QueryIntent::Select(value)
    }
}

impl From<AggregateIntent> for QueryIntent {
    fn from(value: AggregateIntent) -> Self {
        QueryIntent::Aggregate(value)
    }
}

impl From<JoinIntent> for QueryIntent {
    fn from(value: JoinIntent) -> Self {
        QueryIntent::Join(value)
    }
}
