//! Loosely-typed parser output and its conversion into a [`QueryIntent`].
//!
//! External NLP services answer with free-form JSON; this is the only place it is
//! inspected. Everything downstream works on the typed intent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::intent::{
    AggregateIntent, AggregateSpec, Aggregation, ColumnRef, Filter, FilterValue, JoinIntent,
    Operator, OrderBy, QueryIntent, SelectIntent, SortDirection,
};
use crate::{ParseFailure, SqlValue};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawIntent {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<RawFilter>,
    #[serde(default)]
    pub aggregation: Option<String>,
    #[serde(default)]
    pub aggregate_column: Option<String>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub order_by: Vec<RawOrder>,
    #[serde(default)]
    pub limit: Option<Value>,
    #[serde(default)]
    pub via: Option<String>,
    #[serde(default)]
    pub distinct: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawFilter {
    pub column: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawOrder {
    pub column: String,
    #[serde(default)]
    pub direction: Option<String>,
}

impl TryFrom<RawIntent> for QueryIntent {
    type Error = ParseFailure;

    fn try_from(raw: RawIntent) -> Result<Self, Self::Error> {
        let declared = raw.kind.as_deref().map(|k| k.trim().to_ascii_lowercase());
        if let Some(kind) = declared.as_deref() {
            if !matches!(kind, "select" | "aggregate" | "join") {
                return Err(ParseFailure::Malformed(format!("unknown intent kind `{kind}`")));
            }
        }

        let mut tables: Vec<String> = Vec::new();
        for t in raw.table.iter().chain(raw.tables.iter()) {
            let t = t.trim();
            if !t.is_empty() && !tables.iter().any(|seen| seen == t) {
                tables.push(t.to_string());
            }
        }

        let filters = raw
            .filters
            .into_iter()
            .map(convert_filter)
            .collect::<Result<Vec<_>, _>>()?;
        let columns: Vec<ColumnRef> = raw.columns.iter().map(|c| ColumnRef::parse(c)).collect();
        let group_by: Vec<ColumnRef> = raw.group_by.iter().map(|c| ColumnRef::parse(c)).collect();
        let order_by = raw
            .order_by
            .into_iter()
            .map(|o| {
                Ok(OrderBy {
                    column: ColumnRef::parse(&o.column),
                    direction: convert_direction(o.direction.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>, ParseFailure>>()?;
        let limit = raw.limit.as_ref().map(convert_limit).transpose()?;
        let aggregate = raw
            .aggregation
            .as_deref()
            .map(|a| {
                Ok::<_, ParseFailure>(AggregateSpec {
                    function: a.parse::<Aggregation>()?,
                    column: raw.aggregate_column.as_deref().map(ColumnRef::parse),
                })
            })
            .transpose()?;

        let mut tables = tables.into_iter();
        let (first, second) = (tables.next(), tables.next());
        if tables.next().is_some() {
            return Err(ParseFailure::Unsupported(
                "queries spanning more than two tables".into(),
            ));
        }

        let intent = match (first, second, aggregate) {
            (None, _, _) => return Err(ParseFailure::Malformed("no table in parser output".into())),
            (Some(from), Some(to), aggregate) => QueryIntent::Join(JoinIntent {
                from,
                to,
                via: raw.via,
                columns,
                aggregate,
                group_by,
                filters,
                order_by,
                limit,
            }),
            (Some(table), None, Some(aggregate)) => {
                let (order, order_by) = split_aggregate_order(&aggregate, order_by)?;
                QueryIntent::Aggregate(AggregateIntent {
                    table,
                    aggregate,
                    group_by,
                    filters,
                    order,
                    order_by,
                    limit,
                })
            }
            (Some(table), None, None) => QueryIntent::Select(SelectIntent {
                table,
                columns,
                filters,
                order_by,
                limit,
                distinct: raw.distinct,
            }),
        };

        if let Some(kind) = declared.as_deref() {
            let aggregated_join =
                matches!(&intent, QueryIntent::Join(join) if join.aggregate.is_some());
            if kind != intent.kind() && !(kind == "aggregate" && aggregated_join) {
                return Err(ParseFailure::Malformed(format!(
                    "declared kind `{kind}` does not match a {} shape",
                    intent.kind()
                )));
            }
        }
        Ok(intent)
    }
}

/// Split orderings into the aggregate's own direction and group-column keys.
/// The aggregate may only lead.
fn split_aggregate_order(
    aggregate: &AggregateSpec,
    order_by: Vec<OrderBy>,
) -> Result<(Option<SortDirection>, Vec<OrderBy>), ParseFailure> {
    let mut order = None;
    let mut groups = Vec::new();
    for (idx, key) in order_by.into_iter().enumerate() {
        if !names_aggregate(aggregate, &key.column) {
            groups.push(key);
        } else if idx == 0 {
            order = Some(key.direction);
        } else {
            return Err(ParseFailure::Unsupported(format!(
                "ordering by `{}` after a group column",
                key.column
            )));
        }
    }
    Ok((order, groups))
}

/// `count`, `avg`, the aggregated column, or the `avg_<column>` output name.
fn names_aggregate(aggregate: &AggregateSpec, column: &ColumnRef) -> bool {
    let name = column.column.to_ascii_lowercase();
    let function = aggregate.function.as_str();
    if name == function {
        return true;
    }
    aggregate.column.as_ref().is_some_and(|target| {
        let target = target.column.to_ascii_lowercase();
        name == target || name == format!("{function}_{target}")
    })
}

fn convert_filter(raw: RawFilter) -> Result<Filter, ParseFailure> {
    let operator: Operator = raw.operator.parse()?;
    let value = match operator {
        Operator::IsNull | Operator::IsNotNull => match raw.value {
            Value::Null => FilterValue::None,
            other => {
                return Err(ParseFailure::Malformed(format!(
                    "`{operator}` takes no value, got {other}"
                )))
            }
        },
        Operator::Between => match raw.value {
            Value::Array(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                let low = items.next().map(convert_scalar).transpose()?;
                let high = items.next().map(convert_scalar).transpose()?;
                match (low, high) {
                    (Some(low), Some(high)) => FilterValue::Range(low, high),
                    _ => return Err(ParseFailure::Malformed("between needs two values".into())),
                }
            }
            Value::Object(map) => {
                let low = map.get("low").cloned().map(convert_scalar).transpose()?;
                let high = map.get("high").cloned().map(convert_scalar).transpose()?;
                match (low, high) {
                    (Some(low), Some(high)) => FilterValue::Range(low, high),
                    _ => return Err(ParseFailure::Malformed("between needs low and high".into())),
                }
            }
            other => {
                return Err(ParseFailure::Malformed(format!(
                    "between needs two values, got {other}"
                )))
            }
        },
        Operator::InList => match raw.value {
            Value::Array(items) => FilterValue::List(
                items
                    .into_iter()
                    .map(convert_scalar)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            scalar => FilterValue::List(vec![convert_scalar(scalar)?]),
        },
        _ => FilterValue::Single(convert_scalar(raw.value)?),
    };
    Ok(Filter::new(ColumnRef::parse(&raw.column), operator, value))
}

fn convert_scalar(value: Value) -> Result<SqlValue, ParseFailure> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Bool(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(SqlValue::Integer(i)),
            None => n
                .as_f64()
                .map(SqlValue::Real)
                .ok_or_else(|| ParseFailure::Malformed(format!("number out of range: {n}"))),
        },
        Value::String(s) => Ok(SqlValue::Text(s)),
        other => Err(ParseFailure::Malformed(format!(
            "expected a scalar value, got {other}"
        ))),
    }
}

fn convert_direction(direction: Option<&str>) -> Result<SortDirection, ParseFailure> {
    match direction.map(|d| d.trim().to_ascii_lowercase()).as_deref() {
        None | Some("asc") | Some("ascending") => Ok(SortDirection::Asc),
        Some("desc") | Some("descending") => Ok(SortDirection::Desc),
        Some(other) => Err(ParseFailure::Unsupported(format!("sort direction `{other}`"))),
    }
}

fn convert_limit(value: &Value) -> Result<u64, ParseFailure> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| ParseFailure::Malformed(format!("limit must be a positive integer, got {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| ParseFailure::Malformed(format!("limit must be a positive integer, got `{s}`"))),
        other => Err(ParseFailure::Malformed(format!(
            "limit must be a positive integer, got {other}"
        ))),
    }
}
