//! WHERE-clause rendering with type checks and literal coercion.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use nlq_schema::Column;
use nlq_types::{ColumnType, Filter, FilterValue, Operator, SqlValue};

use crate::scope::Scope;
use crate::writer::SqlWriter;
use crate::SynthError;

pub(crate) fn write_where(
    w: &mut SqlWriter,
    scope: &Scope<'_>,
    filters: &[Filter],
) -> Result<(), SynthError> {
    for (i, filter) in filters.iter().enumerate() {
        w.push(if i == 0 { " WHERE " } else { " AND " });
        write_filter(w, scope, filter)?;
    }
    Ok(())
}

fn write_filter(w: &mut SqlWriter, scope: &Scope<'_>, filter: &Filter) -> Result<(), SynthError> {
    let bound = scope.column(&filter.column)?;
    let column = bound.column;
    let expr = scope.render(bound);
    let op = filter.operator;

    match (op, &filter.value) {
        (Operator::IsNull, FilterValue::None) => {
            w.push(&expr).push(" IS NULL");
        }
        (Operator::IsNotNull, FilterValue::None) => {
            w.push(&expr).push(" IS NOT NULL");
        }
        (Operator::Equals | Operator::NotEquals, FilterValue::Single(value)) => {
            let value = coerce(value, column, op)?;
            let sql_op = if op == Operator::Equals { " = " } else { " <> " };
            w.push(&expr).push(sql_op).bind(value);
        }
        (
            Operator::GreaterThan | Operator::AtLeast | Operator::LessThan | Operator::AtMost,
            FilterValue::Single(value),
        ) => {
            require_ordered(column, op)?;
            let value = coerce(value, column, op)?;
            let sql_op = match op {
                Operator::GreaterThan => " > ",
                Operator::AtLeast => " >= ",
                Operator::LessThan => " < ",
                _ => " <= ",
            };
            w.push(&expr).push(sql_op).bind(value);
        }
        (Operator::Contains, FilterValue::Single(value)) => {
            if column.data_type != ColumnType::String {
                return Err(SynthError::UnsupportedIntent(format!(
                    "`contains` on {} column `{}`",
                    column.data_type, column.name
                )));
            }
            let needle = match coerce(value, column, op)? {
                SqlValue::Text(s) => s,
                other => other.to_string(),
            };
            w.push("LOWER(")
                .push(&expr)
                .push(") LIKE ")
                .bind(SqlValue::Text(format!("%{}%", escape_like(&needle.to_lowercase()))))
                .push(" ESCAPE '\\'");
        }
        (Operator::Between, FilterValue::Range(low, high)) => {
            require_ordered(column, op)?;
            let low = coerce(low, column, op)?;
            let high = coerce(high, column, op)?;
            w.push(&expr).push(" BETWEEN ").bind(low).push(" AND ").bind(high);
        }
        (Operator::InList, FilterValue::List(values)) => {
            if values.is_empty() {
                return Err(SynthError::UnsupportedIntent(format!(
                    "empty value list for `{}`",
                    column.name
                )));
            }
            let values = values
                .iter()
                .map(|v| coerce(v, column, op))
                .collect::<Result<Vec<_>, _>>()?;
            w.push(&expr).push(" IN (");
            for (i, value) in values.into_iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.bind(value);
            }
            w.push(")");
        }
        (op, value) => {
            return Err(SynthError::UnsupportedIntent(format!(
                "`{op}` cannot take a {} operand",
                value.shape()
            )))
        }
    }
    Ok(())
}

fn require_ordered(column: &Column, op: Operator) -> Result<(), SynthError> {
    if column.data_type == ColumnType::Boolean {
        return Err(SynthError::UnsupportedIntent(format!(
            "`{op}` on boolean column `{}`",
            column.name
        )));
    }
    Ok(())
}

/// Convert a literal to the column's declared type. Values that cannot be
/// represented in that type are rejected rather than compared loosely.
fn coerce(value: &SqlValue, column: &Column, op: Operator) -> Result<SqlValue, SynthError> {
    let mismatch = || {
        SynthError::UnsupportedIntent(format!(
            "value `{value}` is not a valid {} for `{}`",
            column.data_type, column.name
        ))
    };

    match (column.data_type, value) {
        (_, SqlValue::Null) => Err(SynthError::UnsupportedIntent(format!(
            "null literal with `{op}` on `{}`; use is_null / is_not_null",
            column.name
        ))),
        (ColumnType::Number, SqlValue::Integer(_) | SqlValue::Real(_)) => Ok(value.clone()),
        (ColumnType::Number, SqlValue::Text(s)) => parse_number(s).ok_or_else(mismatch),
        (ColumnType::Number, SqlValue::Bool(_)) => Err(mismatch()),
        (ColumnType::Boolean, SqlValue::Bool(_)) => Ok(value.clone()),
        (ColumnType::Boolean, SqlValue::Integer(0)) => Ok(SqlValue::Bool(false)),
        (ColumnType::Boolean, SqlValue::Integer(1)) => Ok(SqlValue::Bool(true)),
        (ColumnType::Boolean, SqlValue::Text(s)) => parse_bool(s).ok_or_else(mismatch),
        (ColumnType::Boolean, _) => Err(mismatch()),
        (ColumnType::String, SqlValue::Text(_)) => Ok(value.clone()),
        (ColumnType::String, other) => Ok(SqlValue::Text(other.to_string())),
        (ColumnType::Date, SqlValue::Text(s)) if is_date(s.trim()) => {
            Ok(SqlValue::Text(s.trim().to_string()))
        }
        (ColumnType::Date, _) => Err(mismatch()),
    }
}

fn parse_number(text: &str) -> Option<SqlValue> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(SqlValue::Integer(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(SqlValue::Real)
}

fn parse_bool(text: &str) -> Option<SqlValue> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(SqlValue::Bool(true)),
        "false" | "no" | "n" | "0" => Some(SqlValue::Bool(false)),
        _ => None,
    }
}

fn is_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").is_ok()
        || DateTime::parse_from_rfc3339(text).is_ok()
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
