#![forbid(unsafe_code)]

//! SQL Synthesizer: turns a [`QueryIntent`] into a parameterized [`Statement`]
//! against one catalog snapshot.
//!
//! Identifiers are only ever taken from the catalog's canonical spelling and
//! every literal travels as a bound value. The function is pure: the same intent,
//! catalog and options always produce byte-identical output.

use nlq_schema::{Catalog, JoinPath, Table};
use nlq_types::{
    AggregateIntent, AggregateSpec, Aggregation, ColumnType, JoinIntent, OrderBy,
    PlaceholderStyle, QueryIntent, SelectIntent, SqlValue, Statement,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod filter;
mod scope;
mod writer;

use scope::{resolve_table, Bound, Scope};
use writer::{quote_ident, SqlWriter};

/// Upper bound on enumerated shortest join paths; more than one is already ambiguous.
const MAX_JOIN_PATHS: usize = 8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SynthError {
    #[error("unknown table `{0}`")]
    UnknownTable(String),
    #[error("unknown column `{column}` in `{table}`")]
    UnknownColumn { table: String, column: String },
    #[error("`{name}` is ambiguous; it could mean {}", candidates.join(" or "))]
    AmbiguousReference {
        name: String,
        candidates: Vec<String>,
    },
    #[error("ambiguous join between `{from}` and `{to}`: {}", paths.join(" | "))]
    AmbiguousJoin {
        from: String,
        to: String,
        paths: Vec<String>,
    },
    #[error("no join path between `{from}` and `{to}`")]
    NoJoinPath { from: String, to: String },
    #[error("unsupported intent: {0}")]
    UnsupportedIntent(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthOptions {
    pub style: PlaceholderStyle,
    /// Applied to row-returning statements that carry no explicit limit.
    pub default_limit: Option<u64>,
    /// Clamp for any limit, explicit or default.
    pub max_limit: Option<u64>,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            style: PlaceholderStyle::Question,
            default_limit: Some(1000),
            max_limit: None,
        }
    }
}

impl SynthOptions {
    pub fn with_style(mut self, style: PlaceholderStyle) -> Self {
        self.style = style;
        self
    }

    /// No implicit row limit.
    pub fn unlimited() -> Self {
        Self {
            default_limit: None,
            ..Self::default()
        }
    }
}

pub fn synthesize(
    intent: &QueryIntent,
    catalog: &Catalog,
    options: &SynthOptions,
) -> Result<Statement, SynthError> {
    let mut w = SqlWriter::new(options.style);
    match intent {
        QueryIntent::Select(select) => write_select(&mut w, catalog, select, options)?,
        QueryIntent::Aggregate(agg) => write_aggregate(&mut w, catalog, agg, options)?,
        QueryIntent::Join(join) => write_join(&mut w, catalog, join, options)?,
    }
    Ok(w.finish())
}

fn write_select(
    w: &mut SqlWriter,
    catalog: &Catalog,
    intent: &SelectIntent,
    options: &SynthOptions,
) -> Result<(), SynthError> {
    let table = resolve_table(catalog, &intent.table)?;
    let scope = Scope::single(catalog, table);

    w.push(if intent.distinct { "SELECT DISTINCT " } else { "SELECT " });
    if intent.columns.is_empty() {
        w.push("*");
    } else {
        let columns = intent
            .columns
            .iter()
            .map(|c| scope.column(c).map(|b| scope.render(b)))
            .collect::<Result<Vec<_>, _>>()?;
        w.push(&columns.join(", "));
    }
    w.push(" FROM ").ident(&table.name);
    filter::write_where(w, &scope, &intent.filters)?;
    write_order_by(w, &scope, &intent.order_by)?;
    write_limit(w, intent.limit, false, options)
}

fn write_aggregate(
    w: &mut SqlWriter,
    catalog: &Catalog,
    intent: &AggregateIntent,
    options: &SynthOptions,
) -> Result<(), SynthError> {
    let table = resolve_table(catalog, &intent.table)?;
    let scope = Scope::single(catalog, table);

    let groups = resolve_all(&scope, &intent.group_by)?;
    let (agg_expr, agg_alias) = aggregate_expr(&scope, &intent.aggregate)?;

    w.push("SELECT ");
    for g in &groups {
        w.push(g).push(", ");
    }
    w.push(&agg_expr).push(" AS ").ident(&agg_alias);
    w.push(" FROM ").ident(&table.name);
    filter::write_where(w, &scope, &intent.filters)?;
    write_group_by(w, &groups);

    let mut keys: Vec<String> = Vec::new();
    if let Some(direction) = intent.order {
        keys.push(format!("{} {}", quote_ident(&agg_alias), direction.sql_keyword()));
    }
    for order in &intent.order_by {
        let rendered = scope.render(scope.column(&order.column)?);
        if !groups.contains(&rendered) {
            return Err(SynthError::UnsupportedIntent(format!(
                "ordering grouped rows by `{}`, which is not grouped",
                order.column
            )));
        }
        keys.push(format!("{rendered} {}", order.direction.sql_keyword()));
    }
    if !keys.is_empty() {
        w.push(" ORDER BY ").push(&keys.join(", "));
    }
    write_limit(w, intent.limit, groups.is_empty(), options)
}

fn write_join(
    w: &mut SqlWriter,
    catalog: &Catalog,
    intent: &JoinIntent,
    options: &SynthOptions,
) -> Result<(), SynthError> {
    let from = resolve_table(catalog, &intent.from)?;
    let to = resolve_table(catalog, &intent.to)?;
    if from.name == to.name {
        return Err(SynthError::UnsupportedIntent(format!(
            "self-join on `{}`",
            from.name
        )));
    }

    let path = choose_path(catalog, from, to, intent.via.as_deref())?;
    let tables = path
        .tables()
        .into_iter()
        .filter_map(|name| catalog.table(name))
        .collect::<Vec<_>>();
    let scope = Scope::joined(catalog, tables);

    let groups = resolve_all(&scope, &intent.group_by)?;
    let scalar = intent.aggregate.is_some() && groups.is_empty();

    w.push("SELECT ");
    match &intent.aggregate {
        Some(spec) => {
            let (agg_expr, agg_alias) = aggregate_expr(&scope, spec)?;
            for g in &groups {
                w.push(g).push(", ");
            }
            w.push(&agg_expr).push(" AS ").ident(&agg_alias);
        }
        None if intent.columns.is_empty() => {
            w.push(&default_join_columns(&scope, from, to));
        }
        None => {
            let columns = resolve_all(&scope, &intent.columns)?;
            w.push(&columns.join(", "));
        }
    }

    w.push(" FROM ").ident(&from.name);
    for step in &path.steps {
        w.push(" JOIN ")
            .ident(&step.right_table)
            .push(" ON ")
            .ident(&step.left_table)
            .push(".")
            .ident(&step.left_column)
            .push(" = ")
            .ident(&step.right_table)
            .push(".")
            .ident(&step.right_column);
    }
    filter::write_where(w, &scope, &intent.filters)?;
    write_group_by(w, &groups);
    write_order_by(w, &scope, &intent.order_by)?;
    write_limit(w, intent.limit, scalar, options)
}

fn choose_path(
    catalog: &Catalog,
    from: &Table,
    to: &Table,
    via: Option<&str>,
) -> Result<JoinPath, SynthError> {
    let mut paths = catalog.shortest_join_paths(&from.name, &to.name, MAX_JOIN_PATHS);
    if let Some(hint) = via {
        paths.retain(|p| p.uses(hint));
    }
    if paths.len() > 1 {
        return Err(SynthError::AmbiguousJoin {
            from: from.name.clone(),
            to: to.name.clone(),
            paths: paths.iter().map(describe_path).collect(),
        });
    }
    paths.pop().ok_or_else(|| SynthError::NoJoinPath {
        from: from.name.clone(),
        to: to.name.clone(),
    })
}

fn describe_path(path: &JoinPath) -> String {
    path.steps
        .iter()
        .map(|s| {
            format!(
                "{}.{} = {}.{}",
                s.left_table, s.left_column, s.right_table, s.right_column
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every column of both endpoint tables; names present in both are aliased
/// `table_column` so result columns stay unique.
fn default_join_columns(scope: &Scope<'_>, from: &Table, to: &Table) -> String {
    let clashes = |name: &str| {
        from.columns.iter().any(|c| c.name == name) && to.columns.iter().any(|c| c.name == name)
    };
    let clashes = &clashes;
    [from, to]
        .into_iter()
        .flat_map(|table| {
            table.columns.iter().map(move |column| {
                let expr = scope.render(Bound { table, column });
                if clashes(&column.name) {
                    format!(
                        "{expr} AS {}",
                        quote_ident(&format!("{}_{}", table.name, column.name))
                    )
                } else {
                    expr
                }
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn resolve_all(
    scope: &Scope<'_>,
    columns: &[nlq_types::ColumnRef],
) -> Result<Vec<String>, SynthError> {
    columns
        .iter()
        .map(|c| scope.column(c).map(|b| scope.render(b)))
        .collect()
}

/// `(expression, output alias)` for an aggregate.
fn aggregate_expr(scope: &Scope<'_>, spec: &AggregateSpec) -> Result<(String, String), SynthError> {
    let function = spec.function;
    let Some(reference) = &spec.column else {
        return match function {
            Aggregation::Count => Ok(("COUNT(*)".to_string(), "count".to_string())),
            other => Err(SynthError::UnsupportedIntent(format!(
                "`{}` needs a column",
                other.as_str()
            ))),
        };
    };

    let bound = scope.column(reference)?;
    let data_type = bound.column.data_type;
    if matches!(function, Aggregation::Sum | Aggregation::Avg)
        && !matches!(data_type, ColumnType::Number | ColumnType::Date)
    {
        return Err(SynthError::UnsupportedIntent(format!(
            "`{}` over {} column `{}`",
            function.as_str(),
            data_type,
            bound.column.name
        )));
    }

    let expr = format!("{}({})", function.sql_name(), scope.render(bound));
    let alias = format!("{}_{}", function.as_str(), bound.column.name);
    Ok((expr, alias))
}

fn write_group_by(w: &mut SqlWriter, groups: &[String]) {
    if !groups.is_empty() {
        w.push(" GROUP BY ").push(&groups.join(", "));
    }
}

fn write_order_by(
    w: &mut SqlWriter,
    scope: &Scope<'_>,
    order_by: &[OrderBy],
) -> Result<(), SynthError> {
    for (i, order) in order_by.iter().enumerate() {
        let bound = scope.column(&order.column)?;
        w.push(if i == 0 { " ORDER BY " } else { ", " })
            .push(&scope.render(bound))
            .push(" ")
            .push(order.direction.sql_keyword());
    }
    Ok(())
}

fn write_limit(
    w: &mut SqlWriter,
    explicit: Option<u64>,
    scalar: bool,
    options: &SynthOptions,
) -> Result<(), SynthError> {
    if explicit == Some(0) {
        return Err(SynthError::UnsupportedIntent("a limit of zero rows".into()));
    }
    let implicit = if scalar { None } else { options.default_limit };
    let Some(limit) = explicit.or(implicit) else {
        return Ok(());
    };
    let limit = options.max_limit.map_or(limit, |max| limit.min(max));
    w.push(" LIMIT ")
        .bind(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    Ok(())
}
