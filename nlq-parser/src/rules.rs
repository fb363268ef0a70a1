//! Regex-driven extraction for the question shapes the service answers:
//! listings, projections, counts, aggregates, top-N, distinct values and
//! two-table joins, each optionally followed by conditions, ordering and a limit.

use std::sync::LazyLock;

use async_trait::async_trait;
use nlq_types::{
    AggregateSpec, Aggregation, ColumnRef, Filter, FilterValue, JoinIntent, Operator, OrderBy,
    ParseFailure, QueryIntent, SelectIntent, SortDirection, SqlValue, Vocabulary,
};
use regex::Regex;

use crate::lexicon::Lexicon;
use crate::IntentParser;

/// Operator phrases, longest first so the alternation prefers them.
const OPERATOR_PHRASES: &[(&str, Operator)] = &[
    ("not null", Operator::IsNotNull),
    ("null", Operator::IsNull),
    ("missing", Operator::IsNull),
    ("greater than or equal to", Operator::AtLeast),
    ("at least", Operator::AtLeast),
    ("no less than", Operator::AtLeast),
    (">=", Operator::AtLeast),
    ("less than or equal to", Operator::AtMost),
    ("at most", Operator::AtMost),
    ("no more than", Operator::AtMost),
    ("<=", Operator::AtMost),
    ("not equal to", Operator::NotEquals),
    ("does not equal", Operator::NotEquals),
    ("not", Operator::NotEquals),
    ("!=", Operator::NotEquals),
    ("<>", Operator::NotEquals),
    ("greater than", Operator::GreaterThan),
    ("more than", Operator::GreaterThan),
    ("older than", Operator::GreaterThan),
    ("higher than", Operator::GreaterThan),
    ("above", Operator::GreaterThan),
    ("over", Operator::GreaterThan),
    ("exceeds", Operator::GreaterThan),
    (">", Operator::GreaterThan),
    ("less than", Operator::LessThan),
    ("fewer than", Operator::LessThan),
    ("younger than", Operator::LessThan),
    ("lower than", Operator::LessThan),
    ("below", Operator::LessThan),
    ("under", Operator::LessThan),
    ("<", Operator::LessThan),
    ("between", Operator::Between),
    ("one of", Operator::InList),
    ("in", Operator::InList),
    ("containing", Operator::Contains),
    ("contains", Operator::Contains),
    ("includes", Operator::Contains),
    ("like", Operator::Contains),
    ("matching", Operator::Contains),
    ("equal to", Operator::Equals),
    ("equals", Operator::Equals),
    ("is", Operator::Equals),
    ("are", Operator::Equals),
    ("=", Operator::Equals),
];

static CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    let ops = OPERATOR_PHRASES
        .iter()
        .map(|(phrase, _)| regex::escape(phrase).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?i)^(?P<col>.+?)\s+(?:(?:is|are)\s+)?(?P<op>{ops})(?:\s+(?P<val>.+))?$"
    ))
    .expect("Invalid regex")
});

static SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(>=|<=|!=|<>|=|>|<)\s*").expect("Invalid regex"));
static TRAILING_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s?.!;]+$").expect("Invalid regex"));
static VIA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:via|through)\s+(?P<hint>[\w.]+)").expect("Invalid regex")
});
static LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:limit(?:ed)?(?:\s+to)?|only|first)\s+(?P<n>\d+)(?:\s+rows?)?$")
        .expect("Invalid regex")
});
static ORDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(?:order(?:ed)?|sort(?:ed)?)\s+by\s+(?P<col>.+?)(?:\s+(?P<dir>asc|ascending|desc|descending))?$",
    )
    .expect("Invalid regex")
});
static LEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:please\s+)?(?:show(?:\s+me)?|list|get|find|give\s+me|display|fetch|select|return|what\s+(?:is|are))\s+(?:the\s+)?",
    )
    .expect("Invalid regex")
});
static FIRST_N: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:the\s+)?first\s+(?P<n>\d+)\s+(?P<rest>.+)$").expect("Invalid regex")
});
static TOP_N: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<end>top|bottom)\s+(?P<n>\d+)\s+(?P<rest>.+?)\s+by\s+(?P<col>.+)$")
        .expect("Invalid regex")
});
static COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:how\s+many|count(?:\s+of)?(?:\s+the)?|(?:the\s+)?(?:total\s+)?number\s+of)\s+(?P<rest>.+?)(?:\s+(?:are\s+there|there\s+are))?$",
    )
    .expect("Invalid regex")
});
static AGGREGATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<func>average|avg|mean|sum|total|minimum|min|lowest|smallest|maximum|max|highest|largest)\s+(?:of\s+)?(?:the\s+)?(?P<rest>.+)$",
    )
    .expect("Invalid regex")
});
static DISTINCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:distinct|unique|different)\s+(?P<rest>.+)$").expect("Invalid regex")
});
static GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<body>.+?)\s+(?:grouped\s+by|group\s+by|for\s+each|per|by)\s+(?P<group>.+)$")
        .expect("Invalid regex")
});
static OF_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<cols>.+?)\s+(?:of|from|for|in|across)\s+(?P<table>.+)$")
        .expect("Invalid regex")
});
static CONDITION_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:where|whose|with|having|who\s+have|that\s+have)\s+")
        .expect("Invalid regex")
});
static AND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+and\s+").expect("Invalid regex"));
static OR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+or\s+").expect("Invalid regex"));
static LIST_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*,\s*(?:(?:and|or)\s+)?|\s+(?:and|or)\s+").expect("Invalid regex")
});
static JOIN_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:and\s+their|along\s+with|joined\s+with|join(?:ed)?|and|with)\s+")
        .expect("Invalid regex")
});

/// Parser for everyday English questions; no external service involved.
#[derive(Clone, Debug, Default)]
pub struct RuleIntentParser;

impl RuleIntentParser {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`IntentParser::parse`].
    pub fn parse_text(&self, text: &str, vocab: &Vocabulary) -> Result<QueryIntent, ParseFailure> {
        let lex = Lexicon::new(vocab);
        let mut text = clean(text);
        if text.is_empty() {
            return Err(ParseFailure::Empty);
        }

        let via = take(&VIA, &mut text, |c| c["hint"].to_string());
        let mut limit = take(&LIMIT, &mut text, |c| c["n"].to_string())
            .map(|n| parse_count(&n))
            .transpose()?;
        let order = take(&ORDER, &mut text, |c| {
            (
                c["col"].to_string(),
                c.name("dir").map(|d| direction(d.as_str())),
            )
        });

        let text = LEAD.replace(&text, "").into_owned();
        let (head, conditions) = split_conditions(&lex, &text);

        let mut head = head.to_string();
        if let Some(caps) = FIRST_N.captures(&head) {
            limit = limit.or(Some(parse_count(&caps["n"])?));
            head = caps["rest"].to_string();
        }

        let shape = parse_head(&lex, &head)?;
        let tables = shape.tables.clone();
        if tables.len() > 2 {
            return Err(ParseFailure::Unsupported(
                "questions spanning more than two tables".into(),
            ));
        }

        let mut filters: Vec<Filter> = shape
            .qualifiers
            .iter()
            .cloned()
            .map(|mut filter| {
                if let [only] = tables.as_slice() {
                    if filter.column.table.as_deref() == Some(only.as_str()) {
                        filter.column.table = None;
                    }
                }
                filter
            })
            .collect();
        if let Some(conditions) = conditions {
            filters.extend(parse_conditions(&lex, conditions, &tables)?);
        }

        let mut order_by: Vec<OrderBy> = Vec::new();
        let mut aggregate_order = None;
        if let Some((column, dir)) = &shape.rank {
            order_by.push(OrderBy {
                column: lex.column(column, &tables),
                direction: *dir,
            });
        }
        if let Some((column, dir)) = order {
            let dir = dir.unwrap_or_default();
            if shape.aggregate.is_some() && !mentions_group(&lex, &column, &shape, &tables) {
                aggregate_order = Some(dir);
            } else {
                order_by.push(OrderBy {
                    column: lex.column(&column, &tables),
                    direction: dir,
                });
            }
        }
        let limit = limit.or(shape.limit);

        let columns: Vec<ColumnRef> = shape
            .columns
            .iter()
            .map(|c| lex.column(c, &tables))
            .collect();
        let group_by: Vec<ColumnRef> = shape
            .group_by
            .iter()
            .map(|c| lex.column(c, &tables))
            .collect();
        let aggregate = shape.aggregate.map(|(function, column)| AggregateSpec {
            function,
            column: column.map(|c| lex.column(&c, &tables)),
        });

        let mut tables = tables.into_iter();
        let (first, second) = (tables.next(), tables.next());
        let intent = match (first, second, aggregate) {
            (None, _, _) => return Err(ParseFailure::Unrecognized(text)),
            (Some(from), Some(to), aggregate) => QueryIntent::Join(JoinIntent {
                from,
                to,
                via,
                columns,
                aggregate,
                group_by,
                filters,
                order_by,
                limit,
            }),
            (Some(table), None, Some(aggregate)) => {
                QueryIntent::Aggregate(nlq_types::AggregateIntent {
                    table,
                    aggregate,
                    group_by,
                    filters,
                    order: aggregate_order,
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
                distinct: shape.distinct,
            }),
        };
        tracing::debug!(kind = intent.kind(), "rule parser matched");
        Ok(intent)
    }
}

#[async_trait]
impl IntentParser for RuleIntentParser {
    async fn parse(&self, text: &str, vocab: &Vocabulary) -> Result<QueryIntent, ParseFailure> {
        self.parse_text(text, vocab)
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}

/// What the head of a question (before any conditions) asks for.
#[derive(Debug, Default)]
struct Head {
    tables: Vec<String>,
    /// Conditions implied by qualifiers in front of a table ("female customers").
    qualifiers: Vec<Filter>,
    columns: Vec<String>,
    aggregate: Option<(Aggregation, Option<String>)>,
    group_by: Vec<String>,
    rank: Option<(String, SortDirection)>,
    limit: Option<u64>,
    distinct: bool,
}

fn parse_head(lex: &Lexicon<'_>, head: &str) -> Result<Head, ParseFailure> {
    if let Some(caps) = TOP_N.captures(head) {
        let dir = if caps["end"].eq_ignore_ascii_case("top") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        let (tables, qualifiers) = tables_in(lex, &caps["rest"]);
        return Ok(Head {
            tables,
            qualifiers,
            rank: Some((caps["col"].to_string(), dir)),
            limit: Some(parse_count(&caps["n"])?),
            ..Head::default()
        });
    }

    if let Some(caps) = COUNT.captures(head) {
        let (body, group) = split_group(&caps["rest"]);
        let (mut tables, qualifiers) = tables_in(lex, &body);
        extend_for_columns(lex, &mut tables, &group);
        return Ok(Head {
            tables,
            qualifiers,
            aggregate: Some((Aggregation::Count, None)),
            group_by: group,
            ..Head::default()
        });
    }

    if let Some(caps) = AGGREGATE.captures(head) {
        let function: Aggregation = caps["func"].parse()?;
        let (body, group) = split_group(&caps["rest"]);
        let (column, (mut tables, qualifiers)) = match OF_TABLE.captures(&body) {
            Some(of) if lex.starts_with_table(&of["table"]) => {
                (of["cols"].to_string(), tables_in(lex, &of["table"]))
            }
            _ => (body.clone(), (Vec::new(), Vec::new())),
        };
        if tables.is_empty() {
            tables = owners(lex, &column, head)?;
        }
        extend_for_columns(lex, &mut tables, &group);
        return Ok(Head {
            tables,
            qualifiers,
            aggregate: Some((function, Some(column))),
            group_by: group,
            ..Head::default()
        });
    }

    let (head, distinct) = match DISTINCT.captures(head) {
        Some(caps) => (caps["rest"].to_string(), true),
        None => (head.to_string(), false),
    };

    match OF_TABLE.captures(&head) {
        Some(caps) if lex.starts_with_table(&caps["table"]) => {
            let (tables, qualifiers) = tables_in(lex, &caps["table"]);
            Ok(Head {
                tables,
                qualifiers,
                columns: split_list(&caps["cols"]),
                distinct,
                ..Head::default()
            })
        }
        _ if distinct => {
            let columns = split_list(&head);
            let tables = match columns.first() {
                Some(first) => owners(lex, first, &head)?,
                None => Vec::new(),
            };
            Ok(Head {
                tables,
                columns,
                distinct,
                ..Head::default()
            })
        }
        _ => {
            let (tables, qualifiers) = tables_in(lex, &head);
            Ok(Head {
                tables,
                qualifiers,
                ..Head::default()
            })
        }
    }
}

/// Add a table that owns a group-by column when the current tables do not.
fn extend_for_columns(lex: &Lexicon<'_>, tables: &mut Vec<String>, columns: &[String]) {
    for column in columns {
        let owners = lex.column_owners(column);
        if owners.is_empty() || owners.iter().any(|o| tables.iter().any(|t| t == o)) {
            continue;
        }
        if let [owner] = owners.as_slice() {
            tables.push(owner.to_string());
        }
    }
}

/// The table that owns `column` when no table was named.
fn owners(lex: &Lexicon<'_>, column: &str, head: &str) -> Result<Vec<String>, ParseFailure> {
    match lex.column_owners(column).as_slice() {
        [owner] => Ok(vec![owner.to_string()]),
        [] => Err(ParseFailure::Unrecognized(format!(
            "no table mentioned in `{head}`"
        ))),
        several => Err(ParseFailure::Unrecognized(format!(
            "`{column}` exists in {}; name the table",
            several.join(" and ")
        ))),
    }
}

fn mentions_group(lex: &Lexicon<'_>, column: &str, head: &Head, tables: &[String]) -> bool {
    let wanted = lex.column(column, tables);
    head.group_by.iter().any(|g| lex.column(g, tables) == wanted)
}

/// Tables named in `phrase`, plus the filters implied by qualifiers in front
/// of them. A phrase that is only qualifiers ("females") names the table that
/// owns them.
fn tables_in(lex: &Lexicon<'_>, phrase: &str) -> (Vec<String>, Vec<Filter>) {
    let mut out: Vec<String> = Vec::new();
    let mut filters = Vec::new();
    for part in JOIN_SPLIT.split(phrase) {
        let (rest, qualifiers) = lex.peel(part);
        let table = match qualifiers.first() {
            Some(q) if rest.is_empty() => q.table.to_string(),
            _ => lex.table_or_raw(&rest),
        };
        filters.extend(
            qualifiers
                .iter()
                .map(|q| q.qualifier.to_filter(ColumnRef::qualified(q.table, q.column))),
        );
        if !table.is_empty() && !out.contains(&table) {
            out.push(table);
        }
    }
    (out, filters)
}

fn split_group(rest: &str) -> (String, Vec<String>) {
    match GROUP.captures(rest) {
        Some(caps) => (caps["body"].to_string(), split_list(&caps["group"])),
        None => (rest.to_string(), Vec::new()),
    }
}

fn split_list(text: &str) -> Vec<String> {
    LIST_SPLIT
        .split(text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split `head <keyword> conditions`. A `with` followed by a table name joins
/// tables rather than introducing a condition.
fn split_conditions<'t>(lex: &Lexicon<'_>, text: &'t str) -> (&'t str, Option<&'t str>) {
    for m in CONDITION_SPLIT.find_iter(text) {
        let keyword = m.as_str().trim().to_ascii_lowercase();
        let rest = &text[m.end()..];
        if keyword == "with" && lex.starts_with_table(rest) {
            continue;
        }
        return (&text[..m.start()], Some(rest));
    }
    (text, None)
}

fn parse_conditions(
    lex: &Lexicon<'_>,
    text: &str,
    tables: &[String],
) -> Result<Vec<Filter>, ParseFailure> {
    // `between a and b` and `one of a, b and c` contain `and`; a fragment with
    // no operator of its own belongs to the previous condition.
    let mut parts: Vec<String> = Vec::new();
    for fragment in AND.split(text) {
        match parts.last_mut() {
            Some(previous) if !CONDITION.is_match(fragment) => {
                previous.push_str(" and ");
                previous.push_str(fragment);
            }
            _ => parts.push(fragment.to_string()),
        }
    }

    parts
        .iter()
        .map(|part| parse_condition(lex, part, tables))
        .collect()
}

fn parse_condition(lex: &Lexicon<'_>, part: &str, tables: &[String]) -> Result<Filter, ParseFailure> {
    let caps = CONDITION
        .captures(part)
        .ok_or_else(|| ParseFailure::Unrecognized(format!("condition `{part}`")))?;
    let op_text = caps["op"].split_whitespace().collect::<Vec<_>>().join(" ");
    let operator = OPERATOR_PHRASES
        .iter()
        .find(|(phrase, _)| phrase.eq_ignore_ascii_case(&op_text))
        .map(|(_, op)| *op)
        .ok_or_else(|| ParseFailure::Unrecognized(format!("operator `{op_text}`")))?;
    let column = lex.column(&caps["col"], tables);
    let raw_value = caps.name("val").map(|v| v.as_str().trim()).unwrap_or("");

    if operator != Operator::InList && OR.is_match(raw_value) {
        return Err(ParseFailure::Unsupported(format!(
            "`or` between conditions in `{part}`"
        )));
    }

    let value = match operator {
        Operator::IsNull | Operator::IsNotNull => {
            if !raw_value.is_empty() {
                return Err(ParseFailure::Unrecognized(format!("condition `{part}`")));
            }
            FilterValue::None
        }
        Operator::Between => {
            let bounds: Vec<&str> = AND.splitn(raw_value, 2).collect();
            match bounds.as_slice() {
                [low, high] => FilterValue::Range(literal(low), literal(high)),
                _ => {
                    return Err(ParseFailure::Unrecognized(format!(
                        "`between` needs two values in `{part}`"
                    )))
                }
            }
        }
        Operator::InList => {
            let values: Vec<SqlValue> = split_list(raw_value).iter().map(|v| literal(v)).collect();
            if values.is_empty() {
                return Err(ParseFailure::Unrecognized(format!("condition `{part}`")));
            }
            FilterValue::List(values)
        }
        _ if raw_value.is_empty() => {
            return Err(ParseFailure::Unrecognized(format!(
                "missing value in `{part}`"
            )))
        }
        _ => FilterValue::Single(literal(raw_value)),
    };
    Ok(Filter::new(column, operator, value))
}

fn literal(text: &str) -> SqlValue {
    let text = text.trim().trim_matches(|c: char| c == '\'' || c == '"');
    if let Ok(i) = text.parse::<i64>() {
        return SqlValue::Integer(i);
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => SqlValue::Real(f),
        _ => SqlValue::Text(text.to_string()),
    }
}

fn parse_count(text: &str) -> Result<u64, ParseFailure> {
    text.parse()
        .map_err(|_| ParseFailure::Unrecognized(format!("`{text}` is not a row count")))
}

fn direction(text: &str) -> SortDirection {
    if text.to_ascii_lowercase().starts_with("desc") {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    }
}

fn clean(text: &str) -> String {
    let spaced = SYMBOL.replace_all(text, " $1 ");
    let trimmed = TRAILING_PUNCT.replace(spaced.trim(), "");
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove the first match of `re` from `text`, returning what `f` extracts.
fn take<T>(re: &Regex, text: &mut String, f: impl FnOnce(&regex::Captures<'_>) -> T) -> Option<T> {
    let (range, value) = {
        let caps = re.captures(text.as_str())?;
        let whole = caps.get(0)?;
        (whole.range(), f(&caps))
    };
    text.replace_range(range, "");
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlq_types::{AggregateIntent, ColumnTerms, ColumnType, Qualifier, TableTerms};

    fn table(name: &str, aliases: &[&str], columns: &[(&str, ColumnType, &str)]) -> TableTerms {
        TableTerms {
            name: name.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            columns: columns
                .iter()
                .map(|(n, t, a)| ColumnTerms {
                    name: n.to_string(),
                    aliases: a
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect(),
                    data_type: *t,
                    qualifiers: Vec::new(),
                })
                .collect(),
        }
    }

    fn vocab() -> Vocabulary {
        let (num, text) = (ColumnType::Number, ColumnType::String);
        Vocabulary {
            tables: vec![
                table(
                    "customers",
                    &["clients"],
                    &[
                        ("customerid", num, "id"),
                        ("gender", text, "sex"),
                        ("age", num, ""),
                        ("annual_income_k", num, "income,salary"),
                        ("spending_score", num, "spending"),
                        ("preferred_category", text, "category"),
                        ("age_group", text, ""),
                    ],
                ),
                table(
                    "orders",
                    &[],
                    &[
                        ("order_id", num, ""),
                        ("customer_id", num, ""),
                        ("product_id", num, ""),
                        ("total", num, ""),
                        ("customer_city", text, "city"),
                    ],
                ),
                table(
                    "products",
                    &[],
                    &[("product_id", num, ""), ("name", text, ""), ("price", num, "")],
                ),
            ],
        }
    }

    fn qualified_vocab() -> Vocabulary {
        let mut vocab = vocab();
        for column in &mut vocab.tables[0].columns {
            match column.name.as_str() {
                "gender" => {
                    column.qualifiers = vec![
                        Qualifier::new("female", Operator::Equals, "Female"),
                        Qualifier::new("women", Operator::Equals, "Female"),
                    ]
                }
                "annual_income_k" => {
                    column.qualifiers =
                        vec![Qualifier::new("high income", Operator::GreaterThan, 70i64)]
                }
                _ => {}
            }
        }
        vocab
    }

    fn parse(text: &str) -> Result<QueryIntent, ParseFailure> {
        RuleIntentParser::new().parse_text(text, &vocab())
    }

    fn parse_qualified(text: &str) -> Result<QueryIntent, ParseFailure> {
        RuleIntentParser::new().parse_text(text, &qualified_vocab())
    }

    #[test]
    fn lists_all_rows() {
        assert_eq!(
            parse("Show all customers").unwrap(),
            SelectIntent::new("customers").into()
        );
    }

    #[test]
    fn projection_with_conditions() {
        let intent = parse("show age and gender of customers where income greater than 50 and gender is Female").unwrap();
        let expected: QueryIntent = SelectIntent::new("customers")
            .column("age")
            .column("gender")
            .filter(Filter::compare("annual_income_k", Operator::GreaterThan, 50i64))
            .filter(Filter::compare("gender", Operator::Equals, "Female"))
            .into();
        assert_eq!(intent, expected);
    }

    #[test]
    fn symbolic_operators_and_between() {
        let intent = parse("customers with age between 20 and 30 and spending>=60").unwrap();
        let expected: QueryIntent = SelectIntent::new("customers")
            .filter(Filter::between("age", 20i64, 30i64))
            .filter(Filter::compare("spending_score", Operator::AtLeast, 60i64))
            .into();
        assert_eq!(intent, expected);
    }

    #[test]
    fn counts_with_conditions() {
        let intent = parse("How many customers whose age is under 19?").unwrap();
        let expected: QueryIntent = AggregateIntent::new("customers", Aggregation::Count, None)
            .filter(Filter::compare("age", Operator::LessThan, 19i64))
            .into();
        assert_eq!(intent, expected);
    }

    #[test]
    fn aggregate_infers_table_and_group() {
        let intent = parse("average income by gender").unwrap();
        let expected: QueryIntent =
            AggregateIntent::new("customers", Aggregation::Avg, Some("annual_income_k"))
                .group_by("gender")
                .into();
        assert_eq!(intent, expected);
    }

    #[test]
    fn top_n_orders_descending() {
        let intent = parse("top 5 customers by spending score").unwrap();
        let expected: QueryIntent = SelectIntent::new("customers")
            .order_by("spending_score", SortDirection::Desc)
            .limit(5)
            .into();
        assert_eq!(intent, expected);
    }

    #[test]
    fn ordering_and_limit_are_peeled() {
        let intent = parse("list customers sorted by age desc limit 10").unwrap();
        let expected: QueryIntent = SelectIntent::new("customers")
            .order_by("age", SortDirection::Desc)
            .limit(10)
            .into();
        assert_eq!(intent, expected);
    }

    #[test]
    fn in_list_and_null_checks() {
        let intent =
            parse("customers where category is one of Electronics, Books or Toys and age group is null")
                .unwrap();
        let QueryIntent::Select(select) = intent else {
            panic!("expected select");
        };
        assert_eq!(
            select.filters[0].value,
            FilterValue::List(vec!["Electronics".into(), "Books".into(), "Toys".into()])
        );
        assert_eq!(select.filters[1].operator, Operator::IsNull);
        assert_eq!(select.filters[1].column, ColumnRef::new("age_group"));
    }

    #[test]
    fn two_tables_become_a_join() {
        let intent = parse("orders with products where price over 20 via product_id").unwrap();
        let QueryIntent::Join(join) = intent else {
            panic!("expected join");
        };
        assert_eq!((join.from.as_str(), join.to.as_str()), ("orders", "products"));
        assert_eq!(join.via.as_deref(), Some("product_id"));
        assert_eq!(
            join.filters[0].column,
            ColumnRef::qualified("products", "price")
        );
    }

    #[test]
    fn distinct_values_infer_table() {
        let intent = parse("distinct city").unwrap();
        let expected: QueryIntent = SelectIntent::new("orders")
            .column("customer_city")
            .distinct()
            .into();
        assert_eq!(intent, expected);
    }

    #[test]
    fn leading_qualifiers_become_filters() {
        let expected: QueryIntent = AggregateIntent::new("customers", Aggregation::Count, None)
            .filter(Filter::compare("gender", Operator::Equals, "Female"))
            .into();
        assert_eq!(parse_qualified("Count female customers").unwrap(), expected);
        assert_eq!(parse_qualified("how many women are there").unwrap(), expected);

        let intent = parse_qualified("list female high income customers whose age is over 30").unwrap();
        let expected: QueryIntent = SelectIntent::new("customers")
            .filter(Filter::compare("gender", Operator::Equals, "Female"))
            .filter(Filter::compare("annual_income_k", Operator::GreaterThan, 70i64))
            .filter(Filter::compare("age", Operator::GreaterThan, 30i64))
            .into();
        assert_eq!(intent, expected);
    }

    #[test]
    fn qualifiers_apply_inside_projections_and_aggregates() {
        let intent = parse_qualified("average age of female customers").unwrap();
        let expected: QueryIntent = AggregateIntent::new("customers", Aggregation::Avg, Some("age"))
            .filter(Filter::compare("gender", Operator::Equals, "Female"))
            .into();
        assert_eq!(intent, expected);

        let intent = parse_qualified("orders with female customers").unwrap();
        let QueryIntent::Join(join) = intent else {
            panic!("expected join");
        };
        assert_eq!(join.filters[0].column, ColumnRef::qualified("customers", "gender"));
    }

    #[test]
    fn qualifier_before_unknown_table_passes_through() {
        assert_eq!(
            parse_qualified("show female custmers").unwrap(),
            SelectIntent::new("custmers")
                .filter(Filter::new(
                    ColumnRef::qualified("customers", "gender"),
                    Operator::Equals,
                    FilterValue::Single("Female".into()),
                ))
                .into()
        );
    }

    #[test]
    fn aggregate_sorted_by_group_keeps_group_order() {
        let intent = parse("average income by gender sorted by gender desc").unwrap();
        let expected: QueryIntent =
            AggregateIntent::new("customers", Aggregation::Avg, Some("annual_income_k"))
                .group_by("gender")
                .order_by("gender", SortDirection::Desc)
                .into();
        assert_eq!(intent, expected);

        let intent = parse("average income by gender sorted by income desc").unwrap();
        let expected: QueryIntent =
            AggregateIntent::new("customers", Aggregation::Avg, Some("annual_income_k"))
                .group_by("gender")
                .order(SortDirection::Desc)
                .into();
        assert_eq!(intent, expected);
    }

    #[test]
    fn unknown_table_passes_through() {
        let intent = parse("show all custmers").unwrap();
        assert_eq!(intent, SelectIntent::new("custmers").into());
    }

    #[test]
    fn disjunctions_are_unsupported() {
        assert!(matches!(
            parse("customers where age over 30 or gender is Male"),
            Err(ParseFailure::Unsupported(_))
        ));
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(parse("  ?? "), Err(ParseFailure::Empty));
    }
}
