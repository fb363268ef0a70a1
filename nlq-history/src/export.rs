//! Rendering of history entries and result sets as JSON, JSON lines or CSV.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use nlq_types::ResultSet;
use serde::{Deserialize, Serialize};

use crate::{HistoryEntry, HistoryError};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Jsonl,
    Csv,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Jsonl => "application/x-ndjson",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "jsonl" | "ndjson" => Ok(ExportFormat::Jsonl),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format `{other}`")),
        }
    }
}

const ENTRY_HEADER: [&str; 9] = [
    "id",
    "timestamp",
    "question",
    "outcome",
    "sql",
    "params",
    "row_count",
    "prev_hash",
    "chain_hash",
];

pub fn export_entries(entries: &[HistoryEntry], format: ExportFormat) -> Result<String, HistoryError> {
    match format {
        ExportFormat::Json => to_json(entries),
        ExportFormat::Jsonl => to_json_lines(entries),
        ExportFormat::Csv => {
            let mut out = csv_line(ENTRY_HEADER.iter().map(|h| Cow::Borrowed(*h)));
            for e in entries {
                let params = serde_json::Value::Array(e.params.iter().map(|p| p.to_json()).collect());
                out.push_str(&csv_line([
                    Cow::Owned(e.id.to_string()),
                    Cow::Borrowed(e.timestamp.as_str()),
                    Cow::Borrowed(e.question.as_str()),
                    Cow::Borrowed(e.outcome.as_str()),
                    Cow::Borrowed(e.sql.as_deref().unwrap_or("")),
                    Cow::Owned(params.to_string()),
                    Cow::Owned(e.row_count.map(|n| n.to_string()).unwrap_or_default()),
                    Cow::Borrowed(e.prev_hash.as_deref().unwrap_or("")),
                    Cow::Borrowed(e.chain_hash.as_str()),
                ]));
            }
            Ok(out)
        }
    }
}

/// Result rows keyed by column name (JSON forms) or as a header plus rows (CSV).
pub fn export_results(rows: &ResultSet, format: ExportFormat) -> Result<String, HistoryError> {
    match format {
        ExportFormat::Json => to_json(&rows.records()),
        ExportFormat::Jsonl => to_json_lines(&rows.records()),
        ExportFormat::Csv => {
            let mut out = csv_line(rows.columns.iter().map(|c| Cow::Borrowed(c.as_str())));
            for row in &rows.rows {
                out.push_str(&csv_line(row.iter().map(|v| Cow::Owned(v.to_string()))));
            }
            Ok(out)
        }
    }
}

fn to_json<T: Serialize>(items: &[T]) -> Result<String, HistoryError> {
    serde_json::to_string_pretty(items).map_err(|e| HistoryError::Parse(e.to_string()))
}

fn to_json_lines<T: Serialize>(items: &[T]) -> Result<String, HistoryError> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item).map_err(|e| HistoryError::Parse(e.to_string()))?);
        out.push('\n');
    }
    Ok(out)
}

fn csv_line<'a>(fields: impl IntoIterator<Item = Cow<'a, str>>) -> String {
    let mut line = fields
        .into_iter()
        .map(|f| csv_field(&f).into_owned())
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

/// RFC 4180 quoting: fields holding a delimiter, quote or line break are
/// wrapped in quotes with inner quotes doubled.
fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OUTCOME_OK;
    use nlq_types::SqlValue;

    fn rows() -> ResultSet {
        ResultSet {
            columns: vec!["name".into(), "price".into(), "note".into()],
            rows: vec![
                vec![SqlValue::from("Yoga Mat"), SqlValue::Real(25.0), SqlValue::Null],
                vec![
                    SqlValue::from("Chair, \"Oak\""),
                    SqlValue::Integer(120),
                    SqlValue::from("two\nlines"),
                ],
            ],
        }
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        let csv = export_results(&rows(), ExportFormat::Csv).unwrap();
        assert_eq!(
            csv,
            "name,price,note\r\nYoga Mat,25,\r\n\"Chair, \"\"Oak\"\"\",120,\"two\nlines\"\r\n"
        );
    }

    #[test]
    fn json_forms_use_column_names() {
        let jsonl = export_results(&rows(), ExportFormat::Jsonl).unwrap();
        let first: serde_json::Value = serde_json::from_str(jsonl.lines().next().unwrap()).unwrap();
        assert_eq!(first["name"], "Yoga Mat");
        assert!(first["note"].is_null());

        let json: serde_json::Value =
            serde_json::from_str(&export_results(&rows(), ExportFormat::Json).unwrap()).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn entries_export_with_header() {
        let entry = HistoryEntry::new("how many customers", OUTCOME_OK).with_row_count(1);
        let csv = export_entries(&[entry], ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(ENTRY_HEADER.join(",").as_str()));
        assert!(lines.next().unwrap().contains(",how many customers,ok,,[],1,,"));
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("ndjson".parse::<ExportFormat>(), Ok(ExportFormat::Jsonl));
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
