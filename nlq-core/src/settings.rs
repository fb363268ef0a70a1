//! Runtime configuration: serde defaults, an optional YAML file named by
//! `NLQ_CONFIG`, then `NLQ_*` environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use nlq_synth::SynthOptions;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    #[default]
    Rules,
    Http,
    Null,
}

impl std::str::FromStr for ParserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rules" => Ok(ParserKind::Rules),
            "http" => Ok(ParserKind::Http),
            "null" | "off" => Ok(ParserKind::Null),
            other => Err(format!("unknown parser `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http_addr: String,
    /// SQLite file. Unset means an in-memory copy of the demo database.
    pub database: Option<PathBuf>,
    /// YAML catalog used instead of introspecting the database.
    pub catalog_file: Option<PathBuf>,
    /// YAML alias overlay merged into the catalog.
    pub alias_file: Option<PathBuf>,
    pub history_file: Option<PathBuf>,
    pub parser: ParserKind,
    pub parser_url: Option<String>,
    pub parser_timeout_ms: u64,
    pub synth: SynthOptions,
    pub request_timeout_ms: u64,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:7000".into(),
            database: None,
            catalog_file: None,
            alias_file: None,
            history_file: Some(PathBuf::from("./nlq-history.jsonl")),
            parser: ParserKind::Rules,
            parser_url: None,
            parser_timeout_ms: 5_000,
            synth: SynthOptions::default(),
            request_timeout_ms: 30_000,
            log_format: LogFormat::Text,
        }
    }
}

impl Settings {
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// File named by `NLQ_CONFIG` (or defaults), then environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut settings = match std::env::var("NLQ_CONFIG") {
            Ok(path) if !path.is_empty() => {
                tracing::info!(path = %path, "loading config");
                Self::from_path(path)?
            }
            _ => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Apply `NLQ_*` overrides read through `lookup`. Empty values count as unset.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("NLQ_HTTP_ADDR") {
            self.http_addr = v;
        }
        if let Some(v) = get("NLQ_DATABASE") {
            self.database = Some(v.into());
        }
        if let Some(v) = get("NLQ_CATALOG_FILE") {
            self.catalog_file = Some(v.into());
        }
        if let Some(v) = get("NLQ_ALIAS_FILE") {
            self.alias_file = Some(v.into());
        }
        if let Some(v) = get("NLQ_HISTORY_FILE") {
            self.history_file = match v.as_str() {
                "off" | "none" => None,
                _ => Some(v.into()),
            };
        }
        if let Some(v) = get("NLQ_PARSER") {
            self.parser = v.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(v) = get("NLQ_PARSER_URL") {
            self.parser_url = Some(v);
        }
        if let Some(v) = get("NLQ_PLACEHOLDER") {
            self.synth.style = v.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(v) = get("NLQ_DEFAULT_LIMIT") {
            self.synth.default_limit = parse_limit("NLQ_DEFAULT_LIMIT", &v)?;
        }
        if let Some(v) = get("NLQ_MAX_LIMIT") {
            self.synth.max_limit = parse_limit("NLQ_MAX_LIMIT", &v)?;
        }
        if let Some(v) = get("NLQ_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = v
                .parse()
                .with_context(|| format!("NLQ_REQUEST_TIMEOUT_MS={v}"))?;
        }
        if let Some(v) = get("NLQ_LOG_FORMAT") {
            self.log_format = match v.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => anyhow::bail!("unknown log format `{other}`"),
            };
        }
        Ok(())
    }
}

/// `none`/`0` disable the limit.
fn parse_limit(key: &str, value: &str) -> anyhow::Result<Option<u64>> {
    match value.trim() {
        "none" | "0" => Ok(None),
        v => Ok(Some(v.parse().with_context(|| format!("{key}={value}"))?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlq_types::PlaceholderStyle;
    use std::collections::HashMap;

    #[test]
    fn yaml_fills_gaps_with_defaults() {
        let settings = Settings::from_yaml_str(
            "database: shop.db\nparser: http\nparser_url: http://nlp:9000\nsynth:\n  style: dollar\n  max_limit: 500\n",
        )
        .unwrap();
        assert_eq!(settings.database, Some(PathBuf::from("shop.db")));
        assert_eq!(settings.parser, ParserKind::Http);
        assert_eq!(settings.synth.style, PlaceholderStyle::Dollar);
        assert_eq!(settings.synth.default_limit, Some(1000));
        assert_eq!(settings.synth.max_limit, Some(500));
        assert_eq!(settings.http_addr, "0.0.0.0:7000");
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("NLQ_HTTP_ADDR", "127.0.0.1:9000"),
            ("NLQ_PLACEHOLDER", "numbered"),
            ("NLQ_DEFAULT_LIMIT", "none"),
            ("NLQ_HISTORY_FILE", "off"),
            ("NLQ_LOG_FORMAT", "JSON"),
            ("NLQ_DATABASE", ""),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings::default();
        settings
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.http_addr, "127.0.0.1:9000");
        assert_eq!(settings.synth.style, PlaceholderStyle::Numbered);
        assert_eq!(settings.synth.default_limit, None);
        assert_eq!(settings.history_file, None);
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.database, None);
    }

    #[test]
    fn bad_override_is_an_error() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(|k| (k == "NLQ_MAX_LIMIT").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("NLQ_MAX_LIMIT"));
        assert!(settings
            .apply_overrides(|k| (k == "NLQ_PARSER").then(|| "magic".to_string()))
            .is_err());
    }
}
