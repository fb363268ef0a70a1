use async_trait::async_trait;
use nlq_types::{ParseFailure, QueryIntent, Vocabulary};

pub mod http;
mod lexicon;
pub mod rules;

pub use http::HttpIntentParser;
pub use rules::RuleIntentParser;

/// Turns a question into a typed intent, grounded in the catalog vocabulary.
///
/// Any failure is terminal for the request; callers never retry or fall back
/// to another parser.
#[async_trait]
pub trait IntentParser: Send + Sync {
    async fn parse(&self, text: &str, vocab: &Vocabulary) -> Result<QueryIntent, ParseFailure>;

    /// Short label for logs and health output.
    fn name(&self) -> &'static str;
}

/// Parser used when question parsing is disabled; every request fails.
pub struct NullIntentParser;

#[async_trait]
impl IntentParser for NullIntentParser {
    async fn parse(&self, _text: &str, _vocab: &Vocabulary) -> Result<QueryIntent, ParseFailure> {
        Err(ParseFailure::Unavailable("question parsing is disabled".into()))
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_parser_always_fails() {
        let err = NullIntentParser
            .parse("how many customers", &Vocabulary::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ParseFailure::Unavailable(_)));
    }
}
