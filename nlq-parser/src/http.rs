use std::time::Duration;

use async_trait::async_trait;
use nlq_types::{ParseFailure, QueryIntent, RawIntent, Vocabulary};
use serde::Serialize;

use crate::IntentParser;

#[derive(Serialize)]
struct ParseRequest<'a> {
    text: &'a str,
    vocabulary: &'a Vocabulary,
}

/// Calls an external NLP service that answers `POST {base_url}/parse` with a
/// loose JSON intent, and converts the answer at this boundary.
pub struct HttpIntentParser {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIntentParser {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ParseFailure> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ParseFailure::Unavailable(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IntentParser for HttpIntentParser {
    async fn parse(&self, text: &str, vocab: &Vocabulary) -> Result<QueryIntent, ParseFailure> {
        if text.trim().is_empty() {
            return Err(ParseFailure::Empty);
        }
        let url = format!("{}/parse", self.base_url);

        let resp = self
            .client
            .post(&url)
            .json(&ParseRequest {
                text,
                vocabulary: vocab,
            })
            .send()
            .await
            .map_err(|e| ParseFailure::Unavailable(format!("HTTP error: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            let body = resp.text().await.unwrap_or_default();
            return Err(ParseFailure::Unrecognized(body));
        }
        if !status.is_success() {
            tracing::warn!(%status, url = %url, "intent service rejected request");
            return Err(ParseFailure::Unavailable(format!("HTTP status: {status}")));
        }

        let raw: RawIntent = resp
            .json()
            .await
            .map_err(|e| ParseFailure::Malformed(e.to_string()))?;
        QueryIntent::try_from(raw)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
