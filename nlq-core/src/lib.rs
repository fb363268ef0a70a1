//! The kernel: wires parser, synthesizer, engine, catalog and history together.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use nlq_history::{HistoryEntry, HistoryLog, OUTCOME_OK};
use nlq_parser::IntentParser;
use nlq_schema::{AliasOverlay, Catalog, CatalogHandle};
use nlq_store::{CatalogLoader, QueryEngine, StoreError};
use nlq_synth::{synthesize, SynthOptions};
use nlq_types::{QueryIntent, ResultSet, SqlValue, Statement};
use serde::Serialize;
use tracing::Instrument;

pub mod bootstrap;
mod error;
pub mod settings;

pub use bootstrap::build_kernel;
pub use error::QueryError;
pub use settings::{LogFormat, ParserKind, Settings};

/// Questions the demo catalog answers, offered when a question is not understood.
pub const EXAMPLE_QUESTIONS: [&str; 4] = [
    "Show me all customers",
    "Count female customers",
    "List customers with age > 30",
    "Show average income by gender",
];

/// A question turned into a statement, not yet executed.
#[derive(Clone, Debug, Serialize)]
pub struct Translation {
    pub question: String,
    pub intent: QueryIntent,
    pub statement: Statement,
}

/// An answered question.
#[derive(Clone, Debug, Serialize)]
pub struct QueryOutcome {
    pub translation: Translation,
    pub rows: ResultSet,
}

/// Single aggregate answer, e.g. "how many customers".
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: SqlValue,
}

impl QueryOutcome {
    /// Set when the intent asks for one ungrouped aggregate and the engine
    /// returned exactly one value.
    pub fn metric(&self) -> Option<Metric> {
        if !self.translation.intent.is_scalar() {
            return None;
        }
        let value = self.rows.scalar()?.clone();
        Some(Metric {
            label: metric_label(&self.translation.intent),
            value,
        })
    }
}

fn metric_label(intent: &QueryIntent) -> String {
    let (spec, subject) = match intent {
        QueryIntent::Aggregate(i) => (Some(&i.aggregate), i.table.clone()),
        QueryIntent::Join(i) => (i.aggregate.as_ref(), format!("{} with {}", i.from, i.to)),
        QueryIntent::Select(i) => (None, i.table.clone()),
    };
    match spec.and_then(|s| s.column.as_ref().map(|c| (s.function, c))) {
        Some((function, column)) => format!("{} {column} of {subject}", function.as_str()),
        None => format!("count of {subject}"),
    }
}

/// Re-reads a YAML catalog file on refresh.
pub struct CatalogFile {
    path: PathBuf,
}

impl CatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogLoader for CatalogFile {
    async fn load_catalog(&self) -> Result<Catalog, StoreError> {
        Ok(Catalog::from_path(&self.path)?)
    }
}

pub struct NlqKernel {
    catalog: Arc<CatalogHandle>,
    parser: Arc<dyn IntentParser>,
    engine: Arc<dyn QueryEngine>,
    loader: Option<Arc<dyn CatalogLoader>>,
    overlay: Option<AliasOverlay>,
    history: Option<Arc<HistoryLog>>,
    options: SynthOptions,
}

impl NlqKernel {
    pub fn new(
        catalog: Catalog,
        parser: Arc<dyn IntentParser>,
        engine: Arc<dyn QueryEngine>,
    ) -> Self {
        Self {
            catalog: Arc::new(CatalogHandle::new(catalog)),
            parser,
            engine,
            loader: None,
            overlay: None,
            history: None,
            options: SynthOptions::default(),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn CatalogLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Aliases merged into every catalog produced by a refresh.
    pub fn with_overlay(mut self, overlay: AliasOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn with_history(mut self, history: Arc<HistoryLog>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_options(mut self, options: SynthOptions) -> Self {
        self.options = options;
        self
    }

    /// Current catalog snapshot.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.snapshot()
    }

    pub fn generation(&self) -> u64 {
        self.catalog.generation()
    }

    pub fn options(&self) -> &SynthOptions {
        &self.options
    }

    pub fn parser_name(&self) -> &'static str {
        self.parser.name()
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn history(&self) -> Option<&HistoryLog> {
        self.history.as_deref()
    }

    /// Parse and synthesize without executing.
    pub async fn translate(&self, question: &str) -> Result<Translation, QueryError> {
        let catalog = self.catalog.snapshot();
        let intent = self.parser.parse(question, &catalog.vocabulary()).await?;
        let statement = synthesize(&intent, &catalog, &self.options)?;
        tracing::debug!(
            kind = intent.kind(),
            sql = %statement.text,
            params = statement.params.len(),
            "question translated"
        );
        Ok(Translation {
            question: question.to_string(),
            intent,
            statement,
        })
    }

    /// Translate, execute and record the question in history.
    pub async fn handle_query(&self, question: &str) -> Result<QueryOutcome, QueryError> {
        let span = tracing::info_span!(
            "query",
            parser = self.parser.name(),
            engine = self.engine.name(),
            generation = self.generation()
        );
        self.answer(question).instrument(span).await
    }

    async fn answer(&self, question: &str) -> Result<QueryOutcome, QueryError> {
        let translation = match self.translate(question).await {
            Ok(t) => t,
            Err(err) => {
                tracing::info!(kind = err.kind(), error = %err, "question rejected");
                self.record(HistoryEntry::new(question, err.kind())).await;
                return Err(err);
            }
        };

        let rows = match self.engine.execute(&translation.statement).await {
            Ok(rows) => rows,
            Err(err) => {
                let err = QueryError::from(err);
                tracing::warn!(error = %err, sql = %translation.statement.text, "execution failed");
                self.record(
                    HistoryEntry::new(question, err.kind()).with_statement(&translation.statement),
                )
                .await;
                return Err(err);
            }
        };

        tracing::info!(rows = rows.row_count(), kind = translation.intent.kind(), "question answered");
        self.record(
            HistoryEntry::new(question, OUTCOME_OK)
                .with_statement(&translation.statement)
                .with_row_count(rows.row_count()),
        )
        .await;
        Ok(QueryOutcome { translation, rows })
    }

    /// Reload the catalog from its source and swap it in. Returns the new generation.
    pub async fn refresh_catalog(&self) -> Result<u64, QueryError> {
        let loader = self.loader.as_ref().ok_or(QueryError::RefreshUnavailable)?;
        let mut catalog = loader.load_catalog().await?;
        if let Some(overlay) = &self.overlay {
            catalog = catalog.with_overlay(overlay)?;
        }
        let generation = self.catalog.swap(catalog);
        tracing::info!(generation, "catalog refreshed");
        Ok(generation)
    }

    /// Most recent history entries, oldest first. Empty when history is off.
    pub async fn history_tail(&self, n: usize) -> Result<Vec<HistoryEntry>, QueryError> {
        let Some(log) = self.history.clone() else {
            return Ok(Vec::new());
        };
        let entries = tokio::task::spawn_blocking(move || log.tail(n))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;
        Ok(entries)
    }

    async fn record(&self, entry: HistoryEntry) {
        let Some(log) = self.history.clone() else {
            return;
        };
        match tokio::task::spawn_blocking(move || log.append(entry)).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "history append failed"),
            Err(err) => tracing::warn!(error = %err, "history task failed"),
        }
    }
}
