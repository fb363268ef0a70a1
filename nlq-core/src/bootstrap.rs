//! Builds a kernel from [`Settings`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use nlq_history::HistoryLog;
use nlq_parser::{HttpIntentParser, IntentParser, NullIntentParser, RuleIntentParser};
use nlq_schema::demo::demo_catalog;
use nlq_schema::{AliasOverlay, Catalog};
use nlq_store::{CatalogLoader, SqliteEngine, DEMO_SEED_SQL};

use crate::{CatalogFile, NlqKernel, ParserKind, Settings};

pub async fn build_kernel(settings: &Settings) -> anyhow::Result<NlqKernel> {
    let parser = build_parser(settings)?;

    let engine = match &settings.database {
        Some(path) => SqliteEngine::open(path)
            .with_context(|| format!("opening database {}", path.display()))?,
        None => {
            tracing::info!("no database configured; using the in-memory demo database");
            let engine = SqliteEngine::open_in_memory()?;
            engine.seed(DEMO_SEED_SQL)?;
            engine
        }
    };

    let loader: Option<Arc<dyn CatalogLoader>> = match (&settings.catalog_file, &settings.database) {
        (Some(path), _) => Some(Arc::new(CatalogFile::new(path))),
        (None, Some(_)) => Some(Arc::new(engine.clone())),
        (None, None) => None,
    };

    let overlay = settings
        .alias_file
        .as_ref()
        .map(|path| {
            AliasOverlay::from_path(path)
                .with_context(|| format!("reading alias overlay {}", path.display()))
        })
        .transpose()?;

    let mut catalog: Catalog = match &loader {
        Some(loader) => loader.load_catalog().await.context("loading catalog")?,
        None => demo_catalog()?,
    };
    if let Some(overlay) = &overlay {
        catalog = catalog.with_overlay(overlay)?;
    }
    tracing::info!(
        tables = catalog.tables().len(),
        relationships = catalog.relationships().len(),
        parser = parser.name(),
        "catalog ready"
    );

    let mut kernel = NlqKernel::new(catalog, parser, Arc::new(engine))
        .with_options(settings.synth.clone());
    if let Some(loader) = loader {
        kernel = kernel.with_loader(loader);
    }
    if let Some(overlay) = overlay {
        kernel = kernel.with_overlay(overlay);
    }
    if let Some(path) = &settings.history_file {
        let log = HistoryLog::open(path)
            .with_context(|| format!("opening history {}", path.display()))?;
        kernel = kernel.with_history(Arc::new(log));
    }
    Ok(kernel)
}

fn build_parser(settings: &Settings) -> anyhow::Result<Arc<dyn IntentParser>> {
    let parser: Arc<dyn IntentParser> = match settings.parser {
        ParserKind::Rules => Arc::new(RuleIntentParser::new()),
        ParserKind::Null => Arc::new(NullIntentParser),
        ParserKind::Http => {
            let url = settings
                .parser_url
                .as_deref()
                .context("parser `http` needs NLQ_PARSER_URL")?;
            Arc::new(HttpIntentParser::new(
                url,
                Duration::from_millis(settings.parser_timeout_ms),
            )?)
        }
    };
    Ok(parser)
}
