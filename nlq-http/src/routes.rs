//! HTTP surface over the kernel.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use nlq_core::{NlqKernel, QueryError, QueryOutcome, EXAMPLE_QUESTIONS};
use nlq_history::{export_entries, export_results, ExportFormat};
use nlq_types::SqlValue;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    kernel: Arc<NlqKernel>,
}

pub fn router(kernel: Arc<NlqKernel>, timeout: Duration) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/query", post(query))
        .route("/translate", post(translate))
        .route("/tables", get(tables))
        .route("/schema", get(schema))
        .route("/admin/refresh", post(refresh))
        .route("/history", get(history))
        .route("/history/export", get(history_export))
        .with_state(AppState { kernel })
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Error envelope: `{type: "error", kind, message, query?, suggestions?}`.
struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    query: Option<String>,
    suggestions: &'static [&'static str],
}

impl ApiError {
    fn from_query(err: QueryError, query: Option<&str>) -> Self {
        let status = match &err {
            e if e.is_rejection() => StatusCode::UNPROCESSABLE_ENTITY,
            QueryError::RefreshUnavailable => StatusCode::CONFLICT,
            e if e.kind() == "parser_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let suggestions: &'static [&'static str] = if err.is_unparsed() {
            &EXAMPLE_QUESTIONS
        } else {
            &[]
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
            query: query.map(str::to_string),
            suggestions,
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "bad_request",
            message: message.into(),
            query: None,
            suggestions: &[],
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "type": "error",
            "kind": self.kind,
            "message": self.message,
        });
        if let Some(query) = self.query {
            body["query"] = Value::String(query);
        }
        if !self.suggestions.is_empty() {
            body["suggestions"] = json!(self.suggestions);
        }
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    format: ResponseFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ResponseFormat {
    #[default]
    Json,
    Csv,
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "parser": state.kernel.parser_name(),
        "engine": state.kernel.engine_name(),
        "generation": state.kernel.generation(),
    }))
}

async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Response, ApiError> {
    let outcome = state
        .kernel
        .handle_query(&req.query)
        .await
        .map_err(|e| ApiError::from_query(e, Some(&req.query)))?;

    if req.format == ResponseFormat::Csv {
        let csv = export_results(&outcome.rows, ExportFormat::Csv)
            .map_err(|e| ApiError::from_query(e.into(), Some(&req.query)))?;
        return Ok(([(header::CONTENT_TYPE, ExportFormat::Csv.content_type())], csv).into_response());
    }
    Ok(Json(outcome_body(&outcome)).into_response())
}

fn params_json(params: &[SqlValue]) -> Value {
    Value::Array(params.iter().map(SqlValue::to_json).collect())
}

fn outcome_body(outcome: &QueryOutcome) -> Value {
    let statement = &outcome.translation.statement;
    let query = &outcome.translation.question;
    match outcome.metric() {
        Some(metric) => json!({
            "type": "metric",
            "label": metric.label,
            "value": metric.value.to_json(),
            "query": query,
            "sql": statement.text,
            "params": params_json(&statement.params),
        }),
        None => json!({
            "type": "table",
            "columns": outcome.rows.columns,
            "rows": outcome.rows.records(),
            "query": query,
            "sql": statement.text,
            "params": params_json(&statement.params),
        }),
    }
}

async fn translate(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<Value>, ApiError> {
    let translation = state
        .kernel
        .translate(&req.query)
        .await
        .map_err(|e| ApiError::from_query(e, Some(&req.query)))?;
    Ok(Json(json!({
        "query": translation.question,
        "sql": translation.statement.text,
        "params": params_json(&translation.statement.params),
        "intent": translation.intent,
    })))
}

async fn tables(State(state): State<AppState>) -> Json<Value> {
    let catalog = state.kernel.catalog();
    Json(json!({ "tables": catalog.table_names() }))
}

async fn schema(State(state): State<AppState>) -> Json<Value> {
    let catalog = state.kernel.catalog();
    Json(json!({
        "generation": state.kernel.generation(),
        "catalog": &*catalog,
    }))
}

async fn refresh(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let generation = state
        .kernel
        .refresh_catalog()
        .await
        .map_err(|e| ApiError::from_query(e, None))?;
    Ok(Json(json!({ "generation": generation })))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Value>, ApiError> {
    let entries = state
        .kernel
        .history_tail(params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await
        .map_err(|e| ApiError::from_query(e, None))?;
    Ok(Json(json!({ "entries": entries })))
}

#[derive(Debug, Deserialize)]
struct ExportParams {
    format: Option<String>,
}

async fn history_export(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = match params.format.as_deref() {
        Some(f) => f.parse().map_err(ApiError::bad_request)?,
        None => ExportFormat::default(),
    };
    let entries = state
        .kernel
        .history_tail(usize::MAX)
        .await
        .map_err(|e| ApiError::from_query(e, None))?;
    let body = export_entries(&entries, format).map_err(|e| ApiError::from_query(e.into(), None))?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}
