//! Purpose: Provide the HTTP/JSON dashboard backend for a presentation layer.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum server exposing submit, filtered records, exports, and analytics.
//! Invariants: Every request re-fetches from the record store; nothing is cached.
//! Invariants: Store failures on reads degrade to empty results with a `notice` field.
//! Invariants: Loopback-only unless explicitly allowed.
//! Notes: The store client is blocking; handlers run it on the blocking pool.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::view_json::{analytics_json, records_json, submit_json};
use kirkpatrick::api::{
    DEFAULT_SAMPLE_SIZE, Dashboard, Error, ErrorKind, ExportFormat, FilterParams, MinScore,
    Submission,
};

const MAX_SAMPLES: usize = 100;

#[derive(Clone)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub allow_non_loopback: bool,
    pub cors_origins: Vec<String>,
    pub dashboard: Dashboard,
}

#[derive(Clone)]
struct AppState {
    dashboard: Dashboard,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;
    let cors = cors_layer(&config.cors_origins)?;

    let state = Arc::new(AppState {
        dashboard: config.dashboard,
    });

    let mut app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/feedback", post(submit_feedback))
        .route("/v1/records", get(list_records))
        .route("/v1/records/export.csv", get(export_csv))
        .route("/v1/records/export.xlsx", get(export_xlsx))
        .route("/v1/analytics", get(analytics))
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    if let Some(cors) = cors {
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;
    info!(bind = %config.bind, "dashboard server listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }
    Ok(())
}

fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>, Error> {
    if origins.is_empty() {
        return Ok(None);
    }
    let mut values = Vec::with_capacity(origins.len());
    for origin in origins {
        let value = HeaderValue::from_str(origin.trim_end_matches('/')).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid --cors-origin value: {origin}"))
                .with_source(err)
        })?;
        values.push(value);
    }
    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(values))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    #[serde(default)]
    participant_name: String,
    satisfaction_score: i64,
    #[serde(default)]
    comments: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecordsQuery {
    min_score: Option<i64>,
    keyword: Option<String>,
}

impl RecordsQuery {
    fn params(self) -> Result<FilterParams, Error> {
        let min_score = match self.min_score {
            Some(value) => MinScore::new(value)?,
            None => MinScore::default(),
        };
        Ok(FilterParams::new(min_score, self.keyword))
    }
}

#[derive(Debug, Deserialize)]
struct AnalyticsQuery {
    samples: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

async fn healthz() -> Response {
    json_response(StatusCode::OK, json!({ "ok": true }))
}

async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => return error_response(json_rejection(rejection)),
    };
    let submission = match Submission::new(
        payload.participant_name,
        payload.satisfaction_score,
        payload.comments,
    ) {
        Ok(submission) => submission,
        Err(err) => return error_response(err),
    };
    let dashboard = state.dashboard.clone();
    match run_blocking(move || dashboard.submit(&submission)).await {
        Ok(outcome) => {
            let status = if outcome.is_success() {
                StatusCode::OK
            } else {
                StatusCode::BAD_GATEWAY
            };
            json_response(status, submit_json(&outcome))
        }
        Err(err) => error_response(err),
    }
}

async fn list_records(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RecordsQuery>, QueryRejection>,
) -> Response {
    let params = match records_params(query) {
        Ok(params) => params,
        Err(err) => return error_response(err),
    };
    let dashboard = state.dashboard.clone();
    match run_blocking(move || dashboard.records(&params)).await {
        Ok(view) => json_response(StatusCode::OK, records_json(&view)),
        Err(err) => error_response(err),
    }
}

async fn export_csv(
    state: State<Arc<AppState>>,
    query: Result<Query<RecordsQuery>, QueryRejection>,
) -> Response {
    export_records(state, query, ExportFormat::Csv).await
}

async fn export_xlsx(
    state: State<Arc<AppState>>,
    query: Result<Query<RecordsQuery>, QueryRejection>,
) -> Response {
    export_records(state, query, ExportFormat::Xlsx).await
}

async fn export_records(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RecordsQuery>, QueryRejection>,
    format: ExportFormat,
) -> Response {
    let params = match records_params(query) {
        Ok(params) => params,
        Err(err) => return error_response(err),
    };
    let dashboard = state.dashboard.clone();
    let artifact = match run_blocking(move || dashboard.export(&params, format)).await {
        Ok(Ok(artifact)) => artifact,
        Ok(Err(err)) | Err(err) => return error_response(err),
    };

    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name());
    let mut response = Response::new(Bytes::from(artifact.bytes).into());
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(artifact.format.mime_type()),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers.insert("kirkpatrick-rows", HeaderValue::from(artifact.row_count));
    if let Some(value) = artifact
        .notice
        .as_deref()
        .and_then(|notice| HeaderValue::from_str(&notice.replace(['\r', '\n'], " ")).ok())
    {
        headers.insert("kirkpatrick-notice", value);
    }
    response
}

async fn analytics(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return error_response(query_rejection(rejection)),
    };
    let samples = query
        .samples
        .unwrap_or(DEFAULT_SAMPLE_SIZE)
        .min(MAX_SAMPLES);
    let dashboard = state.dashboard.clone();
    match run_blocking(move || dashboard.analytics(samples)).await {
        Ok(view) => json_response(
            StatusCode::OK,
            analytics_json(&view.analytics, view.notice.as_deref()),
        ),
        Err(err) => error_response(err),
    }
}

fn records_params(
    query: Result<Query<RecordsQuery>, QueryRejection>,
) -> Result<FilterParams, Error> {
    match query {
        Ok(Query(query)) => query.params(),
        Err(rejection) => Err(query_rejection(rejection)),
    }
}

fn json_rejection(rejection: JsonRejection) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("invalid feedback body: {}", rejection.body_text()))
        .with_hint(
            "Send JSON with participant_name, satisfaction_score (integer 1-5), and comments.",
        )
}

fn query_rejection(rejection: QueryRejection) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("invalid query string: {}", rejection.body_text()))
        .with_hint("Use min_score=1..5, keyword=<text>, samples=<count>.")
}

async fn run_blocking<T, F>(task: F) -> Result<T, Error>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("request task failed")
            .with_source(err)
    })
}

fn json_response(status: StatusCode, payload: serde_json::Value) -> Response {
    (status, Json(payload)).into_response()
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Permission => StatusCode::FORBIDDEN,
        ErrorKind::Remote | ErrorKind::Io => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
            status: err.status(),
        },
    };
    (status, Json(body)).into_response()
}
