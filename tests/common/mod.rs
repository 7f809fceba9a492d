//! Purpose: In-process mock of the hosted record store for integration tests.
//! Exports: `MockStore`, `TEST_TOKEN`, `pick_port`.
//! Role: Serves `/api/v2/tables/{table}/records` on a loopback port from a background runtime.
//! Invariants: Requests without the expected `xc-token` get 401.
//! Invariants: A configured failure status applies to both GET and POST.
#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

pub const TEST_TOKEN: &str = "test-token";
pub const TABLE_ID: &str = "tbl_test";
pub const VIEW_ID: &str = "vw_test";

struct MockState {
    records: Mutex<Vec<Value>>,
    created: Mutex<Vec<Value>>,
    failure: Option<(u16, String)>,
}

pub struct MockStore {
    pub base_url: String,
    state: Arc<MockState>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockStore {
    pub fn start(records: Vec<Value>) -> Self {
        Self::start_with(records, None)
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self::start_with(Vec::new(), Some((status, body.to_string())))
    }

    fn start_with(records: Vec<Value>, failure: Option<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock store");
        listener.set_nonblocking(true).expect("nonblocking");
        let addr = listener.local_addr().expect("addr");
        let state = Arc::new(MockState {
            records: Mutex::new(records),
            created: Mutex::new(Vec::new()),
            failure,
        });
        let app = Router::new()
            .route(
                "/api/v2/tables/:table/records",
                get(list_records).post(create_record),
            )
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("listener");
                let _ = axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await;
            });
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown: Some(shutdown_tx),
        }
    }

    /// Payloads received by POST, in arrival order.
    pub fn created(&self) -> Vec<Value> {
        self.state.created.lock().expect("lock").clone()
    }
}

impl Drop for MockStore {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// A loopback port with nothing listening on it.
pub fn pick_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

pub fn sample_records() -> Vec<Value> {
    vec![
        json!({"Id": 1, "participant_name": "Ada Lovelace", "satisfaction_score": 5, "comments": "Loved the labs"}),
        json!({"Id": 2, "participant_name": "Grace Hopper", "satisfaction_score": "2", "comments": "Too fast"}),
        json!({"Id": 3, "participant_name": "Alan", "satisfaction_score": "bad", "comments": null}),
        json!({"Id": 4, "participant_name": "Linus", "satisfaction_score": 4, "comments": "More LABS please"}),
        json!({"Id": 5, "participant_name": null, "satisfaction_score": 3}),
    ]
}

fn check_request(
    state: &MockState,
    headers: &HeaderMap,
    table: &str,
    query: &HashMap<String, String>,
) -> Option<Response> {
    if headers.get("xc-token").and_then(|value| value.to_str().ok()) != Some(TEST_TOKEN) {
        return Some((StatusCode::UNAUTHORIZED, "invalid token").into_response());
    }
    if table != TABLE_ID || query.get("viewId").map(String::as_str) != Some(VIEW_ID) {
        return Some((StatusCode::NOT_FOUND, "unknown table or view").into_response());
    }
    if let Some((status, body)) = &state.failure {
        let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Some((status, body.clone()).into_response());
    }
    None
}

async fn list_records(
    State(state): State<Arc<MockState>>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(response) = check_request(&state, &headers, &table, &query) {
        return response;
    }
    let records = state.records.lock().expect("lock").clone();
    Json(json!({ "list": records, "pageInfo": { "isLastPage": true } })).into_response()
}

async fn create_record(
    State(state): State<Arc<MockState>>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    if let Some(response) = check_request(&state, &headers, &table, &query) {
        return response;
    }
    let id = {
        let mut created = state.created.lock().expect("lock");
        created.push(payload.clone());
        state.records.lock().expect("lock").push(payload);
        created.len()
    };
    Json(json!({ "Id": id })).into_response()
}
