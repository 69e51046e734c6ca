//! In-process stand-in for the function gateway, served by axum on a random port.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

// base64("admin:secret")
const EXPECTED_AUTH: &str = "Basic YWRtaW46c2VjcmV0";

#[derive(Clone)]
pub struct MockGateway {
    pub namespaces: Vec<String>,
    pub require_auth: bool,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            namespaces: vec!["openfaas-fn".to_string(), "custom".to_string()],
            require_auth: false,
        }
    }
}

impl MockGateway {
    fn authorised(&self, headers: &HeaderMap) -> bool {
        !self.require_auth
            || headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == EXPECTED_AUTH)
    }
}

/// Start the mock gateway and return its base URL.
pub async fn spawn_gateway(gateway: MockGateway) -> String {
    let app = Router::new()
        .route("/system/namespaces", get(namespaces))
        .route("/system/functions", get(functions))
        .route("/function/{name}", post(invoke_sync))
        .route("/async-function/{name}", post(invoke_async))
        .with_state(Arc::new(gateway));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A URL nothing listens on.
pub fn unreachable_url() -> String {
    "http://127.0.0.1:1".to_string()
}

async fn namespaces(State(gw): State<Arc<MockGateway>>, headers: HeaderMap) -> Response {
    if !gw.authorised(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(gw.namespaces.clone()).into_response()
}

async fn functions(
    State(gw): State<Arc<MockGateway>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !gw.authorised(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let body = match query.get("namespace").map(String::as_str) {
        None => json!([{ "name": "no-namespace", "annotations": {} }]),
        Some("openfaas-fn") => json!([
            {
                "name": "nightly",
                "namespace": "openfaas-fn",
                "replicas": 1,
                "annotations": { "topic": "cron-function", "schedule": "0 2 * * *" }
            },
            { "name": "plain", "namespace": "openfaas-fn" }
        ]),
        Some(_) => json!([]),
    };
    Json(body).into_response()
}

/// Echoes the request's connector headers back so tests can inspect them.
async fn invoke_sync(Path(name): Path<String>, headers: HeaderMap) -> Response {
    let echo = |key: &str| {
        headers
            .get(key)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    (
        [
            ("x-echo-topic", echo("x-topic")),
            ("x-echo-connector", echo("x-connector")),
            ("x-echo-content-type", echo("content-type")),
        ],
        format!("invoked {name}"),
    )
        .into_response()
}

async fn invoke_async(Path(name): Path<String>) -> Response {
    (StatusCode::ACCEPTED, format!("queued {name}")).into_response()
}
