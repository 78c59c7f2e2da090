//! In-process fake of the platform's v2 API for CLI tests.
//!
//! Presets whose name starts with "Fail" produce jobs that end in
//! Error/Error; "Slow" presets stay Active forever; everything else
//! completes with Pass on the first lookup.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

pub const API_KEY: &str = "test-api-key";

#[derive(Default)]
struct FakeState {
    assets: HashSet<String>,
    presets: HashSet<String>,
    /// Job id -> preset name.
    jobs: HashMap<String, String>,
    /// Every request body posted to /jobs.
    submissions: Vec<Value>,
}

type Shared = Arc<Mutex<FakeState>>;

/// A running fake platform.
pub struct FakePlatform {
    pub addr: SocketAddr,
    state: Shared,
}

impl FakePlatform {
    pub async fn start(assets: &[&str], presets: &[&str]) -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState {
            assets: assets.iter().map(|s| s.to_string()).collect(),
            presets: presets.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }));

        let router = Router::new()
            .route("/api/v2/assets", get(lookup_asset))
            .route("/api/v2/presets", get(lookup_preset))
            .route("/api/v2/jobs", post(create_job))
            .route("/api/v2/jobs/{id}", get(get_job))
            .route("/api/v2/jobs/{id}/artifacts/error", get(get_job_error))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake platform");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self { addr, state }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/api/v2", self.addr)
    }

    pub fn submissions(&self) -> Vec<Value> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// TOML config pointing at this fake with near-zero poll waits.
    pub fn config_toml(&self, tests: &[(&str, bool)]) -> String {
        let mut toml = format!(
            r#"
default_test_asset = "test_movie_1"

[service]
hostname = "localhost"
api_key = "{}"
base_url = "{}"

[polling]
job_lookup_tries = 3
job_lookup_secs = 0
"#,
            API_KEY,
            self.endpoint()
        );
        for (name, enabled) in tests {
            toml.push_str(&format!(
                "\n[[tests]]\nname = \"{}\"\nenabled = {}\n",
                name, enabled
            ));
        }
        toml
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", API_KEY))
}

fn requested_name(query: &HashMap<String, String>) -> String {
    query
        .get("filter")
        .and_then(|f| f.strip_prefix("name="))
        .unwrap_or_default()
        .to_string()
}

fn lookup_response(found: bool, name: &str) -> Json<Value> {
    if found {
        Json(json!({ "data": [{ "id": "1", "attributes": { "name": name } }] }))
    } else {
        Json(json!({ "data": [] }))
    }
}

async fn lookup_asset(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let name = requested_name(&query);
    let found = state.lock().unwrap().assets.contains(&name);
    lookup_response(found, &name).into_response()
}

async fn lookup_preset(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let name = requested_name(&query);
    let found = state.lock().unwrap().presets.contains(&name);
    lookup_response(found, &name).into_response()
}

async fn create_job(State(state): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let Ok(payload) = serde_json::from_slice::<Value>(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let preset = payload["data"]["relationships"]["preset"]["data"]["attributes"]["name"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let mut state = state.lock().unwrap();
    state.submissions.push(payload);
    if !state.presets.contains(&preset) {
        return (StatusCode::UNPROCESSABLE_ENTITY, "unknown preset").into_response();
    }

    let id = Uuid::new_v4().to_string();
    state.jobs.insert(id.clone(), preset);
    (
        StatusCode::CREATED,
        Json(json!({ "data": { "id": id, "attributes": { "status": "Queued", "result": null } } })),
    )
        .into_response()
}

async fn get_job(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let Some(preset) = state.lock().unwrap().jobs.get(&id).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let attributes = if preset.starts_with("Fail") {
        json!({ "status": "Error", "result": "Error" })
    } else if preset.starts_with("Slow") {
        json!({ "status": "Active", "result": null })
    } else {
        json!({ "status": "Complete", "result": "Pass" })
    };
    Json(json!({ "data": { "id": id, "attributes": attributes } })).into_response()
}

async fn get_job_error(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    if !state.lock().unwrap().jobs.contains_key(&id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    "Timeout on step 3\nDetails: encoder stalled".into_response()
}
