//! In-process fake of the CMS REST backend.
//!
//! Serves `/api/{resource}` CRUD over multipart, `/api/modules`, and a public
//! `/api/login` that always rejects. Every request is captured for assertions.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cms_admin_client::ClientConfig;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

pub const TOKEN: &str = "secret-token";

/// Title the backend refuses with a 422.
pub const TAKEN_TITLE: &str = "taken";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedPart {
    Text(String),
    File {
        file_name: String,
        content_type: String,
        len: usize,
    },
}

#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub parts: Vec<(String, CapturedPart)>,
}

impl Captured {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|(key, part)| match part {
            CapturedPart::Text(text) if key == name => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|(key, part)| match part {
                CapturedPart::Text(text) if key == name => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn file(&self, name: &str) -> Option<&CapturedPart> {
        self.parts
            .iter()
            .find(|(key, part)| key == name && matches!(part, CapturedPart::File { .. }))
            .map(|(_, part)| part)
    }

    pub fn has(&self, name: &str) -> bool {
        self.parts.iter().any(|(key, _)| key == name)
    }
}

#[derive(Default)]
struct BackendState {
    resources: BTreeMap<String, BTreeMap<String, Value>>,
    next_id: u64,
    requests: Vec<Captured>,
    failing_deletes: BTreeSet<String>,
    modules: Vec<Value>,
}

type Shared = Arc<Mutex<BackendState>>;

pub struct FakeBackend {
    pub base_url: String,
    state: Shared,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState {
            next_id: 1,
            ..BackendState::default()
        }));
        let app = Router::new()
            .route("/api/login", post(login))
            .route("/api/modules", get(modules))
            .route("/api/{resource}", get(list).post(create))
            .route("/api/{resource}/{id}", get(show).post(update).delete(destroy))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Client configuration pointing at this backend.
    pub fn config(&self, token_file: &Path) -> ClientConfig {
        ClientConfig {
            api_base_url: format!("{}/api", self.base_url),
            storage_base_url: format!("{}/storage", self.base_url),
            token_file: token_file.to_path_buf(),
            request_timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        }
    }

    /// Stores `item` under its `id`.
    pub fn seed(&self, resource: &str, item: Value) {
        let id = item["id"].to_string().trim_matches('"').to_string();
        let mut state = self.state.lock();
        state.resources.entry(resource.to_string()).or_default().insert(id, item);
    }

    pub fn item(&self, resource: &str, id: &str) -> Option<Value> {
        self.state.lock().resources.get(resource)?.get(id).cloned()
    }

    pub fn count(&self, resource: &str) -> usize {
        self.state.lock().resources.get(resource).map_or(0, BTreeMap::len)
    }

    pub fn fail_delete(&self, id: &str) {
        self.state.lock().failing_deletes.insert(id.to_string());
    }

    pub fn add_module(&self, module: Value) {
        self.state.lock().modules.push(module);
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.state.lock().requests.clone()
    }

    pub fn last_request(&self) -> Captured {
        self.state.lock().requests.last().cloned().unwrap()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn capture(
    state: &Shared,
    method: Method,
    path: String,
    headers: &HeaderMap,
    parts: Vec<(String, CapturedPart)>,
) {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.lock().requests.push(Captured {
        method,
        path,
        authorization,
        parts,
    });
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TOKEN}"))
}

fn unauthenticated() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthenticated." }))).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Record not found." }))).into_response()
}

async fn read_parts(mut multipart: Multipart) -> Vec<(String, CapturedPart)> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.unwrap();
                parts.push((
                    name,
                    CapturedPart::File {
                        file_name,
                        content_type,
                        len: bytes.len(),
                    },
                ));
            }
            None => parts.push((name, CapturedPart::Text(field.text().await.unwrap()))),
        }
    }
    parts
}

/// Applies multipart parts to `item` the way a typical CMS backend would.
fn apply_parts(resource: &str, item: &mut Map<String, Value>, parts: &[(String, CapturedPart)]) {
    for (name, part) in parts {
        if name == "_method" {
            continue;
        }
        if let Some(field) = name.strip_prefix("remove_") {
            item.insert(field.to_string(), Value::Null);
            continue;
        }
        let value = match part {
            CapturedPart::Text(text) => Value::String(text.clone()),
            CapturedPart::File { file_name, .. } => {
                Value::String(format!("{resource}/{file_name}"))
            }
        };
        item.insert(name.clone(), value);
    }
}

async fn login(State(state): State<Shared>, headers: HeaderMap, multipart: Multipart) -> Response {
    let parts = read_parts(multipart).await;
    capture(&state, Method::POST, "/api/login".into(), &headers, parts);
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials." }))).into_response()
}

async fn modules(State(state): State<Shared>, headers: HeaderMap) -> Response {
    capture(&state, Method::GET, "/api/modules".into(), &headers, Vec::new());
    if !authorized(&headers) {
        return unauthenticated();
    }
    let modules = state.lock().modules.clone();
    Json(Value::Array(modules)).into_response()
}

async fn list(
    State(state): State<Shared>,
    UrlPath(resource): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    capture(&state, Method::GET, format!("/api/{resource}"), &headers, Vec::new());
    if !authorized(&headers) {
        return unauthenticated();
    }
    let items: Vec<Value> = state
        .lock()
        .resources
        .get(&resource)
        .map(|items| items.values().cloned().collect())
        .unwrap_or_default();
    Json(json!({ "data": items })).into_response()
}

async fn show(
    State(state): State<Shared>,
    UrlPath((resource, id)): UrlPath<(String, String)>,
    headers: HeaderMap,
) -> Response {
    capture(&state, Method::GET, format!("/api/{resource}/{id}"), &headers, Vec::new());
    if !authorized(&headers) {
        return unauthenticated();
    }
    let item = state
        .lock()
        .resources
        .get(&resource)
        .and_then(|items| items.get(&id).cloned());
    match item {
        Some(item) => Json(json!({ "data": item })).into_response(),
        None => not_found(),
    }
}

async fn create(
    State(state): State<Shared>,
    UrlPath(resource): UrlPath<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let parts = read_parts(multipart).await;
    capture(&state, Method::POST, format!("/api/{resource}"), &headers, parts.clone());
    if !authorized(&headers) {
        return unauthenticated();
    }
    if parts
        .iter()
        .any(|(name, part)| name == "title" && *part == CapturedPart::Text(TAKEN_TITLE.into()))
    {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "The title has already been taken.",
                "errors": { "title": ["The title has already been taken."] }
            })),
        )
            .into_response();
    }

    let mut state = state.lock();
    let id = state.next_id;
    state.next_id += 1;
    let mut item = Map::new();
    item.insert("id".into(), json!(id));
    apply_parts(&resource, &mut item, &parts);
    let item = Value::Object(item);
    state
        .resources
        .entry(resource)
        .or_default()
        .insert(id.to_string(), item.clone());
    (StatusCode::CREATED, Json(json!({ "data": item }))).into_response()
}

async fn update(
    State(state): State<Shared>,
    UrlPath((resource, id)): UrlPath<(String, String)>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let parts = read_parts(multipart).await;
    capture(&state, Method::POST, format!("/api/{resource}/{id}"), &headers, parts.clone());
    if !authorized(&headers) {
        return unauthenticated();
    }
    let overridden = parts
        .iter()
        .any(|(name, part)| name == "_method" && *part == CapturedPart::Text("PUT".into()));
    if !overridden {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "message": "POST is not supported for this route." })),
        )
            .into_response();
    }

    let mut state = state.lock();
    let Some(Value::Object(item)) = state
        .resources
        .get_mut(&resource)
        .and_then(|items| items.get_mut(&id))
    else {
        return not_found();
    };
    apply_parts(&resource, item, &parts);
    Json(json!({ "data": item.clone() })).into_response()
}

async fn destroy(
    State(state): State<Shared>,
    UrlPath((resource, id)): UrlPath<(String, String)>,
    headers: HeaderMap,
) -> Response {
    capture(&state, Method::DELETE, format!("/api/{resource}/{id}"), &headers, Vec::new());
    if !authorized(&headers) {
        return unauthenticated();
    }
    let mut state = state.lock();
    if state.failing_deletes.contains(&id) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Could not delete record." })),
        )
            .into_response();
    }
    match state.resources.get_mut(&resource).and_then(|items| items.remove(&id)) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(),
    }
}
