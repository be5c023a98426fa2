//! In-memory collaborators for engine tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::context::EngineContext;
use crate::error::ApiError;
use crate::notify::NotificationLog;
use crate::payload::{FormPayload, PartValue};
use crate::preview::BlobUrlRegistry;
use crate::record::FixedClock;
use crate::traits::EntityClient;

/// A call observed by [`MemoryClient`].
#[derive(Debug, Clone)]
pub enum Call {
    GetItems,
    GetItem(String),
    Create(FormPayload),
    Update(String, FormPayload),
    Delete(String),
}

/// Entity store backed by a map, applying text parts as field values.
#[derive(Default)]
pub struct MemoryClient {
    resource: String,
    items: Mutex<BTreeMap<u64, Value>>,
    next_id: Mutex<u64>,
    calls: Mutex<Vec<Call>>,
    fail_get_items: Mutex<Option<ApiError>>,
    fail_get_item: Mutex<Option<ApiError>>,
    fail_writes: Mutex<Option<ApiError>>,
    fail_delete: Mutex<BTreeSet<String>>,
}

impl MemoryClient {
    pub fn new(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            next_id: Mutex::new(1),
            ..Self::default()
        }
    }

    /// Seeds an entity, assigning the next id.
    pub fn seed(&self, mut entity: Value) -> String {
        let mut next = self.next_id.lock();
        let id = *next;
        *next += 1;
        entity["id"] = json!(id);
        self.items.lock().insert(id, entity);
        id.to_string()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn writes(&self) -> Vec<FormPayload> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create(payload) | Call::Update(_, payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn item(&self, id: &str) -> Option<Value> {
        let id: u64 = id.parse().ok()?;
        self.items.lock().get(&id).cloned()
    }

    pub fn fail_get_items(&self, err: Option<ApiError>) {
        *self.fail_get_items.lock() = err;
    }

    pub fn fail_get_item(&self, err: ApiError) {
        *self.fail_get_item.lock() = Some(err);
    }

    pub fn fail_writes(&self, err: Option<ApiError>) {
        *self.fail_writes.lock() = err;
    }

    pub fn fail_delete_of(&self, id: &str) {
        self.fail_delete.lock().insert(id.to_string());
    }

    fn apply(entity: &mut Value, payload: &FormPayload) {
        for part in payload.parts() {
            match &part.value {
                PartValue::Text(text) => {
                    if let Some(field) = part.name.strip_prefix("remove_") {
                        entity[field] = Value::Null;
                    } else if part.name != "_method" {
                        entity[&part.name] = json!(text);
                    }
                }
                PartValue::File(upload) => {
                    entity[&part.name] = json!(format!("uploads/{}", upload.file_name));
                }
            }
        }
    }

    fn not_found() -> ApiError {
        ApiError::Status {
            status: 404,
            message: "Not found".into(),
        }
    }
}

#[async_trait]
impl EntityClient for MemoryClient {
    fn resource(&self) -> &str {
        &self.resource
    }

    async fn get_items(&self) -> Result<Vec<Value>, ApiError> {
        self.calls.lock().push(Call::GetItems);
        if let Some(err) = self.fail_get_items.lock().clone() {
            return Err(err);
        }
        Ok(self.items.lock().values().cloned().collect())
    }

    async fn get_item(&self, id: &str) -> Result<Value, ApiError> {
        self.calls.lock().push(Call::GetItem(id.to_string()));
        if let Some(err) = self.fail_get_item.lock().clone() {
            return Err(err);
        }
        self.item(id).ok_or_else(Self::not_found)
    }

    async fn create_item(&self, payload: FormPayload) -> Result<Value, ApiError> {
        self.calls.lock().push(Call::Create(payload.clone()));
        if let Some(err) = self.fail_writes.lock().clone() {
            return Err(err);
        }
        let mut entity = json!({});
        Self::apply(&mut entity, &payload);
        let id = self.seed(entity);
        self.item(&id).ok_or_else(Self::not_found)
    }

    async fn update_item(&self, id: &str, payload: FormPayload) -> Result<Value, ApiError> {
        self.calls.lock().push(Call::Update(id.to_string(), payload.clone()));
        if let Some(err) = self.fail_writes.lock().clone() {
            return Err(err);
        }
        let key: u64 = id.parse().map_err(|_| Self::not_found())?;
        let mut items = self.items.lock();
        let entity = items.get_mut(&key).ok_or_else(Self::not_found)?;
        Self::apply(entity, &payload);
        Ok(entity.clone())
    }

    async fn delete_item(&self, id: &str) -> Result<(), ApiError> {
        self.calls.lock().push(Call::Delete(id.to_string()));
        if self.fail_delete.lock().contains(id) {
            return Err(ApiError::Status {
                status: 500,
                message: "delete failed".into(),
            });
        }
        let key: u64 = id.parse().map_err(|_| Self::not_found())?;
        self.items
            .lock()
            .remove(&key)
            .map(|_| ())
            .ok_or_else(Self::not_found)
    }
}

/// Context wired to in-memory collaborators.
pub struct Harness {
    pub ctx: EngineContext,
    pub log: Arc<NotificationLog>,
    pub urls: Arc<BlobUrlRegistry>,
}

impl Harness {
    pub fn new() -> Self {
        let log = Arc::new(NotificationLog::new());
        let urls = Arc::new(BlobUrlRegistry::new("http://admin.test"));
        let ctx = EngineContext::new(log.clone(), "https://cdn.test/storage")
            .with_object_urls(urls.clone())
            .with_clock(Arc::new(FixedClock(
                NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date"),
            )));
        Self { ctx, log, urls }
    }
}
