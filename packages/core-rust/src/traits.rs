use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;
use crate::module::ModuleDefinition;
use crate::payload::FormPayload;

/// CRUD access to one backend resource.
///
/// Implementations: the REST client over HTTP, in-memory fakes in tests.
/// Entities travel as raw JSON objects; the codec interprets them.
#[async_trait]
pub trait EntityClient: Send + Sync {
    /// Resource slug used in routes (e.g., `"news"`).
    fn resource(&self) -> &str;

    /// Fetch the full collection. No server-side pagination is assumed.
    async fn get_items(&self) -> Result<Vec<Value>, ApiError>;

    /// Fetch one entity by id.
    async fn get_item(&self, id: &str) -> Result<Value, ApiError>;

    /// Create an entity from a multipart payload; returns the stored entity.
    async fn create_item(&self, payload: FormPayload) -> Result<Value, ApiError>;

    /// Replace an entity from a multipart payload; returns the stored entity.
    async fn update_item(&self, id: &str, payload: FormPayload) -> Result<Value, ApiError>;

    /// Delete one entity.
    async fn delete_item(&self, id: &str) -> Result<(), ApiError>;
}

/// Source of dynamically defined modules.
#[async_trait]
pub trait ModuleRegistry: Send + Sync {
    /// List every module the backend knows about.
    async fn list_modules(&self) -> Result<Vec<ModuleDefinition>, ApiError>;
}

/// Builds CRUD clients for a module's route.
pub trait ClientFactory: Send + Sync {
    fn client_for(&self, resource: &str) -> Arc<dyn EntityClient>;
}
