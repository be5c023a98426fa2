//! REST implementation of [`EntityClient`] for one resource route.

use std::sync::Arc;

use async_trait::async_trait;
use cms_admin_core::error::ApiError;
use cms_admin_core::field::METHOD_OVERRIDE_FIELD;
use cms_admin_core::payload::FormPayload;
use cms_admin_core::traits::{ClientFactory, EntityClient};
use serde_json::Value;
use tracing::info;

use crate::http::ApiClient;

/// CRUD client scoped to `/<resource>`.
#[derive(Debug, Clone)]
pub struct RestEntityClient {
    api: ApiClient,
    resource: String,
}

impl RestEntityClient {
    #[must_use]
    pub fn new(api: ApiClient, resource: impl Into<String>) -> Self {
        Self {
            api,
            resource: resource.into().trim_matches('/').to_string(),
        }
    }

    fn collection_path(&self) -> String {
        format!("/{}", self.resource)
    }

    fn item_path(&self, id: &str) -> String {
        format!("/{}/{id}", self.resource)
    }
}

#[async_trait]
impl EntityClient for RestEntityClient {
    fn resource(&self) -> &str {
        &self.resource
    }

    async fn get_items(&self) -> Result<Vec<Value>, ApiError> {
        match self.api.get_json(&self.collection_path()).await? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(ApiError::Decode(format!(
                "expected a list of {}, got {}",
                self.resource,
                kind(&other)
            ))),
        }
    }

    async fn get_item(&self, id: &str) -> Result<Value, ApiError> {
        match self.api.get_json(&self.item_path(id)).await? {
            item @ Value::Object(_) => Ok(item),
            other => Err(ApiError::Decode(format!(
                "expected a {} object, got {}",
                self.resource,
                kind(&other)
            ))),
        }
    }

    async fn create_item(&self, payload: FormPayload) -> Result<Value, ApiError> {
        let created = self.api.post_multipart(&self.collection_path(), payload).await?;
        info!(resource = %self.resource, "created");
        Ok(created)
    }

    /// Sent as `POST` with `_method=PUT`, since multipart bodies only travel on `POST`.
    async fn update_item(&self, id: &str, mut payload: FormPayload) -> Result<Value, ApiError> {
        payload.append_text(METHOD_OVERRIDE_FIELD, "PUT");
        let updated = self.api.post_multipart(&self.item_path(id), payload).await?;
        info!(resource = %self.resource, id, "updated");
        Ok(updated)
    }

    async fn delete_item(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete(&self.item_path(id)).await?;
        info!(resource = %self.resource, id, "deleted");
        Ok(())
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Hands out [`RestEntityClient`]s sharing one transport.
#[derive(Debug, Clone)]
pub struct RestClientFactory {
    api: ApiClient,
}

impl RestClientFactory {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl ClientFactory for RestClientFactory {
    fn client_for(&self, resource: &str) -> Arc<dyn EntityClient> {
        Arc::new(RestEntityClient::new(self.api.clone(), resource))
    }
}
