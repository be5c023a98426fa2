//! Module registry over HTTP, plus the catalog-first registry the CLI uses.

use std::sync::Arc;

use async_trait::async_trait;
use cms_admin_core::error::ApiError;
use cms_admin_core::module::ModuleDefinition;
use cms_admin_core::traits::ModuleRegistry;
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog;
use crate::http::ApiClient;

/// Path of the registry endpoint.
pub const MODULES_PATH: &str = "/modules";

/// Reads dynamically defined modules from `GET /modules`.
#[derive(Debug, Clone)]
pub struct ModuleRegistryClient {
    api: ApiClient,
}

impl ModuleRegistryClient {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ModuleRegistry for ModuleRegistryClient {
    async fn list_modules(&self) -> Result<Vec<ModuleDefinition>, ApiError> {
        let items = match self.api.get_json(MODULES_PATH).await? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            _ => return Err(ApiError::Decode("expected a list of modules".into())),
        };
        let modules = items
            .into_iter()
            .map(serde_json::from_value::<ModuleDefinition>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ApiError::Decode(format!("invalid module definition: {err}")))?;
        debug!(count = modules.len(), "modules loaded");
        Ok(modules)
    }
}

/// Built-in entities first, then whatever the remote registry returns.
///
/// A failing remote registry leaves only the built-ins.
pub struct CatalogRegistry {
    remote: Option<Arc<dyn ModuleRegistry>>,
}

impl CatalogRegistry {
    #[must_use]
    pub fn new(remote: Option<Arc<dyn ModuleRegistry>>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl ModuleRegistry for CatalogRegistry {
    async fn list_modules(&self) -> Result<Vec<ModuleDefinition>, ApiError> {
        let mut modules = catalog::builtin_modules();
        if let Some(remote) = &self.remote {
            match remote.list_modules().await {
                Ok(dynamic) => modules.extend(dynamic),
                Err(ApiError::Unauthorized { redirect }) => {
                    return Err(ApiError::Unauthorized { redirect });
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        "module registry unavailable, using built-in entities only"
                    );
                }
            }
        }
        Ok(modules)
    }
}
