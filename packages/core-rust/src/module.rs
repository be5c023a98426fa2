//! Module resolution: URL path segment to descriptors plus a scoped client.
//!
//! Dynamically defined modules come from a registry endpoint. A path segment
//! matches a module by slug or table name, ignoring case; the matched module's
//! descriptors then mount the shared form or list engine.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::context::EngineContext;
use crate::error::{ApiError, ModuleError};
use crate::field::{validate_descriptors, FieldDescriptor};
use crate::form::{FormEngine, FormMode};
use crate::gallery::RecordLayout;
use crate::list::ListEngine;
use crate::traits::{ClientFactory, EntityClient, ModuleRegistry};

/// One dynamically defined module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub table_name: Option<String>,
    /// Accepts an array or a JSON-encoded array string.
    #[serde(default, deserialize_with = "fields_from_array_or_string")]
    pub fields: Vec<FieldDescriptor>,
    /// Nested data stored beside the descriptors.
    #[serde(default)]
    pub layout: RecordLayout,
}

impl ModuleDefinition {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            table_name: None,
            fields,
            layout: RecordLayout::Flat,
        }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: RecordLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Route segment the CRUD client is scoped to.
    ///
    /// Falls back to the table name, then to the name in kebab case.
    #[must_use]
    pub fn route(&self) -> String {
        if !self.slug.trim().is_empty() {
            return self.slug.trim().to_string();
        }
        if let Some(table) = self.table_name.as_deref().filter(|t| !t.trim().is_empty()) {
            return table.trim().to_string();
        }
        self.name
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Whether `segment` names this module.
    #[must_use]
    pub fn matches(&self, segment: &str) -> bool {
        let segment = segment.trim().trim_matches('/');
        if segment.is_empty() {
            return false;
        }
        [Some(self.slug.as_str()), self.table_name.as_deref()]
            .into_iter()
            .flatten()
            .any(|key| !key.is_empty() && key.eq_ignore_ascii_case(segment))
            || self.route().eq_ignore_ascii_case(segment)
    }
}

fn fields_from_array_or_string<'de, D>(deserializer: D) -> Result<Vec<FieldDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(text) if text.trim().is_empty() => Ok(Vec::new()),
        Value::String(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

/// Finds the module named by `segment`.
///
/// # Errors
///
/// Returns [`ModuleError::NotFound`] when nothing matches.
pub fn resolve<'a>(
    modules: &'a [ModuleDefinition],
    segment: &str,
) -> Result<&'a ModuleDefinition, ModuleError> {
    modules
        .iter()
        .find(|module| module.matches(segment))
        .ok_or_else(|| ModuleError::NotFound {
            segment: segment.to_string(),
        })
}

/// What to mount for a resolved module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleAction {
    List,
    Create,
    Edit(String),
}

/// A mounted engine for a resolved module.
#[derive(Debug)]
pub enum ModuleView {
    List(ListEngine),
    Form(FormEngine),
}

/// Fetches the registry, resolves `segment`, and mounts the engine for `action`.
///
/// # Errors
///
/// - [`ModuleError::Api`] when the registry cannot be fetched.
/// - [`ModuleError::NotFound`] for an unknown segment.
/// - [`ModuleError::InvalidFields`] when the module's descriptors are invalid.
/// - [`ModuleError::Form`] / [`ModuleError::List`] when mounting fails.
pub async fn mount_module(
    registry: &dyn ModuleRegistry,
    clients: &dyn ClientFactory,
    ctx: EngineContext,
    segment: &str,
    action: ModuleAction,
) -> Result<ModuleView, ModuleError> {
    let modules = registry.list_modules().await?;
    let module = resolve(&modules, segment)?;
    validate_descriptors(&module.fields).map_err(|source| ModuleError::InvalidFields {
        module: module.name.clone(),
        source,
    })?;

    let route = module.route();
    debug!(segment, module = %module.name, route = %route, ?action, "module resolved");
    let client = clients.client_for(&route);
    let fields = module.fields.clone();
    let layout = module.layout;

    Ok(match action {
        ModuleAction::List => {
            ModuleView::List(ListEngine::mount_with_layout(ctx, client, fields, layout).await?)
        }
        ModuleAction::Create => ModuleView::Form(
            FormEngine::mount_with_layout(ctx, client, fields, FormMode::Create, layout).await?,
        ),
        ModuleAction::Edit(id) => ModuleView::Form(
            FormEngine::mount_with_layout(ctx, client, fields, FormMode::Edit { id }, layout)
                .await?,
        ),
    })
}

/// Registry backed by a fixed module list.
#[derive(Debug, Clone, Default)]
pub struct StaticModules(pub Vec<ModuleDefinition>);

#[async_trait]
impl ModuleRegistry for StaticModules {
    async fn list_modules(&self) -> Result<Vec<ModuleDefinition>, ApiError> {
        Ok(self.0.clone())
    }
}

/// Factory that hands out clients from a closure.
pub struct FnClientFactory<F>(pub F);

impl<F> ClientFactory for FnClientFactory<F>
where
    F: Fn(&str) -> Arc<dyn EntityClient> + Send + Sync,
{
    fn client_for(&self, resource: &str) -> Arc<dyn EntityClient> {
        (self.0)(resource)
    }
}
