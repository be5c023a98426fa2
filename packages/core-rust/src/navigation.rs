//! Navigation targets returned by the engines.

use serde::Serialize;

/// Where the UI should go after an engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Route {
    List { resource: String },
    Create { resource: String },
    Edit { resource: String, id: String },
    Login,
}

impl Route {
    /// URL path of the route.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::List { resource } => format!("/{resource}"),
            Self::Create { resource } => format!("/{resource}/create"),
            Self::Edit { resource, id } => format!("/{resource}/{id}/edit"),
            Self::Login => "/login".to_string(),
        }
    }
}
