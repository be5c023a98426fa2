//! `cms-admin-client` -- REST transport, token store, module registry, and CLI
//! for the CMS admin engines in `cms-admin-core`.

pub mod admin;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod http;
pub mod modules;
pub mod notify;
pub mod resource;
pub mod token;

pub use admin::AdminClient;
pub use config::{ClientConfig, ConfigError};
pub use http::ApiClient;
pub use modules::{CatalogRegistry, ModuleRegistryClient};
pub use notify::TracingNotifier;
pub use resource::{RestClientFactory, RestEntityClient};
pub use token::TokenStore;
