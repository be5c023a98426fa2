//! One configured connection to the CMS backend.

use std::sync::Arc;

use cms_admin_core::context::EngineContext;
use cms_admin_core::error::ApiError;
use cms_admin_core::notify::Notifier;
use cms_admin_core::traits::ModuleRegistry;

use crate::config::ClientConfig;
use crate::http::ApiClient;
use crate::modules::{CatalogRegistry, ModuleRegistryClient};
use crate::resource::RestClientFactory;
use crate::token::TokenStore;

/// Transport, token store, and the collaborators the engines need.
#[derive(Debug, Clone)]
pub struct AdminClient {
    api: ApiClient,
}

impl AdminClient {
    /// Opens the token file and builds the transport.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let tokens = Arc::new(TokenStore::open(&config.token_file));
        Self::with_tokens(config, tokens)
    }

    /// Builds the transport around an existing token store.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn with_tokens(config: ClientConfig, tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        Ok(Self {
            api: ApiClient::new(Arc::new(config), tokens)?,
        })
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn clients(&self) -> RestClientFactory {
        RestClientFactory::new(self.api.clone())
    }

    /// Built-in catalog backed by the remote module registry.
    #[must_use]
    pub fn registry(&self) -> CatalogRegistry {
        let remote: Arc<dyn ModuleRegistry> = Arc::new(ModuleRegistryClient::new(self.api.clone()));
        CatalogRegistry::new(Some(remote))
    }

    /// Engine context reporting through `notifier`, resolving files against storage.
    #[must_use]
    pub fn engine_context(&self, notifier: Arc<dyn Notifier>) -> EngineContext {
        EngineContext::new(notifier, self.api.config().storage_base_url.clone())
    }
}
