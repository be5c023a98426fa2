use std::sync::Arc;

use crate::notify::Notifier;
use crate::preview::{DataUrlFactory, ObjectUrlFactory};
use crate::record::{Clock, SystemClock};

/// UI-side collaborators shared by every engine instance.
///
/// Carries no per-form state; cloning is cheap and engines each hold a copy.
#[derive(Clone)]
pub struct EngineContext {
    /// Receives success/error notifications.
    pub notifier: Arc<dyn Notifier>,
    /// Creates and revokes preview URLs for chosen files.
    pub object_urls: Arc<dyn ObjectUrlFactory>,
    /// Source of "today" for date defaults.
    pub clock: Arc<dyn Clock>,
    /// Base URL that backend-relative file paths resolve against.
    pub storage_base_url: String,
}

impl EngineContext {
    /// Context with a data-URL preview factory and the system clock.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, storage_base_url: impl Into<String>) -> Self {
        Self {
            notifier,
            object_urls: Arc::new(DataUrlFactory),
            clock: Arc::new(SystemClock),
            storage_base_url: storage_base_url.into(),
        }
    }

    #[must_use]
    pub fn with_object_urls(mut self, object_urls: Arc<dyn ObjectUrlFactory>) -> Self {
        self.object_urls = object_urls;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("storage_base_url", &self.storage_base_url)
            .finish_non_exhaustive()
    }
}
