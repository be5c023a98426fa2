//! File preview side table and scoped object-URL leases.
//!
//! Every preview for a locally chosen file is an [`ObjectUrl`] lease. The lease
//! revokes its URL when dropped, so replacing, removing, or tearing down a
//! preview releases the URL exactly once without any caller bookkeeping. The
//! lease is deliberately not `Clone`.
//!
//! # Factories
//!
//! - [`DataUrlFactory`] renders inline `data:` URLs; revocation is a no-op.
//! - [`BlobUrlRegistry`] mints opaque `blob:` URLs and tracks which are live,
//!   which lets tests and long-lived sessions observe leaks.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::value::FileUpload;

// ---------------------------------------------------------------------------
// ObjectUrlFactory
// ---------------------------------------------------------------------------

/// Creates and revokes preview URLs for locally chosen files.
pub trait ObjectUrlFactory: Send + Sync {
    /// Creates a URL rendering `upload`.
    fn create(&self, upload: &FileUpload) -> String;

    /// Releases a URL previously returned by `create`.
    fn revoke(&self, url: &str);
}

/// Inline `data:` URL previews.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlFactory;

impl ObjectUrlFactory for DataUrlFactory {
    fn create(&self, upload: &FileUpload) -> String {
        upload.to_data_url()
    }

    fn revoke(&self, _url: &str) {}
}

/// `blob:` URL previews with live-set tracking.
#[derive(Debug)]
pub struct BlobUrlRegistry {
    origin: String,
    live: Mutex<HashSet<String>>,
    revoked: AtomicU64,
    double_revokes: AtomicU64,
}

impl BlobUrlRegistry {
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            live: Mutex::new(HashSet::new()),
            revoked: AtomicU64::new(0),
            double_revokes: AtomicU64::new(0),
        }
    }

    /// Number of URLs created and not yet revoked.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    /// Whether `url` is currently live.
    #[must_use]
    pub fn is_live(&self, url: &str) -> bool {
        self.live.lock().contains(url)
    }

    /// Total successful revocations.
    #[must_use]
    pub fn revoked_count(&self) -> u64 {
        self.revoked.load(Ordering::Relaxed)
    }

    /// Revocations of URLs that were not live.
    #[must_use]
    pub fn double_revoke_count(&self) -> u64 {
        self.double_revokes.load(Ordering::Relaxed)
    }
}

impl Default for BlobUrlRegistry {
    fn default() -> Self {
        Self::new("null")
    }
}

impl ObjectUrlFactory for BlobUrlRegistry {
    fn create(&self, upload: &FileUpload) -> String {
        let url = format!("blob:{}/{}", self.origin, uuid::Uuid::new_v4());
        debug!(url = %url, file = %upload.file_name, "object url created");
        self.live.lock().insert(url.clone());
        url
    }

    fn revoke(&self, url: &str) {
        if self.live.lock().remove(url) {
            self.revoked.fetch_add(1, Ordering::Relaxed);
            debug!(url = %url, "object url revoked");
        } else {
            self.double_revokes.fetch_add(1, Ordering::Relaxed);
            warn!(url = %url, "revoke of an object url that is not live");
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectUrl lease
// ---------------------------------------------------------------------------

/// Scoped preview URL, revoked exactly once when dropped.
pub struct ObjectUrl {
    url: String,
    factory: Arc<dyn ObjectUrlFactory>,
}

impl ObjectUrl {
    /// Acquires a URL for `upload` from `factory`.
    #[must_use]
    pub fn acquire(factory: &Arc<dyn ObjectUrlFactory>, upload: &FileUpload) -> Self {
        Self {
            url: factory.create(upload),
            factory: Arc::clone(factory),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.factory.revoke(&self.url);
    }
}

impl fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectUrl").field(&self.url).finish()
    }
}

// ---------------------------------------------------------------------------
// Preview table
// ---------------------------------------------------------------------------

/// Where a preview renders from.
#[derive(Debug)]
pub enum PreviewSource {
    /// Newly chosen image rendered through a lease.
    Upload(ObjectUrl),
    /// Newly chosen non-image file, labelled by its name.
    FileName(String),
    /// Already stored file at a storage URL.
    Stored(String),
}

impl PreviewSource {
    /// URL or label to render.
    #[must_use]
    pub fn src(&self) -> &str {
        match self {
            Self::Upload(lease) => lease.as_str(),
            Self::FileName(name) => name,
            Self::Stored(url) => url,
        }
    }
}

/// Preview for one image/file field.
#[derive(Debug)]
pub struct FilePreview {
    pub source: PreviewSource,
    /// Backend-relative path the field held when the record was loaded.
    pub original_path: Option<String>,
}

/// Per-field previews, outside the record itself.
///
/// A field that had a persisted file but has no entry here has been removed.
#[derive(Debug, Default)]
pub struct PreviewTable {
    entries: BTreeMap<String, FilePreview>,
}

impl PreviewTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a preview. Any replaced preview is dropped, releasing its lease.
    pub fn insert(&mut self, name: impl Into<String>, preview: FilePreview) {
        self.entries.insert(name.into(), preview);
    }

    /// Removes a preview, releasing its lease.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FilePreview> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Original path recorded for `name`, if its entry survives.
    #[must_use]
    pub fn original_path(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .and_then(|preview| preview.original_path.as_deref())
    }

    /// Drops every preview.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves a backend-relative path against the storage base URL.
///
/// Values that already look absolute (`http(s)://`, `//`, `data:`, `blob:`)
/// are returned unchanged.
#[must_use]
pub fn storage_url(storage_base_url: &str, path: &str) -> String {
    let absolute = ["http://", "https://", "//", "data:", "blob:"]
        .iter()
        .any(|prefix| path.starts_with(prefix));
    if absolute || storage_base_url.is_empty() {
        return path.to_string();
    }
    format!(
        "{}/{}",
        storage_base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
