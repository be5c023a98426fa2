//! File-backed bearer token store.
//!
//! The token is read once when the store opens and cached; writes go to both
//! the cache and the file.

use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl TokenStore {
    /// Opens the store, loading any token already on disk.
    ///
    /// A missing or unreadable file means "no token".
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = match std::fs::read_to_string(&path) {
            Ok(text) => Some(text.trim().to_string()).filter(|token| !token.is_empty()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "token file unreadable");
                None
            }
        };
        Self {
            path,
            cached: RwLock::new(cached),
        }
    }

    /// Store with no backing file contents yet, for tests and one-off tokens.
    #[must_use]
    pub fn with_token(path: impl Into<PathBuf>, token: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(Some(token.into())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current token, if any.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.cached.read().clone()
    }

    /// Persists a new token.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be written.
    pub fn set(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token.trim())?;
        *self.cached.write() = Some(token.trim().to_string());
        debug!(path = %self.path.display(), "token stored");
        Ok(())
    }

    /// Forgets the token in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if an existing file cannot be removed.
    pub fn clear(&self) -> io::Result<()> {
        *self.cached.write() = None;
        self.removed(std::fs::remove_file(&self.path))
    }

    /// [`TokenStore::clear`] without blocking the runtime, for request paths.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if an existing file cannot be removed.
    pub async fn evict(&self) -> io::Result<()> {
        *self.cached.write() = None;
        self.removed(tokio::fs::remove_file(&self.path).await)
    }

    fn removed(&self, result: io::Result<()>) -> io::Result<()> {
        match result {
            Ok(()) => {
                debug!(path = %self.path.display(), "token evicted");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_reopen_reads_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token");

        let store = TokenStore::open(&path);
        assert_eq!(store.get(), None);
        store.set("abc123\n").unwrap();

        let reopened = TokenStore::open(&path);
        assert_eq!(reopened.get().as_deref(), Some("abc123"));
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        let store = TokenStore::open(&path);
        store.set("t").unwrap();

        store.clear().unwrap();

        assert_eq!(store.get(), None);
        assert!(!path.exists());
        store.clear().unwrap();
    }

    #[tokio::test]
    async fn evict_removes_file_without_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        let store = TokenStore::open(&path);
        store.set("t").unwrap();

        store.evict().await.unwrap();

        assert_eq!(store.get(), None);
        assert!(!path.exists());
        store.evict().await.unwrap();
    }

    #[test]
    fn blank_file_means_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(TokenStore::open(&path).get(), None);
    }
}
