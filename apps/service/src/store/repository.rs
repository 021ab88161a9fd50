use async_trait::async_trait;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

use crate::error::StoreError;
use crate::models::Site;

/// Durable home of the site collection
#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Read the full collection. Failures yield an empty collection.
    async fn load(&self) -> Vec<Site>;

    /// Replace the stored collection. Failures are logged, never returned.
    async fn save(&self, sites: &[Site]);
}

/// Sites stored as a single JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the document. A missing file is an empty collection.
    pub fn try_load(&self) -> Result<Vec<Site>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No sites document at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => return Err(StoreError::Io { path: self.path.clone(), source }),
        };

        serde_json::from_slice(&raw)
            .map_err(|source| StoreError::Deserialize { path: self.path.clone(), source })
    }

    /// Encode and atomically replace the document.
    ///
    /// The new content goes to a temporary file in the same directory,
    /// is synced, then renamed over the old document.
    pub fn try_save(&self, sites: &[Site]) -> Result<(), StoreError> {
        let content = serde_json::to_vec_pretty(sites).map_err(StoreError::Serialize)?;

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let io_err = |source: std::io::Error| StoreError::Io { path: self.path.clone(), source };

        fs::create_dir_all(parent).map_err(io_err)?;

        let mut temp_file = NamedTempFile::new_in(parent).map_err(io_err)?;
        temp_file.write_all(&content).map_err(io_err)?;
        temp_file.as_file().sync_all().map_err(io_err)?;
        temp_file
            .persist(&self.path)
            .map_err(|e| StoreError::Persist { path: self.path.clone(), source: e.error })?;

        #[cfg(unix)]
        {
            // Make the rename itself durable
            if let Err(e) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
                warn!("Failed to sync directory {}: {}", parent.display(), e);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl SiteStore for JsonFileStore {
    async fn load(&self) -> Vec<Site> {
        let store = self.clone();
        match tokio::task::spawn_blocking(move || store.try_load()).await {
            Ok(Ok(sites)) => {
                debug!("Loaded {} sites from {}", sites.len(), self.path.display());
                sites
            }
            Ok(Err(e)) => {
                warn!("Failed to load sites: {}", e);
                Vec::new()
            }
            Err(e) => {
                error!("Sites load task failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn save(&self, sites: &[Site]) {
        let store = self.clone();
        let sites = sites.to_vec();
        let count = sites.len();
        match tokio::task::spawn_blocking(move || store.try_save(&sites)).await {
            Ok(Ok(())) => debug!("Saved {} sites to {}", count, self.path.display()),
            Ok(Err(e)) => error!("Failed to save sites: {}", e),
            Err(e) => error!("Sites save task failed: {}", e),
        }
    }
}
