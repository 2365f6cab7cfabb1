use async_trait::async_trait;
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::camera_roll::canonical_uuid;
use crate::config::Config;
use crate::error::{RollError, RollResult};

/// Image handed out by [`PlaceholderFileStore`].
pub const PLACEHOLDER_IMAGE: &str = "assets/img/placeholder.jpg";

/// File side of image resolution: finds, produces and deletes local renderable copies.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Path of an existing local copy, or `NotFound`.
    async fn locate(&self, uuid: &str) -> RollResult<PathBuf>;

    /// Produces a local copy from the library, or `CopyFailed`.
    async fn materialize(&self, uuid: &str) -> RollResult<PathBuf>;

    /// Deletes the local copy. `Ok(false)` when there was nothing to delete.
    async fn remove(&self, uuid: &str) -> RollResult<bool>;
}

/// Copies `<library>/<uuid>.jpg` to `<cache>/<uuid>.jpg`.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    library_dir: PathBuf,
    cache_dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(library_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: library_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn file_name(uuid: &str) -> String {
        format!("{}.jpg", canonical_uuid(uuid))
    }

    fn cached_path(&self, uuid: &str) -> PathBuf {
        self.cache_dir.join(Self::file_name(uuid))
    }

    fn library_path(&self, uuid: &str) -> PathBuf {
        self.library_dir.join(Self::file_name(uuid))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn locate(&self, uuid: &str) -> RollResult<PathBuf> {
        let path = self.cached_path(uuid);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(RollError::NotFound(path.display().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(RollError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn materialize(&self, uuid: &str) -> RollResult<PathBuf> {
        let source = self.library_path(uuid);
        let target = self.cached_path(uuid);

        fs::create_dir_all(&self.cache_dir).await.map_err(|e| {
            RollError::CopyFailed(format!("{}: {}", self.cache_dir.display(), e))
        })?;
        fs::copy(&source, &target).await.map_err(|e| {
            RollError::CopyFailed(format!(
                "{} -> {}: {}",
                source.display(),
                target.display(),
                e
            ))
        })?;

        debug!("Materialized {} at {}", uuid, target.display());
        Ok(target)
    }

    async fn remove(&self, uuid: &str) -> RollResult<bool> {
        let path = self.cached_path(uuid);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed cached file {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Stand-in used when no image library is present. Every id resolves to the same
/// placeholder image and nothing is ever copied or deleted.
#[derive(Debug, Clone)]
pub struct PlaceholderFileStore {
    path: PathBuf,
}

impl PlaceholderFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for PlaceholderFileStore {
    fn default() -> Self {
        Self::new(PLACEHOLDER_IMAGE)
    }
}

#[async_trait]
impl FileStore for PlaceholderFileStore {
    async fn locate(&self, _uuid: &str) -> RollResult<PathBuf> {
        Ok(self.path.clone())
    }

    async fn materialize(&self, _uuid: &str) -> RollResult<PathBuf> {
        Ok(self.path.clone())
    }

    async fn remove(&self, _uuid: &str) -> RollResult<bool> {
        Ok(false)
    }
}

/// Picks the file store from what the configuration makes available.
pub fn file_store_for(config: &Config) -> Arc<dyn FileStore> {
    if config.library_path.is_dir() {
        info!("Using image library at {}", config.library_path.display());
        Arc::new(LocalFileStore::new(
            config.library_path.clone(),
            config.cache_path.clone(),
        ))
    } else {
        warn!(
            "Image library {} not found, using placeholder images",
            config.library_path.display()
        );
        Arc::new(PlaceholderFileStore::default())
    }
}
