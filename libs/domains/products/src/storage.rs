//! Upload storage for product images.
//!
//! Files are written under a configured directory with a random UUID name;
//! only the generated name is persisted on the product.

use core_config::{env_or_default, ConfigError, FromEnv};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
        }
    }
}

impl FromEnv for StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let upload_dir = env_or_default("UPLOAD_DIR", DEFAULT_UPLOAD_DIR);
        if upload_dir.trim().is_empty() {
            return Err(ConfigError::ParseError {
                key: "UPLOAD_DIR".to_string(),
                details: "must not be empty".to_string(),
            });
        }
        Ok(Self {
            upload_dir: PathBuf::from(upload_dir),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create the upload directory if needed.
    pub async fn new(config: &StorageConfig) -> ProductResult<Self> {
        tokio::fs::create_dir_all(&config.upload_dir)
            .await
            .map_err(|e| {
                ProductError::Storage(format!(
                    "Could not create upload directory {}: {}",
                    config.upload_dir.display(),
                    e
                ))
            })?;

        Ok(Self {
            root: config.upload_dir.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` as `<uuid><ext>` and return the generated name.
    pub async fn store(&self, bytes: &[u8], original_name: &str) -> ProductResult<String> {
        let name = format!("{}{}", Uuid::new_v4(), extension_of(original_name));

        tokio::fs::write(self.root.join(&name), bytes)
            .await
            .map_err(|e| ProductError::Storage(format!("Could not store {}: {}", name, e)))?;

        tracing::info!(file = %name, size = bytes.len(), "Stored upload");
        Ok(name)
    }

    /// Delete a previously stored upload. Failures are logged, not returned.
    pub async fn remove(&self, name: &str) {
        if let Err(e) = tokio::fs::remove_file(self.root.join(name)).await {
            tracing::warn!(file = %name, error = %e, "Could not remove upload");
        }
    }

    /// Readiness probe: the directory still exists.
    pub async fn check(&self) -> Result<(), String> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(format!("{} is not a directory", self.root.display())),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Extension of the final path component, dot included.
///
/// Empty when there is no extension or it holds anything but ASCII
/// letters and digits.
pub fn extension_of(original_name: &str) -> String {
    let file_name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);

    match file_name.rfind('.') {
        Some(dot) => {
            let ext = &file_name[dot + 1..];
            if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                format!(".{}", ext)
            } else {
                String::new()
            }
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> StorageConfig {
        StorageConfig {
            upload_dir: std::env::temp_dir().join(format!("catalog-uploads-{}", Uuid::new_v4())),
        }
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.png"), ".png");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of("trailing."), "");
        assert_eq!(extension_of("C:\\Users\\me\\cat.JPG"), ".JPG");
        assert_eq!(extension_of("dir.v2/noext"), "");
    }

    #[test]
    fn test_extension_with_path_characters_is_dropped() {
        assert_eq!(extension_of("evil.png/../../etc"), "");
        assert_eq!(extension_of("x.p%2Fng"), "");
        assert_eq!(extension_of("x.ph p"), "");
    }

    #[tokio::test]
    async fn test_store_writes_unique_files() {
        let config = temp_config();
        let storage = FileStorage::new(&config).await.unwrap();

        let first = storage.store(b"one", "a.png").await.unwrap();
        let second = storage.store(b"two", "a.png").await.unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with(".png"));
        assert_eq!(tokio::fs::read(storage.root().join(&first)).await.unwrap(), b"one");
        assert!(storage.check().await.is_ok());

        tokio::fs::remove_dir_all(&config.upload_dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_deletes_stored_file() {
        let config = temp_config();
        let storage = FileStorage::new(&config).await.unwrap();

        let name = storage.store(b"one", "a.png").await.unwrap();
        storage.remove(&name).await;
        assert!(!storage.root().join(&name).exists());

        // already gone: only logged
        storage.remove(&name).await;

        tokio::fs::remove_dir_all(&config.upload_dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_is_storage_error() {
        let config = temp_config();
        let storage = FileStorage::new(&config).await.unwrap();
        tokio::fs::remove_dir_all(&config.upload_dir).await.unwrap();

        let result = storage.store(b"data", "a.png").await;
        assert!(matches!(result, Err(ProductError::Storage(_))));
        assert!(storage.check().await.is_err());
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_var("UPLOAD_DIR", Some("/var/lib/catalog/img"), || {
            let config = StorageConfig::from_env().unwrap();
            assert_eq!(config.upload_dir, PathBuf::from("/var/lib/catalog/img"));
        });

        temp_env::with_var_unset("UPLOAD_DIR", || {
            assert_eq!(StorageConfig::from_env().unwrap(), StorageConfig::default());
        });

        temp_env::with_var("UPLOAD_DIR", Some("  "), || {
            assert!(StorageConfig::from_env().is_err());
        });
    }
}
