use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("invalid stored filename: {0}")]
    InvalidFilename(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Releases stored upload files once no listing references them. Upload
/// ingestion happens out of band; the server only ever deletes.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn release(&self, filename: &str) -> Result<(), ImageStoreError>;
}

pub struct DiskImageStore {
    dir: PathBuf,
}

impl DiskImageStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl ImageStore for DiskImageStore {
    async fn release(&self, filename: &str) -> Result<(), ImageStoreError> {
        // Stored names may carry subdirectories but never escape the root.
        if filename.starts_with('/') || filename.split(['/', '\\']).any(|seg| seg == "..") {
            return Err(ImageStoreError::InvalidFilename(filename.to_string()));
        }

        let path = self.dir.join(filename);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Released stored image {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Stored image {} already gone", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn release_refuses_escaping_filenames() {
        let store = DiskImageStore::new(std::env::temp_dir());
        assert!(store.release("../somewhere/else.png").await.is_err());
        assert!(store.release("nested/../../else.png").await.is_err());
        assert!(store.release("/etc/hosts").await.is_err());
    }

    #[tokio::test]
    async fn release_tolerates_already_missing_files() {
        let store = DiskImageStore::new(std::env::temp_dir().join("roost_images_never_made"));
        assert!(store.release("never-existed.png").await.is_ok());
    }

    #[tokio::test]
    async fn release_removes_an_existing_file() {
        let dir = std::env::temp_dir().join(format!("roost_images_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("pic.png");
        fs::write(&path, b"not really a png").await.unwrap();

        let store = DiskImageStore::new(dir);
        store.release("pic.png").await.unwrap();
        assert!(!path.exists());
    }
}
