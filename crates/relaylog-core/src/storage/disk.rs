//! Local disk provider backed by `tokio::fs`.

use async_trait::async_trait;
use bytes::Bytes;

use super::{FileOperationError, FileService};
use crate::types::LogResource;

/// [`FileService`] over the local file system.
///
/// Parent directories are created on demand for both `create_file` and
/// `write_file`, so rotation backups land next to their primary file
/// without extra setup.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileService;

impl DiskFileService {
    pub fn new() -> Self {
        Self
    }

    async fn ensure_parent(resource: &LogResource) -> Result<(), FileOperationError> {
        if let Some(parent) = resource.path().parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileOperationError::from_io(resource, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl FileService for DiskFileService {
    async fn exists(&self, resource: &LogResource) -> bool {
        tokio::fs::try_exists(resource.path()).await.unwrap_or(false)
    }

    async fn create_file(&self, resource: &LogResource) -> Result<(), FileOperationError> {
        Self::ensure_parent(resource).await?;
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(resource.path())
            .await
            .map(|_| ())
            .map_err(|e| FileOperationError::from_io(resource, e))
    }

    async fn read_file(&self, resource: &LogResource) -> Result<Bytes, FileOperationError> {
        tokio::fs::read(resource.path())
            .await
            .map(Bytes::from)
            .map_err(|e| FileOperationError::from_io(resource, e))
    }

    async fn write_file(
        &self,
        resource: &LogResource,
        contents: Bytes,
    ) -> Result<(), FileOperationError> {
        Self::ensure_parent(resource).await?;
        tokio::fs::write(resource.path(), &contents)
            .await
            .map_err(|e| FileOperationError::from_io(resource, e))
    }
}
