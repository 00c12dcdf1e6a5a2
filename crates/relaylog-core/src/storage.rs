//! File storage collaborator used by the durable writer.
//!
//! The writer only needs whole-file semantics:
//! - `exists` / `create_file` to make sure the backing resource is there
//! - `read_file` to load current content
//! - `write_file` to replace the content
//!
//! Failures carry a typed [`FileErrorCode`] so the writer can tell benign
//! creation races apart from fatal errors.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::types::LogResource;

mod disk;
mod memory;

pub use disk::DiskFileService;
pub use memory::{FileOp, InMemoryFileService};

/// Classification of a storage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileErrorCode {
    /// Resource already exists
    FileExists,
    /// Resource was changed by another actor while we operated on it
    FileModifiedSince,
    FileNotFound,
    PermissionDenied,
    Other,
}

impl FileErrorCode {
    /// Creation failures that only mean someone else created the file first
    pub fn is_benign_on_create(self) -> bool {
        matches!(self, FileErrorCode::FileExists | FileErrorCode::FileModifiedSince)
    }
}

impl fmt::Display for FileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileErrorCode::FileExists => "FILE_EXISTS",
            FileErrorCode::FileModifiedSince => "FILE_MODIFIED_SINCE",
            FileErrorCode::FileNotFound => "FILE_NOT_FOUND",
            FileErrorCode::PermissionDenied => "FILE_PERMISSION_DENIED",
            FileErrorCode::Other => "FILE_OTHER_ERROR",
        };
        f.write_str(name)
    }
}

/// Storage failure with its classification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} ({code})")]
pub struct FileOperationError {
    pub code: FileErrorCode,
    pub message: String,
}

impl FileOperationError {
    pub fn new(code: FileErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Classify an I/O error raised while operating on `resource`
    pub fn from_io(resource: &LogResource, err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => FileErrorCode::FileNotFound,
            std::io::ErrorKind::AlreadyExists => FileErrorCode::FileExists,
            std::io::ErrorKind::PermissionDenied => FileErrorCode::PermissionDenied,
            _ => FileErrorCode::Other,
        };
        Self::new(code, format!("{}: {}", resource, err))
    }
}

/// Whole-file storage used by [`crate::logging::FileLogger`]
#[async_trait]
pub trait FileService: Send + Sync {
    async fn exists(&self, resource: &LogResource) -> bool;

    /// Create an empty file; fails with `FileExists` if it is already there
    async fn create_file(&self, resource: &LogResource) -> Result<(), FileOperationError>;

    async fn read_file(&self, resource: &LogResource) -> Result<Bytes, FileOperationError>;

    /// Replace the whole content of `resource`, creating it if needed
    async fn write_file(
        &self,
        resource: &LogResource,
        contents: Bytes,
    ) -> Result<(), FileOperationError>;
}
