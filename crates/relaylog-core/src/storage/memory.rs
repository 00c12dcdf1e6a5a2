//! In-memory provider with failure injection.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::{FileErrorCode, FileOperationError, FileService};
use crate::types::LogResource;

/// Operation a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileOp {
    Create,
    Read,
    Write,
}

#[derive(Default)]
struct MemoryState {
    files: HashMap<LogResource, Bytes>,
    failures: HashMap<(LogResource, FileOp), FileErrorCode>,
}

/// [`FileService`] holding every file in memory.
///
/// Useful for embedding and for exercising the writer's failure paths:
/// `fail` makes one operation on one resource return the given code until
/// `clear_failure` is called.
#[derive(Default)]
pub struct InMemoryFileService {
    state: Mutex<MemoryState>,
}

impl InMemoryFileService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for `op` on `resource`
    pub fn fail(&self, resource: &LogResource, op: FileOp, code: FileErrorCode) {
        self.state.lock().failures.insert((resource.clone(), op), code);
    }

    pub fn clear_failure(&self, resource: &LogResource, op: FileOp) {
        self.state.lock().failures.remove(&(resource.clone(), op));
    }

    /// Seed or overwrite a file without going through the service API
    pub fn insert(&self, resource: &LogResource, contents: impl Into<Bytes>) {
        self.state
            .lock()
            .files
            .insert(resource.clone(), contents.into());
    }

    /// Current content as text, if the file exists
    pub fn contents(&self, resource: &LogResource) -> Option<String> {
        self.state
            .lock()
            .files
            .get(resource)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().files.len()
    }

    fn check(state: &MemoryState, resource: &LogResource, op: FileOp) -> Result<(), FileOperationError> {
        match state.failures.get(&(resource.clone(), op)) {
            Some(code) => Err(FileOperationError::new(
                *code,
                format!("injected {:?} failure for {}", op, resource),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FileService for InMemoryFileService {
    async fn exists(&self, resource: &LogResource) -> bool {
        self.state.lock().files.contains_key(resource)
    }

    async fn create_file(&self, resource: &LogResource) -> Result<(), FileOperationError> {
        let mut state = self.state.lock();
        Self::check(&state, resource, FileOp::Create)?;
        if state.files.contains_key(resource) {
            return Err(FileOperationError::new(
                FileErrorCode::FileExists,
                format!("{} already exists", resource),
            ));
        }
        state.files.insert(resource.clone(), Bytes::new());
        Ok(())
    }

    async fn read_file(&self, resource: &LogResource) -> Result<Bytes, FileOperationError> {
        let state = self.state.lock();
        Self::check(&state, resource, FileOp::Read)?;
        state.files.get(resource).cloned().ok_or_else(|| {
            FileOperationError::new(
                FileErrorCode::FileNotFound,
                format!("{} not found", resource),
            )
        })
    }

    async fn write_file(
        &self,
        resource: &LogResource,
        contents: Bytes,
    ) -> Result<(), FileOperationError> {
        let mut state = self.state.lock();
        Self::check(&state, resource, FileOp::Write)?;
        state.files.insert(resource.clone(), contents);
        Ok(())
    }
}
