//! # Persistence Backends
//!
//! The session never owns a storage format. It hands a sanitized
//! [`DocumentPayload`] to a [`PersistenceBackend`] and treats any failure as
//! a result for the caller; nothing is retried.
//!
//! - **Memory**: for tests and scripted sessions; records every save
//! - **File**: one `<id>.json` per document under a directory

use crate::document::DocumentPayload;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Save rejected: {0}")]
    Rejected(String),
}

/// Load/save interface of the persistence service
pub trait PersistenceBackend {
    fn load(&mut self, id: &str) -> Result<DocumentPayload, PersistenceError>;

    fn save(&mut self, id: &str, payload: &DocumentPayload) -> Result<(), PersistenceError>;
}

/// In-memory backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: HashMap<String, DocumentPayload>,
    saves: Vec<(String, DocumentPayload)>,
    fail_next: Option<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, payload: DocumentPayload) {
        self.documents.insert(id.into(), payload);
    }

    /// Every successful save, oldest first
    pub fn saves(&self) -> &[(String, DocumentPayload)] {
        &self.saves
    }

    pub fn save_count(&self) -> usize {
        self.saves.len()
    }

    pub fn stored(&self, id: &str) -> Option<&DocumentPayload> {
        self.documents.get(id)
    }

    /// Make the next save fail with `reason`
    pub fn fail_next_save(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }
}

impl PersistenceBackend for MemoryBackend {
    fn load(&mut self, id: &str) -> Result<DocumentPayload, PersistenceError> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))
    }

    fn save(&mut self, id: &str, payload: &DocumentPayload) -> Result<(), PersistenceError> {
        if let Some(reason) = self.fail_next.take() {
            return Err(PersistenceError::Rejected(reason));
        }
        self.documents.insert(id.to_string(), payload.clone());
        self.saves.push((id.to_string(), payload.clone()));
        Ok(())
    }
}

/// Directory of JSON documents
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }
}

impl PersistenceBackend for FileBackend {
    fn load(&mut self, id: &str) -> Result<DocumentPayload, PersistenceError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(PersistenceError::NotFound(id.to_string()));
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&mut self, id: &str, payload: &DocumentPayload) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string_pretty(payload)?;
        std::fs::write(self.path_for(id), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_common::Node;

    fn payload() -> DocumentPayload {
        DocumentPayload {
            content: vec![Node::element("a", "div")],
            comments: vec![],
        }
    }

    #[test]
    fn test_memory_backend_round_trip() {
        let mut backend = MemoryBackend::new();
        backend.save("doc", &payload()).unwrap();

        assert_eq!(backend.load("doc").unwrap(), payload());
        assert_eq!(backend.save_count(), 1);
    }

    #[test]
    fn test_memory_backend_missing_document() {
        let mut backend = MemoryBackend::new();
        assert!(matches!(backend.load("nope"), Err(PersistenceError::NotFound(_))));
    }

    #[test]
    fn test_memory_backend_injected_failure() {
        let mut backend = MemoryBackend::new();
        backend.fail_next_save("offline");

        assert!(matches!(
            backend.save("doc", &payload()),
            Err(PersistenceError::Rejected(_))
        ));
        assert_eq!(backend.save_count(), 0);

        // Only the next save fails
        backend.save("doc", &payload()).unwrap();
        assert_eq!(backend.save_count(), 1);
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileBackend::new(dir.path());

        backend.save("page-1", &payload()).unwrap();
        assert!(backend.path_for("page-1").exists());
        assert_eq!(backend.load("page-1").unwrap(), payload());
        assert!(matches!(backend.load("page-2"), Err(PersistenceError::NotFound(_))));
    }
}
