pub mod init;
pub mod inspect;
pub mod replay;

pub use init::{init, InitArgs};
pub use inspect::{inspect, InspectArgs};
pub use replay::{replay, ReplayArgs};

use anyhow::{Context, Result};
use folio_editor::{DocumentPayload, SchemaRegistry};
use std::fs;
use std::path::Path;

/// Read a document payload (`{ "content": [...], "comments": [...] }`)
pub(crate) fn load_document(path: &Path) -> Result<DocumentPayload> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Cannot read document {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("Invalid document {}", path.display()))
}

/// Read a JSON list of declarative component schemas
pub(crate) fn load_schema(path: &Path) -> Result<SchemaRegistry> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Cannot read schema {}", path.display()))?;
    SchemaRegistry::from_json(&source).with_context(|| format!("Invalid schema {}", path.display()))
}

/// Document id derived from the file name (`home.json` -> `home`)
pub(crate) fn document_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
