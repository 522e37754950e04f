//! # Document Handle
//!
//! A Document is the live, mutable content of one open page: a forest of
//! editable top-level subtrees plus the comment threads attached to them.
//!
//! ## Lifecycle
//!
//! ```text
//! load → edit (mutations, inline edits) → snapshot / sanitize → save
//!   ↓           ↓                               ↓                 ↓
//! backend     roots                         Snapshot       DocumentPayload
//! ```

use crate::schema::SchemaRegistry;
use chrono::{DateTime, Utc};
use folio_common::{find_in, find_in_mut, walk_node_mut, Node, VisitorMut};
use serde::{Deserialize, Serialize};

/// Attribute prefix reserved for authoring-time markers
pub const AUTHORING_ATTRIBUTE_PREFIX: &str = "data-authoring-";

/// Marker the rendering layer sets on the node hosting the caret
pub const EDITABLE_ATTRIBUTE: &str = "contenteditable";

/// Comment thread anchored to a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub node_id: String,
    pub author: String,
    pub body: String,
    #[serde(default)]
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// Opaque serialized copy of the editable content at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Snapshot(String);

impl Snapshot {
    pub fn capture(roots: &[Node]) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::to_string(roots)?))
    }

    pub fn restore(&self) -> Result<Vec<Node>, serde_json::Error> {
        serde_json::from_str(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What is handed to the persistence backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    pub content: Vec<Node>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Editable document
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,

    /// Current version number (increments on each content change)
    pub version: u64,

    roots: Vec<Node>,

    comments: Vec<Comment>,
}

impl Document {
    pub fn new(id: impl Into<String>, roots: Vec<Node>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            roots,
            comments: Vec::new(),
        }
    }

    pub fn from_payload(id: impl Into<String>, payload: DocumentPayload) -> Self {
        Self {
            id: id.into(),
            version: 0,
            roots: payload.content,
            comments: payload.comments,
        }
    }

    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    /// Mutable access to the content. Call [`Document::mark_changed`] once
    /// the edit has gone through.
    pub fn roots_mut(&mut self) -> &mut Vec<Node> {
        &mut self.roots
    }

    /// Record a completed content edit
    pub fn mark_changed(&mut self) {
        self.version += 1;
    }

    pub fn replace_roots(&mut self, roots: Vec<Node>) {
        self.version += 1;
        self.roots = roots;
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn set_comments(&mut self, comments: Vec<Comment>) {
        self.comments = comments;
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        find_in(&self.roots, id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        find_in_mut(&mut self.roots, id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn snapshot(&self) -> Result<Snapshot, serde_json::Error> {
        Snapshot::capture(&self.roots)
    }

    /// Sanitized copy of the content, as it would be persisted
    pub fn sanitized_roots(&self, schema: &SchemaRegistry) -> Vec<Node> {
        let mut roots = self.roots.clone();
        Sanitizer { schema }.visit_roots_mut(&mut roots);
        roots
    }

    /// Normalized serialization used for unsaved-change comparison
    pub fn normalized_content(&self, schema: &SchemaRegistry) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.sanitized_roots(schema))
    }

    /// Comments sorted by id with trimmed bodies
    pub fn normalized_comments(&self) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .cloned()
            .map(|mut c| {
                c.body = c.body.trim().to_string();
                c
            })
            .collect();
        comments.sort_by(|a, b| a.id.cmp(&b.id));
        comments
    }

    pub fn payload(&self, schema: &SchemaRegistry) -> DocumentPayload {
        DocumentPayload {
            content: self.sanitized_roots(schema),
            comments: self.normalized_comments(),
        }
    }
}

/// Strips authoring-only markers and structural metadata
struct Sanitizer<'a> {
    schema: &'a SchemaRegistry,
}

impl VisitorMut for Sanitizer<'_> {
    fn visit_node_mut(&mut self, node: &mut Node) {
        node.children.retain(|c| !c.is_boundary() && !c.is_comment());

        let transient = self
            .schema
            .classify(node)
            .provider()
            .map(|p| p.transient_attributes())
            .unwrap_or_default();
        node.attributes.retain(|name, _| {
            !name.starts_with(AUTHORING_ATTRIBUTE_PREFIX)
                && name != EDITABLE_ATTRIBUTE
                && !transient.iter().any(|t| t == name)
        });

        walk_node_mut(self, node);
    }
}
