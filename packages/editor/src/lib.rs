//! # Folio Editor
//!
//! Editing-session core of the Folio visual content editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host: pointer/keyboard events, timers,      │
//! │       rendered layout (RenderedStructure)   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ EditingSession                              │
//! │  - Selection & region resolution            │
//! │  - Mutations + reconcile                    │
//! │  - Inline editing (edit target lifecycle)   │
//! │  - History (debounced snapshots, replay)    │
//! │  - Autosave (normalized baseline compare)   │
//! │  - Viewport (pan/zoom, bring into view)     │
//! │  - Toolbar placement                        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ PersistenceBackend: load / save payloads    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **One explicit session**: no globals; every component hangs off the
//!    session and listeners are told about changes through `subscribe`
//! 2. **The live tree is the truth**: capabilities and parent targets are
//!    recomputed from the tree on demand, never cached
//! 3. **Nothing blocks**: deferred work is a deadline the host drives through
//!    `poll`
//! 4. **Misses degrade, they do not fail**: an unresolvable region or a full
//!    region is a fallback or a rejection, not an error
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_editor::{EditingSession, EditorConfig, MemoryBackend, SchemaRegistry, SystemClock};
//!
//! let mut session = EditingSession::open(
//!     "home",
//!     SchemaRegistry::from_json(&schemas)?,
//!     backend,
//!     SystemClock,
//!     EditorConfig::load(".")?,
//! )?;
//!
//! session.subscribe(|event| println!("{:?}", event));
//! session.select_node(SelectionTarget::node("hero"), SelectOrigin::TreePanel, &layout);
//! session.enable_inline_edit()?;
//! session.inline_set_text("Welcome")?;
//! session.commit_inline_edit();
//!
//! // From the host's timer
//! session.poll()?;
//! ```

mod autosave;
mod config;
mod document;
mod errors;
mod events;
mod history;
mod id_generator;
mod inline_edit;
mod layout;
mod mutations;
mod persistence;
mod schema;
mod selection;
mod session;
mod timer;
mod toolbar;
mod undo_stack;
mod viewport;

pub use autosave::{AutosaveScheduler, SaveOutcome};
pub use config::{
    AutosaveConfig, ConfigError, EditorConfig, EmptyPlaceholderPolicy, HistoryConfig,
    InlineEditConfig, ParentFallback, SelectionConfig, ToolbarConfig, ViewportConfig,
    DEFAULT_CONFIG_NAME,
};
pub use document::{
    Comment, Document, DocumentPayload, Snapshot, AUTHORING_ATTRIBUTE_PREFIX, EDITABLE_ATTRIBUTE,
};
pub use errors::EditorError;
pub use events::{Listener, SessionEvent, SubscriptionId, Subscribers};
pub use history::{History, HistoryState};
pub use id_generator::{document_seed, IdGenerator};
pub use inline_edit::{format_tag, EditTarget, InlineEditContext, InlineEditState, InlineEditor};
pub use layout::{RenderedStructure, StaticLayout};
pub use mutations::{
    region_children, region_neighbours, Mutation, MutationError, MutationOutcome, MutationResult,
    Rejection,
};
pub use persistence::{FileBackend, MemoryBackend, PersistenceBackend, PersistenceError};
pub use schema::{
    DeclarativeSchema, ElementMetadata, NamedRegion, NodeType, RegionDescriptor,
    RegionSchemaProvider, SchemaRegistry, LINK_FORMAT, REFERENCE_TAG,
};
pub use selection::{
    capabilities, formatting, parent_target, resolve_target, Capabilities, Formatting,
    SelectOrigin, SelectionState, SelectionTarget,
};
pub use session::EditingSession;
pub use timer::{Clock, Debouncer, ManualClock, SystemClock};
pub use toolbar::{compute_position, resolve_anchor, ToolbarPlacement, ToolbarSide};
pub use undo_stack::UndoStack;
pub use viewport::{clamp_pan, scroll_delta, ScrollRequest, SurfaceMetrics, Viewport, ViewportState};

// Re-export common types for convenience
pub use folio_common::{Insets, Node, Point, Rect, Size};
