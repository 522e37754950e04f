//! # Inline Editing
//!
//! ```text
//! Idle ──enable──▶ Active ──commit──▶ Idle
//!                    │
//!                    └──cancel──▶ Idle (pre-edit content restored)
//! ```
//!
//! The node the caret lives in (the *edit target*) is tracked separately from
//! the selected node. When a container has nothing to type into, a text
//! holder child is allocated for the duration of the edit; it is released
//! on cancel, and on commit according to [`EmptyPlaceholderPolicy`].

use crate::config::{EmptyPlaceholderPolicy, InlineEditConfig};
use crate::document::Document;
use crate::errors::EditorError;
use crate::id_generator::IdGenerator;
use crate::mutations::check_admission;
use crate::schema::{RegionDescriptor, SchemaRegistry};
use crate::selection::{formatting, SelectionState};
use folio_common::{parent_in, Node, TreeError, DEFAULT_REGION};

/// Where the caret lives while editing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    /// The selected node hosts text directly
    Selected(String),
    /// An existing plain child of the selected container
    Child(String),
    /// A text holder allocated for this edit
    Placeholder(String),
}

impl EditTarget {
    pub fn id(&self) -> &str {
        match self {
            EditTarget::Selected(id) | EditTarget::Child(id) | EditTarget::Placeholder(id) => id,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, EditTarget::Placeholder(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineEditContext {
    /// The selected (outer) node
    pub node_id: String,
    pub target: EditTarget,
    /// The outer node as it was before the edit began
    pub original: Node,
    pub plain_text_only: bool,
    pub multiline: bool,
    /// Formatting operations the edit may apply
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum InlineEditState {
    #[default]
    Idle,
    Active(InlineEditContext),
}

/// Element used to represent a formatting operation
pub fn format_tag(format: &str) -> &str {
    match format {
        "bold" => "strong",
        "italic" => "em",
        "underline" => "u",
        "strikethrough" => "s",
        "link" => "a",
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct InlineEditor {
    state: InlineEditState,
    config: InlineEditConfig,
}

impl InlineEditor {
    pub fn new(config: InlineEditConfig) -> Self {
        Self {
            state: InlineEditState::Idle,
            config,
        }
    }

    pub fn state(&self) -> &InlineEditState {
        &self.state
    }

    pub fn context(&self) -> Option<&InlineEditContext> {
        match &self.state {
            InlineEditState::Active(ctx) => Some(ctx),
            InlineEditState::Idle => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.context().is_some()
    }

    /// Idle → Active on the selected node
    pub fn enable(
        &mut self,
        doc: &mut Document,
        schema: &SchemaRegistry,
        selection: &SelectionState,
        ids: &mut IdGenerator,
    ) -> Result<&InlineEditContext, EditorError> {
        let node_id = selection
            .node()
            .ok_or_else(|| TreeError::InvalidStructure("nothing selected".to_string()))?
            .to_string();
        let node = doc
            .find(&node_id)
            .ok_or_else(|| TreeError::NodeNotFound(node_id.clone()))?;

        let original = node.clone();
        let support = formatting(doc.roots(), schema, selection, node);
        let multiline = edit_region(doc.roots(), schema, selection, node).map_or(true, |d| d.multiline);
        let is_container = schema.is_container(node);
        let has_text = node.has_direct_text();
        let plain_child = node
            .element_children()
            .find(|c| schema.classify(c).is_plain())
            .map(|c| c.id.clone());

        let target = match (is_container, plain_child) {
            (false, _) => EditTarget::Selected(node_id.clone()),
            (true, Some(child)) => EditTarget::Child(child),
            (true, None) if has_text => EditTarget::Selected(node_id.clone()),
            (true, None) => {
                let tag = &self.config.placeholder_tag;
                match check_admission(schema, node, DEFAULT_REGION, tag, None)? {
                    Ok(()) => EditTarget::Placeholder(self.allocate_placeholder(doc, &node_id, ids)?),
                    Err(rejection) => {
                        tracing::debug!("[InlineEdit] No text holder in {}: {:?}", node_id, rejection);
                        EditTarget::Selected(node_id.clone())
                    }
                }
            }
        };

        tracing::debug!("[InlineEdit] Editing {} via {:?}", node_id, target);

        self.state = InlineEditState::Active(InlineEditContext {
            node_id,
            target,
            original,
            plain_text_only: !support.can_format,
            multiline,
            formats: support.formats,
        });
        self.context().ok_or(EditorError::NoActiveEdit)
    }

    fn allocate_placeholder(
        &self,
        doc: &mut Document,
        parent_id: &str,
        ids: &mut IdGenerator,
    ) -> Result<String, EditorError> {
        let id = ids.new_id();
        let parent = doc
            .find_mut(parent_id)
            .ok_or_else(|| TreeError::NodeNotFound(parent_id.to_string()))?;
        parent
            .children
            .push(Node::element(id.clone(), self.config.placeholder_tag.clone()));
        doc.mark_changed();
        Ok(id)
    }

    /// Replace the target's content with `text`. Inside a format wrapper the
    /// text goes to the innermost wrapper so the formatting survives. Newlines
    /// are folded to spaces in single-line regions. Returns whether the
    /// content changed.
    pub fn set_text(&mut self, doc: &mut Document, ids: &mut IdGenerator, text: &str) -> Result<bool, EditorError> {
        let ctx = self.context().ok_or(EditorError::NoActiveEdit)?;
        let text = if ctx.multiline {
            text.to_string()
        } else {
            text.replace(['\r', '\n'], " ")
        };
        let target_id = ctx.target.id().to_string();

        let current = doc
            .find(&target_id)
            .ok_or_else(|| TreeError::NodeNotFound(target_id.clone()))?;
        if current.is_text() {
            if current.text.as_deref() == Some(text.as_str()) {
                return Ok(false);
            }
            if let Some(leaf) = doc.find_mut(&target_id) {
                leaf.text = Some(text);
            }
            doc.mark_changed();
            return Ok(true);
        }

        let holder = innermost_wrapper(current, &ctx.formats);
        let unchanged = match holder.children.as_slice() {
            [] => text.is_empty(),
            [only] => only.is_text() && only.text.as_deref() == Some(text.as_str()),
            _ => false,
        };
        if unchanged {
            return Ok(false);
        }
        let holder_id = holder.id.clone();
        let leaf_id = first_text_leaf(holder).map(|leaf| leaf.id.clone());

        let holder = doc
            .find_mut(&holder_id)
            .ok_or_else(|| TreeError::NodeNotFound(holder_id.clone()))?;
        holder.children.clear();
        if !text.is_empty() {
            let leaf_id = leaf_id.unwrap_or_else(|| ids.new_id());
            holder.children.push(Node::text_node(leaf_id, text));
        }
        doc.mark_changed();
        Ok(true)
    }

    /// Toggle `format` over the whole target text. Returns false if the
    /// format is not permitted here.
    pub fn apply_format(&mut self, doc: &mut Document, ids: &mut IdGenerator, format: &str) -> Result<bool, EditorError> {
        let ctx = self.context().ok_or(EditorError::NoActiveEdit)?;
        if ctx.plain_text_only || !ctx.formats.iter().any(|f| f == format) {
            tracing::warn!("[InlineEdit] Format '{}' not permitted on {}", format, ctx.node_id);
            return Ok(false);
        }
        let target_id = ctx.target.id().to_string();
        let tag = format_tag(format);

        let target = doc
            .find_mut(&target_id)
            .ok_or_else(|| TreeError::NodeNotFound(target_id.clone()))?;
        if target.is_text() {
            return Ok(false);
        }

        let wrapped = target.children.len() == 1 && target.children[0].tag == tag;
        if wrapped {
            let wrapper = target.children.remove(0);
            target.children = wrapper.children;
        } else {
            let wrapper = Node::element(ids.new_id(), tag).with_children(std::mem::take(&mut target.children));
            target.children.push(wrapper);
        }
        doc.mark_changed();
        Ok(true)
    }

    /// Active → Idle keeping the content. Returns the finished context and
    /// whether releasing an empty placeholder changed the content.
    pub fn commit(&mut self, doc: &mut Document) -> Option<(InlineEditContext, bool)> {
        let ctx = self.take()?;
        let mut released = false;
        if let EditTarget::Placeholder(id) = &ctx.target {
            let empty = doc.find(id).is_some_and(|n| n.text_content().trim().is_empty());
            if empty && self.config.empty_placeholder == EmptyPlaceholderPolicy::Remove {
                released = release_placeholder(doc, &ctx.node_id, id);
            }
        }
        tracing::debug!("[InlineEdit] Committed {}", ctx.node_id);
        Some((ctx, released))
    }

    /// Active → Idle restoring the pre-edit content of the outer node
    pub fn cancel(&mut self, doc: &mut Document) -> Option<InlineEditContext> {
        let ctx = self.take()?;
        match doc.find_mut(&ctx.node_id) {
            Some(node) => {
                *node = ctx.original.clone();
                doc.mark_changed();
            }
            None => tracing::warn!("[InlineEdit] {} vanished before cancel", ctx.node_id),
        }
        tracing::debug!("[InlineEdit] Cancelled {}", ctx.node_id);
        Some(ctx)
    }

    /// Drop the edit without touching the document
    pub fn abandon(&mut self) -> Option<InlineEditContext> {
        self.take()
    }

    fn take(&mut self) -> Option<InlineEditContext> {
        match std::mem::take(&mut self.state) {
            InlineEditState::Active(ctx) => Some(ctx),
            InlineEditState::Idle => None,
        }
    }
}

fn release_placeholder(doc: &mut Document, parent_id: &str, id: &str) -> bool {
    let Some(parent) = doc.find_mut(parent_id) else {
        return false;
    };
    let before = parent.children.len();
    parent.children.retain(|c| c.id != id);
    let released = parent.children.len() != before;
    if released {
        doc.mark_changed();
    }
    released
}

/// Descend through single-child format wrappers (`<strong>`, `<em>`, ...)
fn innermost_wrapper<'a>(node: &'a Node, formats: &[String]) -> &'a Node {
    let is_wrapper = |n: &Node| formats.iter().any(|f| format_tag(f) == n.tag);
    let mut holder = node;
    while let [only] = holder.children.as_slice() {
        if !is_wrapper(only) {
            break;
        }
        holder = only;
    }
    holder
}

fn first_text_leaf(node: &Node) -> Option<&Node> {
    node.children
        .iter()
        .find_map(|c| if c.is_text() { Some(c) } else { first_text_leaf(c) })
}

/// Descriptor governing the text being edited: the selected region, or the
/// region the node sits in within its parent
fn edit_region(
    roots: &[Node],
    schema: &SchemaRegistry,
    selection: &SelectionState,
    node: &Node,
) -> Option<RegionDescriptor> {
    if let Some(region) = selection.region() {
        if let Some(descriptor) = schema.region_of(node, region) {
            return Some(descriptor);
        }
    }
    let parent = parent_in(roots, &node.id)?;
    schema.region_of(parent, node.region_name())
}
