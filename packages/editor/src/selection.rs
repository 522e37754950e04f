//! # Selection & Region Resolution
//!
//! The session edits one node at a time, optionally narrowed to one named
//! content region of that node. Everything here is a pure function of the
//! live tree, the schema registry and the rendered structure; nothing is
//! cached, so a stale selection is fixed by simply resolving again.
//!
//! ## Parent selection
//!
//! `parent_target` picks where "select parent" goes, first match wins:
//!
//! 1. a selected region steps out to the same node with no region
//! 2. the region of the immediate parent the node is assigned into
//! 3. the nearest ancestor (crossing encapsulation boundaries) assigned into
//!    a region of its own parent
//! 4. the default region of the nearest component ancestor
//! 5. the nearest ancestor as a plain node, unless the configured
//!    [`ParentFallback`] is `None`
//! 6. nothing (top-level node)

use crate::config::ParentFallback;
use crate::mutations::{region_children, region_neighbours};
use crate::schema::{NodeType, RegionDescriptor, SchemaRegistry};
use crate::layout::RenderedStructure;
use folio_common::{find_in, host_ancestors, parent_in, Node, DEFAULT_REGION};
use serde::{Deserialize, Serialize};

/// What is currently being edited
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SelectionState {
    #[default]
    None,
    Node {
        node: String,
    },
    Region {
        node: String,
        region: String,
    },
}

impl SelectionState {
    pub fn node(&self) -> Option<&str> {
        match self {
            SelectionState::None => None,
            SelectionState::Node { node } | SelectionState::Region { node, .. } => Some(node),
        }
    }

    pub fn region(&self) -> Option<&str> {
        match self {
            SelectionState::Region { region, .. } => Some(region),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SelectionState::None)
    }
}

/// A requested selection, before validation against the live structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionTarget {
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl SelectionTarget {
    pub fn node(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            region: None,
        }
    }

    pub fn region(node: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            region: Some(region.into()),
        }
    }
}

/// Where a selection request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectOrigin {
    /// Click or tap on the canvas; the target is already on screen
    Pointer,
    TreePanel,
    CommentPanel,
    Keyboard,
    /// Selection made by the session itself (duplicate, select parent)
    Programmatic,
}

impl SelectOrigin {
    /// Non-pointer navigation brings an off-screen target into view
    pub fn requests_scroll(&self) -> bool {
        matches!(
            self,
            SelectOrigin::TreePanel | SelectOrigin::CommentPanel | SelectOrigin::Keyboard
        )
    }
}

/// What the toolbar may offer for a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub label: String,
    pub can_format: bool,
    /// Formatting operations permitted by any applicable region
    pub formats: Vec<String>,
    pub can_move_before: bool,
    pub can_move_after: bool,
    pub can_duplicate: bool,
    pub can_delete: bool,
    pub can_select_parent: bool,
}

impl Capabilities {
    pub fn can_reorder(&self) -> bool {
        self.can_move_before || self.can_move_after
    }

    pub fn plain_text_only(&self) -> bool {
        !self.can_format
    }
}

/// Validate a target against the live structure. An unknown node yields no
/// selection; an unresolvable region falls back to plain node selection.
pub fn resolve_target(
    roots: &[Node],
    view: &dyn RenderedStructure,
    target: &SelectionTarget,
) -> SelectionState {
    if find_in(roots, &target.node).is_none() {
        return SelectionState::None;
    }
    match &target.region {
        Some(region) if view.has_region(&target.node, region) => SelectionState::Region {
            node: target.node.clone(),
            region: region.clone(),
        },
        _ => SelectionState::Node {
            node: target.node.clone(),
        },
    }
}

/// Whether `parent` declares a region named `region`
fn exposes(schema: &SchemaRegistry, parent: &Node, region: &str) -> bool {
    schema.region_of(parent, region).is_some()
}

/// Region of the raw parent that `node` is assigned into, if the parent
/// declares it. Parents behind a boundary never count.
fn assignment<'a>(
    roots: &'a [Node],
    schema: &SchemaRegistry,
    node: &'a Node,
) -> Option<(&'a Node, String)> {
    let parent = parent_in(roots, &node.id)?;
    if parent.is_boundary() {
        return None;
    }
    let region = node.region_name();
    exposes(schema, parent, region).then(|| (parent, region.to_string()))
}

/// Where "select parent" leads from the current selection
pub fn parent_target(
    roots: &[Node],
    schema: &SchemaRegistry,
    selection: &SelectionState,
    fallback: ParentFallback,
) -> Option<SelectionTarget> {
    let (node_id, region) = match selection {
        SelectionState::None => return None,
        SelectionState::Node { node } => (node, None),
        SelectionState::Region { node, region } => (node, Some(region)),
    };
    let node = find_in(roots, node_id)?;

    if region.is_some() {
        return Some(SelectionTarget::node(node_id.clone()));
    }

    if let Some((parent, region)) = assignment(roots, schema, node) {
        return Some(SelectionTarget::region(parent.id.clone(), region));
    }

    let ancestors = host_ancestors(roots, node_id);
    for ancestor in &ancestors {
        if let Some((parent, region)) = assignment(roots, schema, ancestor) {
            return Some(SelectionTarget::region(parent.id.clone(), region));
        }
    }

    let component = ancestors
        .iter()
        .find(|a| matches!(schema.classify(a), NodeType::Component(_)));
    if let Some(component) = component {
        if exposes(schema, component, DEFAULT_REGION) {
            return Some(SelectionTarget::region(component.id.clone(), DEFAULT_REGION));
        }
    }

    match fallback {
        ParentFallback::NearestAncestor => ancestors
            .first()
            .map(|a| SelectionTarget::node(a.id.clone())),
        ParentFallback::None => None,
    }
}

/// Descriptor of the region `node` sits in within its parent
fn own_region(roots: &[Node], schema: &SchemaRegistry, node: &Node) -> Option<RegionDescriptor> {
    let parent = parent_in(roots, &node.id)?;
    schema.region_of(parent, node.region_name())
}

/// Text formatting available on one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formatting {
    pub label: String,
    pub can_format: bool,
    pub formats: Vec<String>,
}

/// Formatting for `node` from its own region, the selected region and the
/// regions it declares
pub fn formatting(
    roots: &[Node],
    schema: &SchemaRegistry,
    selection: &SelectionState,
    node: &Node,
) -> Formatting {
    let mut descriptors: Vec<RegionDescriptor> = Vec::new();
    descriptors.extend(own_region(roots, schema, node));
    if selection.node() == Some(node.id.as_str()) {
        if let Some(region) = selection.region() {
            descriptors.extend(schema.region_of(node, region));
        }
    }
    let (label, gate) = match &schema.classify(node) {
        NodeType::Component(provider) => {
            for name in provider.region_names() {
                descriptors.extend(provider.region(&name));
            }
            let metadata = provider.metadata();
            (metadata.label, metadata.supports_formatting)
        }
        NodeType::Text => ("Text".to_string(), true),
        _ => (node.tag.clone(), true),
    };

    let can_format = gate && descriptors.iter().any(RegionDescriptor::supports_text_formatting);
    let mut formats: Vec<String> = Vec::new();
    if can_format {
        for format in descriptors.iter().flat_map(|d| d.formats.iter()) {
            if !formats.contains(format) {
                formats.push(format.clone());
            }
        }
    }
    Formatting {
        label,
        can_format,
        formats,
    }
}

/// Capability flags for `node_id`, given the current selection
pub fn capabilities(
    roots: &[Node],
    schema: &SchemaRegistry,
    selection: &SelectionState,
    node_id: &str,
    fallback: ParentFallback,
) -> Capabilities {
    let Some(node) = find_in(roots, node_id) else {
        return Capabilities::default();
    };
    let Formatting {
        label,
        can_format,
        formats,
    } = formatting(roots, schema, selection, node);

    let (prev, next) = region_neighbours(roots, node_id).unwrap_or((None, None));
    let region_selected = selection.node() == Some(node_id) && selection.region().is_some();

    Capabilities {
        label,
        can_format,
        formats,
        can_move_before: prev.is_some(),
        can_move_after: next.is_some(),
        can_duplicate: can_duplicate(roots, schema, node),
        can_delete: true,
        can_select_parent: region_selected
            || parent_target(
                roots,
                schema,
                &SelectionState::Node {
                    node: node_id.to_string(),
                },
                fallback,
            )
            .is_some(),
    }
}

fn can_duplicate(roots: &[Node], schema: &SchemaRegistry, node: &Node) -> bool {
    let Some(parent) = parent_in(roots, &node.id) else {
        return true;
    };
    match schema.classify(parent) {
        NodeType::Component(provider) => provider
            .region(node.region_name())
            .is_some_and(|d| d.has_room_for(region_children(parent, node.region_name()).len())),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StaticLayout;
    use crate::schema::DeclarativeSchema;
    use folio_common::{Rect, SHADOW_ROOT_TAG};

    fn schema() -> SchemaRegistry {
        SchemaRegistry::new()
            .with(
                DeclarativeSchema::new("card", "Card")
                    .with_region("header", RegionDescriptor::text(["bold"]).with_links())
                    .with_region(
                        "default",
                        RegionDescriptor::container(["p", "button", "div"]).with_max_length(3),
                    ),
            )
            .with(
                DeclarativeSchema::new("button", "Button")
                    .with_region("label", RegionDescriptor::text(Vec::<String>::new()))
                    .without_formatting(),
            )
            .with(
                DeclarativeSchema::new("frame", "Frame")
                    .with_region("default", RegionDescriptor::container(["div"])),
            )
    }

    fn roots() -> Vec<Node> {
        vec![Node::element("page", "div").with_children([
            Node::element("card", "card").with_children([
                Node::element("title", "h2").in_region("header"),
                Node::element("p1", "p"),
                Node::element("b1", "button"),
                Node::element("wrap", "div").with_child(Node::element("deep", "span")),
            ]),
            Node::element("frame", "frame").with_child(
                Node::element("shadow", SHADOW_ROOT_TAG)
                    .with_child(Node::element("internal", "div").with_child(Node::element("leaf", "span"))),
            ),
        ])]
    }

    const NEAREST: ParentFallback = ParentFallback::NearestAncestor;

    fn node(id: &str) -> SelectionState {
        SelectionState::Node { node: id.to_string() }
    }

    #[test]
    fn test_resolve_region_falls_back_to_node() {
        let roots = roots();
        let view = StaticLayout::new().with_region("card", "header", Rect::new(0.0, 0.0, 10.0, 10.0));

        let state = resolve_target(&roots, &view, &SelectionTarget::region("card", "header"));
        assert_eq!(state.region(), Some("header"));

        let state = resolve_target(&roots, &view, &SelectionTarget::region("card", "footer"));
        assert_eq!(state, node("card"));

        let state = resolve_target(&roots, &view, &SelectionTarget::node("ghost"));
        assert!(state.is_none());
    }

    #[test]
    fn test_parent_of_region_is_same_node() {
        let roots = roots();
        let selection = SelectionState::Region {
            node: "title".to_string(),
            region: "label".to_string(),
        };
        // title also has a resolvable ancestor region, but rule 1 wins
        assert_eq!(
            parent_target(&roots, &schema(), &selection, NEAREST),
            Some(SelectionTarget::node("title"))
        );
    }

    #[test]
    fn test_parent_is_assigned_region() {
        let roots = roots();
        assert_eq!(
            parent_target(&roots, &schema(), &node("title"), NEAREST),
            Some(SelectionTarget::region("card", "header"))
        );
        assert_eq!(
            parent_target(&roots, &schema(), &node("p1"), NEAREST),
            Some(SelectionTarget::region("card", "default"))
        );
    }

    #[test]
    fn test_parent_walks_to_assigned_ancestor() {
        let roots = roots();
        // deep → wrap (plain, assigned into card/default)
        assert_eq!(
            parent_target(&roots, &schema(), &node("deep"), NEAREST),
            Some(SelectionTarget::region("card", "default"))
        );
    }

    #[test]
    fn test_parent_crosses_boundary_to_component_default() {
        let roots = roots();
        assert_eq!(
            parent_target(&roots, &schema(), &node("leaf"), NEAREST),
            Some(SelectionTarget::region("frame", "default"))
        );
    }

    #[test]
    fn test_parent_of_plain_child_is_plain_ancestor() {
        let roots = roots();
        assert_eq!(
            parent_target(&roots, &schema(), &node("card"), NEAREST),
            Some(SelectionTarget::node("page"))
        );
    }

    #[test]
    fn test_without_fallback_plain_child_has_no_parent() {
        let roots = roots();
        assert_eq!(parent_target(&roots, &schema(), &node("card"), ParentFallback::None), None);
        // Region rules still apply
        assert_eq!(
            parent_target(&roots, &schema(), &node("p1"), ParentFallback::None),
            Some(SelectionTarget::region("card", "default"))
        );

        let caps = capabilities(&roots, &schema(), &node("card"), "card", ParentFallback::None);
        assert!(!caps.can_select_parent);
    }

    #[test]
    fn test_top_level_has_no_parent() {
        let roots = roots();
        assert_eq!(parent_target(&roots, &schema(), &node("page"), NEAREST), None);
        assert_eq!(parent_target(&roots, &schema(), &SelectionState::None, NEAREST), None);
    }

    #[test]
    fn test_capabilities_formatting_sources() {
        let roots = roots();
        let schema = schema();

        // Own region (card/header) is a text region
        let title = capabilities(&roots, &schema, &node("title"), "title", NEAREST);
        assert!(title.can_format);
        assert_eq!(title.formats, vec!["bold", "link"]);

        // Button declares a text region but disables formatting outright
        let button = capabilities(&roots, &schema, &node("b1"), "b1", NEAREST);
        assert!(!button.can_format);
        assert!(button.plain_text_only());
        assert_eq!(button.label, "Button");

        // Plain child of a container region, no text config anywhere
        let p1 = capabilities(&roots, &schema, &node("p1"), "p1", NEAREST);
        assert!(!p1.can_format);
    }

    #[test]
    fn test_capabilities_reorder_by_region() {
        let roots = roots();
        let schema = schema();

        let title = capabilities(&roots, &schema, &node("title"), "title", NEAREST);
        assert!(!title.can_reorder());

        let p1 = capabilities(&roots, &schema, &node("p1"), "p1", NEAREST);
        assert!(!p1.can_move_before);
        assert!(p1.can_move_after);
    }

    #[test]
    fn test_capabilities_duplicate_respects_max() {
        let roots = roots();
        let schema = schema();

        // card/default holds p1, b1 and wrap: at its maximum of three
        let p1 = capabilities(&roots, &schema, &node("p1"), "p1", NEAREST);
        assert!(!p1.can_duplicate);

        let page = capabilities(&roots, &schema, &node("page"), "page", NEAREST);
        assert!(page.can_duplicate);
        assert!(!page.can_select_parent);
    }

    #[test]
    fn test_capabilities_for_missing_node() {
        let caps = capabilities(
            &roots(),
            &schema(),
            &SelectionState::None,
            "ghost",
            NEAREST,
        );
        assert_eq!(caps, Capabilities::default());
    }
}
