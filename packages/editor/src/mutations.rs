//! # Content Mutations
//!
//! Every structural or content edit the session performs goes through a
//! [`Mutation`].
//!
//! ## Semantics
//!
//! - Capacity and acceptance violations (a full region, a tag the region does
//!   not allow) are *rejections*: the tree is left untouched and
//!   [`MutationOutcome::Rejected`] is returned. They are not errors.
//! - Missing nodes, cycles and malformed targets are [`MutationError`]s.
//! - A node is never moved into its own subtree.
//! - Sibling order is judged per region: "previous" and "next" skip siblings
//!   assigned into a different region of the same parent.

use crate::document::Document;
use crate::id_generator::IdGenerator;
use crate::schema::{NodeType, SchemaRegistry};
use folio_common::{
    detach, find_in, find_in_mut, parent_in, reparent, IdCollector, Node, TreeError, Visitor,
    DEFAULT_REGION,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Intent-preserving edits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mutation {
    /// Insert a new node into a region of `parent_id` (append if no index)
    #[serde(rename_all = "camelCase")]
    InsertNode {
        parent_id: String,
        region: Option<String>,
        index: Option<usize>,
        node: Node,
    },

    /// Remove a node and its subtree
    #[serde(rename_all = "camelCase")]
    RemoveNode { node_id: String },

    /// Insert a deep copy with fresh ids right after the original
    #[serde(rename_all = "camelCase")]
    DuplicateNode { node_id: String },

    /// Swap with the previous sibling in the same region
    #[serde(rename_all = "camelCase")]
    MoveBefore { node_id: String },

    /// Swap with the next sibling in the same region
    #[serde(rename_all = "camelCase")]
    MoveAfter { node_id: String },

    /// Reparent into a region of another node
    #[serde(rename_all = "camelCase")]
    MoveNode {
        node_id: String,
        new_parent_id: String,
        region: Option<String>,
        index: Option<usize>,
    },

    #[serde(rename_all = "camelCase")]
    SetAttribute {
        node_id: String,
        name: String,
        value: String,
    },

    #[serde(rename_all = "camelCase")]
    RemoveAttribute { node_id: String, name: String },

    /// Replace the content of a text leaf (atomic, last write wins)
    #[serde(rename_all = "camelCase")]
    UpdateText { node_id: String, content: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Node is not text: {0}")]
    NotText(String),

    #[error("Node already exists: {0}")]
    DuplicateId(String),
}

/// Why a mutation was declined without touching the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    RegionFull { region: String, max: usize },
    TagNotAllowed { tag: String, region: String },
    UnknownRegion(String),
    NoSibling,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Applied(MutationResult),
    Rejected(Rejection),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied(_))
    }

    /// Id of the node the mutation created, if any
    pub fn created(&self) -> Option<&str> {
        match self {
            MutationOutcome::Applied(result) => result.created.as_deref(),
            MutationOutcome::Rejected(_) => None,
        }
    }
}

/// Result of applying a mutation
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResult {
    /// New document version
    pub version: u64,

    /// Node inserted by the mutation (insert and duplicate)
    pub created: Option<String>,
}

impl Mutation {
    /// Apply mutation to the document with validation
    pub fn apply(
        &self,
        doc: &mut Document,
        schema: &SchemaRegistry,
        ids: &mut IdGenerator,
    ) -> Result<MutationOutcome, MutationError> {
        let created = match self {
            Mutation::InsertNode {
                parent_id,
                region,
                index,
                node,
            } => match Self::apply_insert(doc, schema, parent_id, region.as_deref(), *index, node)? {
                Ok(id) => Some(id),
                Err(rejection) => return Ok(MutationOutcome::Rejected(rejection)),
            },

            Mutation::RemoveNode { node_id } => {
                detach(doc.roots_mut(), node_id)?;
                None
            }

            Mutation::DuplicateNode { node_id } => {
                match Self::apply_duplicate(doc, schema, ids, node_id)? {
                    Ok(id) => Some(id),
                    Err(rejection) => return Ok(MutationOutcome::Rejected(rejection)),
                }
            }

            Mutation::MoveBefore { node_id } => {
                if let Err(rejection) = Self::apply_swap(doc, node_id, Direction::Before)? {
                    return Ok(MutationOutcome::Rejected(rejection));
                }
                None
            }

            Mutation::MoveAfter { node_id } => {
                if let Err(rejection) = Self::apply_swap(doc, node_id, Direction::After)? {
                    return Ok(MutationOutcome::Rejected(rejection));
                }
                None
            }

            Mutation::MoveNode {
                node_id,
                new_parent_id,
                region,
                index,
            } => {
                let result =
                    Self::apply_move(doc, schema, node_id, new_parent_id, region.as_deref(), *index)?;
                if let Err(rejection) = result {
                    return Ok(MutationOutcome::Rejected(rejection));
                }
                None
            }

            Mutation::SetAttribute {
                node_id,
                name,
                value,
            } => {
                let node = doc
                    .find_mut(node_id)
                    .ok_or_else(|| TreeError::NodeNotFound(node_id.clone()))?;
                node.attributes.set(name.clone(), value.clone());
                None
            }

            Mutation::RemoveAttribute { node_id, name } => {
                let node = doc
                    .find_mut(node_id)
                    .ok_or_else(|| TreeError::NodeNotFound(node_id.clone()))?;
                node.attributes.remove(name);
                None
            }

            Mutation::UpdateText { node_id, content } => {
                let node = doc
                    .find_mut(node_id)
                    .ok_or_else(|| TreeError::NodeNotFound(node_id.clone()))?;
                if !node.is_text() {
                    return Err(MutationError::NotText(node_id.clone()));
                }
                node.text = Some(content.clone());
                None
            }
        };

        doc.mark_changed();
        Ok(MutationOutcome::Applied(MutationResult {
            version: doc.version,
            created,
        }))
    }

    fn apply_insert(
        doc: &mut Document,
        schema: &SchemaRegistry,
        parent_id: &str,
        region: Option<&str>,
        index: Option<usize>,
        node: &Node,
    ) -> Result<Result<String, Rejection>, MutationError> {
        let mut incoming = IdCollector::default();
        incoming.visit_node(node);
        if let Some(clash) = incoming.ids.iter().find(|id| doc.contains(id)) {
            return Err(MutationError::DuplicateId(clash.clone()));
        }
        let parent = doc
            .find(parent_id)
            .ok_or_else(|| TreeError::ParentNotFound(parent_id.to_string()))?;
        let region_name = region.unwrap_or(DEFAULT_REGION);

        if let Err(rejection) = check_admission(schema, parent, region_name, &node.tag, None)? {
            return Ok(Err(rejection));
        }

        let mut node = node.clone();
        node.region = region.filter(|r| *r != DEFAULT_REGION).map(str::to_string);
        if let Some(provider) = schema.provider(&node.tag) {
            for (name, value) in provider.attribute_defaults() {
                if !node.attributes.contains(&name) {
                    node.attributes.set(name, value);
                }
            }
        }

        let created = node.id.clone();
        let parent = find_in_mut(doc.roots_mut(), parent_id)
            .ok_or_else(|| TreeError::ParentNotFound(parent_id.to_string()))?;
        let index = index.unwrap_or(parent.children.len()).min(parent.children.len());
        parent.children.insert(index, node);
        Ok(Ok(created))
    }

    fn apply_duplicate(
        doc: &mut Document,
        schema: &SchemaRegistry,
        ids: &mut IdGenerator,
        node_id: &str,
    ) -> Result<Result<String, Rejection>, MutationError> {
        let original = doc
            .find(node_id)
            .ok_or_else(|| TreeError::NodeNotFound(node_id.to_string()))?;

        if let Some(parent) = parent_in(doc.roots(), node_id) {
            if let Err(rejection) =
                check_admission(schema, parent, original.region_name(), &original.tag, None)?
            {
                return Ok(Err(rejection));
            }
        }

        let mut copy = original.clone();
        ids.reassign(&mut copy);
        let created = copy.id.clone();

        let (siblings, index) = sibling_list_mut(doc.roots_mut(), node_id)?;
        siblings.insert(index + 1, copy);
        Ok(Ok(created))
    }

    fn apply_swap(
        doc: &mut Document,
        node_id: &str,
        direction: Direction,
    ) -> Result<Result<(), Rejection>, MutationError> {
        let neighbour = {
            let (prev, next) = region_neighbours(doc.roots(), node_id)
                .ok_or_else(|| TreeError::NodeNotFound(node_id.to_string()))?;
            match direction {
                Direction::Before => prev,
                Direction::After => next,
            }
        };
        let Some(neighbour) = neighbour else {
            return Ok(Err(Rejection::NoSibling));
        };

        let (siblings, index) = sibling_list_mut(doc.roots_mut(), node_id)?;
        siblings.swap(index, neighbour);
        Ok(Ok(()))
    }

    fn apply_move(
        doc: &mut Document,
        schema: &SchemaRegistry,
        node_id: &str,
        new_parent_id: &str,
        region: Option<&str>,
        index: Option<usize>,
    ) -> Result<Result<(), Rejection>, MutationError> {
        let moving = doc
            .find(node_id)
            .ok_or_else(|| TreeError::NodeNotFound(node_id.to_string()))?;
        let parent = doc
            .find(new_parent_id)
            .ok_or_else(|| TreeError::ParentNotFound(new_parent_id.to_string()))?;
        let region_name = region.unwrap_or(DEFAULT_REGION);

        if let Err(rejection) =
            check_admission(schema, parent, region_name, &moving.tag, Some(node_id))?
        {
            return Ok(Err(rejection));
        }

        let roots = doc.roots_mut();
        reparent(roots, node_id, new_parent_id, index.unwrap_or(usize::MAX))?;
        if let Some(node) = find_in_mut(roots, node_id) {
            node.region = region.filter(|r| *r != DEFAULT_REGION).map(str::to_string);
        }
        Ok(Ok(()))
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Before,
    After,
}

/// Element children of `parent` assigned into `region`
pub fn region_children<'a>(parent: &'a Node, region: &str) -> Vec<&'a Node> {
    parent
        .element_children()
        .filter(|c| c.region_name() == region)
        .collect()
}

/// Whether `region` of `parent` would take one more node tagged `tag`.
/// `moving` is excluded from the count when it already sits in the region.
pub(crate) fn check_admission(
    schema: &SchemaRegistry,
    parent: &Node,
    region: &str,
    tag: &str,
    moving: Option<&str>,
) -> Result<Result<(), Rejection>, MutationError> {
    match schema.classify(parent) {
        NodeType::Text => Err(TreeError::InvalidStructure(format!(
            "text node {} cannot have children",
            parent.id
        ))
        .into()),
        NodeType::Plain | NodeType::Boundary | NodeType::Comment => Ok(Ok(())),
        NodeType::Component(provider) => {
            let Some(descriptor) = provider.region(region) else {
                return Ok(Err(Rejection::UnknownRegion(region.to_string())));
            };
            if !descriptor.accepts(tag) {
                return Ok(Err(Rejection::TagNotAllowed {
                    tag: tag.to_string(),
                    region: region.to_string(),
                }));
            }
            let count = region_children(parent, region)
                .iter()
                .filter(|c| Some(c.id.as_str()) != moving)
                .count();
            if !descriptor.has_room_for(count) {
                return Ok(Err(Rejection::RegionFull {
                    region: region.to_string(),
                    max: descriptor.max_length.unwrap_or(count),
                }));
            }
            Ok(Ok(()))
        }
    }
}

/// Indices (in the sibling list) of the previous and next element siblings
/// sharing the node's region assignment
pub fn region_neighbours(roots: &[Node], node_id: &str) -> Option<(Option<usize>, Option<usize>)> {
    let node = find_in(roots, node_id)?;
    let siblings: &[Node] = match parent_in(roots, node_id) {
        Some(parent) => &parent.children,
        None => roots,
    };
    let index = siblings.iter().position(|s| s.id == node_id)?;
    let same_region = |s: &Node| {
        !s.is_text() && !s.is_boundary() && !s.is_comment() && s.region_name() == node.region_name()
    };

    let prev = siblings[..index].iter().rposition(|s| same_region(s));
    let next = siblings[index + 1..]
        .iter()
        .position(|s| same_region(s))
        .map(|i| index + 1 + i);
    Some((prev, next))
}

/// The vector owning `node_id` and the node's index in it
fn sibling_list_mut<'a>(
    roots: &'a mut Vec<Node>,
    node_id: &str,
) -> Result<(&'a mut Vec<Node>, usize), TreeError> {
    let parent_id = parent_in(roots, node_id).map(|p| p.id.clone());
    let siblings = match parent_id {
        Some(parent_id) => {
            &mut find_in_mut(roots, &parent_id)
                .ok_or(TreeError::ParentNotFound(parent_id.clone()))?
                .children
        }
        None => roots,
    };
    let index = siblings
        .iter()
        .position(|s| s.id == node_id)
        .ok_or_else(|| TreeError::NodeNotFound(node_id.to_string()))?;
    Ok((siblings, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DeclarativeSchema, RegionDescriptor, REFERENCE_TAG};

    fn schema() -> SchemaRegistry {
        SchemaRegistry::new()
            .with(
                DeclarativeSchema::new("gallery", "Gallery")
                    .with_region("default", RegionDescriptor::container(["figure"]).with_max_length(2))
                    .with_region("caption", RegionDescriptor::container(["p"]).with_max_length(1)),
            )
            .with(DeclarativeSchema::new("figure", "Figure").with_default("loading", "lazy"))
    }

    fn doc() -> Document {
        Document::new(
            "doc",
            vec![Node::element("g", "gallery").with_children([
                Node::element("f1", "figure"),
                Node::element("cap", "p").in_region("caption"),
                Node::element("f2", "figure"),
            ])],
        )
    }

    fn ids() -> IdGenerator {
        IdGenerator::from_seed("x".to_string())
    }

    #[test]
    fn test_mutation_serialization() {
        let mutation = Mutation::UpdateText {
            node_id: "text-123".to_string(),
            content: "Hello World".to_string(),
        };

        let json = serde_json::to_string(&mutation).unwrap();
        assert!(json.contains(r#""type":"updateText""#));
        assert!(json.contains(r#""nodeId":"text-123""#));
        let deserialized: Mutation = serde_json::from_str(&json).unwrap();

        assert_eq!(mutation, deserialized);
    }

    #[test]
    fn test_insert_rejected_when_region_full() {
        let mut doc = doc();
        let mutation = Mutation::InsertNode {
            parent_id: "g".to_string(),
            region: None,
            index: None,
            node: Node::element("f3", "figure"),
        };

        let outcome = mutation.apply(&mut doc, &schema(), &mut ids()).unwrap();
        assert_eq!(
            outcome,
            MutationOutcome::Rejected(Rejection::RegionFull {
                region: "default".to_string(),
                max: 2
            })
        );
        assert!(!doc.contains("f3"));
    }

    #[test]
    fn test_insert_checks_allowed_tags() {
        let mut doc = Document::new("doc", vec![Node::element("g", "gallery")]);
        let mutation = Mutation::InsertNode {
            parent_id: "g".to_string(),
            region: None,
            index: None,
            node: Node::element("v", "video"),
        };

        let outcome = mutation.apply(&mut doc, &schema(), &mut ids()).unwrap();
        assert!(matches!(
            outcome,
            MutationOutcome::Rejected(Rejection::TagNotAllowed { .. })
        ));

        // Implicit reference tag is always accepted
        let mutation = Mutation::InsertNode {
            parent_id: "g".to_string(),
            region: None,
            index: None,
            node: Node::element("r", REFERENCE_TAG),
        };
        assert!(mutation.apply(&mut doc, &schema(), &mut ids()).unwrap().is_applied());
    }

    #[test]
    fn test_insert_fills_attribute_defaults_and_region() {
        let mut doc = Document::new("doc", vec![Node::element("g", "gallery")]);
        let mutation = Mutation::InsertNode {
            parent_id: "g".to_string(),
            region: Some("default".to_string()),
            index: None,
            node: Node::element("f", "figure"),
        };

        let outcome = mutation.apply(&mut doc, &schema(), &mut ids()).unwrap();
        assert_eq!(outcome.created(), Some("f"));

        let figure = doc.find("f").unwrap();
        assert_eq!(figure.attributes.get("loading"), Some("lazy"));
        assert_eq!(figure.region, None);
    }

    #[test]
    fn test_insert_into_unknown_region_rejected() {
        let mut doc = doc();
        let mutation = Mutation::InsertNode {
            parent_id: "g".to_string(),
            region: Some("footer".to_string()),
            index: None,
            node: Node::element("p2", "p"),
        };
        let outcome = mutation.apply(&mut doc, &schema(), &mut ids()).unwrap();
        assert_eq!(
            outcome,
            MutationOutcome::Rejected(Rejection::UnknownRegion("footer".to_string()))
        );
    }

    #[test]
    fn test_duplicate_respects_capacity() {
        let mut doc = doc();
        let outcome = Mutation::DuplicateNode {
            node_id: "f1".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids())
        .unwrap();
        assert!(!outcome.is_applied());

        // Removing one frees a slot
        Mutation::RemoveNode {
            node_id: "f2".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids())
        .unwrap();

        let outcome = Mutation::DuplicateNode {
            node_id: "f1".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids())
        .unwrap();
        assert_eq!(outcome.created(), Some("x-1"));

        let gallery = doc.find("g").unwrap();
        let order: Vec<_> = gallery.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["f1", "x-1", "cap"]);
    }

    #[test]
    fn test_move_after_skips_other_regions() {
        let mut doc = doc();
        Mutation::MoveAfter {
            node_id: "f1".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids())
        .unwrap();

        let gallery = doc.find("g").unwrap();
        let order: Vec<_> = gallery.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["f2", "cap", "f1"]);
    }

    #[test]
    fn test_move_before_without_sibling_rejected() {
        let mut doc = doc();
        let outcome = Mutation::MoveBefore {
            node_id: "f1".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids())
        .unwrap();
        assert_eq!(outcome, MutationOutcome::Rejected(Rejection::NoSibling));
    }

    #[test]
    fn test_move_node_rejects_cycle() {
        let mut doc = Document::new(
            "doc",
            vec![Node::element("a", "div").with_child(Node::element("b", "div"))],
        );
        let result = Mutation::MoveNode {
            node_id: "a".to_string(),
            new_parent_id: "b".to_string(),
            region: None,
            index: None,
        }
        .apply(&mut doc, &schema(), &mut ids());
        assert_eq!(result, Err(MutationError::Tree(TreeError::CycleDetected)));
    }

    #[test]
    fn test_insert_rejects_clashing_descendant_id() {
        let mut doc = Document::new("doc", vec![Node::element("g", "gallery")]);
        let version = doc.version;
        let mutation = Mutation::InsertNode {
            parent_id: "g".to_string(),
            region: None,
            index: None,
            node: Node::element("fresh", "figure").with_child(Node::element("g", "span")),
        };

        let result = mutation.apply(&mut doc, &schema(), &mut ids());
        assert_eq!(result, Err(MutationError::DuplicateId("g".to_string())));
        assert!(!doc.contains("fresh"));
        assert_eq!(doc.version, version);
    }

    #[test]
    fn test_missing_targets_leave_version_alone() {
        let mut doc = doc();
        let result = Mutation::SetAttribute {
            node_id: "nope".to_string(),
            name: "alt".to_string(),
            value: "x".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids());
        assert!(result.is_err());

        let result = Mutation::RemoveNode {
            node_id: "nope".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids());
        assert!(result.is_err());
        assert_eq!(doc.version, 0);

        let outcome = Mutation::RemoveNode {
            node_id: "f2".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids())
        .unwrap();
        assert_eq!(outcome, MutationOutcome::Applied(MutationResult { version: 1, created: None }));
    }

    #[test]
    fn test_move_node_assigns_region() {
        let mut doc = Document::new(
            "doc",
            vec![
                Node::element("g", "gallery"),
                Node::element("loose", "p"),
            ],
        );
        let outcome = Mutation::MoveNode {
            node_id: "loose".to_string(),
            new_parent_id: "g".to_string(),
            region: Some("caption".to_string()),
            index: None,
        }
        .apply(&mut doc, &schema(), &mut ids())
        .unwrap();
        assert!(outcome.is_applied());
        assert_eq!(doc.roots().len(), 1);
        assert_eq!(doc.find("loose").unwrap().region.as_deref(), Some("caption"));
    }

    #[test]
    fn test_move_within_full_region_is_allowed() {
        let mut doc = doc();
        let outcome = Mutation::MoveNode {
            node_id: "f2".to_string(),
            new_parent_id: "g".to_string(),
            region: None,
            index: Some(0),
        }
        .apply(&mut doc, &schema(), &mut ids())
        .unwrap();
        assert!(outcome.is_applied());
        assert_eq!(doc.find("g").unwrap().children[0].id, "f2");
    }

    #[test]
    fn test_update_text_requires_text_node() {
        let mut doc = Document::new(
            "doc",
            vec![Node::element("a", "p").with_child(Node::text_node("t", "old"))],
        );
        Mutation::UpdateText {
            node_id: "t".to_string(),
            content: "new".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids())
        .unwrap();
        assert_eq!(doc.find("a").unwrap().text_content(), "new");

        let result = Mutation::UpdateText {
            node_id: "a".to_string(),
            content: "x".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids());
        assert_eq!(result, Err(MutationError::NotText("a".to_string())));
    }

    #[test]
    fn test_set_and_remove_attribute() {
        let mut doc = doc();
        Mutation::SetAttribute {
            node_id: "f1".to_string(),
            name: "alt".to_string(),
            value: "Sunset".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids())
        .unwrap();
        assert_eq!(doc.find("f1").unwrap().attributes.get("alt"), Some("Sunset"));

        Mutation::RemoveAttribute {
            node_id: "f1".to_string(),
            name: "alt".to_string(),
        }
        .apply(&mut doc, &schema(), &mut ids())
        .unwrap();
        assert!(doc.find("f1").unwrap().attributes.is_empty());
    }
}
