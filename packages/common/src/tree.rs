//! # Content Tree
//!
//! The editable document is a forest of owned [`Node`] trees. Children are
//! owned by their parent, so a node has at most one parent at a time and
//! every structural edit is a remove-then-insert.
//!
//! A handful of reserved tags carry structure rather than content:
//!
//! - [`TEXT_TAG`]: a text leaf; its content lives in [`Node::text`]
//! - [`SHADOW_ROOT_TAG`]: an encapsulation boundary; its host is its parent
//! - [`COMMENT_TAG`]: structural comment metadata, never persisted

use crate::error::TreeError;
use crate::result::CommonResult;
use serde::{Deserialize, Serialize};

pub const TEXT_TAG: &str = "#text";
pub const SHADOW_ROOT_TAG: &str = "#shadow-root";
pub const COMMENT_TAG: &str = "#comment";

/// Name of the region a node belongs to when it carries no explicit assignment
pub const DEFAULT_REGION: &str = "default";

/// Insertion-ordered attribute map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set a value, keeping the original position if the name already exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Keep only the attributes for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.0.retain(|(key, value)| keep(key, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.set(name, value);
        }
        attributes
    }
}

/// Element in the editable content tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,

    pub tag: String,

    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,

    /// Region of the parent this node is assigned into (`None` = default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Content of a text leaf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn element(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            attributes: Attributes::new(),
            region: None,
            text: None,
            children: Vec::new(),
        }
    }

    pub fn text_node(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: TEXT_TAG.to_string(),
            attributes: Attributes::new(),
            region: None,
            text: Some(content.into()),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn is_text(&self) -> bool {
        self.tag == TEXT_TAG
    }

    pub fn is_boundary(&self) -> bool {
        self.tag == SHADOW_ROOT_TAG
    }

    pub fn is_comment(&self) -> bool {
        self.tag == COMMENT_TAG
    }

    /// Element children, skipping text leaves, boundaries and comments
    pub fn element_children(&self) -> impl Iterator<Item = &Node> {
        self.children
            .iter()
            .filter(|c| !c.is_text() && !c.is_boundary() && !c.is_comment())
    }

    /// The region name this node is assigned into, with the default applied
    pub fn region_name(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Concatenated text of all text leaves in this subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// True if the node holds a non-blank text leaf as a direct child
    pub fn has_direct_text(&self) -> bool {
        self.children
            .iter()
            .any(|c| c.is_text() && c.text.as_deref().is_some_and(|t| !t.trim().is_empty()))
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Chain of nodes from `self` down to the node with `id`, inclusive
    pub fn path_to(&self, id: &str) -> Option<Vec<&Node>> {
        if self.id == id {
            return Some(vec![self]);
        }
        for child in &self.children {
            if let Some(mut path) = child.path_to(id) {
                path.insert(0, self);
                return Some(path);
            }
        }
        None
    }

    /// Detach the descendant with `id` from whichever node owns it
    pub fn remove_descendant(&mut self, id: &str) -> Option<Node> {
        if let Some(index) = self.children.iter().position(|c| c.id == id) {
            return Some(self.children.remove(index));
        }
        self.children
            .iter_mut()
            .find_map(|c| c.remove_descendant(id))
    }

    /// Number of nodes in this subtree, including `self`
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }
}

fn collect_text(node: &Node, out: &mut String) {
    if let Some(text) = &node.text {
        out.push_str(text);
    }
    for child in &node.children {
        collect_text(child, out);
    }
}

/// Locate a node across a forest of roots
pub fn find_in<'a>(roots: &'a [Node], id: &str) -> Option<&'a Node> {
    roots.iter().find_map(|r| r.find(id))
}

pub fn find_in_mut<'a>(roots: &'a mut [Node], id: &str) -> Option<&'a mut Node> {
    roots.iter_mut().find_map(|r| r.find_mut(id))
}

/// Ancestor chain (root first, target last) across a forest of roots
pub fn path_in<'a>(roots: &'a [Node], id: &str) -> Option<Vec<&'a Node>> {
    roots.iter().find_map(|r| r.path_to(id))
}

/// Immediate parent of `id`, without crossing boundaries
pub fn parent_in<'a>(roots: &'a [Node], id: &str) -> Option<&'a Node> {
    let path = path_in(roots, id)?;
    if path.len() < 2 {
        return None;
    }
    Some(path[path.len() - 2])
}

/// Ancestors of `id`, nearest first, with every encapsulation boundary
/// replaced by its host. The target itself is not included.
pub fn host_ancestors<'a>(roots: &'a [Node], id: &str) -> Vec<&'a Node> {
    let Some(path) = path_in(roots, id) else {
        return Vec::new();
    };
    path[..path.len() - 1]
        .iter()
        .rev()
        .copied()
        .filter(|n| !n.is_boundary())
        .collect()
}

/// Move `id` under `new_parent_id` at `index`, refusing to create a cycle
pub fn reparent(
    roots: &mut Vec<Node>,
    id: &str,
    new_parent_id: &str,
    index: usize,
) -> CommonResult<()> {
    let moving = find_in(roots, id).ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
    if moving.contains(new_parent_id) {
        return Err(TreeError::CycleDetected);
    }
    if find_in(roots, new_parent_id).is_none() {
        return Err(TreeError::ParentNotFound(new_parent_id.to_string()));
    }

    let node = detach(roots, id)?;
    let parent = find_in_mut(roots, new_parent_id)
        .ok_or_else(|| TreeError::ParentNotFound(new_parent_id.to_string()))?;
    let index = index.min(parent.children.len());
    parent.children.insert(index, node);
    Ok(())
}

/// Remove `id` from the forest, whether it is a root or a descendant
pub fn detach(roots: &mut Vec<Node>, id: &str) -> CommonResult<Node> {
    if let Some(index) = roots.iter().position(|r| r.id == id) {
        return Ok(roots.remove(index));
    }
    roots
        .iter_mut()
        .find_map(|r| r.remove_descendant(id))
        .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Node> {
        vec![Node::element("page", "page-section").with_children([
            Node::element("card", "card")
                .with_child(Node::element("title", "h2").in_region("header"))
                .with_child(Node::element("shadow", SHADOW_ROOT_TAG).with_child(
                    Node::element("inner", "div").with_child(Node::text_node("t1", "Hello")),
                )),
            Node::element("footer", "div"),
        ])]
    }

    #[test]
    fn test_attributes_keep_insertion_order() {
        let mut attrs = Attributes::new();
        attrs.set("b", "1");
        attrs.set("a", "2");
        attrs.set("b", "3");

        let names: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(attrs.get("b"), Some("3"));
        assert_eq!(attrs.remove("b"), Some("3".to_string()));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_find_and_parent() {
        let roots = sample();
        assert_eq!(find_in(&roots, "title").unwrap().tag, "h2");
        assert_eq!(parent_in(&roots, "title").unwrap().id, "card");
        assert!(parent_in(&roots, "page").is_none());
        assert!(find_in(&roots, "missing").is_none());
    }

    #[test]
    fn test_host_ancestors_cross_boundary() {
        let roots = sample();
        let ids: Vec<_> = host_ancestors(&roots, "t1").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["inner", "card", "page"]);
    }

    #[test]
    fn test_region_name_defaults() {
        let roots = sample();
        assert_eq!(find_in(&roots, "title").unwrap().region_name(), "header");
        assert_eq!(find_in(&roots, "footer").unwrap().region_name(), DEFAULT_REGION);
    }

    #[test]
    fn test_reparent_moves_node() {
        let mut roots = sample();
        reparent(&mut roots, "footer", "card", 0).unwrap();

        assert_eq!(parent_in(&roots, "footer").unwrap().id, "card");
        assert_eq!(find_in(&roots, "page").unwrap().children.len(), 1);
    }

    #[test]
    fn test_reparent_rejects_cycle() {
        let mut roots = sample();
        let result = reparent(&mut roots, "card", "inner", 0);
        assert_eq!(result, Err(TreeError::CycleDetected));

        let result = reparent(&mut roots, "card", "card", 0);
        assert_eq!(result, Err(TreeError::CycleDetected));

        // Tree untouched
        assert_eq!(parent_in(&roots, "card").unwrap().id, "page");
    }

    #[test]
    fn test_text_content_and_direct_text() {
        let roots = sample();
        let inner = find_in(&roots, "inner").unwrap();
        assert_eq!(inner.text_content(), "Hello");
        assert!(inner.has_direct_text());
        assert!(!find_in(&roots, "card").unwrap().has_direct_text());
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let node = Node::element("a", "div");
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"id":"a","tag":"div"}"#);
    }
}
