//! # Component Schemas
//!
//! Read-only metadata describing what each component type accepts and how its
//! content regions may be edited.
//!
//! Every component type is backed by a [`RegionSchemaProvider`]. Providers are
//! registered once at startup; afterwards a node is classified into a
//! [`NodeType`] variant and callers match on the variant instead of querying a
//! registry by tag name at each use site.

use folio_common::{Node, DEFAULT_REGION};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Tag every container implicitly accepts: a reference to shared content
pub const REFERENCE_TAG: &str = "content-ref";

pub const LINK_FORMAT: &str = "link";

/// What a named content region accepts and how it may be edited
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegionDescriptor {
    /// Allowed child tags (empty means the region is not a container)
    pub allowed_tags: Vec<String>,
    /// Maximum child count (`None` = unbounded)
    pub max_length: Option<usize>,
    /// Region text can be edited in place
    pub inline_editable: bool,
    /// Permitted text formatting operations
    pub formats: Vec<String>,
    pub allow_links: bool,
    pub multiline: bool,
}

impl RegionDescriptor {
    pub fn container(allowed_tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed_tags: allowed_tags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn text(formats: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            inline_editable: true,
            formats: formats.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn with_links(mut self) -> Self {
        self.allow_links = true;
        self
    }

    pub fn with_multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    /// Apply the read-time rules: containers always accept the reference tag,
    /// and text-only regions list `link` exactly when links are allowed.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();

        if !out.allowed_tags.is_empty() && !out.allowed_tags.iter().any(|t| t == REFERENCE_TAG) {
            out.allowed_tags.push(REFERENCE_TAG.to_string());
        }

        if out.allowed_tags.is_empty() {
            let has_link = out.formats.iter().any(|f| f == LINK_FORMAT);
            if out.allow_links && !has_link {
                out.formats.push(LINK_FORMAT.to_string());
            } else if !out.allow_links && has_link {
                out.formats.retain(|f| f != LINK_FORMAT);
            }
        }

        out
    }

    pub fn is_container(&self) -> bool {
        !self.allowed_tags.is_empty()
    }

    pub fn accepts(&self, tag: &str) -> bool {
        self.allowed_tags.iter().any(|t| t == tag)
    }

    pub fn has_room_for(&self, count: usize) -> bool {
        self.max_length.map_or(true, |max| count < max)
    }

    /// Inline editable or at least one formatting operation
    pub fn supports_text_formatting(&self) -> bool {
        self.inline_editable || !self.formats.is_empty()
    }

    pub fn permits_format(&self, format: &str) -> bool {
        self.formats.iter().any(|f| f == format)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMetadata {
    pub label: String,
    /// Whether text formatting applies to this element at all
    #[serde(default = "default_true")]
    pub supports_formatting: bool,
}

fn default_true() -> bool {
    true
}

/// Schema capability for one component type
pub trait RegionSchemaProvider: Debug + Send + Sync {
    fn tag(&self) -> &str;

    fn metadata(&self) -> ElementMetadata;

    /// Declared regions in declaration order, not yet normalized
    fn regions(&self) -> Vec<(String, RegionDescriptor)>;

    fn attribute_defaults(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Attributes that only exist while authoring and are stripped on save
    fn transient_attributes(&self) -> Vec<String> {
        Vec::new()
    }

    fn region(&self, name: &str) -> Option<RegionDescriptor> {
        self.regions()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.normalized())
    }

    fn default_region(&self) -> Option<RegionDescriptor> {
        self.region(DEFAULT_REGION)
    }

    fn region_names(&self) -> Vec<String> {
        self.regions().into_iter().map(|(n, _)| n).collect()
    }
}

/// Provider declared as data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarativeSchema {
    pub tag: String,
    pub label: String,
    #[serde(default = "default_true")]
    pub supports_formatting: bool,
    #[serde(default)]
    pub regions: Vec<NamedRegion>,
    #[serde(default)]
    pub attribute_defaults: Vec<(String, String)>,
    #[serde(default)]
    pub transient_attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRegion {
    pub name: String,
    #[serde(flatten)]
    pub descriptor: RegionDescriptor,
}

impl DeclarativeSchema {
    pub fn new(tag: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            label: label.into(),
            supports_formatting: true,
            regions: Vec::new(),
            attribute_defaults: Vec::new(),
            transient_attributes: Vec::new(),
        }
    }

    pub fn with_region(mut self, name: impl Into<String>, descriptor: RegionDescriptor) -> Self {
        self.regions.push(NamedRegion {
            name: name.into(),
            descriptor,
        });
        self
    }

    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attribute_defaults.push((name.into(), value.into()));
        self
    }

    pub fn with_transient(mut self, name: impl Into<String>) -> Self {
        self.transient_attributes.push(name.into());
        self
    }

    pub fn without_formatting(mut self) -> Self {
        self.supports_formatting = false;
        self
    }
}

impl RegionSchemaProvider for DeclarativeSchema {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn metadata(&self) -> ElementMetadata {
        ElementMetadata {
            label: self.label.clone(),
            supports_formatting: self.supports_formatting,
        }
    }

    fn regions(&self) -> Vec<(String, RegionDescriptor)> {
        self.regions
            .iter()
            .map(|r| (r.name.clone(), r.descriptor.clone()))
            .collect()
    }

    fn attribute_defaults(&self) -> Vec<(String, String)> {
        self.attribute_defaults.clone()
    }

    fn transient_attributes(&self) -> Vec<String> {
        self.transient_attributes.clone()
    }
}

/// Classification of a node against the registry
#[derive(Debug, Clone)]
pub enum NodeType {
    Text,
    Boundary,
    Comment,
    /// Unregistered element; can host a caret directly
    Plain,
    Component(Arc<dyn RegionSchemaProvider>),
}

impl NodeType {
    pub fn provider(&self) -> Option<&Arc<dyn RegionSchemaProvider>> {
        match self {
            NodeType::Component(provider) => Some(provider),
            _ => None,
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, NodeType::Plain)
    }
}

/// Registry of component providers, filled at startup
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    providers: HashMap<String, Arc<dyn RegionSchemaProvider>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: impl RegionSchemaProvider + 'static) {
        self.providers
            .insert(provider.tag().to_string(), Arc::new(provider));
    }

    pub fn with(mut self, provider: impl RegionSchemaProvider + 'static) -> Self {
        self.register(provider);
        self
    }

    /// Build a registry from a JSON list of declarative schemas
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let schemas: Vec<DeclarativeSchema> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for schema in schemas {
            registry.register(schema);
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn classify(&self, node: &Node) -> NodeType {
        if node.is_text() {
            return NodeType::Text;
        }
        if node.is_boundary() {
            return NodeType::Boundary;
        }
        if node.is_comment() {
            return NodeType::Comment;
        }
        match self.providers.get(&node.tag) {
            Some(provider) => NodeType::Component(Arc::clone(provider)),
            None => NodeType::Plain,
        }
    }

    pub fn provider(&self, tag: &str) -> Option<&Arc<dyn RegionSchemaProvider>> {
        self.providers.get(tag)
    }

    /// Normalized descriptor for `region` on `node`, if the node declares it
    pub fn region_of(&self, node: &Node, region: &str) -> Option<RegionDescriptor> {
        self.classify(node).provider()?.region(region)
    }

    /// Whether a node's default region makes it a container
    pub fn is_container(&self, node: &Node) -> bool {
        self.region_of(node, DEFAULT_REGION)
            .is_some_and(|d| d.is_container())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_reference_tag_to_containers() {
        let descriptor = RegionDescriptor::container(["card"]).normalized();
        assert!(descriptor.accepts("card"));
        assert!(descriptor.accepts(REFERENCE_TAG));

        // Idempotent
        assert_eq!(descriptor.normalized(), descriptor);
    }

    #[test]
    fn test_normalize_leaves_non_containers_empty() {
        let descriptor = RegionDescriptor::text(["bold"]).normalized();
        assert!(!descriptor.is_container());
    }

    #[test]
    fn test_normalize_link_format_follows_allow_links() {
        let with_links = RegionDescriptor::text(["bold"]).with_links().normalized();
        assert!(with_links.permits_format(LINK_FORMAT));

        let without_links = RegionDescriptor::text(["bold", "link"]).normalized();
        assert!(!without_links.permits_format(LINK_FORMAT));
        assert!(without_links.permits_format("bold"));
    }

    #[test]
    fn test_has_room_for() {
        let bounded = RegionDescriptor::container(["a"]).with_max_length(1);
        assert!(bounded.has_room_for(0));
        assert!(!bounded.has_room_for(1));
        assert!(RegionDescriptor::container(["a"]).has_room_for(1000));
    }

    #[test]
    fn test_classify_nodes() {
        let registry = SchemaRegistry::new().with(
            DeclarativeSchema::new("card", "Card")
                .with_region("default", RegionDescriptor::container(["p"])),
        );

        assert!(matches!(
            registry.classify(&Node::text_node("t", "x")),
            NodeType::Text
        ));
        assert!(registry.classify(&Node::element("p", "p")).is_plain());
        assert!(registry.classify(&Node::element("c", "card")).provider().is_some());
        assert!(registry.is_container(&Node::element("c", "card")));
        assert!(!registry.is_container(&Node::element("p", "p")));
    }

    #[test]
    fn test_registry_from_json() {
        let json = r#"[
            {
                "tag": "hero",
                "label": "Hero",
                "regions": [
                    { "name": "title", "inlineEditable": true, "formats": ["bold"], "allowLinks": true },
                    { "name": "default", "allowedTags": ["button"], "maxLength": 2 }
                ],
                "attributeDefaults": [["theme", "light"]]
            }
        ]"#;

        let registry = SchemaRegistry::from_json(json).unwrap();
        let hero = registry.provider("hero").unwrap();
        assert_eq!(hero.region_names(), vec!["title", "default"]);

        let title = hero.region("title").unwrap();
        assert!(title.permits_format("link"));

        let default = hero.default_region().unwrap();
        assert_eq!(default.max_length, Some(2));
        assert!(default.accepts(REFERENCE_TAG));
        assert_eq!(hero.attribute_defaults(), vec![("theme".into(), "light".into())]);
    }
}
