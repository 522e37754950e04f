//! Read access to what the rendering layer currently shows.

use folio_common::Rect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// On-screen geometry of the rendered document, in surface-local coordinates
pub trait RenderedStructure {
    fn node_rect(&self, node_id: &str) -> Option<Rect>;

    fn region_rect(&self, node_id: &str, region: &str) -> Option<Rect>;

    /// Whether the named region exists in the node's rendered structure
    fn has_region(&self, node_id: &str, region: &str) -> bool {
        self.region_rect(node_id, region).is_some()
    }

    /// Rectangle of the active native text selection, if any
    fn text_selection_rect(&self) -> Option<Rect> {
        None
    }
}

/// Fixed geometry table, used by scripted sessions and tests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticLayout {
    pub nodes: HashMap<String, Rect>,
    /// Keyed by `"<node id>/<region>"`
    pub regions: HashMap<String, Rect>,
    pub text_selection: Option<Rect>,
}

impl StaticLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node_id: impl Into<String>, rect: Rect) -> Self {
        self.nodes.insert(node_id.into(), rect);
        self
    }

    pub fn with_region(mut self, node_id: &str, region: &str, rect: Rect) -> Self {
        self.regions.insert(region_key(node_id, region), rect);
        self
    }

    pub fn set_node(&mut self, node_id: impl Into<String>, rect: Rect) {
        self.nodes.insert(node_id.into(), rect);
    }

    /// Shift every rectangle, as a pan of the surface would
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for rect in self.nodes.values_mut().chain(self.regions.values_mut()) {
            *rect = rect.translate(dx, dy);
        }
        if let Some(rect) = &mut self.text_selection {
            *rect = rect.translate(dx, dy);
        }
    }
}

fn region_key(node_id: &str, region: &str) -> String {
    format!("{}/{}", node_id, region)
}

impl RenderedStructure for StaticLayout {
    fn node_rect(&self, node_id: &str) -> Option<Rect> {
        self.nodes.get(node_id).copied()
    }

    fn region_rect(&self, node_id: &str, region: &str) -> Option<Rect> {
        self.regions.get(&region_key(node_id, region)).copied()
    }

    fn text_selection_rect(&self) -> Option<Rect> {
        self.text_selection
    }
}
