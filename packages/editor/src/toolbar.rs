//! Placement of the floating contextual toolbar.

use crate::config::ToolbarConfig;
use crate::layout::RenderedStructure;
use crate::selection::SelectionState;
use folio_common::{Rect, Size};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolbarSide {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolbarPlacement {
    pub x: f64,
    pub y: f64,
    pub side: ToolbarSide,
}

/// Center over `anchor`, below it unless the anchor sits in the bottom band
/// of the viewport, flipping sides if needed and clamping into the margins.
pub fn compute_position(anchor: &Rect, toolbar: Size, viewport: Size, config: &ToolbarConfig) -> ToolbarPlacement {
    let x = clamp_axis(anchor.center_x() - toolbar.width / 2.0, toolbar.width, viewport.width, config.margin);

    let below = anchor.bottom() + config.gap;
    let above = anchor.top() - config.gap - toolbar.height;
    let fits_below = below + toolbar.height <= viewport.height - config.margin;
    let fits_above = above >= config.margin;

    let preferred = if anchor.bottom() >= viewport.height * config.flip_threshold {
        ToolbarSide::Above
    } else {
        ToolbarSide::Below
    };
    let side = match preferred {
        ToolbarSide::Below if !fits_below && fits_above => ToolbarSide::Above,
        ToolbarSide::Above if !fits_above && fits_below => ToolbarSide::Below,
        side => side,
    };
    let y = match side {
        ToolbarSide::Above => above,
        ToolbarSide::Below => below,
    };

    ToolbarPlacement {
        x,
        y: clamp_axis(y, toolbar.height, viewport.height, config.margin),
        side,
    }
}

fn clamp_axis(value: f64, size: f64, extent: f64, margin: f64) -> f64 {
    let max = (extent - size - margin).max(margin);
    value.clamp(margin, max)
}

/// Rectangle the toolbar should follow: a native text selection first, then
/// the selected region, then the selected node.
pub fn resolve_anchor(selection: &SelectionState, layout: &dyn RenderedStructure) -> Option<Rect> {
    if let Some(rect) = layout.text_selection_rect() {
        return Some(rect);
    }
    let node = selection.node()?;
    selection
        .region()
        .and_then(|region| layout.region_rect(node, region))
        .or_else(|| layout.node_rect(node))
}
