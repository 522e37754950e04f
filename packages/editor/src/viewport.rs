//! # Viewport Controller
//!
//! Pan offset and zoom factor for the editing surface.
//!
//! Pan is expressed in surface-local units: a content point `c` appears at
//! `pan + c * zoom`. Every pan change is clamped against the surface metrics
//! when they are known. Bringing a node into view only ever pans.

use crate::config::ViewportConfig;
use crate::layout::RenderedStructure;
use folio_common::{Insets, Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Below this delta on both axes a bring-into-view pass counts as settled
const SETTLE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportState {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl ViewportState {
    pub const IDENTITY: ViewportState = ViewportState {
        pan_x: 0.0,
        pan_y: 0.0,
        zoom: 1.0,
    };

    /// Surface-local position of a content point
    pub fn to_surface(&self, content: Point) -> Point {
        Point::new(self.pan_x + content.x * self.zoom, self.pan_y + content.y * self.zoom)
    }

    /// Content position under a surface-local point
    pub fn to_content(&self, surface: Point) -> Point {
        Point::new((surface.x - self.pan_x) / self.zoom, (surface.y - self.pan_y) / self.zoom)
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Size of the scrollable surface and of the unscaled content inside it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceMetrics {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub padding: Insets,
    pub content: Size,
}

impl SurfaceMetrics {
    pub fn inner_width(&self) -> f64 {
        (self.width - self.padding.horizontal()).max(0.0)
    }

    pub fn inner_height(&self) -> f64 {
        (self.height - self.padding.vertical()).max(0.0)
    }

    /// The visible surface in surface-local coordinates
    pub fn bounds(&self) -> Rect {
        Rect::from_size(Size::new(self.width, self.height))
    }
}

/// Keep the scaled content reachable inside the padding-excluded surface
pub fn clamp_pan(state: ViewportState, metrics: &SurfaceMetrics, tolerance: f64) -> ViewportState {
    let scaled_width = metrics.content.width * state.zoom;
    let scaled_height = metrics.content.height * state.zoom;

    let slack_x = metrics.inner_width() - scaled_width;
    let min_x = slack_x.min(0.0) - tolerance;
    let max_x = slack_x.max(0.0) + tolerance;
    let pan_x = state.pan_x.clamp(min_x, max_x);

    let inner_height = metrics.inner_height();
    let pan_y = if scaled_height <= inner_height {
        0.0
    } else {
        state.pan_y.clamp(inner_height - scaled_height, 0.0)
    };

    ViewportState {
        pan_x,
        pan_y,
        zoom: state.zoom,
    }
}

/// Minimal pan change that puts `rect` inside `viewport` shrunk by `margin`.
///
/// On an axis where `rect` is larger than the visible area the near edge is
/// aligned instead.
pub fn scroll_delta(rect: &Rect, viewport: &Rect, margin: f64) -> (f64, f64) {
    let visible = viewport.deflate(margin);
    let dx = axis_delta(rect.left(), rect.right(), visible.left(), visible.right());
    let dy = axis_delta(rect.top(), rect.bottom(), visible.top(), visible.bottom());
    (dx, dy)
}

fn axis_delta(start: f64, end: f64, visible_start: f64, visible_end: f64) -> f64 {
    if end - start > visible_end - visible_start || start < visible_start {
        visible_start - start
    } else if end > visible_end {
        visible_end - end
    } else {
        0.0
    }
}

/// A bring-into-view request that converges over several frames
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollRequest {
    pub node_id: String,
    pub margin: f64,
    pub passes_left: u32,
}

#[derive(Debug, Clone)]
pub struct Viewport {
    state: ViewportState,
    metrics: Option<SurfaceMetrics>,
    config: ViewportConfig,
    pending_scroll: Option<ScrollRequest>,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            state: ViewportState::IDENTITY,
            metrics: None,
            config,
            pending_scroll: None,
        }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn zoom(&self) -> f64 {
        self.state.zoom
    }

    pub fn metrics(&self) -> Option<&SurfaceMetrics> {
        self.metrics.as_ref()
    }

    /// Update the surface size; the current pan is re-clamped
    pub fn set_metrics(&mut self, metrics: SurfaceMetrics) -> bool {
        self.metrics = Some(metrics);
        self.update(self.state)
    }

    /// Clamp `z` into range and keep `anchor` (surface-local) visually fixed
    pub fn set_zoom(&mut self, z: f64, anchor: Option<Point>) -> bool {
        let old_zoom = self.state.zoom;
        let new_zoom = z.clamp(self.config.min_zoom, self.config.max_zoom);
        if (new_zoom - old_zoom).abs() <= f64::EPSILON {
            return false;
        }

        let mut next = ViewportState {
            zoom: new_zoom,
            ..self.state
        };
        if let Some(anchor) = anchor {
            let ratio = new_zoom / old_zoom;
            next.pan_x = anchor.x - (anchor.x - self.state.pan_x) * ratio;
            next.pan_y = anchor.y - (anchor.y - self.state.pan_y) * ratio;
        }
        tracing::debug!("[Viewport] Zoom {:.2} -> {:.2}", old_zoom, new_zoom);
        self.update(next)
    }

    pub fn zoom_in(&mut self, amount: Option<f64>, anchor: Option<Point>) -> bool {
        let step = amount.unwrap_or(self.config.zoom_step);
        self.set_zoom(self.state.zoom + step, anchor)
    }

    pub fn zoom_out(&mut self, amount: Option<f64>, anchor: Option<Point>) -> bool {
        let step = amount.unwrap_or(self.config.zoom_step);
        self.set_zoom(self.state.zoom - step, anchor)
    }

    pub fn set_pan(&mut self, x: f64, y: f64) -> bool {
        self.update(ViewportState {
            pan_x: x,
            pan_y: y,
            zoom: self.state.zoom,
        })
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
        self.set_pan(self.state.pan_x + dx, self.state.pan_y + dy)
    }

    /// Back to identity; drops any pending scroll
    pub fn reset(&mut self) -> bool {
        self.cancel_scroll();
        let changed = self.state != ViewportState::IDENTITY;
        self.state = ViewportState::IDENTITY;
        changed
    }

    fn update(&mut self, next: ViewportState) -> bool {
        let next = match &self.metrics {
            Some(metrics) => clamp_pan(next, metrics, self.config.pan_tolerance),
            None => next,
        };
        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// Whether `rect` is fully inside the visible surface
    pub fn is_visible(&self, rect: &Rect) -> bool {
        match &self.metrics {
            Some(metrics) => metrics.bounds().contains_rect(rect),
            None => true,
        }
    }

    /// Queue a bring-into-view for `node_id`, replacing any earlier request
    pub fn request_bring_into_view(&mut self, node_id: impl Into<String>, margin: Option<f64>) {
        self.pending_scroll = Some(ScrollRequest {
            node_id: node_id.into(),
            margin: margin.unwrap_or(self.config.bring_into_view_margin),
            passes_left: self.config.bring_into_view_passes,
        });
    }

    pub fn pending_scroll(&self) -> Option<&ScrollRequest> {
        self.pending_scroll.as_ref()
    }

    pub fn cancel_scroll(&mut self) {
        self.pending_scroll = None;
    }

    /// Run one bring-into-view pass against the current layout.
    ///
    /// Returns true if the pan changed. The request is dropped once it
    /// settles, runs out of passes, or its node is no longer rendered.
    pub fn step_bring_into_view(&mut self, layout: &dyn RenderedStructure) -> bool {
        let Some(mut request) = self.pending_scroll.take() else {
            return false;
        };
        let (Some(metrics), Some(rect)) = (self.metrics, layout.node_rect(&request.node_id)) else {
            return false;
        };

        let (dx, dy) = scroll_delta(&rect, &metrics.bounds(), request.margin);
        if dx.abs() < SETTLE_THRESHOLD && dy.abs() < SETTLE_THRESHOLD {
            return false;
        }

        let changed = self.pan_by(dx, dy);
        request.passes_left = request.passes_left.saturating_sub(1);
        if changed && request.passes_left > 0 {
            self.pending_scroll = Some(request);
        }
        changed
    }
}
