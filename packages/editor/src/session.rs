//! # Editing Session
//!
//! One open document and everything the editor tracks about it: selection,
//! history, autosave, inline editing and the viewport.
//!
//! All entry points run to completion synchronously. Deferred work is only
//! ever scheduled on a [`Debouncer`](crate::timer::Debouncer) and runs when
//! the host calls [`EditingSession::poll`]. Subscribers are notified once
//! each operation has finished.

use crate::autosave::{AutosaveScheduler, SaveOutcome};
use crate::config::EditorConfig;
use crate::document::{Comment, Document};
use crate::errors::EditorError;
use crate::events::{Listener, SessionEvent, SubscriptionId, Subscribers};
use crate::history::History;
use crate::id_generator::IdGenerator;
use crate::inline_edit::{InlineEditContext, InlineEditor};
use crate::layout::RenderedStructure;
use crate::mutations::{Mutation, MutationOutcome};
use crate::persistence::PersistenceBackend;
use crate::schema::SchemaRegistry;
use crate::selection::{
    capabilities, parent_target, resolve_target, Capabilities, SelectOrigin, SelectionState,
    SelectionTarget,
};
use crate::timer::{Clock, SystemClock};
use crate::toolbar::{compute_position, resolve_anchor, ToolbarPlacement};
use crate::viewport::{SurfaceMetrics, Viewport, ViewportState};
use folio_common::{Node, Point, Size};
use std::time::Instant;

/// Live editing state for one open document
pub struct EditingSession<B: PersistenceBackend, C: Clock = SystemClock> {
    config: EditorConfig,
    schema: SchemaRegistry,
    document: Document,
    ids: IdGenerator,
    selection: SelectionState,
    history: History,
    autosave: AutosaveScheduler,
    inline: InlineEditor,
    viewport: Viewport,
    backend: B,
    clock: C,
    subscribers: Subscribers,
}

impl<B: PersistenceBackend, C: Clock> EditingSession<B, C> {
    /// Load `document_id` from the backend and start a session on it
    pub fn open(
        document_id: &str,
        schema: SchemaRegistry,
        mut backend: B,
        clock: C,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        let payload = backend.load(document_id)?;
        let document = Document::from_payload(document_id, payload);
        Self::new(document, schema, backend, clock, config)
    }

    /// Start a session on an in-memory document
    pub fn new(
        document: Document,
        schema: SchemaRegistry,
        backend: B,
        clock: C,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        config.validate()?;

        let mut ids = IdGenerator::new(&document.id);
        ids.observe(document.roots());

        let mut history = History::new(&config.history);
        history.capture(document.roots())?;

        let mut autosave = AutosaveScheduler::new(&config.autosave);
        autosave.reset_baseline(&document, &schema)?;

        tracing::info!(
            "[Session] Opened {} ({} nodes, {} component types)",
            document.id,
            document.roots().iter().map(Node::subtree_len).sum::<usize>(),
            schema.len()
        );

        Ok(Self {
            inline: InlineEditor::new(config.inline_edit.clone()),
            viewport: Viewport::new(config.viewport.clone()),
            config,
            schema,
            document,
            ids,
            selection: SelectionState::None,
            history,
            autosave,
            backend,
            clock,
            subscribers: Subscribers::new(),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn inline_edit(&self) -> Option<&InlineEditContext> {
        self.inline.context()
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport.state()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) -> SubscriptionId {
        let listener: Listener = Box::new(listener);
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Select a node, or a region of it. Ends any inline edit first.
    ///
    /// Navigation from the tree or comment panels (or the keyboard) scrolls
    /// an off-screen target into view.
    pub fn select_node(
        &mut self,
        target: SelectionTarget,
        origin: SelectOrigin,
        layout: &dyn RenderedStructure,
    ) -> &SelectionState {
        self.finish_inline_edit();

        let resolved = resolve_target(self.document.roots(), layout, &target);
        if resolved.region().is_none() && target.region.is_some() && !resolved.is_none() {
            tracing::debug!(
                "[Selection] Region {:?} not rendered on {}, selecting node",
                target.region,
                target.node
            );
        }

        if origin.requests_scroll() {
            if let Some(rect) = resolved.node().and_then(|id| layout.node_rect(id)) {
                if !self.viewport.is_visible(&rect) {
                    self.viewport.request_bring_into_view(target.node.clone(), None);
                }
            }
        }

        self.set_selection(resolved);
        self.subscribers.flush();
        &self.selection
    }

    pub fn clear_selection(&mut self) {
        self.finish_inline_edit();
        self.set_selection(SelectionState::None);
        self.subscribers.flush();
    }

    /// Where "select parent" would go from the current selection
    pub fn select_parent_target(&self) -> Option<SelectionTarget> {
        parent_target(
            self.document.roots(),
            &self.schema,
            &self.selection,
            self.config.selection.parent_fallback,
        )
    }

    pub fn can_select_parent(&self) -> bool {
        self.select_parent_target().is_some()
    }

    /// Move the selection one level out. Returns false if there is nowhere to go.
    pub fn select_parent(&mut self, layout: &dyn RenderedStructure) -> bool {
        let Some(target) = self.select_parent_target() else {
            return false;
        };
        self.select_node(target, SelectOrigin::Programmatic, layout);
        true
    }

    /// Re-validate the selection against the current rendered structure
    pub fn refresh_selection(&mut self, layout: &dyn RenderedStructure) {
        let target = match &self.selection {
            SelectionState::None => return,
            SelectionState::Node { node } => SelectionTarget::node(node.clone()),
            SelectionState::Region { node, region } => SelectionTarget::region(node.clone(), region.clone()),
        };
        let resolved = resolve_target(self.document.roots(), layout, &target);
        self.set_selection(resolved);
        self.subscribers.flush();
    }

    /// Capability flags for the selected node
    pub fn capabilities(&self) -> Capabilities {
        match self.selection.node() {
            Some(node_id) => self.capabilities_of(node_id),
            None => Capabilities::default(),
        }
    }

    pub fn capabilities_of(&self, node_id: &str) -> Capabilities {
        capabilities(
            self.document.roots(),
            &self.schema,
            &self.selection,
            node_id,
            self.config.selection.parent_fallback,
        )
    }

    fn set_selection(&mut self, selection: SelectionState) {
        if self.selection != selection {
            tracing::debug!("[Selection] {:?}", selection);
            self.selection = selection.clone();
            self.subscribers.queue(SessionEvent::SelectionChanged(selection));
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Apply any mutation, then schedule a snapshot and an autosave
    pub fn apply(&mut self, mutation: Mutation) -> Result<MutationOutcome, EditorError> {
        let outcome = mutation.apply(&mut self.document, &self.schema, &mut self.ids)?;
        match &outcome {
            MutationOutcome::Applied(result) => {
                tracing::debug!("[Session] Applied {:?} (v{})", mutation, result.version);
                self.after_content_change(true);
            }
            MutationOutcome::Rejected(rejection) => {
                tracing::warn!("[Session] Rejected {:?}: {:?}", mutation, rejection);
            }
        }
        self.subscribers.flush();
        Ok(outcome)
    }

    /// Duplicate the selected node and select the copy
    pub fn duplicate(&mut self) -> Result<Option<MutationOutcome>, EditorError> {
        let Some(node_id) = self.selection.node().map(str::to_string) else {
            return Ok(None);
        };
        self.finish_inline_edit();
        let outcome = self.apply(Mutation::DuplicateNode { node_id })?;
        if let Some(created) = outcome.created() {
            self.set_selection(SelectionState::Node {
                node: created.to_string(),
            });
            self.subscribers.flush();
        }
        Ok(Some(outcome))
    }

    pub fn delete(&mut self) -> Result<Option<MutationOutcome>, EditorError> {
        let Some(node_id) = self.selection.node().map(str::to_string) else {
            return Ok(None);
        };
        self.finish_inline_edit();
        self.apply(Mutation::RemoveNode { node_id }).map(Some)
    }

    pub fn move_before(&mut self) -> Result<Option<MutationOutcome>, EditorError> {
        let Some(node_id) = self.selection.node().map(str::to_string) else {
            return Ok(None);
        };
        self.apply(Mutation::MoveBefore { node_id }).map(Some)
    }

    pub fn move_after(&mut self) -> Result<Option<MutationOutcome>, EditorError> {
        let Some(node_id) = self.selection.node().map(str::to_string) else {
            return Ok(None);
        };
        self.apply(Mutation::MoveAfter { node_id }).map(Some)
    }

    pub fn set_comments(&mut self, comments: Vec<Comment>) {
        self.document.set_comments(comments);
        self.autosave.schedule(self.clock.now());
        self.subscribers.flush();
    }

    fn after_content_change(&mut self, record: bool) {
        let now = self.clock.now();
        if record && self.history.schedule(now) {
            tracing::debug!("[History] Snapshot scheduled");
        }
        self.autosave.schedule(now);
        self.reconcile();
        self.subscribers.queue(SessionEvent::ContentChanged {
            version: self.document.version,
        });
    }

    /// Repair session state after the tree changed underneath it
    fn reconcile(&mut self) {
        let orphaned = self
            .inline
            .context()
            .is_some_and(|ctx| !self.document.contains(&ctx.node_id));
        if orphaned {
            if let Some(ctx) = self.inline.abandon() {
                tracing::debug!("[InlineEdit] {} removed while editing", ctx.node_id);
                self.subscribers
                    .queue(SessionEvent::InlineEditCancelled { node_id: ctx.node_id });
            }
        }

        let repaired = match &self.selection {
            SelectionState::None => SelectionState::None,
            SelectionState::Node { node } | SelectionState::Region { node, .. }
                if !self.document.contains(node) =>
            {
                SelectionState::None
            }
            SelectionState::Region { node, region } => {
                let declared = self
                    .document
                    .find(node)
                    .and_then(|n| self.schema.region_of(n, region))
                    .is_some();
                if declared {
                    self.selection.clone()
                } else {
                    SelectionState::Node { node: node.clone() }
                }
            }
            SelectionState::Node { .. } => self.selection.clone(),
        };
        self.set_selection(repaired);
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Restore the previous snapshot. Returns false if there is none.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        self.prepare_replay()?;
        let Some(snapshot) = self.history.undo(self.clock.now()) else {
            return Ok(false);
        };
        self.restore(snapshot.restore()?);
        tracing::info!("[History] Undo ({} levels left)", self.history.undo_levels());
        self.subscribers.flush();
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        self.prepare_replay()?;
        let Some(snapshot) = self.history.redo(self.clock.now()) else {
            return Ok(false);
        };
        self.restore(snapshot.restore()?);
        tracing::info!("[History] Redo ({} levels left)", self.history.redo_levels());
        self.subscribers.flush();
        Ok(true)
    }

    /// A pending capture is flushed so the step being undone is on the stack
    fn prepare_replay(&mut self) -> Result<(), EditorError> {
        if self.inline.abandon().is_some() {
            tracing::debug!("[InlineEdit] Ended by history replay");
        }
        if self.history.has_pending() {
            self.history.cancel_pending();
            if self.history.capture(self.document.roots())? {
                self.queue_history_changed();
            }
        }
        Ok(())
    }

    fn restore(&mut self, roots: Vec<Node>) {
        self.document.replace_roots(roots);
        self.ids.observe(self.document.roots());
        self.set_selection(SelectionState::None);
        self.after_content_change(false);
        self.queue_history_changed();
    }

    fn queue_history_changed(&mut self) {
        self.subscribers.queue(SessionEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    // ------------------------------------------------------------------
    // Inline editing
    // ------------------------------------------------------------------

    /// Start editing the selected node in place. Returns the edit target id.
    pub fn enable_inline_edit(&mut self) -> Result<String, EditorError> {
        self.finish_inline_edit();
        let version = self.document.version;
        let ctx = self
            .inline
            .enable(&mut self.document, &self.schema, &self.selection, &mut self.ids)?;
        let event = SessionEvent::InlineEditStarted {
            node_id: ctx.node_id.clone(),
            target_id: ctx.target.id().to_string(),
        };
        let target_id = ctx.target.id().to_string();

        if self.document.version != version {
            self.subscribers.queue(SessionEvent::ContentChanged {
                version: self.document.version,
            });
        }
        self.subscribers.queue(event);
        self.subscribers.flush();
        Ok(target_id)
    }

    pub fn inline_set_text(&mut self, text: &str) -> Result<bool, EditorError> {
        let changed = self.inline.set_text(&mut self.document, &mut self.ids, text)?;
        if changed {
            self.after_content_change(true);
        }
        self.subscribers.flush();
        Ok(changed)
    }

    pub fn inline_apply_format(&mut self, format: &str) -> Result<bool, EditorError> {
        let changed = self.inline.apply_format(&mut self.document, &mut self.ids, format)?;
        if changed {
            self.after_content_change(true);
        }
        self.subscribers.flush();
        Ok(changed)
    }

    /// Leave inline editing keeping the content. Returns false if no edit
    /// was active.
    pub fn commit_inline_edit(&mut self) -> bool {
        let committed = self.finish_inline_edit();
        self.subscribers.flush();
        committed
    }

    /// Leave inline editing restoring the content from before it began
    pub fn cancel_inline_edit(&mut self) -> bool {
        let Some(ctx) = self.inline.cancel(&mut self.document) else {
            return false;
        };
        self.history.cancel_pending();
        // The revert itself must not trigger a save
        self.autosave.suppress_next();
        self.after_content_change(false);
        self.subscribers
            .queue(SessionEvent::InlineEditCancelled { node_id: ctx.node_id });
        self.subscribers.flush();
        true
    }

    fn finish_inline_edit(&mut self) -> bool {
        let Some((ctx, released)) = self.inline.commit(&mut self.document) else {
            return false;
        };
        if released {
            self.after_content_change(true);
        }
        self.subscribers
            .queue(SessionEvent::InlineEditCommitted { node_id: ctx.node_id });
        true
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    /// Run every deferred job whose deadline has passed.
    ///
    /// A failed autosave is returned as an error after `SaveFailed` has been
    /// delivered; the session stays usable.
    pub fn poll(&mut self) -> Result<(), EditorError> {
        let now = self.clock.now();

        self.history.release_guard(now);

        if self.history.take_due_snapshot(now) && self.history.capture(self.document.roots())? {
            self.queue_history_changed();
        }

        let saved = if self.autosave.take_due(now) {
            self.perform_save(now)
        } else {
            Ok(())
        };

        self.autosave.expire_indicator(now);
        self.subscribers.flush();
        saved
    }

    /// Earliest pending deadline, for arming a host timer
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.history.guard_deadline(),
            self.history.snapshot_deadline(),
            self.autosave.save_deadline(),
            self.autosave.indicator_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn has_unsaved_changes(&self) -> Result<bool, EditorError> {
        Ok(self.autosave.has_unsaved_changes(&self.document, &self.schema)?)
    }

    /// Save immediately, skipping the debounce
    pub fn save_now(&mut self) -> Result<SaveOutcome, EditorError> {
        let now = self.clock.now();
        let result = self
            .autosave
            .perform(&self.document, &self.schema, &mut self.backend, now);
        self.queue_save_result(&result);
        self.subscribers.flush();
        result
    }

    pub fn saved_recently(&self) -> bool {
        self.autosave.saved_recently()
    }

    fn perform_save(&mut self, now: Instant) -> Result<(), EditorError> {
        let result = self
            .autosave
            .perform(&self.document, &self.schema, &mut self.backend, now);
        self.queue_save_result(&result);
        result.map(|_| ())
    }

    fn queue_save_result(&mut self, result: &Result<SaveOutcome, EditorError>) {
        match result {
            Ok(SaveOutcome::Saved { at }) => self.subscribers.queue(SessionEvent::Saved { at: *at }),
            Ok(SaveOutcome::Unchanged) => {}
            Err(e) => {
                tracing::warn!("[Autosave] Save of {} failed: {}", self.document.id, e);
                self.subscribers.queue(SessionEvent::SaveFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    pub fn set_surface_metrics(&mut self, metrics: SurfaceMetrics) {
        let changed = self.viewport.set_metrics(metrics);
        self.viewport_updated(changed);
    }

    pub fn set_zoom(&mut self, zoom: f64, anchor: Option<Point>) {
        let changed = self.viewport.set_zoom(zoom, anchor);
        self.viewport_updated(changed);
    }

    pub fn zoom_in(&mut self, amount: Option<f64>, anchor: Option<Point>) {
        let changed = self.viewport.zoom_in(amount, anchor);
        self.viewport_updated(changed);
    }

    pub fn zoom_out(&mut self, amount: Option<f64>, anchor: Option<Point>) {
        let changed = self.viewport.zoom_out(amount, anchor);
        self.viewport_updated(changed);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let changed = self.viewport.pan_by(dx, dy);
        self.viewport_updated(changed);
    }

    pub fn reset_viewport(&mut self) {
        let changed = self.viewport.reset();
        self.viewport_updated(changed);
    }

    /// Queue a bring-into-view for `node_id`; it runs on animation frames
    pub fn bring_into_view(&mut self, node_id: &str, margin: Option<f64>) {
        self.viewport.request_bring_into_view(node_id, margin);
    }

    /// Advance a pending bring-into-view by one pass. Returns true if the
    /// viewport moved.
    pub fn on_animation_frame(&mut self, layout: &dyn RenderedStructure) -> bool {
        let changed = self.viewport.step_bring_into_view(layout);
        self.viewport_updated(changed);
        changed
    }

    pub fn scroll_pending(&self) -> bool {
        self.viewport.pending_scroll().is_some()
    }

    fn viewport_updated(&mut self, changed: bool) {
        if changed {
            self.subscribers
                .queue(SessionEvent::ViewportChanged(self.viewport.state()));
        }
        self.subscribers.flush();
    }

    // ------------------------------------------------------------------
    // Toolbar
    // ------------------------------------------------------------------

    /// Where the contextual toolbar goes for the current selection
    pub fn toolbar_position(
        &self,
        layout: &dyn RenderedStructure,
        toolbar: Size,
        viewport: Size,
    ) -> Option<ToolbarPlacement> {
        let anchor = resolve_anchor(&self.selection, layout)?;
        Some(compute_position(&anchor, toolbar, viewport, &self.config.toolbar))
    }
}

impl<B: PersistenceBackend, C: Clock> std::fmt::Debug for EditingSession<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSession")
            .field("document", &self.document.id)
            .field("version", &self.document.version)
            .field("selection", &self.selection)
            .field("inline", self.inline.state())
            .field("viewport", &self.viewport.state())
            .finish()
    }
}
