//! # Autosave Scheduler
//!
//! Debounced writes of the sanitized document. A write only happens when the
//! normalized content or the normalized comment list differs from the
//! baseline, and the baseline moves only after the backend confirms the save.

use crate::config::AutosaveConfig;
use crate::document::{Comment, Document};
use crate::errors::EditorError;
use crate::persistence::PersistenceBackend;
use crate::schema::SchemaRegistry;
use crate::timer::Debouncer;
use chrono::{DateTime, Utc};
use std::time::Instant;

/// Last persisted state, normalized
#[derive(Debug, Clone, Default, PartialEq)]
struct Baseline {
    content: String,
    comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved { at: DateTime<Utc> },
    /// Nothing differed from the baseline
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct AutosaveScheduler {
    timer: Debouncer,
    saved_indicator: Debouncer,
    baseline: Baseline,
    suppress_next: bool,
    last_saved_at: Option<DateTime<Utc>>,
}

impl AutosaveScheduler {
    pub fn new(config: &AutosaveConfig) -> Self {
        Self {
            timer: Debouncer::new(config.debounce()),
            saved_indicator: Debouncer::new(config.saved_indicator()),
            baseline: Baseline::default(),
            suppress_next: false,
            last_saved_at: None,
        }
    }

    /// Record the document as it was loaded
    pub fn reset_baseline(&mut self, doc: &Document, schema: &SchemaRegistry) -> Result<(), serde_json::Error> {
        self.baseline = Baseline {
            content: doc.normalized_content(schema)?,
            comments: doc.normalized_comments(),
        };
        self.timer.cancel();
        self.suppress_next = false;
        Ok(())
    }

    /// Arm (or re-arm) the save debounce. Returns false if the request was
    /// swallowed by a pending suppression.
    pub fn schedule(&mut self, now: Instant) -> bool {
        if self.suppress_next {
            self.suppress_next = false;
            tracing::debug!("[Autosave] Suppressed save request");
            return false;
        }
        self.timer.arm(now);
        true
    }

    /// Swallow the next `schedule` call
    pub fn suppress_next(&mut self) {
        self.suppress_next = true;
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn take_due(&mut self, now: Instant) -> bool {
        self.timer.take_due(now)
    }

    /// Compare against the baseline and write if anything differs
    pub fn perform(
        &mut self,
        doc: &Document,
        schema: &SchemaRegistry,
        backend: &mut dyn PersistenceBackend,
        now: Instant,
    ) -> Result<SaveOutcome, EditorError> {
        self.timer.cancel();

        let current = Baseline {
            content: doc.normalized_content(schema)?,
            comments: doc.normalized_comments(),
        };
        let content_changed = current.content != self.baseline.content;
        let comments_changed = current.comments != self.baseline.comments;
        if !content_changed && !comments_changed {
            tracing::debug!("[Autosave] No changes for {}, skipping write", doc.id);
            return Ok(SaveOutcome::Unchanged);
        }

        backend.save(&doc.id, &doc.payload(schema))?;

        let at = Utc::now();
        self.baseline = current;
        self.last_saved_at = Some(at);
        self.saved_indicator.arm(now);
        tracing::info!(
            "[Autosave] Saved {} (content: {}, comments: {})",
            doc.id,
            content_changed,
            comments_changed
        );
        Ok(SaveOutcome::Saved { at })
    }

    /// Whether the sanitized content differs from what was last persisted
    pub fn has_unsaved_changes(&self, doc: &Document, schema: &SchemaRegistry) -> Result<bool, serde_json::Error> {
        Ok(doc.normalized_content(schema)? != self.baseline.content
            || doc.normalized_comments() != self.baseline.comments)
    }

    /// True for a short window after each successful write
    pub fn saved_recently(&self) -> bool {
        self.saved_indicator.is_pending()
    }

    /// Hide the "saved" indicator once its window has passed
    pub fn expire_indicator(&mut self, now: Instant) -> bool {
        self.saved_indicator.take_due(now)
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    pub fn save_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn indicator_deadline(&self) -> Option<Instant> {
        self.saved_indicator.deadline()
    }
}
