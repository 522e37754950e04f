//! Session events and their subscribers.

use crate::selection::SelectionState;
use crate::viewport::ViewportState;
use chrono::{DateTime, Utc};

/// Emitted after a state-changing session operation completes
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SelectionChanged(SelectionState),
    ContentChanged { version: u64 },
    HistoryChanged { can_undo: bool, can_redo: bool },
    ViewportChanged(ViewportState),
    InlineEditStarted { node_id: String, target_id: String },
    InlineEditCommitted { node_id: String },
    InlineEditCancelled { node_id: String },
    Saved { at: DateTime<Utc> },
    SaveFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Box<dyn FnMut(&SessionEvent)>;

/// Listeners in subscription order, plus events waiting to be delivered
#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
    queued: Vec<SessionEvent>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Hold an event until the running operation finishes
    pub fn queue(&mut self, event: SessionEvent) {
        // A repeat overwrites the earlier event in its original slot
        match self.queued.iter_mut().find(|e| same_kind(e, &event)) {
            Some(slot) => *slot = event,
            None => self.queued.push(event),
        }
    }

    /// Deliver queued events to every listener, in order
    pub fn flush(&mut self) {
        let events = std::mem::take(&mut self.queued);
        for event in &events {
            for (_, listener) in self.listeners.iter_mut() {
                listener(event);
            }
        }
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("listeners", &self.listeners.len())
            .field("queued", &self.queued)
            .finish()
    }
}

fn same_kind(a: &SessionEvent, b: &SessionEvent) -> bool {
    use SessionEvent::*;
    matches!(
        (a, b),
        (SelectionChanged(_), SelectionChanged(_))
            | (ContentChanged { .. }, ContentChanged { .. })
            | (HistoryChanged { .. }, HistoryChanged { .. })
            | (ViewportChanged(_), ViewportChanged(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<SessionEvent>>>, Listener) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, Box::new(move |e: &SessionEvent| sink.borrow_mut().push(e.clone())))
    }

    #[test]
    fn test_flush_delivers_in_order() {
        let (seen, listener) = recorder();
        let mut subscribers = Subscribers::new();
        subscribers.subscribe(listener);

        subscribers.queue(SessionEvent::ContentChanged { version: 1 });
        subscribers.queue(SessionEvent::InlineEditCommitted {
            node_id: "a".to_string(),
        });
        assert!(seen.borrow().is_empty());

        subscribers.flush();
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[0], SessionEvent::ContentChanged { version: 1 });
    }

    #[test]
    fn test_repeated_state_events_collapse() {
        let (seen, listener) = recorder();
        let mut subscribers = Subscribers::new();
        subscribers.subscribe(listener);

        subscribers.queue(SessionEvent::ContentChanged { version: 1 });
        subscribers.queue(SessionEvent::ContentChanged { version: 2 });
        subscribers.flush();

        assert_eq!(*seen.borrow(), vec![SessionEvent::ContentChanged { version: 2 }]);
    }

    #[test]
    fn test_collapsed_event_keeps_its_position() {
        let (seen, listener) = recorder();
        let mut subscribers = Subscribers::new();
        subscribers.subscribe(listener);

        subscribers.queue(SessionEvent::ContentChanged { version: 1 });
        subscribers.queue(SessionEvent::InlineEditCommitted {
            node_id: "a".to_string(),
        });
        subscribers.queue(SessionEvent::ContentChanged { version: 2 });
        subscribers.flush();

        assert_eq!(
            *seen.borrow(),
            vec![
                SessionEvent::ContentChanged { version: 2 },
                SessionEvent::InlineEditCommitted {
                    node_id: "a".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let (seen, listener) = recorder();
        let mut subscribers = Subscribers::new();
        let id = subscribers.subscribe(listener);

        assert!(subscribers.unsubscribe(id));
        assert!(!subscribers.unsubscribe(id));
        subscribers.queue(SessionEvent::ContentChanged { version: 1 });
        subscribers.flush();
        assert!(seen.borrow().is_empty());
    }
}
