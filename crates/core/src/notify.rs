//! Cursor change notifications.
//!
//! Hosts register a [`CursorObserver`] and get a [`CursorChanged`] after each
//! cursor mutation, synchronously, before the mutating call returns.

use serde::{Deserialize, Serialize};

use crate::types::{QueueId, SlotIndex};

/// A cursor moved (or was set) to `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorChanged {
    pub queue: QueueId,
    pub position: SlotIndex,
}

pub trait CursorObserver {
    fn cursor_changed(&mut self, event: CursorChanged);
}

impl<F> CursorObserver for F
where
    F: FnMut(CursorChanged),
{
    fn cursor_changed(&mut self, event: CursorChanged) {
        self(event)
    }
}

/// Handle returned by [`Observers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Observer registry, notified in subscription order.
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Box<dyn CursorObserver + Send>)>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn CursorObserver + Send>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(sid, _)| *sid != id);
        self.entries.len() != before
    }

    pub fn emit(&mut self, event: CursorChanged) {
        for (_, observer) in self.entries.iter_mut() {
            observer.cursor_changed(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}
