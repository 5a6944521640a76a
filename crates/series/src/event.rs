//! Change notification for series mutations.
//!
//! Every driving operation (bulk load, live update, recompute, truncation)
//! announces the time range it touched. Delivery is synchronous on the
//! mutator's thread, after the series data lock has been released, so
//! subscribers may read the series but must not block indefinitely.

use std::sync::Arc;

/// What kind of mutation a [`SeriesEvent`] announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesEventKind {
    /// Everything may have changed; re-read from scratch.
    Refresh,
    /// A bulk load finished for the carried range.
    FinishedLoad,
    /// Rows in the carried range were updated in place.
    Updated,
    /// A computation pass finished for the carried range.
    FinishedCompute,
    /// Rows at/after `from_time` were dropped.
    Clear,
}

/// A structural-change announcement with the affected time range (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesEvent {
    /// Mutation kind.
    pub kind: SeriesEventKind,
    /// Earliest affected time (epoch ms).
    pub from_time: i64,
    /// Latest affected time (epoch ms).
    pub to_time: i64,
}

impl SeriesEvent {
    /// Creates an event for the inclusive range `[from_time, to_time]`.
    #[must_use]
    pub fn new(kind: SeriesEventKind, from_time: i64, to_time: i64) -> Self {
        Self {
            kind,
            from_time,
            to_time,
        }
    }
}

/// Token returned by `subscribe`; pass back to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

pub(crate) type Listener = Arc<dyn Fn(&SeriesEvent) + Send + Sync>;

/// Subscriber registry. Kept apart from the series data lock so listeners
/// can read the series while being notified.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    subs: Vec<(SubscriptionId, Listener)>,
}

impl Listeners {
    pub(crate) fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subs.push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subs.len();
        self.subs.retain(|(sid, _)| *sid != id);
        self.subs.len() != before
    }

    /// Snapshot for delivery outside the registry lock.
    pub(crate) fn snapshot(&self) -> Vec<Listener> {
        self.subs.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}
