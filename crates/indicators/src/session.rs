//! Computation-pass generation ids.
//!
//! A session id scopes memoization validity to one `compute_from` pass. The
//! id is an explicit value threaded through every arena call rather than an
//! ambient global: whoever starts the pass mints the id and hands it down.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generation key for one computation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// The never-computed sentinel; strictly less than any minted id.
    pub const NONE: SessionId = SessionId(0);
}

/// Monotone session id source, one per compute engine.
#[derive(Debug, Default)]
pub struct SessionCounter {
    last: AtomicU64,
}

impl SessionCounter {
    /// Creates a counter whose first minted id is greater than
    /// [`SessionId::NONE`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints the next session id; strictly greater than every earlier one.
    pub fn begin(&self) -> SessionId {
        SessionId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
