//! Free list of builder storage.
//!
//! [`Builder`](crate::Builder) handles borrow a boxed [`Draft`] from a pool
//! and hand it back, cleared, after a non-singleton send. Reusing the boxes
//! keeps the subject, body and recipient buffers allocated between messages.

use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use tracing::trace;

use crate::address::Address;

/// Bodies whose buffers grew past this are shrunk before being parked.
const MAX_RETAINED_BODY: usize = 1 << 20;

static GLOBAL: LazyLock<Arc<BuilderPool>> = LazyLock::new(|| Arc::new(BuilderPool::new()));

/// The mutable state behind a builder.
#[derive(Debug, Default)]
pub(crate) struct Draft {
    pub(crate) from: Option<Address>,
    pub(crate) subject: String,
    pub(crate) body: Vec<u8>,
    pub(crate) recipients: Vec<String>,
    pub(crate) singleton: bool,
}

impl Draft {
    /// Clears every field, keeping buffer capacity.
    pub(crate) fn reset(&mut self) {
        self.from = None;
        self.subject.clear();
        self.body.clear();
        if self.body.capacity() > MAX_RETAINED_BODY {
            self.body.shrink_to(MAX_RETAINED_BODY);
        }
        self.recipients.clear();
        self.singleton = false;
    }

    pub(crate) fn is_clear(&self) -> bool {
        self.from.is_none()
            && self.subject.is_empty()
            && self.body.is_empty()
            && self.recipients.is_empty()
            && !self.singleton
    }
}

/// Thread-safe pool of builder storage.
///
/// One process-wide pool ([`BuilderPool::global`]) is shared by every
/// [`Mail`](crate::Mail) unless it is given its own. At most `capacity`
/// idle drafts are kept; extra ones are dropped on release.
#[derive(Debug)]
pub struct BuilderPool {
    idle: Mutex<Vec<Box<Draft>>>,
    capacity: usize,
}

impl BuilderPool {
    /// Idle drafts kept by [`BuilderPool::new`].
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Creates an empty pool holding up to [`Self::DEFAULT_CAPACITY`] idle
    /// drafts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates an empty pool holding up to `capacity` idle drafts.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Returns the process-wide pool.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Returns the number of idle drafts waiting for reuse.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Returns the idle limit.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every idle draft.
    pub fn clear(&self) {
        self.idle.lock().clear();
    }

    /// Takes an idle draft or allocates a new one. The result is always
    /// cleared.
    pub(crate) fn acquire(&self) -> Box<Draft> {
        let recycled = self.idle.lock().pop();
        recycled.map_or_else(
            || {
                trace!("Allocating builder storage");
                Box::default()
            },
            |draft| {
                debug_assert!(draft.is_clear());
                draft
            },
        )
    }

    /// Clears `draft` and parks it for reuse.
    pub(crate) fn release(&self, mut draft: Box<Draft>) {
        draft.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(draft);
        }
    }
}

impl Default for BuilderPool {
    fn default() -> Self {
        Self::new()
    }
}
