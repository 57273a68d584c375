//! Per-tablet write slots.
//!
//! A tablet accepts at most one open writer at a time. Writers acquire their
//! slot in `open` and hold a [`WriteSlot`] guard until they are closed or
//! dropped.

use std::{collections::HashSet, fmt, sync::Arc};

use parking_lot::Mutex;

use crate::id::TabletId;

/// Registry of tablets that currently have an open writer.
#[derive(Default)]
pub struct TabletSlots {
    held: Mutex<HashSet<TabletId>>,
}

impl TabletSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the write slot for `tablet_id`, or `None` if another writer holds it.
    pub fn try_acquire(self: &Arc<Self>, tablet_id: TabletId) -> Option<WriteSlot> {
        let mut held = self.held.lock();
        if !held.insert(tablet_id) {
            return None;
        }
        Some(WriteSlot {
            slots: Arc::clone(self),
            tablet_id,
        })
    }

    pub fn is_held(&self, tablet_id: TabletId) -> bool {
        self.held.lock().contains(&tablet_id)
    }

    pub fn len(&self) -> usize {
        self.held.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TabletSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabletSlots")
            .field("held", &self.len())
            .finish()
    }
}

/// Exclusive right to write one tablet; released on drop.
pub struct WriteSlot {
    slots: Arc<TabletSlots>,
    tablet_id: TabletId,
}

impl WriteSlot {
    pub fn tablet_id(&self) -> TabletId {
        self.tablet_id
    }
}

impl fmt::Debug for WriteSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSlot")
            .field("tablet_id", &self.tablet_id)
            .finish()
    }
}

impl Drop for WriteSlot {
    fn drop(&mut self) {
        self.slots.held.lock().remove(&self.tablet_id);
    }
}
