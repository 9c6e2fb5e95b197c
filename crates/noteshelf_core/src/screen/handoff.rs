//! Pending-result slot shared between the list screen and the screens it opens.
//!
//! # Invariants
//! - One value per key; publishing again overwrites the previous value.
//! - `take`/`take_all` clear what they return, so each value is consumed once.

use crate::model::note::NoteId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandoffKey {
    NoteAdded,
    NoteUpdated,
    RefreshRequested,
}

/// Result published by a child screen for the list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingResult {
    NoteAdded(NoteId),
    NoteUpdated(NoteId),
    RefreshRequested,
}

impl PendingResult {
    pub fn key(&self) -> HandoffKey {
        match self {
            Self::NoteAdded(_) => HandoffKey::NoteAdded,
            Self::NoteUpdated(_) => HandoffKey::NoteUpdated,
            Self::RefreshRequested => HandoffKey::RefreshRequested,
        }
    }
}

#[derive(Debug, Default)]
struct Slots {
    added: Option<NoteId>,
    updated: Option<NoteId>,
    refresh: bool,
}

/// Cloneable handle to the list screen's pending-result slot.
#[derive(Debug, Clone, Default)]
pub struct ResultSlot {
    inner: Arc<Mutex<Slots>>,
}

impl ResultSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, result: PendingResult) {
        let mut slots = self.lock();
        match result {
            PendingResult::NoteAdded(id) => slots.added = Some(id),
            PendingResult::NoteUpdated(id) => slots.updated = Some(id),
            PendingResult::RefreshRequested => slots.refresh = true,
        }
    }

    /// Consumes the value stored under `key`, if any.
    pub fn take(&self, key: HandoffKey) -> Option<PendingResult> {
        let mut slots = self.lock();
        match key {
            HandoffKey::NoteAdded => slots.added.take().map(PendingResult::NoteAdded),
            HandoffKey::NoteUpdated => slots.updated.take().map(PendingResult::NoteUpdated),
            HandoffKey::RefreshRequested => {
                std::mem::take(&mut slots.refresh).then_some(PendingResult::RefreshRequested)
            }
        }
    }

    /// Consumes every pending value in added, updated, refresh order.
    pub fn take_all(&self) -> Vec<PendingResult> {
        [
            HandoffKey::NoteAdded,
            HandoffKey::NoteUpdated,
            HandoffKey::RefreshRequested,
        ]
        .into_iter()
        .filter_map(|key| self.take(key))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        let slots = self.lock();
        slots.added.is_none() && slots.updated.is_none() && !slots.refresh
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
