//! Heap handles and the slot-to-position table behind them.
//!
//! A [`Handle`] names one item in an [`IntervalHeap`](crate::IntervalHeap).
//! The heap array stores each item next to its handle slot; the table here
//! maps the slot back to the item's current array position. Every move the
//! heap makes writes the new position back through
//! [`relocate`](HandleTable::relocate), so a live handle always resolves in
//! O(1).

use tracing::trace;

use crate::slot::{OwnerId, SlotTable, Tag};
use crate::{Error, Result};

/// Opaque, copyable reference to an item in an
/// [`IntervalHeap`](crate::IntervalHeap).
///
/// A handle is live from the insert that returned it until its item leaves
/// the heap through `remove`, `pop_min`, `pop_max` or `clear`. Dead handles
/// stay dead: a later insert never makes an old handle resolve again, unless
/// that handle is passed back explicitly to
/// [`insert_reusing`](crate::IntervalHeap::insert_reusing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub(crate) Tag);

#[derive(Debug)]
pub(crate) struct HandleTable {
    positions: SlotTable<usize>,
    owner: OwnerId,
}

impl HandleTable {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: SlotTable::with_capacity(capacity),
            owner: OwnerId::next(),
        }
    }

    /// Mints a fresh handle for an item at array position `pos`.
    pub(crate) fn mint(&mut self, pos: usize) -> Handle {
        let (slot, generation) = self.positions.insert(pos);
        self.token(slot, generation)
    }

    /// Binds `handle` to a new item at `pos` if it is dead and its slot was
    /// not recycled since. Otherwise mints a fresh handle.
    pub(crate) fn reuse(&mut self, handle: Handle, pos: usize) -> Handle {
        if handle.0.owner != self.owner {
            return self.mint(pos);
        }
        match self.positions.revive(handle.0.slot, handle.0.generation, pos) {
            Ok(generation) => {
                trace!(slot = handle.0.slot, generation, "handle revived");
                self.token(handle.0.slot, generation)
            }
            Err(pos) => self.mint(pos),
        }
    }

    /// Current array position of `handle`'s item.
    #[inline]
    pub(crate) fn position(&self, handle: Handle) -> Result<usize> {
        if handle.0.owner != self.owner {
            return Err(Error::InvalidReference);
        }
        self.positions
            .get(handle.0.slot, handle.0.generation)
            .copied()
            .ok_or(Error::InvalidReference)
    }

    #[inline]
    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.position(handle).is_ok()
    }

    /// Records that the item owning `slot` now sits at `pos`.
    #[inline]
    pub(crate) fn relocate(&mut self, slot: u32, pos: usize) {
        if let Some(entry) = self.positions.record_mut(slot) {
            *entry = pos;
        }
    }

    /// Position recorded for `slot`, if live. Used by invariant checks.
    #[inline]
    pub(crate) fn recorded(&self, slot: u32) -> Option<usize> {
        self.positions.record(slot).copied()
    }

    /// Kills the handle owning `slot`.
    #[inline]
    pub(crate) fn release(&mut self, slot: u32) {
        self.positions.release(slot);
    }

    /// Kills every live handle.
    pub(crate) fn release_all(&mut self) {
        self.positions.retain_mut(|_, _| false);
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }

    /// Rebuilds the public token for the live item owning `slot`.
    #[inline]
    pub(crate) fn handle_of(&self, slot: u32) -> Handle {
        self.token(slot, self.positions.generation(slot))
    }

    #[inline]
    fn token(&self, slot: u32, generation: u32) -> Handle {
        Handle(Tag {
            slot,
            generation,
            owner: self.owner,
        })
    }
}
