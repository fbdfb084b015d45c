//! Generation-checked slot table shared by views and handles.
//!
//! Views and heap handles are both external tokens naming a record that
//! the owning collection keeps in a flat table. A token is `(slot,
//! generation, owner)`. It resolves only while the slot is live, the
//! generation matches and the owner is the collection being asked.
//!
//! Killing a slot happens exactly once: the record is dropped and the slot
//! goes on a free stack (LIFO reuse, same discipline as slab storage). The
//! generation is bumped when the slot is handed out again, so a token for
//! the previous occupant never resolves to the next one.
//!
//! ```text
//!   insert ──► Live(gen g) ──kill──► Free(gen g) ──insert──► Live(gen g+1)
//!                                        │
//!                                        └──revive(g)──► Live(gen g+1)
//! ```
//!
//! A slot whose generation reached `u32::MAX` is retired instead of freed,
//! since the next bump would wrap and resurrect stale tokens.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

/// Identity of one collection instance. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OwnerId(u64);

impl OwnerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        OwnerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The raw parts of an external token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Tag {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
    pub(crate) owner: OwnerId,
}

#[derive(Debug)]
enum Occupant<R> {
    Live(R),
    /// Position of this slot inside the free stack.
    Free(u32),
    Retired,
}

#[derive(Debug)]
struct Entry<R> {
    generation: u32,
    occupant: Occupant<R>,
}

/// Flat table of records addressed by `(slot, generation)`.
#[derive(Debug)]
pub(crate) struct SlotTable<R> {
    entries: Vec<Entry<R>>,
    free: Vec<u32>,
    live: usize,
}

impl<R> Default for SlotTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> SlotTable<R> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Number of live records.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Stores `record` in a recycled or new slot, returning `(slot, generation)`.
    pub(crate) fn insert(&mut self, record: R) -> (u32, u32) {
        self.live += 1;

        if let Some(slot) = self.free.pop() {
            let entry = &mut self.entries[slot as usize];
            // Retired slots never reach the free stack, so this cannot wrap.
            entry.generation += 1;
            entry.occupant = Occupant::Live(record);
            return (slot, entry.generation);
        }

        let slot = self.entries.len();
        debug_assert!(slot < u32::MAX as usize, "slot table exhausted");
        self.entries.push(Entry {
            generation: 0,
            occupant: Occupant::Live(record),
        });
        (slot as u32, 0)
    }

    /// Brings a dead slot back to life for a token that still names it.
    ///
    /// Succeeds only if the slot is free (not live, not retired, not
    /// recycled since `generation`). The slot's generation is bumped, so
    /// the old token stays dead. On failure the record is handed back.
    pub(crate) fn revive(&mut self, slot: u32, generation: u32, record: R) -> Result<u32, R> {
        let stack_pos = match self.entries.get(slot as usize) {
            Some(Entry {
                generation: g,
                occupant: Occupant::Free(pos),
            }) if *g == generation => *pos as usize,
            _ => return Err(record),
        };

        self.free.swap_remove(stack_pos);
        if let Some(&moved) = self.free.get(stack_pos) {
            self.entries[moved as usize].occupant = Occupant::Free(stack_pos as u32);
        }

        let entry = &mut self.entries[slot as usize];
        entry.generation += 1;
        entry.occupant = Occupant::Live(record);
        self.live += 1;
        Ok(entry.generation)
    }

    #[inline]
    pub(crate) fn is_live(&self, slot: u32, generation: u32) -> bool {
        self.get(slot, generation).is_some()
    }

    #[inline]
    pub(crate) fn get(&self, slot: u32, generation: u32) -> Option<&R> {
        match self.entries.get(slot as usize) {
            Some(Entry {
                generation: g,
                occupant: Occupant::Live(record),
            }) if *g == generation => Some(record),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, slot: u32, generation: u32) -> Option<&mut R> {
        match self.entries.get_mut(slot as usize) {
            Some(Entry {
                generation: g,
                occupant: Occupant::Live(record),
            }) if *g == generation => Some(record),
            _ => None,
        }
    }

    /// Live record at `slot` regardless of generation. Internal bookkeeping only.
    #[inline]
    pub(crate) fn record_mut(&mut self, slot: u32) -> Option<&mut R> {
        match self.entries.get_mut(slot as usize) {
            Some(Entry {
                occupant: Occupant::Live(record),
                ..
            }) => Some(record),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn record(&self, slot: u32) -> Option<&R> {
        match self.entries.get(slot as usize) {
            Some(Entry {
                occupant: Occupant::Live(record),
                ..
            }) => Some(record),
            _ => None,
        }
    }

    /// Current generation of `slot`.
    #[inline]
    pub(crate) fn generation(&self, slot: u32) -> u32 {
        self.entries
            .get(slot as usize)
            .map_or(0, |entry| entry.generation)
    }

    /// Kills the slot if the token is live, returning its record.
    pub(crate) fn kill(&mut self, slot: u32, generation: u32) -> Option<R> {
        if !self.is_live(slot, generation) {
            return None;
        }
        self.release(slot)
    }

    /// Kills the live record at `slot`, ignoring generation.
    pub(crate) fn release(&mut self, slot: u32) -> Option<R> {
        let free_pos = self.free.len() as u32;
        let entry = self.entries.get_mut(slot as usize)?;
        if !matches!(entry.occupant, Occupant::Live(_)) {
            return None;
        }

        let next = if entry.generation == u32::MAX {
            debug!(slot, "slot retired after generation wrap");
            Occupant::Retired
        } else {
            Occupant::Free(free_pos)
        };
        let retired = matches!(next, Occupant::Retired);

        let Occupant::Live(record) = std::mem::replace(&mut entry.occupant, next) else {
            unreachable!("occupant checked live above");
        };
        if !retired {
            self.free.push(slot);
        }
        self.live -= 1;
        Some(record)
    }

    /// Visits every live record, killing those for which `keep` returns `false`.
    pub(crate) fn retain_mut<F>(&mut self, mut keep: F)
    where
        F: FnMut(u32, &mut R) -> bool,
    {
        for slot in 0..self.entries.len() as u32 {
            let keep_it = match &mut self.entries[slot as usize].occupant {
                Occupant::Live(record) => keep(slot, record),
                _ => true,
            };
            if !keep_it {
                self.release(slot);
            }
        }
    }

    /// Iterates live records as `(slot, generation, record)`.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, u32, &R)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| match &entry.occupant {
                Occupant::Live(record) => Some((slot as u32, entry.generation, record)),
                _ => None,
            })
    }

    #[cfg(test)]
    fn force_generation(&mut self, slot: u32, generation: u32) {
        self.entries[slot as usize].generation = generation;
    }
}
