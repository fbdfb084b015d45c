//! View tokens and the flat registry that keeps them consistent.
//!
//! A view is an `(offset, count)` window over an [`ArrayList`]. It is always
//! expressed in root coordinates; deriving a view from a view resolves to
//! root offsets at creation, so there is never a chain to walk.
//!
//! The list reports every structural change as an [`Edit`]. The registry
//! applies it to every live record in one pass:
//!
//! | Edit | View after the edit point | View spanning the edit | View before |
//! |------|---------------------------|------------------------|-------------|
//! | `Inserted` at `k` | shifted by `+len` | invalidated | untouched |
//! | `Removed` `[k, k+len)` | shifted by `-len` | invalidated | untouched |
//! | `Reordered`/`Reversed` `[k, k+len)` | untouched | invalidated unless it covers the whole range | untouched |
//!
//! The view an edit was routed through (the *acting* view) is exempt: it
//! grows or shrinks by the edit length instead.
//!
//! A reorder routed through a view spares views lying wholly inside the
//! permuted range; only partial overlaps die. After a reversal such a view
//! is mirrored so it still holds the same items. A reorder of the root has
//! no acting view, and every view short of the full list dies.
//!
//! [`ArrayList`]: crate::ArrayList

use tracing::trace;

use crate::slot::{OwnerId, SlotTable, Tag};
use crate::{Error, Result};

/// A live window onto an [`ArrayList`](crate::ArrayList).
///
/// `View` is a plain token. It borrows nothing. All access goes through the
/// list that created it, which rejects the token with
/// [`Error::InvalidReference`] once the window has been invalidated or
/// dropped, or if the token belongs to a different list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct View(pub(crate) Tag);

/// A structural change to the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// `len` items were inserted starting at root index `at`.
    Inserted {
        /// Root index of the first inserted item.
        at: usize,
        /// Number of inserted items.
        len: usize,
    },
    /// The root range `at..at + len` was removed.
    Removed {
        /// Root index of the first removed item.
        at: usize,
        /// Number of removed items.
        len: usize,
    },
    /// The root range `at..at + len` was permuted (sort, shuffle).
    Reordered {
        /// Root index of the first permuted item.
        at: usize,
        /// Length of the permuted range.
        len: usize,
    },
    /// The root range `at..at + len` was reversed in place.
    Reversed {
        /// Root index of the first reversed item.
        at: usize,
        /// Length of the reversed range.
        len: usize,
    },
}

/// Window bounds in root coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ViewRecord {
    pub(crate) offset: usize,
    pub(crate) count: usize,
}

impl ViewRecord {
    #[inline]
    pub(crate) fn end(&self) -> usize {
        self.offset + self.count
    }

    /// Adjusts this window for `edit`. Returns `false` if the window must die.
    ///
    /// `confined` is set when the edit was routed through a view.
    fn follow(&mut self, edit: Edit, confined: bool) -> bool {
        match edit {
            Edit::Inserted { at, len } => {
                if self.offset > at {
                    self.offset += len;
                    true
                } else {
                    at >= self.end()
                }
            }
            Edit::Removed { at, len } => {
                if len == 0 || at >= self.end() {
                    true
                } else if self.offset >= at + len {
                    self.offset -= len;
                    true
                } else {
                    false
                }
            }
            Edit::Reordered { at, len } => self.permuted(at, len, confined, false),
            Edit::Reversed { at, len } => self.permuted(at, len, confined, true),
        }
    }

    fn permuted(&mut self, at: usize, len: usize, confined: bool, mirror: bool) -> bool {
        let end = at + len;
        let disjoint = self.end() <= at || self.offset >= end;
        let covers = self.offset <= at && self.end() >= end;
        if len == 0 || disjoint || covers {
            return true;
        }
        let inside = self.offset >= at && self.end() <= end;
        if !(confined && inside) {
            return false;
        }
        if mirror {
            self.offset = at + end - self.end();
        }
        true
    }

    /// Grows or shrinks the acting window by the edit length.
    fn absorb(&mut self, edit: Edit) {
        match edit {
            Edit::Inserted { len, .. } => self.count += len,
            Edit::Removed { len, .. } => self.count -= len,
            Edit::Reordered { .. } | Edit::Reversed { .. } => {}
        }
    }
}

/// Flat registry of every view open on one list.
#[derive(Debug)]
pub(crate) struct ViewRegistry {
    records: SlotTable<ViewRecord>,
    owner: OwnerId,
}

impl ViewRegistry {
    pub(crate) fn new() -> Self {
        Self {
            records: SlotTable::new(),
            owner: OwnerId::next(),
        }
    }

    /// Number of live views.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub(crate) fn owner(&self) -> OwnerId {
        self.owner
    }

    pub(crate) fn open(&mut self, offset: usize, count: usize) -> View {
        let (slot, generation) = self.records.insert(ViewRecord { offset, count });
        View(Tag {
            slot,
            generation,
            owner: self.owner,
        })
    }

    pub(crate) fn close(&mut self, view: View) -> Result<()> {
        self.check_owner(view)?;
        self.records
            .kill(view.0.slot, view.0.generation)
            .map(|_| ())
            .ok_or(Error::InvalidReference)
    }

    #[inline]
    pub(crate) fn is_live(&self, view: View) -> bool {
        view.0.owner == self.owner && self.records.is_live(view.0.slot, view.0.generation)
    }

    #[inline]
    pub(crate) fn record(&self, view: View) -> Result<ViewRecord> {
        self.check_owner(view)?;
        self.records
            .get(view.0.slot, view.0.generation)
            .copied()
            .ok_or(Error::InvalidReference)
    }

    #[inline]
    pub(crate) fn record_mut(&mut self, view: View) -> Result<&mut ViewRecord> {
        self.check_owner(view)?;
        self.records
            .get_mut(view.0.slot, view.0.generation)
            .ok_or(Error::InvalidReference)
    }

    /// Propagates `edit` to every live view. `acting` must be live.
    pub(crate) fn apply(&mut self, edit: Edit, acting: Option<View>) {
        let confined = acting.is_some();
        let acting = acting.map(|view| view.0.slot);

        self.records.retain_mut(|slot, record| {
            if Some(slot) == acting {
                record.absorb(edit);
                return true;
            }
            let keep = record.follow(edit, confined);
            if !keep {
                trace!(
                    slot,
                    offset = record.offset,
                    count = record.count,
                    ?edit,
                    "view invalidated"
                );
            }
            keep
        });
    }

    #[inline]
    fn check_owner(&self, view: View) -> Result<()> {
        if view.0.owner == self.owner {
            Ok(())
        } else {
            Err(Error::InvalidReference)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(offset: usize, count: usize) -> ViewRecord {
        ViewRecord { offset, count }
    }

    fn follow(mut record: ViewRecord, edit: Edit) -> Option<ViewRecord> {
        record.follow(edit, false).then_some(record)
    }

    fn follow_confined(mut record: ViewRecord, edit: Edit) -> Option<ViewRecord> {
        record.follow(edit, true).then_some(record)
    }

    #[test]
    fn insert_before_shifts() {
        let edit = Edit::Inserted { at: 1, len: 2 };
        assert_eq!(follow(rec(3, 2), edit), Some(rec(5, 2)));
    }

    #[test]
    fn insert_inside_invalidates() {
        let edit = Edit::Inserted { at: 3, len: 1 };
        assert_eq!(follow(rec(3, 2), edit), None);
        assert_eq!(follow(rec(2, 2), edit), None);
    }

    #[test]
    fn insert_at_end_of_window_untouched() {
        let edit = Edit::Inserted { at: 5, len: 1 };
        assert_eq!(follow(rec(3, 2), edit), Some(rec(3, 2)));
        assert_eq!(follow(rec(0, 1), edit), Some(rec(0, 1)));
    }

    #[test]
    fn insert_at_empty_window_untouched() {
        let edit = Edit::Inserted { at: 2, len: 1 };
        assert_eq!(follow(rec(2, 0), edit), Some(rec(2, 0)));
    }

    #[test]
    fn remove_before_shifts_back() {
        let edit = Edit::Removed { at: 0, len: 2 };
        assert_eq!(follow(rec(2, 3), edit), Some(rec(0, 3)));
    }

    #[test]
    fn remove_after_untouched() {
        let edit = Edit::Removed { at: 5, len: 2 };
        assert_eq!(follow(rec(2, 3), edit), Some(rec(2, 3)));
    }

    #[test]
    fn remove_overlap_invalidates() {
        assert_eq!(follow(rec(2, 3), Edit::Removed { at: 4, len: 2 }), None);
        assert_eq!(follow(rec(2, 3), Edit::Removed { at: 1, len: 2 }), None);
        assert_eq!(follow(rec(2, 3), Edit::Removed { at: 0, len: 10 }), None);
        // Empty window strictly inside the removed range
        assert_eq!(follow(rec(3, 0), Edit::Removed { at: 2, len: 2 }), None);
    }

    #[test]
    fn remove_nothing_is_noop() {
        assert_eq!(
            follow(rec(2, 3), Edit::Removed { at: 3, len: 0 }),
            Some(rec(2, 3))
        );
    }

    #[test]
    fn reorder_rules() {
        let edit = Edit::Reordered { at: 2, len: 4 };
        // disjoint
        assert_eq!(follow(rec(0, 2), edit), Some(rec(0, 2)));
        assert_eq!(follow(rec(6, 1), edit), Some(rec(6, 1)));
        // equal and containing
        assert_eq!(follow(rec(2, 4), edit), Some(rec(2, 4)));
        assert_eq!(follow(rec(0, 8), edit), Some(rec(0, 8)));
        // strictly inside
        assert_eq!(follow(rec(3, 2), edit), None);
        // partial overlap
        assert_eq!(follow(rec(1, 2), edit), None);
        assert_eq!(follow(rec(5, 3), edit), None);
    }

    #[test]
    fn confined_reorder_spares_inner_views() {
        let edit = Edit::Reordered { at: 2, len: 4 };
        assert_eq!(follow_confined(rec(3, 2), edit), Some(rec(3, 2)));
        assert_eq!(follow_confined(rec(2, 1), edit), Some(rec(2, 1)));
        assert_eq!(follow_confined(rec(4, 0), edit), Some(rec(4, 0)));
        assert_eq!(follow_confined(rec(1, 2), edit), None);
        assert_eq!(follow_confined(rec(5, 3), edit), None);
        assert_eq!(follow_confined(rec(0, 8), edit), Some(rec(0, 8)));
    }

    #[test]
    fn confined_reverse_mirrors_inner_views() {
        // Window 2..6 reversed: index 2 <-> 5, 3 <-> 4
        let edit = Edit::Reversed { at: 2, len: 4 };
        assert_eq!(follow_confined(rec(2, 1), edit), Some(rec(5, 1)));
        assert_eq!(follow_confined(rec(2, 2), edit), Some(rec(4, 2)));
        assert_eq!(follow_confined(rec(3, 2), edit), Some(rec(3, 2)));
        // Empty window on the boundary counts as disjoint
        assert_eq!(follow_confined(rec(2, 0), edit), Some(rec(2, 0)));
        assert_eq!(follow_confined(rec(2, 4), edit), Some(rec(2, 4)));
        assert_eq!(follow_confined(rec(1, 3), edit), None);
        // Root reversal keeps only views covering the range
        assert_eq!(follow(rec(2, 1), edit), None);
    }

    #[test]
    fn registry_rejects_foreign_views() {
        let mut a = ViewRegistry::new();
        let b = ViewRegistry::new();

        let view = a.open(0, 1);
        assert!(a.is_live(view));
        assert!(!b.is_live(view));
        assert_eq!(b.record(view), Err(Error::InvalidReference));
    }

    #[test]
    fn apply_spares_acting_view() {
        let mut registry = ViewRegistry::new();
        let acting = registry.open(2, 3);
        let overlapping = registry.open(3, 3);
        let after = registry.open(6, 1);

        registry.apply(Edit::Inserted { at: 4, len: 1 }, Some(acting));

        assert_eq!(registry.record(acting), Ok(rec(2, 4)));
        assert_eq!(registry.record(overlapping), Err(Error::InvalidReference));
        assert_eq!(registry.record(after), Ok(rec(7, 1)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn close_is_once() {
        let mut registry = ViewRegistry::new();
        let view = registry.open(0, 0);

        assert_eq!(registry.close(view), Ok(()));
        assert_eq!(registry.close(view), Err(Error::InvalidReference));
        assert!(!registry.is_live(view));
    }
}
