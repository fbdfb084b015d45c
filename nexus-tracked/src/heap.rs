//! Double-ended priority queue with stable handles.
//!
//! [`IntervalHeap`] keeps both its minimum and maximum reachable in O(1).
//! Node `k` occupies array positions `2k` (the node's low end) and `2k + 1`
//! (its high end); the last node may hold a single item. For every node, the
//! interval `[low, high]` is contained in its parent's interval.
//!
//! ```text
//!             [ 1 .. 9 ]              positions 0, 1
//!            /          \
//!     [ 2 .. 7 ]      [ 3 .. 8 ]      positions 2, 3 | 4, 5
//!      /
//!   [ 4 ]                             position 6 (lone)
//! ```
//!
//! Every item carries the slot of its [`Handle`]. All moves inside the heap
//! go through one swap primitive that writes both items' new positions back
//! to the handle table, so handles follow their items through every sift.

use compare::{Compare, Natural, natural};

use crate::handle::{Handle, HandleTable};
use crate::{Error, Result};

struct Node<T> {
    item: T,
    slot: u32,
}

/// Array position of the low end of the parent of the node holding `pos`.
#[inline]
fn parent_low(pos: usize) -> usize {
    debug_assert!(pos >= 2);
    (pos / 2 - 1) / 2 * 2
}

/// Interval heap whose items can be read, replaced or removed by [`Handle`].
///
/// # Example
///
/// ```
/// use nexus_tracked::{Error, IntervalHeap};
///
/// let mut heap = IntervalHeap::new();
/// let five = heap.insert(5);
/// let three = heap.insert(3);
/// let eight = heap.insert(8);
///
/// assert_eq!(heap.peek_min(), Ok(&3));
/// assert_eq!(heap.peek_max(), Ok(&8));
///
/// // Raise 3 above everything else; the handle follows it.
/// assert_eq!(heap.set(three, 10), Ok(3));
/// assert_eq!(heap.peek_max_with_handle(), Ok((three, &10)));
///
/// assert_eq!(heap.remove(five), Ok(5));
/// assert!(!heap.contains(five));
/// assert_eq!(heap.get(five), Err(Error::InvalidReference));
/// assert_eq!(heap.pop_min(), Ok(8));
/// assert!(!heap.contains(eight));
/// ```
pub struct IntervalHeap<T, C: Compare<T> = Natural<T>> {
    data: Vec<Node<T>>,
    handles: HandleTable,
    cmp: C,
}

impl<T: Ord> Default for IntervalHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> IntervalHeap<T> {
    /// Creates an empty heap in natural order.
    pub fn new() -> Self {
        Self::with_comparator(natural())
    }

    /// Creates an empty heap in natural order with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_comparator(capacity, natural())
    }
}

impl<T, C: Compare<T>> IntervalHeap<T, C> {
    /// Creates an empty heap ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self::with_capacity_and_comparator(0, cmp)
    }

    /// Creates an empty heap ordered by `cmp` with room for `capacity` items.
    pub fn with_capacity_and_comparator(capacity: usize, cmp: C) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            handles: HandleTable::with_capacity(capacity),
            cmp,
        }
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the heap is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the comparator.
    #[inline]
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Inserts `item` and returns a fresh handle to it.
    pub fn insert(&mut self, item: T) -> Handle {
        let pos = self.data.len();
        let handle = self.handles.mint(pos);
        self.push_node(item, handle);
        handle
    }

    /// Inserts `item`, binding it to `handle` if that handle is dead.
    ///
    /// A dead handle whose slot has not been recycled is revived under a new
    /// generation, so copies of the old token stay dead. A live, recycled or
    /// foreign handle is ignored and a fresh handle is returned instead.
    /// Never fails.
    pub fn insert_reusing(&mut self, item: T, handle: Handle) -> Handle {
        let pos = self.data.len();
        let handle = self.handles.reuse(handle, pos);
        self.push_node(item, handle);
        handle
    }

    /// Inserts every item, returning their handles in input order.
    pub fn insert_all<I>(&mut self, items: I) -> Vec<Handle>
    where
        I: IntoIterator<Item = T>,
    {
        let items = items.into_iter();
        let (lower, _) = items.size_hint();
        self.data.reserve(lower);
        items.map(|item| self.insert(item)).collect()
    }

    fn push_node(&mut self, item: T, handle: Handle) {
        self.data.push(Node {
            item,
            slot: handle.0.slot,
        });
        self.sift_up_last();
    }

    // ========================================================================
    // Extremes
    // ========================================================================

    /// Smallest item.
    pub fn peek_min(&self) -> Result<&T> {
        self.peek_min_with_handle().map(|(_, item)| item)
    }

    /// Largest item.
    pub fn peek_max(&self) -> Result<&T> {
        self.peek_max_with_handle().map(|(_, item)| item)
    }

    /// Smallest item with its handle.
    pub fn peek_min_with_handle(&self) -> Result<(Handle, &T)> {
        let pos = self.min_pos()?;
        Ok(self.entry(pos))
    }

    /// Largest item with its handle.
    pub fn peek_max_with_handle(&self) -> Result<(Handle, &T)> {
        let pos = self.max_pos()?;
        Ok(self.entry(pos))
    }

    /// Removes and returns the smallest item. Its handle dies.
    pub fn pop_min(&mut self) -> Result<T> {
        self.pop_min_with_handle().map(|(_, item)| item)
    }

    /// Removes and returns the largest item. Its handle dies.
    pub fn pop_max(&mut self) -> Result<T> {
        self.pop_max_with_handle().map(|(_, item)| item)
    }

    /// Removes the smallest item, returning it with its now dead handle.
    pub fn pop_min_with_handle(&mut self) -> Result<(Handle, T)> {
        let pos = self.min_pos()?;
        Ok(self.remove_at(pos))
    }

    /// Removes the largest item, returning it with its now dead handle.
    pub fn pop_max_with_handle(&mut self) -> Result<(Handle, T)> {
        let pos = self.max_pos()?;
        Ok(self.remove_at(pos))
    }

    #[inline]
    fn min_pos(&self) -> Result<usize> {
        if self.data.is_empty() {
            Err(Error::EmptyCollection)
        } else {
            Ok(0)
        }
    }

    #[inline]
    fn max_pos(&self) -> Result<usize> {
        match self.data.len() {
            0 => Err(Error::EmptyCollection),
            1 => Ok(0),
            _ => Ok(1),
        }
    }

    // ========================================================================
    // Access by handle
    // ========================================================================

    /// Returns `true` if `handle` names an item in this heap.
    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.handles.contains(handle)
    }

    /// Item named by `handle`.
    pub fn get(&self, handle: Handle) -> Result<&T> {
        let pos = self.handles.position(handle)?;
        Ok(&self.data[pos].item)
    }

    /// Replaces the item named by `handle`, returning the old one.
    ///
    /// The handle stays live and now names `item`. On error the heap is
    /// unchanged.
    pub fn set(&mut self, handle: Handle, item: T) -> Result<T> {
        let pos = self.handles.position(handle)?;
        let old = std::mem::replace(&mut self.data[pos].item, item);
        self.restore(pos);
        Ok(old)
    }

    /// Removes the item named by `handle`. The handle dies.
    ///
    /// On error the heap is unchanged.
    pub fn remove(&mut self, handle: Handle) -> Result<T> {
        let pos = self.handles.position(handle)?;
        let (_, item) = self.remove_at(pos);
        Ok(item)
    }

    /// Removes every item. Every handle dies.
    pub fn clear(&mut self) {
        self.data.clear();
        self.handles.release_all();
    }

    /// Iterates items with their handles, in array order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.data
            .iter()
            .map(|node| (self.handles.handle_of(node.slot), &node.item))
    }

    /// Consumes the heap, returning its items from smallest to largest.
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        let mut sorted = Vec::with_capacity(self.len());
        while let Ok(item) = self.pop_min() {
            sorted.push(item);
        }
        sorted
    }

    /// Checks interval ordering and that every handle records its item's
    /// actual position. O(n).
    pub fn check_invariants(&self) -> bool {
        let len = self.data.len();
        if self.handles.len() != len {
            return false;
        }
        for pos in 0..len {
            if self.handles.recorded(self.data[pos].slot) != Some(pos) {
                return false;
            }
            if pos % 2 == 0 && pos + 1 < len && self.less(pos + 1, pos) {
                return false;
            }
            if pos >= 2 {
                let low = parent_low(pos);
                if self.less(pos, low) || self.less(low + 1, pos) {
                    return false;
                }
            }
        }
        true
    }

    // ========================================================================
    // Internals
    // ========================================================================

    #[inline]
    fn entry(&self, pos: usize) -> (Handle, &T) {
        let node = &self.data[pos];
        (self.handles.handle_of(node.slot), &node.item)
    }

    #[inline]
    fn less(&self, a: usize, b: usize) -> bool {
        self.cmp.compares_lt(&self.data[a].item, &self.data[b].item)
    }

    /// Swaps two array positions and tells the handle table.
    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.data.swap(a, b);
        self.handles.relocate(self.data[a].slot, a);
        self.handles.relocate(self.data[b].slot, b);
    }

    /// Removes the node at `pos`, refills the hole from the end and sifts.
    fn remove_at(&mut self, pos: usize) -> (Handle, T) {
        let handle = self.handles.handle_of(self.data[pos].slot);
        let removed = self.data.swap_remove(pos);
        self.handles.release(removed.slot);

        if pos < self.data.len() {
            self.handles.relocate(self.data[pos].slot, pos);
            self.restore(pos);
        }
        (handle, removed.item)
    }

    fn sift_up_last(&mut self) {
        let pos = self.data.len() - 1;

        if pos % 2 == 1 {
            // Completed a node: order it, then climb on whichever side moved
            if self.less(pos, pos - 1) {
                self.swap(pos, pos - 1);
                self.sift_up_low(pos - 1);
            } else {
                self.sift_up_high(pos);
            }
        } else if pos >= 2 {
            // Lone item: it is both ends of its node
            let low = parent_low(pos);
            if self.less(pos, low) {
                self.swap(pos, low);
                self.sift_up_low(low);
            } else if self.less(low + 1, pos) {
                self.swap(pos, low + 1);
                self.sift_up_high(low + 1);
            }
        }
    }

    /// Re-establishes order after the item at `pos` changed in either
    /// direction.
    fn restore(&mut self, pos: usize) {
        let len = self.data.len();

        if pos % 2 == 0 {
            if pos + 1 < len && self.less(pos + 1, pos) {
                self.swap(pos, pos + 1);
                self.sift_down_low(pos);
                self.sift_up_high(pos + 1);
                return;
            }
            if pos >= 2 {
                let low = parent_low(pos);
                if self.less(pos, low) {
                    self.sift_up_low(pos);
                    return;
                }
                if pos + 1 >= len && self.less(low + 1, pos) {
                    self.swap(pos, low + 1);
                    self.sift_up_high(low + 1);
                    return;
                }
            }
            self.sift_down_low(pos);
        } else {
            if self.less(pos, pos - 1) {
                self.swap(pos - 1, pos);
                self.sift_down_high(pos);
                self.sift_up_low(pos - 1);
                return;
            }
            if pos >= 3 && self.less(parent_low(pos) + 1, pos) {
                self.sift_up_high(pos);
                return;
            }
            self.sift_down_high(pos);
        }
    }

    fn sift_up_low(&mut self, mut pos: usize) {
        while pos >= 2 {
            let parent = parent_low(pos);
            if !self.less(pos, parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_up_high(&mut self, mut pos: usize) {
        while pos >= 2 {
            let parent = parent_low(pos) + 1;
            if !self.less(parent, pos) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down_low(&mut self, mut pos: usize) {
        let len = self.data.len();
        loop {
            let left = 2 * pos + 2;
            if left >= len {
                break;
            }
            let right = left + 2;
            let child = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, pos) {
                break;
            }
            self.swap(pos, child);
            pos = child;
            if pos + 1 < len && self.less(pos + 1, pos) {
                self.swap(pos, pos + 1);
            }
        }
    }

    fn sift_down_high(&mut self, mut pos: usize) {
        let len = self.data.len();
        loop {
            let left = 2 * pos;
            if left >= len {
                break;
            }
            // A child's high end is its lone item if the node is not full
            let high_of = |low: usize| if low + 1 < len { low + 1 } else { low };
            let mut child = high_of(left);
            let right = left + 2;
            if right < len {
                let other = high_of(right);
                if self.less(child, other) {
                    child = other;
                }
            }
            if !self.less(pos, child) {
                break;
            }
            self.swap(pos, child);
            pos = child;
            if pos % 2 == 0 {
                break;
            }
            if self.less(pos, pos - 1) {
                self.swap(pos - 1, pos);
            }
        }
    }
}

impl<T: Ord> FromIterator<T> for IntervalHeap<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut heap = Self::new();
        heap.insert_all(iter);
        heap
    }
}

impl<T: std::fmt::Debug, C: Compare<T>> std::fmt::Debug for IntervalHeap<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.data.iter().map(|node| &node.item))
            .finish()
    }
}
