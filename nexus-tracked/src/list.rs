//! Array-backed list with live views.
//!
//! The list owns a single `Vec<T>`. Views are `(offset, count)` records in a
//! flat registry, never slices, so any number of overlapping windows can be
//! held while the list is mutated through `&mut self`.
//!
//! # Example
//!
//! ```
//! use nexus_tracked::{ArrayList, Error};
//!
//! let mut list: ArrayList<u32> = vec![10, 20, 30, 40, 50].into();
//!
//! let view = list.view(1, 3).unwrap();
//! assert_eq!(list.view_to_vec(view).unwrap(), vec![20, 30, 40]);
//!
//! list.slide(view, 1).unwrap();
//! assert_eq!(list.view_to_vec(view).unwrap(), vec![30, 40, 50]);
//! assert_eq!(list.try_slide(view, 1), Ok(false));
//!
//! // Inserting inside the window kills it
//! list.insert(3, 35).unwrap();
//! assert_eq!(list.view_len(view), Err(Error::InvalidReference));
//! ```
//!
//! # Structural edits
//!
//! Every insert, removal and reorder is reported to the view registry (see
//! [`Edit`]) and bumps the list's stamp. Replacing an element with
//! [`set`](ArrayList::set) or [`view_set`](ArrayList::view_set) is not
//! structural: overlapping views see the new value and stay valid.
//!
//! # Enumeration
//!
//! [`iter`](ArrayList::iter) and [`iter_view`](ArrayList::iter_view) borrow
//! the list, so the compiler rules out mutation while they run. A
//! [`Cursor`] holds no borrow; it fails with
//! [`Error::ModifiedDuringEnumeration`] if the stamp moved since it was
//! created.

use compare::Compare;
use rand_core::RngCore;

use crate::slot::OwnerId;
use crate::view::{Edit, View, ViewRecord, ViewRegistry};
use crate::{Error, Result};

/// Growable array list supporting live views.
///
/// See the [module documentation](self) for the view rules.
pub struct ArrayList<T> {
    items: Vec<T>,
    views: ViewRegistry,
    stamp: u64,
}

impl<T> Default for ArrayList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ArrayList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Creates an empty list with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity))
    }

    fn from_vec(items: Vec<T>) -> Self {
        Self {
            items,
            views: ViewRegistry::new(),
            stamp: 0,
        }
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the list holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Modification stamp. Changes on every structural edit or reorder.
    #[inline]
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Number of live views on this list.
    #[inline]
    pub fn live_views(&self) -> usize {
        self.views.len()
    }

    /// The items as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterates the items front to back.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Consumes the list. Every view on it dies with it.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    // ========================================================================
    // Element access
    // ========================================================================

    /// Item at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Mutable item at `index`. Writing through it is not a structural edit.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Replaces the item at `index`, returning the old one.
    ///
    /// Not a structural edit: views are untouched.
    pub fn set(&mut self, index: usize, item: T) -> Result<T> {
        let len = self.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(Error::out_of_bounds(index, 1, len))?;
        Ok(std::mem::replace(slot, item))
    }

    // ========================================================================
    // Structural edits on the root
    // ========================================================================

    /// Appends an item.
    pub fn push(&mut self, item: T) {
        let at = self.len();
        self.items.push(item);
        self.commit(Edit::Inserted { at, len: 1 }, None);
    }

    /// Removes the last item.
    pub fn pop(&mut self) -> Option<T> {
        let item = self.items.pop()?;
        let at = self.len();
        self.commit(Edit::Removed { at, len: 1 }, None);
        Some(item)
    }

    /// Inserts `item` at `index`, shifting later items right.
    ///
    /// Requires `index <= len`.
    pub fn insert(&mut self, index: usize, item: T) -> Result<()> {
        self.check_position(index)?;
        self.items.insert(index, item);
        self.commit(Edit::Inserted { at: index, len: 1 }, None);
        Ok(())
    }

    /// Inserts every item of `items` at `index`, in order.
    ///
    /// The items are gathered before the list is touched.
    pub fn insert_all<I>(&mut self, index: usize, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        self.check_position(index)?;
        let buffer: Vec<T> = items.into_iter().collect();
        self.splice_in(index, buffer, None);
        Ok(())
    }

    /// Inserts every item of a fallible sequence at `index`.
    ///
    /// If the sequence yields an error partway through, the list and every
    /// view on it are left exactly as before the call and the error is
    /// returned.
    ///
    /// ```
    /// use nexus_tracked::{ArrayList, Error};
    ///
    /// let mut list: ArrayList<u32> = vec![1, 2, 3].into();
    /// let view = list.view(1, 2).unwrap();
    ///
    /// let items = vec![Ok(7), Ok(8), Err(Error::EmptyCollection)];
    /// assert!(list.try_insert_all(1, items).is_err());
    ///
    /// assert_eq!(list.as_slice(), &[1, 2, 3]);
    /// assert!(list.is_valid(view));
    /// ```
    pub fn try_insert_all<I, E>(&mut self, index: usize, items: I) -> Result<(), E>
    where
        I: IntoIterator<Item = Result<T, E>>,
        E: From<Error>,
    {
        self.check_position(index)?;
        let buffer = items.into_iter().collect::<Result<Vec<T>, E>>()?;
        self.splice_in(index, buffer, None);
        Ok(())
    }

    /// Removes and returns the item at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        self.check_index(index)?;
        let item = self.items.remove(index);
        self.commit(Edit::Removed { at: index, len: 1 }, None);
        Ok(item)
    }

    /// Removes `count` items starting at `start`.
    ///
    /// Requires `start + count <= len`.
    pub fn remove_range(&mut self, start: usize, count: usize) -> Result<()> {
        self.check_window(start, count)?;
        self.drain_window(start, count, None);
        Ok(())
    }

    /// Removes every item. Views over non-empty ranges die.
    pub fn clear(&mut self) {
        let len = self.len();
        self.drain_window(0, len, None);
    }

    // ========================================================================
    // Reorders on the root
    // ========================================================================

    /// Reverses the list. Every view but a full-length one dies.
    pub fn reverse(&mut self) {
        let len = self.len();
        self.reverse_window(0, len, None);
    }

    /// Sorts the list in natural order.
    pub fn sort(&mut self)
    where
        T: Ord,
    {
        let len = self.len();
        self.sort_window(0, len, None, |a, b| a.cmp(b));
    }

    /// Sorts the list with `cmp`. Stable.
    pub fn sort_by<C>(&mut self, cmp: &C)
    where
        C: Compare<T>,
    {
        let len = self.len();
        self.sort_window(0, len, None, |a, b| cmp.compare(a, b));
    }

    /// Shuffles the list with a caller-supplied generator.
    pub fn shuffle<R>(&mut self, rng: &mut R)
    where
        R: RngCore + ?Sized,
    {
        let len = self.len();
        self.shuffle_window(0, len, None, rng);
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Index of the first item equal to `item`.
    pub fn index_of(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.items.iter().position(|x| x == item)
    }

    /// Index of the last item equal to `item`.
    pub fn last_index_of(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.items.iter().rposition(|x| x == item)
    }

    /// Returns `true` if some item equals `item`.
    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.index_of(item).is_some()
    }

    // ========================================================================
    // View creation
    // ========================================================================

    /// Opens a view over `start..start + count`.
    ///
    /// The view shares storage with the list; nothing is copied.
    pub fn view(&mut self, start: usize, count: usize) -> Result<View> {
        self.check_window(start, count)?;
        Ok(self.views.open(start, count))
    }

    /// Opens a view over `start..start + count` *of `view`*.
    ///
    /// The new view is recorded in root coordinates and is independent of
    /// `view` afterwards.
    pub fn view_of_view(&mut self, view: View, start: usize, count: usize) -> Result<View> {
        let record = self.views.record(view)?;
        check_window(start, count, record.count)?;
        Ok(self.views.open(record.offset + start, count))
    }

    /// Opens a length-1 view at the first item equal to `item`.
    pub fn first_view(&mut self, item: &T) -> Option<View>
    where
        T: PartialEq,
    {
        self.first_view_by(|x| x == item)
    }

    /// Opens a length-1 view at the last item equal to `item`.
    pub fn last_view(&mut self, item: &T) -> Option<View>
    where
        T: PartialEq,
    {
        self.last_view_by(|x| x == item)
    }

    /// Opens a length-1 view at the first item matching `pred`.
    pub fn first_view_by<F>(&mut self, pred: F) -> Option<View>
    where
        F: FnMut(&T) -> bool,
    {
        let index = self.items.iter().position(pred)?;
        Some(self.views.open(index, 1))
    }

    /// Opens a length-1 view at the last item matching `pred`.
    pub fn last_view_by<F>(&mut self, pred: F) -> Option<View>
    where
        F: FnMut(&T) -> bool,
    {
        let index = self.items.iter().rposition(pred)?;
        Some(self.views.open(index, 1))
    }

    /// Opens a view from the start of `view` to the end of `other`.
    ///
    /// Returns `Ok(None)` if `other` ends before `view` starts.
    pub fn span(&mut self, view: View, other: View) -> Result<Option<View>> {
        let first = self.views.record(view)?;
        let last = self.views.record(other)?;
        if last.end() < first.offset {
            return Ok(None);
        }
        Ok(Some(
            self.views.open(first.offset, last.end() - first.offset),
        ))
    }

    /// Closes a view. Fails if it is already invalid.
    pub fn drop_view(&mut self, view: View) -> Result<()> {
        self.views.close(view)
    }

    /// Returns `true` if `view` is a live view of this list.
    #[inline]
    pub fn is_valid(&self, view: View) -> bool {
        self.views.is_live(view)
    }

    /// Root index of the view's first item.
    pub fn view_offset(&self, view: View) -> Result<usize> {
        Ok(self.views.record(view)?.offset)
    }

    /// Number of items in the view.
    pub fn view_len(&self, view: View) -> Result<usize> {
        Ok(self.views.record(view)?.count)
    }

    // ========================================================================
    // Sliding
    // ========================================================================

    /// Moves the window by `delta`, keeping its length.
    ///
    /// Fails with [`Error::OutOfBounds`] without moving if the new window
    /// would leave the list.
    pub fn slide(&mut self, view: View, delta: isize) -> Result<()> {
        let count = self.views.record(view)?.count;
        self.slide_resize(view, delta, count)
    }

    /// Like [`slide`](Self::slide) but reports an out-of-range move as
    /// `Ok(false)`.
    pub fn try_slide(&mut self, view: View, delta: isize) -> Result<bool> {
        let count = self.views.record(view)?.count;
        self.try_slide_resize(view, delta, count)
    }

    /// Moves the window by `delta` and sets its length to `count`.
    pub fn slide_resize(&mut self, view: View, delta: isize, count: usize) -> Result<()> {
        let len = self.len();
        let record = self.views.record_mut(view)?;
        let offset = slid_offset(record, delta, count, len)
            .ok_or_else(|| Error::slid_out_of_bounds(record.offset, delta, count, len))?;
        record.offset = offset;
        record.count = count;
        Ok(())
    }

    /// Like [`slide_resize`](Self::slide_resize) but reports an
    /// out-of-range move as `Ok(false)`.
    pub fn try_slide_resize(&mut self, view: View, delta: isize, count: usize) -> Result<bool> {
        let len = self.len();
        let record = self.views.record_mut(view)?;
        match slid_offset(record, delta, count, len) {
            Some(offset) => {
                record.offset = offset;
                record.count = count;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ========================================================================
    // Access through a view
    // ========================================================================

    /// Item at view-local `index`.
    pub fn view_get(&self, view: View, index: usize) -> Result<&T> {
        let record = self.views.record(view)?;
        check_index(index, record.count)?;
        Ok(&self.items[record.offset + index])
    }

    /// Mutable item at view-local `index`.
    pub fn view_get_mut(&mut self, view: View, index: usize) -> Result<&mut T> {
        let record = self.views.record(view)?;
        check_index(index, record.count)?;
        Ok(&mut self.items[record.offset + index])
    }

    /// Replaces the item at view-local `index`, returning the old one.
    pub fn view_set(&mut self, view: View, index: usize, item: T) -> Result<T> {
        let slot = self.view_get_mut(view, index)?;
        Ok(std::mem::replace(slot, item))
    }

    /// Items of the view, front to back.
    pub fn iter_view(&self, view: View) -> Result<std::slice::Iter<'_, T>> {
        let record = self.views.record(view)?;
        Ok(self.items[record.offset..record.end()].iter())
    }

    /// Copies the view's items into a `Vec`.
    pub fn view_to_vec(&self, view: View) -> Result<Vec<T>>
    where
        T: Clone,
    {
        Ok(self.iter_view(view)?.cloned().collect())
    }

    /// View-local index of the first item equal to `item`.
    pub fn index_in(&self, view: View, item: &T) -> Result<Option<usize>>
    where
        T: PartialEq,
    {
        Ok(self.iter_view(view)?.position(|x| x == item))
    }

    // ========================================================================
    // Structural edits through a view
    // ========================================================================

    /// Inserts `item` right after `pointer`'s window.
    ///
    /// `pointer` itself is not moved or resized. Views starting after the
    /// insertion point shift by one; views ending at or before it are left
    /// alone.
    pub fn insert_after(&mut self, pointer: View, item: T) -> Result<()> {
        let at = self.views.record(pointer)?.end();
        self.items.insert(at, item);
        self.commit(Edit::Inserted { at, len: 1 }, None);
        Ok(())
    }

    /// Inserts `item` at view-local `index`; the view grows by one.
    pub fn insert_in(&mut self, view: View, index: usize, item: T) -> Result<()> {
        let record = self.views.record(view)?;
        check_window(index, 0, record.count)?;
        let at = record.offset + index;
        self.items.insert(at, item);
        self.commit(Edit::Inserted { at, len: 1 }, Some(view));
        Ok(())
    }

    /// Removes the item at view-local `index`; the view shrinks by one.
    pub fn remove_in(&mut self, view: View, index: usize) -> Result<T> {
        let record = self.views.record(view)?;
        check_index(index, record.count)?;
        let at = record.offset + index;
        let item = self.items.remove(at);
        self.commit(Edit::Removed { at, len: 1 }, Some(view));
        Ok(item)
    }

    /// Removes every item of the view. The view stays valid with length 0.
    pub fn clear_in(&mut self, view: View) -> Result<()> {
        let record = self.views.record(view)?;
        self.drain_window(record.offset, record.count, Some(view));
        Ok(())
    }

    /// Reverses the view's items in place.
    ///
    /// Views wholly inside `view` are mirrored so they keep covering the
    /// same items; partial overlaps die.
    pub fn reverse_in(&mut self, view: View) -> Result<()> {
        let record = self.views.record(view)?;
        self.reverse_window(record.offset, record.count, Some(view));
        Ok(())
    }

    /// Sorts the view's items in natural order. Views wholly inside `view`
    /// keep their position.
    pub fn sort_in(&mut self, view: View) -> Result<()>
    where
        T: Ord,
    {
        let record = self.views.record(view)?;
        self.sort_window(record.offset, record.count, Some(view), |a, b| a.cmp(b));
        Ok(())
    }

    /// Sorts the view's items with `cmp`.
    pub fn sort_in_by<C>(&mut self, view: View, cmp: &C) -> Result<()>
    where
        C: Compare<T>,
    {
        let record = self.views.record(view)?;
        self.sort_window(record.offset, record.count, Some(view), |a, b| {
            cmp.compare(a, b)
        });
        Ok(())
    }

    /// Shuffles the view's items.
    pub fn shuffle_in<R>(&mut self, view: View, rng: &mut R) -> Result<()>
    where
        R: RngCore + ?Sized,
    {
        let record = self.views.record(view)?;
        self.shuffle_window(record.offset, record.count, Some(view), rng);
        Ok(())
    }

    // ========================================================================
    // Cursors
    // ========================================================================

    /// Detached cursor over the whole list.
    pub fn cursor(&self) -> Cursor {
        self.cursor_over(ViewRecord {
            offset: 0,
            count: self.len(),
        })
    }

    /// Detached cursor over the view's current window.
    pub fn cursor_view(&self, view: View) -> Result<Cursor> {
        Ok(self.cursor_over(self.views.record(view)?))
    }

    fn cursor_over(&self, window: ViewRecord) -> Cursor {
        Cursor {
            owner: self.views.owner(),
            stamp: self.stamp,
            next: window.offset,
            end: window.end(),
            poisoned: false,
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    #[inline]
    fn commit(&mut self, edit: Edit, acting: Option<View>) {
        self.stamp = self.stamp.wrapping_add(1);
        self.views.apply(edit, acting);
    }

    fn splice_in(&mut self, at: usize, buffer: Vec<T>, acting: Option<View>) {
        let len = buffer.len();
        if len == 0 {
            return;
        }
        self.items.splice(at..at, buffer);
        self.commit(Edit::Inserted { at, len }, acting);
    }

    fn drain_window(&mut self, at: usize, len: usize, acting: Option<View>) {
        if len == 0 {
            return;
        }
        self.items.drain(at..at + len);
        self.commit(Edit::Removed { at, len }, acting);
    }

    fn reverse_window(&mut self, at: usize, len: usize, acting: Option<View>) {
        if len == 0 {
            return;
        }
        self.items[at..at + len].reverse();
        self.commit(Edit::Reversed { at, len }, acting);
    }

    fn sort_window<F>(&mut self, at: usize, len: usize, acting: Option<View>, cmp: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        if len == 0 {
            return;
        }
        self.items[at..at + len].sort_by(cmp);
        self.commit(Edit::Reordered { at, len }, acting);
    }

    fn shuffle_window<R>(&mut self, at: usize, len: usize, acting: Option<View>, rng: &mut R)
    where
        R: RngCore + ?Sized,
    {
        if len == 0 {
            return;
        }
        // Fisher-Yates
        let window = &mut self.items[at..at + len];
        for i in (1..len).rev() {
            let j = uniform_below(rng, i as u64 + 1) as usize;
            window.swap(i, j);
        }
        self.commit(Edit::Reordered { at, len }, acting);
    }

    #[inline]
    fn check_index(&self, index: usize) -> Result<()> {
        check_index(index, self.len())
    }

    #[inline]
    fn check_position(&self, index: usize) -> Result<()> {
        check_window(index, 0, self.len())
    }

    #[inline]
    fn check_window(&self, start: usize, count: usize) -> Result<()> {
        check_window(start, count, self.len())
    }
}

#[inline]
fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::out_of_bounds(index, 1, len))
    }
}

#[inline]
fn check_window(start: usize, count: usize, len: usize) -> Result<()> {
    match start.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::out_of_bounds(start, count, len)),
    }
}

/// New offset for `record` moved by `delta` with length `count`, if in bounds.
#[inline]
fn slid_offset(record: &ViewRecord, delta: isize, count: usize, len: usize) -> Option<usize> {
    let offset = record.offset.checked_add_signed(delta)?;
    let end = offset.checked_add(count)?;
    (end <= len).then_some(offset)
}

/// Uniform draw from `0..bound`, `bound > 0`. Widening multiply with
/// rejection of the biased low zone.
fn uniform_below<R>(rng: &mut R, bound: u64) -> u64
where
    R: RngCore + ?Sized,
{
    let threshold = bound.wrapping_neg() % bound;
    loop {
        let m = u128::from(rng.next_u64()) * u128::from(bound);
        if m as u64 >= threshold {
            return (m >> 64) as u64;
        }
    }
}

impl<T> From<Vec<T>> for ArrayList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> FromIterator<T> for ArrayList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> Extend<T> for ArrayList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let at = self.len();
        self.splice_in(at, iter.into_iter().collect(), None);
    }
}

/// Clones the items only. The clone starts with no views, and views of the
/// original are not valid on it.
impl<T: Clone> Clone for ArrayList<T> {
    fn clone(&self) -> Self {
        Self::from_vec(self.items.clone())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ArrayList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayList")
            .field("items", &self.items)
            .field("views", &self.views.len())
            .finish()
    }
}

impl<'a, T> IntoIterator for &'a ArrayList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Snapshot-style cursor that does not borrow its list.
///
/// Created by [`ArrayList::cursor`] or [`ArrayList::cursor_view`]. Each call
/// to [`next`](Cursor::next) takes the list again and fails with
/// [`Error::ModifiedDuringEnumeration`] if any structural edit or reorder
/// happened after the cursor was created. Once failed, it stays failed.
///
/// ```
/// use nexus_tracked::{ArrayList, Error};
///
/// let mut list: ArrayList<u32> = (0..4).collect();
/// let mut cursor = list.cursor();
///
/// assert_eq!(cursor.next(&list), Ok(Some(&0)));
/// list.push(4);
/// assert_eq!(cursor.next(&list), Err(Error::ModifiedDuringEnumeration));
/// ```
#[derive(Debug, Clone)]
pub struct Cursor {
    owner: OwnerId,
    stamp: u64,
    next: usize,
    end: usize,
    poisoned: bool,
}

impl Cursor {
    /// Advances the cursor, returning the next item or `Ok(None)` when done.
    pub fn next<'a, T>(&mut self, list: &'a ArrayList<T>) -> Result<Option<&'a T>> {
        if list.views.owner() != self.owner {
            return Err(Error::InvalidReference);
        }
        if self.poisoned || list.stamp != self.stamp {
            self.poisoned = true;
            return Err(Error::ModifiedDuringEnumeration);
        }
        if self.next >= self.end {
            return Ok(None);
        }
        let item = &list.items[self.next];
        self.next += 1;
        Ok(Some(item))
    }

    /// Items not yet visited.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.end - self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn list(items: &[u32]) -> ArrayList<u32> {
        items.to_vec().into()
    }

    #[test]
    fn new_is_empty() {
        let list: ArrayList<u32> = ArrayList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.live_views(), 0);
        assert_eq!(list.get(0), None);
    }

    #[test]
    fn set_returns_old_and_keeps_views() {
        let mut list = list(&[1, 2, 3]);
        let a = list.view(0, 2).unwrap();
        let b = list.view(1, 2).unwrap();

        assert_eq!(list.set(1, 20), Ok(2));
        assert_eq!(list.view_to_vec(a).unwrap(), vec![1, 20]);
        assert_eq!(list.view_to_vec(b).unwrap(), vec![20, 3]);
        assert_eq!(list.set(3, 0), Err(Error::out_of_bounds(3, 1, 3)));
    }

    #[test]
    fn view_bounds() {
        let mut list = list(&[1, 2, 3]);
        assert!(list.view(0, 3).is_ok());
        assert!(list.view(3, 0).is_ok());
        assert_eq!(list.view(2, 2), Err(Error::out_of_bounds(2, 2, 3)));
        assert_eq!(list.view(4, 0), Err(Error::out_of_bounds(4, 0, 3)));
        assert!(list.view(1, usize::MAX).is_err());
    }

    #[test]
    fn view_of_view_flattens() {
        let mut list: ArrayList<u32> = (0..10).collect();
        let outer = list.view(2, 6).unwrap();
        let inner = list.view_of_view(outer, 1, 3).unwrap();

        assert_eq!(list.view_offset(inner), Ok(3));
        assert_eq!(list.view_to_vec(inner).unwrap(), vec![3, 4, 5]);

        // Independent of its source afterwards
        list.drop_view(outer).unwrap();
        assert!(list.is_valid(inner));
        assert!(list.view_of_view(inner, 2, 2).is_err());
    }

    #[test]
    fn first_and_last_view() {
        let mut list = list(&[5, 7, 5, 9]);

        let first = list.first_view(&5).unwrap();
        let last = list.last_view(&5).unwrap();
        assert_eq!(list.view_offset(first), Ok(0));
        assert_eq!(list.view_offset(last), Ok(2));
        assert_eq!(list.view_len(last), Ok(1));

        assert!(list.first_view(&4).is_none());
        assert_eq!(list.live_views(), 2);

        let three = list.last_view_by(|x| x % 3 == 0).unwrap();
        assert_eq!(list.view_get(three, 0), Ok(&9));
    }

    #[test]
    fn slide_out_of_bounds_leaves_view() {
        let mut list = list(&[1, 2, 3, 4]);
        let view = list.view(1, 2).unwrap();

        assert!(list.slide(view, 2).is_err());
        assert!(list.slide(view, -2).is_err());
        assert_eq!(list.view_offset(view), Ok(1));
        assert_eq!(list.view_len(view), Ok(2));

        list.slide(view, -1).unwrap();
        assert_eq!(list.view_to_vec(view).unwrap(), vec![1, 2]);
    }

    #[test]
    fn extreme_slides_report_saturated_bounds() {
        let mut list = list(&[0, 1, 2, 3, 4]);
        let view = list.view(1, 3).unwrap();

        assert_eq!(
            list.slide(view, isize::MAX),
            Err(Error::OutOfBounds {
                start: isize::MAX,
                end: isize::MAX,
                len: 5
            })
        );
        assert_eq!(
            list.slide(view, isize::MIN),
            Err(Error::OutOfBounds {
                start: isize::MIN + 1,
                end: isize::MIN + 4,
                len: 5
            })
        );
        assert!(matches!(
            list.slide_resize(view, 1, isize::MAX as usize),
            Err(Error::OutOfBounds { start: 2, .. })
        ));
        assert!(matches!(
            list.slide_resize(view, 0, usize::MAX),
            Err(Error::OutOfBounds {
                end: isize::MAX,
                ..
            })
        ));
        assert_eq!(list.try_slide(view, isize::MIN), Ok(false));

        assert_eq!(list.view_offset(view), Ok(1));
        assert_eq!(list.view_len(view), Ok(3));
    }

    #[test]
    fn huge_start_reports_isize_max() {
        let mut list = list(&[1, 2, 3]);
        assert_eq!(
            list.view(usize::MAX, 0),
            Err(Error::OutOfBounds {
                start: isize::MAX,
                end: isize::MAX,
                len: 3
            })
        );
        assert_eq!(
            list.set(usize::MAX, 0),
            Err(Error::OutOfBounds {
                start: isize::MAX,
                end: isize::MAX,
                len: 3
            })
        );
    }

    #[test]
    fn slide_resize_checks_new_window() {
        let mut list = list(&[1, 2, 3, 4]);
        let view = list.view(0, 1).unwrap();

        list.slide_resize(view, 1, 3).unwrap();
        assert_eq!(list.view_to_vec(view).unwrap(), vec![2, 3, 4]);

        assert_eq!(list.try_slide_resize(view, 0, 4), Ok(false));
        assert_eq!(list.try_slide_resize(view, -1, 4), Ok(true));
        assert_eq!(list.view_to_vec(view).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn dead_view_errors_are_not_bounds_errors() {
        let mut list = list(&[1, 2, 3]);
        let view = list.view(0, 2).unwrap();
        list.remove_at(1).unwrap();

        assert!(!list.is_valid(view));
        assert_eq!(list.try_slide(view, 100), Err(Error::InvalidReference));
        assert_eq!(list.slide(view, 0), Err(Error::InvalidReference));
        assert_eq!(list.view_get(view, 0), Err(Error::InvalidReference));
        assert_eq!(list.drop_view(view), Err(Error::InvalidReference));
    }

    #[test]
    fn foreign_view_rejected() {
        let mut a = list(&[1, 2]);
        let mut b = list(&[1, 2]);
        let view = a.view(0, 1).unwrap();

        assert!(!b.is_valid(view));
        assert_eq!(b.view_get(view, 0), Err(Error::InvalidReference));
        assert_eq!(b.insert_after(view, 3), Err(Error::InvalidReference));
        assert_eq!(b.as_slice(), &[1, 2]);
    }

    #[test]
    fn insert_after_pointer() {
        let mut list = list(&[1, 2, 3, 4, 5]);
        let before = list.view(0, 1).unwrap();
        let pointer = list.view(1, 2).unwrap();
        let at_point = list.view(3, 2).unwrap();
        let after = list.view(4, 1).unwrap();
        let straddle = list.view(2, 2).unwrap();

        list.insert_after(pointer, 99).unwrap();

        assert_eq!(list.as_slice(), &[1, 2, 3, 99, 4, 5]);
        assert_eq!(list.view_to_vec(before).unwrap(), vec![1]);
        assert_eq!(list.view_to_vec(pointer).unwrap(), vec![2, 3]);
        assert_eq!(list.view_offset(after), Ok(5));
        assert_eq!(list.view_to_vec(after).unwrap(), vec![5]);
        // The new item lands inside both of these windows
        assert!(!list.is_valid(at_point));
        assert!(!list.is_valid(straddle));
    }

    #[test]
    fn span_views() {
        let mut list: ArrayList<u32> = (0..8).collect();
        let a = list.view(1, 2).unwrap();
        let b = list.view(4, 3).unwrap();

        let span = list.span(a, b).unwrap().unwrap();
        assert_eq!(list.view_offset(span), Ok(1));
        assert_eq!(list.view_len(span), Ok(6));

        // a ends before b starts
        assert!(list.span(b, a).unwrap().is_none());

        let touching = list.view(0, 1).unwrap();
        let empty = list.span(a, touching).unwrap().unwrap();
        assert_eq!(list.view_len(empty), Ok(0));
    }

    #[test]
    fn acting_view_grows_and_shrinks() {
        let mut list: ArrayList<u32> = (0..6).collect();
        let view = list.view(1, 3).unwrap();
        let tail = list.view(5, 1).unwrap();

        list.insert_in(view, 3, 100).unwrap();
        assert_eq!(list.view_to_vec(view).unwrap(), vec![1, 2, 3, 100]);
        assert_eq!(list.view_offset(tail), Ok(6));

        assert_eq!(list.remove_in(view, 0), Ok(1));
        assert_eq!(list.view_to_vec(view).unwrap(), vec![2, 3, 100]);
        assert_eq!(list.view_offset(view), Ok(1));
        assert_eq!(list.view_offset(tail), Ok(5));
        assert_eq!(list.view_get(tail, 0), Ok(&5));

        assert!(list.insert_in(view, 4, 0).is_err());
        assert!(list.remove_in(view, 3).is_err());
    }

    #[test]
    fn clear_in_keeps_view_empty() {
        let mut list: ArrayList<u32> = (0..6).collect();
        let view = list.view(2, 2).unwrap();
        let inner = list.view(2, 1).unwrap();
        let tail = list.view(5, 1).unwrap();

        list.clear_in(view).unwrap();

        assert_eq!(list.as_slice(), &[0, 1, 4, 5]);
        assert_eq!(list.view_len(view), Ok(0));
        assert!(!list.is_valid(inner));
        assert_eq!(list.view_offset(tail), Ok(3));
    }

    #[test]
    fn remove_range_inclusive_end() {
        let mut list: ArrayList<u32> = (0..5).collect();
        // start + count == len is accepted
        list.remove_range(3, 2).unwrap();
        assert_eq!(list.as_slice(), &[0, 1, 2]);
        assert!(list.remove_range(2, 2).is_err());
        list.remove_range(3, 0).unwrap();
    }

    #[test]
    fn clear_kills_non_empty_views() {
        let mut list: ArrayList<u32> = (0..4).collect();
        let full = list.view(0, 4).unwrap();
        let front = list.view(0, 0).unwrap();
        let back = list.view(4, 0).unwrap();

        list.clear();

        assert!(!list.is_valid(full));
        assert_eq!(list.view_offset(front), Ok(0));
        assert_eq!(list.view_offset(back), Ok(0));
    }

    #[test]
    fn root_reorder_keeps_only_full_view() {
        let mut list: ArrayList<u32> = (0..5).collect();
        let full = list.view(0, 5).unwrap();
        let part = list.view(1, 2).unwrap();

        list.reverse();

        assert_eq!(list.as_slice(), &[4, 3, 2, 1, 0]);
        assert!(list.is_valid(full));
        assert!(!list.is_valid(part));
    }

    #[test]
    fn view_reorder_rules() {
        let mut list: ArrayList<u32> = vec![5, 4, 3, 2, 1, 0].into();
        let window = list.view(1, 4).unwrap();
        let outside = list.view(0, 1).unwrap();
        let container = list.view(0, 6).unwrap();
        let partial = list.view(3, 3).unwrap();
        let inside = list.view(2, 2).unwrap();

        list.sort_in(window).unwrap();

        assert_eq!(list.as_slice(), &[5, 1, 2, 3, 4, 0]);
        assert!(list.is_valid(window));
        assert!(list.is_valid(outside));
        assert!(list.is_valid(container));
        assert!(!list.is_valid(partial));
        // Wholly inside the sorted window: kept, same position
        assert_eq!(list.view_offset(inside), Ok(2));
        assert_eq!(list.view_to_vec(inside).unwrap(), vec![2, 3]);
    }

    #[test]
    fn view_reverse_mirrors_inner_views() {
        let mut list: ArrayList<u32> = (0..8).collect();
        let window = list.view(1, 6).unwrap();
        let head = list.view(1, 2).unwrap();
        let single = list.view(4, 1).unwrap();
        let partial = list.view(5, 3).unwrap();

        list.reverse_in(window).unwrap();

        assert_eq!(list.as_slice(), &[0, 6, 5, 4, 3, 2, 1, 7]);
        assert_eq!(list.view_offset(head), Ok(5));
        assert_eq!(list.view_to_vec(head).unwrap(), vec![2, 1]);
        assert_eq!(list.view_offset(single), Ok(3));
        assert_eq!(list.view_get(single, 0), Ok(&4));
        assert!(!list.is_valid(partial));
        assert!(list.is_valid(window));
    }

    #[test]
    fn root_reverse_does_not_mirror() {
        let mut list: ArrayList<u32> = (0..4).collect();
        let inner = list.view(0, 1).unwrap();
        list.reverse();
        assert!(!list.is_valid(inner));
    }

    #[test]
    fn sort_by_comparator() {
        let mut list = list(&[3, 1, 2]);
        list.sort_by(&|a: &u32, b: &u32| b.cmp(a));
        assert_eq!(list.as_slice(), &[3, 2, 1]);

        let view = list.view(0, 2).unwrap();
        list.sort_in_by(view, &compare::natural()).unwrap();
        assert_eq!(list.as_slice(), &[2, 3, 1]);
    }

    #[test]
    fn shuffle_is_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut list: ArrayList<u32> = (0..64).collect();
        let view = list.view(10, 20).unwrap();

        list.shuffle_in(view, &mut rng).unwrap();
        let mut window = list.view_to_vec(view).unwrap();
        window.sort_unstable();
        assert_eq!(window, (10..30).collect::<Vec<_>>());
        assert_eq!(&list.as_slice()[..10], &(0..10).collect::<Vec<_>>()[..]);

        list.shuffle(&mut rng);
        let mut all = list.into_vec();
        all.sort_unstable();
        assert_eq!(all, (0..64).collect::<Vec<_>>());
    }

    /// Replays a fixed sequence of words.
    struct Scripted(Vec<u64>);

    impl RngCore for Scripted {
        fn next_u32(&mut self) -> u32 {
            self.next_u64() as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.0.remove(0)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(8) {
                let word = self.next_u64().to_le_bytes();
                chunk.copy_from_slice(&word[..chunk.len()]);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    #[test]
    fn uniform_below_rejects_biased_zone() {
        // 2^64 mod 3 == 1, so the single low word that would bias the
        // result is redrawn
        let mut rng = Scripted(vec![0, u64::MAX]);
        assert_eq!(uniform_below(&mut rng, 3), 2);
        assert!(rng.0.is_empty());

        let mut rng = Scripted(vec![1 << 63]);
        assert_eq!(uniform_below(&mut rng, 3), 1);

        let mut rng = Scripted(vec![0]);
        assert_eq!(uniform_below(&mut rng, 1), 0);
        let mut rng = Scripted(vec![u64::MAX]);
        assert_eq!(uniform_below(&mut rng, u64::MAX), u64::MAX - 1);
    }

    #[test]
    fn shuffle_permutations_are_even() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts = std::collections::HashMap::new();
        let rounds = 60_000;

        for _ in 0..rounds {
            let mut list = list(&[0, 1, 2]);
            list.shuffle(&mut rng);
            *counts.entry(list.into_vec()).or_insert(0u32) += 1;
        }

        assert_eq!(counts.len(), 6);
        for &n in counts.values() {
            assert!((9_400..=10_600).contains(&n), "skewed: {counts:?}");
        }
    }

    #[test]
    fn empty_reorder_is_not_an_edit() {
        let mut list = list(&[1]);
        let stamp = list.stamp();
        let view = list.view(0, 0).unwrap();
        list.reverse_in(view).unwrap();
        assert_eq!(list.stamp(), stamp);
    }

    #[test]
    fn index_in_is_view_local() {
        let mut list = list(&[7, 8, 9, 8]);
        let view = list.view(2, 2).unwrap();
        assert_eq!(list.index_in(view, &8), Ok(Some(1)));
        assert_eq!(list.index_in(view, &7), Ok(None));
        assert_eq!(list.last_index_of(&8), Some(3));
        assert!(list.contains(&9));
    }

    #[test]
    fn insert_all_shifts_by_count() {
        let mut list = list(&[1, 2]);
        let tail = list.view(1, 1).unwrap();
        list.insert_all(0, [10, 11, 12]).unwrap();

        assert_eq!(list.as_slice(), &[10, 11, 12, 1, 2]);
        assert_eq!(list.view_offset(tail), Ok(4));
        assert!(list.insert_all(9, [0]).is_err());
    }

    #[test]
    fn try_insert_all_bounds_error_converts() {
        let mut list = list(&[1, 2]);
        let items: Vec<Result<u32, Error>> = vec![Ok(1)];
        assert_eq!(
            list.try_insert_all(5, items),
            Err(Error::out_of_bounds(5, 0, 2))
        );
    }

    #[test]
    fn cursor_over_view() {
        let mut list: ArrayList<u32> = (0..6).collect();
        let view = list.view(2, 2).unwrap();
        let mut cursor = list.cursor_view(view).unwrap();

        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.next(&list), Ok(Some(&2)));
        assert_eq!(cursor.next(&list), Ok(Some(&3)));
        assert_eq!(cursor.next(&list), Ok(None));

        // Non-structural writes do not poison
        let mut cursor = list.cursor();
        list.set(0, 100).unwrap();
        assert_eq!(cursor.next(&list), Ok(Some(&100)));
    }

    #[test]
    fn cursor_stays_poisoned() {
        let mut list: ArrayList<u32> = (0..3).collect();
        let mut cursor = list.cursor();
        list.sort();
        assert_eq!(cursor.next(&list), Err(Error::ModifiedDuringEnumeration));

        let other: ArrayList<u32> = (0..3).collect();
        assert_eq!(cursor.next(&other), Err(Error::InvalidReference));
        assert_eq!(cursor.next(&list), Err(Error::ModifiedDuringEnumeration));
    }

    #[test]
    fn clone_has_no_views() {
        let mut list = list(&[1, 2]);
        let view = list.view(0, 1).unwrap();
        let copy = list.clone();

        assert_eq!(copy.as_slice(), list.as_slice());
        assert_eq!(copy.live_views(), 0);
        assert!(!copy.is_valid(view));
    }

    #[test]
    fn dropped_view_slot_recycles_safely() {
        let mut list = list(&[1, 2, 3]);
        let old = list.view(0, 1).unwrap();
        list.drop_view(old).unwrap();

        let new = list.view(2, 1).unwrap();
        assert_ne!(old, new);
        assert!(!list.is_valid(old));
        assert_eq!(list.view_get(new, 0), Ok(&3));
    }
}
