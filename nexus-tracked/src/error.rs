// nexus-tracked/src/error.rs

//! Error type shared by lists, views, heaps and handles.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Failure raised at the point of misuse.
///
/// Every operation checks validity and bounds before it mutates anything,
/// so receiving one of these means the collection is exactly as it was
/// before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Index or window `start..end` falls outside `0..len`.
    #[error("range {start}..{end} out of bounds for length {len}")]
    OutOfBounds {
        /// First index of the rejected range.
        start: isize,
        /// One past the last index of the rejected range.
        end: isize,
        /// Length the range was checked against.
        len: usize,
    },

    /// The view was invalidated, or the handle is dead or belongs to a
    /// different collection.
    #[error("stale or foreign reference")]
    InvalidReference,

    /// Extremal query or removal on an empty heap.
    #[error("collection is empty")]
    EmptyCollection,

    /// A cursor observed a structural change made after it was created.
    #[error("collection was modified during enumeration")]
    ModifiedDuringEnumeration,
}

impl Error {
    /// Bounds error for `start..start + count`. Positions past `isize::MAX`
    /// are reported as `isize::MAX`.
    #[inline]
    pub(crate) fn out_of_bounds(start: usize, count: usize, len: usize) -> Self {
        Error::OutOfBounds {
            start: signed(start),
            end: signed(start.saturating_add(count)),
            len,
        }
    }

    /// Bounds error for a window at `offset` moved by `delta` and resized to
    /// `count`. Saturates instead of overflowing.
    pub(crate) fn slid_out_of_bounds(
        offset: usize,
        delta: isize,
        count: usize,
        len: usize,
    ) -> Self {
        let start = signed(offset).saturating_add(delta);
        Error::OutOfBounds {
            start,
            end: start.saturating_add(signed(count)),
            len,
        }
    }
}

#[inline]
fn signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}
