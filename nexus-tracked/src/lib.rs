//! Collections whose external references survive internal mutation.
//!
//! Two structures hand out plain `Copy` tokens instead of borrows:
//!
//! | Structure | Token | Token tracks |
//! |-----------|-------|--------------|
//! | [`ArrayList`] | [`View`] | an `(offset, count)` window, re-offset by edits elsewhere |
//! | [`IntervalHeap`] | [`Handle`] | one item, through every sift |
//!
//! A token is checked on every use. Once its window is broken by a
//! structural edit, or its item leaves the heap, the token is dead and every
//! operation taking it fails with [`Error::InvalidReference`]. Dead tokens
//! never resolve to something else later, and tokens from one collection
//! never resolve against another.
//!
//! # Views
//!
//! ```
//! use nexus_tracked::ArrayList;
//!
//! let mut list: ArrayList<u32> = (0..10).collect();
//! let tail = list.view(6, 4).unwrap();
//!
//! // Edits before the window shift it
//! list.remove_range(0, 2).unwrap();
//! assert_eq!(list.view_offset(tail), Ok(4));
//! assert_eq!(list.view_to_vec(tail).unwrap(), vec![6, 7, 8, 9]);
//!
//! // Edits through the view resize it
//! list.remove_in(tail, 0).unwrap();
//! assert_eq!(list.view_to_vec(tail).unwrap(), vec![7, 8, 9]);
//! ```
//!
//! # Handles
//!
//! ```
//! use nexus_tracked::IntervalHeap;
//!
//! let mut timers = IntervalHeap::new();
//! let a = timers.insert(300u64);
//! let b = timers.insert(100u64);
//!
//! // Reschedule: the handle stays valid
//! timers.set(a, 50).unwrap();
//! assert_eq!(timers.peek_min_with_handle(), Ok((a, &50)));
//!
//! timers.remove(b).unwrap();
//! assert!(!timers.contains(b));
//! ```
//!
//! # Logging
//!
//! The crate emits [`tracing`] events at `trace` level when a view is
//! invalidated or a handle revived, and at `debug` level when a slot is
//! retired. No subscriber is installed.

#![warn(missing_docs)]

pub mod error;
pub mod handle;
pub mod heap;
pub mod list;
mod slot;
pub mod view;

pub use error::{Error, Result};
pub use handle::Handle;
pub use heap::IntervalHeap;
pub use list::{ArrayList, Cursor};
pub use view::{Edit, View};
