//! A dense, index-stable collection whose vacant slots form an intrusive free list.
//!
//! This crate provides [`FreeList`], a collection that stores values of one type in a single
//! contiguous block of memory and addresses them by slot index. It is meant for workloads
//! that insert and erase constantly while also needing the live values laid out densely, such
//! as vertex data that is re-uploaded to a GPU every frame.
//!
//! # Key Features
//!
//! - **Stable indices**: A value keeps its slot index until it is erased, even when the block
//!   is reallocated to grow
//! - **Contiguous runs**: [`FreeList::push_slice()`] places a whole run of values in adjacent
//!   slots, and [`FreeList::regions()`] hands out every run of live values as one slice
//! - **No side tables**: Vacant slots store the free list headers in their own bytes
//! - **First-fit reuse**: Insertion reuses the lowest-indexed vacant run that fits, so the
//!   block stays compact
//! - **Coalescing**: Erased ranges merge with adjacent vacant runs immediately
//! - **Pluggable linkage**: [`DoublyLinked`] (default) or [`SinglyLinked`] free-slot headers,
//!   trading minimum element size against the cost of erasure
//! - **Safe by default**: Every safe operation validates bounds and occupancy, with `unsafe`
//!   unchecked variants for hot paths
//!
//! # Element size
//!
//! Because free-slot headers are stored inside vacant slots, the element type must be at least
//! as large as the header: 12 bytes for [`DoublyLinked`] and 8 bytes for [`SinglyLinked`].
//! Smaller element types are rejected at compile time.
//!
//! # Examples
//!
//! ## Basic usage
//!
//! ```rust
//! use free_list::FreeList;
//!
//! let mut list = FreeList::<[f32; 3]>::new();
//!
//! let a = list.push([0.0, 0.0, 0.0]);
//! let b = list.push([1.0, 0.0, 0.0]);
//! let c = list.push([0.0, 1.0, 0.0]);
//!
//! list.erase(b, 1);
//!
//! assert_eq!(list.len(), 2);
//! assert_eq!(list[c], [0.0, 1.0, 0.0]);
//! assert!(list.get(b).is_none());
//!
//! // The vacated slot is the first free one, so it is reused.
//! assert_eq!(list.push([0.0, 0.0, 1.0]), b);
//! # _ = a;
//! ```
//!
//! ## Processing live values as contiguous slices
//!
//! ```rust
//! use free_list::FreeList;
//!
//! let mut list = FreeList::<[f32; 4]>::new();
//!
//! let quad = list.push_slice(&[[0.0; 4], [1.0; 4], [2.0; 4], [3.0; 4]]);
//! list.erase(quad + 1, 1);
//!
//! let mut uploaded = Vec::new();
//!
//! for (start, values) in list.regions() {
//!     uploaded.push((start, values.len()));
//! }
//!
//! assert_eq!(uploaded, vec![(0, 1), (2, 2)]);
//! ```
//!
//! ## Small elements with the singly-linked strategy
//!
//! ```rust
//! use free_list::SinglyLinkedFreeList;
//!
//! let mut list = SinglyLinkedFreeList::<u64>::new();
//!
//! let index = list.push(42);
//! assert_eq!(list[index], 42);
//! ```
//!
//! # Logging
//!
//! Growth, shrinking and clearing of the block are reported as `tracing` events at the `DEBUG`
//! level. Returning slots to the free list is reported at the `TRACE` level.

mod builder;
mod doubly_linked;
mod error;
mod free_list;
mod free_slot;
mod iter;
mod linkage;
mod singly_linked;
mod storage;

pub use builder::{FreeListBuilder, IntegrityChecks};
pub use doubly_linked::*;
pub use error::*;
pub use free_list::*;
pub(crate) use free_slot::*;
pub use iter::*;
pub use linkage::Linkage;
pub(crate) use linkage::LinkagePrivate;
pub use singly_linked::*;
pub(crate) use storage::*;
