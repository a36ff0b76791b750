//! # polyunion: in-place storage for polymorphic values
//!
//! A `Box<dyn Trait>` always allocates. This crate provides three containers
//! that hold exactly one value of a trait family in a fixed-size cell inside
//! the container, and expose it through the base type `B` (usually a trait
//! object) with [`Deref`](core::ops::Deref):
//!
//! - [`BoundedStorage`] never allocates. Every type it accepts must fit the
//!   cell, which is checked when the program is built.
//! - [`ClosedStorage`] accepts only the members of a set declared with
//!   [`closed_set!`]. Its cell is exactly as large as the largest member.
//! - [`ForwardingStorage`] accepts any type. Values that do not fit the cell
//!   live in their own heap allocation instead.
//!
//! ## Quick Start
//!
//! ```rust
//! use polyunion::{impl_upcast, BoundedStorage, ForwardingStorage};
//! use polyunion::space::S2;
//!
//! trait Shape {
//!     fn area(&self) -> f64;
//! }
//!
//! struct Circle(f64);
//! struct Mesh([f64; 8]);
//!
//! impl Shape for Circle {
//!     fn area(&self) -> f64 {
//!         3.0 * self.0 * self.0
//!     }
//! }
//!
//! impl Shape for Mesh {
//!     fn area(&self) -> f64 {
//!         self.0.iter().sum()
//!     }
//! }
//!
//! // Lets `dyn Shape` be the base of any implementor.
//! impl_upcast!(dyn Shape);
//!
//! let circle: BoundedStorage<dyn Shape, S2> = BoundedStorage::new(Circle(1.0));
//! assert_eq!(circle.area(), 3.0);
//!
//! let mut any: ForwardingStorage<dyn Shape, S2> = ForwardingStorage::new(Circle(2.0));
//! assert!(!any.is_forwarded());
//! any.emplace(Mesh([1.0; 8]));
//! assert!(any.is_forwarded());
//! assert_eq!(any.area(), 8.0);
//! ```
//!
//! ## Capacity
//!
//! The cell of a storage holds `size_of::<Space>()` bytes and is aligned to
//! the larger of a word and `align_of::<Space>()`. The [`space`] module has
//! word-sized presets; any other type works as well:
//!
//! ```rust
//! use polyunion::BoundedStorage;
//!
//! let bytes: BoundedStorage<[u8], [u8; 10]> = BoundedStorage::new([0u8; 10]);
//! assert_eq!(bytes.len(), 10);
//! ```
//!
//! **Important**: a value whose alignment exceeds the cell's never fits,
//! whatever its size.
//!
//! ## Moving and cloning erased values
//!
//! Once stored, the concrete type is only known through `B`. Operations
//! that must move a value to another cell ([`BoundedStorage::resize`],
//! [`ForwardingStorage::into_box`]) need `B: Relocate`, and cloning a
//! storage needs `B: Duplicate`. A trait opts in by naming them as
//! supertraits; see [`Relocate`] and [`Duplicate`].
//!
//! ## Feature Flags
//!
//! - **`std`** (enabled by default)
//!   - Links to the standard library
//!   - Disable for `#![no_std]` environments: `default-features = false`
//!
//! - **`nightly`** (optional, requires nightly)
//!   - Uses the unstable pointer metadata API instead of the layout check in
//!     `build.rs`
//!
//! ## Logging
//!
//! Heap traffic of [`ForwardingStorage`] (spills, releases, heap clones) and
//! moves of boxed values into a cell are reported as `tracing` events at
//! `TRACE` level. In-place operations emit nothing.

#![cfg_attr(feature = "nightly", feature(set_ptr_value))]
#![cfg_attr(not(feature = "std"), no_std)]
#![allow(stable_features)]
#![deny(missing_docs)]
#![deny(clippy::as_conversions)]

extern crate alloc;

#[macro_use]
mod storage;
#[macro_use]
mod upcast;

mod bounded;
mod capability;
mod closed;
mod error;
mod forwarding;
pub mod raw;
pub mod space;
mod sptr;

pub use crate::bounded::BoundedStorage;
pub use crate::capability::{duplicate_in_place, relocate_in_place, Duplicate, Relocate};
pub use crate::closed::{ClosedSet, ClosedStorage, Member};
pub use crate::error::CapacityError;
pub use crate::forwarding::ForwardingStorage;
pub use crate::storage::{Admit, Storage};
pub use crate::upcast::Upcast;
