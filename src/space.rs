//! Capacity types for the storage cells.
//!
//! A storage is sized by a `Space` type: its cell holds `size_of::<Space>()`
//! bytes. Any type works, e.g. `[u8; 10]` for a ten byte cell. The aliases
//! below are word-sized and word-aligned.
//!
//! ```
//! use polyunion::space::*;
//!
//! assert_eq!(core::mem::size_of::<S4>(), 4 * core::mem::size_of::<usize>());
//! ```

use core::mem::ManuallyDrop;

/// Represents 1 * usize space
pub type S1 = [usize; 1];
/// Represents 2 * usize space
pub type S2 = [usize; 2];
/// Represents 4 * usize space
pub type S4 = [usize; 4];
/// Represents 8 * usize space
pub type S8 = [usize; 8];
/// Represents 16 * usize space
pub type S16 = [usize; 16];
/// Represents 32 * usize space
pub type S32 = [usize; 32];
/// Represents 64 * usize space
pub type S64 = [usize; 64];

/// Space large enough and aligned enough for either `A` or `B`.
///
/// Nesting `Either` yields the space of a whole type list; its size and
/// alignment are the maxima over the list. [`closed_set!`](crate::closed_set)
/// builds these.
///
/// ```
/// use core::mem::{align_of, size_of};
/// use polyunion::space::Either;
///
/// type Three = Either<u8, Either<[u16; 5], u32>>;
/// assert_eq!(size_of::<Three>(), 12);
/// assert_eq!(align_of::<Three>(), 4);
/// ```
#[repr(C)]
pub union Either<A, B> {
    _left: ManuallyDrop<A>,
    _right: ManuallyDrop<B>,
}

/// Expands a list of types to the nested [`Either`] covering all of them.
#[doc(hidden)]
#[macro_export]
macro_rules! closed_space {
    ($only:ty $(,)?) => {
        $only
    };
    ($first:ty, $($rest:ty),+ $(,)?) => {
        $crate::space::Either<$first, $crate::closed_space!($($rest),+)>
    };
}
