//! Type-erased relocation and duplication.
//!
//! A storage only knows its held value as the base type `B`, so it cannot
//! name the concrete type to move or clone it into another cell. Instead
//! the value does it itself: the base trait lists [`Relocate`] and/or
//! [`Duplicate`] as supertraits, and the vtable entry for each concrete type
//! is a monomorphised [`relocate_in_place`] / [`duplicate_in_place`] that
//! still knows the exact type.
//!
//! ```
//! use polyunion::{impl_upcast, BoundedStorage, Duplicate, Relocate};
//! use polyunion::space::S2;
//!
//! trait Counter: Relocate + Duplicate {
//!     fn get(&self) -> u32;
//! }
//!
//! #[derive(Clone)]
//! struct Fixed(u32);
//!
//! impl Counter for Fixed {
//!     fn get(&self) -> u32 {
//!         self.0
//!     }
//! }
//!
//! impl_upcast!(dyn Counter);
//!
//! let a: BoundedStorage<dyn Counter, S2> = BoundedStorage::new(Fixed(3));
//! let b = a.clone();
//! assert_eq!(b.get(), 3);
//! ```
//!
//! A family member that is not `Clone` cannot implement a base that
//! requires [`Duplicate`]:
//!
//! ```compile_fail
//! use polyunion::{Duplicate, Relocate};
//!
//! trait Counter: Relocate + Duplicate {}
//!
//! struct Unique(u32);
//!
//! impl Counter for Unique {}
//! ```

use core::ptr::{self, NonNull};

/// Values that can move themselves into a caller-supplied address.
///
/// Every sized Rust value can be moved bitwise, so this is implemented for
/// all `T: Sized` and for slices. A base trait opts in by naming it as a
/// supertrait.
///
/// # Safety
///
/// `relocate_into` must leave a valid value of the same type at `dst`, and
/// nothing else.
pub unsafe trait Relocate {
    /// Moves `self` to `dst`.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of `size_of_val(self)` bytes, aligned
    /// to `align_of_val(self)`, and must not overlap `self`. Afterwards
    /// `self` is moved-from: the caller must neither use nor drop it, and
    /// remains responsible for releasing its memory.
    unsafe fn relocate_into(&mut self, dst: NonNull<u8>);
}

/// Values that can write a clone of themselves to a caller-supplied address.
///
/// Implemented for all `T: Clone` and for `[T]` where `T: Clone`. A base
/// trait opts in by naming it as a supertrait; its storages then implement
/// [`Clone`].
///
/// # Safety
///
/// `duplicate_into` must leave a valid value of the same type at `dst`, or
/// unwind leaving nothing live at `dst`.
pub unsafe trait Duplicate {
    /// Writes a clone of `self` to `dst`.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of `size_of_val(self)` bytes, aligned
    /// to `align_of_val(self)`, and must not overlap `self`.
    unsafe fn duplicate_into(&self, dst: NonNull<u8>);
}

/// Moves `src` to `dst` as a `T`.
///
/// # Safety
///
/// Same contract as [`Relocate::relocate_into`].
pub unsafe fn relocate_in_place<T>(src: &mut T, dst: NonNull<u8>) {
    ptr::copy_nonoverlapping(ptr::from_mut(src), dst.cast::<T>().as_ptr(), 1);
}

/// Clones `src` into `dst` as a `T`.
///
/// # Safety
///
/// Same contract as [`Duplicate::duplicate_into`].
pub unsafe fn duplicate_in_place<T: Clone>(src: &T, dst: NonNull<u8>) {
    dst.cast::<T>().as_ptr().write(src.clone());
}

// SAFETY: bitwise copy of exactly one `T`.
unsafe impl<T> Relocate for T {
    unsafe fn relocate_into(&mut self, dst: NonNull<u8>) {
        relocate_in_place::<T>(self, dst)
    }
}

// SAFETY: bitwise copy of every element.
unsafe impl<T> Relocate for [T] {
    unsafe fn relocate_into(&mut self, dst: NonNull<u8>) {
        ptr::copy_nonoverlapping(self.as_ptr(), dst.cast::<T>().as_ptr(), self.len());
    }
}

// SAFETY: writes one `T::clone`, which either returns or unwinds before the write.
unsafe impl<T: Clone> Duplicate for T {
    unsafe fn duplicate_into(&self, dst: NonNull<u8>) {
        duplicate_in_place::<T>(self, dst)
    }
}

// SAFETY: the guard drops the already written prefix if a clone unwinds.
unsafe impl<T: Clone> Duplicate for [T] {
    unsafe fn duplicate_into(&self, dst: NonNull<u8>) {
        struct Written<T> {
            start: *mut T,
            len: usize,
        }

        impl<T> Drop for Written<T> {
            fn drop(&mut self) {
                unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.start, self.len)) }
            }
        }

        let mut written = Written {
            start: dst.cast::<T>().as_ptr(),
            len: 0,
        };
        for item in self {
            written.start.add(written.len).write(item.clone());
            written.len += 1;
        }
        core::mem::forget(written);
    }
}
