use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;

use alloc::alloc::dealloc;
use alloc::boxed::Box;

use tracing::trace;

use crate::capability::{Duplicate, Relocate};
use crate::error::CapacityError;
use crate::forwarding::ForwardingStorage;
use crate::raw::RawCell;
use crate::storage::{Admit, Storage};
use crate::upcast::Upcast;

/// Holds one value of the family `B` in place, in a cell of
/// `size_of::<Space>()` bytes. Never allocates.
///
/// Every value placed in it must fit: size at most the capacity, alignment
/// at most the cell's (a word, or `Space`'s if larger). A type that does
/// not fit is rejected when the program is built.
///
/// # Example
///
/// ```
/// use polyunion::{impl_upcast, BoundedStorage};
///
/// trait Shape {
///     fn area(&self) -> f64;
/// }
///
/// struct Square(f64);
/// struct Rect(f64, f64);
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.0 * self.0
///     }
/// }
///
/// impl Shape for Rect {
///     fn area(&self) -> f64 {
///         self.0 * self.1
///     }
/// }
///
/// impl_upcast!(dyn Shape);
///
/// let mut shape: BoundedStorage<dyn Shape, [u8; 24]> = BoundedStorage::new(Square(2.0));
/// assert_eq!(shape.area(), 4.0);
///
/// shape.emplace(Rect(2.0, 3.0));
/// assert_eq!(shape.area(), 6.0);
/// ```
///
/// Oversized values do not compile:
///
/// ```compile_fail
/// use polyunion::BoundedStorage;
///
/// let _: BoundedStorage<[u64], [u8; 16]> = BoundedStorage::new([0u64; 3]);
/// ```
pub struct BoundedStorage<B: ?Sized, Space> {
    cell: RawCell<Space>,
    // Metadata of the held value; the address part is never used.
    meta: *const B,
    _phantom: PhantomData<B>,
}

impl<B: ?Sized, Space> BoundedStorage<B, Space> {
    /// Stores `val` in place.
    pub fn new<T>(val: T) -> Self
    where
        B: Upcast<T>,
    {
        const { assert!(RawCell::<Space>::fits::<T>(), "type does not fit the bounded storage") };
        unsafe { Self::new_unchecked(val) }
    }

    /// # Safety
    ///
    /// `T` must fit the cell.
    pub(crate) unsafe fn new_unchecked<T>(val: T) -> Self
    where
        B: Upcast<T>,
    {
        let mut cell = RawCell::new();
        cell.construct(val);
        BoundedStorage {
            cell,
            meta: B::upcast_ptr(NonNull::<T>::dangling().as_ptr()),
            _phantom: PhantomData,
        }
    }

    /// Number of bytes available to a held value.
    pub const fn capacity() -> usize {
        RawCell::<Space>::CAPACITY
    }

    /// Replaces the held value with `val` and returns it.
    ///
    /// # Example
    ///
    /// ```
    /// use std::fmt::Debug;
    /// use polyunion::BoundedStorage;
    /// use polyunion::space::S4;
    ///
    /// let mut value: BoundedStorage<dyn Debug, S4> = BoundedStorage::new(1u8);
    /// *value.emplace(String::new()) += "now a string";
    /// assert_eq!(format!("{:?}", value), "\"now a string\"");
    /// ```
    ///
    /// The size gate applies here as well:
    ///
    /// ```compile_fail
    /// use std::fmt::Debug;
    /// use polyunion::BoundedStorage;
    /// use polyunion::space::S1;
    ///
    /// let mut value: BoundedStorage<dyn Debug, S1> = BoundedStorage::new(1u8);
    /// value.emplace([0u64; 2]);
    /// ```
    pub fn emplace<T>(&mut self, val: T) -> &mut T
    where
        B: Upcast<T>,
    {
        const { assert!(RawCell::<Space>::fits::<T>(), "type does not fit the bounded storage") };
        unsafe { self.emplace_unchecked(val) }
    }

    unsafe fn emplace_unchecked<T>(&mut self, val: T) -> &mut T
    where
        B: Upcast<T>,
    {
        // Assignment drops the old value; the new one is in place even if that drop unwinds.
        *self = Self::new_unchecked(val);
        &mut *self.cell.addr_mut().cast::<T>().as_ptr()
    }

    /// Replaces the held value with a clone of `val`.
    pub fn insert_copy<T: Clone>(&mut self, val: &T) -> &mut T
    where
        B: Upcast<T>,
    {
        self.emplace(val.clone())
    }

    /// Builds a replacement with `f` and stores it only if that succeeds.
    ///
    /// On `Err` the held value is left untouched.
    ///
    /// ```
    /// use polyunion::BoundedStorage;
    /// use polyunion::space::S2;
    ///
    /// let mut value: BoundedStorage<[u32], S2> = BoundedStorage::new([1u32, 2]);
    /// let failed = value.try_emplace_with(|| "x".parse::<u32>().map(|n| [n; 4]));
    /// assert!(failed.is_err());
    /// assert_eq!(&*value, &[1, 2]);
    /// ```
    pub fn try_emplace_with<T, E, F>(&mut self, f: F) -> Result<&mut T, E>
    where
        B: Upcast<T>,
        F: FnOnce() -> Result<T, E>,
    {
        const { assert!(RawCell::<Space>::fits::<T>(), "type does not fit the bounded storage") };
        let val = f()?;
        Ok(unsafe { self.emplace_unchecked(val) })
    }

    /// Pointer to the held value as a `B`.
    #[inline]
    pub fn as_ptr(&self) -> *const B {
        unsafe { self.cell.view(self.meta) }
    }

    /// Mutable pointer to the held value as a `B`.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut B {
        unsafe { self.cell.view_mut(self.meta) }
    }

    /// Moves the held value into a storage with a different capacity.
    ///
    /// The concrete type is no longer known, so the check happens at run
    /// time; a value that does not fit is handed back in the error.
    ///
    /// # Example
    ///
    /// ```
    /// use polyunion::BoundedStorage;
    /// use polyunion::space::{S2, S4, S8};
    ///
    /// let s: BoundedStorage<[usize], S4> = BoundedStorage::new([0usize; 4]);
    /// let l: BoundedStorage<[usize], S8> = s.resize().unwrap();
    /// assert!(l.resize::<S2>().is_err());
    /// ```
    ///
    /// A base that does not list [`Relocate`] cannot be resized:
    ///
    /// ```compile_fail
    /// use polyunion::{impl_upcast, BoundedStorage};
    /// use polyunion::space::{S2, S4};
    ///
    /// trait Shape {}
    /// impl Shape for u32 {}
    /// impl_upcast!(dyn Shape);
    ///
    /// let s: BoundedStorage<dyn Shape, S2> = BoundedStorage::new(1u32);
    /// let _ = s.resize::<S4>();
    /// ```
    pub fn resize<ToSpace>(self) -> Result<BoundedStorage<B, ToSpace>, CapacityError<Self>>
    where
        B: Relocate,
    {
        let layout = Layout::for_value::<B>(&*self);
        if !RawCell::<ToSpace>::fits_layout(layout) {
            return Err(CapacityError::new(
                self,
                layout.size(),
                layout.align(),
                RawCell::<ToSpace>::CAPACITY,
                RawCell::<ToSpace>::ALIGN,
            ));
        }

        let mut this = ManuallyDrop::new(self);
        let mut cell = RawCell::<ToSpace>::new();
        unsafe { B::relocate_into(&mut *this.as_mut_ptr(), cell.addr_mut()) };
        Ok(BoundedStorage {
            cell,
            meta: this.meta,
            _phantom: PhantomData,
        })
    }

    /// Moves a boxed value in place and frees the box.
    ///
    /// ```
    /// use polyunion::BoundedStorage;
    /// use polyunion::space::S2;
    ///
    /// let boxed: Box<[u16]> = Box::new([1, 2, 3]);
    /// let inline = BoundedStorage::<[u16], S2>::try_from_box(boxed).unwrap();
    /// assert_eq!(&*inline, &[1, 2, 3]);
    /// ```
    pub fn try_from_box(boxed: Box<B>) -> Result<Self, CapacityError<Box<B>>>
    where
        B: Relocate,
    {
        let layout = Layout::for_value::<B>(&*boxed);
        if !RawCell::<Space>::fits_layout(layout) {
            return Err(CapacityError::new(
                boxed,
                layout.size(),
                layout.align(),
                RawCell::<Space>::CAPACITY,
                RawCell::<Space>::ALIGN,
            ));
        }

        trace!(size = layout.size(), align = layout.align(), capacity = RawCell::<Space>::CAPACITY, "moving heap value in place");
        let raw = Box::into_raw(boxed);
        let mut cell = RawCell::new();
        unsafe {
            B::relocate_into(&mut *raw, cell.addr_mut());
            if layout.size() != 0 {
                dealloc(raw.cast::<u8>(), layout);
            }
        }
        Ok(BoundedStorage {
            cell,
            meta: raw.cast_const(),
            _phantom: PhantomData,
        })
    }

    /// Converts into a [`ForwardingStorage`] with the same capacity; the
    /// value stays in place.
    pub fn into_forwarding(self) -> ForwardingStorage<B, Space> {
        ForwardingStorage::from(self)
    }
}

impl<B: ?Sized, Space> Drop for BoundedStorage<B, Space> {
    fn drop(&mut self) {
        unsafe { self.cell.destroy(self.meta) }
    }
}

impl<B: ?Sized + Duplicate, Space> Clone for BoundedStorage<B, Space> {
    fn clone(&self) -> Self {
        let mut cell = RawCell::new();
        unsafe { B::duplicate_into(&**self, cell.addr_mut()) };
        BoundedStorage {
            cell,
            meta: self.meta,
            _phantom: PhantomData,
        }
    }
}

impl<B: ?Sized, Space> Storage for BoundedStorage<B, Space> {
    type Base = B;

    fn as_ptr(&self) -> *const B {
        BoundedStorage::as_ptr(self)
    }

    fn as_mut_ptr(&mut self) -> *mut B {
        BoundedStorage::as_mut_ptr(self)
    }
}

impl<T, B: ?Sized + Upcast<T>, Space> Admit<T> for BoundedStorage<B, Space> {
    fn admit(value: T) -> Self {
        Self::new(value)
    }

    fn replace(&mut self, value: T) -> &mut T {
        self.emplace(value)
    }
}

impl_value_traits!([B: ?Sized, Space] BoundedStorage<B, Space>);

unsafe impl<B: ?Sized + Send, Space> Send for BoundedStorage<B, Space> {}
unsafe impl<B: ?Sized + Sync, Space> Sync for BoundedStorage<B, Space> {}

#[cfg(test)]
mod tests {
    use super::BoundedStorage;
    use crate::space::*;
    use core::any::Any;
    use std::cell::Cell;

    #[test]
    fn test_basic() {
        let stacked: BoundedStorage<usize, S1> = BoundedStorage::new(1234usize);
        assert!(*stacked == 1234);

        let pair: BoundedStorage<dyn Any, S2> = BoundedStorage::new((0usize, 1usize));
        assert_eq!(pair.downcast_ref::<(usize, usize)>(), Some(&(0, 1)));
    }

    #[test]
    fn test_pointer_is_inside_storage() {
        let value: BoundedStorage<[u8], S2> = BoundedStorage::new([1u8, 2, 3]);
        let start = core::ptr::from_ref(&value).cast::<u8>();
        let end = start.wrapping_add(core::mem::size_of::<BoundedStorage<[u8], S2>>());
        let held = value.as_ptr().cast::<u8>();
        assert!(start <= held && held < end);
        assert_eq!(value.len(), 3);
    }

    #[test]
    fn test_drop() {
        #[derive(Debug, Clone)]
        struct Struct<'a>(&'a Cell<bool>);
        impl Drop for Struct<'_> {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let flag = Cell::new(false);
        let val: BoundedStorage<Struct<'_>, S2> = BoundedStorage::new(Struct(&flag));
        assert!(!flag.get());

        drop(val);
        assert!(flag.get());
    }

    #[test]
    fn test_dont_drop_space() {
        struct NoDrop(S1);
        impl Drop for NoDrop {
            fn drop(&mut self) {
                unreachable!();
            }
        }

        drop(BoundedStorage::<[bool; 1], NoDrop>::new([true]));
    }

    #[test]
    fn test_emplace_drops_previous() {
        struct Counted<'a>(&'a Cell<u32>);
        impl Drop for Counted<'_> {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let mut value: BoundedStorage<dyn Any, S2> = BoundedStorage::new(0u8);
        value.emplace(7u32);
        assert_eq!(value.downcast_ref::<u32>(), Some(&7));
        *value.emplace(1u64) += 1;
        assert_eq!(value.downcast_ref::<u64>(), Some(&2));

        let flag = Cell::new(0);
        {
            let mut local: BoundedStorage<[Counted<'_>], S2> = BoundedStorage::new([Counted(&flag)]);
            local.emplace([Counted(&flag), Counted(&flag)]);
            assert_eq!(flag.get(), 1);
        }
        assert_eq!(flag.get(), 3);
    }

    #[test]
    fn test_clone() {
        let value: BoundedStorage<[usize], S2> = BoundedStorage::new([0usize, 1]);
        let copy = value.clone();
        assert_eq!(value, copy);
        assert_ne!(value.as_ptr().cast::<u8>(), copy.as_ptr().cast::<u8>());
    }

    #[test]
    fn test_resize() {
        let m = BoundedStorage::<[usize], S4>::new([0usize; 2]);
        let l = m.resize::<S8>().unwrap();
        let m = l.resize::<S4>().unwrap();
        let s = m.resize::<S2>().unwrap();
        let err = s.resize::<S1>().unwrap_err();
        assert_eq!(err.capacity(), core::mem::size_of::<usize>());
        assert_eq!(err.cell_align(), core::mem::align_of::<usize>());
        assert_eq!(*err.into_inner(), [0, 0]);
    }

    #[test]
    fn test_zst() {
        struct ZSpace;

        let zst: BoundedStorage<[usize], ZSpace> = BoundedStorage::new([0usize; 0]);
        assert_eq!(*zst, [0usize; 0]);
        assert_eq!(BoundedStorage::<[usize], ZSpace>::capacity(), 0);
    }

    #[test]
    fn test_try_from_box() {
        let boxed: Box<[u16]> = Box::new([5u16, 6]);
        let inline = BoundedStorage::<[u16], S1>::try_from_box(boxed).unwrap();
        assert_eq!(*inline, [5, 6]);

        let boxed: Box<[u64]> = Box::new([1u64; 4]);
        let err = BoundedStorage::<[u64], S1>::try_from_box(boxed).unwrap_err();
        assert_eq!(err.size(), 32);
        assert_eq!(err.into_inner().len(), 4);
    }
}
