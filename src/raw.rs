//! The raw cell underneath every storage.
//!
//! [`RawCell`] is an aligned, uninitialised byte region. It has no idea
//! whether it holds a value or which one; the storage that embeds it tracks
//! that, together with the pointer metadata needed to view the bytes as the
//! base type. Every operation here is `unsafe` and trusts the caller.

use core::alloc::Layout;
use core::mem::{align_of, size_of, MaybeUninit};
use core::ptr::{self, NonNull};

use crate::sptr;

/// `size_of::<Space>()` bytes, aligned to at least a word.
#[repr(C)]
pub struct RawCell<Space> {
    _align: [usize; 0],
    bytes: MaybeUninit<Space>,
}

impl<Space> RawCell<Space> {
    /// Number of bytes a value may occupy.
    pub const CAPACITY: usize = size_of::<Space>();

    /// Largest alignment a value may require.
    pub const ALIGN: usize = align_of::<Self>();

    /// An empty cell.
    #[inline]
    pub const fn new() -> Self {
        RawCell {
            _align: [],
            bytes: MaybeUninit::uninit(),
        }
    }

    /// Whether a `T` can live in this cell.
    #[inline]
    pub const fn fits<T>() -> bool {
        size_of::<T>() <= Self::CAPACITY && align_of::<T>() <= Self::ALIGN
    }

    /// Whether a value with `layout` can live in this cell.
    #[inline]
    pub const fn fits_layout(layout: Layout) -> bool {
        layout.size() <= Self::CAPACITY && layout.align() <= Self::ALIGN
    }

    /// Start of the cell.
    #[inline]
    pub fn addr(&self) -> *const u8 {
        self.bytes.as_ptr().cast()
    }

    /// Start of the cell, writable.
    #[inline]
    pub fn addr_mut(&mut self) -> NonNull<u8> {
        NonNull::from(&mut self.bytes).cast()
    }

    /// Writes `val` at the start of the cell.
    ///
    /// # Safety
    ///
    /// The cell must be empty (a live value would be leaked) and `T` must
    /// [fit](Self::fits).
    #[inline]
    pub unsafe fn construct<T>(&mut self, val: T) -> *mut T {
        debug_assert!(Self::fits::<T>());
        let slot = self.addr_mut().cast::<T>().as_ptr();
        slot.write(val);
        slot
    }

    /// Views the cell as a `B` with the given metadata.
    ///
    /// # Safety
    ///
    /// The result is only dereferenceable if the cell holds a live value
    /// described by `meta`. The address part of `meta` is ignored.
    #[inline]
    pub unsafe fn view<B: ?Sized>(&self, meta: *const B) -> *const B {
        sptr::retarget(meta, self.addr().cast_mut()).cast_const()
    }

    /// Mutable counterpart of [`view`](Self::view).
    ///
    /// # Safety
    ///
    /// See [`view`](Self::view).
    #[inline]
    pub unsafe fn view_mut<B: ?Sized>(&mut self, meta: *const B) -> *mut B {
        sptr::retarget(meta, self.addr_mut().as_ptr())
    }

    /// Drops the value described by `meta`, leaving the cell empty.
    ///
    /// # Safety
    ///
    /// The cell must hold a live value described by `meta`.
    #[inline]
    pub unsafe fn destroy<B: ?Sized>(&mut self, meta: *const B) {
        ptr::drop_in_place(self.view_mut(meta));
    }
}

impl<Space> Default for RawCell<Space> {
    fn default() -> Self {
        Self::new()
    }
}
