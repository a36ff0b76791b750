use core::alloc::Layout;
use core::any::type_name;
use core::mem::{self, align_of, size_of, ManuallyDrop};
use core::ptr::{self, NonNull};

use alloc::alloc::{alloc, dealloc, handle_alloc_error};
use alloc::boxed::Box;

use tracing::trace;

use crate::bounded::BoundedStorage;
use crate::capability::{Duplicate, Relocate};
use crate::error::CapacityError;
use crate::raw::RawCell;
use crate::sptr;
use crate::storage::{Admit, Storage};
use crate::upcast::Upcast;

/// Holds one value of the family `B`: in place when it fits a cell of
/// `size_of::<Space>()` bytes, otherwise in its own heap allocation.
///
/// Unlike [`BoundedStorage`] every type is accepted. The choice is made per
/// value from its static size and alignment, and is observable through
/// [`is_forwarded`](Self::is_forwarded).
///
/// # Example
///
/// ```
/// use polyunion::{impl_upcast, ForwardingStorage};
///
/// trait Greet {
///     fn greet(&self) -> String;
/// }
///
/// struct Small(u32);
/// struct Large([u64; 4]);
///
/// impl Greet for Small {
///     fn greet(&self) -> String {
///         format!("small {}", self.0)
///     }
/// }
///
/// impl Greet for Large {
///     fn greet(&self) -> String {
///         format!("large {}", self.0.len())
///     }
/// }
///
/// impl_upcast!(dyn Greet);
///
/// let mut value: ForwardingStorage<dyn Greet, [u8; 10]> = ForwardingStorage::new(Large([0; 4]));
/// assert!(value.is_forwarded());
/// assert_eq!(value.greet(), "large 4");
///
/// value.emplace(Small(7));
/// assert!(!value.is_forwarded());
/// assert_eq!(value.greet(), "small 7");
/// ```
pub struct ForwardingStorage<B: ?Sized, Space> {
    repr: Repr<B, Space>,
}

enum Repr<B: ?Sized, Space> {
    Inline(BoundedStorage<B, Space>),
    Forwarded(Box<B>),
}

impl<B: ?Sized, Space> Repr<B, Space> {
    fn place<T>(val: T) -> Self
    where
        B: Upcast<T>,
    {
        if RawCell::<Space>::fits::<T>() {
            Repr::Inline(unsafe { BoundedStorage::new_unchecked(val) })
        } else {
            trace!(
                concrete = type_name::<T>(),
                size = size_of::<T>(),
                align = align_of::<T>(),
                capacity = RawCell::<Space>::CAPACITY,
                "forwarding value to the heap"
            );
            let raw = Box::into_raw(Box::new(val));
            Repr::Forwarded(unsafe { Box::from_raw(B::upcast_ptr(raw)) })
        }
    }
}

impl<B: ?Sized, Space> ForwardingStorage<B, Space> {
    /// Stores `val`, in place if it fits.
    pub fn new<T>(val: T) -> Self
    where
        B: Upcast<T>,
    {
        ForwardingStorage {
            repr: Repr::place(val),
        }
    }

    /// Adopts a value that already lives on the heap. It stays there.
    pub fn from_box(boxed: Box<B>) -> Self {
        ForwardingStorage {
            repr: Repr::Forwarded(boxed),
        }
    }

    /// Whether a `T` would be stored in place.
    pub const fn stores_inline<T>() -> bool {
        RawCell::<Space>::fits::<T>()
    }

    /// Returns true if the held value lives on the heap.
    pub fn is_forwarded(&self) -> bool {
        matches!(self.repr, Repr::Forwarded(_))
    }

    /// Replaces the held value with `val` and returns it.
    ///
    /// The new value goes in place or to the heap depending on its own type
    /// only. A heap block held before is released; a new one is allocated
    /// if `T` does not fit.
    pub fn emplace<T>(&mut self, val: T) -> &mut T
    where
        B: Upcast<T>,
    {
        let was_forwarded = self.is_forwarded();
        self.repr = Repr::place(val);
        if was_forwarded && !self.is_forwarded() {
            trace!(concrete = type_name::<T>(), "released heap block, value back in place");
        }
        unsafe { &mut *self.as_mut_ptr().cast::<T>() }
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
    pub fn try_emplace_with<T, E, F>(&mut self, f: F) -> Result<&mut T, E>
    where
        B: Upcast<T>,
        F: FnOnce() -> Result<T, E>,
    {
        let val = f()?;
        Ok(self.emplace(val))
    }

    /// Pointer to the held value as a `B`.
    #[inline]
    pub fn as_ptr(&self) -> *const B {
        match &self.repr {
            Repr::Inline(inline) => inline.as_ptr(),
            Repr::Forwarded(boxed) => ptr::from_ref::<B>(boxed),
        }
    }

    /// Mutable pointer to the held value as a `B`.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut B {
        match &mut self.repr {
            Repr::Inline(inline) => inline.as_mut_ptr(),
            Repr::Forwarded(boxed) => ptr::from_mut::<B>(boxed),
        }
    }

    /// Changes the capacity.
    ///
    /// An in-place value that does not fit the new cell moves to the heap.
    /// A value already on the heap is never moved again.
    ///
    /// # Example
    ///
    /// ```
    /// use polyunion::ForwardingStorage;
    /// use polyunion::space::{S2, S4};
    ///
    /// let s: ForwardingStorage<[usize], S4> = ForwardingStorage::new([0usize; 4]);
    /// let m: ForwardingStorage<[usize], S2> = s.resize();
    /// assert!(m.is_forwarded());
    /// let l: ForwardingStorage<[usize], S4> = m.resize();
    /// assert!(l.is_forwarded());
    /// ```
    pub fn resize<ToSpace>(self) -> ForwardingStorage<B, ToSpace>
    where
        B: Relocate,
    {
        let repr = match self.repr {
            Repr::Forwarded(boxed) => Repr::Forwarded(boxed),
            Repr::Inline(inline) => match inline.resize::<ToSpace>() {
                Ok(inline) => Repr::Inline(inline),
                Err(err) => Repr::Forwarded(relocate_to_heap(err.into_inner())),
            },
        };
        ForwardingStorage { repr }
    }

    /// Converts into a `Box`, moving an in-place value to the heap.
    ///
    /// Needs a base that lists [`Relocate`]:
    ///
    /// ```compile_fail
    /// use polyunion::{impl_upcast, ForwardingStorage};
    /// use polyunion::space::S2;
    ///
    /// trait Shape {}
    /// impl Shape for u32 {}
    /// impl_upcast!(dyn Shape);
    ///
    /// let s: ForwardingStorage<dyn Shape, S2> = ForwardingStorage::new(1u32);
    /// let _ = s.into_box();
    /// ```
    pub fn into_box(self) -> Box<B>
    where
        B: Relocate,
    {
        match self.repr {
            Repr::Forwarded(boxed) => boxed,
            Repr::Inline(inline) => relocate_to_heap(inline),
        }
    }

    /// Converts into a [`BoundedStorage`], moving a heap value back in
    /// place if it fits.
    ///
    /// ```
    /// use polyunion::ForwardingStorage;
    /// use polyunion::space::S2;
    ///
    /// let forwarded = ForwardingStorage::<[u8], S2>::from_box(Box::new([1u8, 2, 3]));
    /// assert!(forwarded.is_forwarded());
    /// let inline = forwarded.try_into_bounded().unwrap();
    /// assert_eq!(&*inline, &[1, 2, 3]);
    /// ```
    pub fn try_into_bounded(self) -> Result<BoundedStorage<B, Space>, CapacityError<Self>>
    where
        B: Relocate,
    {
        match self.repr {
            Repr::Inline(inline) => Ok(inline),
            Repr::Forwarded(boxed) => {
                BoundedStorage::try_from_box(boxed).map_err(|err| err.map(Self::from_box))
            }
        }
    }
}

/// Allocates a block for `layout`, or a dangling address if it is empty.
fn allocate(layout: Layout) -> NonNull<u8> {
    if layout.size() == 0 {
        return sptr::dangling(layout.align());
    }
    let block = unsafe { alloc(layout) };
    NonNull::new(block).unwrap_or_else(|| handle_alloc_error(layout))
}

fn relocate_to_heap<B: ?Sized + Relocate, Space>(inline: BoundedStorage<B, Space>) -> Box<B> {
    let mut inline = ManuallyDrop::new(inline);
    let layout = Layout::for_value::<B>(&**inline);
    trace!(size = layout.size(), align = layout.align(), "moving value to the heap");
    let block = allocate(layout);
    unsafe {
        let src = inline.as_mut_ptr();
        B::relocate_into(&mut *src, block);
        Box::from_raw(sptr::retarget(src, block.as_ptr()))
    }
}

fn duplicate_to_heap<B: ?Sized + Duplicate>(src: &B) -> Box<B> {
    struct Release(NonNull<u8>, Layout);

    impl Drop for Release {
        fn drop(&mut self) {
            if self.1.size() != 0 {
                unsafe { dealloc(self.0.as_ptr(), self.1) }
            }
        }
    }

    let layout = Layout::for_value(src);
    trace!(size = layout.size(), align = layout.align(), "duplicating heap value");
    let block = allocate(layout);
    let release = Release(block, layout);
    unsafe { B::duplicate_into(src, block) };
    mem::forget(release);
    unsafe { Box::from_raw(sptr::retarget(src, block.as_ptr())) }
}

impl<B: ?Sized + Duplicate, Space> Clone for ForwardingStorage<B, Space> {
    fn clone(&self) -> Self {
        let repr = match &self.repr {
            Repr::Inline(inline) => Repr::Inline(inline.clone()),
            Repr::Forwarded(boxed) => Repr::Forwarded(duplicate_to_heap::<B>(boxed)),
        };
        ForwardingStorage { repr }
    }

    fn clone_from(&mut self, source: &Self) {
        if let (Repr::Forwarded(dst), Repr::Forwarded(src)) = (&mut self.repr, &source.repr) {
            *dst = duplicate_to_heap::<B>(src);
            return;
        }
        *self = source.clone();
    }
}

impl<B: ?Sized, Space> From<BoundedStorage<B, Space>> for ForwardingStorage<B, Space> {
    fn from(inline: BoundedStorage<B, Space>) -> Self {
        ForwardingStorage {
            repr: Repr::Inline(inline),
        }
    }
}

impl<B: ?Sized, Space> From<Box<B>> for ForwardingStorage<B, Space> {
    fn from(boxed: Box<B>) -> Self {
        Self::from_box(boxed)
    }
}

impl<B: ?Sized, Space> Storage for ForwardingStorage<B, Space> {
    type Base = B;

    fn as_ptr(&self) -> *const B {
        ForwardingStorage::as_ptr(self)
    }

    fn as_mut_ptr(&mut self) -> *mut B {
        ForwardingStorage::as_mut_ptr(self)
    }
}

impl<T, B: ?Sized + Upcast<T>, Space> Admit<T> for ForwardingStorage<B, Space> {
    fn admit(value: T) -> Self {
        Self::new(value)
    }

    fn replace(&mut self, value: T) -> &mut T {
        self.emplace(value)
    }
}

impl_value_traits!([B: ?Sized, Space] ForwardingStorage<B, Space>);
