/// Erases a concrete type into the base type a storage exposes.
///
/// `Self` is the base (usually a trait object such as `dyn Shape`), `T` is a
/// concrete member of the family. Storages only ever see `T` at construction
/// time; afterwards the value is reached through `*mut Self`.
///
/// # Safety
///
/// [`Upcast::upcast_ptr`] must return the same address it was given, with
/// the pointer metadata (vtable, length) that describes a `T` as a `Self`.
///
/// For trait objects this is the plain unsizing cast, which
/// [`impl_upcast!`](crate::impl_upcast) implements safely.
pub unsafe trait Upcast<T> {
    /// Attaches the metadata of `T` viewed as `Self` to `thin`.
    fn upcast_ptr(thin: *mut T) -> *mut Self;
}

/// Implements [`Upcast`] for a trait object, admitting every sized
/// implementor of the trait.
///
/// The impl covers `dyn Trait + 'a` for every lifetime `'a`, so values
/// holding borrows can be stored behind `dyn Trait + '_`.
///
/// ```
/// use polyunion::{impl_upcast, BoundedStorage};
/// use polyunion::space::S2;
///
/// trait Animal {
///     fn legs(&self) -> u32;
/// }
///
/// struct Bird;
///
/// impl Animal for Bird {
///     fn legs(&self) -> u32 {
///         2
///     }
/// }
///
/// impl_upcast!(dyn Animal);
///
/// let animal: BoundedStorage<dyn Animal, S2> = BoundedStorage::new(Bird);
/// assert_eq!(animal.legs(), 2);
/// ```
#[macro_export]
macro_rules! impl_upcast {
    (dyn $($base:tt)+) => {
        // SAFETY: the unsizing cast keeps the address and attaches the vtable.
        unsafe impl<'a, T: $($base)+ + 'a> $crate::Upcast<T> for dyn $($base)+ + 'a {
            #[allow(clippy::as_conversions)]
            fn upcast_ptr(thin: *mut T) -> *mut Self {
                thin as *mut Self
            }
        }
    };
}

impl_upcast!(dyn core::any::Any);
impl_upcast!(dyn core::any::Any + Send);
impl_upcast!(dyn core::any::Any + Send + Sync);
impl_upcast!(dyn core::fmt::Debug);
impl_upcast!(dyn core::fmt::Display);

// SAFETY: identity.
unsafe impl<T> Upcast<T> for T {
    fn upcast_ptr(thin: *mut T) -> *mut T {
        thin
    }
}

// SAFETY: the slice pointer starts at the array and carries its length.
unsafe impl<T, const N: usize> Upcast<[T; N]> for [T] {
    fn upcast_ptr(thin: *mut [T; N]) -> *mut [T] {
        core::ptr::slice_from_raw_parts_mut(thin.cast::<T>(), N)
    }
}
