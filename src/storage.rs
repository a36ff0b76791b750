/// A container holding exactly one value, reachable as `Self::Base`.
///
/// Implemented by [`BoundedStorage`](crate::BoundedStorage),
/// [`ClosedStorage`](crate::ClosedStorage) and
/// [`ForwardingStorage`](crate::ForwardingStorage).
pub trait Storage {
    /// The base type the held value is exposed as.
    type Base: ?Sized;

    /// Pointer to the held value, valid until the storage is mutated or moved.
    fn as_ptr(&self) -> *const Self::Base;

    /// Mutable counterpart of [`Storage::as_ptr`].
    fn as_mut_ptr(&mut self) -> *mut Self::Base;
}

/// A [`Storage`] that accepts values of type `T`.
///
/// Each strategy implements this only for the types it admits, so the
/// bounds of a generic `S: Admit<T>` are checked at build time.
pub trait Admit<T>: Storage + Sized {
    /// Creates a storage holding `value`.
    fn admit(value: T) -> Self;

    /// Replaces the held value with `value`, dropping the old one.
    fn replace(&mut self, value: T) -> &mut T;
}

/// Forwards the usual smart pointer traits of a [`Storage`] to its held value.
macro_rules! impl_value_traits {
    ([$($params:tt)*] $ty:ty) => {
        impl<$($params)*> core::ops::Deref for $ty {
            type Target = <$ty as $crate::Storage>::Base;

            #[inline]
            fn deref(&self) -> &Self::Target {
                unsafe { &*$crate::Storage::as_ptr(self) }
            }
        }

        impl<$($params)*> core::ops::DerefMut for $ty {
            #[inline]
            fn deref_mut(&mut self) -> &mut Self::Target {
                unsafe { &mut *$crate::Storage::as_mut_ptr(self) }
            }
        }

        impl<$($params)*> core::fmt::Display for $ty
        where
            <$ty as $crate::Storage>::Base: core::fmt::Display,
        {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&**self, f)
            }
        }

        impl<$($params)*> core::fmt::Debug for $ty
        where
            <$ty as $crate::Storage>::Base: core::fmt::Debug,
        {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Debug::fmt(&**self, f)
            }
        }

        impl<$($params)*> core::fmt::Pointer for $ty {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let ptr = $crate::Storage::as_ptr(self);
                core::fmt::Pointer::fmt(&ptr, f)
            }
        }

        impl<$($params)*> PartialEq for $ty
        where
            <$ty as $crate::Storage>::Base: PartialEq,
        {
            #[inline]
            fn eq(&self, other: &Self) -> bool {
                PartialEq::eq(&**self, &**other)
            }
        }

        impl<$($params)*> Eq for $ty where <$ty as $crate::Storage>::Base: Eq {}

        impl<$($params)*> PartialOrd for $ty
        where
            <$ty as $crate::Storage>::Base: PartialOrd,
        {
            #[inline]
            fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
                PartialOrd::partial_cmp(&**self, &**other)
            }
        }

        impl<$($params)*> Ord for $ty
        where
            <$ty as $crate::Storage>::Base: Ord,
        {
            #[inline]
            fn cmp(&self, other: &Self) -> core::cmp::Ordering {
                Ord::cmp(&**self, &**other)
            }
        }

        impl<$($params)*> core::hash::Hash for $ty
        where
            <$ty as $crate::Storage>::Base: core::hash::Hash,
        {
            fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
                core::hash::Hash::hash(&**self, state);
            }
        }
    };
}
