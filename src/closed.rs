use crate::bounded::BoundedStorage;
use crate::capability::Duplicate;
use crate::storage::{Admit, Storage};
use crate::upcast::Upcast;

/// A closed family of types sharing one base.
///
/// Usually declared with [`closed_set!`](crate::closed_set), which picks a
/// `Space` just large enough for every member.
pub trait ClosedSet {
    /// The base type members are viewed as.
    type Base: ?Sized;
    /// Capacity covering the size and alignment of every member.
    type Space;
}

/// Marks `Self` as a member of the set `S`.
pub trait Member<S: ClosedSet> {}

/// Holds one value drawn from the closed set `S`, in place.
///
/// Construction only accepts types implementing [`Member<S>`]; anything else
/// is rejected when the program is built. Since the cell is sized for the
/// largest member, no size check can fail.
///
/// # Example
///
/// ```
/// use polyunion::{closed_set, impl_upcast, ClosedStorage};
///
/// trait Token {
///     fn text(&self) -> String;
/// }
///
/// struct Number(i64);
/// struct Word(&'static str);
/// struct Pair(Number, Number);
///
/// impl Token for Number {
///     fn text(&self) -> String {
///         self.0.to_string()
///     }
/// }
///
/// impl Token for Word {
///     fn text(&self) -> String {
///         self.0.to_owned()
///     }
/// }
///
/// impl Token for Pair {
///     fn text(&self) -> String {
///         format!("{},{}", self.0.text(), self.1.text())
///     }
/// }
///
/// impl_upcast!(dyn Token);
///
/// closed_set! {
///     enum Tokens: dyn Token { Number, Word, Pair }
/// }
///
/// let mut token: ClosedStorage<Tokens> = ClosedStorage::new(Word("let"));
/// assert_eq!(token.text(), "let");
///
/// token.emplace(Pair(Number(1), Number(2)));
/// assert_eq!(token.text(), "1,2");
/// ```
///
/// A type outside the set does not compile, even if it implements the base:
///
/// ```compile_fail
/// use polyunion::{closed_set, ClosedStorage};
///
/// closed_set! {
///     enum Small: dyn core::fmt::Debug { u8, u16 }
/// }
///
/// let _: ClosedStorage<Small> = ClosedStorage::new(1u32);
/// ```
pub struct ClosedStorage<S: ClosedSet> {
    inner: BoundedStorage<S::Base, S::Space>,
}

impl<S: ClosedSet> ClosedStorage<S> {
    /// Stores a member of the set.
    pub fn new<T: Member<S>>(val: T) -> Self
    where
        S::Base: Upcast<T>,
    {
        ClosedStorage {
            inner: BoundedStorage::new(val),
        }
    }

    /// Number of bytes available to a held value: the size of the largest
    /// member.
    pub const fn capacity() -> usize {
        BoundedStorage::<S::Base, S::Space>::capacity()
    }

    /// Replaces the held value with another member and returns it.
    ///
    /// Non-members are rejected here too:
    ///
    /// ```compile_fail
    /// use polyunion::{closed_set, ClosedStorage};
    ///
    /// closed_set! {
    ///     enum Small: dyn core::fmt::Debug { u8, u16 }
    /// }
    ///
    /// let mut value: ClosedStorage<Small> = ClosedStorage::new(1u8);
    /// value.emplace('x');
    /// ```
    pub fn emplace<T: Member<S>>(&mut self, val: T) -> &mut T
    where
        S::Base: Upcast<T>,
    {
        self.inner.emplace(val)
    }

    /// Replaces the held value with a clone of `val`.
    ///
    /// ```compile_fail
    /// use polyunion::{closed_set, ClosedStorage};
    ///
    /// closed_set! {
    ///     enum Small: dyn core::fmt::Debug { u8, u16 }
    /// }
    ///
    /// let mut value: ClosedStorage<Small> = ClosedStorage::new(1u16);
    /// value.insert_copy(&String::from("outsider"));
    /// ```
    pub fn insert_copy<T: Member<S> + Clone>(&mut self, val: &T) -> &mut T
    where
        S::Base: Upcast<T>,
    {
        self.inner.insert_copy(val)
    }

    /// Builds a replacement with `f` and stores it only if that succeeds.
    pub fn try_emplace_with<T: Member<S>, E, F>(&mut self, f: F) -> Result<&mut T, E>
    where
        S::Base: Upcast<T>,
        F: FnOnce() -> Result<T, E>,
    {
        self.inner.try_emplace_with(f)
    }

    /// Pointer to the held value as the set's base.
    #[inline]
    pub fn as_ptr(&self) -> *const S::Base {
        self.inner.as_ptr()
    }

    /// Mutable pointer to the held value as the set's base.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut S::Base {
        self.inner.as_mut_ptr()
    }

    /// Opens the set: the result accepts any type that fits the same cell.
    pub fn into_bounded(self) -> BoundedStorage<S::Base, S::Space> {
        self.inner
    }
}

impl<S: ClosedSet> Clone for ClosedStorage<S>
where
    S::Base: Duplicate,
{
    fn clone(&self) -> Self {
        ClosedStorage {
            inner: self.inner.clone(),
        }
    }
}

impl<S: ClosedSet> Storage for ClosedStorage<S> {
    type Base = S::Base;

    fn as_ptr(&self) -> *const S::Base {
        ClosedStorage::as_ptr(self)
    }

    fn as_mut_ptr(&mut self) -> *mut S::Base {
        ClosedStorage::as_mut_ptr(self)
    }
}

impl<S: ClosedSet, T: Member<S>> Admit<T> for ClosedStorage<S>
where
    S::Base: Upcast<T>,
{
    fn admit(value: T) -> Self {
        Self::new(value)
    }

    fn replace(&mut self, value: T) -> &mut T {
        self.emplace(value)
    }
}

impl_value_traits!([S: ClosedSet] ClosedStorage<S>);

/// Declares a closed set of types sharing a base.
///
/// Expands to an uninhabited marker type implementing [`ClosedSet`], whose
/// space is the union of the members, and a [`Member`] impl per member. Every
/// member is checked to upcast to the base.
///
/// ```
/// use polyunion::{closed_set, ClosedSet, ClosedStorage};
/// use core::fmt::Debug;
///
/// closed_set! {
///     pub enum Numbers: dyn Debug { u8, u64, [u16; 6] }
/// }
///
/// assert_eq!(core::mem::size_of::<<Numbers as ClosedSet>::Space>(), 16);
/// let n: ClosedStorage<Numbers> = ClosedStorage::new([7u16; 6]);
/// assert_eq!(format!("{:?}", n), "[7, 7, 7, 7, 7, 7]");
/// ```
#[macro_export]
macro_rules! closed_set {
    ($(#[$attr:meta])* $vis:vis enum $name:ident : $base:ty { $($member:ty),+ $(,)? }) => {
        $(#[$attr])*
        $vis enum $name {}

        impl $crate::ClosedSet for $name {
            type Base = $base;
            type Space = $crate::closed_space!($($member),+);
        }

        $(
            impl $crate::Member<$name> for $member {}
        )+

        const _: fn() = || {
            fn assert_upcast<B: ?Sized + $crate::Upcast<T>, T>() {}
            $(
                assert_upcast::<$base, $member>();
            )+
        };
    };
}

#[cfg(test)]
mod tests {
    use super::{ClosedSet, ClosedStorage};
    use crate::capability::{Duplicate, Relocate};
    use core::mem::{align_of, size_of};
    use std::cell::Cell;
    use std::rc::Rc;

    trait Shape: Relocate + Duplicate {
        fn area(&self) -> u64;
    }

    #[derive(Clone)]
    struct Dot;

    #[derive(Clone)]
    struct Square(u32);

    #[derive(Clone)]
    struct Poly([u64; 3]);

    impl Shape for Dot {
        fn area(&self) -> u64 {
            0
        }
    }

    impl Shape for Square {
        fn area(&self) -> u64 {
            u64::from(self.0) * u64::from(self.0)
        }
    }

    impl Shape for Poly {
        fn area(&self) -> u64 {
            self.0.iter().sum()
        }
    }

    crate::impl_upcast!(dyn Shape);

    crate::closed_set! {
        enum Shapes: dyn Shape { Dot, Square, Poly }
    }

    #[test]
    fn test_space_is_largest_member() {
        type Space = <Shapes as ClosedSet>::Space;
        assert_eq!(size_of::<Space>(), size_of::<Poly>());
        assert_eq!(align_of::<Space>(), align_of::<u64>());
        assert_eq!(ClosedStorage::<Shapes>::capacity(), 24);
    }

    #[test]
    fn test_emplace_members() {
        let mut shape: ClosedStorage<Shapes> = ClosedStorage::new(Dot);
        assert_eq!(shape.area(), 0);

        shape.emplace(Square(3));
        assert_eq!(shape.area(), 9);

        let poly = Poly([1, 2, 3]);
        shape.insert_copy(&poly);
        assert_eq!(shape.area(), 6);

        let failed: Result<&mut Square, ()> = shape.try_emplace_with(|| Err(()));
        assert!(failed.is_err());
        assert_eq!(shape.area(), 6);
    }

    #[test]
    fn test_clone_and_open() {
        let shape: ClosedStorage<Shapes> = ClosedStorage::new(Square(2));
        let copy = shape.clone();
        assert_eq!(copy.area(), 4);

        let mut open = shape.into_bounded();
        open.emplace(Square(5));
        assert_eq!(open.area(), 25);
    }

    #[test]
    fn test_drop_once() {
        struct Tracked(Rc<Cell<u32>>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        crate::closed_set! {
            enum Tracking: Tracked { Tracked }
        }

        let drops = Rc::new(Cell::new(0));
        {
            let mut value: ClosedStorage<Tracking> = ClosedStorage::new(Tracked(drops.clone()));
            value.emplace(Tracked(drops.clone()));
            assert_eq!(drops.get(), 1);
        }
        assert_eq!(drops.get(), 2);
    }
}
