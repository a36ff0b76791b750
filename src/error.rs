use core::fmt;

/// A value whose concrete type was only known at run time did not fit a
/// storage cell.
///
/// Returned by conversions that move an already type-erased value into an
/// in-place cell, such as [`BoundedStorage::resize`](crate::BoundedStorage::resize).
/// The rejected value is handed back untouched.
///
/// ```
/// use polyunion::BoundedStorage;
/// use polyunion::space::{S1, S4};
///
/// let wide: BoundedStorage<[u64], S4> = BoundedStorage::new([7u64; 3]);
/// let err = wide.resize::<S1>().unwrap_err();
/// assert_eq!(err.size(), 24);
/// assert_eq!(err.into_inner()[2], 7);
/// ```
#[derive(thiserror::Error)]
#[error("value of {size} bytes (align {align}) does not fit a {capacity} byte cell (align {cell_align})")]
pub struct CapacityError<T> {
    value: T,
    size: usize,
    align: usize,
    capacity: usize,
    cell_align: usize,
}

impl<T> CapacityError<T> {
    pub(crate) fn new(value: T, size: usize, align: usize, capacity: usize, cell_align: usize) -> Self {
        CapacityError {
            value,
            size,
            align,
            capacity,
            cell_align,
        }
    }

    /// Size of the rejected value in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment of the rejected value.
    pub fn align(&self) -> usize {
        self.align
    }

    /// Capacity of the cell that rejected it.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest alignment the cell that rejected it supports.
    pub fn cell_align(&self) -> usize {
        self.cell_align
    }

    /// Recovers the rejected value.
    pub fn into_inner(self) -> T {
        self.value
    }

    pub(crate) fn map<U>(self, f: impl FnOnce(T) -> U) -> CapacityError<U> {
        CapacityError {
            value: f(self.value),
            size: self.size,
            align: self.align,
            capacity: self.capacity,
            cell_align: self.cell_align,
        }
    }
}

impl<T> fmt::Debug for CapacityError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapacityError")
            .field("size", &self.size)
            .field("align", &self.align)
            .field("capacity", &self.capacity)
            .field("cell_align", &self.cell_align)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::CapacityError;

    fn takes_error(e: &dyn core::error::Error) -> String {
        e.to_string()
    }

    #[test]
    fn test_accessors() {
        let err = CapacityError::new([1u8; 3], 3, 1, 2, 8);
        assert_eq!((err.size(), err.align(), err.capacity(), err.cell_align()), (3, 1, 2, 8));
        assert_eq!(err.into_inner(), [1, 1, 1]);
    }

    #[test]
    fn test_message() {
        let err = CapacityError::new((), 32, 8, 16, 8);
        assert_eq!(
            takes_error(&err),
            "value of 32 bytes (align 8) does not fit a 16 byte cell (align 8)"
        );
        assert_eq!(
            format!("{:?}", err),
            "CapacityError { size: 32, align: 8, capacity: 16, cell_align: 8, .. }"
        );
    }
}
