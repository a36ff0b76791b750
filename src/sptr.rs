//! Fat pointer plumbing.
//!
//! A storage keeps the metadata (vtable or slice length) of its value in a
//! `*const B` whose address is meaningless, and points it at the real
//! location on every access.

use core::ptr::NonNull;

/// Returns `meta` pointed at `addr`. The metadata is kept as is.
#[cfg(feature = "nightly")]
#[inline]
pub fn retarget<B: ?Sized>(meta: *const B, addr: *mut u8) -> *mut B {
    addr.with_metadata_of(meta)
}

/// Returns `meta` pointed at `addr`. The metadata is kept as is.
///
/// The address is written over the data word, which build.rs checks to be
/// the first word of every pointer shape the storages rebuild. Writing a
/// pointer rather than an integer keeps the provenance of `addr`.
#[cfg(not(feature = "nightly"))]
#[inline]
pub fn retarget<B: ?Sized>(meta: *const B, addr: *mut u8) -> *mut B {
    let mut fat = meta.cast_mut();
    unsafe { NonNull::from(&mut fat).cast::<*mut u8>().as_ptr().write(addr) };
    fat
}

/// A non-null address aligned to `align`, for zero-sized values.
#[inline]
pub fn dangling(align: usize) -> NonNull<u8> {
    debug_assert!(align.is_power_of_two());
    unsafe { NonNull::new_unchecked(core::ptr::null_mut::<u8>().wrapping_add(align)) }
}

#[cfg(test)]
mod tests {
    use super::{dangling, retarget};
    use core::fmt::Debug;

    #[test]
    fn test_retarget_trait_object() {
        let first = 1u32;
        let mut second = 2u32;
        let meta: *const dyn Debug = &first;
        let moved = retarget(meta, core::ptr::addr_of_mut!(second).cast());
        assert_eq!(format!("{:?}", unsafe { &*moved }), "2");
    }

    #[test]
    fn test_retarget_slice_keeps_len() {
        let mut target = [7u16; 5];
        let meta = core::ptr::slice_from_raw_parts(core::ptr::null::<u16>(), 3);
        let view = retarget(meta, target.as_mut_ptr().cast());
        assert_eq!(unsafe { &*view }, &[7, 7, 7]);
    }

    #[test]
    fn test_dangling_is_aligned() {
        for align in [1usize, 8, 64, 4096] {
            assert_eq!(dangling(align).as_ptr().align_offset(align), 0);
        }
    }
}
