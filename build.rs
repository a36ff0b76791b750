//! Checks the pointer layout that `src/sptr.rs` relies on without the
//! `nightly` feature: every pointer shape a storage rebuilds must keep its
//! data address in the first word, so that overwriting that word moves the
//! pointer and leaves the metadata alone.

use std::any::Any;
use std::mem::size_of;
use std::ptr::{self, NonNull};

// Stand-ins for the capability supertraits a base usually lists.
trait Relocate {
    fn moved(&self) -> u64;
}

trait Duplicate {
    fn copied(&self) -> u64;
}

trait Base: Relocate + Duplicate {
    fn own(&self) -> u64;
}

struct Pair(u64, u64);

impl Relocate for Pair {
    fn moved(&self) -> u64 {
        self.0
    }
}

impl Duplicate for Pair {
    fn copied(&self) -> u64 {
        self.1
    }
}

impl Base for Pair {
    fn own(&self) -> u64 {
        self.0 + self.1
    }
}

/// Overwrites the first word of `fat` with `addr`, the stable path in `sptr.rs`.
fn retarget<B: ?Sized>(fat: *const B, addr: *mut u8) -> *mut B {
    let mut fat = fat.cast_mut();
    unsafe { NonNull::from(&mut fat).cast::<*mut u8>().as_ptr().write(addr) };
    fat
}

fn layout_broken(shape: &str) -> ! {
    panic!(
        "polyunion rebuilds `{shape}` pointers by overwriting their first word, \
         but on this target that word is not the data address; build with the \
         `nightly` feature instead"
    );
}

/// A trait object whose vtable carries supertrait methods.
fn check_supertrait_object() {
    let source = Pair(1, 2);
    let mut target = Pair(30, 40);
    let meta: *const dyn Base = &source;

    if meta.cast::<u8>() != ptr::from_ref(&source).cast::<u8>() {
        layout_broken("dyn Base");
    }
    let moved = unsafe { &*retarget(meta, ptr::from_mut(&mut target).cast()) };
    if (moved.own(), moved.moved(), moved.copied()) != (70, 30, 40) {
        layout_broken("dyn Base");
    }
}

/// An auto-trait-qualified object, as stored behind `dyn Any + Send + Sync`.
fn check_marker_object() {
    let source = 5u16;
    let mut target = 9u16;
    let meta: *const (dyn Any + Send + Sync) = &source;

    let moved = unsafe { &*retarget(meta, ptr::from_mut(&mut target).cast()) };
    if moved.downcast_ref::<u16>() != Some(&9) {
        layout_broken("dyn Any + Send + Sync");
    }
}

/// A slice pointer built from parts, as the array-to-slice upcast does.
fn check_slice() {
    let mut target = [3u32, 4, 5, 6];
    let meta = ptr::slice_from_raw_parts_mut(NonNull::<u32>::dangling().as_ptr(), 3);

    let moved = unsafe { &*retarget(meta, target.as_mut_ptr().cast()) };
    if moved != [3, 4, 5] {
        layout_broken("[T]");
    }
}

/// Sized bases use the same code path, with a single-word pointer.
fn check_thin() {
    if size_of::<*const Pair>() != size_of::<*mut u8>() {
        layout_broken("*const T");
    }
    let mut target = Pair(7, 8);
    let meta: *const Pair = NonNull::dangling().as_ptr();
    let moved = unsafe { &*retarget(meta, ptr::from_mut(&mut target).cast()) };
    if moved.0 != 7 {
        layout_broken("*const T");
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    // Runs on the host: a cross build to a target with another pointer layout is not caught.
    check_supertrait_object();
    check_marker_object();
    check_slice();
    check_thin();
}
