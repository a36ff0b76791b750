use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;

use polyunion::space::{S2, S4};
use polyunion::{impl_upcast, Admit, BoundedStorage, Duplicate, Relocate, Storage};

trait Figure: Relocate + Duplicate {
    fn describe(&self) -> String;
    fn scale(&mut self, by: i32);
}

#[derive(Clone)]
struct Point(i16, i16);

#[derive(Clone)]
struct Span(i32, i32);

impl Figure for Point {
    fn describe(&self) -> String {
        format!("point {} {}", self.0, self.1)
    }

    fn scale(&mut self, by: i32) {
        self.0 *= by as i16;
        self.1 *= by as i16;
    }
}

impl Figure for Span {
    fn describe(&self) -> String {
        format!("span {}..{}", self.0, self.1)
    }

    fn scale(&mut self, by: i32) {
        self.1 *= by;
    }
}

impl_upcast!(dyn Figure);

#[test]
fn emplace_switches_dispatch() {
    assert_eq!(std::mem::size_of::<Point>(), 4);
    assert_eq!(std::mem::size_of::<Span>(), 8);

    let mut figure: BoundedStorage<dyn Figure, [u8; 24]> = BoundedStorage::new(Point(2, 3));
    assert_eq!(figure.describe(), "point 2 3");

    figure.emplace(Span(1, 4));
    assert_eq!(figure.describe(), "span 1..4");

    figure.scale(3);
    assert_eq!(figure.describe(), "span 1..12");
}

#[test]
fn value_lives_inside_the_storage() {
    let figure: BoundedStorage<dyn Figure, S2> = BoundedStorage::new(Span(0, 1));
    let start = std::ptr::from_ref(&figure).cast::<u8>() as usize;
    let end = start + std::mem::size_of_val(&figure);
    let held = figure.as_ptr().cast::<u8>() as usize;
    assert!(start <= held && held < end);
}

#[test]
fn clone_is_deep() {
    let mut original: BoundedStorage<dyn Figure, S2> = BoundedStorage::new(Span(1, 2));
    let copy = original.clone();
    original.scale(10);
    assert_eq!(original.describe(), "span 1..20");
    assert_eq!(copy.describe(), "span 1..2");
}

#[test]
fn insert_copy_keeps_source() {
    let source = Point(5, 6);
    let mut figure: BoundedStorage<dyn Figure, S2> = BoundedStorage::new(Span(0, 0));
    figure.insert_copy(&source).scale(2);
    assert_eq!(figure.describe(), "point 10 12");
    assert_eq!(source.describe(), "point 5 6");
}

#[test]
fn failed_emplace_keeps_old_value() {
    let mut figure: BoundedStorage<dyn Figure, S2> = BoundedStorage::new(Point(1, 1));
    let result = figure.try_emplace_with(|| "nope".parse::<i32>().map(|n| Span(n, n)));
    assert!(result.is_err());
    assert_eq!(figure.describe(), "point 1 1");

    let span = figure.try_emplace_with(|| "7".parse::<i32>().map(|n| Span(n, n))).unwrap();
    span.0 = 0;
    assert_eq!(figure.describe(), "span 0..7");
}

#[test]
fn panicking_drop_still_replaces() {
    #[derive(Debug)]
    struct Grenade;
    impl Drop for Grenade {
        fn drop(&mut self) {
            panic!("grenade");
        }
    }

    let mut value: BoundedStorage<dyn Debug, S2> = BoundedStorage::new(Grenade);
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        value.emplace(42u32);
    }));
    assert!(result.is_err());
    assert_eq!(format!("{:?}", value), "42");
}

#[test]
fn borrowed_values_behind_trait_object() {
    let names = vec![String::from("ada"), String::from("grace")];
    let mut value: BoundedStorage<dyn Debug + '_, S4> = BoundedStorage::new(&names[0]);
    assert_eq!(format!("{:?}", value), "\"ada\"");

    value.emplace((&names[1], names.len()));
    assert_eq!(format!("{:?}", value), "(\"grace\", 2)");

    let copy: BoundedStorage<[&String], S4> = BoundedStorage::new([&names[0], &names[1]]);
    assert_eq!(copy.len(), 2);
}

#[test]
fn each_value_dropped_once() {
    let counter = Rc::new(());
    {
        let mut value: BoundedStorage<dyn Debug, S4> = BoundedStorage::new(Rc::clone(&counter));
        assert_eq!(Rc::strong_count(&counter), 2);
        value.emplace((Rc::clone(&counter), Rc::clone(&counter)));
        assert_eq!(Rc::strong_count(&counter), 3);
        value.emplace(0u8);
        assert_eq!(Rc::strong_count(&counter), 1);
        value.emplace(Rc::clone(&counter));
    }
    assert_eq!(Rc::strong_count(&counter), 1);
}

#[test]
fn resize_moves_without_clone() {
    #[derive(Debug)]
    struct Unique<'a>(&'a Cell<u32>);
    impl Drop for Unique<'_> {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    let drops = Cell::new(0);
    let small: BoundedStorage<[Unique<'_>], S2> = BoundedStorage::new([Unique(&drops), Unique(&drops)]);
    let large: BoundedStorage<[Unique<'_>], S4> = small.resize().unwrap();
    assert_eq!(drops.get(), 0);
    assert_eq!(large.len(), 2);
    drop(large);
    assert_eq!(drops.get(), 2);
}

#[test]
fn comparisons_forward_to_value() {
    let a: BoundedStorage<[u8], S2> = BoundedStorage::new([1u8, 2]);
    let b: BoundedStorage<[u8], S2> = BoundedStorage::new([1u8, 3]);
    assert!(a < b);
    assert_ne!(a, b);
    assert_eq!(format!("{:?}", a), "[1, 2]");
}

fn fill<S: Admit<[u32; 2]> + Admit<u8>>(value: u8) -> S {
    let mut storage = <S as Admit<[u32; 2]>>::admit([0u32; 2]);
    Admit::<u8>::replace(&mut storage, value);
    storage
}

#[test]
fn generic_over_storage() {
    let storage: BoundedStorage<dyn Debug, S2> = fill(9);
    assert_eq!(format!("{:?}", unsafe { &*Storage::as_ptr(&storage) }), "9");
}
