use pretty_assertions::assert_eq;
use sc3_array::ArrayBuilder;
use sc3_base::{Allocator, AllocatorBuilder};
use sc3_error::{Lifecycle, Result, ResultExt, Severity, is_new, is_setup, sc3e};

fn lookup(alloc: &Allocator, index: usize) -> Result<u8> {
    let mut builder = sc3e!(ArrayBuilder::new(alloc));
    builder.set_elem_count(4).set_initzero(true);
    let array = sc3e!(builder.setup());
    let value = array.index(index).inherit("lookup")?[0];
    Ok(value)
}

#[test]
fn lifecycle_of_builder_and_array() {
    let alloc = Allocator::new();
    let builder = ArrayBuilder::new(&alloc).unwrap();
    assert!(is_new(Some(&builder)));
    let array = builder.setup().unwrap();
    assert!(is_setup(Some(&array)));
    assert!(array.is_valid());

    let holder = array.clone();
    assert_eq!(array.refcount(), 2);
    assert_eq!(holder.unref(), 1);
    assert!(array.destroy().is_ok());
    assert_eq!(alloc.live_bytes(), 0);
}

#[test]
fn index_failure_keeps_runtime_severity_when_inherited() {
    let alloc = Allocator::new();
    assert_eq!(lookup(&alloc, 2).unwrap(), 0);

    let err = lookup(&alloc, 4).unwrap_err();
    let severities: Vec<_> = err.chain().map(|e| e.severity()).collect();
    assert_eq!(severities, vec![Severity::Runtime, Severity::Runtime]);
    assert_eq!(err.message(), "lookup");
    assert_eq!(err.root_cause().message(), "index 4 out of range for 4 elements");
    drop(err);
    assert_eq!(alloc.live_count(), 0);
}

#[test]
fn resize_respects_allocator_limit() {
    let alloc = AllocatorBuilder::new().set_label("arena").set_limit(4096).setup();
    let mut builder = ArrayBuilder::new(&alloc).unwrap();
    builder.set_elem_size(16).set_elem_alloc(4);
    let array = builder.setup().unwrap();
    assert_eq!(array.allocated_bytes(), 64);

    array.resize(100).unwrap();
    assert_eq!(array.elem_count(), 100);
    assert_eq!(array.allocated_bytes(), 1600);

    let err = array.resize(1000).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(array.elem_count(), 100);
    assert_eq!(array.allocated_bytes(), 1600);
    assert!(err.report(Default::default()).to_string().contains("arena"));
}

#[test]
fn zero_sized_elements() {
    let alloc = Allocator::new();
    let mut builder = ArrayBuilder::new(&alloc).unwrap();
    builder.set_elem_size(0).set_elem_count(5);
    let array = builder.setup().unwrap();
    assert_eq!(array.allocated_bytes(), 0);
    assert!(array.index(4).unwrap().is_empty());
    array.resize(1 << 20).unwrap();
    assert_eq!(array.elem_count(), 1 << 20);
}
