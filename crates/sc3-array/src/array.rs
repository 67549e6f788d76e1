//! Arrays of fixed-size elements following the sc3 object lifecycle.
//!
//! An [`ArrayBuilder`] collects parameters, [`ArrayBuilder::setup`] charges
//! the storage to the allocator and returns a refcounted [`Array`]. Elements
//! are raw byte slices of `elem_size` bytes each.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use sc3_base::{Allocator, Charge};
use sc3_error::protocol::debug_check;
use sc3_error::{
    Error, ErrorBuilder, Lifecycle, Location, Message, Phase, Result, Severity, sc3e, sc3e_demand,
};

/// Elements allocated on setup unless configured otherwise.
const DEFAULT_ELEM_ALLOC: usize = 8;

/// Fill byte for storage of arrays set up without `initzero`.
pub const UNINIT_FILL: u8 = 0xCD;

/// An array in its new phase.
#[derive(Debug, Clone)]
pub struct ArrayBuilder {
    allocator: Allocator,
    elem_size: usize,
    elem_count: usize,
    elem_alloc: usize,
    resizable: bool,
    initzero: bool,
}

impl ArrayBuilder {
    /// Creates an array with default parameters bound to `allocator`.
    ///
    /// Defaults: element size 1, count 0, 8 elements allocated, resizable,
    /// not zeroed.
    pub fn new(allocator: &Allocator) -> Result<Self> {
        sc3e_demand!(allocator.is_setup());
        Ok(Self {
            allocator: allocator.clone(),
            elem_size: 1,
            elem_count: 0,
            elem_alloc: DEFAULT_ELEM_ALLOC,
            resizable: true,
            initzero: false,
        })
    }

    /// Element size in bytes. Zero is legal.
    pub fn set_elem_size(&mut self, esize: usize) -> &mut Self {
        self.elem_size = esize;
        self
    }

    /// Number of elements after setup.
    pub fn set_elem_count(&mut self, ecount: usize) -> &mut Self {
        self.elem_count = ecount;
        self
    }

    /// Minimum number of elements to allocate on setup. May be smaller than
    /// the element count.
    pub fn set_elem_alloc(&mut self, ealloc: usize) -> &mut Self {
        self.elem_alloc = ealloc;
        self
    }

    /// Whether the array may be resized after setup.
    pub fn set_resizable(&mut self, resizable: bool) -> &mut Self {
        self.resizable = resizable;
        self
    }

    /// Whether element memory is zeroed on setup and growth.
    pub fn set_initzero(&mut self, initzero: bool) -> &mut Self {
        self.initzero = initzero;
        self
    }

    /// Allocates storage and ends the new phase.
    pub fn setup(self) -> Result<Array> {
        let capacity = self.elem_alloc.max(self.elem_count);
        let bytes = sc3e!(byte_size(self.elem_size, capacity));
        let charge = sc3e!(charge_bytes(&self.allocator, bytes));

        let fill = if self.initzero { 0 } else { UNINIT_FILL };
        let mut data = Vec::with_capacity(bytes);
        data.resize(self.elem_size * self.elem_count, fill);

        tracing::trace!(
            elem_size = self.elem_size,
            elem_count = self.elem_count,
            bytes,
            "array setup"
        );
        Ok(Array {
            inner: Rc::new(ArrayInner {
                allocator: self.allocator,
                elem_size: self.elem_size,
                elem_count: Cell::new(self.elem_count),
                resizable: self.resizable,
                fill,
                data: RefCell::new(data),
                charge: RefCell::new(charge),
            }),
        })
    }
}

impl Lifecycle for ArrayBuilder {
    fn phase(&self) -> Phase {
        Phase::New
    }

    fn check(&self) -> std::result::Result<(), Message> {
        if !self.allocator.is_setup() {
            return Err(Message::new("allocator is not setup"));
        }
        Ok(())
    }
}

struct ArrayInner {
    allocator: Allocator,
    elem_size: usize,
    elem_count: Cell<usize>,
    resizable: bool,
    fill: u8,
    data: RefCell<Vec<u8>>,
    charge: RefCell<Charge>,
}

/// A setup array. `clone` adds a holder; storage is refunded to the
/// allocator with the last one.
#[derive(Clone)]
pub struct Array {
    inner: Rc<ArrayInner>,
}

impl Array {
    pub fn elem_size(&self) -> usize {
        self.inner.elem_size
    }

    pub fn elem_count(&self) -> usize {
        self.inner.elem_count.get()
    }

    pub fn is_resizable(&self) -> bool {
        self.inner.resizable
    }

    pub fn allocator(&self) -> &Allocator {
        &self.inner.allocator
    }

    /// Bytes currently charged to the allocator.
    pub fn allocated_bytes(&self) -> usize {
        self.inner.charge.borrow().bytes()
    }

    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    pub fn unref(self) -> usize {
        let remaining = self.refcount() - 1;
        drop(self);
        remaining
    }

    /// Destroys an array with a single holder.
    ///
    /// The handle is released either way; a shared array only loses this
    /// holder and the call reports a fatal error.
    pub fn destroy(self) -> Result<()> {
        sc3e_demand!(self.refcount() == 1);
        drop(self);
        Ok(())
    }

    /// Borrows element `i`. Out-of-range indices are a runtime error.
    pub fn index(&self, i: usize) -> Result<Ref<'_, [u8]>> {
        let range = self.elem_range(i)?;
        let data = sc3e!(
            self.inner
                .data
                .try_borrow()
                .map_err(|_| Error::new_fatal(file!(), line!(), "array data is being written"))
        );
        Ok(Ref::map(data, |d| &d[range]))
    }

    /// Overwrites element `i` with `value`, which must be one element long.
    pub fn write(&self, i: usize, value: &[u8]) -> Result<()> {
        sc3e_demand!(value.len() == self.elem_size());
        let range = self.elem_range(i)?;
        let mut data = sc3e!(
            self.inner
                .data
                .try_borrow_mut()
                .map_err(|_| Error::new_fatal(file!(), line!(), "array data is borrowed"))
        );
        data[range].copy_from_slice(value);
        Ok(())
    }

    /// Changes the element count, growing the allocation geometrically.
    pub fn resize(&self, new_count: usize) -> Result<()> {
        sc3e_demand!(self.is_resizable());
        let needed = sc3e!(byte_size(self.elem_size(), new_count));

        let Ok(mut charge) = self.inner.charge.try_borrow_mut() else {
            return Err(Error::new_fatal(file!(), line!(), "array storage is borrowed"));
        };
        if needed > charge.bytes() {
            let doubled = needed.max(charge.bytes().saturating_mul(2));
            if charge.resize(doubled).is_err() {
                sc3e!(
                    charge
                        .resize(needed)
                        .map_err(|err| runtime_error(&self.inner.allocator, &err.to_string()))
                );
            }
        }

        let Ok(mut data) = self.inner.data.try_borrow_mut() else {
            return Err(Error::new_fatal(file!(), line!(), "array data is borrowed"));
        };
        data.resize(needed, self.inner.fill);
        self.inner.elem_count.set(new_count);
        debug_check(|| charge.bytes() >= data.len(), "charge covers array data")?;

        tracing::trace!(new_count, bytes = charge.bytes(), "array resized");
        Ok(())
    }

    fn elem_range(&self, i: usize) -> Result<std::ops::Range<usize>> {
        let count = self.elem_count();
        if i >= count {
            return Err(runtime_error(
                &self.inner.allocator,
                &format!("index {i} out of range for {count} elements"),
            ));
        }
        let start = i * self.elem_size();
        Ok(start..start + self.elem_size())
    }
}

impl Lifecycle for Array {
    fn phase(&self) -> Phase {
        Phase::Setup
    }

    fn check(&self) -> std::result::Result<(), Message> {
        let (Ok(data), Ok(charge)) = (self.inner.data.try_borrow(), self.inner.charge.try_borrow())
        else {
            return Err(Message::new("array storage is being written"));
        };
        if !self.inner.allocator.is_setup() {
            return Err(Message::new("allocator is not setup"));
        }
        let (size, count) = (self.elem_size(), self.elem_count());
        if data.len() != size.saturating_mul(count) {
            return Err(Message::new(&format!(
                "{} data bytes for {count} elements of {size} bytes",
                data.len()
            )));
        }
        if charge.bytes() < data.len() {
            return Err(Message::new(&format!(
                "{} bytes charged for {} data bytes",
                charge.bytes(),
                data.len()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Array")
            .field("elem_size", &self.elem_size())
            .field("elem_count", &self.elem_count())
            .field("resizable", &self.is_resizable())
            .field("refcount", &self.refcount())
            .finish()
    }
}

fn byte_size(elem_size: usize, count: usize) -> Result<usize> {
    match elem_size.checked_mul(count) {
        Some(bytes) => Ok(bytes),
        None => Err(Error::new_fatal(
            file!(),
            line!(),
            &format!("{count} elements of {elem_size} bytes overflow"),
        )),
    }
}

fn charge_bytes(allocator: &Allocator, bytes: usize) -> Result<Charge> {
    allocator
        .charge_bytes(bytes)
        .map_err(|err| runtime_error(allocator, &err.to_string()))
}

/// A runtime-severity error at the caller's location.
///
/// When `allocator` has no room left for the error itself this degrades
/// to the fatal error describing that.
#[track_caller]
fn runtime_error(allocator: &Allocator, message: &str) -> Error {
    let site = Location::caller();
    let mut builder = match ErrorBuilder::new(allocator) {
        Ok(builder) => builder,
        Err(fatal) => return fatal,
    };
    builder
        .set_severity(Severity::Runtime)
        .set_location(site.file, site.line)
        .set_message(message);
    builder.setup().unwrap_or_else(|fatal| fatal)
}
