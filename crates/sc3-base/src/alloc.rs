//! Reference-counted allocator handle with byte accounting.
//!
//! Every sc3 object remembers the allocator it was created with and keeps a
//! reference to it until the object is destroyed. The allocator itself does
//! not hand out memory; it accounts for it. Objects charge their storage
//! against it and the charge is refunded when the storage goes away, so the
//! live counters always describe what is still reachable.

use std::alloc::Layout;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Default label for allocators that were not given one.
const DEFAULT_LABEL: &str = "default";

/// Failure to account for a new allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("allocator '{label}' over limit: {requested} bytes requested, {live} of {limit} live")]
    LimitExceeded {
        label: &'static str,
        requested: usize,
        live: usize,
        limit: usize,
    },

    #[error("allocator '{label}' byte counter overflow on {requested} bytes")]
    Overflow {
        label: &'static str,
        requested: usize,
    },
}

/// An allocator in its setup phase.
///
/// Parameters may only be set here; [`AllocatorBuilder::setup`] turns it into
/// a usable [`Allocator`].
#[derive(Debug, Clone)]
pub struct AllocatorBuilder {
    label: &'static str,
    limit: Option<usize>,
}

impl Default for AllocatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocatorBuilder {
    /// Creates a builder for an unlimited allocator.
    pub fn new() -> Self {
        Self {
            label: DEFAULT_LABEL,
            limit: None,
        }
    }

    /// Name shown in diagnostics.
    pub fn set_label(&mut self, label: &'static str) -> &mut Self {
        self.label = label;
        self
    }

    /// Maximum number of bytes that may be live at the same time.
    pub fn set_limit(&mut self, bytes: usize) -> &mut Self {
        self.limit = Some(bytes);
        self
    }

    /// Ends the setup phase.
    pub fn setup(&self) -> Allocator {
        tracing::trace!(label = self.label, limit = ?self.limit, "allocator setup");
        Allocator {
            inner: Rc::new(AllocatorInner {
                label: self.label,
                limit: self.limit,
                live_bytes: Cell::new(0),
                live_count: Cell::new(0),
                total_count: Cell::new(0),
            }),
        }
    }
}

struct AllocatorInner {
    label: &'static str,
    limit: Option<usize>,
    live_bytes: Cell<usize>,
    live_count: Cell<usize>,
    total_count: Cell<usize>,
}

/// A setup allocator.
///
/// Cloning is `ref`, dropping is `unref`. The count is not atomic, so the
/// handle stays on the thread that created it.
#[derive(Clone)]
pub struct Allocator {
    inner: Rc<AllocatorInner>,
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator {
    /// Creates an unlimited allocator.
    pub fn new() -> Self {
        AllocatorBuilder::new().setup()
    }

    /// Creates an allocator that refuses to keep more than `bytes` live.
    pub fn with_limit(bytes: usize) -> Self {
        AllocatorBuilder::new().set_limit(bytes).setup()
    }

    /// True iff the allocator is in its usage phase and internally consistent.
    pub fn is_setup(&self) -> bool {
        let live = self.inner.live_bytes.get();
        let within_limit = self.inner.limit.is_none_or(|limit| live <= limit);
        within_limit && self.inner.live_count.get() <= self.inner.total_count.get()
    }

    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    pub fn limit(&self) -> Option<usize> {
        self.inner.limit
    }

    /// Number of holders of this allocator, including live charges.
    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Drops this holder and reports how many remain.
    pub fn unref(self) -> usize {
        let remaining = self.refcount() - 1;
        drop(self);
        remaining
    }

    /// Destroys an allocator that has exactly one holder.
    ///
    /// Outstanding charges hold the allocator too, so this fails while any
    /// object backed by it is alive, and reports those objects as leaks.
    /// The handle is returned on failure.
    pub fn destroy(self) -> Result<(), Allocator> {
        if self.refcount() != 1 {
            if let Some(leaks) = self.leaks() {
                tracing::warn!(
                    label = self.label(),
                    count = leaks.count,
                    bytes = leaks.bytes,
                    "allocator destroyed with live objects"
                );
                return Err(self);
            }
            tracing::debug!(
                label = self.label(),
                refcount = self.refcount(),
                live = self.live_count(),
                "refusing to destroy shared allocator"
            );
            return Err(self);
        }
        Ok(())
    }

    /// Objects and bytes still charged, `None` when nothing is live.
    pub fn leaks(&self) -> Option<Leaks> {
        let count = self.live_count();
        let bytes = self.live_bytes();
        (count > 0 || bytes > 0).then_some(Leaks { count, bytes })
    }

    pub fn live_bytes(&self) -> usize {
        self.inner.live_bytes.get()
    }

    pub fn live_count(&self) -> usize {
        self.inner.live_count.get()
    }

    /// Number of charges ever granted.
    pub fn total_count(&self) -> usize {
        self.inner.total_count.get()
    }

    /// Whether two handles refer to the same allocator.
    pub fn ptr_eq(a: &Allocator, b: &Allocator) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Accounts for storage with the given layout.
    pub fn charge(&self, layout: Layout) -> Result<Charge, AllocError> {
        self.charge_bytes(layout.size())
    }

    /// Accounts for `bytes` of storage. The returned guard refunds on drop.
    pub fn charge_bytes(&self, bytes: usize) -> Result<Charge, AllocError> {
        self.reserve(bytes)?;
        let inner = &self.inner;
        inner.live_count.set(inner.live_count.get() + 1);
        inner.total_count.set(inner.total_count.get() + 1);
        Ok(Charge {
            allocator: self.clone(),
            bytes,
        })
    }

    fn reserve(&self, bytes: usize) -> Result<(), AllocError> {
        let live = self.inner.live_bytes.get();
        let next = live.checked_add(bytes).ok_or(AllocError::Overflow {
            label: self.inner.label,
            requested: bytes,
        })?;
        let limit = self.inner.limit.unwrap_or(usize::MAX);
        if next > limit {
            tracing::warn!(label = self.inner.label, bytes, live, limit, "allocation refused");
            return Err(AllocError::LimitExceeded {
                label: self.inner.label,
                requested: bytes,
                live,
                limit,
            });
        }
        self.inner.live_bytes.set(next);
        Ok(())
    }

    fn release(&self, bytes: usize) {
        let inner = &self.inner;
        inner.live_bytes.set(inner.live_bytes.get().saturating_sub(bytes));
    }
}

impl fmt::Debug for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("label", &self.inner.label)
            .field("limit", &self.inner.limit)
            .field("live_bytes", &self.inner.live_bytes.get())
            .field("live_count", &self.inner.live_count.get())
            .field("refcount", &self.refcount())
            .finish()
    }
}

/// What an allocator still accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaks {
    pub count: usize,
    pub bytes: usize,
}

impl fmt::Display for Leaks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} objects, {} bytes", self.count, self.bytes)
    }
}

/// Accounting record for one live allocation.
///
/// Holds a reference to its allocator and refunds the bytes when dropped.
#[derive(Debug)]
pub struct Charge {
    allocator: Allocator,
    bytes: usize,
}

impl Charge {
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    /// Grows or shrinks the charge in place. On failure the old size stays.
    pub fn resize(&mut self, bytes: usize) -> Result<(), AllocError> {
        if bytes > self.bytes {
            self.allocator.reserve(bytes - self.bytes)?;
        } else {
            self.allocator.release(self.bytes - bytes);
        }
        self.bytes = bytes;
        Ok(())
    }
}

impl Drop for Charge {
    fn drop(&mut self) {
        self.allocator.release(self.bytes);
        let inner = &self.allocator.inner;
        inner.live_count.set(inner.live_count.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_and_refund() {
        let alloc = Allocator::new();
        assert!(alloc.is_setup());

        let charge = alloc.charge_bytes(64).unwrap();
        assert_eq!(alloc.live_bytes(), 64);
        assert_eq!(alloc.live_count(), 1);
        assert_eq!(alloc.refcount(), 2);

        drop(charge);
        assert_eq!(alloc.live_bytes(), 0);
        assert_eq!(alloc.live_count(), 0);
        assert_eq!(alloc.total_count(), 1);
        assert_eq!(alloc.refcount(), 1);
    }

    #[test]
    fn test_limit_refuses_overcommit() {
        let alloc = Allocator::with_limit(100);
        let _first = alloc.charge_bytes(60).unwrap();
        let err = alloc.charge_bytes(60).unwrap_err();
        assert_eq!(
            err,
            AllocError::LimitExceeded {
                label: "default",
                requested: 60,
                live: 60,
                limit: 100,
            }
        );
        assert_eq!(alloc.live_count(), 1);
        assert!(alloc.is_setup());
    }

    #[test]
    fn test_resize_charge() {
        let alloc = Allocator::with_limit(128);
        let mut charge = alloc.charge_bytes(16).unwrap();
        charge.resize(128).unwrap();
        assert_eq!(alloc.live_bytes(), 128);
        assert!(charge.resize(129).is_err());
        assert_eq!(charge.bytes(), 128);
        charge.resize(8).unwrap();
        assert_eq!(alloc.live_bytes(), 8);
    }

    #[test]
    fn test_destroy_requires_single_holder() {
        let alloc = AllocatorBuilder::new().set_label("mesh").setup();
        let charge = alloc.charge_bytes(1).unwrap();

        let alloc = alloc.destroy().unwrap_err();
        assert_eq!(alloc.label(), "mesh");

        drop(charge);
        assert!(alloc.destroy().is_ok());
    }

    #[test]
    fn test_leaks_reported_until_released() {
        let alloc = Allocator::new();
        assert_eq!(alloc.leaks(), None);

        let first = alloc.charge_bytes(24).unwrap();
        let _second = alloc.charge_bytes(8).unwrap();
        let leaks = alloc.leaks().unwrap();
        assert_eq!(leaks, Leaks { count: 2, bytes: 32 });
        assert_eq!(leaks.to_string(), "2 objects, 32 bytes");

        let alloc = alloc.destroy().unwrap_err();
        drop(first);
        assert_eq!(alloc.leaks(), Some(Leaks { count: 1, bytes: 8 }));
    }

    #[test]
    fn test_unref_reports_remaining() {
        let alloc = Allocator::new();
        let other = alloc.clone();
        assert!(Allocator::ptr_eq(&alloc, &other));
        assert_eq!(other.unref(), 1);
        assert_eq!(alloc.unref(), 0);
    }
}
