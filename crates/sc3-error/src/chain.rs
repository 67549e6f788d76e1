//! Causal chains: wrapping constructors, traversal and `pop`.

use std::iter::FusedIterator;
use std::rc::Rc;

use sc3_base::Allocator;

use crate::error::{Error, ErrorBuilder};
use crate::severity::{Severity, SyncStatus};

impl Error {
    /// A standalone fatal error without allocator or cause.
    ///
    /// Cannot fail, so it is safe to use while handling allocation failure.
    pub fn new_fatal(file: &'static str, line: u32, message: &str) -> Error {
        let mut builder = ErrorBuilder::detached();
        builder.set_location(file, line).set_message(message);
        builder.setup_detached()
    }

    /// Wraps `cause` in a new fatal error at the given site.
    ///
    /// Takes ownership of `cause`. Whatever its severity was, a failure that
    /// cannot be handled locally becomes fatal to the caller.
    pub fn new_stack(cause: Error, file: &'static str, line: u32, message: &str) -> Error {
        Self::wrap(cause, Severity::Fatal, file, line, message)
    }

    /// Like [`Error::new_stack`] but keeps the severity of `cause`.
    ///
    /// If storage for the wrapper cannot be had the result is fatal anyway.
    pub fn new_inherit(cause: Error, file: &'static str, line: u32, message: &str) -> Error {
        let severity = cause.severity();
        Self::wrap(cause, severity, file, line, message)
    }

    /// A fresh error with explicit severity and sync status and no cause.
    ///
    /// Falls back to a fatal error at the caller describing why it could not
    /// be built.
    #[track_caller]
    pub fn new_ssm(
        allocator: &Allocator,
        severity: Severity,
        sync: SyncStatus,
        message: &str,
    ) -> Error {
        let mut builder = match ErrorBuilder::new(allocator) {
            Ok(builder) => builder,
            Err(fatal) => return fatal,
        };
        builder
            .set_severity(severity)
            .set_sync(sync)
            .set_message(message);
        builder.setup().unwrap_or_else(|fatal| fatal)
    }

    // The wrapper is charged to the cause's allocator; allocator-free causes
    // get allocator-free wrappers.
    fn wrap(
        cause: Error,
        severity: Severity,
        file: &'static str,
        line: u32,
        message: &str,
    ) -> Error {
        let mut builder = cause
            .allocator()
            .and_then(|alloc| ErrorBuilder::new(alloc).ok())
            .unwrap_or_else(ErrorBuilder::detached);
        builder
            .set_severity(severity)
            .set_location(file, line)
            .set_message(message)
            .set_stack(cause);
        builder.setup_or_fatal()
    }

    /// Frees the top frame and hands its cause to the caller.
    ///
    /// Destructive: only an error with exactly one holder can be popped,
    /// since other holders would see their value disappear. A shared error
    /// comes back untouched as `Err`. Use [`Error::chain`] to look at a chain
    /// without consuming it.
    pub fn pop(self) -> Result<Option<Error>, Error> {
        match Rc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                tracing::trace!(message = inner.message.as_str(), "popping error frame");
                Ok(inner.cause.take())
            }
            Err(inner) => {
                let error = Error { inner };
                tracing::debug!(
                    refcount = error.refcount(),
                    message = error.message(),
                    "refusing to pop shared error"
                );
                Err(error)
            }
        }
    }

    /// Iterates this error and its causes, outermost first.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// The deepest error of the chain.
    pub fn root_cause(&self) -> &Error {
        // chain() always yields at least `self`
        self.chain().last().unwrap_or(self)
    }

    /// Number of frames in the chain, including this one.
    pub fn depth(&self) -> usize {
        self.chain().count()
    }
}

/// Read-only iterator over a cause chain.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<&'a Error>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Error;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause();
        Some(current)
    }
}

impl FusedIterator for Chain<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(alloc: &Allocator, severity: Severity, message: &str) -> Error {
        Error::new_ssm(alloc, severity, SyncStatus::Local, message)
    }

    #[test]
    fn test_new_fatal_is_standalone() {
        let e = Error::new_fatal("a.c", 3, "boom");
        assert!(e.is_fatal());
        assert!(e.allocator().is_none());
        assert!(e.cause().is_none());
        assert_eq!(e.message(), "boom");
    }

    #[test]
    fn test_new_ssm_sets_fields() {
        let alloc = Allocator::new();
        let e = Error::new_ssm(&alloc, Severity::Warning, SyncStatus::Disagree, "ranks disagree");
        assert_eq!(e.severity(), Severity::Warning);
        assert_eq!(e.sync(), SyncStatus::Disagree);
        assert!(e.location().is_none());
        assert!(Allocator::ptr_eq(e.allocator().unwrap(), &alloc));
    }

    #[test]
    fn test_new_ssm_falls_back_to_fatal() {
        let alloc = Allocator::with_limit(0);
        let e = Error::new_ssm(&alloc, Severity::Runtime, SyncStatus::Local, "x");
        assert!(e.is_fatal());
        assert!(e.allocator().is_none());
    }

    #[test]
    fn test_wrap_uses_cause_allocator() {
        let alloc = Allocator::new();
        let cause = leaf(&alloc, Severity::Runtime, "inner");
        let top = Error::new_inherit(cause, "b.c", 9, "outer");
        assert!(Allocator::ptr_eq(top.allocator().unwrap(), &alloc));
        assert_eq!(alloc.live_count(), 2);

        let detached = Error::new_stack(Error::new_fatal("c.c", 1, "x"), "c.c", 2, "y");
        assert!(detached.allocator().is_none());
    }

    #[test]
    fn test_inherit_falls_back_to_fatal_when_full() {
        let frame = std::mem::size_of::<crate::error::ErrorInner>();
        let alloc = Allocator::with_limit(2 * frame);
        let cause = leaf(&alloc, Severity::Warning, "w");
        let mid = Error::new_inherit(cause, "d.c", 1, "again");
        assert_eq!(mid.severity(), Severity::Warning);

        let top = Error::new_inherit(mid, "d.c", 2, "once more");
        assert!(top.is_fatal());
        assert_eq!(top.location(), Some(crate::Location::new("d.c", 2)));
        assert_eq!(top.message(), "once more");
        assert!(top.allocator().is_none());
        assert_eq!(top.depth(), 3);
        assert_eq!(top.root_cause().severity(), Severity::Warning);
    }

    #[test]
    fn test_wrap_keeps_site_when_full() {
        let frame = std::mem::size_of::<crate::error::ErrorInner>();
        let alloc = Allocator::with_limit(frame);
        let cause = leaf(&alloc, Severity::Runtime, "disk full");
        let held = cause.clone();

        let top = Error::new_stack(cause, "io.c", 42, "write failed");
        assert_eq!(crate::get_location(Some(&top)), ("io.c", 42));
        assert_eq!(top.message(), "write failed");
        assert!(top.is_fatal());
        assert!(top.allocator().is_none());
        assert!(Error::ptr_eq(top.cause().unwrap(), &held));
        assert_eq!(alloc.live_count(), 1);
    }

    #[test]
    fn test_new_ssm_fallback_locates_caller() {
        let alloc = Allocator::with_limit(0);
        let line = line!() + 1;
        let e = Error::new_ssm(&alloc, Severity::Warning, SyncStatus::Local, "x");
        assert_eq!(crate::get_location(Some(&e)), (file!(), line));
        assert!(e.message().contains("over limit"));
    }

    #[test]
    fn test_chain_iterates_outermost_first() {
        let alloc = Allocator::new();
        let bottom = leaf(&alloc, Severity::Runtime, "bottom");
        let mid = Error::new_inherit(bottom, "m.c", 2, "mid");
        let top = Error::new_stack(mid, "t.c", 3, "top");

        let messages: Vec<_> = top.chain().map(Error::message).collect();
        assert_eq!(messages, ["top", "mid", "bottom"]);
        assert_eq!(top.depth(), 3);
        assert_eq!(top.root_cause().message(), "bottom");
    }

    #[test]
    fn test_pop_shared_refused() {
        let alloc = Allocator::new();
        let top = Error::new_stack(leaf(&alloc, Severity::Runtime, "x"), "t.c", 1, "top");
        let other = top.clone();
        let top = top.pop().unwrap_err();
        assert_eq!(top.depth(), 2);
        drop(other);
        let cause = top.pop().unwrap().unwrap();
        assert_eq!(cause.message(), "x");
        assert_eq!(alloc.live_count(), 1);
    }

    #[test]
    fn test_pop_last_frame_yields_none() {
        let e = Error::new_fatal("a.c", 1, "only");
        assert!(e.pop().unwrap().is_none());
    }
}
