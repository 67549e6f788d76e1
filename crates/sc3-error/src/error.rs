//! The error value: a builder for the new phase and a shared handle for the
//! setup phase.

use std::alloc::Layout;
use std::fmt;
use std::rc::Rc;

use sc3_base::{Allocator, Charge};
use serde::Serialize;

use crate::message::Message;
use crate::phase::{Lifecycle, Phase};
use crate::severity::{Severity, SyncStatus};
use crate::Result;

/// Source position where an error was raised or last wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
}

impl Location {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// The location of the function's caller.
    #[track_caller]
    pub fn caller() -> Self {
        let site = std::panic::Location::caller();
        Self::new(site.file(), site.line())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// An error value in its new phase.
///
/// Starts as a `Fatal`, `Local` error without location, message or cause.
/// All setters live here; [`ErrorBuilder::setup`] freezes the value.
#[derive(Debug)]
pub struct ErrorBuilder {
    severity: Severity,
    sync: SyncStatus,
    location: Option<Location>,
    message: Message,
    cause: Option<Error>,
    allocator: Option<Allocator>,
}

impl ErrorBuilder {
    /// Creates a new-phase error bound to `allocator`.
    ///
    /// The allocator is referenced until the error is destroyed.
    pub fn new(allocator: &Allocator) -> Result<Self> {
        crate::sc3e_demand!(allocator.is_setup());
        Ok(Self {
            allocator: Some(allocator.clone()),
            ..Self::detached()
        })
    }

    /// A builder that needs no allocator and whose setup cannot fail.
    pub(crate) fn detached() -> Self {
        Self {
            severity: Severity::Fatal,
            sync: SyncStatus::Local,
            location: None,
            message: Message::default(),
            cause: None,
            allocator: None,
        }
    }

    pub fn set_severity(&mut self, severity: Severity) -> &mut Self {
        self.severity = severity;
        self
    }

    pub fn set_sync(&mut self, sync: SyncStatus) -> &mut Self {
        self.sync = sync;
        self
    }

    /// Records where the error originates. `file` is usually `file!()`.
    pub fn set_location(&mut self, file: &'static str, line: u32) -> &mut Self {
        self.location = Some(Location::new(file, line));
        self
    }

    /// Copies `text`, truncated to the message buffer.
    pub fn set_message(&mut self, text: &str) -> &mut Self {
        self.message.assign(text);
        self
    }

    /// Makes `cause` the next deeper error of this one.
    ///
    /// Ownership of `cause` moves in. A cause set earlier is released first.
    pub fn set_stack(&mut self, cause: Error) -> &mut Self {
        if let Some(previous) = self.cause.replace(cause) {
            tracing::trace!(remaining = previous.refcount() - 1, "replacing error cause");
        }
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn sync(&self) -> SyncStatus {
        self.sync
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_ref()
    }

    /// Ends the new phase and returns the usable error with refcount 1.
    ///
    /// The error's storage is charged against its allocator. If that fails,
    /// the result is an allocator-free fatal error describing the failure at
    /// the caller's location, which keeps this builder's cause as its own.
    #[track_caller]
    pub fn setup(mut self) -> Result<Error> {
        let Some(allocator) = self.allocator.take() else {
            return Ok(self.setup_detached());
        };

        match allocator.charge(Layout::new::<ErrorInner>()) {
            Ok(charge) => Ok(self.finish(Some(charge))),
            Err(err) => {
                tracing::warn!(error = %err, message = self.message(), "error setup failed");
                let site = Location::caller();
                let mut fatal = ErrorBuilder::detached();
                fatal
                    .set_location(site.file, site.line)
                    .set_message(&format!("error setup: {err}: {}", self.message));
                if let Some(cause) = self.cause.take() {
                    fatal.set_stack(cause);
                }
                Err(fatal.setup_detached())
            }
        }
    }

    /// Setup that cannot fail.
    ///
    /// If storage cannot be charged the value is set up without accounting
    /// and escalated to fatal, keeping its location, message and cause.
    pub(crate) fn setup_or_fatal(mut self) -> Error {
        let Some(allocator) = self.allocator.take() else {
            return self.setup_detached();
        };
        match allocator.charge(Layout::new::<ErrorInner>()) {
            Ok(charge) => self.finish(Some(charge)),
            Err(err) => {
                tracing::warn!(error = %err, message = self.message(), "error kept unaccounted");
                self.set_severity(Severity::Fatal);
                self.setup_detached()
            }
        }
    }

    /// Setup without accounting; the builder's allocator, if any, is dropped.
    pub(crate) fn setup_detached(mut self) -> Error {
        self.allocator = None;
        self.finish(None)
    }

    fn finish(self, storage: Option<Charge>) -> Error {
        tracing::trace!(
            severity = %self.severity,
            location = ?self.location,
            message = self.message.as_str(),
            "error setup"
        );
        Error {
            inner: Rc::new(ErrorInner {
                severity: self.severity,
                sync: self.sync,
                location: self.location,
                message: self.message,
                cause: self.cause,
                storage,
            }),
        }
    }
}

impl Lifecycle for ErrorBuilder {
    fn phase(&self) -> Phase {
        Phase::New
    }

    fn check(&self) -> std::result::Result<(), Message> {
        if !self.allocator.as_ref().is_none_or(Allocator::is_setup) {
            return Err(Message::new("allocator is not setup"));
        }
        if let Some(cause) = &self.cause {
            cause
                .check_setup()
                .map_err(|reason| Message::new(&format!("cause: {reason}")))?;
        }
        Ok(())
    }
}

pub(crate) struct ErrorInner {
    pub(crate) severity: Severity,
    pub(crate) sync: SyncStatus,
    pub(crate) location: Option<Location>,
    pub(crate) message: Message,
    pub(crate) cause: Option<Error>,
    storage: Option<Charge>,
}

impl Drop for ErrorInner {
    // Release the cause chain iteratively so deep chains cannot overflow the
    // stack through nested drops.
    fn drop(&mut self) {
        let mut next = self.cause.take();
        while let Some(error) = next {
            next = match Rc::try_unwrap(error.inner) {
                Ok(mut inner) => inner.cause.take(),
                Err(_shared) => None,
            };
        }
    }
}

/// A setup error value.
///
/// A holder of one reference. `clone` (or [`Error::refer`]) adds a holder,
/// dropping (or [`Error::unref`]) removes one; the value, its cause chain and
/// its allocator reference are released with the last holder. The count is
/// not atomic and the handle cannot leave its thread.
pub struct Error {
    pub(crate) inner: Rc<ErrorInner>,
}

impl Clone for Error {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Error {
    /// Adds a holder. Same as `clone`, spelled as the protocol operation.
    pub fn refer(&self) -> Error {
        self.clone()
    }

    /// Number of holders of this value. The owner of a wrapping error counts
    /// as one holder of its cause.
    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Drops this holder and reports how many remain. Zero means the value
    /// was deallocated together with the part of its chain nobody else holds.
    pub fn unref(self) -> usize {
        let remaining = self.refcount() - 1;
        drop(self);
        remaining
    }

    /// Deallocates an error with exactly one holder.
    ///
    /// A shared error is not touched and comes back as `Err`.
    pub fn destroy(self) -> std::result::Result<(), Error> {
        let refcount = self.refcount();
        if refcount != 1 {
            tracing::debug!(refcount, message = self.message(), "refusing to destroy shared error");
            return Err(self);
        }
        drop(self);
        Ok(())
    }

    pub fn severity(&self) -> Severity {
        self.inner.severity
    }

    pub fn sync(&self) -> SyncStatus {
        self.inner.sync
    }

    pub fn location(&self) -> Option<Location> {
        self.inner.location
    }

    pub fn message(&self) -> &str {
        self.inner.message.as_str()
    }

    /// The next deeper error, if any.
    pub fn cause(&self) -> Option<&Error> {
        self.inner.cause.as_ref()
    }

    /// The allocator backing this value; `None` for allocator-free errors.
    pub fn allocator(&self) -> Option<&Allocator> {
        self.inner.storage.as_ref().map(Charge::allocator)
    }

    pub fn is_fatal(&self) -> bool {
        self.severity().is_fatal()
    }

    /// Whether two handles refer to the same value.
    pub fn ptr_eq(a: &Error, b: &Error) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }
}

impl Lifecycle for Error {
    fn phase(&self) -> Phase {
        Phase::Setup
    }

    fn check(&self) -> std::result::Result<(), Message> {
        if !self.allocator().is_none_or(Allocator::is_setup) {
            return Err(Message::new("allocator is not setup"));
        }
        Ok(())
    }
}

/// Location of a possibly missing error, `("", 0)` when unknown.
pub fn get_location(error: Option<&Error>) -> (&'static str, u32) {
    error
        .and_then(Error::location)
        .map_or(("", 0), |loc| (loc.file, loc.line))
}

/// Message of a possibly missing error, `""` when unknown.
pub fn get_message(error: Option<&Error>) -> &str {
    error.map_or("", Error::message)
}

/// Severity of a possibly missing error. A missing error is `Fatal`.
pub fn get_severity(error: Option<&Error>) -> Severity {
    error.map_or(Severity::Fatal, Error::severity)
}

/// Sync status of a possibly missing error, `Local` when unknown.
pub fn get_sync(error: Option<&Error>) -> SyncStatus {
    error.map_or(SyncStatus::Local, Error::sync)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{is_new, is_setup};

    fn builder(alloc: &Allocator) -> ErrorBuilder {
        ErrorBuilder::new(alloc).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let alloc = Allocator::new();
        let b = builder(&alloc);
        assert_eq!(b.severity(), Severity::Fatal);
        assert_eq!(b.sync(), SyncStatus::Local);
        assert!(b.location().is_none());
        assert_eq!(b.message(), "");
        assert!(b.cause().is_none());
        assert_eq!(alloc.refcount(), 2);
    }

    #[test]
    fn test_phase_transition() {
        let alloc = Allocator::new();
        let b = builder(&alloc);
        assert!(is_new(Some(&b)));
        assert!(!is_setup(Some(&b)));
        assert!(b.check().is_ok());

        let e = b.setup().unwrap();
        assert!(is_setup(Some(&e)));
        assert!(!is_new(Some(&e)));
        assert_eq!(e.check_new().unwrap_err().as_str(), "object is already setup");
        assert_eq!(e.refcount(), 1);
        assert_eq!(alloc.live_count(), 1);
    }

    #[test]
    fn test_setters_apply() {
        let alloc = Allocator::new();
        let mut b = builder(&alloc);
        b.set_severity(Severity::Warning)
            .set_sync(SyncStatus::Synced)
            .set_location("mesh.c", 7)
            .set_message("bad refinement");
        let e = b.setup().unwrap();

        assert_eq!(e.severity(), Severity::Warning);
        assert_eq!(e.sync(), SyncStatus::Synced);
        assert_eq!(e.location(), Some(Location::new("mesh.c", 7)));
        assert_eq!(e.message(), "bad refinement");
        assert!(!e.is_fatal());
    }

    #[test]
    fn test_ref_unref_round_trip() {
        let alloc = Allocator::new();
        let e = builder(&alloc).setup().unwrap();

        let other = e.refer();
        assert_eq!(e.refcount(), 2);
        assert_eq!(other.unref(), 1);
        assert_eq!(e.refcount(), 1);
        assert_eq!(alloc.live_count(), 1);

        assert_eq!(e.unref(), 0);
        assert_eq!(alloc.live_count(), 0);
        assert_eq!(alloc.refcount(), 1);
    }

    #[test]
    fn test_destroy_shared_fails() {
        let alloc = Allocator::new();
        let e = builder(&alloc).setup().unwrap();
        let other = e.clone();

        let e = e.destroy().unwrap_err();
        assert_eq!(e.refcount(), 2);
        drop(other);

        assert!(e.destroy().is_ok());
        assert_eq!(alloc.live_count(), 0);
    }

    #[test]
    fn test_set_stack_replaces_cause() {
        let alloc = Allocator::new();
        let first = builder(&alloc).setup().unwrap();
        let second = builder(&alloc).setup().unwrap();
        let held = first.clone();

        let mut b = builder(&alloc);
        b.set_stack(first);
        assert_eq!(held.refcount(), 2);
        b.set_stack(second);
        assert_eq!(held.refcount(), 1);

        let top = b.setup().unwrap();
        assert_eq!(alloc.live_count(), 3);
        drop(top);
        assert_eq!(alloc.live_count(), 1);
    }

    #[test]
    fn test_setup_failure_yields_fatal() {
        let alloc = Allocator::with_limit(0);
        let mut b = builder(&alloc);
        b.set_severity(Severity::Runtime).set_message("orig");
        let fatal = b.setup().unwrap_err();

        assert!(fatal.is_fatal());
        assert!(fatal.allocator().is_none());
        assert!(fatal.message().starts_with("error setup:"));
        assert!(fatal.message().ends_with("orig"));
        assert_eq!(fatal.location().map(|l| l.file), Some(file!()));
        assert_eq!(alloc.refcount(), 1);
    }

    #[test]
    fn test_setup_failure_keeps_cause() {
        let roomy = Allocator::new();
        let cause = builder(&roomy).setup().unwrap();
        let held = cause.clone();

        let tight = Allocator::with_limit(0);
        let mut b = builder(&tight);
        b.set_stack(cause);
        let fatal = b.setup().unwrap_err();
        assert!(Error::ptr_eq(fatal.cause().unwrap(), &held));
    }

    #[test]
    fn test_accessors_tolerate_missing() {
        assert_eq!(get_message(None), "");
        assert_eq!(get_severity(None), Severity::Fatal);
        assert_eq!(get_location(None), ("", 0));
        assert_eq!(get_sync(None), SyncStatus::Local);
    }

    #[test]
    fn test_long_chain_drops_without_recursion() {
        let alloc = Allocator::new();
        let mut top = builder(&alloc).setup().unwrap();
        for _ in 0..100_000 {
            let mut b = builder(&alloc);
            b.set_stack(top);
            top = b.setup().unwrap();
        }
        assert_eq!(alloc.live_count(), 100_001);
        drop(top);
        assert_eq!(alloc.live_count(), 0);
    }
}
