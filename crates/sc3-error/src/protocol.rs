//! Function forms of the propagation conventions.
//!
//! The macros in this crate capture `file!()`/`line!()` and the source text
//! of the failing expression. The combinators here take the location from
//! `#[track_caller]` and an explicit message instead, for call sites that
//! read better as method chains.

use crate::error::{Error, Location};
use crate::Result;

/// Wrap-and-return and collect combinators on `Result<T, Error>`.
pub trait ResultExt<T> {
    /// Wraps an error as fatal at the caller's location.
    fn stack(self, message: &str) -> Result<T>;

    /// Wraps an error at the caller's location, keeping its severity.
    fn inherit(self, message: &str) -> Result<T>;

    /// Records an error into `slot` unless it already holds one, keeping
    /// the error's severity, and yields the success value if there is one.
    fn collect_into(self, slot: &mut Option<Error>, message: &str) -> Option<T>;
}

impl<T> ResultExt<T> for Result<T> {
    #[track_caller]
    fn stack(self, message: &str) -> Result<T> {
        let site = Location::caller();
        self.map_err(|cause| Error::new_stack(cause, site.file, site.line, message))
    }

    #[track_caller]
    fn inherit(self, message: &str) -> Result<T> {
        let site = Location::caller();
        self.map_err(|cause| Error::new_inherit(cause, site.file, site.line, message))
    }

    #[track_caller]
    fn collect_into(self, slot: &mut Option<Error>, message: &str) -> Option<T> {
        let site = Location::caller();
        match self {
            Ok(value) => Some(value),
            Err(cause) => {
                if slot.is_none() {
                    *slot = Some(Error::new_inherit(cause, site.file, site.line, message));
                } else {
                    tracing::trace!(message = cause.message(), "discarding later error");
                }
                None
            }
        }
    }
}

/// Assertion check with an explicit switch, the function form of
/// [`crate::sc3a_check!`].
///
/// When `enabled` is false, `condition` is never evaluated and the check
/// passes. Otherwise a false condition yields a fatal error at
/// `(file, line)` whose message is `text`.
#[inline(always)]
pub fn check_at<F>(
    enabled: bool,
    file: &'static str,
    line: u32,
    condition: F,
    text: &str,
) -> Result<()>
where
    F: FnOnce() -> bool,
{
    if enabled && !condition() {
        return Err(Error::new_fatal(file, line, text));
    }
    Ok(())
}

/// [`check_at`] gated on [`crate::DEBUG_CHECKS`], located at the caller.
#[track_caller]
pub fn debug_check<F>(condition: F, text: &str) -> Result<()>
where
    F: FnOnce() -> bool,
{
    let site = Location::caller();
    check_at(crate::DEBUG_CHECKS, site.file, site.line, condition, text)
}
