//! # sc3-error
//!
//! Error values for code that reports failure by return value.
//!
//! ## Design
//!
//! - **Two phases**: an [`ErrorBuilder`] is configured, then
//!   [`ErrorBuilder::setup`] turns it into an immutable [`Error`].
//! - **Refcounting**: an [`Error`] is one holder of a shared value; `clone`
//!   adds a holder, dropping removes one. [`Error::destroy`] and
//!   [`Error::pop`] insist on a single holder.
//! - **Causal chains**: every error exclusively owns the error that caused
//!   it, so a chain reads like a stack trace built from return sites.
//! - **Severity and sync**: [`Severity`] says how recoverable a failure is,
//!   [`SyncStatus`] whether cooperating processes agree it happened.
//!
//! ## Usage
//!
//! ```rust
//! use sc3_base::Allocator;
//! use sc3_error::{sc3e, sc3e_demand, Error, Result, Severity, SyncStatus};
//!
//! fn read_block(alloc: &Allocator, n: i32) -> Result<i32> {
//!     sc3e_demand!(n < 4);
//!     if n == 3 {
//!         return Err(Error::new_ssm(alloc, Severity::Runtime, SyncStatus::Local, "disk full"));
//!     }
//!     Ok(n * 2)
//! }
//!
//! fn save(alloc: &Allocator) -> Result<i32> {
//!     let a = sc3e!(read_block(alloc, 1));
//!     let b = sc3e!(read_block(alloc, 3));
//!     Ok(a + b)
//! }
//!
//! let alloc = Allocator::new();
//! let err = save(&alloc).unwrap_err();
//! assert!(err.is_fatal());
//! assert_eq!(err.message(), "read_block(alloc, 3)");
//! assert_eq!(err.cause().unwrap().severity(), Severity::Runtime);
//! ```
//!
//! ## Principles
//!
//! - Fallible functions return `Result<T, sc3_error::Error>`
//! - A failure that cannot be handled locally is wrapped with `sc3e!` (or
//!   [`ResultExt::stack`]) and escalates to fatal
//! - Annotating without escalating uses `new_inherit`, `sc3e_set!` or
//!   [`ResultExt::inherit`]
//! - The error machinery never fails itself: constructors fall back to
//!   allocator-free fatal errors

#[macro_use]
mod macros;

mod chain;
mod error;
mod message;
mod phase;
pub mod protocol;
mod report;
mod severity;

pub use chain::Chain;
pub use error::{
    Error, ErrorBuilder, Location, get_location, get_message, get_severity, get_sync,
};
pub use message::Message;
pub use phase::{
    Lifecycle, Phase, check_new, check_setup, check_valid, is_fatal, is_new, is_setup, is_valid,
};
pub use protocol::ResultExt;
pub use report::{Frame, Report, ReportConfig};
pub use severity::{Severity, SyncStatus};

/// Result type alias using the sc3 Error
pub type Result<T> = std::result::Result<T, Error>;

/// Whether `sc3a_*` assertion checks are compiled in.
///
/// True in builds with debug assertions or with the `debug-checks` feature.
pub const DEBUG_CHECKS: bool = cfg!(any(debug_assertions, feature = "debug-checks"));
