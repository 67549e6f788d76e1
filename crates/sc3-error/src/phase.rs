//! Lifecycle phase of sc3 objects.

use std::fmt;

use crate::Error;
use crate::message::Message;

/// The two phases every sc3 object goes through.
///
/// - `New`: under construction, parameters may be set.
/// - `Setup`: usable, parameters are frozen; only refcounting and reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    New,
    Setup,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::New => "new",
            Phase::Setup => "setup",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Phase and consistency queries shared by builders and setup objects.
///
/// The `check*` forms name the first violated condition; the `is_*`
/// predicates are their boolean shorthands.
pub trait Lifecycle {
    fn phase(&self) -> Phase;

    /// Internal consistency, in either phase.
    fn check(&self) -> Result<(), Message>;

    fn check_new(&self) -> Result<(), Message> {
        self.check()?;
        match self.phase() {
            Phase::New => Ok(()),
            Phase::Setup => Err(Message::new("object is already setup")),
        }
    }

    fn check_setup(&self) -> Result<(), Message> {
        self.check()?;
        match self.phase() {
            Phase::Setup => Ok(()),
            Phase::New => Err(Message::new("object is not setup yet")),
        }
    }

    fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    fn is_new(&self) -> bool {
        self.check_new().is_ok()
    }

    fn is_setup(&self) -> bool {
        self.check_setup().is_ok()
    }
}

/// Why a possibly missing object is not valid.
pub fn check_valid<T: Lifecycle>(object: Option<&T>) -> Result<(), Message> {
    object.map_or_else(|| Err(missing()), Lifecycle::check)
}

/// Why a possibly missing object is not in its new phase.
pub fn check_new<T: Lifecycle>(object: Option<&T>) -> Result<(), Message> {
    object.map_or_else(|| Err(missing()), Lifecycle::check_new)
}

/// Why a possibly missing object is not setup.
pub fn check_setup<T: Lifecycle>(object: Option<&T>) -> Result<(), Message> {
    object.map_or_else(|| Err(missing()), Lifecycle::check_setup)
}

fn missing() -> Message {
    Message::new("object is missing")
}

/// True iff the object exists and is consistent.
pub fn is_valid<T: Lifecycle>(object: Option<&T>) -> bool {
    check_valid(object).is_ok()
}

/// True iff the object exists, is consistent and not yet setup.
pub fn is_new<T: Lifecycle>(object: Option<&T>) -> bool {
    check_new(object).is_ok()
}

/// True iff the object exists, is consistent and setup.
pub fn is_setup<T: Lifecycle>(object: Option<&T>) -> bool {
    check_setup(object).is_ok()
}

/// True iff the error exists, is setup and has severity `Fatal`.
pub fn is_fatal(error: Option<&Error>) -> bool {
    error.is_some_and(|e| e.is_setup() && e.severity().is_fatal())
}
