//! Severity and sync classification of an error.

use serde::Serialize;
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// How recoverable an error is.
///
/// Variants are ordered by escalation: `Runtime < Warning < Fatal`.
/// `Fatal` is the default because it is the answer whenever nothing more
/// specific is known.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    IntoStaticStr,
    Display,
    EnumIter,
    Serialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Expected at runtime, the caller may recover.
    Runtime,

    /// Non-fatal anomaly.
    Warning,

    /// The enclosing operation cannot continue.
    #[default]
    Fatal,
}

impl Severity {
    /// Returns the severity as a static string
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Severity::Fatal)
    }
}

/// Whether cooperating processes agree that an error occurred.
///
/// Only a tag: deciding the value is up to collective communication code
/// outside this crate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoStaticStr, Display, EnumIter, Serialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncStatus {
    /// Only this process knows about the error.
    #[default]
    Local,

    /// All cooperating processes confirmed the error.
    Synced,

    /// Cooperating processes disagree about the error.
    Disagree,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}
