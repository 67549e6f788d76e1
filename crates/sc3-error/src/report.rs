//! Rendering of error chains for humans and machines.

use std::fmt;

use serde::Serialize;

use crate::error::Error;
use crate::severity::{Severity, SyncStatus};

/// One level of a chain, flattened for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame<'a> {
    pub file: &'a str,
    pub line: u32,
    pub severity: Severity,
    pub sync: SyncStatus,
    pub message: &'a str,
}

impl<'a> Frame<'a> {
    pub fn of(error: &'a Error) -> Self {
        let (file, line) = error.location().map_or(("", 0), |loc| (loc.file, loc.line));
        Self {
            file,
            line,
            severity: error.severity(),
            sync: error.sync(),
            message: error.message(),
        }
    }
}

impl fmt::Display for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(f, "<unknown>")?;
        } else {
            write!(f, "{}:{}", self.file, self.line)?;
        }
        write!(f, ": [{}] {}", self.severity, self.message)
    }
}

/// Options for [`Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportConfig {
    /// Frames to print before eliding the rest; `None` prints all, `Some(0)`
    /// only the elision line.
    pub max_depth: Option<usize>,
    /// Append the sync status to every frame.
    pub show_sync: bool,
}

impl ReportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_sync(mut self, show: bool) -> Self {
        self.show_sync = show;
        self
    }
}

/// A chain rendered one frame per line, outermost first.
pub struct Report<'a> {
    error: &'a Error,
    config: ReportConfig,
}

impl<'a> Report<'a> {
    pub fn new(error: &'a Error, config: ReportConfig) -> Self {
        Self { error, config }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let limit = self.config.max_depth.unwrap_or(usize::MAX);
        for (i, error) in self.error.chain().enumerate() {
            if i == limit {
                let rest = self.error.depth() - limit;
                if i > 0 {
                    f.write_str("\n  ")?;
                }
                return write!(f, "... {rest} more");
            }
            if i > 0 {
                write!(f, "\n  caused by ")?;
            }
            let frame = Frame::of(error);
            write!(f, "{frame}")?;
            if self.config.show_sync {
                write!(f, " ({})", frame.sync)?;
            }
        }
        Ok(())
    }
}

impl Error {
    /// Flattens the chain, outermost first.
    pub fn frames(&self) -> Vec<Frame<'_>> {
        self.chain().map(Frame::of).collect()
    }

    pub fn report(&self, config: ReportConfig) -> Report<'_> {
        Report::new(self, config)
    }
}

/// `{}` prints the top frame, `{:#}` the whole chain.
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{}", self.report(ReportConfig::default()))
        } else {
            write!(f, "{}", Frame::of(self))
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (refcount {})", Frame::of(self), self.refcount())?;
        for cause in self.chain().skip(1) {
            writeln!(f, "    Caused by: {}", Frame::of(cause))?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause().map(|e| e as &(dyn std::error::Error + 'static))
    }
}
