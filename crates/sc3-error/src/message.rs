//! Bounded message storage.

use std::fmt;

use sc3_base::MSG_MAX;

/// Error message held inline in a fixed buffer of `BUFSIZE` bytes.
///
/// Longer input is truncated at the last character boundary that fits.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Message {
    text: heapless::String<MSG_MAX>,
    truncated: bool,
}

impl Message {
    pub fn new(text: &str) -> Self {
        let mut message = Self::default();
        message.assign(text);
        message
    }

    /// Replaces the content with `text`.
    pub fn assign(&mut self, text: &str) {
        self.text.clear();
        self.truncated = false;
        if self.text.push_str(text).is_ok() {
            return;
        }
        for c in text.chars() {
            if self.text.push(c).is_err() {
                self.truncated = true;
                break;
            }
        }
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the last assignment did not fit.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}
