//! Sizes shared by all sc3 objects.

/// Size of fixed message buffers, including room for a terminator.
///
/// Stored messages therefore hold at most `BUFSIZE - 1` bytes.
pub const BUFSIZE: usize = 160;

/// Longest message that fits a [`BUFSIZE`] buffer.
pub const MSG_MAX: usize = BUFSIZE - 1;
