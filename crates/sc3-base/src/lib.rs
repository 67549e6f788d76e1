//! Base collaborators for sc3 objects: buffer sizes and the allocator.

pub mod alloc;
pub mod consts;

pub use alloc::{AllocError, Allocator, AllocatorBuilder, Charge, Leaks};
pub use consts::{BUFSIZE, MSG_MAX};
