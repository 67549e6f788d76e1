//! # sc3-array
//!
//! Growable arrays of fixed-size elements built on the sc3 allocator and
//! reporting every failure as an [`sc3_error::Error`].
//!
//! ```rust
//! use sc3_array::ArrayBuilder;
//! use sc3_base::Allocator;
//!
//! let alloc = Allocator::new();
//! let mut builder = ArrayBuilder::new(&alloc).unwrap();
//! builder.set_elem_size(2).set_elem_count(3).set_initzero(true);
//! let array = builder.setup().unwrap();
//! array.write(1, &[7, 9]).unwrap();
//! assert_eq!(&*array.index(1).unwrap(), &[7, 9]);
//! assert!(array.index(3).is_err());
//! ```

mod array;

pub use array::{Array, ArrayBuilder, UNINIT_FILL};
