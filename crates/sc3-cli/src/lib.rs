//! sc3 command-line demo.
//!
//! Builds an array against a configurable allocator, reads one element and
//! prints either the element or the error chain explaining why it could not
//! be read.
pub mod options;
pub mod output;

use sc3_array::ArrayBuilder;
use sc3_base::{Allocator, AllocatorBuilder};
use sc3_error::{ResultExt, sc3e};

pub use options::{AllocOptions, ArrayOptions, ReportOptions};
pub use output::{render_element, render_error};

/// Options for running sc3.
#[derive(Debug, Clone, Default)]
pub struct Sc3Options {
    pub alloc: AllocOptions,
    pub array: ArrayOptions,
    pub report: ReportOptions,
    pub output: Option<String>,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub text: String,
    pub failed: bool,
}

/// Sets up an array as configured and copies out the requested element.
pub fn read_element(alloc: &Allocator, opts: &ArrayOptions) -> sc3_error::Result<Vec<u8>> {
    let mut builder = sc3e!(ArrayBuilder::new(alloc));
    builder
        .set_elem_size(opts.elem_size)
        .set_elem_count(opts.count)
        .set_elem_alloc(opts.elem_alloc)
        .set_resizable(!opts.fixed)
        .set_initzero(opts.zero);
    let array = sc3e!(builder.setup());

    if let Some(count) = opts.grow {
        sc3e!(array.resize(count));
    }
    let element = array
        .index(opts.index)
        .inherit(&format!("read element {}", opts.index))?
        .to_vec();
    Ok(element)
}

/// Main entry point
pub fn run_main(opts: &Sc3Options) -> anyhow::Result<Outcome> {
    let mut builder = AllocatorBuilder::new();
    builder.set_label("sc3");
    if let Some(limit) = opts.alloc.limit {
        builder.set_limit(limit);
    }
    let alloc = builder.setup();

    let outcome = match read_element(&alloc, &opts.array) {
        Ok(bytes) => Outcome {
            text: render_element(opts.array.index, &bytes, &opts.report)?,
            failed: false,
        },
        Err(err) => {
            tracing::debug!(depth = err.depth(), "read failed");
            Outcome {
                text: render_error(&err, &opts.report)?,
                failed: true,
            }
        }
    };

    if let Err(alloc) = alloc.destroy() {
        tracing::debug!(refcount = alloc.refcount(), "allocator kept at exit");
    }
    Ok(outcome)
}
