//! Command-line options for the sc3 demo.

use clap::Args;

/// Allocator configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct AllocOptions {
    /// Refuse to keep more than this many bytes live
    #[arg(long, value_name = "BYTES")]
    pub limit: Option<usize>,
}

/// Parameters of the array under test.
#[derive(Args, Debug, Clone)]
pub struct ArrayOptions {
    /// Element size in bytes
    #[arg(long = "elem-size", default_value_t = 4)]
    pub elem_size: usize,

    /// Number of elements after setup
    #[arg(long, default_value_t = 8)]
    pub count: usize,

    /// Minimum number of elements to allocate
    #[arg(long = "elem-alloc", default_value_t = 8)]
    pub elem_alloc: usize,

    /// Element to read back
    #[arg(long, default_value_t = 0)]
    pub index: usize,

    /// Resize to this many elements before reading
    #[arg(long, value_name = "COUNT")]
    pub grow: Option<usize>,

    /// Set the array up as not resizable
    #[arg(long)]
    pub fixed: bool,

    /// Zero element memory
    #[arg(long)]
    pub zero: bool,
}

impl Default for ArrayOptions {
    fn default() -> Self {
        Self {
            elem_size: 4,
            count: 8,
            elem_alloc: 8,
            index: 0,
            grow: None,
            fixed: false,
            zero: false,
        }
    }
}

/// How failures are rendered.
#[derive(Args, Debug, Clone, Default)]
pub struct ReportOptions {
    /// Show at most this many levels of an error chain
    #[arg(long, value_name = "LEVELS")]
    pub depth: Option<usize>,

    /// Print machine-readable JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Append the sync status to each level
    #[arg(long = "show-sync")]
    pub show_sync: bool,
}

impl ArrayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elem_size(mut self, elem_size: usize) -> Self {
        self.elem_size = elem_size;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn with_grow(mut self, grow: Option<usize>) -> Self {
        self.grow = grow;
        self
    }

    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    pub fn with_zero(mut self, zero: bool) -> Self {
        self.zero = zero;
        self
    }
}
