//! Text and JSON rendering of read results.

use sc3_error::{Error, Frame, ReportConfig};
use serde::Serialize;

use crate::options::ReportOptions;

#[derive(Serialize)]
struct ElementDocument<'a> {
    index: usize,
    bytes: &'a [u8],
}

#[derive(Serialize)]
struct ErrorDocument<'a> {
    depth: usize,
    frames: Vec<Frame<'a>>,
}

/// Renders a successfully read element.
pub fn render_element(
    index: usize,
    bytes: &[u8],
    opts: &ReportOptions,
) -> serde_json::Result<String> {
    if opts.json {
        return serde_json::to_string_pretty(&ElementDocument { index, bytes });
    }
    let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("element {index}: [{}]", hex.join(" ")))
}

/// Renders an error chain, outermost level first.
pub fn render_error(error: &Error, opts: &ReportOptions) -> serde_json::Result<String> {
    if opts.json {
        let limit = opts.depth.unwrap_or(usize::MAX);
        let doc = ErrorDocument {
            depth: error.depth(),
            frames: error.frames().into_iter().take(limit).collect(),
        };
        return serde_json::to_string_pretty(&doc);
    }
    let config = ReportConfig::new()
        .with_max_depth(opts.depth)
        .with_sync(opts.show_sync);
    Ok(error.report(config).to_string())
}
