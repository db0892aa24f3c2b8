//! Frame acquisition sources.
//!
//! The inference loop pulls raw frames from a `FrameSource`:
//! - `stub://` URLs produce a synthetic scene (tests, bench runs without
//!   camera hardware)
//! - plain paths produce frames from a directory of JPEG stills
//!
//! The on-device camera SDK is an external collaborator; it plugs in behind
//! the same trait. Sources hand out full raw frames - clipping to the
//! region of interest happens in the pipeline, not here.

mod file;
mod synthetic;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

pub use file::FileSource;
pub use synthetic::SyntheticSource;

/// A source of raw camera frames.
pub trait FrameSource: Send {
    /// Prepare the source. Called once before the loop starts.
    fn connect(&mut self) -> Result<()>;

    /// Produce the next raw frame.
    ///
    /// An error here is a per-frame source fault; the pipeline retries with
    /// bounded backoff before escalating.
    fn next_frame(&mut self) -> Result<Frame>;

    /// Whether the source expects to produce more frames.
    fn is_healthy(&self) -> bool;

    /// Capture statistics for health logging.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

/// Open a source by URL.
///
/// `stub://` selects the synthetic source sized `width` x `height`; a plain
/// path selects the JPEG directory source. Other URL schemes are rejected.
pub fn open_source(url: &str, width: u32, height: u32) -> Result<Box<dyn FrameSource>> {
    if url.trim().is_empty() {
        return Err(anyhow!("frame source url is empty"));
    }
    if url.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(url, width, height)));
    }
    if url.contains("://") {
        return Err(anyhow!(
            "unsupported frame source scheme: {} (expected stub:// or a local directory)",
            url
        ));
    }
    Ok(Box::new(FileSource::new(url)))
}
