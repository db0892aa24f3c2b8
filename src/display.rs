//! Live-preview hand-off and render thread.
//!
//! The inference loop publishes the newest annotated frame into a single
//! slot; an independent render thread repeatedly writes the slot's content
//! to a byte sink (a named pipe in production, consumed as a motion-JPEG
//! stream). The hand-off has overwrite semantics: a new frame replaces the
//! old one whether or not it was ever read. If rendering falls behind,
//! frames are dropped, never buffered.
//!
//! The slot is a mutex-guarded `Arc` swap - swap-on-write, clone-on-read -
//! so the render thread always observes a complete encoded frame, never a
//! torn one.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

/// Pause after a failed sink write before retrying.
const WRITE_RETRY_PAUSE: Duration = Duration::from_millis(100);

const RESOLUTIONS: &[(&str, u32, u32)] = &[
    ("1080p", 1920, 1080),
    ("720p", 1280, 720),
    ("480p", 640, 640),
];

/// Fixed output resolution of the preview stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Resolve a resolution name. Unknown names are rejected at
    /// construction, before the loop starts.
    pub fn parse(name: &str) -> Result<Resolution> {
        RESOLUTIONS
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, width, height)| Resolution {
                width: *width,
                height: *height,
            })
            .ok_or_else(|| {
                anyhow!(
                    "invalid resolution '{}' (expected one of: {})",
                    name,
                    RESOLUTIONS
                        .iter()
                        .map(|(n, _, _)| *n)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Relay lifecycle. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Streaming,
    Stopped,
}

impl RelayState {
    fn from_u8(value: u8) -> RelayState {
        match value {
            0 => RelayState::Idle,
            1 => RelayState::Streaming,
            _ => RelayState::Stopped,
        }
    }
}

/// The single most-recently-annotated encoded frame.
///
/// Exactly one writer (the inference loop) and one reader (the render
/// thread). Content is replaced every iteration for the life of the
/// process.
pub struct DisplaySlot {
    current: Mutex<Arc<Vec<u8>>>,
}

impl DisplaySlot {
    fn new(initial: Vec<u8>) -> Self {
        Self {
            current: Mutex::new(Arc::new(initial)),
        }
    }

    /// Replace the slot content. Overwrite, not enqueue: whatever was there
    /// is gone regardless of whether the reader saw it.
    pub fn swap(&self, frame: Vec<u8>) {
        *self.current.lock().expect("display slot lock") = Arc::new(frame);
    }

    /// Read the current content. The returned `Arc` stays valid even if the
    /// writer swaps in a new frame mid-write.
    pub fn snapshot(&self) -> Arc<Vec<u8>> {
        self.current.lock().expect("display slot lock").clone()
    }
}

/// Streams the display slot to a downstream sink on its own thread.
pub struct DisplayRelay {
    slot: Arc<DisplaySlot>,
    stop: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    resolution: Resolution,
    handle: Option<JoinHandle<()>>,
}

impl DisplayRelay {
    /// Create the relay in `Idle` state with a blank canvas in the slot.
    pub fn new(resolution: Resolution) -> Result<Self> {
        let blank = Frame::blank(resolution.width, resolution.height).encode_jpeg()?;
        Ok(Self {
            slot: Arc::new(DisplaySlot::new(blank)),
            stop: Arc::new(AtomicBool::new(false)),
            state: Arc::new(AtomicU8::new(RelayState::Idle as u8)),
            resolution,
            handle: None,
        })
    }

    pub fn state(&self) -> RelayState {
        RelayState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn slot(&self) -> &DisplaySlot {
        &self.slot
    }

    /// Start the render thread, moving `Idle -> Streaming`.
    ///
    /// The thread loops: check the stop flag, read the slot, write the
    /// bytes to the sink. Writes to a pipe with no attached consumer block;
    /// that pacing is what ties the stream rate to the viewer.
    pub fn spawn<W: Write + Send + 'static>(&mut self, mut sink: W) -> Result<()> {
        if self.state() != RelayState::Idle {
            return Err(anyhow!("render thread already started"));
        }
        self.state
            .store(RelayState::Streaming as u8, Ordering::SeqCst);

        let slot = self.slot.clone();
        let stop = self.stop.clone();
        let state = self.state.clone();
        let handle = thread::Builder::new()
            .name("display-relay".to_string())
            .spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    let frame = slot.snapshot();
                    if let Err(e) = sink.write_all(&frame) {
                        log::warn!("display sink write failed: {}", e);
                        thread::sleep(WRITE_RETRY_PAUSE);
                    }
                }
                state.store(RelayState::Stopped as u8, Ordering::SeqCst);
            });

        match handle {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state.store(RelayState::Idle as u8, Ordering::SeqCst);
                Err(anyhow!("failed to spawn render thread: {}", e))
            }
        }
    }

    /// Resize the annotated frame to the output resolution, encode it and
    /// swap it into the slot.
    ///
    /// Encode failure is absorbed: the previous frame stays visible and the
    /// pipeline moves on.
    pub fn publish_frame(&self, frame: &Frame) {
        let scaled = frame.resized(self.resolution.width, self.resolution.height);
        match scaled.encode_jpeg() {
            Ok(bytes) => self.slot.swap(bytes),
            Err(e) => log::error!("preview encode failed, keeping previous frame: {}", e),
        }
    }

    /// Raise the stop flag and join the render thread.
    ///
    /// The flag is observed between writes. A write blocked on a pipe with
    /// no consumer holds the thread until a consumer attaches or detaches,
    /// so shutdown can stall until then.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("render thread panicked");
            }
        }
        self.state
            .store(RelayState::Stopped as u8, Ordering::SeqCst);
    }
}

impl Drop for DisplayRelay {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_resolutions_parse() {
        assert_eq!(
            Resolution::parse("480p").unwrap(),
            Resolution {
                width: 640,
                height: 640
            }
        );
        assert_eq!(
            Resolution::parse("1080p").unwrap(),
            Resolution {
                width: 1920,
                height: 1080
            }
        );
    }

    #[test]
    fn invalid_resolution_rejected_at_construction() {
        assert!(Resolution::parse("4k").is_err());
        assert!(Resolution::parse("").is_err());
    }

    #[test]
    fn slot_overwrites_without_buffering() {
        let slot = DisplaySlot::new(vec![0]);
        slot.swap(vec![1, 1, 1]);
        slot.swap(vec![2, 2, 2]);
        // Only the latest write is visible; the intermediate frame is gone.
        assert_eq!(*slot.snapshot(), vec![2, 2, 2]);
    }

    #[test]
    fn snapshot_survives_concurrent_swap() {
        let slot = DisplaySlot::new(vec![7; 16]);
        let held = slot.snapshot();
        slot.swap(vec![9; 16]);
        // The reader's copy is still the complete frame it observed.
        assert_eq!(*held, vec![7; 16]);
        assert_eq!(*slot.snapshot(), vec![9; 16]);
    }

    #[test]
    fn idle_slot_holds_blank_canvas() {
        let relay = DisplayRelay::new(Resolution::parse("480p").unwrap()).unwrap();
        assert_eq!(relay.state(), RelayState::Idle);

        let initial = relay.slot().snapshot();
        let decoded = Frame::decode_jpeg(&initial).expect("blank canvas decodes");
        assert_eq!(decoded.width(), 640);
        assert_eq!(decoded.height(), 640);
    }

    #[test]
    fn publish_frame_scales_to_output_resolution() {
        let relay = DisplayRelay::new(Resolution::parse("720p").unwrap()).unwrap();
        relay.publish_frame(&Frame::blank(640, 640));

        let decoded = Frame::decode_jpeg(&relay.slot().snapshot()).unwrap();
        assert_eq!(decoded.width(), 1280);
        assert_eq!(decoded.height(), 720);
    }

    #[test]
    fn relay_streams_then_stops() {
        use std::sync::atomic::AtomicUsize;

        // Sink that counts writes and paces the loop like a slow consumer.
        struct CountingSink {
            writes: Arc<AtomicUsize>,
        }
        impl Write for CountingSink {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.writes.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(1));
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let writes = Arc::new(AtomicUsize::new(0));
        let mut relay = DisplayRelay::new(Resolution::parse("480p").unwrap()).unwrap();
        relay
            .spawn(CountingSink {
                writes: writes.clone(),
            })
            .unwrap();
        assert_eq!(relay.state(), RelayState::Streaming);

        // Wait for the render thread to push a few frames.
        for _ in 0..500 {
            if writes.load(Ordering::SeqCst) >= 3 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(writes.load(Ordering::SeqCst) >= 3);

        relay.stop();
        assert_eq!(relay.state(), RelayState::Stopped);
    }

    #[test]
    fn second_spawn_is_rejected() {
        let mut relay = DisplayRelay::new(Resolution::parse("480p").unwrap()).unwrap();
        relay.spawn(std::io::sink()).unwrap();
        assert!(relay.spawn(std::io::sink()).is_err());
        relay.stop();
    }
}
