//! crittercam
//!
//! Edge camera detection pipeline. Each frame from the camera is clipped to
//! a region of interest, run through an object-detection model, and fanned
//! out three ways:
//!
//! 1. an annotated copy streams to a local motion-JPEG preview sink;
//! 2. crops of objects of interest are exported for a secondary classifier;
//! 3. a compact label -> probability summary is published per frame.
//!
//! # Architecture
//!
//! Two threads: the inference loop (acquire -> clip -> infer -> filter ->
//! annotate/crop/summarize -> publish) and the display relay's render
//! thread. The only shared state is the single display slot, exchanged by
//! Arc swap so the render thread never observes a torn frame.
//!
//! # Module Structure
//!
//! - `config`: startup configuration (file + env, validated once)
//! - `ingest`: frame sources (synthetic stub, JPEG directory)
//! - `detect`: detector trait, stub backend, detection filter
//! - `geometry`: coordinate rescaling and region clamping
//! - `annotate` / `crop` / `summary`: per-detection output stages
//! - `display`: single-slot hand-off and render thread
//! - `storage` / `transport`: crop store and summary publisher collaborators
//! - `pipeline`: per-frame orchestration and the run loop

pub mod annotate;
pub mod config;
pub mod crop;
pub mod detect;
pub mod display;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod labels;
pub mod pipeline;
pub mod storage;
pub mod summary;
pub mod transport;

pub use annotate::FrameAnnotator;
pub use config::PipelineConfig;
pub use crop::{CropExtractor, CROP_OUTPUT_SIZE};
pub use detect::{filter_detections, Detection, Detector, StubDetector};
pub use display::{DisplayRelay, DisplaySlot, RelayState, Resolution};
pub use frame::Frame;
pub use geometry::{axis_scale, clamp_region, BoundingBox, Region, ScaledBox};
pub use ingest::{open_source, FileSource, FrameSource, SourceStats, SyntheticSource};
pub use labels::{label_name, label_text};
pub use pipeline::{FramePipeline, FrameReport, PipelineStats};
pub use storage::{CropStore, FilesystemCropStore, InMemoryCropStore};
pub use summary::SummaryAggregator;
pub use transport::{InMemoryPublisher, MqttConfig, MqttPublisher, SummaryPublisher};
