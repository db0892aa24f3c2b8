//! Per-frame orchestration and the inference loop.
//!
//! One iteration: acquire raw frame -> clip to the region of interest ->
//! keep a clean copy -> resize for the model -> infer -> filter -> per kept
//! detection annotate/crop/summarize -> hand the display copy to the relay
//! -> publish the frame summary.
//!
//! Error policy (absorbed vs. escalated):
//! - per-detection conditions (empty clamp region, encode/store failure)
//!   are absorbed inside the crop extractor;
//! - summary publish failure is logged and the next frame proceeds;
//! - frame acquisition retries with bounded backoff, then escalates;
//! - inference failures skip the frame, but a run of consecutive failures
//!   aborts the loop;
//! - on a fatal error, one best-effort error payload is published before
//!   the loop returns.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::annotate::FrameAnnotator;
use crate::config::PipelineConfig;
use crate::crop::{CropExtractor, CROP_OUTPUT_SIZE};
use crate::detect::{filter_detections, Detector};
use crate::display::DisplayRelay;
use crate::frame::Frame;
use crate::geometry::{axis_scale, Region};
use crate::ingest::FrameSource;
use crate::labels::label_text;
use crate::storage::CropStore;
use crate::summary::{error_payload, SummaryAggregator};
use crate::transport::SummaryPublisher;

/// Frame-acquisition retries before the run gives up on the source.
const SOURCE_RETRY_LIMIT: u32 = 5;
/// Initial backoff after a source failure; doubles per retry.
const SOURCE_RETRY_BASE: Duration = Duration::from_millis(100);
/// Consecutive frame failures tolerated before the run aborts.
const MAX_CONSECUTIVE_FRAME_FAILURES: u32 = 30;
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of one processed frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameReport {
    /// Detections that survived the filter.
    pub kept: usize,
    /// Crops actually handed to the store.
    pub crops_exported: usize,
}

/// Counters for health logging.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineStats {
    pub frames_processed: u64,
    pub frames_failed: u64,
    pub crops_exported: u64,
}

/// The detection post-processing pipeline.
///
/// Owns the per-frame stages and the display relay. Collaborators (model,
/// crop store, summary publisher) are capability traits so the pipeline is
/// testable without hardware or network.
pub struct FramePipeline {
    clip: Region,
    model_input_width: u32,
    model_input_height: u32,
    threshold: f32,
    keep_labels: HashSet<u32>,
    topic: String,
    detector: Box<dyn Detector>,
    annotator: FrameAnnotator,
    crops: CropExtractor,
    store: Box<dyn CropStore>,
    publisher: Box<dyn SummaryPublisher>,
    relay: DisplayRelay,
    stats: PipelineStats,
}

impl FramePipeline {
    pub fn new(
        cfg: &PipelineConfig,
        detector: Box<dyn Detector>,
        store: Box<dyn CropStore>,
        publisher: Box<dyn SummaryPublisher>,
        relay: DisplayRelay,
    ) -> Self {
        Self {
            clip: cfg.clip.region(),
            model_input_width: cfg.model.input_width,
            model_input_height: cfg.model.input_height,
            threshold: cfg.detection.threshold,
            keep_labels: cfg.detection.keep_labels.clone(),
            topic: cfg.publish.topic.clone(),
            detector,
            annotator: FrameAnnotator::new(),
            crops: CropExtractor::new(
                cfg.crop.pad,
                CROP_OUTPUT_SIZE,
                cfg.detection.excluded_labels.clone(),
            ),
            store,
            publisher,
            relay,
            stats: PipelineStats::default(),
        }
    }

    pub fn relay_mut(&mut self) -> &mut DisplayRelay {
        &mut self.relay
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Process one raw frame through every stage.
    pub fn process_frame(&mut self, raw: &Frame) -> Result<FrameReport> {
        let clipped = raw.clip(&self.clip)?;
        // Crops must reflect original pixel data, never overlay artwork:
        // the clean copy is what the crop extractor reads from.
        let clean = clipped.clone();
        let model_view = clipped.resized(self.model_input_width, self.model_input_height);

        let raw_detections = self.detector.infer(&model_view)?;
        let kept = filter_detections(&raw_detections, self.threshold, &self.keep_labels);

        let x_scale = axis_scale(clipped.width(), self.model_input_width);
        let y_scale = axis_scale(clipped.height(), self.model_input_height);

        let mut display = clipped;
        let mut summary = SummaryAggregator::new();
        let mut crops_exported = 0usize;
        for detection in &kept {
            let sbox = detection.bbox.scaled(x_scale, y_scale);
            let label = label_text(detection.label);

            let caption = FrameAnnotator::caption(&label, detection.probability);
            self.annotator.annotate(&mut display, &caption, &sbox);

            if self.crops.export(&clean, detection, &sbox, self.store.as_mut()) {
                crops_exported += 1;
            }

            summary.record(&label, detection.probability);
        }

        self.relay.publish_frame(&display);

        let payload = summary.payload()?;
        if let Err(e) = self.publisher.publish(&self.topic, &payload) {
            log::warn!("summary publish failed: {}", e);
        }

        Ok(FrameReport {
            kept: kept.len(),
            crops_exported,
        })
    }

    /// Run the inference loop until `stop` is raised or a fatal error.
    ///
    /// On a fatal error, one best-effort error payload is published to the
    /// summary topic before the error is returned.
    pub fn run(&mut self, source: &mut dyn FrameSource, stop: &AtomicBool) -> Result<()> {
        let result = self.run_inner(source, stop);
        if let Err(e) = &result {
            let payload = error_payload(&format!("fatal pipeline error: {}", e));
            if let Err(publish_err) = self.publisher.publish(&self.topic, &payload) {
                log::warn!("error report publish failed: {}", publish_err);
            }
        }
        result
    }

    fn run_inner(&mut self, source: &mut dyn FrameSource, stop: &AtomicBool) -> Result<()> {
        source.connect()?;
        self.detector.warm_up()?;
        log::info!(
            "pipeline running: detector={}, clip={}x{}+{}+{}, model input {}x{}",
            self.detector.name(),
            self.clip.width,
            self.clip.height,
            self.clip.x,
            self.clip.y,
            self.model_input_width,
            self.model_input_height
        );

        let mut consecutive_failures = 0u32;
        let mut last_health_log = Instant::now();

        while !stop.load(Ordering::SeqCst) {
            let Some(frame) = acquire_with_backoff(source, stop)? else {
                break;
            };

            match self.process_frame(&frame) {
                Ok(report) => {
                    consecutive_failures = 0;
                    self.stats.frames_processed += 1;
                    self.stats.crops_exported += report.crops_exported as u64;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    self.stats.frames_failed += 1;
                    log::error!(
                        "frame processing failed ({} consecutive): {}",
                        consecutive_failures,
                        e
                    );
                    if consecutive_failures >= MAX_CONSECUTIVE_FRAME_FAILURES {
                        return Err(anyhow!(
                            "aborting after {} consecutive frame failures, last: {}",
                            consecutive_failures,
                            e
                        ));
                    }
                }
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let source_stats = source.stats();
                log::info!(
                    "pipeline health: {} frames processed, {} failed, {} crops exported, source {} captured {}",
                    self.stats.frames_processed,
                    self.stats.frames_failed,
                    self.stats.crops_exported,
                    source_stats.url,
                    source_stats.frames_captured
                );
                last_health_log = Instant::now();
            }
        }

        log::info!("stop requested, exiting inference loop");
        Ok(())
    }
}

/// Pull the next frame, retrying transient source failures with doubling
/// backoff. Returns `Ok(None)` when stop was raised while waiting.
fn acquire_with_backoff(
    source: &mut dyn FrameSource,
    stop: &AtomicBool,
) -> Result<Option<Frame>> {
    let mut attempt = 0u32;
    let mut delay = SOURCE_RETRY_BASE;
    loop {
        if stop.load(Ordering::SeqCst) {
            return Ok(None);
        }
        match source.next_frame() {
            Ok(frame) => return Ok(Some(frame)),
            Err(e) if attempt < SOURCE_RETRY_LIMIT => {
                attempt += 1;
                log::warn!(
                    "frame source error (attempt {}/{}): {}",
                    attempt,
                    SOURCE_RETRY_LIMIT,
                    e
                );
                thread::sleep(delay);
                delay = delay.saturating_mul(2);
            }
            Err(e) => {
                return Err(anyhow!(
                    "frame source failed after {} retries: {}",
                    SOURCE_RETRY_LIMIT,
                    e
                ));
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
