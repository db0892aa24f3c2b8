//! crittercamd - edge detection pipeline daemon
//!
//! This daemon:
//! 1. Loads configuration (file + environment, fixed at startup)
//! 2. Opens the frame source and detector backend
//! 3. Starts the display relay's render thread on the preview sink
//! 4. Runs the inference loop until SIGINT or a fatal error
//!
//! Render the preview stream with, for example:
//! mplayer -demuxer lavf -lavfdopts format=mjpeg:probesize=32 /tmp/results.mjpeg

use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;

use crittercam::{
    open_source, BoundingBox, Detection, Detector, DisplayRelay, FilesystemCropStore,
    FramePipeline, MqttConfig, MqttPublisher, PipelineConfig, Resolution, StubDetector,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Edge detection pipeline daemon")]
struct Args {
    /// Path to the JSON config file.
    #[arg(long, env = "CRITTERCAM_CONFIG")]
    config: Option<PathBuf>,

    /// Frame source URL (stub:// or a JPEG directory), overriding config.
    #[arg(long, env = "CRITTERCAM_SOURCE_URL")]
    source: Option<String>,

    /// MQTT broker address, overriding config.
    #[arg(long, env = "CRITTERCAM_BROKER_ADDR")]
    broker_addr: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    // clap already surfaced CRITTERCAM_CONFIG; put it back so config
    // loading sees a --config override the same way.
    if let Some(path) = &args.config {
        std::env::set_var("CRITTERCAM_CONFIG", path);
    }
    let mut cfg = PipelineConfig::load()?;
    if let Some(source) = args.source {
        cfg.source_url = source;
    }
    if let Some(addr) = args.broker_addr {
        cfg.publish.broker_addr = addr;
    }

    log::info!(
        "crittercamd {} starting: source={}, topic={}",
        env!("CARGO_PKG_VERSION"),
        cfg.source_url,
        cfg.publish.topic
    );

    // Raw frames must cover the clip region; the synthetic source is sized
    // to exactly that extent.
    let source_width = cfg.clip.left + cfg.clip.width;
    let source_height = cfg.clip.top + cfg.clip.height;
    let mut source = open_source(&cfg.source_url, source_width, source_height)?;

    let detector = build_detector(&cfg)?;

    let store = FilesystemCropStore::new(&cfg.crop.store_dir)?;
    log::info!("crop store at {}", cfg.crop.store_dir.display());

    let publisher = MqttPublisher::connect(&MqttConfig {
        broker_addr: cfg.publish.broker_addr.clone(),
        client_id: cfg.publish.client_id.clone(),
        username: cfg.publish.username.clone(),
        password: cfg.publish.password.clone(),
    })?;
    log::info!(
        "publishing summaries to {} on {}",
        cfg.publish.topic,
        cfg.publish.broker_addr
    );

    let mut relay = DisplayRelay::new(Resolution::parse(&cfg.display.resolution)?)?;
    // Opening a FIFO blocks until a consumer attaches; say so first.
    log::info!(
        "opening preview sink {} (blocks until a consumer attaches if it is a pipe)",
        cfg.display.sink_path.display()
    );
    let sink = File::create(&cfg.display.sink_path).map_err(|e| {
        anyhow!(
            "failed to open preview sink {}: {}",
            cfg.display.sink_path.display(),
            e
        )
    })?;
    relay.spawn(sink)?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        log::info!("interrupt received, stopping");
        stop_handler.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("failed to install signal handler: {}", e))?;

    let mut pipeline = FramePipeline::new(
        &cfg,
        detector,
        Box::new(store),
        Box::new(publisher),
        relay,
    );

    let result = pipeline.run(source.as_mut(), &stop);

    let stats = pipeline.stats();
    log::info!(
        "shutting down: {} frames processed, {} failed, {} crops exported",
        stats.frames_processed,
        stats.frames_failed,
        stats.crops_exported
    );
    pipeline.relay_mut().stop();

    result
}

fn build_detector(cfg: &PipelineConfig) -> Result<Box<dyn Detector>> {
    match cfg.model.backend.as_str() {
        "stub" => {
            // Motion-gated canned detection so stub runs exercise the whole
            // output path end to end.
            let detection = Detection::new(3, 0.85, BoundingBox::new(100.0, 100.0, 200.0, 200.0));
            Ok(Box::new(StubDetector::on_motion(vec![detection])))
        }
        other => Err(anyhow!(
            "unknown detector backend '{}' (only 'stub' is built in; hardware \
             backends plug in behind the Detector trait)",
            other
        )),
    }
}
