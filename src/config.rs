//! Pipeline configuration.
//!
//! All values are fixed at process start: an optional JSON config file named
//! by `CRITTERCAM_CONFIG`, overlaid with `CRITTERCAM_*` environment
//! variables, validated once and passed by reference into each component.
//! Nothing is hot-reloadable.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::display::Resolution;
use crate::geometry::Region;
use crate::labels::{DEFAULT_EXCLUDED_LABELS, DEFAULT_KEEP_LABELS};

const DEFAULT_SOURCE_URL: &str = "stub://camera";
const DEFAULT_MODEL_BACKEND: &str = "stub";
const DEFAULT_MODEL_INPUT_WIDTH: u32 = 300;
const DEFAULT_MODEL_INPUT_HEIGHT: u32 = 300;
const DEFAULT_CLIP_LEFT: u32 = 1266;
const DEFAULT_CLIP_TOP: u32 = 900;
const DEFAULT_CLIP_WIDTH: u32 = 640;
const DEFAULT_CLIP_HEIGHT: u32 = 640;
const DEFAULT_THRESHOLD: f32 = 0.2;
const DEFAULT_CROP_PAD: u32 = 20;
const DEFAULT_CROP_DIR: &str = "crops";
const DEFAULT_RESOLUTION: &str = "480p";
const DEFAULT_SINK_PATH: &str = "/tmp/results.mjpeg";
const DEFAULT_BROKER_ADDR: &str = "127.0.0.1:1883";
const DEFAULT_TOPIC: &str = "crittercam/infer";
const DEFAULT_CLIENT_ID: &str = "crittercam";

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    source: Option<SourceConfigFile>,
    model: Option<ModelConfigFile>,
    clip: Option<ClipConfigFile>,
    detection: Option<DetectionConfigFile>,
    crop: Option<CropConfigFile>,
    display: Option<DisplayConfigFile>,
    publish: Option<PublishConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    backend: Option<String>,
    artifact_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ClipConfigFile {
    left: Option<u32>,
    top: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    threshold: Option<f32>,
    keep_labels: Option<Vec<u32>>,
    excluded_labels: Option<Vec<u32>>,
}

#[derive(Debug, Deserialize, Default)]
struct CropConfigFile {
    pad: Option<u32>,
    store_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    resolution: Option<String>,
    sink_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct PublishConfigFile {
    broker_addr: Option<String>,
    topic: Option<String>,
    client_id: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_url: String,
    pub model: ModelSettings,
    pub clip: ClipSettings,
    pub detection: DetectionSettings,
    pub crop: CropSettings,
    pub display: DisplaySettings,
    pub publish: PublishSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Detector backend name ("stub" is the only built-in).
    pub backend: String,
    /// Model artifact path, handed to hardware backends. Unused by the stub.
    pub artifact_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone)]
pub struct ClipSettings {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl ClipSettings {
    /// The clip rectangle as a frame region.
    pub fn region(&self) -> Region {
        Region {
            x: self.left,
            y: self.top,
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub threshold: f32,
    pub keep_labels: HashSet<u32>,
    pub excluded_labels: HashSet<u32>,
}

#[derive(Debug, Clone)]
pub struct CropSettings {
    pub pad: u32,
    pub store_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub resolution: String,
    pub sink_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub broker_addr: String,
    pub topic: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl PipelineConfig {
    /// Load configuration: file named by `CRITTERCAM_CONFIG` (if set), then
    /// environment overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CRITTERCAM_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let source_url = file
            .source
            .and_then(|source| source.url)
            .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string());
        let model = {
            let model = file.model.unwrap_or_default();
            ModelSettings {
                backend: model
                    .backend
                    .unwrap_or_else(|| DEFAULT_MODEL_BACKEND.to_string()),
                artifact_path: model.artifact_path,
                input_width: model.input_width.unwrap_or(DEFAULT_MODEL_INPUT_WIDTH),
                input_height: model.input_height.unwrap_or(DEFAULT_MODEL_INPUT_HEIGHT),
            }
        };
        let clip = {
            let clip = file.clip.unwrap_or_default();
            ClipSettings {
                left: clip.left.unwrap_or(DEFAULT_CLIP_LEFT),
                top: clip.top.unwrap_or(DEFAULT_CLIP_TOP),
                width: clip.width.unwrap_or(DEFAULT_CLIP_WIDTH),
                height: clip.height.unwrap_or(DEFAULT_CLIP_HEIGHT),
            }
        };
        let detection = {
            let detection = file.detection.unwrap_or_default();
            DetectionSettings {
                threshold: detection.threshold.unwrap_or(DEFAULT_THRESHOLD),
                keep_labels: detection
                    .keep_labels
                    .unwrap_or_else(|| DEFAULT_KEEP_LABELS.to_vec())
                    .into_iter()
                    .collect(),
                excluded_labels: detection
                    .excluded_labels
                    .unwrap_or_else(|| DEFAULT_EXCLUDED_LABELS.to_vec())
                    .into_iter()
                    .collect(),
            }
        };
        let crop = {
            let crop = file.crop.unwrap_or_default();
            CropSettings {
                pad: crop.pad.unwrap_or(DEFAULT_CROP_PAD),
                store_dir: crop
                    .store_dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CROP_DIR)),
            }
        };
        let display = {
            let display = file.display.unwrap_or_default();
            DisplaySettings {
                resolution: display
                    .resolution
                    .unwrap_or_else(|| DEFAULT_RESOLUTION.to_string()),
                sink_path: display
                    .sink_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SINK_PATH)),
            }
        };
        let publish = {
            let publish = file.publish.unwrap_or_default();
            PublishSettings {
                broker_addr: publish
                    .broker_addr
                    .unwrap_or_else(|| DEFAULT_BROKER_ADDR.to_string()),
                topic: publish.topic.unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
                client_id: publish
                    .client_id
                    .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
                username: publish.username,
                password: publish.password,
            }
        };

        Self {
            source_url,
            model,
            clip,
            detection,
            crop,
            display,
            publish,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("CRITTERCAM_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source_url = url;
            }
        }
        if let Ok(threshold) = std::env::var("CRITTERCAM_THRESHOLD") {
            self.detection.threshold = threshold
                .parse()
                .map_err(|_| anyhow!("CRITTERCAM_THRESHOLD must be a float in [0, 1)"))?;
        }
        if let Ok(addr) = std::env::var("CRITTERCAM_BROKER_ADDR") {
            if !addr.trim().is_empty() {
                self.publish.broker_addr = addr;
            }
        }
        if let Ok(topic) = std::env::var("CRITTERCAM_TOPIC") {
            if !topic.trim().is_empty() {
                self.publish.topic = topic;
            }
        }
        if let Ok(path) = std::env::var("CRITTERCAM_SINK_PATH") {
            if !path.trim().is_empty() {
                self.display.sink_path = PathBuf::from(path);
            }
        }
        if let Ok(dir) = std::env::var("CRITTERCAM_CROP_DIR") {
            if !dir.trim().is_empty() {
                self.crop.store_dir = PathBuf::from(dir);
            }
        }
        if let Ok(resolution) = std::env::var("CRITTERCAM_RESOLUTION") {
            if !resolution.trim().is_empty() {
                self.display.resolution = resolution;
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if !(0.0..1.0).contains(&self.detection.threshold) {
            return Err(anyhow!(
                "detection threshold must be in [0, 1), got {}",
                self.detection.threshold
            ));
        }
        if self.clip.width == 0 || self.clip.height == 0 {
            return Err(anyhow!("clip region must have non-zero dimensions"));
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return Err(anyhow!("model input must have non-zero dimensions"));
        }
        if self.detection.keep_labels.is_empty() {
            return Err(anyhow!("keep_labels must not be empty"));
        }
        if self.publish.topic.trim().is_empty() {
            return Err(anyhow!("publish topic must not be empty"));
        }
        // Reject unknown resolutions before the loop starts.
        Resolution::parse(&self.display.resolution)?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
