use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::depth::{
    DepthWindow, DEFAULT_MAX_DEPTH_M, DEFAULT_MIN_DEPTH_M, DEFAULT_WINDOW_RADIUS, MAX_WINDOW_RADIUS,
};
use crate::detect::{DecodeThresholds, CONFIDENCE_THRESHOLD, IOU_THRESHOLD};
use crate::tracker::{DEFAULT_MERGE_DISTANCE_M, DEFAULT_PRUNE_TIMEOUT_SECS};

const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_SPEAKER_WIDTH_CM: f32 = 18.0;
const MIN_SPEAKER_WIDTH_CM: f32 = 3.0;
const MAX_SPEAKER_WIDTH_CM: f32 = 80.0;
const DEFAULT_DETECT_EVERY_N: u32 = 2;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PipelineConfigFile {
    detector: Option<DetectorConfigFile>,
    depth: Option<DepthConfigFile>,
    tracker: Option<TrackerConfigFile>,
    speaker: Option<SpeakerConfigFile>,
    pipeline: Option<CadenceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    model_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    input_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DepthConfigFile {
    window_radius: Option<u32>,
    min_m: Option<f32>,
    max_m: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TrackerConfigFile {
    merge_distance_m: Option<f32>,
    prune_timeout_secs: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SpeakerConfigFile {
    width_cm: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CadenceConfigFile {
    detect_every_n: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub detector: DetectorSettings,
    pub depth: DepthWindow,
    pub tracker: TrackerSettings,
    /// Physical speaker width used by the size fallback.
    pub speaker_width_cm: f32,
    /// Run detection on every Nth frame.
    pub detect_every_n: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub thresholds: DecodeThresholds,
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub input_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSettings {
    pub merge_distance_m: f32,
    pub prune_timeout_secs: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        // an empty file cannot fail to resolve to defaults
        Self::from_file(PipelineConfigFile::default())
    }
}

impl PipelineConfig {
    /// Defaults, then the file named by `ROOMSCAN_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ROOMSCAN_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a TOML document without consulting the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: PipelineConfigFile =
            toml::from_str(raw).map_err(|e| anyhow!("invalid config: {}", e))?;
        let cfg = Self::from_file(file);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Size hint width in meters.
    pub fn speaker_width_m(&self) -> f32 {
        self.speaker_width_cm / 100.0
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let detector = file.detector.unwrap_or_default();
        let depth = file.depth.unwrap_or_default();
        let tracker = file.tracker.unwrap_or_default();
        Self {
            detector: DetectorSettings {
                thresholds: DecodeThresholds {
                    confidence: detector.confidence_threshold.unwrap_or(CONFIDENCE_THRESHOLD),
                    iou: detector.iou_threshold.unwrap_or(IOU_THRESHOLD),
                },
                model_path: detector.model_path,
                labels_path: detector.labels_path,
                input_size: detector.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
            },
            depth: DepthWindow {
                radius: depth.window_radius.unwrap_or(DEFAULT_WINDOW_RADIUS),
                min_m: depth.min_m.unwrap_or(DEFAULT_MIN_DEPTH_M),
                max_m: depth.max_m.unwrap_or(DEFAULT_MAX_DEPTH_M),
            },
            tracker: TrackerSettings {
                merge_distance_m: tracker.merge_distance_m.unwrap_or(DEFAULT_MERGE_DISTANCE_M),
                prune_timeout_secs: tracker.prune_timeout_secs.unwrap_or(DEFAULT_PRUNE_TIMEOUT_SECS),
            },
            speaker_width_cm: file
                .speaker
                .and_then(|speaker| speaker.width_cm)
                .unwrap_or(DEFAULT_SPEAKER_WIDTH_CM),
            detect_every_n: file
                .pipeline
                .and_then(|pipeline| pipeline.detect_every_n)
                .unwrap_or(DEFAULT_DETECT_EVERY_N),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(width) = std::env::var("ROOMSCAN_SPEAKER_WIDTH_CM") {
            self.speaker_width_cm = width
                .trim()
                .parse()
                .map_err(|_| anyhow!("ROOMSCAN_SPEAKER_WIDTH_CM must be a number of centimeters"))?;
        }
        if let Ok(timeout) = std::env::var("ROOMSCAN_PRUNE_TIMEOUT_SECS") {
            self.tracker.prune_timeout_secs = timeout
                .trim()
                .parse()
                .map_err(|_| anyhow!("ROOMSCAN_PRUNE_TIMEOUT_SECS must be a number of seconds"))?;
        }
        if let Ok(path) = std::env::var("ROOMSCAN_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("ROOMSCAN_LABELS_PATH") {
            if !path.trim().is_empty() {
                self.detector.labels_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(every) = std::env::var("ROOMSCAN_DETECT_EVERY_N") {
            self.detect_every_n = every
                .trim()
                .parse()
                .map_err(|_| anyhow!("ROOMSCAN_DETECT_EVERY_N must be a positive integer"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let t = self.detector.thresholds;
        if !(0.0..=1.0).contains(&t.confidence) {
            return Err(anyhow!("detector confidence threshold must be within [0, 1]"));
        }
        if !(t.iou > 0.0 && t.iou <= 1.0) {
            return Err(anyhow!("detector iou threshold must be within (0, 1]"));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input size must be greater than zero"));
        }
        if self.depth.radius > MAX_WINDOW_RADIUS {
            return Err(anyhow!(
                "depth window radius must be at most {} (got {})",
                MAX_WINDOW_RADIUS,
                self.depth.radius
            ));
        }
        if !(self.depth.min_m > 0.0 && self.depth.min_m < self.depth.max_m) {
            return Err(anyhow!(
                "depth range must satisfy 0 < min_m < max_m (got {} .. {})",
                self.depth.min_m,
                self.depth.max_m
            ));
        }
        if !(self.tracker.merge_distance_m > 0.0) {
            return Err(anyhow!("tracker merge distance must be greater than zero"));
        }
        if !(self.tracker.prune_timeout_secs > 0.0) {
            return Err(anyhow!("tracker prune timeout must be greater than zero"));
        }
        if !(MIN_SPEAKER_WIDTH_CM..=MAX_SPEAKER_WIDTH_CM).contains(&self.speaker_width_cm) {
            return Err(anyhow!(
                "speaker width must be between {} and {} cm (got {})",
                MIN_SPEAKER_WIDTH_CM,
                MAX_SPEAKER_WIDTH_CM,
                self.speaker_width_cm
            ));
        }
        if self.detect_every_n == 0 {
            return Err(anyhow!("detect_every_n must be at least 1"));
        }
        Ok(())
    }
}

/// TOML, or JSON when the file has a `.json` extension.
fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let cfg = if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
