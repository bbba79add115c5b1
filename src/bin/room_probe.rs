//! room_probe - offline checks for room and detection data
//!
//! Reads captured JSON (picked points, raw model tensors, labelled
//! measurements) and prints what the kernel makes of it, as JSON on stdout.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use roomscan_kernel::detect::{decode_with, labels, DecodeThresholds, RawTensor};
use roomscan_kernel::room::labels::{infer_room_size, LabeledMeasure};
use roomscan_kernel::room::{solve_room_frame, validate, AxisFrame, PickedPoints, RoomExtent};
use roomscan_kernel::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "room_probe", about = "Inspect room picks, model output and labelled measures")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve the room frame from six picked points
    Solve {
        /// JSON file with x_min, x_max, z_min, z_max, y_floor, y_ceil
        #[arg(long, value_name = "PATH")]
        points: PathBuf,
    },

    /// Decode a raw model tensor into boxes
    Decode {
        /// JSON file with num_channel, num_elements and channel-major data
        #[arg(long, value_name = "PATH")]
        tensor: PathBuf,
        /// One class name per line (defaults to ROOMSCAN_LABELS_PATH / built-ins)
        #[arg(long, value_name = "PATH")]
        labels: Option<PathBuf>,
        /// Override the configured confidence threshold
        #[arg(long)]
        confidence: Option<f32>,
    },

    /// Infer a room extent from labelled two-point measurements
    InferSize {
        /// JSON array of {"label": ..., "meters": ...}
        #[arg(long, value_name = "PATH")]
        measures: PathBuf,
    },

    /// Load the configured detector model and run one warm-up inference
    CheckModel,
}

#[cfg(feature = "backend-tract")]
#[derive(Serialize)]
struct ModelOutput {
    model_path: Option<PathBuf>,
    input_size: u32,
    labels: usize,
    backend: &'static str,
}

#[derive(Serialize)]
struct SolveOutput {
    frame: AxisFrame,
    extent: RoomExtent,
    ok: bool,
    reason: Option<&'static str>,
    message: Option<&'static str>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Solve { points } => cmd_solve(&points),
        Command::Decode {
            tensor,
            labels,
            confidence,
        } => cmd_decode(&tensor, labels.as_deref(), confidence),
        Command::InferSize { measures } => cmd_infer_size(&measures),
        Command::CheckModel => cmd_check_model(),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_solve(path: &Path) -> Result<()> {
    let points: PickedPoints = read_json(path)?;
    let (frame, extent) = solve_room_frame(&points).ok_or_else(|| {
        anyhow!(
            "picked points incomplete; next step is {}",
            points.next_step().prompt()
        )
    })?;
    let validation = validate(&frame, &extent);
    if let Some(reason) = validation.reason {
        log::warn!("room rejected: {}", reason);
    } else {
        log::info!(
            "room {:.2} x {:.2} x {:.2} m",
            extent.width,
            extent.depth,
            extent.height
        );
    }
    print_json(&SolveOutput {
        frame,
        extent,
        ok: validation.ok,
        reason: validation.reason.map(|r| r.code()),
        message: validation.reason.map(|r| r.message()),
    })
}

fn cmd_decode(path: &Path, labels_path: Option<&Path>, confidence: Option<f32>) -> Result<()> {
    let config = PipelineConfig::load()?;
    let tensor: RawTensor = read_json(path)?;
    let labels_path = labels_path.or(config.detector.labels_path.as_deref());
    let labels = labels::load_labels(labels_path)?;
    let thresholds = DecodeThresholds {
        confidence: confidence.unwrap_or(config.detector.thresholds.confidence),
        ..config.detector.thresholds
    };
    let boxes = decode_with(&tensor, &labels, thresholds);
    log::info!(
        "{} anchors -> {} boxes",
        tensor.num_elements(),
        boxes.len()
    );
    print_json(&boxes)
}

fn cmd_infer_size(path: &Path) -> Result<()> {
    let measures: Vec<LabeledMeasure> = read_json(path)?;
    let extent = infer_room_size(&measures)
        .ok_or_else(|| anyhow!("need width, depth and height measures; got {}", measures.len()))?;
    print_json(&extent)
}

#[cfg(feature = "backend-tract")]
fn cmd_check_model() -> Result<()> {
    use roomscan_kernel::detect::InferenceBackend;
    use roomscan_kernel::SpeakerPipeline;

    let config = PipelineConfig::load()?;
    let pipeline = SpeakerPipeline::with_tract(&config)?;
    let detector = pipeline.detector();
    print_json(&ModelOutput {
        model_path: config.detector.model_path.clone(),
        input_size: detector.backend().input_size(),
        labels: detector.labels().len(),
        backend: detector.backend().name(),
    })
}

#[cfg(not(feature = "backend-tract"))]
fn cmd_check_model() -> Result<()> {
    let config = PipelineConfig::load()?;
    log::warn!(
        "model {} ({}x{}) not loaded",
        config
            .detector
            .model_path
            .as_deref()
            .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
        config.detector.input_size,
        config.detector.input_size
    );
    Err(anyhow!("room_probe was built without the backend-tract feature"))
}
