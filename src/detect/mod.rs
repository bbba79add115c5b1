//! Object detection: model backends, preprocessing and output decoding.
//!
//! `decode` is the pure core. `Detector` wraps a backend with the label set,
//! thresholds and the single-flight inference gate.

mod backend;
mod backends;
mod decoder;
mod gate;
pub mod labels;
pub mod preprocess;
mod result;

use anyhow::Result;

pub use backend::InferenceBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use decoder::{
    decode, decode_with, nms, DecodeThresholds, RawTensor, CONFIDENCE_THRESHOLD, IOU_THRESHOLD,
};
pub use gate::{InferenceGate, InferencePermit};
pub use result::BoundingBox;

pub struct Detector<B: InferenceBackend> {
    backend: B,
    labels: Vec<String>,
    thresholds: DecodeThresholds,
    gate: InferenceGate,
}

impl<B: InferenceBackend> Detector<B> {
    pub fn new(backend: B, labels: Vec<String>) -> Self {
        Self {
            backend,
            labels,
            thresholds: DecodeThresholds::default(),
            gate: InferenceGate::new(),
        }
    }

    /// Override the default confidence and IOU thresholds.
    pub fn with_thresholds(mut self, thresholds: DecodeThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Share an existing gate, e.g. with the frame delivery thread.
    pub fn with_gate(mut self, gate: InferenceGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn gate(&self) -> InferenceGate {
        self.gate.clone()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn warm_up(&mut self) -> Result<()> {
        log::debug!("warming up {} backend", self.backend.name());
        self.backend.warm_up()
    }

    /// Detect objects in an RGB24 frame.
    ///
    /// Returns `Ok(None)` when another inference is still outstanding; the
    /// caller should drop this frame.
    pub fn detect(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<Option<Vec<BoundingBox>>> {
        let Some(_permit) = self.gate.try_acquire() else {
            log::debug!("inference busy; skipping frame");
            return Ok(None);
        };
        let input = preprocess::to_model_input(rgb, width, height, self.backend.input_size())?;
        let tensor = self.backend.infer(&input)?;
        let boxes = decode_with(&tensor, &self.labels, self.thresholds);
        log::debug!(
            "{} backend: {} anchors -> {} boxes",
            self.backend.name(),
            tensor.num_elements(),
            boxes.len()
        );
        Ok(Some(boxes))
    }
}
