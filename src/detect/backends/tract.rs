#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::config::DetectorSettings;
use crate::detect::backend::{output_tensor, InferenceBackend};
use crate::detect::decoder::RawTensor;

/// Tract-based backend for YOLOv8-style ONNX detectors.
///
/// The model must take a `[1, 3, S, S]` float input and produce a
/// `[1, C, N]` output (4 box channels followed by class scores).
pub struct TractBackend {
    model: RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>,
    input_size: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)))
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "loaded detector model {} (input {}x{})",
            model_path.display(),
            input_size,
            input_size
        );
        Ok(Self { model, input_size })
    }

    /// Load the model named by `[detector] model_path` / `ROOMSCAN_MODEL_PATH`.
    pub fn from_config(settings: &DetectorSettings) -> Result<Self> {
        let path = settings
            .model_path
            .as_deref()
            .ok_or_else(|| anyhow!("detector model_path is not configured (set ROOMSCAN_MODEL_PATH)"))?;
        Self::new(path, settings.input_size)
    }

    fn build_input(&self, input: &[f32]) -> Result<Tensor> {
        let side = self.input_size as usize;
        let array = tract_ndarray::Array4::from_shape_vec((1, 3, side, side), input.to_vec())
            .map_err(|e| anyhow!("model input has wrong length: {}", e))?;
        Ok(array.into_tensor())
    }
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn infer(&mut self, input: &[f32]) -> Result<RawTensor> {
        let input = self.build_input(input)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let data: Vec<f32> = view.iter().copied().collect();
        Ok(output_tensor(self.name(), view.shape(), data))
    }
}
