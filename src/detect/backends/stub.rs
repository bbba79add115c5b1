use anyhow::{anyhow, Result};

use crate::detect::backend::{output_tensor, InferenceBackend};
use crate::detect::decoder::RawTensor;

/// Backend that replays a fixed output tensor. Used in tests and for
/// offline replay of recorded model output.
pub struct StubBackend {
    shape: Vec<usize>,
    data: Vec<f32>,
    input_size: u32,
    calls: usize,
}

impl StubBackend {
    pub fn new(output: RawTensor, input_size: u32) -> Self {
        let mut backend = Self::from_raw(Vec::new(), Vec::new(), input_size);
        backend.set_output(output);
        backend
    }

    /// Replay an output exactly as a runtime would hand it over, including
    /// shapes the decoder cannot read.
    pub fn from_raw(shape: Vec<usize>, data: Vec<f32>, input_size: u32) -> Self {
        Self {
            shape,
            data,
            input_size,
            calls: 0,
        }
    }

    /// Backend whose model produced no anchors.
    pub fn empty(input_size: u32) -> Self {
        Self::new(RawTensor::empty(5), input_size)
    }

    pub fn set_output(&mut self, output: RawTensor) {
        self.shape = vec![output.num_channel(), output.num_elements()];
        self.data = output.data().to_vec();
    }

    /// Number of `infer` calls served.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl InferenceBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn infer(&mut self, input: &[f32]) -> Result<RawTensor> {
        let side = self.input_size as usize;
        if input.len() != side * side * 3 {
            return Err(anyhow!(
                "expected {} input values, received {}",
                side * side * 3,
                input.len()
            ));
        }
        self.calls += 1;
        Ok(output_tensor(self.name(), &self.shape, self.data.clone()))
    }
}
