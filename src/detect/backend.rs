use anyhow::Result;

use super::decoder::RawTensor;

/// Model runtime behind the detector.
///
/// Backends receive an already preprocessed NCHW float input and return the
/// model's raw output. Decoding happens outside the backend so every runtime
/// shares the same thresholds and suppression.
///
/// Implementations must not retain the input slice beyond `infer`.
pub trait InferenceBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Side length of the square model input.
    fn input_size(&self) -> u32;

    /// Run the model once.
    fn infer(&mut self, input: &[f32]) -> Result<RawTensor>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        let side = self.input_size() as usize;
        self.infer(&vec![0.0; side * side * 3]).map(|_| ())
    }
}

/// Wrap a runtime output as a [`RawTensor`]. A shape the decoder cannot read
/// is logged and replaced by an empty tensor, so the frame yields no boxes.
pub(crate) fn output_tensor(backend: &str, shape: &[usize], data: Vec<f32>) -> RawTensor {
    match RawTensor::from_model_output(shape, data) {
        Some(tensor) => tensor,
        None => {
            log::warn!("{} backend: unreadable model output shape {:?}", backend, shape);
            RawTensor::empty(0)
        }
    }
}
