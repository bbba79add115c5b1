//! YOLO-style output decoding and non-max suppression.

use anyhow::{anyhow, Result};
use serde::Deserialize;

use super::result::BoundingBox;

pub const CONFIDENCE_THRESHOLD: f32 = 0.30;
pub const IOU_THRESHOLD: f32 = 0.50;

/// Number of leading box channels (cx, cy, w, h).
const BOX_CHANNELS: usize = 4;

/// Raw model output, channel-major `[num_channel, num_elements]`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawTensorFile")]
pub struct RawTensor {
    num_channel: usize,
    num_elements: usize,
    data: Vec<f32>,
}

#[derive(Deserialize)]
struct RawTensorFile {
    num_channel: usize,
    num_elements: usize,
    data: Vec<f32>,
}

impl TryFrom<RawTensorFile> for RawTensor {
    type Error = anyhow::Error;

    fn try_from(file: RawTensorFile) -> Result<Self> {
        RawTensor::new(file.num_channel, file.num_elements, file.data)
    }
}

impl RawTensor {
    pub fn new(num_channel: usize, num_elements: usize, data: Vec<f32>) -> Result<Self> {
        let expected = num_channel
            .checked_mul(num_elements)
            .ok_or_else(|| anyhow!("tensor shape overflows"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "tensor shape [{}, {}] expects {} values, got {}",
                num_channel,
                num_elements,
                expected,
                data.len()
            ));
        }
        Ok(Self {
            num_channel,
            num_elements,
            data,
        })
    }

    /// A tensor with no anchors, as produced by an uninitialised model.
    pub fn empty(num_channel: usize) -> Self {
        Self {
            num_channel,
            num_elements: 0,
            data: Vec::new(),
        }
    }

    /// Tensor from a runtime output of shape `[1, C, N]` or `[C, N]`.
    /// `None` for any other shape or a length that does not match it.
    pub fn from_model_output(shape: &[usize], data: Vec<f32>) -> Option<Self> {
        let (num_channel, num_elements) = match shape {
            [1, c, n] | [c, n] => (*c, *n),
            _ => return None,
        };
        Self::new(num_channel, num_elements, data).ok()
    }

    pub fn num_channel(&self) -> usize {
        self.num_channel
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    fn at(&self, channel: usize, element: usize) -> f32 {
        self.data[channel * self.num_elements + element]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeThresholds {
    pub confidence: f32,
    pub iou: f32,
}

impl Default for DecodeThresholds {
    fn default() -> Self {
        Self {
            confidence: CONFIDENCE_THRESHOLD,
            iou: IOU_THRESHOLD,
        }
    }
}

/// Decode a raw tensor into suppressed boxes using the default thresholds.
pub fn decode(tensor: &RawTensor, labels: &[String]) -> Vec<BoundingBox> {
    decode_with(tensor, labels, DecodeThresholds::default())
}

pub fn decode_with(
    tensor: &RawTensor,
    labels: &[String],
    thresholds: DecodeThresholds,
) -> Vec<BoundingBox> {
    if tensor.num_elements == 0 || tensor.num_channel <= BOX_CHANNELS {
        return Vec::new();
    }

    let mut raw = Vec::new();
    for c in 0..tensor.num_elements {
        let mut max_conf = thresholds.confidence;
        let mut class_index = None;
        for j in BOX_CHANNELS..tensor.num_channel {
            let conf = tensor.at(j, c);
            if conf > max_conf {
                max_conf = conf;
                class_index = Some(j - BOX_CHANNELS);
            }
        }
        let Some(class_index) = class_index else {
            continue;
        };

        let cx = tensor.at(0, c);
        let cy = tensor.at(1, c);
        let w = tensor.at(2, c);
        let h = tensor.at(3, c);
        let x1 = cx - w / 2.0;
        let y1 = cy - h / 2.0;
        let x2 = cx + w / 2.0;
        let y2 = cy + h / 2.0;
        if ![x1, y1, x2, y2].iter().all(|v| (0.0..=1.0).contains(v)) {
            continue;
        }

        raw.push(BoundingBox {
            x1,
            y1,
            x2,
            y2,
            center_x: cx,
            center_y: cy,
            width: w,
            height: h,
            confidence: max_conf,
            class_index,
            class_name: class_name(labels, class_index),
        });
    }

    nms(raw, thresholds.iou)
}

fn class_name(labels: &[String], index: usize) -> String {
    labels
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("class{}", index))
}

/// Greedy non-max suppression. Output is in suppression order: each pick is
/// the most confident box left after the previous picks removed their
/// overlaps. Overlap at or above `iou_threshold` suppresses.
pub fn nms(boxes: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    let mut sorted = boxes;
    // stable: equal confidences keep anchor order
    sorted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut selected = Vec::with_capacity(sorted.len());
    while !sorted.is_empty() {
        let first = sorted.remove(0);
        // NaN overlap (two zero-area boxes) does not suppress
        sorted.retain(|bb| !(first.iou(bb) >= iou_threshold));
        selected.push(first);
    }
    selected
}
