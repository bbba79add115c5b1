//! Room size from labelled two-point measurements.
//!
//! Users can measure a wall with two taps and tag it ("width", "높이", ...).
//! Once a width, depth and height are all present, they form a room extent
//! without the six-point frame.

use serde::{Deserialize, Serialize};

use super::RoomExtent;
use crate::math::Vector3;

const WIDTH_KEYS: &[&str] = &["w", "width", "가로", "폭", "넓이"];
const DEPTH_KEYS: &[&str] = &["d", "depth", "세로", "길이", "방길이", "방깊이", "전장", "장변"];
const HEIGHT_KEYS: &[&str] = &["h", "height", "높이", "천장", "층고"];

/// Characters dropped from labels before matching.
const LABEL_PUNCTUATION: &[char] = &['(', ')', '[', ']', '{', '}', ':', '：', '=', '~', '_', '-'];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledMeasure {
    pub label: String,
    pub meters: f32,
}

impl LabeledMeasure {
    pub fn new(label: impl Into<String>, meters: f32) -> Self {
        Self {
            label: label.into(),
            meters,
        }
    }

    /// Measure the straight-line distance between two picked points.
    pub fn between(label: impl Into<String>, a: Vector3, b: Vector3) -> Self {
        Self::new(label, distance_meters(a, b))
    }
}

pub fn distance_meters(a: Vector3, b: Vector3) -> f32 {
    a.distance(b)
}

/// Lowercase, strip whitespace and bracket/separator punctuation.
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace() && !LABEL_PUNCTUATION.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Single-letter keys must match the whole label; longer keys match when
/// either string contains the other.
fn matches_key(norm: &str, key: &str) -> bool {
    if key.chars().count() == 1 {
        norm == key
    } else {
        norm.contains(key) || key.contains(norm)
    }
}

fn pick(measures: &[LabeledMeasure], keys: &[&str]) -> Option<f32> {
    measures
        .iter()
        .find(|m| {
            let norm = normalize_label(&m.label);
            !norm.is_empty() && keys.iter().any(|k| matches_key(&norm, k))
        })
        .map(|m| m.meters)
}

/// Room extent from the first width, depth and height measure found.
/// `None` unless all three are present.
pub fn infer_room_size(measures: &[LabeledMeasure]) -> Option<RoomExtent> {
    Some(RoomExtent {
        width: pick(measures, WIDTH_KEYS)?,
        depth: pick(measures, DEPTH_KEYS)?,
        height: pick(measures, HEIGHT_KEYS)?,
    })
}
