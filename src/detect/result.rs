use serde::{Deserialize, Serialize};

/// One decoded detection. Coordinates are normalized 0..1 relative to the
/// camera image the model saw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    pub class_index: usize,
    pub class_name: String,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Intersection over union. The union uses the stored width/height.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);
        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        inter / union
    }

    /// Box width in pixels of an image `image_width` pixels wide.
    pub fn pixel_width(&self, image_width: u32) -> f32 {
        (self.x2 - self.x1).abs() * image_width as f32
    }
}
