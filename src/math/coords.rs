//! Pixel coordinate spaces.
//!
//! Three spaces are in play and they are never interchangeable:
//!
//! - `DisplayPoint`: pixels of the on-screen view (taps, overlay drawing).
//! - `ImagePoint`: pixels of the camera image in sensor orientation. Camera
//!   intrinsics and detector output live here.
//! - `DepthPoint`: pixels of the (usually lower resolution) depth image.
//!
//! All conversions between them go through this module.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DepthPoint {
    pub x: f32,
    pub y: f32,
}

impl DisplayPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl ImagePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl DepthPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Clockwise rotation applied to the camera image before it is shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageRotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl ImageRotation {
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(ImageRotation::Deg0),
            90 => Some(ImageRotation::Deg90),
            180 => Some(ImageRotation::Deg180),
            270 => Some(ImageRotation::Deg270),
            _ => None,
        }
    }

    fn swaps_axes(self) -> bool {
        matches!(self, ImageRotation::Deg90 | ImageRotation::Deg270)
    }
}

/// Mapping between the display and the camera image for one frame.
///
/// The (rotated) camera image is scaled independently along each axis to
/// fill the view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayTransform {
    pub view_width: f32,
    pub view_height: f32,
    pub image_width: f32,
    pub image_height: f32,
    pub rotation: ImageRotation,
}

impl DisplayTransform {
    pub fn new(
        view_width: f32,
        view_height: f32,
        image_width: f32,
        image_height: f32,
        rotation: ImageRotation,
    ) -> Self {
        Self {
            view_width,
            view_height,
            image_width,
            image_height,
            rotation,
        }
    }

    /// Size of the camera image after rotation.
    fn rotated_dims(&self) -> (f32, f32) {
        if self.rotation.swaps_axes() {
            (self.image_height, self.image_width)
        } else {
            (self.image_width, self.image_height)
        }
    }

    pub fn display_to_image(&self, p: DisplayPoint) -> ImagePoint {
        let (rw, rh) = self.rotated_dims();
        let rx = p.x * rw / self.view_width;
        let ry = p.y * rh / self.view_height;
        let (w, h) = (self.image_width, self.image_height);
        match self.rotation {
            ImageRotation::Deg0 => ImagePoint::new(rx, ry),
            ImageRotation::Deg90 => ImagePoint::new(ry, h - rx),
            ImageRotation::Deg180 => ImagePoint::new(w - rx, h - ry),
            ImageRotation::Deg270 => ImagePoint::new(w - ry, rx),
        }
    }

    pub fn image_to_display(&self, p: ImagePoint) -> DisplayPoint {
        let (w, h) = (self.image_width, self.image_height);
        let (rx, ry) = match self.rotation {
            ImageRotation::Deg0 => (p.x, p.y),
            ImageRotation::Deg90 => (h - p.y, p.x),
            ImageRotation::Deg180 => (w - p.x, h - p.y),
            ImageRotation::Deg270 => (p.y, w - p.x),
        };
        let (rw, rh) = self.rotated_dims();
        DisplayPoint::new(rx * self.view_width / rw, ry * self.view_height / rh)
    }
}

/// Camera-image pixel to depth-image pixel by resolution scaling. Both images
/// share the sensor orientation.
pub fn image_to_depth(p: ImagePoint, image_dims: (u32, u32), depth_dims: (u32, u32)) -> DepthPoint {
    let img_w = image_dims.0.max(1) as f32;
    let img_h = image_dims.1.max(1) as f32;
    DepthPoint::new(
        p.x / img_w * depth_dims.0 as f32,
        p.y / img_h * depth_dims.1 as f32,
    )
}

/// Normalized (0..1) detector coordinates to camera-image pixels.
pub fn normalized_to_image(nx: f32, ny: f32, image_dims: (u32, u32)) -> ImagePoint {
    ImagePoint::new(nx * image_dims.0 as f32, ny * image_dims.1 as f32)
}
