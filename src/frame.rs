//! Per-frame platform boundary.
//!
//! - `ArFrame`: what the AR session hands the kernel each frame (pose,
//!   intrinsics, hit-test, scoped image handles).
//! - `DepthImage` / `CameraImage`: scoped handles that borrow the frame and
//!   run their release hook exactly once when dropped, on every exit path.
//! - `SyntheticFrame`: in-memory frame for tests and offline replay.
//!
//! The handles carry the frame's lifetime, so they cannot be stored past the
//! call that acquired them.

use std::cell::Cell;

use crate::math::coords::{DisplayPoint, DisplayTransform};
use crate::math::{CameraIntrinsics, Pose, Vector3};

/// Depth samples outside the image, or past the end of the buffer, read as 0.
const MISSING_DEPTH: f32 = 0.0;

// ----------------------------------------------------------------------------
// ArFrame: platform seam
// ----------------------------------------------------------------------------

pub trait ArFrame {
    fn camera_pose(&self) -> Pose;

    fn intrinsics(&self) -> CameraIntrinsics;

    /// Mapping between the on-screen view and the camera image.
    fn display_transform(&self) -> DisplayTransform;

    /// Monotonic frame timestamp in nanoseconds.
    fn timestamp_ns(&self) -> u64;

    /// World position of the first surface hit by the ray through a display pixel.
    fn hit_test(&self, point: DisplayPoint) -> Option<Vector3>;

    /// Acquire the dense depth image, if the session produced one this frame.
    fn acquire_depth_image(&self) -> Option<DepthImage<'_>>;

    /// Acquire the CPU-side RGB camera image.
    fn acquire_camera_image(&self) -> Option<CameraImage<'_>>;
}

// ----------------------------------------------------------------------------
// Scoped image handles
// ----------------------------------------------------------------------------

type ReleaseHook<'a> = Box<dyn FnOnce() + 'a>;

/// 16-bit little-endian millimeter depth image.
pub struct DepthImage<'a> {
    data: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes between rows.
    pub row_stride: usize,
    /// Bytes between neighbouring pixels in a row (usually 2).
    pub pixel_stride: usize,
    release: Option<ReleaseHook<'a>>,
}

impl<'a> DepthImage<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            width,
            height,
            row_stride,
            pixel_stride,
            release: None,
        }
    }

    /// Run `hook` when this handle is dropped.
    pub fn with_release(mut self, hook: impl FnOnce() + 'a) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    /// Depth at integer pixel `(x, y)` in meters; 0.0 when out of bounds.
    pub fn read_meters(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return MISSING_DEPTH;
        }
        let index = y as usize * self.row_stride + x as usize * self.pixel_stride;
        match (self.data.get(index), self.data.get(index + 1)) {
            (Some(&lo), Some(&hi)) => u16::from_le_bytes([lo, hi]) as f32 / 1000.0,
            _ => MISSING_DEPTH,
        }
    }
}

impl Drop for DepthImage<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// RGB24 camera image in sensor orientation.
pub struct CameraImage<'a> {
    rgb: &'a [u8],
    pub width: u32,
    pub height: u32,
    release: Option<ReleaseHook<'a>>,
}

impl<'a> CameraImage<'a> {
    pub fn new(rgb: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            rgb,
            width,
            height,
            release: None,
        }
    }

    pub fn with_release(mut self, hook: impl FnOnce() + 'a) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    pub fn pixels(&self) -> &[u8] {
        self.rgb
    }
}

impl Drop for CameraImage<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

// ----------------------------------------------------------------------------
// SyntheticFrame
// ----------------------------------------------------------------------------

/// Owned depth buffer backing a `SyntheticFrame`.
#[derive(Clone, Debug)]
pub struct DepthBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl DepthBuffer {
    /// Tightly packed buffer with `depth_mm(x, y)` at every pixel.
    pub fn from_fn(width: u32, height: u32, depth_mm: impl Fn(u32, u32) -> u16) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 2);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&depth_mm(x, y).to_le_bytes());
            }
        }
        Self {
            data,
            width,
            height,
            row_stride: width as usize * 2,
            pixel_stride: 2,
        }
    }

    pub fn uniform(width: u32, height: u32, depth_mm: u16) -> Self {
        Self::from_fn(width, height, |_, _| depth_mm)
    }
}

#[derive(Clone, Debug)]
struct RgbBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

/// In-memory frame with fixed sensor readings.
pub struct SyntheticFrame {
    pose: Pose,
    intrinsics: CameraIntrinsics,
    transform: DisplayTransform,
    timestamp_ns: u64,
    hit: Option<Vector3>,
    depth: Option<DepthBuffer>,
    rgb: Option<RgbBuffer>,
    depth_acquired: Cell<usize>,
    depth_released: Cell<usize>,
    camera_released: Cell<usize>,
}

impl SyntheticFrame {
    pub fn new(pose: Pose, intrinsics: CameraIntrinsics, transform: DisplayTransform) -> Self {
        Self {
            pose,
            intrinsics,
            transform,
            timestamp_ns: 0,
            hit: None,
            depth: None,
            rgb: None,
            depth_acquired: Cell::new(0),
            depth_released: Cell::new(0),
            camera_released: Cell::new(0),
        }
    }

    pub fn with_timestamp(mut self, timestamp_ns: u64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    /// Every hit-test on this frame returns `point`.
    pub fn with_hit(mut self, point: Vector3) -> Self {
        self.hit = Some(point);
        self
    }

    pub fn with_depth(mut self, depth: DepthBuffer) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_camera_image(mut self, rgb: Vec<u8>, width: u32, height: u32) -> Self {
        self.rgb = Some(RgbBuffer {
            data: rgb,
            width,
            height,
        });
        self
    }

    pub fn set_timestamp(&mut self, timestamp_ns: u64) {
        self.timestamp_ns = timestamp_ns;
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub fn depth_acquired(&self) -> usize {
        self.depth_acquired.get()
    }

    pub fn depth_released(&self) -> usize {
        self.depth_released.get()
    }

    pub fn camera_released(&self) -> usize {
        self.camera_released.get()
    }
}

impl ArFrame for SyntheticFrame {
    fn camera_pose(&self) -> Pose {
        self.pose
    }

    fn intrinsics(&self) -> CameraIntrinsics {
        self.intrinsics
    }

    fn display_transform(&self) -> DisplayTransform {
        self.transform
    }

    fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    fn hit_test(&self, _point: DisplayPoint) -> Option<Vector3> {
        self.hit
    }

    fn acquire_depth_image(&self) -> Option<DepthImage<'_>> {
        let depth = self.depth.as_ref()?;
        self.depth_acquired.set(self.depth_acquired.get() + 1);
        let released = &self.depth_released;
        Some(
            DepthImage::new(
                &depth.data,
                depth.width,
                depth.height,
                depth.row_stride,
                depth.pixel_stride,
            )
            .with_release(move || released.set(released.get() + 1)),
        )
    }

    fn acquire_camera_image(&self) -> Option<CameraImage<'_>> {
        let rgb = self.rgb.as_ref()?;
        let released = &self.camera_released;
        Some(
            CameraImage::new(&rgb.data, rgb.width, rgb.height)
                .with_release(move || released.set(released.get() + 1)),
        )
    }
}
