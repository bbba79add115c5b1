//! Display pixel to world point resolution.
//!
//! Order: platform hit-test, then the dense depth window, then the
//! known-size distance estimate. The first source that yields a point wins;
//! if none does the observation is skipped.

use serde::Serialize;

use crate::depth::{sample_depth_window, DepthWindow};
use crate::frame::ArFrame;
use crate::math::coords::{self, DisplayPoint, ImagePoint};
use crate::math::{ray_from_pixel, Vector3};

/// Size-fallback distances are clamped to this range (meters).
pub const SIZE_FALLBACK_MIN_M: f32 = 0.2;
pub const SIZE_FALLBACK_MAX_M: f32 = 10.0;

/// Smallest box width used by the size fallback, to avoid division by ~0.
const MIN_BOX_WIDTH_PX: f32 = 1.0;

/// Focal lengths at or below this are treated as missing intrinsics.
const MIN_FOCAL_PX: f32 = 1.0;

/// Known physical width of the target and its apparent width in camera-image pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizeHint {
    pub known_width_m: f32,
    pub box_width_px: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    HitTest,
    Depth,
    SizeFallback,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolution {
    pub point: Vector3,
    pub source: ResolutionSource,
}

#[derive(Clone, Debug, Default)]
pub struct Resolver {
    window: DepthWindow,
}

impl Resolver {
    pub fn new(window: DepthWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &DepthWindow {
        &self.window
    }

    pub fn resolve<F: ArFrame + ?Sized>(
        &self,
        frame: &F,
        point: DisplayPoint,
        hint: Option<SizeHint>,
    ) -> Option<Vector3> {
        self.resolve_detailed(frame, point, hint).map(|r| r.point)
    }

    pub fn resolve_detailed<F: ArFrame + ?Sized>(
        &self,
        frame: &F,
        point: DisplayPoint,
        hint: Option<SizeHint>,
    ) -> Option<Resolution> {
        if let Some(hit) = frame.hit_test(point) {
            return Some(Resolution {
                point: hit,
                source: ResolutionSource::HitTest,
            });
        }

        let image_point = frame.display_transform().display_to_image(point);

        if let Some(depth_m) = self.sample_depth(frame, image_point) {
            return Some(Resolution {
                point: world_at_depth(frame, image_point, depth_m),
                source: ResolutionSource::Depth,
            });
        }

        let hint = hint?;
        let distance = size_fallback_distance(frame.intrinsics().fx, hint)?;
        log::debug!("no usable depth; size fallback at {:.2} m", distance);
        Some(Resolution {
            point: world_at_depth(frame, image_point, distance),
            source: ResolutionSource::SizeFallback,
        })
    }

    /// Depth handle is acquired and released inside this call.
    fn sample_depth<F: ArFrame + ?Sized>(&self, frame: &F, image_point: ImagePoint) -> Option<f32> {
        let depth = frame.acquire_depth_image()?;
        let intrinsics = frame.intrinsics();
        let depth_point = coords::image_to_depth(
            image_point,
            (intrinsics.image_width, intrinsics.image_height),
            (depth.width, depth.height),
        );
        sample_depth_window(&depth, depth_point, &self.window)
    }
}

/// Resolve with the default depth window.
pub fn resolve_world_point<F: ArFrame + ?Sized>(
    frame: &F,
    x: f32,
    y: f32,
    hint: Option<SizeHint>,
) -> Option<Vector3> {
    Resolver::default().resolve(frame, DisplayPoint::new(x, y), hint)
}

/// `Z ≈ fx * W / w_px`, clamped to the plausible range.
pub fn size_fallback_distance(fx: f32, hint: SizeHint) -> Option<f32> {
    if fx <= MIN_FOCAL_PX {
        return None;
    }
    let width_px = hint.box_width_px.max(MIN_BOX_WIDTH_PX);
    Some((fx * hint.known_width_m / width_px).clamp(SIZE_FALLBACK_MIN_M, SIZE_FALLBACK_MAX_M))
}

fn world_at_depth<F: ArFrame + ?Sized>(frame: &F, image_point: ImagePoint, distance: f32) -> Vector3 {
    let ray = ray_from_pixel(
        image_point.x,
        image_point.y,
        &frame.intrinsics(),
        &frame.camera_pose(),
    );
    ray.at(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{DepthBuffer, SyntheticFrame};
    use crate::math::coords::{DisplayTransform, ImageRotation};
    use crate::math::{CameraIntrinsics, Pose, Quaternion};

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics {
            fx: 400.0,
            fy: 400.0,
            cx: 320.0,
            cy: 240.0,
            image_width: 640,
            image_height: 480,
        }
    }

    fn frame(rotation: ImageRotation) -> SyntheticFrame {
        let transform = match rotation {
            ImageRotation::Deg90 | ImageRotation::Deg270 => {
                DisplayTransform::new(480.0, 640.0, 640.0, 480.0, rotation)
            }
            _ => DisplayTransform::new(640.0, 480.0, 640.0, 480.0, rotation),
        };
        SyntheticFrame::new(
            Pose::new(Vector3::new(0.0, 1.4, 0.0), Quaternion::IDENTITY),
            intrinsics(),
            transform,
        )
    }

    fn close(a: Vector3, b: Vector3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn hit_test_wins_over_depth() {
        let f = frame(ImageRotation::Deg0)
            .with_hit(Vector3::new(1.0, 0.0, -2.0))
            .with_depth(DepthBuffer::uniform(160, 120, 3000));
        let r = Resolver::default()
            .resolve_detailed(&f, DisplayPoint::new(320.0, 240.0), None)
            .expect("resolved");
        assert_eq!(r.source, ResolutionSource::HitTest);
        assert_eq!(r.point, Vector3::new(1.0, 0.0, -2.0));
        assert_eq!(f.depth_acquired(), 0);
    }

    #[test]
    fn depth_resolves_along_camera_ray() {
        let f = frame(ImageRotation::Deg0).with_depth(DepthBuffer::uniform(160, 120, 2000));
        let r = Resolver::default()
            .resolve_detailed(&f, DisplayPoint::new(320.0, 240.0), None)
            .expect("resolved");
        assert_eq!(r.source, ResolutionSource::Depth);
        assert!(close(r.point, Vector3::new(0.0, 1.4, -2.0)));
        assert_eq!(f.depth_released(), f.depth_acquired());
    }

    #[test]
    fn depth_lookup_uses_rotated_display_mapping() {
        // Left half of the sensor image is near, right half far.
        let depth = DepthBuffer::from_fn(160, 120, |x, _| if x < 80 { 1000 } else { 4000 });
        let f = frame(ImageRotation::Deg90).with_depth(depth);

        // Display (100, 500) on the 480x640 portrait view is image (500, 380),
        // the far half. Reading it as an image pixel would land on the near half.
        let r = Resolver::default()
            .resolve_detailed(&f, DisplayPoint::new(100.0, 500.0), None)
            .expect("resolved");
        assert_eq!(r.source, ResolutionSource::Depth);
        let dir = Vector3::new((500.0 - 320.0) / 400.0, (380.0 - 240.0) / 400.0, -1.0).normalize();
        assert!(close(r.point, Vector3::new(0.0, 1.4, 0.0) + dir * 4.0));
    }

    #[test]
    fn invalid_depth_falls_through_to_size_hint() {
        let f = frame(ImageRotation::Deg0).with_depth(DepthBuffer::uniform(160, 120, 0));
        let hint = SizeHint {
            known_width_m: 0.18,
            box_width_px: 36.0,
        };
        let r = Resolver::default()
            .resolve_detailed(&f, DisplayPoint::new(320.0, 240.0), Some(hint))
            .expect("resolved");
        assert_eq!(r.source, ResolutionSource::SizeFallback);
        // 400 * 0.18 / 36 = 2 m
        assert!(close(r.point, Vector3::new(0.0, 1.4, -2.0)));
        assert_eq!(f.depth_released(), 1);
    }

    #[test]
    fn nothing_available_yields_none() {
        let f = frame(ImageRotation::Deg0);
        assert!(resolve_world_point(&f, 10.0, 10.0, None).is_none());
    }

    #[test]
    fn size_fallback_clamps_and_requires_focal_length() {
        let hint = SizeHint {
            known_width_m: 0.18,
            box_width_px: 0.0,
        };
        // width floored at 1 px -> 72 m -> clamped
        assert_eq!(size_fallback_distance(400.0, hint), Some(SIZE_FALLBACK_MAX_M));
        let far = SizeHint {
            known_width_m: 0.01,
            box_width_px: 600.0,
        };
        assert_eq!(size_fallback_distance(400.0, far), Some(SIZE_FALLBACK_MIN_M));
        assert_eq!(size_fallback_distance(1.0, far), None);
    }
}
