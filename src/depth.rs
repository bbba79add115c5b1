//! Robust depth sampling around a pixel.

use serde::Deserialize;

use crate::frame::DepthImage;
use crate::math::coords::DepthPoint;

pub const DEFAULT_WINDOW_RADIUS: u32 = 3;
pub const DEFAULT_MIN_DEPTH_M: f32 = 0.2;
pub const DEFAULT_MAX_DEPTH_M: f32 = 10.0;
/// Largest window half-width accepted from configuration.
pub const MAX_WINDOW_RADIUS: u32 = 16;

/// Fewest in-range samples accepted regardless of window size.
const MIN_VALID_SAMPLES: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct DepthWindow {
    /// Half-width R of the `(2R+1) x (2R+1)` window.
    pub radius: u32,
    pub min_m: f32,
    pub max_m: f32,
}

impl Default for DepthWindow {
    fn default() -> Self {
        Self {
            radius: DEFAULT_WINDOW_RADIUS,
            min_m: DEFAULT_MIN_DEPTH_M,
            max_m: DEFAULT_MAX_DEPTH_M,
        }
    }
}

impl DepthWindow {
    pub fn area(&self) -> usize {
        let side = (self.radius as usize).saturating_mul(2).saturating_add(1);
        side.saturating_mul(side)
    }

    /// Samples needed before the window is trusted: `max(5, area / 4)`.
    pub fn required_samples(&self) -> usize {
        MIN_VALID_SAMPLES.max(self.area() / 4)
    }
}

/// Median depth in meters of the in-range samples in a window centred on
/// `center` (truncated to an integer pixel).
///
/// Returns `None` when fewer than [`DepthWindow::required_samples`] samples
/// fall inside `[min_m, max_m]`. For an even number of samples the upper of
/// the two middle values is returned.
pub fn sample_depth_window(image: &DepthImage<'_>, center: DepthPoint, window: &DepthWindow) -> Option<f32> {
    if image.width == 0 || image.height == 0 {
        return None;
    }
    let cx = center.x as i64;
    let cy = center.y as i64;
    let r = window.radius as i64;

    // pixels outside the image read as missing, so only the overlap is visited
    let (x0, x1) = ((cx - r).max(0), (cx + r).min(image.width as i64 - 1));
    let (y0, y1) = ((cy - r).max(0), (cy + r).min(image.height as i64 - 1));
    let visible = ((x1 - x0 + 1).max(0) * (y1 - y0 + 1).max(0)) as usize;
    let mut values = Vec::with_capacity(visible);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let m = image.read_meters(x, y);
            if (window.min_m..=window.max_m).contains(&m) {
                values.push(m);
            }
        }
    }
    if values.len() < window.required_samples() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    Some(values[values.len() / 2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DepthBuffer;

    fn image(buf: &DepthBuffer) -> DepthImage<'_> {
        DepthImage::new(&buf.data, buf.width, buf.height, buf.row_stride, buf.pixel_stride)
    }

    #[test]
    fn required_samples_for_default_window() {
        let w = DepthWindow::default();
        assert_eq!(w.area(), 49);
        assert_eq!(w.required_samples(), 12);
        let small = DepthWindow {
            radius: 1,
            ..DepthWindow::default()
        };
        assert_eq!(small.required_samples(), 5);
    }

    #[test]
    fn huge_radius_saturates_instead_of_overflowing() {
        let w = DepthWindow {
            radius: u32::MAX,
            ..DepthWindow::default()
        };
        assert!(w.area() >= w.required_samples());
        let buf = DepthBuffer::uniform(4, 4, 1800);
        assert_eq!(sample_depth_window(&image(&buf), DepthPoint::new(1.0, 1.0), &w), None);
    }

    #[test]
    fn too_few_valid_samples_yields_none() {
        // Only 11 pixels of the 7x7 window carry valid depth.
        let buf = DepthBuffer::from_fn(10, 10, |x, y| if y == 3 && x < 7 || y == 4 && x < 4 { 2000 } else { 0 });
        let img = image(&buf);
        assert_eq!(sample_depth_window(&img, DepthPoint::new(3.0, 3.0), &DepthWindow::default()), None);
    }

    #[test]
    fn median_of_hand_built_window() {
        // 3x3 window (R=1) centred at (1,1): values in mm
        let mm = [
            [500u16, 9000, 800],
            [1200, 1000, 0],
            [15000, 700, 3000],
        ];
        let buf = DepthBuffer::from_fn(3, 3, |x, y| mm[y as usize][x as usize]);
        let img = image(&buf);
        let window = DepthWindow {
            radius: 1,
            ..DepthWindow::default()
        };
        // in range: 0.5 9.0 0.8 1.2 1.0 0.7 3.0 -> sorted 0.5 0.7 0.8 1.0 1.2 3.0 9.0
        assert_eq!(sample_depth_window(&img, DepthPoint::new(1.0, 1.0), &window), Some(1.0));
    }

    #[test]
    fn range_bounds_are_inclusive_and_outliers_ignored() {
        let buf = DepthBuffer::from_fn(7, 7, |x, _| match x {
            0 => 200,
            1 => 10_000,
            2 => 150,
            _ => 2500,
        });
        let img = image(&buf);
        // 42 valid samples (every column but x == 2); median is 2.5 m
        assert_eq!(sample_depth_window(&img, DepthPoint::new(3.0, 3.0), &DepthWindow::default()), Some(2.5));
    }

    #[test]
    fn window_clipped_at_image_edge() {
        let buf = DepthBuffer::uniform(4, 4, 1800);
        let img = image(&buf);
        // corner: only 4x4 = 16 of 49 pixels exist, still >= 12
        assert_eq!(sample_depth_window(&img, DepthPoint::new(0.0, 0.0), &DepthWindow::default()), Some(1.8));
        let tiny = DepthBuffer::uniform(3, 3, 1800);
        let img = image(&tiny);
        assert_eq!(sample_depth_window(&img, DepthPoint::new(0.0, 0.0), &DepthWindow::default()), None);
    }
}
