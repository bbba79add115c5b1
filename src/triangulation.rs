//! Least-squares intersection of viewing rays from several camera positions.
//!
//! Rays are accumulated as the device moves; once the first and last rays
//! are far enough apart in position and angle, the point minimising the sum
//! of squared distances to all rays is solved from the 3x3 normal equations.
//! The best-conditioned solution seen so far is cached.

use crate::math::{Ray, Vector3};

pub const DEFAULT_MAX_RAYS: usize = 30;
pub const DEFAULT_MIN_BASELINE_M: f32 = 0.08;
pub const DEFAULT_MIN_ANGLE_DEG: f32 = 3.0;

/// Determinants below this magnitude mean near-parallel rays.
const MIN_DETERMINANT: f32 = 1e-6;

#[derive(Clone, Debug)]
pub struct Triangulator {
    max_rays: usize,
    min_baseline_m: f32,
    min_angle_deg: f32,
    origins: Vec<Vector3>,
    directions: Vec<Vector3>,
    best: Option<Vector3>,
    best_score: f32,
}

impl Default for Triangulator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RAYS, DEFAULT_MIN_BASELINE_M, DEFAULT_MIN_ANGLE_DEG)
    }
}

impl Triangulator {
    pub fn new(max_rays: usize, min_baseline_m: f32, min_angle_deg: f32) -> Self {
        Self {
            max_rays,
            min_baseline_m,
            min_angle_deg,
            origins: Vec::with_capacity(max_rays),
            directions: Vec::with_capacity(max_rays),
            best: None,
            best_score: f32::INFINITY,
        }
    }

    /// Record a ray; ignored once `max_rays` are held.
    pub fn add_ray(&mut self, origin: Vector3, direction: Vector3) {
        if self.origins.len() >= self.max_rays {
            return;
        }
        self.origins.push(origin);
        self.directions.push(direction.normalize());
    }

    pub fn add(&mut self, ray: Ray) {
        self.add_ray(ray.origin, ray.direction);
    }

    /// Solve with the rays held so far and return the best point seen.
    ///
    /// Returns `None` until the first and last rays clear the baseline and
    /// angle gates and the system is well determined.
    pub fn solve_if_ready(&mut self) -> Option<Vector3> {
        if self.origins.len() < 2 || !self.gate_open() {
            return None;
        }
        let point = self.solve_least_squares()?;
        let score = self.conditioning();
        if score < self.best_score {
            self.best_score = score;
            self.best = Some(point);
            log::debug!(
                "triangulated ({:.3}, {:.3}, {:.3}) from {} rays, score {:.4}",
                point.x,
                point.y,
                point.z,
                self.origins.len(),
                score
            );
        }
        self.best
    }

    pub fn best(&self) -> Option<Vector3> {
        self.best
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Only the first and last rays are compared.
    fn gate_open(&self) -> bool {
        let (Some(&o0), Some(&o1)) = (self.origins.first(), self.origins.last()) else {
            return false;
        };
        let (Some(&d0), Some(&d1)) = (self.directions.first(), self.directions.last()) else {
            return false;
        };
        let baseline = (o1 - o0).length();
        let angle = cos_between(d0, d1).acos().to_degrees();
        baseline >= self.min_baseline_m && angle >= self.min_angle_deg
    }

    /// Smallest pairwise |cos| between ray directions. Lower is better.
    fn conditioning(&self) -> f32 {
        let mut min_cos = 1.0f32;
        for (i, &a) in self.directions.iter().enumerate() {
            for &b in &self.directions[i + 1..] {
                min_cos = min_cos.min(cos_between(a, b).abs());
            }
        }
        min_cos
    }

    /// Solve `Σ(I - d dᵀ) p = Σ(I - d dᵀ) o` by Cramer's rule.
    fn solve_least_squares(&self) -> Option<Vector3> {
        let (mut a00, mut a01, mut a02) = (0.0f32, 0.0f32, 0.0f32);
        let (mut a11, mut a12, mut a22) = (0.0f32, 0.0f32, 0.0f32);
        let (mut bx, mut by, mut bz) = (0.0f32, 0.0f32, 0.0f32);

        for (d, o) in self.directions.iter().zip(&self.origins) {
            let i00 = 1.0 - d.x * d.x;
            let i01 = -d.x * d.y;
            let i02 = -d.x * d.z;
            let i11 = 1.0 - d.y * d.y;
            let i12 = -d.y * d.z;
            let i22 = 1.0 - d.z * d.z;

            a00 += i00;
            a01 += i01;
            a02 += i02;
            a11 += i11;
            a12 += i12;
            a22 += i22;

            bx += i00 * o.x + i01 * o.y + i02 * o.z;
            by += i01 * o.x + i11 * o.y + i12 * o.z;
            bz += i02 * o.x + i12 * o.y + i22 * o.z;
        }

        let c00 = a11 * a22 - a12 * a12;
        let c01 = -(a01 * a22 - a12 * a02);
        let c02 = a01 * a12 - a11 * a02;
        let det = a00 * c00 + a01 * c01 + a02 * c02;
        if det.abs() < MIN_DETERMINANT {
            return None;
        }

        // symmetric adjugate
        let c11 = a00 * a22 - a02 * a02;
        let c12 = -(a00 * a12 - a01 * a02);
        let c22 = a00 * a11 - a01 * a01;

        Some(Vector3::new(
            (c00 * bx + c01 * by + c02 * bz) / det,
            (c01 * bx + c11 * by + c12 * bz) / det,
            (c02 * bx + c12 * by + c22 * bz) / det,
        ))
    }
}

fn cos_between(a: Vector3, b: Vector3) -> f32 {
    (a.dot(b) / (a.length() * b.length())).clamp(-1.0, 1.0)
}
