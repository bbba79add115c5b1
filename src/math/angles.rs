//! Heading helpers for guided capture sweeps.

use super::Quaternion;

/// Yaw of an orientation in degrees, wrapped to `[0, 360)`.
pub fn yaw_deg(q: Quaternion) -> f32 {
    let siny_cosp = 2.0 * (q.w * q.y + q.x * q.z);
    let cosy_cosp = 1.0 - 2.0 * (q.y * q.y + q.z * q.z);
    let yaw = siny_cosp.atan2(cosy_cosp).to_degrees();
    if yaw < 0.0 {
        yaw + 360.0
    } else {
        yaw
    }
}

/// Signed shortest difference `b - a` in degrees, in `[-180, 180)`.
pub fn diff_deg(a: f32, b: f32) -> f32 {
    ((b - a + 540.0) % 360.0) - 180.0
}
