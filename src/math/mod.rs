//! Vector, pose and ray primitives.
//!
//! Everything in this module is pure and `Copy`. World space is the AR
//! session's right-handed frame (+Y up); camera space looks down -Z.

pub mod angles;
pub mod coords;

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

const NORMALIZE_EPSILON: f32 = 1e-6;

/// View-space depth beyond which a point counts as in front of the camera.
pub const NEAR_PLANE_Z: f32 = -0.1;

/// Clip-space `w` below this magnitude is treated as degenerate.
pub const MIN_CLIP_W: f32 = 1e-5;

// ----------------------------------------------------------------------------
// Vector3
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vector3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vector3) -> Vector3 {
        Vector3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction. Vectors shorter than 1e-6 are
    /// returned unchanged.
    pub fn normalize(self) -> Vector3 {
        let len = self.length();
        if len > NORMALIZE_EPSILON {
            Vector3::new(self.x / len, self.y / len, self.z / len)
        } else {
            self
        }
    }

    pub fn scale(self, s: f32) -> Vector3 {
        Vector3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn distance(self, other: Vector3) -> f32 {
        (self - other).length()
    }

    pub fn midpoint(self, other: Vector3) -> Vector3 {
        self + (other - self) * 0.5
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(v: [f32; 3]) -> Self {
        Vector3::new(v[0], v[1], v[2])
    }
}

impl Add for Vector3 {
    type Output = Vector3;
    fn add(self, o: Vector3) -> Vector3 {
        Vector3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, o: Vector3) -> Vector3 {
        Vector3::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<f32> for Vector3 {
    type Output = Vector3;
    fn mul(self, s: f32) -> Vector3 {
        self.scale(s)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;
    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

// ----------------------------------------------------------------------------
// Quaternion / Pose
// ----------------------------------------------------------------------------

/// Orientation quaternion in `(x, y, z, w)` order, as delivered by the AR session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle_rad` about `axis` (normalized internally).
    pub fn from_axis_angle(axis: Vector3, angle_rad: f32) -> Self {
        let a = axis.normalize();
        let (s, c) = (angle_rad * 0.5).sin_cos();
        Quaternion::new(a.x * s, a.y * s, a.z * s, c)
    }

    pub fn conjugate(self) -> Self {
        Quaternion::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Row-major 3x3 rotation matrix, right-handed convention.
    pub fn to_rotation_matrix(self) -> [[f32; 3]; 3] {
        let Quaternion { x, y, z, w } = self;
        let (xx, yy, zz) = (x + x, y + y, z + z);
        let (wx, wy, wz) = (w * xx, w * yy, w * zz);
        let (xx2, yy2, zz2) = (x * xx, y * yy, z * zz);
        let (xy2, xz2, yz2) = (x * yy, x * zz, y * zz);
        [
            [1.0 - (yy2 + zz2), xy2 - wz, xz2 + wy],
            [xy2 + wz, 1.0 - (xx2 + zz2), yz2 - wx],
            [xz2 - wy, yz2 + wx, 1.0 - (xx2 + yy2)],
        ]
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::IDENTITY
    }
}

pub fn rotate_by_quaternion(q: Quaternion, v: Vector3) -> Vector3 {
    let m = q.to_rotation_matrix();
    Vector3::new(
        m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
        m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
        m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
    )
}

/// Rigid transform from a local frame into world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Vector3,
    pub rotation: Quaternion,
}

impl Pose {
    pub fn new(translation: Vector3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn rotate(&self, v: Vector3) -> Vector3 {
        rotate_by_quaternion(self.rotation, v)
    }

    /// World position of a point given in this pose's local frame.
    pub fn transform_point(&self, local: Vector3) -> Vector3 {
        self.translation + self.rotate(local)
    }

    /// This pose moved by `offset` expressed in its own local axes.
    pub fn compose_translation(&self, offset: Vector3) -> Pose {
        Pose::new(self.transform_point(offset), self.rotation)
    }

    /// Column-major world-to-local matrix (the camera view matrix when this
    /// is a camera pose).
    pub fn view_matrix(&self) -> Mat4 {
        let r = self.rotation.to_rotation_matrix();
        let t = self.translation;
        // inverse rotation is the transpose
        let tx = -(r[0][0] * t.x + r[1][0] * t.y + r[2][0] * t.z);
        let ty = -(r[0][1] * t.x + r[1][1] * t.y + r[2][1] * t.z);
        let tz = -(r[0][2] * t.x + r[1][2] * t.y + r[2][2] * t.z);
        Mat4([
            r[0][0], r[0][1], r[0][2], 0.0, //
            r[1][0], r[1][1], r[1][2], 0.0, //
            r[2][0], r[2][1], r[2][2], 0.0, //
            tx, ty, tz, 1.0,
        ])
    }
}

// ----------------------------------------------------------------------------
// Mat4 (column-major, OpenGL layout)
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4(pub [f32; 16]);

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Standard OpenGL perspective projection.
    pub fn perspective(fov_y_rad: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (fov_y_rad * 0.5).tan();
        let range = near - far;
        Mat4([
            f / aspect,
            0.0,
            0.0,
            0.0,
            0.0,
            f,
            0.0,
            0.0,
            0.0,
            0.0,
            (far + near) / range,
            -1.0,
            0.0,
            0.0,
            2.0 * far * near / range,
            0.0,
        ])
    }

    pub fn mul_vec4(&self, v: [f32; 4]) -> [f32; 4] {
        let m = &self.0;
        let mut out = [0.0f32; 4];
        for (row, slot) in out.iter_mut().enumerate() {
            *slot = m[row] * v[0] + m[4 + row] * v[1] + m[8 + row] * v[2] + m[12 + row] * v[3];
        }
        out
    }
}

// ----------------------------------------------------------------------------
// Camera model
// ----------------------------------------------------------------------------

/// Pinhole intrinsics in camera-image pixels, valid for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    pub image_width: u32,
    pub image_height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vector3,
    /// Unit length.
    pub direction: Vector3,
}

impl Ray {
    pub fn at(&self, distance: f32) -> Vector3 {
        self.origin + self.direction * distance
    }
}

/// World-space ray through image pixel `(u, v)`.
pub fn ray_from_pixel(u: f32, v: f32, intrinsics: &CameraIntrinsics, camera_pose: &Pose) -> Ray {
    let dir_cam = Vector3::new(
        (u - intrinsics.cx) / intrinsics.fx,
        (v - intrinsics.cy) / intrinsics.fy,
        -1.0,
    )
    .normalize();
    Ray {
        origin: camera_pose.translation,
        direction: camera_pose.rotate(dir_cam).normalize(),
    }
}

/// Screen pixel of a world point; `None` behind the near plane or when the
/// clip-space `w` degenerates.
pub fn project_world_to_screen(
    point: Vector3,
    view: &Mat4,
    proj: &Mat4,
    view_w: f32,
    view_h: f32,
) -> Option<(f32, f32)> {
    let view_v = view.mul_vec4([point.x, point.y, point.z, 1.0]);
    if view_v[2] > NEAR_PLANE_Z {
        return None;
    }
    let clip = proj.mul_vec4(view_v);
    let w = clip[3];
    if w.abs() < MIN_CLIP_W {
        return None;
    }
    let ndc_x = clip[0] / w;
    let ndc_y = clip[1] / w;
    let sx = (ndc_x * 0.5 + 0.5) * view_w;
    let sy = (1.0 - (ndc_y * 0.5 + 0.5)) * view_h;
    Some((sx, sy))
}
