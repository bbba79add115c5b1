//! Room frame solver.
//!
//! Six picked wall/floor/ceiling points define an orthonormal room frame
//! and its interior extent:
//!
//! - `vx` runs from the X- wall to the X+ wall.
//! - `vz` is the Z- to Z+ direction with its `vx` component removed.
//! - `vy = vx × vz`; it points up only if the Z walls were picked near to far.
//!
//! The origin is the mean of the three wall-pair midpoints.

pub mod labels;

use serde::{Deserialize, Serialize};

use crate::math::Vector3;

pub const MIN_WALL_LENGTH_M: f32 = 0.4;
/// Height floor is half the wall floor.
pub const MIN_HEIGHT_M: f32 = MIN_WALL_LENGTH_M * 0.5;
/// Axis pairs with |dot| at or above this are rejected.
pub const MAX_AXIS_DOT: f32 = 0.25;

// ----------------------------------------------------------------------------
// Picking flow
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickStep {
    XMin,
    XMax,
    ZMin,
    ZMax,
    YFloor,
    YCeil,
    Review,
    Done,
}

impl PickStep {
    pub const POINT_STEPS: [PickStep; 6] = [
        PickStep::XMin,
        PickStep::XMax,
        PickStep::ZMin,
        PickStep::ZMax,
        PickStep::YFloor,
        PickStep::YCeil,
    ];

    pub fn prompt(self) -> &'static str {
        match self {
            PickStep::XMin => "X- (tap the left wall)",
            PickStep::XMax => "X+ (tap the right wall)",
            PickStep::ZMin => "Z- (tap the near wall)",
            PickStep::ZMax => "Z+ (tap the far wall)",
            PickStep::YFloor => "Y- (tap the floor)",
            PickStep::YCeil => "Y+ (tap the ceiling)",
            PickStep::Review => "review",
            PickStep::Done => "done",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PickedPoints {
    pub x_min: Option<Vector3>,
    pub x_max: Option<Vector3>,
    pub z_min: Option<Vector3>,
    pub z_max: Option<Vector3>,
    pub y_floor: Option<Vector3>,
    pub y_ceil: Option<Vector3>,
}

impl PickedPoints {
    pub fn is_complete(&self) -> bool {
        PickStep::POINT_STEPS.iter().all(|&s| self.get(s).is_some())
    }

    /// First unpicked point, or `Review` once all six are set.
    pub fn next_step(&self) -> PickStep {
        PickStep::POINT_STEPS
            .iter()
            .copied()
            .find(|&s| self.get(s).is_none())
            .unwrap_or(PickStep::Review)
    }

    pub fn get(&self, step: PickStep) -> Option<Vector3> {
        match step {
            PickStep::XMin => self.x_min,
            PickStep::XMax => self.x_max,
            PickStep::ZMin => self.z_min,
            PickStep::ZMax => self.z_max,
            PickStep::YFloor => self.y_floor,
            PickStep::YCeil => self.y_ceil,
            PickStep::Review | PickStep::Done => None,
        }
    }

    /// Store `point` for a point step. Returns false for `Review` / `Done`.
    pub fn set(&mut self, step: PickStep, point: Vector3) -> bool {
        let slot = match step {
            PickStep::XMin => &mut self.x_min,
            PickStep::XMax => &mut self.x_max,
            PickStep::ZMin => &mut self.z_min,
            PickStep::ZMax => &mut self.z_max,
            PickStep::YFloor => &mut self.y_floor,
            PickStep::YCeil => &mut self.y_ceil,
            PickStep::Review | PickStep::Done => return false,
        };
        *slot = Some(point);
        true
    }
}

// ----------------------------------------------------------------------------
// Frame and extent
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisFrame {
    pub origin: Vector3,
    pub vx: Vector3,
    pub vy: Vector3,
    pub vz: Vector3,
}

/// Interior dimensions in meters: width along `vx`, depth along `vz`,
/// height along `vy`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomExtent {
    pub width: f32,
    pub depth: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measure3D {
    pub frame: AxisFrame,
    pub extent: RoomExtent,
}

/// Solve the room frame from six picked points; `None` while any is missing.
///
/// Degenerate picks (coincident points, parallel X and Z directions) still
/// return a frame; `validate` is what rejects them.
pub fn solve_room_frame(points: &PickedPoints) -> Option<(AxisFrame, RoomExtent)> {
    let x0 = points.x_min?;
    let x1 = points.x_max?;
    let z0 = points.z_min?;
    let z1 = points.z_max?;
    let y0 = points.y_floor?;
    let y1 = points.y_ceil?;

    let vx = (x1 - x0).normalize();
    let vz_raw = (z1 - z0).normalize();
    let vz = (vz_raw - vx * vz_raw.dot(vx)).normalize();
    let vy = vx.cross(vz).normalize();

    let extent = RoomExtent {
        width: (x1 - x0).dot(vx).abs(),
        depth: (z1 - z0).dot(vz).abs(),
        height: (y1 - y0).dot(vy).abs(),
    };

    let cx = x0.midpoint(x1);
    let cz = z0.midpoint(z1);
    let cy = y0.midpoint(y1);
    let origin = Vector3::new(
        (cx.x + cz.x + cy.x) / 3.0,
        (cx.y + cz.y + cy.y) / 3.0,
        (cx.z + cz.z + cy.z) / 3.0,
    );

    Some((AxisFrame { origin, vx, vy, vz }, extent))
}

/// Convenience wrapper pairing the solved frame and extent.
pub fn measure(points: &PickedPoints) -> Option<Measure3D> {
    solve_room_frame(points).map(|(frame, extent)| Measure3D { frame, extent })
}

// ----------------------------------------------------------------------------
// Validation
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    WidthTooShort,
    DepthTooShort,
    HeightTooShort,
    PoorOrthogonality,
}

impl RejectReason {
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::WidthTooShort => "width_too_short",
            RejectReason::DepthTooShort => "depth_too_short",
            RejectReason::HeightTooShort => "height_too_short",
            RejectReason::PoorOrthogonality => "poor_orthogonality",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RejectReason::WidthTooShort => "width (W) is too short",
            RejectReason::DepthTooShort => "depth (D) is too short",
            RejectReason::HeightTooShort => "height (H) is too short",
            RejectReason::PoorOrthogonality => "axes are not orthogonal enough; pick the points again",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RoomValidation {
    pub ok: bool,
    pub reason: Option<RejectReason>,
}

impl RoomValidation {
    pub fn ok() -> Self {
        Self { ok: true, reason: None }
    }

    pub fn fail(reason: RejectReason) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
        }
    }
}

/// Check a solved room. The first failing check wins, in the order width,
/// depth, height, orthogonality.
pub fn validate(frame: &AxisFrame, extent: &RoomExtent) -> RoomValidation {
    if extent.width < MIN_WALL_LENGTH_M {
        return RoomValidation::fail(RejectReason::WidthTooShort);
    }
    if extent.depth < MIN_WALL_LENGTH_M {
        return RoomValidation::fail(RejectReason::DepthTooShort);
    }
    if extent.height < MIN_HEIGHT_M {
        return RoomValidation::fail(RejectReason::HeightTooShort);
    }

    let orthogonal = [
        frame.vx.dot(frame.vz),
        frame.vx.dot(frame.vy),
        frame.vy.dot(frame.vz),
    ]
    .iter()
    .all(|d| d.abs() < MAX_AXIS_DOT);
    if !orthogonal {
        return RoomValidation::fail(RejectReason::PoorOrthogonality);
    }

    RoomValidation::ok()
}

/// World point to room coordinates `[along vx, along vy, along vz]`.
pub fn to_local(frame: &AxisFrame, p: Vector3) -> [f32; 3] {
    let d = p - frame.origin;
    [d.dot(frame.vx), d.dot(frame.vy), d.dot(frame.vz)]
}
