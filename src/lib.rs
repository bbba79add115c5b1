//! Room Scan Kernel
//!
//! This crate implements the geometry core of a handheld room-measurement
//! and speaker-localization tool. The AR platform (pose tracking, hit-tests,
//! depth images) sits behind the `frame::ArFrame` trait; everything here is
//! synchronous, owned state driven one frame at a time.
//!
//! # Data flow
//!
//! camera frame → detector → 2-D boxes → resolver → 3-D points → tracker →
//! tracked speaker set. Six picked 3-D points → room frame solver → room
//! geometry used to report speakers in room coordinates.
//!
//! # Module Structure
//!
//! - `math`: vectors, quaternions, rays, projection, coordinate spaces
//! - `detect`: model backends, preprocessing, output decoding and NMS
//! - `frame`: platform seam and scoped depth/camera image handles
//! - `depth` / `resolve`: display pixel to world point resolution
//! - `tracker`: stable ids for repeated detections
//! - `triangulation`: multi-view ray intersection
//! - `room`: six-point room frame, validation, labelled measurements
//! - `pipeline`: per-frame speaker localization loop
//! - `config`: pipeline settings from TOML and environment

pub mod config;
pub mod depth;
pub mod detect;
pub mod frame;
pub mod math;
pub mod pipeline;
pub mod resolve;
pub mod room;
pub mod tracker;
pub mod triangulation;

pub use config::PipelineConfig;
pub use detect::{decode, BoundingBox, Detector, InferenceBackend, RawTensor, StubBackend};
pub use frame::{ArFrame, CameraImage, DepthImage, SyntheticFrame};
pub use math::coords::{DisplayPoint, DisplayTransform, ImagePoint, ImageRotation};
pub use math::{CameraIntrinsics, Pose, Quaternion, Ray, Vector3};
pub use pipeline::{FrameReport, SpeakerPipeline};
pub use resolve::{resolve_world_point, Resolution, ResolutionSource, Resolver, SizeHint};
pub use room::{solve_room_frame, to_local, validate, AxisFrame, PickedPoints, RoomExtent, RoomValidation};
pub use tracker::{IdentityTracker, SpeakerRegistry, TrackedPoint};
pub use triangulation::Triangulator;
