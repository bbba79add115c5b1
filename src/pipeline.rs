//! Per-frame speaker localization loop.
//!
//! One `process_frame` call per AR frame: decimate, grab the camera image,
//! detect, resolve each box center to a world point, then assign ids and
//! age out stale speakers. The pipeline owns all of its state; nothing is
//! shared between instances.

use anyhow::Result;
use serde::Serialize;

use crate::config::PipelineConfig;
#[cfg(feature = "backend-tract")]
use crate::detect::TractBackend;
use crate::detect::{labels, BoundingBox, Detector, InferenceBackend};
use crate::frame::ArFrame;
use crate::math::coords::normalized_to_image;
use crate::math::Vector3;
use crate::resolve::{ResolutionSource, Resolver, SizeHint};
use crate::tracker::{IdentityTracker, SpeakerRegistry, TrackedPoint};

/// Why a frame produced no detections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not a detection frame under the every-N cadence.
    Decimated,
    NoCameraImage,
    /// A previous inference is still running.
    DetectorBusy,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ResolvedSpeaker {
    pub id: u64,
    pub position: Vector3,
    pub source: ResolutionSource,
    /// Index into `FrameReport::detections`.
    pub detection: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub detections: Vec<BoundingBox>,
    pub resolved: Vec<ResolvedSpeaker>,
    pub pruned: Vec<u64>,
    pub skipped: Option<SkipReason>,
}

impl FrameReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }
}

pub struct SpeakerPipeline<B: InferenceBackend> {
    detector: Detector<B>,
    resolver: Resolver,
    tracker: IdentityTracker,
    registry: SpeakerRegistry,
    speaker_width_m: f32,
    prune_timeout_secs: f32,
    detect_every_n: u32,
    frame_tick: u64,
}

impl<B: InferenceBackend> SpeakerPipeline<B> {
    pub fn new(detector: Detector<B>, config: &PipelineConfig) -> Self {
        Self {
            detector,
            resolver: Resolver::new(config.depth),
            tracker: IdentityTracker::new(config.tracker.merge_distance_m),
            registry: SpeakerRegistry::new(),
            speaker_width_m: config.speaker_width_m(),
            prune_timeout_secs: config.tracker.prune_timeout_secs,
            detect_every_n: config.detect_every_n.max(1),
            frame_tick: 0,
        }
    }

    /// Build the detector from `backend` with the configured labels and
    /// thresholds.
    pub fn from_config(backend: B, config: &PipelineConfig) -> Result<Self> {
        let labels = labels::load_labels(config.detector.labels_path.as_deref())?;
        log::info!(
            "speaker pipeline: backend={} labels={} every_n={} width={:.1}cm",
            backend.name(),
            labels.len(),
            config.detect_every_n,
            config.speaker_width_cm
        );
        let detector = Detector::new(backend, labels).with_thresholds(config.detector.thresholds);
        Ok(Self::new(detector, config))
    }

    pub fn detector(&self) -> &Detector<B> {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut Detector<B> {
        &mut self.detector
    }

    pub fn registry(&self) -> &SpeakerRegistry {
        &self.registry
    }

    pub fn speakers(&self) -> impl Iterator<Item = &TrackedPoint> {
        self.registry.speakers()
    }

    /// Forget every tracked speaker. Ids keep counting up.
    pub fn reset(&mut self) {
        let ids: Vec<u64> = self.registry.speakers().map(|p| p.id).collect();
        self.tracker.forget(&ids);
        self.registry.clear();
    }

    pub fn process_frame<F: ArFrame + ?Sized>(&mut self, frame: &F) -> Result<FrameReport> {
        self.frame_tick += 1;
        if self.frame_tick % u64::from(self.detect_every_n) != 0 {
            return Ok(FrameReport::skipped(SkipReason::Decimated));
        }

        let (detections, image_dims) = {
            let Some(image) = frame.acquire_camera_image() else {
                log::debug!("frame {}: no camera image", self.frame_tick);
                return Ok(FrameReport::skipped(SkipReason::NoCameraImage));
            };
            let dims = (image.width, image.height);
            match self.detector.detect(image.pixels(), image.width, image.height)? {
                Some(boxes) => (boxes, dims),
                None => return Ok(FrameReport::skipped(SkipReason::DetectorBusy)),
            }
        };

        let now_ns = frame.timestamp_ns();
        let transform = frame.display_transform();
        let mut resolved = Vec::with_capacity(detections.len());
        for (index, bb) in detections.iter().enumerate() {
            let center = normalized_to_image(bb.center_x, bb.center_y, image_dims);
            let hint = SizeHint {
                known_width_m: self.speaker_width_m,
                box_width_px: bb.pixel_width(image_dims.0),
            };
            let Some(hit) = self
                .resolver
                .resolve_detailed(frame, transform.image_to_display(center), Some(hint))
            else {
                log::debug!("detection {} ({}) unresolved", index, bb.class_name);
                continue;
            };
            let id = self.tracker.assign_id(hit.point);
            self.registry.upsert(id, hit.point, now_ns);
            resolved.push(ResolvedSpeaker {
                id,
                position: hit.point,
                source: hit.source,
                detection: index,
            });
        }

        let pruned = self.registry.prune(now_ns, self.prune_timeout_secs);
        self.tracker.forget(&pruned);

        log::debug!(
            "frame {}: {} detections, {} resolved, {} pruned",
            self.frame_tick,
            detections.len(),
            resolved.len(),
            pruned.len()
        );
        Ok(FrameReport {
            detections,
            resolved,
            pruned,
            skipped: None,
        })
    }
}

#[cfg(feature = "backend-tract")]
impl SpeakerPipeline<TractBackend> {
    /// Load the configured ONNX model, warm it up and build the pipeline.
    pub fn with_tract(config: &PipelineConfig) -> Result<Self> {
        let backend = TractBackend::from_config(&config.detector)?;
        let mut pipeline = Self::from_config(backend, config)?;
        pipeline.detector_mut().warm_up()?;
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{RawTensor, StubBackend};
    use crate::frame::{DepthBuffer, SyntheticFrame};
    use crate::math::coords::{DisplayTransform, ImageRotation};
    use crate::math::{CameraIntrinsics, Pose, Quaternion};

    const W: u32 = 64;
    const H: u32 = 48;

    fn speaker_tensor() -> RawTensor {
        // one "speaker" box centred in the image, 25% of its width
        RawTensor::new(5, 1, vec![0.5, 0.5, 0.25, 0.3, 0.9]).expect("shape")
    }

    fn pipeline(every_n: u32) -> SpeakerPipeline<StubBackend> {
        let config = PipelineConfig {
            detect_every_n: every_n,
            ..PipelineConfig::default()
        };
        let detector = Detector::new(StubBackend::new(speaker_tensor(), 8), vec!["speaker".into()]);
        SpeakerPipeline::new(detector, &config)
    }

    fn frame(ts: u64) -> SyntheticFrame {
        SyntheticFrame::new(
            Pose::new(Vector3::new(0.0, 1.2, 0.0), Quaternion::IDENTITY),
            CameraIntrinsics {
                fx: 50.0,
                fy: 50.0,
                cx: 32.0,
                cy: 24.0,
                image_width: W,
                image_height: H,
            },
            DisplayTransform::new(W as f32, H as f32, W as f32, H as f32, ImageRotation::Deg0),
        )
        .with_timestamp(ts)
        .with_camera_image(vec![0u8; (W * H * 3) as usize], W, H)
    }

    #[test]
    fn every_n_decimation_skips_frames() -> Result<()> {
        let mut p = pipeline(2);
        let f = frame(0).with_depth(DepthBuffer::uniform(16, 12, 2000));
        assert_eq!(p.process_frame(&f)?.skipped, Some(SkipReason::Decimated));
        assert_eq!(f.camera_released(), 0);
        let report = p.process_frame(&f)?;
        assert_eq!(report.skipped, None);
        assert_eq!(report.resolved.len(), 1);
        assert_eq!(f.camera_released(), 1);
        Ok(())
    }

    #[test]
    fn depth_point_is_tracked() -> Result<()> {
        let mut p = pipeline(1);
        let f = frame(10).with_depth(DepthBuffer::uniform(16, 12, 2000));
        let report = p.process_frame(&f)?;
        let s = report.resolved[0];
        assert_eq!(s.source, ResolutionSource::Depth);
        assert!((s.position - Vector3::new(0.0, 1.2, -2.0)).length() < 1e-4);
        assert_eq!(p.registry().get(s.id).map(|t| t.last_seen_ns), Some(10));
        assert_eq!(f.depth_released(), f.depth_acquired());
        Ok(())
    }

    #[test]
    fn size_fallback_without_depth() -> Result<()> {
        let mut p = pipeline(1);
        let report = p.process_frame(&frame(0))?;
        let s = report.resolved[0];
        assert_eq!(s.source, ResolutionSource::SizeFallback);
        // 50 px * 0.18 m / 16 px
        let z = 50.0 * 0.18 / 16.0;
        assert!((s.position - Vector3::new(0.0, 1.2, -z)).length() < 1e-4);
        Ok(())
    }

    #[test]
    fn busy_detector_skips_frame() -> Result<()> {
        let mut p = pipeline(1);
        let gate = p.detector().gate();
        let _held = gate.try_acquire().expect("gate open");
        let f = frame(0);
        assert_eq!(p.process_frame(&f)?.skipped, Some(SkipReason::DetectorBusy));
        assert_eq!(f.camera_released(), 1);
        Ok(())
    }

    #[test]
    fn stale_speakers_are_pruned_and_renumbered() -> Result<()> {
        const SEC: u64 = 1_000_000_000;
        let mut p = pipeline(1);
        let first = p.process_frame(&frame(0))?.resolved[0].id;

        p.detector_mut().backend_mut().set_output(RawTensor::empty(5));
        let report = p.process_frame(&frame(4 * SEC))?;
        assert_eq!(report.pruned, vec![first]);
        assert!(p.registry().is_empty());

        p.detector_mut().backend_mut().set_output(speaker_tensor());
        let again = p.process_frame(&frame(5 * SEC))?.resolved[0].id;
        assert!(again > first);
        Ok(())
    }
}
