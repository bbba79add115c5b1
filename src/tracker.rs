//! Identity tracking for repeated detections.
//!
//! `IdentityTracker` maps noisy world positions onto stable integer ids by
//! nearest-neighbour distance. `SpeakerRegistry` keeps the last observation
//! per id and ages out targets that have not been seen recently.
//!
//! Matching is distance-only: two targets closer together than the merge
//! distance collapse into one identity.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::math::Vector3;
use crate::room::{to_local, AxisFrame};

pub const DEFAULT_MERGE_DISTANCE_M: f32 = 0.20;
pub const DEFAULT_PRUNE_TIMEOUT_SECS: f32 = 3.0;

const NANOS_PER_SEC: f64 = 1e9;

#[derive(Clone, Debug)]
pub struct IdentityTracker {
    positions: BTreeMap<u64, Vector3>,
    next_id: u64,
    merge_distance: f32,
}

impl Default for IdentityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MERGE_DISTANCE_M)
    }
}

impl IdentityTracker {
    pub fn new(merge_distance: f32) -> Self {
        Self {
            positions: BTreeMap::new(),
            next_id: 1,
            merge_distance,
        }
    }

    pub fn merge_distance(&self) -> f32 {
        self.merge_distance
    }

    /// Id of the nearest known target within the merge distance (its stored
    /// position is replaced by `position`), or a freshly allocated id.
    ///
    /// Equidistant candidates resolve to the lowest id.
    pub fn assign_id(&mut self, position: Vector3) -> u64 {
        let mut best: Option<(u64, f32)> = None;
        for (&id, &known) in &self.positions {
            let d = known.distance(position);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((id, d));
            }
        }

        if let Some((id, d)) = best {
            if d < self.merge_distance {
                self.positions.insert(id, position);
                return id;
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.positions.insert(id, position);
        log::info!("new target {} at ({:.2}, {:.2}, {:.2})", id, position.x, position.y, position.z);
        id
    }

    /// Drop ids so that later observations near them get new ids.
    pub fn forget(&mut self, ids: &[u64]) {
        for id in ids {
            self.positions.remove(id);
        }
    }

    pub fn position(&self, id: u64) -> Option<Vector3> {
        self.positions.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrackedPoint {
    pub id: u64,
    pub position: Vector3,
    pub last_seen_ns: u64,
}

/// Last observation of each tracked target, ordered by id.
#[derive(Clone, Debug, Default)]
pub struct SpeakerRegistry {
    points: BTreeMap<u64, TrackedPoint>,
}

impl SpeakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, id: u64, position: Vector3, timestamp_ns: u64) {
        self.points.insert(
            id,
            TrackedPoint {
                id,
                position,
                last_seen_ns: timestamp_ns,
            },
        );
    }

    /// Remove targets unseen for more than `timeout_secs` and return their ids.
    pub fn prune(&mut self, now_ns: u64, timeout_secs: f32) -> Vec<u64> {
        let timeout = f64::from(timeout_secs);
        let expired: Vec<u64> = self
            .points
            .values()
            .filter(|p| now_ns.saturating_sub(p.last_seen_ns) as f64 / NANOS_PER_SEC > timeout)
            .map(|p| p.id)
            .collect();
        for id in &expired {
            self.points.remove(id);
        }
        if !expired.is_empty() {
            log::info!("pruned {} stale target(s): {:?}", expired.len(), expired);
        }
        expired
    }

    pub fn get(&self, id: u64) -> Option<&TrackedPoint> {
        self.points.get(&id)
    }

    pub fn speakers(&self) -> impl Iterator<Item = &TrackedPoint> {
        self.points.values()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Tracked positions expressed in a room frame, `(id, [x, y, z])`.
    pub fn local_positions(&self, frame: &AxisFrame) -> Vec<(u64, [f32; 3])> {
        self.points
            .values()
            .map(|p| (p.id, to_local(frame, p.position)))
            .collect()
    }
}
