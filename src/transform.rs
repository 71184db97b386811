use crate::clock::{TfDuration, TfTime, TfTimeRange};
use crate::error::{TransformError, TransformResult};
use crate::interpolation::interpolate_samples;
use crate::registry::FrameId;
use crate::FrameIdString;
use dashmap::DashMap;
use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::Mul;
use std::sync::{Arc, RwLock};

/// A rigid 3D transform: rotation quaternion plus translation vector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
}

impl Transform {
    pub const IDENTITY: Self = Transform {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub const fn new(translation: DVec3, rotation: DQuat) -> Self {
        Transform {
            translation,
            rotation,
        }
    }

    pub const fn from_translation(translation: DVec3) -> Self {
        Transform {
            translation,
            rotation: DQuat::IDENTITY,
        }
    }

    /// Inverse transform: conjugate rotation, translation mapped back
    /// through it.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.conjugate();
        Transform {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Composition: `a * b` applies `b` first, then `a`.
impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            translation: self.rotation * rhs.translation + self.translation,
            // renormalized so drift does not accumulate over long chains
            rotation: (self.rotation * rhs.rotation).normalize(),
        }
    }
}

/// Relative pose of a child frame with respect to a parent frame at a given
/// time. This is the ingestion record handed to
/// [`crate::Transformer::set_transform`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StampedTransform {
    pub transform: Transform,
    pub stamp: TfTime,
    pub parent_frame: FrameIdString,
    pub child_frame: FrameIdString,
}

/// One stored history entry. The parent id lives inside the sample so
/// re-parenting over time needs no separate mutable state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformSample {
    pub stamp: TfTime,
    pub parent: FrameId,
    pub transform: Transform,
}

struct TransformBufferInner {
    frame_name: FrameIdString,
    samples: VecDeque<TransformSample>,
    retention: TfDuration,
    clamp_out_of_range: bool,
}

impl TransformBufferInner {
    fn insert(&mut self, sample: TransformSample) {
        let pos = self.samples.partition_point(|s| s.stamp < sample.stamp);
        if let Some(existing) = self.samples.get_mut(pos) {
            if existing.stamp == sample.stamp {
                *existing = sample;
                return;
            }
        }
        self.samples.insert(pos, sample);
        self.evict();
    }

    fn evict(&mut self) {
        // measured against the newest stamp only, so inserting an old
        // sample never drops newer ones
        let Some(newest) = self.samples.back().map(|s| s.stamp) else {
            return;
        };
        let cutoff = newest.saturating_sub(self.retention);
        while self.samples.front().is_some_and(|s| s.stamp < cutoff) {
            self.samples.pop_front();
        }
    }

    fn sample_at(&self, time: Option<TfTime>) -> TransformResult<TransformSample> {
        let Some(newest) = self.samples.back() else {
            return Err(TransformError::BufferEmpty(self.frame_name.to_string()));
        };
        let Some(time) = time else {
            return Ok(*newest);
        };

        if time > newest.stamp {
            if self.clamp_out_of_range {
                return Ok(*newest);
            }
            return Err(TransformError::ExtrapolationFuture {
                requested: time,
                latest: newest.stamp,
            });
        }

        let oldest = self.samples.front().unwrap();
        if time < oldest.stamp {
            if self.clamp_out_of_range {
                return Ok(*oldest);
            }
            return Err(TransformError::ExtrapolationPast {
                requested: time,
                earliest: oldest.stamp,
            });
        }

        // oldest.stamp <= time <= newest.stamp, so a bracketing pair exists
        let pos = self.samples.partition_point(|s| s.stamp <= time);
        let before = self.samples[pos - 1];
        if before.stamp == time {
            return Ok(before);
        }
        let after = self.samples[pos];
        interpolate_samples(&before, &after, time)
    }

    fn time_range(&self) -> Option<TfTimeRange> {
        if self.samples.is_empty() {
            return None;
        }
        Some(TfTimeRange {
            start: self.samples.front().unwrap().stamp,
            end: self.samples.back().unwrap().stamp,
        })
    }
}

/// Thread-safe, time-ordered history of one frame's pose relative to its
/// (possibly changing) parent. Cheap to clone; clones share the same
/// underlying buffer.
#[derive(Clone)]
pub struct TransformBuffer {
    inner: Arc<RwLock<TransformBufferInner>>,
}

impl TransformBuffer {
    pub fn new(frame_name: FrameIdString, retention: TfDuration, clamp_out_of_range: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TransformBufferInner {
                frame_name,
                samples: VecDeque::new(),
                retention,
                clamp_out_of_range,
            })),
        }
    }

    /// Insert one sample, keeping the buffer stamp-ordered. A duplicate
    /// stamp overwrites; entries older than the retention window relative to
    /// the newest stamp are evicted.
    pub fn insert(&self, sample: TransformSample) {
        self.inner.write().unwrap().insert(sample);
    }

    /// Resolve the pose at `time`. `None` means "newest sample". An exact
    /// stamp match is returned unchanged; a time between two samples is
    /// interpolated; a time outside the retained range fails with an
    /// extrapolation error (or clamps, if so configured).
    pub fn sample_at(&self, time: Option<TfTime>) -> TransformResult<TransformSample> {
        self.inner.read().unwrap().sample_at(time)
    }

    pub fn latest(&self) -> Option<TransformSample> {
        self.inner.read().unwrap().samples.back().copied()
    }

    pub fn newest_stamp(&self) -> Option<TfTime> {
        self.latest().map(|s| s.stamp)
    }

    pub fn time_range(&self) -> Option<TfTimeRange> {
        self.inner.read().unwrap().time_range()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Concurrent per-frame buffer set: one entry per child frame, each behind
/// its own lock so a write to frame X never blocks a read on frame Y.
pub struct BufferStore {
    buffers: DashMap<FrameId, TransformBuffer>,
    retention: TfDuration,
    clamp_out_of_range: bool,
}

impl BufferStore {
    pub fn new(retention: TfDuration, clamp_out_of_range: bool) -> Self {
        Self {
            buffers: DashMap::new(),
            retention,
            clamp_out_of_range,
        }
    }

    pub fn get_or_create(&self, frame: FrameId, name: FrameIdString) -> TransformBuffer {
        self.buffers
            .entry(frame)
            .or_insert_with(|| TransformBuffer::new(name, self.retention, self.clamp_out_of_range))
            .clone()
    }

    /// Buffer for `frame` if that frame has ever been a child. Frames only
    /// seen as parents have no buffer: they are roots.
    pub fn get(&self, frame: FrameId) -> Option<TransformBuffer> {
        self.buffers.get(&frame).map(|entry| entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_id;
    use approx::assert_relative_eq;

    fn sample(stamp_secs: u64, parent: FrameId, x: f64) -> TransformSample {
        TransformSample {
            stamp: TfTime::from_secs(stamp_secs),
            parent,
            transform: Transform::from_translation(DVec3::new(x, 0.0, 0.0)),
        }
    }

    fn buffer() -> TransformBuffer {
        TransformBuffer::new(frame_id!("robot"), TfDuration::from_secs(10), false)
    }

    #[test]
    fn test_insert_keeps_stamp_order() {
        let buf = buffer();
        let parent = FrameId(0);
        buf.insert(sample(5, parent, 5.0));
        buf.insert(sample(3, parent, 3.0));
        buf.insert(sample(7, parent, 7.0));

        let range = buf.time_range().unwrap();
        assert_eq!(range.start, TfTime::from_secs(3));
        assert_eq!(range.end, TfTime::from_secs(7));
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_duplicate_stamp_overwrites() {
        let buf = buffer();
        let parent = FrameId(0);
        buf.insert(sample(5, parent, 1.0));
        buf.insert(sample(5, parent, 2.0));

        assert_eq!(buf.len(), 1);
        let resolved = buf.sample_at(Some(TfTime::from_secs(5))).unwrap();
        assert_relative_eq!(resolved.transform.translation.x, 2.0);
    }

    #[test]
    fn test_retention_eviction() {
        let buf = buffer();
        let parent = FrameId(0);
        for t in [3, 5, 10, 11, 19, 20, 21] {
            buf.insert(sample(t, parent, t as f64));
        }

        // newest is 21s, retention 10s: everything before 11s is gone
        let range = buf.time_range().unwrap();
        assert_eq!(range.start, TfTime::from_secs(11));
        assert_eq!(range.end, TfTime::from_secs(21));

        let err = buf.sample_at(Some(TfTime::from_secs(5))).unwrap_err();
        assert!(matches!(err, TransformError::ExtrapolationPast { .. }));
    }

    #[test]
    fn test_old_insert_does_not_evict_newer() {
        let buf = buffer();
        let parent = FrameId(0);
        buf.insert(sample(100, parent, 1.0));
        buf.insert(sample(101, parent, 2.0));
        // stale producer delivering a sample far in the past
        buf.insert(sample(3, parent, 0.0));

        assert!(buf.sample_at(Some(TfTime::from_secs(101))).is_ok());
        assert_eq!(buf.newest_stamp(), Some(TfTime::from_secs(101)));
    }

    #[test]
    fn test_exact_stamp_returned_unchanged() {
        let buf = buffer();
        let parent = FrameId(0);
        buf.insert(sample(3, parent, 3.0));
        buf.insert(sample(5, parent, 5.0));

        let resolved = buf.sample_at(Some(TfTime::from_secs(3))).unwrap();
        assert_eq!(resolved, sample(3, parent, 3.0));
    }

    #[test]
    fn test_interpolated_between_samples() {
        let buf = buffer();
        let parent = FrameId(0);
        buf.insert(sample(2, parent, 2.0));
        buf.insert(sample(4, parent, 6.0));

        let resolved = buf.sample_at(Some(TfTime::from_secs(3))).unwrap();
        assert_relative_eq!(resolved.transform.translation.x, 4.0, epsilon = 1e-12);
        assert_eq!(resolved.parent, parent);
    }

    #[test]
    fn test_out_of_range_errors() {
        let buf = buffer();
        let parent = FrameId(0);
        buf.insert(sample(5, parent, 0.0));
        buf.insert(sample(8, parent, 0.0));

        let past = buf.sample_at(Some(TfTime::from_secs(4))).unwrap_err();
        assert!(matches!(
            past,
            TransformError::ExtrapolationPast {
                earliest,
                ..
            } if earliest == TfTime::from_secs(5)
        ));

        let future = buf.sample_at(Some(TfTime::from_secs(9))).unwrap_err();
        assert!(matches!(
            future,
            TransformError::ExtrapolationFuture {
                latest,
                ..
            } if latest == TfTime::from_secs(8)
        ));
    }

    #[test]
    fn test_empty_buffer_fails() {
        let buf = buffer();
        let err = buf.sample_at(Some(TfTime::from_secs(1))).unwrap_err();
        assert!(matches!(err, TransformError::BufferEmpty(name) if name == "robot"));
        assert!(buf.sample_at(None).is_err());
    }

    #[test]
    fn test_none_means_newest() {
        let buf = buffer();
        let parent = FrameId(0);
        buf.insert(sample(5, parent, 5.0));
        buf.insert(sample(9, parent, 9.0));

        let resolved = buf.sample_at(None).unwrap();
        assert_eq!(resolved.stamp, TfTime::from_secs(9));
    }

    #[test]
    fn test_clamp_mode_returns_nearest_endpoint() {
        let buf = TransformBuffer::new(frame_id!("robot"), TfDuration::from_secs(10), true);
        let parent = FrameId(0);
        buf.insert(sample(5, parent, 5.0));
        buf.insert(sample(8, parent, 8.0));

        let past = buf.sample_at(Some(TfTime::from_secs(1))).unwrap();
        assert_eq!(past.stamp, TfTime::from_secs(5));
        let future = buf.sample_at(Some(TfTime::from_secs(20))).unwrap();
        assert_eq!(future.stamp, TfTime::from_secs(8));
    }

    #[test]
    fn test_transform_inverse_round_trip() {
        let t = Transform::new(
            DVec3::new(1.0, -2.0, 0.5),
            DQuat::from_rotation_z(std::f64::consts::FRAC_PI_3),
        );
        let round_trip = t * t.inverse();
        assert!(round_trip
            .translation
            .abs_diff_eq(DVec3::ZERO, 1e-12));
        assert!(round_trip.rotation.abs_diff_eq(DQuat::IDENTITY, 1e-12));
    }

    #[test]
    fn test_transform_composition_rotates_translation() {
        // rotate 90° around z, then translate: the rhs translation lands on y
        let rot = Transform::new(DVec3::ZERO, DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2));
        let step = Transform::from_translation(DVec3::X);
        let composed = rot * step;
        assert!(composed
            .translation
            .abs_diff_eq(DVec3::Y, 1e-12));
    }

    #[test]
    fn test_store_independent_buffers() {
        let store = BufferStore::new(TfDuration::from_secs(10), false);
        let robot = store.get_or_create(FrameId(1), frame_id!("robot"));
        robot.insert(sample(1, FrameId(0), 1.0));

        assert!(store.get(FrameId(1)).is_some());
        assert!(store.get(FrameId(2)).is_none());

        // clones share state with the stored buffer
        assert_eq!(store.get(FrameId(1)).unwrap().len(), 1);
    }
}
