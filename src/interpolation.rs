use crate::clock::TfTime;
use crate::error::{TransformError, TransformResult};
use crate::transform::{Transform, TransformSample};

/// Interpolate between two stored samples at a specific time point.
///
/// Translation is linearly interpolated component-wise; rotation is
/// spherically interpolated along the shortest arc and re-normalized. The
/// resolved parent is taken from the earlier sample.
///
/// If the two samples were recorded against different parents, a blended
/// pose would mix two unrelated frames, so the interval boundary is a hard
/// cut: the nearer exact sample is returned instead.
pub fn interpolate_samples(
    before: &TransformSample,
    after: &TransformSample,
    time: TfTime,
) -> TransformResult<TransformSample> {
    if time < before.stamp || time > after.stamp {
        return Err(TransformError::InvalidArgument(format!(
            "time {time} is outside the sample interval [{} .. {}]",
            before.stamp, after.stamp
        )));
    }

    if before.parent != after.parent {
        let nearer = if time.abs_diff(before.stamp) <= time.abs_diff(after.stamp) {
            before
        } else {
            after
        };
        return Ok(*nearer);
    }

    if before.stamp == after.stamp {
        return Ok(*before);
    }

    let span = (after.stamp.as_nanos() - before.stamp.as_nanos()) as f64;
    let fraction = (time.as_nanos() - before.stamp.as_nanos()) as f64 / span;

    let translation = before
        .transform
        .translation
        .lerp(after.transform.translation, fraction);
    // glam's slerp negates the endpoint when the dot product is negative,
    // which avoids the quaternion double-cover discontinuity
    let rotation = before
        .transform
        .rotation
        .slerp(after.transform.rotation, fraction)
        .normalize();

    Ok(TransformSample {
        stamp: time,
        parent: before.parent,
        transform: Transform::new(translation, rotation),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TfDuration;
    use crate::registry::FrameId;
    use approx::assert_relative_eq;
    use glam::{DQuat, DVec3};

    fn sample(stamp_secs: u64, parent: FrameId, transform: Transform) -> TransformSample {
        TransformSample {
            stamp: TfDuration::from_secs(stamp_secs),
            parent,
            transform,
        }
    }

    #[test]
    fn test_translation_lerp() {
        let parent = FrameId(0);
        let before = sample(1, parent, Transform::from_translation(DVec3::ZERO));
        let after = sample(
            3,
            parent,
            Transform::from_translation(DVec3::new(10.0, -4.0, 2.0)),
        );

        let mid = interpolate_samples(&before, &after, TfDuration::from_secs(2)).unwrap();
        assert!(mid
            .transform
            .translation
            .abs_diff_eq(DVec3::new(5.0, -2.0, 1.0), 1e-12));

        let quarter =
            interpolate_samples(&before, &after, TfDuration::from_millis(1500)).unwrap();
        assert_relative_eq!(quarter.transform.translation.x, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_slerp_midpoint() {
        let parent = FrameId(0);
        let before = sample(0, parent, Transform::IDENTITY);
        let after = sample(
            2,
            parent,
            Transform::new(
                DVec3::ZERO,
                DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2),
            ),
        );

        let mid = interpolate_samples(&before, &after, TfDuration::from_secs(1)).unwrap();
        let expected = DQuat::from_rotation_z(std::f64::consts::FRAC_PI_4);
        assert!(mid.transform.rotation.abs_diff_eq(expected, 1e-12));
        assert_relative_eq!(mid.transform.rotation.length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_slerp_takes_shortest_arc() {
        let parent = FrameId(0);
        let q = DQuat::from_rotation_z(0.2);
        // -q represents the same rotation; slerp must not swing the long way
        let before = sample(0, parent, Transform::new(DVec3::ZERO, q));
        let after = sample(2, parent, Transform::new(DVec3::ZERO, -q));

        let mid = interpolate_samples(&before, &after, TfDuration::from_secs(1)).unwrap();
        let angle = mid.transform.rotation.angle_between(q);
        assert_relative_eq!(angle, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reparenting_snaps_to_nearer_sample() {
        let before = sample(0, FrameId(0), Transform::from_translation(DVec3::X));
        let after = sample(10, FrameId(1), Transform::from_translation(DVec3::Y));

        let near_before =
            interpolate_samples(&before, &after, TfDuration::from_secs(2)).unwrap();
        assert_eq!(near_before, before);

        let near_after = interpolate_samples(&before, &after, TfDuration::from_secs(9)).unwrap();
        assert_eq!(near_after, after);

        // equidistant ties toward the earlier sample
        let tie = interpolate_samples(&before, &after, TfDuration::from_secs(5)).unwrap();
        assert_eq!(tie, before);
    }

    #[test]
    fn test_time_outside_interval_rejected() {
        let parent = FrameId(0);
        let before = sample(2, parent, Transform::IDENTITY);
        let after = sample(4, parent, Transform::IDENTITY);

        assert!(interpolate_samples(&before, &after, TfDuration::from_secs(1)).is_err());
        assert!(interpolate_samples(&before, &after, TfDuration::from_secs(5)).is_err());
    }
}
