//! Farthest-point sampling.
//!
//! The sampler is deterministic: each cloud starts from its first point and
//! ties in the running maximum distance go to the lowest point index.

use crate::batch::{batch_segments, check_lengths};
use crate::error::PointCoreError;
use crate::types::Point3;

/// Number of points kept from a cloud of `n` points at `ratio`.
///
/// Rounds up and never drops a non-empty cloud entirely: the result is
/// `ceil(ratio * n)` clamped to `[1, n]`, or 0 for an empty cloud.
#[inline]
pub fn sample_count(n: usize, ratio: f64) -> usize {
    if n == 0 {
        return 0;
    }
    ((ratio * n as f64).ceil() as usize).clamp(1, n)
}

/// Select a spatially spread subset of each cloud.
///
/// # Arguments
/// * `pos` - Point positions, grouped by cloud
/// * `batch` - Non-decreasing cloud index per point
/// * `ratio` - Fraction of points kept per cloud, in (0, 1]
///
/// # Returns
/// Global indices of the selected points, grouped by cloud in batch order.
/// Within a cloud the indices are in selection order.
pub fn farthest_point_sampling(
    pos: &[Point3],
    batch: &[i64],
    ratio: f64,
) -> Result<Vec<usize>, PointCoreError> {
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(PointCoreError::InvalidRatio { ratio });
    }
    check_lengths(pos.len(), batch.len())?;

    let segments = batch_segments(batch)?;
    let total: usize = segments.iter().map(|s| sample_count(s.len(), ratio)).sum();
    let mut selected = Vec::with_capacity(total);

    for segment in &segments {
        let count = sample_count(segment.len(), ratio);
        fps_segment(&pos[segment.range.clone()], segment.range.start, count, &mut selected);
    }

    Ok(selected)
}

/// Greedy FPS over one cloud; pushes `offset`-shifted indices into `out`.
fn fps_segment(points: &[Point3], offset: usize, count: usize, out: &mut Vec<usize>) {
    if count == 0 {
        return;
    }

    let mut min_dist = vec![f32::INFINITY; points.len()];
    let mut current = 0usize;
    out.push(offset);

    for _ in 1..count {
        let anchor = points[current];
        let mut best = 0usize;
        let mut best_dist = -1.0f32;

        for (i, p) in points.iter().enumerate() {
            let d = p.distance_squared(anchor);
            if d < min_dist[i] {
                min_dist[i] = d;
            }
            if min_dist[i] > best_dist {
                best_dist = min_dist[i];
                best = i;
            }
        }

        current = best;
        out.push(offset + best);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Point3> {
        (0..n).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_sample_count_rounds_up() {
        assert_eq!(sample_count(10, 0.25), 3);
        assert_eq!(sample_count(8, 0.5), 4);
        assert_eq!(sample_count(3, 0.01), 1);
        assert_eq!(sample_count(5, 1.0), 5);
        assert_eq!(sample_count(0, 0.5), 0);
    }

    #[test]
    fn test_fps_line() {
        let pos = line(5);
        let batch = vec![0; 5];

        // Starts at 0, then the far end, then the middle.
        let idx = farthest_point_sampling(&pos, &batch, 0.6).unwrap();
        assert_eq!(idx, vec![0, 4, 2]);
    }

    #[test]
    fn test_fps_per_cloud() {
        let mut pos = line(4);
        pos.extend(line(6));
        let batch = vec![0, 0, 0, 0, 1, 1, 1, 1, 1, 1];

        let idx = farthest_point_sampling(&pos, &batch, 0.5).unwrap();
        // 2 from the first cloud, 3 from the second, never crossing clouds
        assert_eq!(idx, vec![0, 3, 4, 9, 6]);
    }

    #[test]
    fn test_fps_duplicate_points_tie_break() {
        let pos = vec![Point3::origin(); 4];
        let batch = vec![0; 4];

        let idx = farthest_point_sampling(&pos, &batch, 0.5).unwrap();
        assert_eq!(idx, vec![0, 0]);
    }

    #[test]
    fn test_fps_invalid_ratio() {
        let pos = line(3);
        let batch = vec![0; 3];

        assert_eq!(
            farthest_point_sampling(&pos, &batch, 0.0).unwrap_err(),
            PointCoreError::InvalidRatio { ratio: 0.0 }
        );
        assert!(farthest_point_sampling(&pos, &batch, 1.5).is_err());
        assert!(farthest_point_sampling(&pos, &batch, f64::NAN).is_err());
    }

    #[test]
    fn test_fps_length_mismatch() {
        let err = farthest_point_sampling(&line(3), &[0, 0], 0.5).unwrap_err();
        assert_eq!(err, PointCoreError::LengthMismatch { positions: 3, batch: 2 });
    }
}
