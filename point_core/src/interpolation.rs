//! Inverse-squared-distance interpolation weights.
//!
//! Used to carry features from a coarse point set back onto a finer one:
//! every fine point takes a weighted average of its `k` nearest coarse
//! points, with weight `1 / max(d², MIN_SQUARED_DISTANCE)` normalized to 1.

use crate::error::PointCoreError;
use crate::neighbors::knn;
use crate::types::Point3;

/// Lower clamp on squared distances, so coincident points get a finite weight.
pub const MIN_SQUARED_DISTANCE: f32 = 1e-16;

/// Fixed-width gather plan for interpolation.
///
/// Row `t` of the `[num_targets, k]` layout holds the coarse indices and
/// weights for target `t`. Rows whose cloud has fewer than `k` coarse points
/// are padded with their first index and a zero weight.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationWeights {
    /// Slots per target.
    pub k: usize,
    /// Coarse point indices, row-major `[num_targets, k]`.
    pub indices: Vec<usize>,
    /// Normalized weights, row-major `[num_targets, k]`.
    pub weights: Vec<f32>,
}

impl InterpolationWeights {
    /// Number of target points.
    #[inline]
    pub fn num_targets(&self) -> usize {
        if self.k == 0 {
            0
        } else {
            self.indices.len() / self.k
        }
    }
}

/// Compute interpolation weights from `coarse` onto `fine`.
///
/// # Arguments
/// * `coarse` / `coarse_batch` - Points carrying the features
/// * `fine` / `fine_batch` - Points receiving interpolated features
/// * `k` - Number of nearest coarse points blended per fine point
pub fn knn_interpolation_weights(
    coarse: &[Point3],
    coarse_batch: &[i64],
    fine: &[Point3],
    fine_batch: &[i64],
    k: usize,
) -> Result<InterpolationWeights, PointCoreError> {
    let nearest = knn(coarse, coarse_batch, fine, fine_batch, k)?;

    let mut indices = Vec::with_capacity(fine.len() * k);
    let mut weights = Vec::with_capacity(fine.len() * k);

    for row in nearest {
        let raw: Vec<f32> = row
            .iter()
            .map(|&(_, d)| 1.0 / d.max(MIN_SQUARED_DISTANCE))
            .collect();
        let total: f32 = raw.iter().sum();

        for (&(i, _), w) in row.iter().zip(&raw) {
            indices.push(i);
            weights.push(w / total);
        }

        // knn never returns an empty row, so row[0] exists
        let pad = row[0].0;
        for _ in row.len()..k {
            indices.push(pad);
            weights.push(0.0);
        }
    }

    Ok(InterpolationWeights {
        k,
        indices,
        weights,
    })
}
