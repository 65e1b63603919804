//! Error types for point_core operations.
//!
//! Provides a simple error enum with no external dependencies.

use core::fmt;

/// Error types that can occur during point_core operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointCoreError {
    /// A flat coordinate buffer does not hold a whole number of 3D points.
    MalformedPositions {
        /// Length of the flat buffer.
        len: usize,
    },
    /// Positions and batch indices disagree on the number of points.
    LengthMismatch {
        /// Number of positions.
        positions: usize,
        /// Number of batch indices.
        batch: usize,
    },
    /// Batch indices decrease, so points are not grouped by cloud.
    UnsortedBatch {
        /// Position of the first out-of-order batch index.
        index: usize,
    },
    /// Sampling ratio outside (0, 1].
    InvalidRatio {
        /// The rejected ratio.
        ratio: f64,
    },
    /// Neighborhood radius that is not strictly positive.
    InvalidRadius {
        /// The rejected radius.
        radius: f32,
    },
    /// A neighbor count of zero was requested.
    InvalidNeighborCount,
    /// A query point belongs to a cloud with no source points.
    EmptyCloud {
        /// Batch index of the cloud.
        batch: i64,
    },
}

impl fmt::Display for PointCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointCoreError::MalformedPositions { len } => {
                write!(f, "flat position buffer of length {} is not a multiple of 3", len)
            }
            PointCoreError::LengthMismatch { positions, batch } => {
                write!(
                    f,
                    "{} positions but {} batch indices",
                    positions, batch
                )
            }
            PointCoreError::UnsortedBatch { index } => {
                write!(f, "batch indices decrease at point {}", index)
            }
            PointCoreError::InvalidRatio { ratio } => {
                write!(f, "sampling ratio {} is outside (0, 1]", ratio)
            }
            PointCoreError::InvalidRadius { radius } => {
                write!(f, "radius {} must be positive", radius)
            }
            PointCoreError::InvalidNeighborCount => {
                write!(f, "neighbor count must be at least 1")
            }
            PointCoreError::EmptyCloud { batch } => {
                write!(f, "cloud {} has no source points", batch)
            }
        }
    }
}

impl std::error::Error for PointCoreError {}
