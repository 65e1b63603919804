//! # point_core
//!
//! Pure geometric algorithms behind point-cloud encoder-decoder networks.
//!
//! This crate holds everything the neural blocks need from the point sets
//! themselves, without any tensor engine: positions go in as plain slices,
//! indices and weights come out as plain vectors. The `point_unet` crate
//! turns those into index and weight tensors.
//!
//! ## Modules
//!
//! - [`types`]: [`Point3`] and conversions from flat coordinate buffers
//! - [`batch`]: Splitting a batch-index vector into per-cloud segments
//! - [`sampling`]: Farthest-point sampling
//! - [`neighbors`]: Radius neighborhoods and k-nearest neighbors
//! - [`interpolation`]: Inverse-squared-distance interpolation weights
//! - [`error`]: Error types
//!
//! ## Usage
//!
//! ```
//! use point_core::prelude::*;
//!
//! let pos = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//! ];
//! let batch = vec![0, 0, 0, 0];
//!
//! let idx = farthest_point_sampling(&pos, &batch, 0.5).unwrap();
//! assert_eq!(idx, vec![0, 3]);
//!
//! let sampled: Vec<Point3> = idx.iter().map(|&i| pos[i]).collect();
//! let sampled_batch: Vec<i64> = idx.iter().map(|&i| batch[i]).collect();
//! let hood = radius_neighbors(&pos, &batch, &sampled, &sampled_batch, 1.1, 64).unwrap();
//! assert_eq!(hood.neighbors(0), &[0, 1, 2]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod error;
pub mod interpolation;
pub mod neighbors;
pub mod sampling;
pub mod types;

pub use batch::{batch_segments, Segment};
pub use error::PointCoreError;
pub use interpolation::{knn_interpolation_weights, InterpolationWeights, MIN_SQUARED_DISTANCE};
pub use neighbors::{knn, radius_neighbors, Neighborhood};
pub use sampling::{farthest_point_sampling, sample_count};
pub use types::{points_from_flat, Point3};

/// Result type for point_core operations.
pub type Result<T> = core::result::Result<T, PointCoreError>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::batch::{batch_segments, Segment};
    pub use crate::error::PointCoreError;
    pub use crate::interpolation::{knn_interpolation_weights, InterpolationWeights};
    pub use crate::neighbors::{knn, radius_neighbors, Neighborhood};
    pub use crate::sampling::{farthest_point_sampling, sample_count};
    pub use crate::types::{points_from_flat, Point3};
}
