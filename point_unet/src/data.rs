//! Point cloud batches flowing through the network.

use burn::prelude::*;
use burn::tensor::DataError;

use point_core::{points_from_flat, Point3};

use crate::error::{Result, UnetError};

/// A mini-batch of point clouds stored back to back.
///
/// Every tensor shares the leading dimension `N`. Batch indices are
/// non-decreasing, so each cloud occupies a contiguous run of rows.
#[derive(Debug, Clone)]
pub struct PointCloudBatch<B: Backend> {
    /// Point features: [N, C], absent when the cloud has no features.
    pub x: Option<Tensor<B, 2>>,
    /// Point positions: [N, 3]
    pub pos: Tensor<B, 2>,
    /// Cloud index per point: [N]
    pub batch: Tensor<B, 1, Int>,
}

impl<B: Backend> PointCloudBatch<B> {
    /// Create a new batch.
    pub fn new(x: Option<Tensor<B, 2>>, pos: Tensor<B, 2>, batch: Tensor<B, 1, Int>) -> Self {
        Self { x, pos, batch }
    }

    /// Create a single-cloud batch from host positions and optional features.
    ///
    /// `features` is row-major `[points.len(), feature_dim]`.
    pub fn from_points(
        points: &[Point3],
        features: Option<(&[f32], usize)>,
        device: &B::Device,
    ) -> Result<Self> {
        let n = points.len();
        let x = match features {
            Some((data, dim)) if data.len() != n * dim => {
                return Err(UnetError::ShapeMismatch {
                    context: "features",
                    expected: vec![n * dim],
                    got: vec![data.len()],
                });
            }
            Some((data, dim)) => Some(Tensor::from_data(
                TensorData::new(data.to_vec(), [n, dim]),
                device,
            )),
            None => None,
        };
        let flat: Vec<f32> = points.iter().flat_map(|p| p.as_array()).collect();
        let pos = Tensor::from_data(TensorData::new(flat, [n, 3]), device);
        let batch = Tensor::<B, 1, Int>::zeros([n], device);

        Ok(Self { x, pos, batch })
    }

    /// Number of points.
    pub fn num_points(&self) -> usize {
        self.pos.dims()[0]
    }

    /// Feature width, 0 when there are no features.
    pub fn feature_dim(&self) -> usize {
        self.x.as_ref().map_or(0, |x| x.dims()[1])
    }

    /// Device of this batch.
    pub fn device(&self) -> B::Device {
        self.pos.device()
    }

    /// Check that the batch is non-empty and the tensors agree on the
    /// number of points.
    pub fn validate(&self) -> Result<()> {
        let [n, d] = self.pos.dims();
        if n == 0 {
            return Err(UnetError::input("empty point cloud batch"));
        }
        if d != 3 {
            return Err(UnetError::ShapeMismatch {
                context: "positions",
                expected: vec![n, 3],
                got: vec![n, d],
            });
        }

        let [nb] = self.batch.dims();
        if nb != n {
            return Err(UnetError::ShapeMismatch {
                context: "batch indices",
                expected: vec![n],
                got: vec![nb],
            });
        }

        if let Some(x) = &self.x {
            let [nx, c] = x.dims();
            if nx != n {
                return Err(UnetError::ShapeMismatch {
                    context: "features",
                    expected: vec![n, c],
                    got: vec![nx, c],
                });
            }
        }

        Ok(())
    }

    /// Read positions back to the host.
    pub fn host_positions(&self) -> Result<Vec<Point3>> {
        host_positions(&self.pos)
    }

    /// Read batch indices back to the host.
    pub fn host_batch(&self) -> Result<Vec<i64>> {
        host_batch(&self.batch)
    }
}

/// Input of an up module: the processed coarse level followed by the
/// original finer level it skips back to.
///
/// Field order is the positional contract
/// `(x, pos, batch, x_skip, pos_skip, batch_skip)`.
#[derive(Debug, Clone)]
pub struct UpInput<B: Backend> {
    /// Output of the deeper levels.
    pub coarse: PointCloudBatch<B>,
    /// Input of the current level, before downsampling.
    pub skip: PointCloudBatch<B>,
}

impl<B: Backend> UpInput<B> {
    /// Pair a processed level with the level it skips back to.
    pub fn new(coarse: PointCloudBatch<B>, skip: PointCloudBatch<B>) -> Self {
        Self { coarse, skip }
    }
}

/// A batch together with per-point ground-truth labels.
#[derive(Debug, Clone)]
pub struct LabeledBatch<B: Backend> {
    /// The point clouds.
    pub data: PointCloudBatch<B>,
    /// Class label per point: [N]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> LabeledBatch<B> {
    /// Create a labeled batch.
    pub fn new(data: PointCloudBatch<B>, labels: Tensor<B, 1, Int>) -> Self {
        Self { data, labels }
    }
}

fn data_error(err: DataError) -> UnetError {
    UnetError::TensorData(format!("{:?}", err))
}

pub(crate) fn host_positions<B: Backend>(pos: &Tensor<B, 2>) -> Result<Vec<Point3>> {
    let flat = pos
        .to_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(data_error)?;
    Ok(points_from_flat(&flat)?)
}

pub(crate) fn host_batch<B: Backend>(batch: &Tensor<B, 1, Int>) -> Result<Vec<i64>> {
    batch
        .to_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(data_error)
}

pub(crate) fn host_scalar<B: Backend>(value: &Tensor<B, 1>) -> Result<f32> {
    let values = value
        .to_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(data_error)?;
    values
        .first()
        .copied()
        .ok_or_else(|| UnetError::TensorData("empty scalar tensor".to_string()))
}

/// Upload host indices as an integer tensor.
pub(crate) fn index_tensor<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let data: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
    let n = data.len();
    Tensor::from_data(TensorData::new(data, [n]), device)
}
