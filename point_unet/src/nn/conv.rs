//! Downsampling convolutions.
//!
//! [`BaseConvolution`] is the scaffold shared by every downsampling block:
//! farthest-point sampling picks the centers, a radius query links each
//! center to its neighbors, and a pluggable [`PointConvolution`] turns that
//! message graph into new features. [`SAModule`] is the PointNet++
//! set-abstraction block built on it.

use burn::module::{Ignored, Module};
use burn::prelude::*;

use point_core::{farthest_point_sampling, radius_neighbors, Neighborhood, Point3};

use crate::config::{DownConvArgs, DEFAULT_MAX_NUM_NEIGHBORS};
use crate::data::{host_batch, host_positions, index_tensor, PointCloudBatch};
use crate::error::{Result, UnetError};
use crate::nn::mlp::{Mlp, MlpConfig};

/// Position channels appended to point features before the local MLP.
const POS_DIM: usize = 3;

/// Centers chosen by sampling and the neighbors gathered around them.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledNeighborhood {
    /// Global indices of the sampled centers.
    pub idx: Vec<usize>,
    /// Edges `neighbor -> center`, one row per center.
    pub neighborhood: Neighborhood,
}

/// The point-to-point message operator run over a sampled neighborhood.
pub trait PointConvolution<B: Backend> {
    /// Compute one feature row per center.
    ///
    /// # Arguments
    /// * `x` - Features of the source points, [N, C]
    /// * `pos` - `(source positions [N, 3], center positions [M, 3])`
    /// * `neighborhood` - Source indices per center
    ///
    /// # Returns
    /// Center features: [M, C_out]
    fn conv(
        &self,
        x: Option<Tensor<B, 2>>,
        pos: (Tensor<B, 2>, Tensor<B, 2>),
        neighborhood: &Neighborhood,
    ) -> Result<Tensor<B, 2>>;
}

/// Sampling and neighborhood scaffold of a downsampling block.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseConvolution {
    /// Fraction of points kept per cloud.
    pub ratio: f64,
    /// Neighborhood radius.
    pub radius: f32,
    /// Cap on neighbors per center.
    pub max_num_neighbors: usize,
}

impl BaseConvolution {
    /// Create a scaffold with the default neighbor cap.
    pub fn new(ratio: f64, radius: f32) -> Self {
        Self {
            ratio,
            radius,
            max_num_neighbors: DEFAULT_MAX_NUM_NEIGHBORS,
        }
    }

    /// Set the neighbor cap.
    pub fn with_max_num_neighbors(mut self, max_num_neighbors: usize) -> Self {
        self.max_num_neighbors = max_num_neighbors;
        self
    }

    /// Sample centers and gather their neighborhoods on the host.
    pub fn sample(&self, pos: &[Point3], batch: &[i64]) -> Result<SampledNeighborhood> {
        let idx = farthest_point_sampling(pos, batch, self.ratio)?;
        let centers: Vec<Point3> = idx.iter().map(|&i| pos[i]).collect();
        let center_batch: Vec<i64> = idx.iter().map(|&i| batch[i]).collect();

        let neighborhood = radius_neighbors(
            pos,
            batch,
            &centers,
            &center_batch,
            self.radius,
            self.max_num_neighbors,
        )?;

        Ok(SampledNeighborhood { idx, neighborhood })
    }

    /// Downsample `data` and convolve it with `op`.
    ///
    /// Returns the convolved features at the sampled positions, with the
    /// sampled batch indices.
    pub fn forward<B: Backend, C: PointConvolution<B>>(
        &self,
        op: &C,
        data: PointCloudBatch<B>,
    ) -> Result<PointCloudBatch<B>> {
        data.validate()?;
        let PointCloudBatch { x, pos, batch } = data;

        let sampled = self.sample(&host_positions(&pos)?, &host_batch(&batch)?)?;

        let idx = index_tensor::<B>(&sampled.idx, &pos.device());
        let pos_sampled = pos.clone().select(0, idx.clone());
        let batch_sampled = batch.select(0, idx);

        let x = op.conv(x, (pos, pos_sampled.clone()), &sampled.neighborhood)?;
        Ok(PointCloudBatch::new(Some(x), pos_sampled, batch_sampled))
    }
}

/// PointNet++ set-abstraction block.
///
/// Each center aggregates `mlp(cat[x_j, pos_j - pos_i])` over its neighbors
/// `j` with a channel-wise max.
#[derive(Module, Debug)]
pub struct SAModule<B: Backend> {
    /// Local MLP over neighbor features and relative positions.
    local_nn: Mlp<B>,
    scaffold: Ignored<BaseConvolution>,
    index: usize,
}

impl<B: Backend> SAModule<B> {
    /// Create a set-abstraction block from level arguments.
    pub fn new(args: &DownConvArgs, device: &B::Device) -> Result<Self> {
        let mut channels = args.down_conv_nn.clone();
        match channels.first_mut() {
            Some(input) => *input += POS_DIM,
            None => return Err(UnetError::config("down_conv_nn must not be empty")),
        }

        Ok(Self {
            local_nn: MlpConfig::new(channels).init(device),
            scaffold: Ignored(
                BaseConvolution::new(args.ratio, args.radius)
                    .with_max_num_neighbors(args.max_num_neighbors),
            ),
            index: args.index,
        })
    }

    /// Downsample and convolve.
    pub fn forward(&self, data: PointCloudBatch<B>) -> Result<PointCloudBatch<B>> {
        self.scaffold.0.forward(self, data)
    }

    /// The sampling scaffold.
    pub fn scaffold(&self) -> &BaseConvolution {
        &self.scaffold.0
    }

    /// Encoder level of this block.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Output feature width.
    pub fn output_dim(&self) -> usize {
        self.local_nn.output_dim()
    }
}

impl<B: Backend> PointConvolution<B> for SAModule<B> {
    fn conv(
        &self,
        x: Option<Tensor<B, 2>>,
        pos: (Tensor<B, 2>, Tensor<B, 2>),
        neighborhood: &Neighborhood,
    ) -> Result<Tensor<B, 2>> {
        let (pos_source, pos_center) = pos;
        let device = pos_source.device();

        let feature_dim = x.as_ref().map_or(0, |x| x.dims()[1]);
        let expected = self.local_nn.input_dim();
        if feature_dim + POS_DIM != expected {
            return Err(UnetError::ShapeMismatch {
                context: "set abstraction input",
                expected: vec![expected.saturating_sub(POS_DIM)],
                got: vec![feature_dim],
            });
        }

        let (sources, centers, k) = padded_neighbors(neighborhood)?;
        let m = neighborhood.num_queries();
        let sources = index_tensor::<B>(&sources, &device);
        let centers = index_tensor::<B>(&centers, &device);

        let rel = pos_source.select(0, sources.clone()) - pos_center.select(0, centers);
        let messages = match x {
            Some(x) => Tensor::cat(vec![x.select(0, sources), rel], 1),
            None => rel,
        };

        let out = self.local_nn.forward(messages);
        let c = out.dims()[1];
        let pooled: Tensor<B, 3> = out.reshape([m, k, c]).max_dim(1);
        Ok(pooled.reshape([m, c]))
    }
}

/// Lay neighbor lists out as a dense `[M, K]` gather plan.
///
/// Short rows repeat their nearest neighbor, which leaves a max unchanged.
/// Returns `(source indices, center indices, K)`, both row-major.
fn padded_neighbors(neighborhood: &Neighborhood) -> Result<(Vec<usize>, Vec<usize>, usize)> {
    let k = neighborhood.max_degree();
    let m = neighborhood.num_queries();
    let mut sources = Vec::with_capacity(m * k);
    let mut centers = Vec::with_capacity(m * k);

    for q in 0..m {
        let row = neighborhood.neighbors(q);
        let first = *row
            .first()
            .ok_or_else(|| UnetError::input(format!("sampled point {} has no neighbors", q)))?;
        sources.extend_from_slice(row);
        sources.extend(std::iter::repeat(first).take(k - row.len()));
        centers.extend(std::iter::repeat(q).take(k));
    }

    Ok((sources, centers, k))
}
