//! Global pooling block at the bottom of the U.

use burn::module::{Ignored, Module};
use burn::prelude::*;

use point_core::batch_segments;

use crate::config::{Aggregation, InnermostArgs};
use crate::data::{host_batch, PointCloudBatch};
use crate::error::{Result, UnetError};
use crate::nn::mlp::{Mlp, MlpConfig};

const POS_DIM: usize = 3;

/// Collapses every cloud to a single point.
///
/// Runs an MLP over `cat[x, pos]` and pools each cloud with max or mean.
/// The pooled point sits at the origin and keeps its cloud's batch index.
#[derive(Module, Debug)]
pub struct GlobalBaseModule<B: Backend> {
    nn: Mlp<B>,
    aggr: Ignored<Aggregation>,
}

impl<B: Backend> GlobalBaseModule<B> {
    /// Create a global block; `args.nn[0]` is the feature width.
    pub fn new(args: &InnermostArgs, device: &B::Device) -> Result<Self> {
        let mut channels = args.nn.clone();
        match channels.first_mut() {
            Some(input) => *input += POS_DIM,
            None => return Err(UnetError::config("innermost nn must not be empty")),
        }

        Ok(Self {
            nn: MlpConfig::new(channels).init(device),
            aggr: Ignored(args.aggr),
        })
    }

    /// Pooling mode.
    pub fn aggregation(&self) -> Aggregation {
        self.aggr.0
    }

    /// Output feature width.
    pub fn output_dim(&self) -> usize {
        self.nn.output_dim()
    }

    /// Forward pass.
    ///
    /// Output: `x` [S, C_out], `pos` zeros [S, 3], `batch` `0..S`, where
    /// `S = max(batch) + 1`. Row `b` pools cloud `b`; clouds absent from the
    /// input pool to zeros.
    pub fn forward(&self, data: PointCloudBatch<B>) -> Result<PointCloudBatch<B>> {
        data.validate()?;
        let PointCloudBatch { x, pos, batch } = data;
        let device = pos.device();

        let input = match x {
            Some(x) => Tensor::cat(vec![x, pos], 1),
            None => pos,
        };
        let width = input.dims()[1];
        if width != self.nn.input_dim() {
            return Err(UnetError::ShapeMismatch {
                context: "global block input",
                expected: vec![self.nn.input_dim().saturating_sub(POS_DIM)],
                got: vec![width - POS_DIM],
            });
        }

        let segments = batch_segments(&host_batch(&batch)?)?;
        let s = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) if first.batch >= 0 => last.batch as usize + 1,
            (Some(first), _) => {
                return Err(UnetError::input(format!(
                    "negative batch index {}",
                    first.batch
                )))
            }
            _ => return Err(UnetError::input("global pooling over an empty batch")),
        };

        let features = self.nn.forward(input);
        let c = features.dims()[1];
        let mut pooled: Vec<Tensor<B, 2>> = Vec::with_capacity(s);
        for segment in &segments {
            let missing = segment.batch as usize - pooled.len();
            pooled.extend((0..missing).map(|_| Tensor::zeros([1, c], &device)));

            let rows = features.clone().slice([segment.range.clone(), 0..c]);
            pooled.push(match self.aggr.0 {
                Aggregation::Max => rows.max_dim(0),
                Aggregation::Mean => rows.mean_dim(0),
            });
        }

        let x = Tensor::cat(pooled, 0);
        let pos = Tensor::zeros([s, POS_DIM], &device);
        let batch = Tensor::<B, 1, Int>::arange(0..s as i64, &device);

        Ok(PointCloudBatch::new(Some(x), pos, batch))
    }
}
