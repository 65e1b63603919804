//! The U-Net unit.

use burn::module::{Ignored, Module};
use burn::prelude::*;

use crate::data::{PointCloudBatch, UpInput};
use crate::error::Result;
use crate::registry::{DownModule, InnerModule, UpModule};

/// Position of a block inside the U, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Bottom of the U: an inner module, no downsampling.
    Innermost,
    /// Neither top nor bottom.
    Intermediate,
    /// Top of the U, producing the model output.
    Outermost,
}

/// Everything a block runs before handing over to the blocks below it.
#[derive(Module, Debug)]
pub enum BlockBody<B: Backend> {
    /// Innermost blocks run a single inner module.
    Inner(InnerModule<B>),
    /// Other blocks downsample.
    Down(DownModule<B>),
}

/// A U-Net level with a skip connection.
///
/// ```text
/// x ------------------------ identity ------------------------.
/// |-- down --> | blocks below | --> (processed, x) --> up --> out
/// ```
///
/// Blocks do not own the levels beneath them. The model keeps every block
/// in one list, outermost first, and each block runs the rest of that list
/// between its down and up modules. An empty rest passes the downsampled
/// batch through unchanged.
#[derive(Module, Debug)]
pub struct UnetSkipConnectionBlock<B: Backend> {
    body: BlockBody<B>,
    up: UpModule<B>,
    kind: Ignored<BlockKind>,
}

impl<B: Backend> UnetSkipConnectionBlock<B> {
    /// Bottom block: `inner` then `up`.
    pub fn innermost(inner: InnerModule<B>, up: UpModule<B>) -> Self {
        Self {
            body: BlockBody::Inner(inner),
            up,
            kind: Ignored(BlockKind::Innermost),
        }
    }

    /// Intermediate or outermost block: `down`, the blocks below, then `up`.
    pub fn nested(down: DownModule<B>, up: UpModule<B>, outermost: bool) -> Self {
        let kind = if outermost {
            BlockKind::Outermost
        } else {
            BlockKind::Intermediate
        };

        Self {
            body: BlockBody::Down(down),
            up,
            kind: Ignored(kind),
        }
    }

    /// Forward pass through this block and the blocks `below` it.
    ///
    /// `below` lists the deeper blocks in nesting order; its first entry runs
    /// on this block's downsampled output.
    pub fn forward(&self, data: PointCloudBatch<B>, below: &[Self]) -> Result<PointCloudBatch<B>> {
        let processed = match &self.body {
            BlockBody::Inner(inner) => inner.forward(data.clone())?,
            BlockBody::Down(down) => {
                let down = down.forward(data.clone())?;
                match below.split_first() {
                    Some((next, rest)) => next.forward(down, rest)?,
                    None => down,
                }
            }
        };

        self.up.forward(UpInput::new(processed, data))
    }

    /// Position of this block.
    pub fn kind(&self) -> BlockKind {
        self.kind.0
    }

    /// Whether this is the bottom block.
    pub fn is_innermost(&self) -> bool {
        self.kind.0 == BlockKind::Innermost
    }

    /// Whether this is the top block.
    pub fn is_outermost(&self) -> bool {
        self.kind.0 == BlockKind::Outermost
    }

    /// The down module, absent for innermost blocks.
    pub fn down(&self) -> Option<&DownModule<B>> {
        match &self.body {
            BlockBody::Down(down) => Some(down),
            BlockBody::Inner(_) => None,
        }
    }

    /// The inner module, present only for innermost blocks.
    pub fn inner(&self) -> Option<&InnerModule<B>> {
        match &self.body {
            BlockBody::Inner(inner) => Some(inner),
            BlockBody::Down(_) => None,
        }
    }

    /// The up module.
    pub fn up(&self) -> &UpModule<B> {
        &self.up
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Aggregation, DownConvArgs, InnermostArgs, UpConvArgs};
    use crate::nn::{FPModule, GlobalBaseModule, SAModule};
    use burn::backend::NdArray;
    use point_core::Point3;

    type TestBackend = NdArray;

    fn cube() -> PointCloudBatch<TestBackend> {
        let device = Default::default();
        let points: Vec<Point3> = (0..8)
            .map(|i| Point3::new((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32))
            .collect();
        let features: Vec<f32> = (0..16).map(|i| i as f32 * 0.1).collect();
        PointCloudBatch::from_points(&points, Some((&features[..], 2)), &device).unwrap()
    }

    fn fp(k: usize, nn: Vec<usize>) -> UpModule<TestBackend> {
        let args = UpConvArgs {
            index: 0,
            up_k: k,
            up_conv_nn: nn,
            output_nc: None,
        };
        UpModule::FeaturePropagation(FPModule::new(&args, &Default::default()).unwrap())
    }

    fn sa(nn: Vec<usize>) -> DownModule<TestBackend> {
        let args = DownConvArgs {
            index: 0,
            ratio: 0.5,
            radius: 2.0,
            down_conv_nn: nn,
            max_num_neighbors: 8,
        };
        DownModule::SetAbstraction(SAModule::new(&args, &Default::default()).unwrap())
    }

    fn global(nn: Vec<usize>) -> InnerModule<TestBackend> {
        let args = InnermostArgs {
            nn,
            aggr: Aggregation::Max,
        };
        InnerModule::GlobalPooling(GlobalBaseModule::new(&args, &Default::default()).unwrap())
    }

    #[test]
    fn test_innermost_block() {
        // 8 pooled + 2 skip channels
        let block = UnetSkipConnectionBlock::innermost(global(vec![2, 8]), fp(1, vec![10, 4]));

        assert!(block.is_innermost());
        assert!(block.down().is_none());
        assert!(block.inner().is_some());

        let out = block.forward(cube(), &[]).unwrap();
        assert_eq!(out.num_points(), 8);
        assert_eq!(out.feature_dim(), 4);
    }

    #[test]
    fn test_empty_leaf_passes_through() {
        // 8 downsampled + 2 skip channels
        let block = UnetSkipConnectionBlock::nested(sa(vec![2, 8]), fp(2, vec![10, 6]), true);

        assert!(block.is_outermost());
        assert!(block.inner().is_none());

        let out = block.forward(cube(), &[]).unwrap();
        assert_eq!(out.num_points(), 8);
        assert_eq!(out.feature_dim(), 6);
    }

    #[test]
    fn test_nested_blocks() {
        let inner = UnetSkipConnectionBlock::innermost(global(vec![8, 16]), fp(1, vec![24, 8]));
        let outer = UnetSkipConnectionBlock::nested(sa(vec![2, 8]), fp(2, vec![10, 5]), true);
        assert_eq!(inner.kind(), BlockKind::Innermost);

        let data = cube();
        let expected = data.host_positions().unwrap();
        let out = outer.forward(data, &[inner]).unwrap();
        assert_eq!(out.feature_dim(), 5);
        assert_eq!(out.host_positions().unwrap(), expected);
    }

    #[test]
    fn test_three_levels_chain_in_order() {
        // outer: 2 -> 8, middle: 8 -> 12, innermost pools 12 -> 16
        let middle = UnetSkipConnectionBlock::nested(sa(vec![8, 12]), fp(2, vec![12, 7]), false);
        let inner = UnetSkipConnectionBlock::innermost(global(vec![12, 16]), fp(1, vec![28, 4]));
        let outer = UnetSkipConnectionBlock::nested(sa(vec![2, 8]), fp(2, vec![9, 3]), true);
        assert_eq!(middle.kind(), BlockKind::Intermediate);

        let out = outer.forward(cube(), &[middle, inner]).unwrap();
        assert_eq!(out.num_points(), 8);
        assert_eq!(out.feature_dim(), 3);
    }
}
