//! U-Net assembly.

use burn::module::Module;
use burn::prelude::*;

use crate::config::{
    fetch_arguments_from_list, fetch_arguments_up_and_down, DownConvArgs, InnermostArgs,
    UnetConfig, UpConvArgs,
};
use crate::data::PointCloudBatch;
use crate::error::{Result, UnetError};
use crate::interfaces::DatasetInterface;
use crate::model::block::UnetSkipConnectionBlock;
use crate::registry::{DownFactory, ModuleRegistry, UpFactory};

/// A U-Net built from nested skip-connection blocks.
///
/// Blocks are assembled from the inside out: the optional global block
/// first, then one block per encoder level from the deepest to level 1, and
/// finally the outermost block at level 0, which projects to `num_classes`.
/// They are stored outermost first; block `i` nests blocks `i + 1..`.
#[derive(Module, Debug)]
pub struct UnetBasedModel<B: Backend> {
    blocks: Vec<UnetSkipConnectionBlock<B>>,
    num_classes: usize,
}

impl<B: Backend> UnetBasedModel<B> {
    /// Build the model.
    ///
    /// # Errors
    /// Fails on unknown module names, malformed level arguments, and a global
    /// block whose up path does not have exactly one more level than the
    /// down path.
    pub fn new(
        config: &UnetConfig,
        num_classes: usize,
        registry: &ModuleRegistry<B>,
        device: &B::Device,
    ) -> Result<Self> {
        Self::build(config, num_classes, registry, None, device)
    }

    /// Build the model for a dataset.
    ///
    /// The dataset's convolution type must match the registry's. Its spatial
    /// operations, if any, override the neighbor cap of every down level.
    pub fn for_dataset<D: DatasetInterface>(
        config: &UnetConfig,
        num_classes: usize,
        registry: &ModuleRegistry<B>,
        dataset: &D,
        device: &B::Device,
    ) -> Result<Self> {
        if dataset.conv_type() != registry.conv_type() {
            return Err(UnetError::config(format!(
                "dataset produces {} data but the modules expect {}",
                dataset.conv_type(),
                registry.conv_type()
            )));
        }

        let max_num_neighbors = dataset.spatial_ops().and_then(|ops| ops.max_num_neighbors);
        Self::build(config, num_classes, registry, max_num_neighbors, device)
    }

    fn build(
        config: &UnetConfig,
        num_classes: usize,
        registry: &ModuleRegistry<B>,
        max_num_neighbors: Option<usize>,
        device: &B::Device,
    ) -> Result<Self> {
        if num_classes == 0 {
            return Err(UnetError::config("num_classes must be at least 1"));
        }
        config.validate()?;

        let num_convs = config.num_levels()?;
        let down_conv = registry.down(config.down_conv.module_name()?)?;
        let up_conv = registry.up(config.up_conv.module_name()?)?;

        let level = LevelBuilder {
            config,
            num_convs,
            down_conv,
            up_conv,
            max_num_neighbors,
            device,
        };

        let mut blocks = Vec::with_capacity(num_convs + 1);
        if let Some(innermost) = &config.innermost {
            let inner_conv = registry.inner(innermost.module_name()?)?;
            let inner = inner_conv(&InnermostArgs::try_from(innermost)?, device)?;
            let args_up = UpConvArgs::try_from(&fetch_arguments_from_list(&config.up_conv, 0)?)?;
            let up = up_conv(&args_up, device)?;
            log::debug!(
                "built innermost block: {} -> {} channels",
                inner.output_dim(),
                up.output_dim()
            );
            blocks.push(UnetSkipConnectionBlock::innermost(inner, up));
        }

        for index in (1..num_convs).rev() {
            blocks.push(level.build(index, None)?);
        }
        blocks.push(level.build(0, Some(num_classes))?);
        blocks.reverse();

        log::info!(
            "built U-Net: {} down levels, {} blocks, global block: {}, {} classes",
            num_convs,
            blocks.len(),
            config.contains_global(),
            num_classes
        );

        Ok(Self {
            blocks,
            num_classes,
        })
    }

    /// Per-point class logits: `x` is [N, num_classes] on the input points.
    pub fn forward(&self, data: PointCloudBatch<B>) -> Result<PointCloudBatch<B>> {
        match self.blocks.split_first() {
            Some((outermost, below)) => outermost.forward(data, below),
            None => Err(UnetError::config("model has no blocks")),
        }
    }

    /// Width of the output features.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Number of nested blocks, the global block included.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Blocks in nesting order, outermost first.
    pub fn blocks(&self) -> &[UnetSkipConnectionBlock<B>] {
        &self.blocks
    }

    /// The outermost block.
    pub fn root(&self) -> Option<&UnetSkipConnectionBlock<B>> {
        self.blocks.first()
    }
}

/// Builds one non-innermost level from the configuration.
struct LevelBuilder<'a, B: Backend> {
    config: &'a UnetConfig,
    num_convs: usize,
    down_conv: DownFactory<B>,
    up_conv: UpFactory<B>,
    max_num_neighbors: Option<usize>,
    device: &'a B::Device,
}

impl<B: Backend> LevelBuilder<'_, B> {
    fn build(&self, index: usize, output_nc: Option<usize>) -> Result<UnetSkipConnectionBlock<B>> {
        let (args_up, args_down) = fetch_arguments_up_and_down(self.config, index, self.num_convs)?;

        let mut args_down = DownConvArgs::try_from(&args_down)?;
        if let Some(max_num_neighbors) = self.max_num_neighbors {
            args_down = args_down.with_max_num_neighbors(max_num_neighbors);
        }

        let mut args_up = UpConvArgs::try_from(&args_up)?;
        if let Some(output_nc) = output_nc {
            args_up = args_up.with_output_nc(output_nc);
        }

        let down = (self.down_conv)(&args_down, self.device)?;
        let up = (self.up_conv)(&args_up, self.device)?;
        log::debug!(
            "built level {}: down {:?} -> {} channels, up {:?} -> {} channels",
            index,
            args_down.down_conv_nn,
            down.output_dim(),
            args_up.up_conv_nn,
            up.output_dim()
        );

        Ok(UnetSkipConnectionBlock::nested(down, up, output_nc.is_some()))
    }
}
