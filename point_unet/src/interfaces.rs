//! Contracts between a model and the code that trains it.
//!
//! The model does not persist optimizer state, compute metrics, or load
//! datasets itself. These traits are the hooks the surrounding training code
//! uses to do so.

use std::collections::BTreeMap;
use std::fmt;

use burn::prelude::*;

use crate::data::PointCloudBatch;
use crate::error::Result;

/// Data layout a convolution family expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvType {
    /// Fixed number of points per cloud, stacked into a dense tensor.
    Dense,
    /// Dense neighborhoods over a packed batch.
    PartialDense,
    /// Packed batch with a batch index per point and edge lists.
    MessagePassing,
    /// Voxelized sparse tensors.
    Sparse,
}

impl fmt::Display for ConvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvType::Dense => write!(f, "DENSE"),
            ConvType::PartialDense => write!(f, "PARTIAL_DENSE"),
            ConvType::MessagePassing => write!(f, "MESSAGE_PASSING"),
            ConvType::Sparse => write!(f, "SPARSE"),
        }
    }
}

/// Spatial operation overrides a dataset may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpatialOps {
    /// Neighbor cap applied to every down level.
    pub max_num_neighbors: Option<usize>,
}

/// What a dataset tells the model builder.
pub trait DatasetInterface {
    /// Data layout the dataset produces.
    fn conv_type(&self) -> ConvType;

    /// Optional spatial operation overrides.
    fn spatial_ops(&self) -> Option<SpatialOps> {
        None
    }
}

/// Optimizer and scheduler state a checkpointer saves and restores.
pub trait CheckpointInterface {
    /// Optimizer state.
    type Optimizer;
    /// Learning-rate schedulers.
    type Scheduler;

    /// Current optimizer, if one was attached.
    fn optimizer(&self) -> Option<&Self::Optimizer>;

    /// Attach an optimizer.
    fn set_optimizer(&mut self, optimizer: Self::Optimizer);

    /// Schedulers by name.
    fn schedulers(&self) -> &BTreeMap<String, Self::Scheduler>;

    /// Replace all schedulers.
    fn set_schedulers(&mut self, schedulers: BTreeMap<String, Self::Scheduler>);
}

/// What a metrics tracker reads after each forward pass.
///
/// Every accessor fails with [`crate::UnetError::NoForwardPass`] until a
/// forward pass has run.
pub trait TrackerInterface<B: Backend> {
    /// Ground-truth label per point: [N]
    fn labels(&self) -> Result<Tensor<B, 1, Int>>;

    /// Cloud index per point: [N]
    fn batch_idx(&self) -> Result<Tensor<B, 1, Int>>;

    /// Raw network output: [N, num_classes]
    fn output(&self) -> Result<Tensor<B, 2>>;

    /// Last input given to the model.
    fn input(&self) -> Result<PointCloudBatch<B>>;

    /// Losses of the last forward pass, by name.
    fn current_losses(&self) -> Result<BTreeMap<String, f32>>;
}
