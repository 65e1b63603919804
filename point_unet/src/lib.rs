//! # point_unet
//!
//! Point-cloud U-Nets with PointNet++ blocks, built on Burn.
//!
//! A network is described by a [`UnetConfig`]: a `down_conv` section, an
//! `up_conv` section and an optional `innermost` global block. Module names
//! in the configuration are resolved through a [`ModuleRegistry`], and
//! [`UnetBasedModel`] assembles nested [`UnetSkipConnectionBlock`]s from the
//! inside out.
//!
//! ## Features
//!
//! - **Set abstraction**: farthest-point sampling, radius neighborhoods and a
//!   max-pooled local MLP ([`SAModule`])
//! - **Feature propagation**: k-nearest-neighbor interpolation with skip
//!   concatenation ([`FPModule`])
//! - **Global pooling**: one point per cloud at the bottom of the U
//!   ([`GlobalBaseModule`])
//! - **Segmentation**: cross-entropy training loop hooks
//!   ([`UnetSegmentationModel`])
//!
//! ## Quick Start
//!
//! ```ignore
//! use point_unet::prelude::*;
//! use burn::backend::NdArray;
//!
//! let config = UnetConfig::from_file("pointnet2.json")?;
//! let registry = ModuleRegistry::<NdArray>::pointnet2();
//! let device = Default::default();
//!
//! let model = UnetBasedModel::new(&config, 13, &registry, &device)?;
//! let logits = model.forward(batch)?.x;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! input ── SA ──── SA ──── Global
//!   │       │       │        │
//!   │       │       └─ FP <──┘
//!   │       └───── FP <┘
//!   └──────── FP <┘ ──> logits [N, num_classes]
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Standard library support
//! - `ndarray` (default): CPU backend using ndarray
//! - `wgpu`: GPU acceleration via WebGPU

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod data;
pub mod error;
pub mod interfaces;
pub mod model;
pub mod nn;
pub mod registry;

// Re-export key types for convenience
pub use config::UnetConfig;
pub use data::{LabeledBatch, PointCloudBatch, UpInput};
pub use error::{ModuleRole, Result, UnetError};
pub use model::{UnetBasedModel, UnetSegmentationModel, UnetSkipConnectionBlock};
pub use nn::{FPModule, GlobalBaseModule, SAModule};
pub use registry::ModuleRegistry;

pub use point_core::Point3;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{
        Aggregation, DownConvArgs, InnermostArgs, ModuleOptions, OptionValue, UnetConfig,
        UpConvArgs,
    };
    pub use crate::data::{LabeledBatch, PointCloudBatch, UpInput};
    pub use crate::error::{ModuleRole, Result, UnetError};
    pub use crate::interfaces::{
        CheckpointInterface, ConvType, DatasetInterface, SpatialOps, TrackerInterface,
    };
    pub use crate::model::{
        BlockKind, UnetBasedModel, UnetSegmentationModel, UnetSkipConnectionBlock, LOSS_SEG,
    };
    pub use crate::nn::{
        Activation, BaseConvolution, FPModule, GlobalBaseModule, Mlp, MlpConfig,
        PointConvolution, SAModule,
    };
    pub use crate::registry::{DownModule, InnerModule, ModuleFactory, ModuleRegistry, UpModule};

    pub use point_core::Point3;
}
