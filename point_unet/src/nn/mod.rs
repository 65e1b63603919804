//! Neural network modules for point-cloud encoder-decoders.
//!
//! This module provides:
//! - MLP building block shared by every other module
//! - Downsampling: the sampling/neighborhood scaffold and the PointNet++
//!   set-abstraction convolution built on it
//! - Upsampling: feature propagation by k-nearest-neighbor interpolation
//! - Global pooling for the bottom of the U

pub mod conv;
pub mod fp;
pub mod global;
pub mod mlp;

pub use conv::{BaseConvolution, PointConvolution, SAModule, SampledNeighborhood};
pub use fp::FPModule;
pub use global::GlobalBaseModule;
pub use mlp::{Activation, Mlp, MlpConfig};
