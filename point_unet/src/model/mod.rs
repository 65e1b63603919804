//! U-Net assembly and the segmentation wrapper.

pub mod block;
pub mod segmentation;
pub mod unet;

pub use block::{BlockBody, BlockKind, UnetSkipConnectionBlock};
pub use segmentation::{UnetSegmentationModel, LOSS_SEG};
pub use unet::UnetBasedModel;
