//! Configuration types for point_unet.
//!
//! A network is described declaratively: a `down_conv` section, an `up_conv`
//! section and an optional `innermost` section, each a map of options whose
//! values are either broadcast scalars or per-level lists. Flattening turns a
//! section into the arguments of one level, and the typed argument structs
//! check those arguments before any module is built.

mod args;
mod flatten;
mod options;
mod unet;

pub use args::{Aggregation, DownConvArgs, InnermostArgs, UpConvArgs, DEFAULT_MAX_NUM_NEIGHBORS};
pub use flatten::{
    fetch_arguments_from_list, fetch_arguments_up_and_down, singularize, LevelArgs, SPECIAL_NAMES,
};
pub use options::{ModuleOptions, OptionValue};
pub use unet::UnetConfig;
