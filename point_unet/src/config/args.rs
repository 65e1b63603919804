//! Typed per-level arguments.
//!
//! Each struct is parsed from flattened options and validated, so a module
//! constructor never sees a missing or ill-typed argument.

use super::flatten::LevelArgs;
use super::options::{ModuleOptions, OptionValue};
use crate::error::{Result, UnetError};

/// Default cap on neighbors gathered per sampled point.
pub const DEFAULT_MAX_NUM_NEIGHBORS: usize = 64;

/// How a global block reduces the points of a cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    /// Channel-wise maximum.
    #[default]
    Max,
    /// Channel-wise mean.
    Mean,
}

impl Aggregation {
    fn parse(field: &str, value: &OptionValue) -> Result<Self> {
        match value.as_str() {
            Some("max") => Ok(Aggregation::Max),
            Some("mean") => Ok(Aggregation::Mean),
            _ => Err(invalid(field, "\"max\" or \"mean\"", value)),
        }
    }
}

/// Arguments of a downsampling convolution.
#[derive(Debug, Clone, PartialEq)]
pub struct DownConvArgs {
    /// Level of the encoder.
    pub index: usize,
    /// Fraction of points kept, in (0, 1].
    pub ratio: f64,
    /// Neighborhood radius.
    pub radius: f32,
    /// Channel widths of the local MLP; the first entry is the input
    /// feature width, position channels are added by the module.
    pub down_conv_nn: Vec<usize>,
    /// Cap on neighbors per sampled point.
    pub max_num_neighbors: usize,
}

impl DownConvArgs {
    const KNOWN: &'static [&'static str] = &[
        "index",
        "module_name",
        "ratio",
        "radius",
        "down_conv_nn",
        "max_num_neighbors",
        "max_num_neighbor",
    ];

    /// Override the neighbor cap, builder style.
    pub fn with_max_num_neighbors(mut self, max_num_neighbors: usize) -> Self {
        self.max_num_neighbors = max_num_neighbors;
        self
    }

    fn validate(self) -> Result<Self> {
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(UnetError::config(format!(
                "down level {}: ratio {} is outside (0, 1]",
                self.index, self.ratio
            )));
        }
        if !(self.radius > 0.0) {
            return Err(UnetError::config(format!(
                "down level {}: radius {} must be positive",
                self.index, self.radius
            )));
        }
        if self.max_num_neighbors == 0 {
            return Err(UnetError::config(format!(
                "down level {}: max_num_neighbors must be at least 1",
                self.index
            )));
        }
        check_channels("down_conv_nn", &self.down_conv_nn)?;
        Ok(self)
    }
}

impl TryFrom<&LevelArgs> for DownConvArgs {
    type Error = UnetError;

    fn try_from(args: &LevelArgs) -> Result<Self> {
        warn_unknown(args.names(), Self::KNOWN, "down_conv");

        // a per-level list of caps arrives under its singular name
        let max_num_neighbors = match args
            .get("max_num_neighbors")
            .or_else(|| args.get("max_num_neighbor"))
        {
            Some(value) => usize_arg("max_num_neighbors", value)?,
            None => DEFAULT_MAX_NUM_NEIGHBORS,
        };

        DownConvArgs {
            index: args.index(),
            ratio: f64_arg("ratio", require(args.get("ratio"), "ratio")?)?,
            radius: f64_arg("radius", require(args.get("radius"), "radius")?)? as f32,
            down_conv_nn: usize_list_arg("down_conv_nn", require(args.get("down_conv_nn"), "down_conv_nn")?)?,
            max_num_neighbors,
        }
        .validate()
    }
}

/// Arguments of an upsampling module.
#[derive(Debug, Clone, PartialEq)]
pub struct UpConvArgs {
    /// Level of the decoder.
    pub index: usize,
    /// Number of coarse neighbors blended per fine point.
    pub up_k: usize,
    /// Channel widths of the MLP; the first entry is the concatenated
    /// interpolated + skip width.
    pub up_conv_nn: Vec<usize>,
    /// Width of an extra output projection, set on the outermost level.
    pub output_nc: Option<usize>,
}

impl UpConvArgs {
    const KNOWN: &'static [&'static str] = &["index", "module_name", "up_k", "up_conv_nn"];

    /// Request an output projection to `output_nc` channels.
    pub fn with_output_nc(mut self, output_nc: usize) -> Self {
        self.output_nc = Some(output_nc);
        self
    }
}

impl TryFrom<&LevelArgs> for UpConvArgs {
    type Error = UnetError;

    fn try_from(args: &LevelArgs) -> Result<Self> {
        warn_unknown(args.names(), Self::KNOWN, "up_conv");

        let up_k = usize_arg("up_k", require(args.get("up_k"), "up_k")?)?;
        if up_k == 0 {
            return Err(UnetError::config(format!(
                "up level {}: up_k must be at least 1",
                args.index()
            )));
        }

        let up_conv_nn = usize_list_arg("up_conv_nn", require(args.get("up_conv_nn"), "up_conv_nn")?)?;
        check_channels("up_conv_nn", &up_conv_nn)?;

        Ok(UpConvArgs {
            index: args.index(),
            up_k,
            up_conv_nn,
            output_nc: None,
        })
    }
}

/// Arguments of the global block. The `innermost` section is read whole,
/// without per-level indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct InnermostArgs {
    /// Channel widths of the MLP; the first entry is the input feature
    /// width, position channels are added by the module.
    pub nn: Vec<usize>,
    /// Pooling over the points of each cloud.
    pub aggr: Aggregation,
}

impl InnermostArgs {
    const KNOWN: &'static [&'static str] = &["module_name", "nn", "aggr"];
}

impl TryFrom<&ModuleOptions> for InnermostArgs {
    type Error = UnetError;

    fn try_from(opt: &ModuleOptions) -> Result<Self> {
        warn_unknown(opt.iter().map(|(name, _)| name.as_str()), Self::KNOWN, "innermost");

        let nn = usize_list_arg("nn", require(opt.get("nn"), "nn")?)?;
        check_channels("nn", &nn)?;

        let aggr = match opt.get("aggr") {
            Some(value) => Aggregation::parse("aggr", value)?,
            None => Aggregation::default(),
        };

        Ok(InnermostArgs { nn, aggr })
    }
}

fn require<'a>(value: Option<&'a OptionValue>, field: &str) -> Result<&'a OptionValue> {
    value.ok_or_else(|| UnetError::MissingField {
        field: field.to_string(),
    })
}

fn invalid(field: &str, expected: &'static str, value: &OptionValue) -> UnetError {
    UnetError::InvalidField {
        field: field.to_string(),
        expected,
        got: value.kind().to_string(),
    }
}

fn f64_arg(field: &str, value: &OptionValue) -> Result<f64> {
    value.as_f64().ok_or_else(|| invalid(field, "number", value))
}

fn usize_arg(field: &str, value: &OptionValue) -> Result<usize> {
    value
        .as_usize()
        .ok_or_else(|| invalid(field, "non-negative integer", value))
}

fn usize_list_arg(field: &str, value: &OptionValue) -> Result<Vec<usize>> {
    value
        .as_usize_list()
        .ok_or_else(|| invalid(field, "list of non-negative integers", value))
}

fn check_channels(field: &str, channels: &[usize]) -> Result<()> {
    if channels.len() < 2 {
        return Err(UnetError::config(format!(
            "{} needs at least an input and an output width, got {:?}",
            field, channels
        )));
    }
    if channels[1..].contains(&0) {
        return Err(UnetError::config(format!(
            "{} has a zero-width layer: {:?}",
            field, channels
        )));
    }
    Ok(())
}

fn warn_unknown<'a>(names: impl Iterator<Item = &'a str>, known: &[&str], section: &str) {
    for name in names {
        if !known.contains(&name) {
            log::warn!("{}: ignoring unknown option `{}`", section, name);
        }
    }
}
