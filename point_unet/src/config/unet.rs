//! Top-level U-Net configuration.

use std::path::Path;

use burn::config::Config;
use serde::{Deserialize, Serialize};

use super::options::ModuleOptions;
use crate::error::{Result, UnetError};

/// Declarative description of a U-Net.
///
/// The length of `down_conv.down_conv_nn` is the number of levels. With an
/// `innermost` section the up path has one extra level for the global block.
///
/// ```json
/// {
///   "down_conv": {
///     "module_name": "SAModule",
///     "ratios": [0.5, 0.25],
///     "radius": [0.1, 0.2],
///     "down_conv_nn": [[3, 16], [16, 32]]
///   },
///   "up_conv": {
///     "module_name": "FPModule",
///     "up_conv_nn": [[96, 64], [80, 32], [35, 32]],
///     "up_k": [1, 3, 3]
///   },
///   "innermost": { "module_name": "GlobalBaseModule", "nn": [32, 64], "aggr": "max" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnetConfig {
    /// Encoder section.
    pub down_conv: ModuleOptions,
    /// Decoder section.
    pub up_conv: ModuleOptions,
    /// Optional global block at the bottom of the U.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub innermost: Option<ModuleOptions>,
}

impl Config for UnetConfig {}

impl UnetConfig {
    /// Create a configuration without a global block.
    pub fn new(down_conv: ModuleOptions, up_conv: ModuleOptions) -> Self {
        Self {
            down_conv,
            up_conv,
            innermost: None,
        }
    }

    /// Add a global block at the bottom of the U.
    pub fn with_innermost(mut self, innermost: ModuleOptions) -> Self {
        self.innermost = Some(innermost);
        self
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| UnetError::ConfigLoad {
            message: e.to_string(),
        })
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(path).map_err(|e| UnetError::ConfigLoad {
            message: format!("{:?}", e),
        })
    }

    /// Whether the configuration has a global block.
    pub fn contains_global(&self) -> bool {
        self.innermost.is_some()
    }

    /// Number of encoder levels.
    pub fn num_levels(&self) -> Result<usize> {
        self.down_conv.list_len("down_conv_nn")
    }

    /// Number of decoder levels.
    pub fn num_up_levels(&self) -> Result<usize> {
        self.up_conv.list_len("up_conv_nn")
    }

    /// Check the structural constraints that do not depend on a registry.
    pub fn validate(&self) -> Result<()> {
        let down = self.num_levels()?;
        if down == 0 {
            return Err(UnetError::config("down_conv_nn must have at least one level"));
        }

        if self.contains_global() {
            let found = self.num_up_levels()?;
            if down + 1 != found {
                return Err(UnetError::LevelCountMismatch {
                    down,
                    expected: down + 1,
                    found,
                });
            }
        }

        Ok(())
    }
}
