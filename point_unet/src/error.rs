//! Error types for point_unet.

use std::fmt;

use point_core::PointCoreError;
use thiserror::Error;

/// The role a registered module plays inside a U-Net level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleRole {
    /// Downsampling convolution on the encoder path.
    Down,
    /// Upsampling module on the decoder path.
    Up,
    /// Global block at the bottom of the U.
    Innermost,
}

impl fmt::Display for ModuleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleRole::Down => write!(f, "down"),
            ModuleRole::Up => write!(f, "up"),
            ModuleRole::Innermost => write!(f, "innermost"),
        }
    }
}

/// Errors that can occur while building or running a point U-Net.
#[derive(Error, Debug)]
pub enum UnetError {
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// A required configuration field is absent.
    #[error("missing configuration field `{field}`")]
    MissingField {
        /// Name of the field.
        field: String,
    },

    /// A configuration field holds a value of the wrong kind.
    #[error("configuration field `{field}`: expected {expected}, got {got}")]
    InvalidField {
        /// Name of the field.
        field: String,
        /// What the field should hold.
        expected: &'static str,
        /// What it actually holds.
        got: String,
    },

    /// A per-level list is too short for the requested level.
    #[error("field `{field}` has {len} entries but level {index} was requested")]
    LevelOutOfRange {
        /// Name of the list-valued field.
        field: String,
        /// Requested level index.
        index: usize,
        /// Length of the list.
        len: usize,
    },

    /// Down and up paths disagree on the number of levels.
    #[error("expected {expected} up_conv levels for {down} down_conv levels, found {found}")]
    LevelCountMismatch {
        /// Number of down levels.
        down: usize,
        /// Required number of up levels.
        expected: usize,
        /// Configured number of up levels.
        found: usize,
    },

    /// A configuration file could not be read or parsed.
    #[error("failed to load configuration: {message}")]
    ConfigLoad {
        /// Description of the failure.
        message: String,
    },

    /// No module is registered under the requested name.
    #[error("unknown module `{name}`")]
    UnknownModule {
        /// The requested module name.
        name: String,
    },

    /// A registered module has no implementation for the requested role.
    #[error("module `{name}` cannot be used as a {role} module")]
    Unsupported {
        /// The module name.
        name: String,
        /// The role that was requested.
        role: ModuleRole,
    },

    /// Tensor shape mismatch.
    #[error("tensor shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Where the mismatch was detected.
        context: &'static str,
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        got: Vec<usize>,
    },

    /// Input data is missing a required piece.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },

    /// Tensor data could not be read back from the backend.
    #[error("tensor data error: {0}")]
    TensorData(String),

    /// Tracker state was requested before any forward pass.
    #[error("no forward pass has been run yet")]
    NoForwardPass,

    /// Geometry error from point_core.
    #[error("geometry error: {0}")]
    Geometry(#[from] PointCoreError),
}

impl UnetError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        UnetError::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn input(message: impl Into<String>) -> Self {
        UnetError::InvalidInput {
            message: message.into(),
        }
    }
}

/// Result type for point_unet operations.
pub type Result<T> = std::result::Result<T, UnetError>;
