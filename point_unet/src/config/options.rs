//! Declarative option values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnetError};

/// A single option: a scalar or an ordered list of options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// String.
    Str(String),
    /// Ordered list.
    List(Vec<OptionValue>),
}

impl OptionValue {
    /// Short description of the value kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "integer",
            OptionValue::Float(_) => "float",
            OptionValue::Str(_) => "string",
            OptionValue::List(_) => "list",
        }
    }

    /// The list items, if this is a list.
    pub fn as_list(&self) -> Option<&[OptionValue]> {
        match self {
            OptionValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// The value as a float; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            OptionValue::Float(v) => Some(v),
            OptionValue::Int(v) => Some(v as f64),
            _ => None,
        }
    }

    /// The value as a non-negative integer.
    pub fn as_usize(&self) -> Option<usize> {
        match *self {
            OptionValue::Int(v) => usize::try_from(v).ok(),
            _ => None,
        }
    }

    /// The value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a list of non-negative integers.
    pub fn as_usize_list(&self) -> Option<Vec<usize>> {
        self.as_list()?.iter().map(OptionValue::as_usize).collect()
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(v.into())
    }
}

impl From<usize> for OptionValue {
    fn from(v: usize) -> Self {
        OptionValue::Int(v as i64)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Str(v)
    }
}

impl<T: Into<OptionValue>> From<Vec<T>> for OptionValue {
    fn from(v: Vec<T>) -> Self {
        OptionValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// The options of one configuration section (`down_conv`, `up_conv`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleOptions(BTreeMap<String, OptionValue>);

impl ModuleOptions {
    /// Create an empty section.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a section for the named module.
    pub fn for_module(module_name: &str) -> Self {
        Self::new().with("module_name", module_name)
    }

    /// Set an option, builder style.
    pub fn with(mut self, name: &str, value: impl Into<OptionValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set an option.
    pub fn insert(&mut self, name: &str, value: impl Into<OptionValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    /// Look up an option.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    /// Iterate over options in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }

    /// The `module_name` option used for registry lookup.
    pub fn module_name(&self) -> Result<&str> {
        let value = self.get("module_name").ok_or_else(|| UnetError::MissingField {
            field: "module_name".to_string(),
        })?;
        value.as_str().ok_or_else(|| UnetError::InvalidField {
            field: "module_name".to_string(),
            expected: "string",
            got: value.kind().to_string(),
        })
    }

    /// Length of a list-valued option.
    pub fn list_len(&self, name: &str) -> Result<usize> {
        let value = self.get(name).ok_or_else(|| UnetError::MissingField {
            field: name.to_string(),
        })?;
        value
            .as_list()
            .map(<[OptionValue]>::len)
            .ok_or_else(|| UnetError::InvalidField {
                field: name.to_string(),
                expected: "list",
                got: value.kind().to_string(),
            })
    }
}
