//! Flattening of per-level options into the arguments of a single level.

use std::collections::BTreeMap;

use super::options::{ModuleOptions, OptionValue};
use super::unet::UnetConfig;
use crate::error::{Result, UnetError};

/// List-valued option names that are already singular despite ending in `s`.
pub const SPECIAL_NAMES: &[&str] = &["radius"];

/// Singular form of a list-valued option name.
///
/// Strips one trailing `s` (`ratios` -> `ratio`) unless the name is listed in
/// [`SPECIAL_NAMES`].
pub fn singularize(name: &str) -> &str {
    match name.strip_suffix('s') {
        Some(stem) if !SPECIAL_NAMES.contains(&name) => stem,
        _ => name,
    }
}

/// Arguments of one network level, keyed by (singular) option name.
///
/// Always carries the resolved level under `index`.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelArgs {
    values: BTreeMap<String, OptionValue>,
    index: usize,
}

impl LevelArgs {
    /// The level these arguments were resolved for.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Look up an argument.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// Whether an argument is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate argument names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of arguments, `index` included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no arguments (never true, `index` is always set).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolve the arguments of level `index` from a configuration section.
///
/// Non-empty lists are indexed at `index` and stored under their singular
/// name; scalars and empty lists are passed through unchanged. The level is
/// injected under `index`.
pub fn fetch_arguments_from_list(opt: &ModuleOptions, index: usize) -> Result<LevelArgs> {
    let mut values = BTreeMap::new();

    for (name, value) in opt.iter() {
        match value {
            OptionValue::List(items) if !items.is_empty() => {
                let item = items.get(index).ok_or_else(|| UnetError::LevelOutOfRange {
                    field: name.clone(),
                    index,
                    len: items.len(),
                })?;
                values.insert(singularize(name).to_string(), item.clone());
            }
            _ => {
                values.insert(name.clone(), value.clone());
            }
        }
    }

    values.insert("index".to_string(), OptionValue::from(index));
    Ok(LevelArgs { values, index })
}

/// Resolve the up and down arguments of level `index`.
///
/// The down path reads level `index`; the up path mirrors it and reads level
/// `count_convs - index`.
///
/// # Returns
/// `(args_up, args_down)`
pub fn fetch_arguments_up_and_down(
    config: &UnetConfig,
    index: usize,
    count_convs: usize,
) -> Result<(LevelArgs, LevelArgs)> {
    let up_index = count_convs.checked_sub(index).ok_or_else(|| {
        UnetError::config(format!(
            "level {} exceeds the {} configured down levels",
            index, count_convs
        ))
    })?;

    let args_down = fetch_arguments_from_list(&config.down_conv, index)?;
    let args_up = fetch_arguments_from_list(&config.up_conv, up_index)?;
    Ok((args_up, args_down))
}
