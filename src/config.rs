// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::string::ToString;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::merge::MAX_MERGE_DEPTH;

pub const DEFAULT_MAX_TUPLE_WIDTH: usize = 256;

/// Shape assumed for a variable that is subscripted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexedShape {
    #[default]
    List,
    Tuple,
    Dictionary,
}

/// Options threaded through every expression visit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bound on structural nesting, for both merges and expression visits.
    pub max_depth: usize,
    /// Shape of `x` in `x[0]`.
    pub integer_index_type: IndexedShape,
    /// Largest tuple a constant subscript may imply; `x[i]` needs `i < max_tuple_width`.
    pub max_tuple_width: usize,
    /// Shape of `x` in `x[y]`.
    pub variable_index_type: IndexedShape,
    /// Reject calls with missing, surplus or unknown arguments.
    pub strict_calls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: MAX_MERGE_DEPTH,
            integer_index_type: IndexedShape::List,
            max_tuple_width: DEFAULT_MAX_TUPLE_WIDTH,
            variable_index_type: IndexedShape::Dictionary,
            strict_calls: true,
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validated()
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validated()
    }

    fn validated(self) -> Result<Self> {
        if self.max_depth == 0 {
            return Err(Error::Config("max_depth must be at least 1".to_string()));
        }
        Ok(self)
    }
}
