//! The converge target supplied by the host framework.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::error::{Error, Result};

/// An instance being converged.
///
/// Only the parts the sandbox builder reads are modelled here; the host
/// framework owns everything else about the instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Instance name, used to namespace the local sandbox directory.
    pub name: String,

    /// Puppet classes to include, in declaration order.
    #[serde(default)]
    pub classes: Vec<String>,

    /// Hiera data for this instance.
    #[serde(default)]
    pub hiera: Mapping,
}

impl Instance {
    /// Creates an instance with no classes and no Hiera data.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Appends a class to include.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Sets a Hiera key.
    pub fn with_hiera(
        mut self,
        key: impl Into<serde_yaml::Value>,
        value: impl Into<serde_yaml::Value>,
    ) -> Self {
        self.hiera.insert(key.into(), value.into());
        self
    }

    /// Loads an instance description from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;

        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse instance: {}", e)))
    }
}
