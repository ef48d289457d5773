//! Provisioner configuration and validation.
//!
//! Validates configuration before a sandbox is built to catch errors early.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::instance::Instance;

/// Default location of the sandbox on the remote instance.
pub const DEFAULT_REMOTE_ROOT: &str = "/tmp/kitchen-puppet-apply";

/// Options for the puppet apply provisioner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionerConfig {
    /// Where the sandbox is placed on the instance.
    #[serde(default = "default_remote_root")]
    pub remote_root: String,

    /// Prefix remote commands with `sudo -E`.
    #[serde(default = "default_true")]
    pub sudo: bool,

    /// Install Puppet from the Puppet Labs apt repository before converging.
    #[serde(default)]
    pub require_puppet_repo: bool,

    /// Run puppet with `--detailed-exitcodes` and accept exit code 2.
    #[serde(default = "default_true")]
    pub detailed_exitcodes: bool,

    /// Remove non-module files from the resolved module tree.
    #[serde(default = "default_true")]
    pub strict_module_filtering: bool,
}

fn default_remote_root() -> String {
    DEFAULT_REMOTE_ROOT.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            remote_root: default_remote_root(),
            sudo: true,
            require_puppet_repo: false,
            detailed_exitcodes: true,
            strict_module_filtering: true,
        }
    }
}

impl ProvisionerConfig {
    /// Parses a TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse provisioner config: {}", e)))
    }

    /// Loads a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Sets the remote root.
    pub fn with_remote_root(mut self, root: impl Into<String>) -> Self {
        self.remote_root = root.into();
        self
    }

    /// Enables or disables strict module filtering.
    pub fn with_strict_module_filtering(mut self, enabled: bool) -> Self {
        self.strict_module_filtering = enabled;
        self
    }
}

/// Problems found while checking a converge before any file is written.
///
/// Errors abort the build; warnings end up in the build report.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Returns the warnings, or every error joined into one [`Error::Config`].
    pub fn into_warnings(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Something checked before a sandbox is built.
pub trait Validate {
    /// Records this value's problems into `result`.
    fn check(&self, result: &mut ValidationResult);

    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        self.check(&mut result);
        result
    }
}

impl Validate for ProvisionerConfig {
    fn check(&self, result: &mut ValidationResult) {
        let root = self.remote_root.trim_end_matches('/');

        // init_command runs `rm -rf` on this path
        if !self.remote_root.starts_with('/') {
            result.error(format!(
                "remote_root '{}' must be an absolute path",
                self.remote_root
            ));
        } else if root.is_empty() {
            result.error("remote_root must not be the filesystem root");
        }

        if self.remote_root.chars().any(char::is_whitespace) {
            result.error(format!(
                "remote_root '{}' must not contain whitespace",
                self.remote_root
            ));
        }

        if !self.detailed_exitcodes {
            result.warn(
                "detailed_exitcodes disabled: puppet resource failures will not fail the converge",
            );
        }

        if !self.strict_module_filtering {
            result.warn("strict_module_filtering disabled: non-module files will be shipped");
        }
    }
}

impl Validate for Instance {
    fn check(&self, result: &mut ValidationResult) {
        if self.name.trim().is_empty() {
            result.error("instance name cannot be empty");
        }

        if self.name.contains('/') || self.name.contains('\\') {
            result.error(format!(
                "instance name '{}' must not contain path separators",
                self.name
            ));
        }

        if self.classes.is_empty() {
            result.warn("no classes given: the manifest will not include anything");
        }

        let mut seen = HashSet::new();
        for class in &self.classes {
            if class.trim().is_empty() {
                result.error("class names cannot be empty");
            } else if !seen.insert(class.as_str()) {
                result.warn(format!("class '{}' is included more than once", class));
            }
        }
    }
}

/// Validates all configuration for a puppet apply converge.
pub fn validate_apply_operation(config: &ProvisionerConfig, instance: &Instance) -> ValidationResult {
    let mut result = ValidationResult::default();
    config.check(&mut result);
    instance.check(&mut result);
    result
}
