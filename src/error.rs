//! Error types for the kitchen-puppet provisioner.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for sandbox builds.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to create a sandbox.
    #[error("failed to create sandbox: {0}")]
    SandboxCreation(String),

    /// Failed to clean up a sandbox.
    #[error("failed to clean up sandbox at {path}: {reason}")]
    SandboxCleanup { path: PathBuf, reason: String },

    /// IO error during staging or copying.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Provisioner or project configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// None of the module location artifacts exist in the project root.
    #[error(
        "Puppetfile, modules/ directory, Modulefile must exist in {}; module(s) could not be found",
        .root.display()
    )]
    ModulesNotFound { root: PathBuf },

    /// The external dependency resolver is not installed.
    #[error("could not load {resolver}: {remedy}")]
    ResolverUnavailable { resolver: String, remedy: String },

    /// The external dependency resolver ran but failed.
    #[error("module resolution failed: {0}")]
    Resolver(String),

    /// YAML serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A module file glob failed to compile.
    #[error("invalid module glob: {0}")]
    Glob(#[from] globset::Error),

    /// Walking the module tree failed.
    #[error("failed to walk module tree: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    /// Returns true for user-facing configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::ModulesNotFound { .. } | Error::ResolverUnavailable { .. }
        )
    }
}

/// Result type alias for sandbox operations.
pub type Result<T> = std::result::Result<T, Error>;
