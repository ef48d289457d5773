//! kitchen-puppet - Puppet apply provisioner for ephemeral test instances
//!
//! This library builds the local sandbox shipped to an instance before a
//! converge: an entry-point manifest, Hiera data, and a resolved set of
//! Puppet modules. It also generates the remote commands that clear the
//! old sandbox, optionally install Puppet, and run `puppet apply`.

pub mod command;
pub mod config;
pub mod error;
pub mod instance;
pub mod modules;
pub mod provisioner;
pub mod sandbox;
pub mod staging;

pub use command::RemoteCommand;
pub use config::{validate_apply_operation, ProvisionerConfig, Validate, ValidationResult};
pub use error::Error;
pub use instance::Instance;
pub use modules::{
    filter_module_files, resolve_modules, LibrarianPuppet, ModuleResolver, Modulefile,
    ResolutionCoordinator, ResolutionStrategy, ResolverEnvironment,
};
pub use provisioner::{BuildReport, Provisioner, PuppetApply};
pub use sandbox::{LocalSandbox, Sandbox};
pub use staging::{stage_hiera, stage_manifest};
