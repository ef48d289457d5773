//! Provisioner capability and the puppet apply implementation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::command::{self, RemoteCommand};
use crate::config::{validate_apply_operation, ProvisionerConfig};
use crate::error::Result;
use crate::instance::Instance;
use crate::modules::{
    filter_module_files, resolve_modules, LibrarianPuppet, ModuleResolver, ResolutionStrategy,
    MODULES_DIR,
};
use crate::sandbox::{LocalSandbox, Sandbox};
use crate::staging::{stage_hiera, stage_manifest};

/// What a provisioner offers the host framework.
///
/// The host transfers the sandbox to the instance and runs the commands;
/// the provisioner only prepares them.
pub trait Provisioner: Send + Sync {
    /// Returns the name of this provisioner.
    fn name(&self) -> &str;

    /// Command installing the configuration tool, if one is needed.
    fn install_command(&self) -> Option<RemoteCommand>;

    /// Command clearing any previous sandbox on the instance.
    fn init_command(&self) -> RemoteCommand;

    /// Command run after upload and before converging, if any.
    fn prepare_command(&self) -> Option<RemoteCommand>;

    /// Command performing the converge.
    fn run_command(&self) -> RemoteCommand;

    /// Exit codes of [`Provisioner::run_command`] treated as success.
    fn run_command_exit_codes(&self) -> Vec<i32>;

    /// Builds a fresh local sandbox for `instance` and returns its path.
    fn create_sandbox(&mut self, instance: &Instance) -> Result<PathBuf>;

    /// Returns the current sandbox path, if one exists.
    fn sandbox_path(&self) -> Option<&Path>;

    /// Removes the local sandbox. A no-op when none exists.
    fn cleanup_sandbox(&mut self) -> Result<()>;
}

/// Summary of a successful sandbox build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Local sandbox directory.
    pub sandbox: PathBuf,
    /// How modules were populated.
    pub strategy: ResolutionStrategy,
    /// Files removed by module filtering.
    pub filtered: Vec<PathBuf>,
    /// Validation warnings.
    pub warnings: Vec<String>,
}

/// Provisioner converging instances with `puppet apply`.
pub struct PuppetApply<R: ModuleResolver = LibrarianPuppet> {
    config: ProvisionerConfig,
    project_root: PathBuf,
    resolver: R,
    /// Parent directory for sandboxes. If None, uses the system temp directory.
    sandbox_base: Option<PathBuf>,
    sandbox: Option<LocalSandbox>,
    last_build: Option<BuildReport>,
}

impl PuppetApply<LibrarianPuppet> {
    /// Creates a provisioner resolving Puppetfiles with librarian-puppet.
    pub fn new(config: ProvisionerConfig, project_root: impl Into<PathBuf>) -> Self {
        Self::with_resolver(config, project_root, LibrarianPuppet::new())
    }
}

impl<R: ModuleResolver> PuppetApply<R> {
    /// Creates a provisioner with a custom Puppetfile resolver.
    pub fn with_resolver(
        config: ProvisionerConfig,
        project_root: impl Into<PathBuf>,
        resolver: R,
    ) -> Self {
        Self {
            config,
            project_root: project_root.into(),
            resolver,
            sandbox_base: None,
            sandbox: None,
            last_build: None,
        }
    }

    /// Creates sandboxes under `base` instead of the system temp directory.
    pub fn with_sandbox_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.sandbox_base = Some(base.into());
        self
    }

    /// Returns the provisioner configuration.
    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Returns the resolver.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Returns the report of the most recent successful build.
    pub fn last_build(&self) -> Option<&BuildReport> {
        self.last_build.as_ref()
    }

    /// Builds the sandbox and returns a report of what was staged.
    ///
    /// Any previous sandbox is removed first. If any step fails the new
    /// sandbox is removed before the error is returned.
    pub fn build(&mut self, instance: &Instance) -> Result<&BuildReport> {
        let warnings = validate_apply_operation(&self.config, instance).into_warnings()?;
        for warning in &warnings {
            tracing::warn!(instance = %instance.name, "{}", warning);
        }

        self.cleanup_sandbox()?;
        self.last_build = None;

        let mut sandbox = match &self.sandbox_base {
            Some(base) => LocalSandbox::create_in(base, &instance.name)?,
            None => LocalSandbox::create(&instance.name)?,
        };
        tracing::info!(instance = %instance.name, path = ?sandbox.root(), "creating local sandbox");

        match self.stage(sandbox.root(), instance) {
            Ok((strategy, filtered)) => {
                let report = BuildReport {
                    sandbox: sandbox.root().to_path_buf(),
                    strategy,
                    filtered,
                    warnings,
                };
                self.sandbox = Some(sandbox);
                Ok(&*self.last_build.insert(report))
            }
            Err(e) => {
                if let Err(cleanup) = sandbox.cleanup() {
                    tracing::warn!(error = %cleanup, "failed to remove sandbox after build failure");
                }
                Err(e)
            }
        }
    }

    /// Releases the sandbox so it outlives this provisioner.
    ///
    /// The caller becomes responsible for removing the returned directory.
    pub fn keep_sandbox(&mut self) -> Option<PathBuf> {
        self.sandbox.take().map(LocalSandbox::keep)
    }

    fn stage(
        &self,
        root: &Path,
        instance: &Instance,
    ) -> Result<(ResolutionStrategy, Vec<PathBuf>)> {
        stage_hiera(root, &instance.hiera, &self.config.remote_root)?;
        stage_manifest(root, &instance.classes)?;

        let strategy = resolve_modules(&self.project_root, root, &self.resolver)?;
        tracing::info!(strategy = ?strategy, "resolved modules");

        let filtered = if self.config.strict_module_filtering {
            filter_module_files(&root.join(MODULES_DIR))?
        } else {
            Vec::new()
        };

        Ok((strategy, filtered))
    }
}

impl<R: ModuleResolver> Provisioner for PuppetApply<R> {
    fn name(&self) -> &str {
        "puppet_apply"
    }

    fn install_command(&self) -> Option<RemoteCommand> {
        command::install_command(&self.config)
    }

    fn init_command(&self) -> RemoteCommand {
        command::init_command(&self.config)
    }

    fn prepare_command(&self) -> Option<RemoteCommand> {
        command::prepare_command(&self.config)
    }

    fn run_command(&self) -> RemoteCommand {
        command::run_command(&self.config)
    }

    fn run_command_exit_codes(&self) -> Vec<i32> {
        command::run_command_exit_codes(&self.config)
    }

    fn create_sandbox(&mut self, instance: &Instance) -> Result<PathBuf> {
        self.build(instance).map(|report| report.sandbox.clone())
    }

    fn sandbox_path(&self) -> Option<&Path> {
        self.sandbox.as_ref().and_then(|s| s.path())
    }

    fn cleanup_sandbox(&mut self) -> Result<()> {
        match self.sandbox.as_mut() {
            Some(sandbox) => {
                sandbox.cleanup()?;
                self.sandbox = None;
                Ok(())
            }
            None => Ok(()),
        }
    }
}
