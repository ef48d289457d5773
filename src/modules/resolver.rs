//! External Puppetfile dependency resolver.
//!
//! The resolver mutates shared state (its config database and the project's
//! lockfile), so every resolve/install pair in the process goes through the
//! [`ResolutionCoordinator`].

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, OnceLock};

use crate::error::{Error, Result};

/// File name of the dependency lock file.
pub const PUPPETFILE: &str = "Puppetfile";

/// Where and how a resolver should install modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverEnvironment {
    /// Project root containing the Puppetfile.
    pub project_root: PathBuf,
    /// Path of the Puppetfile.
    pub puppetfile: PathBuf,
    /// Directory resolved modules are installed into.
    pub install_path: PathBuf,
}

impl ResolverEnvironment {
    /// Creates an environment installing into `install_path`.
    pub fn new(project_root: impl Into<PathBuf>, install_path: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            puppetfile: project_root.join(PUPPETFILE),
            project_root,
            install_path: install_path.into(),
        }
    }
}

/// A Puppetfile dependency resolver.
pub trait ModuleResolver: Send + Sync {
    /// Resolves the dependency graph declared by the Puppetfile.
    fn resolve(&self, env: &ResolverEnvironment) -> Result<()>;

    /// Installs the resolved modules into `env.install_path`.
    fn install(&self, env: &ResolverEnvironment) -> Result<()>;

    /// Returns the name of this resolver.
    fn name(&self) -> &str;
}

/// Process-wide serialization point for resolver runs.
pub struct ResolutionCoordinator {
    lock: Mutex<()>,
}

impl ResolutionCoordinator {
    /// Returns the coordinator shared by every build in the process.
    pub fn global() -> &'static ResolutionCoordinator {
        static GLOBAL: OnceLock<ResolutionCoordinator> = OnceLock::new();
        GLOBAL.get_or_init(|| ResolutionCoordinator {
            lock: Mutex::new(()),
        })
    }

    /// Runs both resolver phases while holding the resolution lock.
    pub fn run(&self, resolver: &dyn ModuleResolver, env: &ResolverEnvironment) -> Result<()> {
        // The lock guards no data, so a panic in another build leaves nothing to repair.
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        tracing::debug!(resolver = resolver.name(), path = ?env.install_path, "acquired resolution lock");
        resolver.resolve(env)?;
        resolver.install(env)
    }
}

/// Resolver driving the `librarian-puppet` command line tool.
#[derive(Debug, Clone)]
pub struct LibrarianPuppet {
    program: PathBuf,
}

impl LibrarianPuppet {
    /// Uses `librarian-puppet` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("librarian-puppet")
    }

    /// Uses the given librarian-puppet executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, cwd: &Path, args: &[&str], install_path: &Path) -> Result<()> {
        let output = Command::new(&self.program)
            .current_dir(cwd)
            .args(args)
            .arg(install_path)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::ResolverUnavailable {
                    resolver: "Librarian-Puppet".to_string(),
                    remedy: "the `librarian-puppet' gem is missing and must be installed. \
                             Run `gem install librarian-puppet` or add the following to your \
                             Gemfile if you are using Bundler: `gem 'librarian-puppet'`."
                        .to_string(),
                },
                _ => Error::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Resolver(format!(
                "{} {} failed: {}",
                self.program.display(),
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl Default for LibrarianPuppet {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleResolver for LibrarianPuppet {
    /// Points librarian's local config at the install path.
    ///
    /// Librarian resolves against the Puppetfile lazily, writing the lock
    /// file during install; this phase pins where that install lands.
    fn resolve(&self, env: &ResolverEnvironment) -> Result<()> {
        self.run(&env.project_root, &["config", "--local", "path"], &env.install_path)
    }

    fn install(&self, env: &ResolverEnvironment) -> Result<()> {
        self.run(&env.project_root, &["install", "--path"], &env.install_path)
    }

    fn name(&self) -> &str {
        "librarian-puppet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_derives_puppetfile_path() {
        let env = ResolverEnvironment::new("/srv/project", "/tmp/sandbox/modules");

        assert_eq!(env.puppetfile, PathBuf::from("/srv/project/Puppetfile"));
        assert_eq!(env.install_path, PathBuf::from("/tmp/sandbox/modules"));
    }

    #[test]
    fn missing_librarian_is_resolver_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolver = LibrarianPuppet::with_program("librarian-puppet-does-not-exist-here");
        let env = ResolverEnvironment::new(dir.path(), dir.path().join("modules"));

        let err = resolver.resolve(&env).unwrap_err();
        match err {
            Error::ResolverUnavailable { remedy, .. } => {
                assert!(remedy.contains("gem install librarian-puppet"));
            }
            other => panic!("expected ResolverUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn coordinator_is_process_wide() {
        let a = ResolutionCoordinator::global() as *const _;
        let b = ResolutionCoordinator::global() as *const _;
        assert_eq!(a, b);
    }
}
