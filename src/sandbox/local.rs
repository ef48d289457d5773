//! Temp-directory based sandbox implementation.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::provider::Sandbox;

/// A sandbox living in a uniquely named temporary directory.
///
/// The directory is named `<instance-name>-sandbox-<random>` and is
/// removed on [`Sandbox::cleanup`] or when the value is dropped.
#[derive(Debug)]
pub struct LocalSandbox {
    /// Path to the sandbox directory.
    path: PathBuf,
    /// Whether the sandbox has been cleaned up.
    cleaned_up: bool,
}

impl LocalSandbox {
    /// Creates a fresh sandbox under the system temp directory.
    pub fn create(instance_name: &str) -> Result<Self> {
        Self::create_in(std::env::temp_dir(), instance_name)
    }

    /// Creates a fresh sandbox under `base`.
    pub fn create_in(base: impl AsRef<Path>, instance_name: &str) -> Result<Self> {
        let base = base.as_ref();
        std::fs::create_dir_all(base)?;

        let prefix = format!("{}-sandbox-", instance_name);
        let path = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(base)
            .map_err(|e| {
                Error::SandboxCreation(format!(
                    "could not create {} in {}: {}",
                    prefix,
                    base.display(),
                    e
                ))
            })?
            .keep();

        tracing::debug!(path = ?path, "creating local sandbox");

        Ok(Self {
            path,
            cleaned_up: false,
        })
    }

    /// Returns the sandbox directory.
    ///
    /// Unlike [`Sandbox::path`] this does not consult the cleanup state.
    pub fn root(&self) -> &Path {
        &self.path
    }

    /// Releases the directory so it is not removed when this value drops.
    pub fn keep(mut self) -> PathBuf {
        self.cleaned_up = true;
        std::mem::take(&mut self.path)
    }
}

impl Sandbox for LocalSandbox {
    fn path(&self) -> Option<&Path> {
        if self.cleaned_up {
            None
        } else {
            Some(&self.path)
        }
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.cleaned_up {
            return Ok(());
        }

        tracing::debug!(path = ?self.path, "cleaning up local sandbox");

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            // Already removed by a failed module resolution
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::SandboxCleanup {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        }

        self.cleaned_up = true;
        Ok(())
    }
}

impl Drop for LocalSandbox {
    fn drop(&mut self) {
        if !self.cleaned_up {
            if let Err(e) = self.cleanup() {
                tracing::error!(error = %e, path = ?self.path, "failed to cleanup sandbox on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn local_sandbox_is_named_after_instance() {
        let base = TempDir::new().unwrap();
        let sandbox = LocalSandbox::create_in(base.path(), "default-centos-64").unwrap();

        let name = sandbox.root().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("default-centos-64-sandbox-"));
        assert!(sandbox.root().is_dir());
        assert!(sandbox.root().is_absolute());
    }

    #[test]
    fn local_sandbox_names_are_unique() {
        let base = TempDir::new().unwrap();
        let first = LocalSandbox::create_in(base.path(), "web").unwrap();
        let second = LocalSandbox::create_in(base.path(), "web").unwrap();

        assert_ne!(first.root(), second.root());
    }

    #[test]
    fn local_sandbox_creates_and_cleans_up() {
        let base = TempDir::new().unwrap();
        let mut sandbox = LocalSandbox::create_in(base.path(), "web").unwrap();
        std::fs::write(sandbox.root().join("base.pp"), "include apache\n").unwrap();
        let path = sandbox.root().to_path_buf();

        sandbox.cleanup().expect("failed to cleanup sandbox");

        assert!(!path.exists());
        assert!(sandbox.path().is_none());
    }

    #[test]
    fn local_sandbox_cleanup_is_idempotent() {
        let base = TempDir::new().unwrap();
        let mut sandbox = LocalSandbox::create_in(base.path(), "web").unwrap();

        sandbox.cleanup().expect("first cleanup failed");
        sandbox.cleanup().expect("second cleanup should be idempotent");
    }

    #[test]
    fn local_sandbox_cleanup_tolerates_missing_directory() {
        let base = TempDir::new().unwrap();
        let mut sandbox = LocalSandbox::create_in(base.path(), "web").unwrap();
        std::fs::remove_dir_all(sandbox.root()).unwrap();

        sandbox.cleanup().expect("cleanup of removed sandbox should succeed");
    }

    #[test]
    fn kept_sandbox_survives_drop() {
        let base = TempDir::new().unwrap();
        let sandbox = LocalSandbox::create_in(base.path(), "web").unwrap();

        let path = sandbox.keep();

        assert!(path.is_dir());
    }

    #[test]
    fn local_sandbox_is_removed_on_drop() {
        let base = TempDir::new().unwrap();
        let path = {
            let sandbox = LocalSandbox::create_in(base.path(), "web").unwrap();
            sandbox.root().to_path_buf()
        };

        assert!(!path.exists());
    }
}
