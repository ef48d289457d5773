//! Module resolution strategy selection and sandbox module assembly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{Error, Result};

use super::modulefile::{Modulefile, MODULEFILE};
use super::resolver::{ModuleResolver, ResolutionCoordinator, ResolverEnvironment, PUPPETFILE};

/// Name of the module directory, both in the project and in the sandbox.
pub const MODULES_DIR: &str = "modules";

/// Project-root entries copied when packaging the project as a module.
const PROJECT_MODULE_DIRS: &[&str] = &["lib", "manifests", "files", "templates"];

/// How the sandbox `modules/` tree gets populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Resolve and install the Puppetfile with the external resolver.
    Puppetfile,
    /// Copy the project's `modules/` directory.
    ModulesDirectory {
        /// The project also has a Modulefile and is packaged as a module too.
        includes_project: bool,
    },
    /// Package the project itself as the only module.
    Modulefile,
}

/// Picks the strategy for `project_root`.
///
/// Puppetfile wins over `modules/`, which wins over Modulefile. Returns
/// `None` when none of them exist.
pub fn select_strategy(project_root: &Path) -> Option<ResolutionStrategy> {
    let has_modulefile = project_root.join(MODULEFILE).exists();

    if project_root.join(PUPPETFILE).exists() {
        Some(ResolutionStrategy::Puppetfile)
    } else if project_root.join(MODULES_DIR).is_dir() {
        Some(ResolutionStrategy::ModulesDirectory {
            includes_project: has_modulefile,
        })
    } else if has_modulefile {
        Some(ResolutionStrategy::Modulefile)
    } else {
        None
    }
}

/// Populates `<sandbox>/modules` from `project_root`.
///
/// On any failure the whole sandbox directory is removed before the error
/// is returned.
pub fn resolve_modules(
    project_root: &Path,
    sandbox: &Path,
    resolver: &dyn ModuleResolver,
) -> Result<ResolutionStrategy> {
    let result = populate_modules(project_root, sandbox, resolver);

    if let Err(e) = &result {
        tracing::error!(error = %e, root = ?project_root, "module resolution failed");
        if let Err(rm) = std::fs::remove_dir_all(sandbox) {
            if rm.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %rm, path = ?sandbox, "failed to remove sandbox");
            }
        }
    }

    result
}

fn populate_modules(
    project_root: &Path,
    sandbox: &Path,
    resolver: &dyn ModuleResolver,
) -> Result<ResolutionStrategy> {
    let strategy = select_strategy(project_root).ok_or_else(|| Error::ModulesNotFound {
        root: project_root.to_path_buf(),
    })?;
    let modules_dir = sandbox.join(MODULES_DIR);

    match strategy {
        ResolutionStrategy::Puppetfile => {
            resolve_with_resolver(project_root, &modules_dir, resolver)?;
        }
        ResolutionStrategy::ModulesDirectory { includes_project } => {
            copy_modules(project_root, &modules_dir)?;
            if includes_project {
                copy_project_module(project_root, &modules_dir)?;
            }
        }
        ResolutionStrategy::Modulefile => {
            copy_project_module(project_root, &modules_dir)?;
        }
    }

    Ok(strategy)
}

fn resolve_with_resolver(
    project_root: &Path,
    modules_dir: &Path,
    resolver: &dyn ModuleResolver,
) -> Result<()> {
    let env = ResolverEnvironment::new(project_root, modules_dir);
    tracing::info!(resolver = resolver.name(), "resolving module dependencies");
    tracing::debug!(puppetfile = ?env.puppetfile, "using Puppetfile");

    std::fs::create_dir_all(modules_dir)?;
    ResolutionCoordinator::global().run(resolver, &env)
}

fn copy_modules(project_root: &Path, modules_dir: &Path) -> Result<()> {
    let source = project_root.join(MODULES_DIR);
    tracing::info!("preparing modules from project directory");
    tracing::debug!(source = ?source, "using modules directory");

    std::fs::create_dir_all(modules_dir)?;
    copy_tree(&source, modules_dir)
}

/// Packages the project root as `<modules_dir>/<module-name>`.
pub fn copy_project_module(project_root: &Path, modules_dir: &Path) -> Result<PathBuf> {
    let modulefile_path = project_root.join(MODULEFILE);
    tracing::info!("preparing current project directory as a module");
    tracing::debug!(modulefile = ?modulefile_path, "using Modulefile");

    let module_name = Modulefile::load(&modulefile_path)?.module_name()?;
    let module_path = modules_dir.join(&module_name);
    std::fs::create_dir_all(&module_path)?;

    let mut entries: Vec<_> = std::fs::read_dir(project_root)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let wanted = name == MODULEFILE
            || name.starts_with("README.")
            || PROJECT_MODULE_DIRS.contains(&&*name);
        if !wanted {
            continue;
        }

        let dest = module_path.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_tree(&entry.path(), &dest)?;
        } else if file_type.is_symlink() {
            copy_symlink(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }

    tracing::debug!(module = %module_name, path = ?module_path, "packaged project module");
    Ok(module_path)
}

/// Recursively copies the contents of `source` into `dest`.
///
/// Symlinks are recreated rather than followed, so dangling links survive.
fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(source).map_err(|_| {
            Error::Config(format!(
                "{} escapes {}",
                entry.path().display(),
                source.display()
            ))
        })?;
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.path_is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, dest: &Path) -> Result<()> {
    let target = std::fs::read_link(link)?;
    std::os::unix::fs::symlink(target, dest)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, _dest: &Path) -> Result<()> {
    tracing::warn!(path = ?link, "skipping symlink");
    Ok(())
}
