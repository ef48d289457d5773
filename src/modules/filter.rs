//! Pruning of non-module files from the sandbox module tree.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::Result;

/// Per-module paths kept by [`filter_module_files`], relative to a module.
pub const MODULE_FILE_PATTERNS: &[&str] = &[
    "README.*",
    "Modulefile",
    "metadata.json",
    "manifests/**/*",
    "templates/**/*",
    "files/**/*",
    "lib/**/*",
];

/// Builds the canonical module file glob, `*/{README.*,Modulefile,...}`.
///
/// Paths are matched relative to the modules directory and `*` never
/// crosses a `/`.
pub fn module_files_glob() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in MODULE_FILE_PATTERNS {
        let glob = GlobBuilder::new(&format!("*/{}", pattern))
            .literal_separator(true)
            .build()?;
        builder.add(glob);
    }

    Ok(builder.build()?)
}

/// Removes every file under `modules_dir` that is not a module file.
///
/// Directories are left in place. Symlinks are judged by their own path
/// and removed as links. Returns the removed paths.
pub fn filter_module_files(modules_dir: &Path) -> Result<Vec<PathBuf>> {
    tracing::info!("removing non-module files in sandbox");

    let keep = module_files_glob()?;
    let mut removed = Vec::new();

    // Collect first so removal doesn't race the directory walk
    let mut all_files = Vec::new();
    for entry in WalkDir::new(modules_dir) {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            all_files.push(entry.into_path());
        }
    }

    for path in all_files {
        let Ok(rel) = path.strip_prefix(modules_dir) else {
            continue;
        };
        if keep.is_match(rel) {
            continue;
        }

        tracing::debug!(path = ?rel, "removing non-module file");
        std::fs::remove_file(&path)?;
        removed.push(path);
    }

    Ok(removed)
}
