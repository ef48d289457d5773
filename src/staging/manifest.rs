//! Entry-point manifest staging.

use std::path::Path;

use crate::error::Result;

/// Entry-point manifest, relative to the sandbox root.
pub const MANIFEST_FILE: &str = "base.pp";

/// Writes `base.pp` including every class, in the given order.
pub fn stage_manifest(sandbox: &Path, classes: &[String]) -> Result<()> {
    let path = sandbox.join(MANIFEST_FILE);
    std::fs::write(&path, render_manifest(classes))?;

    tracing::debug!(path = ?path, classes = classes.len(), "staged manifest");
    Ok(())
}

/// Renders one `include` statement per class.
pub fn render_manifest(classes: &[String]) -> String {
    classes
        .iter()
        .map(|class| format!("include {}\n", class))
        .collect()
}
