//! Sandbox trait.

use std::path::Path;

use crate::error::Result;

/// An ephemeral local staging directory.
pub trait Sandbox: Send + Sync {
    /// Returns the root directory of the sandbox, or `None` once cleaned up.
    fn path(&self) -> Option<&Path>;

    /// Removes the sandbox and everything in it.
    ///
    /// Calling this when nothing is left to remove is not an error.
    fn cleanup(&mut self) -> Result<()>;
}
