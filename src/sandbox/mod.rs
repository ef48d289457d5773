//! Local sandbox directories staged before transfer to an instance.
//!
//! This module provides the [`Sandbox`] trait and the [`LocalSandbox`]
//! implementation backed by a uniquely named temp directory.

mod local;
mod provider;

pub use local::LocalSandbox;
pub use provider::Sandbox;
