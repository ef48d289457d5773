//! Puppet module resolution for the sandbox.
//!
//! [`resolve_modules`] picks one of three strategies based on what the
//! project root contains, and [`filter_module_files`] prunes the result
//! down to files Puppet actually loads.

mod filter;
mod modulefile;
mod resolve;
mod resolver;

pub use filter::{filter_module_files, module_files_glob, MODULE_FILE_PATTERNS};
pub use modulefile::{ModuleDependency, Modulefile, MODULEFILE};
pub use resolve::{
    copy_project_module, resolve_modules, select_strategy, ResolutionStrategy, MODULES_DIR,
};
pub use resolver::{
    LibrarianPuppet, ModuleResolver, ResolutionCoordinator, ResolverEnvironment, PUPPETFILE,
};
