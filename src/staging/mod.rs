//! Staging of the Hiera data and the entry-point manifest.

mod hiera;
mod manifest;

pub(crate) use hiera::remote_path;
pub use hiera::{
    data_file, hiera_config, stage_hiera, stringify_keys, HIERADATA_DIR, HIERA_CONFIG_FILE,
    HIERA_DATA_FILE,
};
pub use manifest::{render_manifest, stage_manifest, MANIFEST_FILE};
