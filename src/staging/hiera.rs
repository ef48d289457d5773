//! Hiera configuration and data staging.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::Result;

/// Directory holding Hiera data files, relative to the sandbox root.
pub const HIERADATA_DIR: &str = "hieradata";

/// The single Hiera data file, relative to [`HIERADATA_DIR`].
pub const HIERA_DATA_FILE: &str = "base.yaml";

/// Hiera hierarchy descriptor, relative to the sandbox root.
pub const HIERA_CONFIG_FILE: &str = "hiera.yaml";

/// Writes `hiera.yaml` and `hieradata/base.yaml` into the sandbox.
///
/// `remote_root` is where the sandbox will live on the instance; the
/// descriptor's datadir points at its `hieradata` directory.
pub fn stage_hiera(sandbox: &Path, data: &Mapping, remote_root: &str) -> Result<()> {
    let data_dir = sandbox.join(HIERADATA_DIR);
    std::fs::create_dir_all(&data_dir)?;

    let data_path = data_dir.join(HIERA_DATA_FILE);
    let yaml = serde_yaml::to_string(&stringify_keys(data))?;
    std::fs::write(&data_path, yaml)?;

    let config_path = sandbox.join(HIERA_CONFIG_FILE);
    std::fs::write(&config_path, hiera_config(remote_root))?;

    tracing::debug!(
        data = ?data_path,
        config = ?config_path,
        keys = data.len(),
        "staged hiera"
    );

    Ok(())
}

/// Renders the hierarchy descriptor.
pub fn hiera_config(remote_root: &str) -> String {
    let datadir = remote_path(remote_root, HIERADATA_DIR);
    let level = HIERA_DATA_FILE.trim_end_matches(".yaml");

    format!(
        "---\n:backends:\n  - yaml\n\n:hierarchy:\n  - {}\n\n:yaml:\n  :datadir: {}\n",
        level, datadir
    )
}

/// Returns a copy of `data` with every top-level key coerced to a string.
///
/// Values are kept as-is, so nested structure is preserved.
pub fn stringify_keys(data: &Mapping) -> Mapping {
    data.iter()
        .map(|(k, v)| (Value::String(key_to_string(k)), v.clone()))
        .collect()
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Joins a path onto a remote (POSIX) root.
pub(crate) fn remote_path(root: &str, rel: &str) -> String {
    let root = root.trim_end_matches('/');
    format!("{}/{}", root, rel)
}

/// Returns the local path of the staged Hiera data file.
pub fn data_file(sandbox: &Path) -> PathBuf {
    sandbox.join(HIERADATA_DIR).join(HIERA_DATA_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn hiera_data_round_trips_with_string_keys() {
        let sandbox = TempDir::new().unwrap();
        let mut data = Mapping::new();
        data.insert(Value::from("db_host"), Value::from("localhost"));
        data.insert(Value::from("count"), Value::from(3));

        stage_hiera(sandbox.path(), &data, "/tmp/kitchen-puppet-apply").unwrap();

        let written = std::fs::read_to_string(data_file(sandbox.path())).unwrap();
        let parsed: Mapping = serde_yaml::from_str(&written).unwrap();
        assert_eq!(parsed, data);
        assert!(parsed.keys().all(Value::is_string));
    }

    #[test]
    fn non_string_keys_are_coerced() {
        let mut data = Mapping::new();
        data.insert(Value::from(80), Value::from("http"));
        data.insert(Value::from(true), Value::from("yes"));
        data.insert(Value::Null, Value::from("nothing"));

        let coerced = stringify_keys(&data);

        assert_eq!(coerced.get("80"), Some(&Value::from("http")));
        assert_eq!(coerced.get("true"), Some(&Value::from("yes")));
        assert_eq!(coerced.get(""), Some(&Value::from("nothing")));
    }

    #[test]
    fn nested_values_are_not_flattened() {
        let sandbox = TempDir::new().unwrap();
        let data: Mapping = serde_yaml::from_str(
            "apache:\n  vhosts:\n    - name: example.com\n      port: 80\n",
        )
        .unwrap();

        stage_hiera(sandbox.path(), &data, "/tmp/kitchen-puppet-apply").unwrap();

        let written = std::fs::read_to_string(data_file(sandbox.path())).unwrap();
        let parsed: Value = serde_yaml::from_str(&written).unwrap();
        assert_eq!(parsed["apache"]["vhosts"][0]["port"], Value::from(80));
    }

    #[test]
    fn hiera_config_points_at_remote_datadir() {
        let sandbox = TempDir::new().unwrap();
        stage_hiera(sandbox.path(), &Mapping::new(), "/tmp/kitchen-puppet-apply/").unwrap();

        let config = std::fs::read_to_string(sandbox.path().join(HIERA_CONFIG_FILE)).unwrap();
        let parsed: Value = serde_yaml::from_str(&config).unwrap();

        assert_eq!(parsed[":backends"], Value::Sequence(vec![Value::from("yaml")]));
        assert_eq!(parsed[":hierarchy"], Value::Sequence(vec![Value::from("base")]));
        assert_eq!(
            parsed[":yaml"][":datadir"],
            Value::from("/tmp/kitchen-puppet-apply/hieradata")
        );
    }

    #[test]
    fn empty_hiera_data_is_an_empty_mapping() {
        let sandbox = TempDir::new().unwrap();
        stage_hiera(sandbox.path(), &Mapping::new(), "/tmp/x").unwrap();

        let written = std::fs::read_to_string(data_file(sandbox.path())).unwrap();
        let parsed: Mapping = serde_yaml::from_str(&written).unwrap();
        assert!(parsed.is_empty());
    }
}
