//! Remote shell command generation.
//!
//! Commands are built as argument vectors and only rendered to a single
//! shell string when handed to the transport.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ProvisionerConfig;
use crate::modules::MODULES_DIR;
use crate::staging::{remote_path, HIERA_CONFIG_FILE, MANIFEST_FILE};

/// Puppet exit code for a run with no changes.
pub const EXIT_NO_CHANGES: i32 = 0;

/// Puppet exit code for a run that applied changes (with `--detailed-exitcodes`).
pub const EXIT_CHANGES_APPLIED: i32 = 2;

/// Installs Puppet from the Puppet Labs apt repository on Debian-family hosts.
const PUPPET_REPO_INSTALL_SCRIPT: &str = r#"
if [ -e "/etc/debian_version" ]; then
  wget -O/tmp/puppet.deb http://apt.puppetlabs.com/puppetlabs-release-$(lsb_release -c -s).deb && \
    sudo dpkg -i /tmp/puppet.deb && \
    sudo apt-get update && \
    sudo apt-get -y install puppet
fi"#;

/// A command to run on the remote instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommand {
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    /// Run through `sudo -E`.
    pub sudo: bool,
}

impl RemoteCommand {
    /// Creates a command for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
            sudo: false,
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    /// Sets whether the command runs through sudo.
    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Renders the command as a single POSIX shell string.
    pub fn render(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.argv.len() + 2);
        if self.sudo {
            parts.push("sudo".to_string());
            parts.push("-E".to_string());
        }
        parts.extend(self.argv.iter().map(|arg| shell_quote(arg)));
        parts.join(" ")
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Quotes `arg` for a POSIX shell, leaving plain words untouched.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Removes any previous sandbox from the instance.
pub fn init_command(config: &ProvisionerConfig) -> RemoteCommand {
    RemoteCommand::new("rm")
        .arg("-rf")
        .arg(config.remote_root.trim_end_matches('/'))
        .with_sudo(config.sudo)
}

/// Installs Puppet, only when `require_puppet_repo` is set.
pub fn install_command(config: &ProvisionerConfig) -> Option<RemoteCommand> {
    if !config.require_puppet_repo {
        return None;
    }

    Some(
        RemoteCommand::new("bash")
            .arg("-l")
            .arg("-c")
            .arg(PUPPET_REPO_INSTALL_SCRIPT),
    )
}

/// Puppet apply needs no preparation once the sandbox is uploaded.
pub fn prepare_command(_config: &ProvisionerConfig) -> Option<RemoteCommand> {
    None
}

/// Runs `puppet apply` against the uploaded sandbox.
pub fn run_command(config: &ProvisionerConfig) -> RemoteCommand {
    let root = config.remote_root.as_str();
    let mut cmd = RemoteCommand::new("puppet")
        .arg("apply")
        .arg(remote_path(root, MANIFEST_FILE));

    if config.detailed_exitcodes {
        cmd = cmd.arg("--detailed-exitcodes");
    }

    cmd.arg(format!("--modulepath={}", remote_path(root, MODULES_DIR)))
        .arg(format!("--hiera_config={}", remote_path(root, HIERA_CONFIG_FILE)))
        .with_sudo(config.sudo)
}

/// Exit codes of [`run_command`] that count as success.
pub fn run_command_exit_codes(config: &ProvisionerConfig) -> Vec<i32> {
    if config.detailed_exitcodes {
        vec![EXIT_NO_CHANGES, EXIT_CHANGES_APPLIED]
    } else {
        vec![EXIT_NO_CHANGES]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_command_removes_remote_root() {
        let config = ProvisionerConfig::default();
        assert_eq!(
            init_command(&config).render(),
            "sudo -E rm -rf /tmp/kitchen-puppet-apply"
        );
    }

    #[test]
    fn init_command_without_sudo() {
        let config = ProvisionerConfig {
            sudo: false,
            ..Default::default()
        };
        assert_eq!(init_command(&config).render(), "rm -rf /tmp/kitchen-puppet-apply");
    }

    #[test]
    fn run_command_references_remote_paths() {
        let config = ProvisionerConfig::default();
        assert_eq!(
            run_command(&config).render(),
            "sudo -E puppet apply /tmp/kitchen-puppet-apply/base.pp --detailed-exitcodes \
             --modulepath=/tmp/kitchen-puppet-apply/modules \
             --hiera_config=/tmp/kitchen-puppet-apply/hiera.yaml"
        );
    }

    #[test]
    fn run_command_without_detailed_exitcodes() {
        let config = ProvisionerConfig {
            detailed_exitcodes: false,
            ..Default::default()
        };

        assert!(!run_command(&config).argv.iter().any(|a| a == "--detailed-exitcodes"));
        assert_eq!(run_command_exit_codes(&config), vec![0]);
    }

    #[test]
    fn changes_applied_counts_as_success() {
        let config = ProvisionerConfig::default();
        assert_eq!(run_command_exit_codes(&config), vec![0, 2]);
    }

    #[test]
    fn install_command_only_when_configured() {
        assert!(install_command(&ProvisionerConfig::default()).is_none());

        let config = ProvisionerConfig {
            require_puppet_repo: true,
            ..Default::default()
        };
        let cmd = install_command(&config).unwrap();
        assert_eq!(cmd.argv[..3], ["bash", "-l", "-c"]);
        assert!(cmd.argv[3].contains("apt-get -y install puppet"));
        assert!(cmd.render().starts_with("bash -l -c '"));
    }

    #[test]
    fn prepare_command_is_empty() {
        assert!(prepare_command(&ProvisionerConfig::default()).is_none());
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain-word"), "plain-word");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("a b"), "'a b'");
    }
}
