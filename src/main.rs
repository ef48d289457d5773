//! kitchen-puppet CLI
//!
//! Builds a puppet apply sandbox for one instance and prints the sandbox
//! path and the remote commands. Transfer and execution are left to the
//! caller.

use std::path::PathBuf;

use kitchen_puppet::{Instance, Provisioner, ProvisionerConfig, PuppetApply};

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <project-root> <instance.yaml> [provisioner.toml]", args[0]);
        eprintln!("\nBuilds a local puppet apply sandbox and prints the remote commands.");
        eprintln!("\nEnvironment variables:");
        eprintln!("  RUST_LOG=debug  Show every staged path");
        std::process::exit(1);
    }

    let project_root = PathBuf::from(&args[1]);

    let instance = match Instance::load(&args[2]) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Failed to load instance: {}", e);
            std::process::exit(1);
        }
    };

    let config = match args.get(3) {
        Some(path) => match ProvisionerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load provisioner config: {}", e);
                std::process::exit(1);
            }
        },
        None => ProvisionerConfig::default(),
    };

    let mut provisioner = PuppetApply::new(config, project_root);

    let report = match provisioner.build(&instance) {
        Ok(report) => report.clone(),
        Err(e) => {
            eprintln!("Sandbox build failed: {}", e);
            std::process::exit(1);
        }
    };

    let commands = serde_json::json!({
        "install": provisioner.install_command().map(|c| c.render()),
        "init": provisioner.init_command().render(),
        "prepare": provisioner.prepare_command().map(|c| c.render()),
        "run": provisioner.run_command().render(),
        "run_exit_codes": provisioner.run_command_exit_codes(),
    });
    let output = serde_json::json!({
        "build": report,
        "commands": commands,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to render report: {}", e);
            std::process::exit(1);
        }
    }

    // Leave the sandbox on disk for the caller to transfer
    provisioner.keep_sandbox();
}
