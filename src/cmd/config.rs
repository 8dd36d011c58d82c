//! Configuration view and validation commands (`apex-deploy config`).

use anyhow::Result;
use std::path::Path;

use crate::{Cli, ConfigCommands};

pub fn cmd_config(cli: &Cli, project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    use apex_deploy::config::{DeployConfig, EnvOverrides};
    use apex_deploy::deploy_config::{CONFIG_FILE_NAME, DeployToml};

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| project_dir.join(CONFIG_FILE_NAME));
    let env = EnvOverrides::from_env();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Apex Deployment Configuration");
            println!("=============================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No {} found; using defaults.", CONFIG_FILE_NAME);
            }
            println!();

            let config = DeployConfig::load(project_dir, cli.config.as_deref(), &env)?;

            println!("[project]");
            println!("  version = \"{}\"", config.version);
            println!("  mode = \"{}\"", config.mode);
            println!("  host = \"{}\"", config.registry.host);
            println!();

            println!("[output]");
            println!("  skills_manifest = {}", config.skills_manifest_path.display());
            println!("  topology = {}", config.topology_path.display());
            println!();

            println!("[runtime]");
            println!("  container_cmd = \"{}\"", config.container_cmd);
            println!(
                "  version_check_timeout_secs = {}",
                config.version_check_timeout.as_secs()
            );
            println!(
                "  container_timeout_secs = {}",
                config.container_timeout.as_secs()
            );
            println!();

            println!("[ports]");
            for (name, port) in config.registry.ports.iter() {
                println!("  {} = {}", name, port);
            }
            println!();

            println!("[prerequisites]");
            for tool in &config.registry.prerequisites {
                println!("  {} ({})", tool.name, tool.label);
            }
            println!();

            println!("[credentials]");
            for credential in &config.registry.credentials {
                let state = if credential.secret.is_present() {
                    "set"
                } else {
                    "not set"
                };
                println!("  {} = <{}>", credential.name, state);
            }
            println!();

            println!("[graph]");
            println!("  container_name = \"{}\"", config.graph.container_name);
            println!("  image = \"{}\"", config.graph.image);
            println!(
                "  password = <{}>",
                if config.graph.default_password {
                    "development default"
                } else {
                    "set"
                }
            );
            println!();

            if !config_path.exists() {
                println!("Run 'apex-deploy config init' to create {}.", CONFIG_FILE_NAME);
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let toml = if config_path.exists() {
                DeployToml::load(&config_path)?
            } else {
                println!("No {} found. Checking defaults.", CONFIG_FILE_NAME);
                DeployToml::default()
            };

            // patterns and timeouts must also survive resolution
            DeployConfig::from_toml(project_dir, toml.clone(), &env)?;

            let warnings = toml.validate(|var| env.is_set(var));
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists at {}", CONFIG_FILE_NAME, config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent)?;
            }

            DeployToml::default().save(&config_path)?;

            println!("Created {} at {}", CONFIG_FILE_NAME, config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [project] version, mode, host");
            println!("  - [ports] and [repos] for the target topology");
            println!("  - [credentials] logical name -> environment variable");
            println!("  - [graph] container name, image and password_env");
            println!();
        }
    }

    Ok(())
}
