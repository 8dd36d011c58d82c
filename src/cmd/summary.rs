//! Re-render the summary from disk (`apex-deploy summary`).

use anyhow::{Context, Result};
use std::path::Path;

use crate::Cli;

pub fn cmd_summary(cli: &Cli, project_dir: &Path, file: Option<&Path>) -> Result<()> {
    use apex_common::TopologyDescriptor;
    use apex_deploy::config::{DeployConfig, EnvOverrides};
    use apex_deploy::summary::print_summary;

    let path = match file {
        Some(path) => path.to_path_buf(),
        None => {
            DeployConfig::load(
                project_dir,
                cli.config.as_deref(),
                &EnvOverrides::from_env(),
            )?
            .topology_path
        }
    };

    let text = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "No topology descriptor at {}. Run 'apex-deploy deploy' first.",
            path.display()
        )
    })?;
    let descriptor = TopologyDescriptor::from_json(&text)
        .with_context(|| format!("Failed to parse topology descriptor: {}", path.display()))?;

    print_summary(&descriptor);
    Ok(())
}
