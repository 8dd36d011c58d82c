//! Prerequisite check only (`apex-deploy check`).

use anyhow::Result;
use std::path::Path;

use crate::Cli;

pub async fn cmd_check(cli: &Cli, project_dir: &Path) -> Result<()> {
    use apex_deploy::config::{DeployConfig, EnvOverrides};
    use apex_deploy::deploy::check_prerequisites;
    use apex_deploy::process::SystemRunner;
    use apex_deploy::ui::DeployUI;

    let config = DeployConfig::load(
        project_dir,
        cli.config.as_deref(),
        &EnvOverrides::from_env(),
    )?;
    let ui = DeployUI::new(0, cli.verbose);

    check_prerequisites(&config, &SystemRunner, &ui).await?;
    Ok(())
}
