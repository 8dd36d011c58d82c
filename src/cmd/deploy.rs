//! Full deployment (`apex-deploy deploy`).

use anyhow::Result;
use std::io::IsTerminal;
use std::path::Path;

use crate::Cli;

pub async fn cmd_deploy(cli: &Cli, project_dir: &Path) -> Result<()> {
    use apex_deploy::config::{DeployConfig, EnvOverrides};
    use apex_deploy::deploy::deploy;
    use apex_deploy::phase::PhaseKind;
    use apex_deploy::process::SystemRunner;
    use apex_deploy::summary::{print_completion, print_summary};
    use apex_deploy::ui::DeployUI;

    let config = DeployConfig::load(
        project_dir,
        cli.config.as_deref(),
        &EnvOverrides::from_env(),
    )?;
    tracing::debug!(?config, "configuration resolved");

    if !confirm(cli, &config)? {
        println!("Deployment cancelled");
        return Ok(());
    }

    let ui = DeployUI::new(PhaseKind::ALL.len() as u64, cli.verbose);
    ui.print_banner(
        "APEX NEXUS SUPREME - Deployment Initiating",
        &format!(
            "{} components, graph intelligence on {}",
            config.registry.components.len(),
            config.registry.host
        ),
    );

    let descriptor = deploy(&config, &SystemRunner, &ui).await?;
    print_summary(&descriptor);
    print_completion(&config.topology_path);
    Ok(())
}

fn confirm(cli: &Cli, config: &apex_deploy::config::DeployConfig) -> Result<bool> {
    use dialoguer::Confirm;

    if cli.yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        anyhow::bail!(
            "Refusing to deploy without confirmation: stdin is not a terminal. Re-run with --yes."
        );
    }

    let prompt = format!(
        "Deploy to {} with '{}' and write {}?",
        config.registry.host,
        config.container_cmd,
        config.output_dir.display()
    );
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false))
}
