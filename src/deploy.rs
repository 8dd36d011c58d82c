//! Top-level deployment flow: prerequisite gate, then the phase sequence.

use apex_common::TopologyDescriptor;

use crate::config::DeployConfig;
use crate::errors::DeployError;
use crate::phase::{PhaseContext, PhaseKind};
use crate::phases::standard_phases;
use crate::prereq::{PrerequisiteChecker, PrerequisiteReport};
use crate::process::CommandRunner;
use crate::sequencer::PhaseSequencer;
use crate::ui::DeployUI;

/// Probe every declared tool and print the report.
///
/// Returns `MissingPrerequisites` when any tool is absent.
pub async fn check_prerequisites(
    config: &DeployConfig,
    runner: &dyn CommandRunner,
    ui: &DeployUI,
) -> Result<PrerequisiteReport, DeployError> {
    ui.print_prerequisites_header();
    let report = PrerequisiteChecker::new(runner, config.version_check_timeout)
        .check(&config.registry.prerequisites)
        .await;
    ui.print_prerequisite_report(&report);
    report.into_result()
}

/// Run all phases and return the descriptor the configuration phase produced.
pub async fn run_phases(
    config: &DeployConfig,
    runner: &dyn CommandRunner,
    ui: &DeployUI,
) -> Result<TopologyDescriptor, DeployError> {
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|source| DeployError::Persistence {
            path: config.output_dir.clone(),
            source,
        })?;

    let mut sequencer = PhaseSequencer::new(standard_phases());
    let mut ctx = PhaseContext::new(config, runner, ui);

    ui.start_sequence();
    let result = sequencer.run(&mut ctx).await;
    ui.finish(result.is_ok());
    result?;

    let PhaseContext { artifacts, .. } = ctx;
    artifacts.topology.ok_or_else(|| DeployError::MissingArtifact {
        ordinal: PhaseKind::ALL.len(),
        phase: "summary".to_string(),
        artifact: "topology descriptor".to_string(),
    })
}

/// Gate on prerequisites, then deploy. No phase runs if the gate fails.
pub async fn deploy(
    config: &DeployConfig,
    runner: &dyn CommandRunner,
    ui: &DeployUI,
) -> Result<TopologyDescriptor, DeployError> {
    check_prerequisites(config, runner, ui).await?;
    let descriptor = run_phases(config, runner, ui).await?;
    tracing::info!(
        topology = %config.topology_path.display(),
        repositories = descriptor.repositories().len(),
        "deployment complete"
    );
    Ok(descriptor)
}
