//! The six standard deployment phases.
//!
//! Each step only plans: it turns configuration and earlier artifacts into
//! convergence actions plus progress notes. The sequencer runs the actions.

use apex_common::registry::{keys, ports};
use apex_common::{SkillsManifest, TopologyAssembler, endpoint_url};
use std::sync::Arc;

use crate::config::DeployConfig;
use crate::convergence::{
    ContainerSpec, EnsureContainer, EnsureJsonDocument, EnvValue, EnvVar, FailureClassifier,
    PortBinding, VolumeMount,
};
use crate::errors::DeployError;
use crate::phase::{Artifact, Phase, PhaseContext, PhaseKind, PhasePlan, PhaseStep};

/// Ports the graph image listens on inside the container.
const GRAPH_CONTAINER_HTTP: u16 = 7474;
const GRAPH_CONTAINER_BOLT: u16 = 7687;

/// Build the fixed phase list in execution order.
pub fn standard_phases() -> Vec<Phase> {
    PhaseKind::ALL
        .into_iter()
        .map(|kind| {
            let ordinal = kind.ordinal();
            match kind {
                PhaseKind::Foundation => Phase::new(ordinal, kind, FoundationStep),
                PhaseKind::Orchestration => Phase::new(ordinal, kind, OrchestrationStep),
                PhaseKind::Skills => Phase::new(ordinal, kind, SkillsStep),
                PhaseKind::Intelligence => Phase::new(ordinal, kind, IntelligenceStep),
                PhaseKind::Configuration => Phase::new(ordinal, kind, ConfigurationStep),
                PhaseKind::Monitoring => Phase::new(ordinal, kind, MonitoringStep),
            }
        })
        .collect()
}

fn http_url(config: &DeployConfig, port_key: &str) -> Option<String> {
    config
        .registry
        .ports
        .get(port_key)
        .map(|port| endpoint_url("http", &config.registry.host, port, ""))
}

/// Container launch for the graph database, built from registry ports and
/// graph settings.
pub fn graph_container_spec(config: &DeployConfig) -> ContainerSpec {
    let graph = &config.graph;
    let ports = [
        (ports::GRAPH_HTTP, GRAPH_CONTAINER_HTTP),
        (ports::GRAPH_BOLT, GRAPH_CONTAINER_BOLT),
    ]
    .into_iter()
    .filter_map(|(key, container)| {
        config
            .registry
            .ports
            .get(key)
            .map(|host| PortBinding { host, container })
    })
    .collect();

    let auth = format!(
        "{}/{}",
        graph.user,
        graph.password.expose().unwrap_or_default()
    );

    ContainerSpec {
        name: graph.container_name.clone(),
        image: graph.image.clone(),
        ports,
        env: vec![EnvVar {
            key: "NEO4J_AUTH".to_string(),
            value: EnvValue::Secret(apex_common::Secret::new(auth)),
        }],
        volumes: vec![VolumeMount {
            source: graph.volume.clone(),
            target: "/data".to_string(),
        }],
    }
}

/// Launches the graph database container.
pub struct FoundationStep;

impl PhaseStep for FoundationStep {
    fn plan(&self, ctx: &PhaseContext<'_>) -> Result<PhasePlan, DeployError> {
        let config = ctx.config;
        if config.graph.default_password {
            tracing::warn!(
                "Graph database is using the development password; set APEX_GRAPH_PASSWORD for real deployments"
            );
            ctx.ui.detail("graph database password: development default");
        }

        let spec = graph_container_spec(config);
        ctx.ui.detail(&spec.display(&config.container_cmd));

        let label = match config.registry.ports.get(ports::GRAPH_HTTP) {
            Some(port) => format!("Graph database '{}' on port {}", spec.name, port),
            None => format!("Graph database '{}'", spec.name),
        };
        let classifier: Arc<dyn FailureClassifier> = config.classifier.clone();
        let action = EnsureContainer::new(
            label,
            config.container_cmd.clone(),
            spec,
            classifier,
            config.container_timeout,
        );
        Ok(PhasePlan::new().action(action))
    }
}

/// Reports the orchestration layer. Nothing is provisioned.
pub struct OrchestrationStep;

impl PhaseStep for OrchestrationStep {
    fn plan(&self, ctx: &PhaseContext<'_>) -> Result<PhasePlan, DeployError> {
        let registry = &ctx.config.registry;
        let layers = &registry.layers;
        let mut plan = PhasePlan::new();
        if let Some(repo) = registry.label(keys::ORCHESTRATOR) {
            plan = plan.note(format!("{} configured", repo));
        }
        plan = plan.note(format!("{}+ API integrations ready", layers.api_integrations));
        for network in &layers.networks {
            plan = plan.note(format!("{} network connectivity established", network));
        }
        if let Some(repo) = registry.label(keys::ASPEN) {
            plan = plan.note(format!("{} bridging networks", repo));
        }
        Ok(plan)
    }
}

/// Builds the skills manifest and writes it to disk.
pub struct SkillsStep;

impl PhaseStep for SkillsStep {
    fn plan(&self, ctx: &PhaseContext<'_>) -> Result<PhasePlan, DeployError> {
        let config = ctx.config;
        let manifest = SkillsManifest::new(config.skills_categories.clone());
        let contents = manifest
            .to_json_pretty()
            .map_err(|source| DeployError::Serialization {
                document: "skills manifest".to_string(),
                source,
            })?;

        let action = EnsureJsonDocument::new(
            format!("Skills manifest {}", config.skills_manifest_path.display()),
            config.skills_manifest_path.clone(),
            contents,
        );

        Ok(PhasePlan::new()
            .action(action)
            .note(format!("{} skills exported", manifest.total_skills()))
            .note(format!(
                "{} categories integrated",
                manifest.category_count()
            ))
            .note("Skills available across all repos")
            .produces(Artifact::Skills(manifest)))
    }
}

/// Reports the intelligence layer. Nothing is provisioned.
pub struct IntelligenceStep;

impl PhaseStep for IntelligenceStep {
    fn plan(&self, ctx: &PhaseContext<'_>) -> Result<PhasePlan, DeployError> {
        let config = ctx.config;
        let mut plan = PhasePlan::new();
        for key in [keys::INTELLIGENCE, keys::FORENSICS] {
            if let Some(repo) = config.registry.label(key) {
                plan = plan.note(format!("{} active", repo));
            }
        }
        for capability in &config.registry.layers.capabilities {
            plan = plan.note(format!("{} enabled", capability));
        }
        if let Some(url) = http_url(config, ports::GRAPH_HTTP) {
            plan = plan.note(format!("Graph intelligence connected to {}", url));
        }
        Ok(plan)
    }
}

/// Assembles the topology descriptor from the registry and the skills total,
/// then writes it to disk.
pub struct ConfigurationStep;

impl PhaseStep for ConfigurationStep {
    fn plan(&self, ctx: &PhaseContext<'_>) -> Result<PhasePlan, DeployError> {
        let config = ctx.config;
        let skills = ctx
            .artifacts
            .skills
            .as_ref()
            .ok_or_else(|| DeployError::MissingArtifact {
                ordinal: PhaseKind::Configuration.ordinal(),
                phase: PhaseKind::Configuration.name().to_string(),
                artifact: "skills manifest".to_string(),
            })?;

        let descriptor = TopologyAssembler::new(&config.version, &config.mode)
            .assemble(&config.registry, skills.total_skills());
        let contents =
            descriptor
                .to_json_pretty()
                .map_err(|source| DeployError::Serialization {
                    document: "topology descriptor".to_string(),
                    source,
                })?;

        let path = &config.topology_path;
        let mut plan = PhasePlan::new()
            .action(EnsureJsonDocument::new(
                format!("Topology descriptor {}", path.display()),
                path.clone(),
                contents,
            ))
            .note(format!("Configuration saved to {}", path.display()));
        if let Some(api) = &descriptor.endpoints.apex_api {
            plan = plan.note(format!("API Gateway: {}", api));
        }
        if let Some(health) = &descriptor.endpoints.health {
            plan = plan.note(format!("Health Endpoint: {}", health));
        }
        Ok(plan.produces(Artifact::Topology(descriptor)))
    }
}

/// Reports monitoring endpoints taken from the assembled descriptor.
pub struct MonitoringStep;

impl PhaseStep for MonitoringStep {
    fn plan(&self, ctx: &PhaseContext<'_>) -> Result<PhasePlan, DeployError> {
        let descriptor =
            ctx.artifacts
                .topology
                .as_ref()
                .ok_or_else(|| DeployError::MissingArtifact {
                    ordinal: PhaseKind::Monitoring.ordinal(),
                    phase: PhaseKind::Monitoring.name().to_string(),
                    artifact: "topology descriptor".to_string(),
                })?;

        let mut plan = PhasePlan::new();
        if let Some(url) = &descriptor.monitoring.metrics {
            plan = plan.note(format!("Metrics collector ready at {}", url));
        }
        if let Some(url) = &descriptor.monitoring.dashboard {
            plan = plan.note(format!("Dashboard available at {}", url));
        }
        if let Some(url) = &descriptor.architecture.graph.http {
            plan = plan.note(format!("Graph browser available at {}", url));
        }
        Ok(plan)
    }
}
