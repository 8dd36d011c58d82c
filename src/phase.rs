//! Phase definitions for the deployment sequence.
//!
//! This module provides:
//! - `PhaseKind`, the six fixed phases in execution order
//! - `Phase`, a phase descriptor pairing a position with the step that plans it
//! - `PhaseStep`, the seam each phase implements
//! - `PhaseContext` and `Artifacts`, the state threaded between phases

use apex_common::{SkillsManifest, TopologyDescriptor};
use console::Emoji;
use std::fmt;

use crate::config::DeployConfig;
use crate::convergence::ConvergenceAction;
use crate::errors::DeployError;
use crate::process::CommandRunner;
use crate::ui::DeployUI;
use crate::ui::icons;

/// The fixed deployment phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Foundation,
    Orchestration,
    Skills,
    Intelligence,
    Configuration,
    Monitoring,
}

impl PhaseKind {
    /// All phases in execution order.
    pub const ALL: [PhaseKind; 6] = [
        PhaseKind::Foundation,
        PhaseKind::Orchestration,
        PhaseKind::Skills,
        PhaseKind::Intelligence,
        PhaseKind::Configuration,
        PhaseKind::Monitoring,
    ];

    /// 1-based position in the sequence.
    pub fn ordinal(self) -> usize {
        self as usize + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            PhaseKind::Foundation => "foundation",
            PhaseKind::Orchestration => "orchestration",
            PhaseKind::Skills => "skills",
            PhaseKind::Intelligence => "intelligence",
            PhaseKind::Configuration => "configuration",
            PhaseKind::Monitoring => "monitoring",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PhaseKind::Foundation => "Foundation Layer",
            PhaseKind::Orchestration => "Orchestration Layer",
            PhaseKind::Skills => "Skills Layer",
            PhaseKind::Intelligence => "Intelligence Layer",
            PhaseKind::Configuration => "Configuration Layer",
            PhaseKind::Monitoring => "Monitoring Layer",
        }
    }

    pub fn icon(self) -> &'static Emoji<'static, 'static> {
        match self {
            PhaseKind::Foundation => &icons::FOUNDATION,
            PhaseKind::Orchestration => &icons::ORCHESTRATION,
            PhaseKind::Skills => &icons::SKILLS,
            PhaseKind::Intelligence => &icons::INTELLIGENCE,
            PhaseKind::Configuration => &icons::CONFIGURATION,
            PhaseKind::Monitoring => &icons::MONITORING,
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for PhaseKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhaseKind::ALL
            .into_iter()
            .find(|k| k.name() == s.to_lowercase())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown phase '{}'. Valid phases: {}",
                    s,
                    PhaseKind::ALL.map(PhaseKind::name).join(", ")
                )
            })
    }
}

/// Output of one phase, committed to [`Artifacts`] only after the phase succeeds.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Skills(SkillsManifest),
    Topology(TopologyDescriptor),
}

/// Values produced by earlier phases and consumed by later ones.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    pub skills: Option<SkillsManifest>,
    pub topology: Option<TopologyDescriptor>,
}

impl Artifacts {
    pub fn commit(&mut self, artifact: Artifact) {
        match artifact {
            Artifact::Skills(manifest) => self.skills = Some(manifest),
            Artifact::Topology(descriptor) => self.topology = Some(descriptor),
        }
    }
}

/// Everything a phase may read while planning or executing.
pub struct PhaseContext<'a> {
    pub config: &'a DeployConfig,
    pub runner: &'a dyn CommandRunner,
    pub ui: &'a DeployUI,
    pub artifacts: Artifacts,
}

impl<'a> PhaseContext<'a> {
    pub fn new(config: &'a DeployConfig, runner: &'a dyn CommandRunner, ui: &'a DeployUI) -> Self {
        Self {
            config,
            runner,
            ui,
            artifacts: Artifacts::default(),
        }
    }
}

/// What a phase intends to do: actions to converge, lines to report once they
/// succeed, and artifacts to hand to later phases.
#[derive(Default)]
pub struct PhasePlan {
    pub actions: Vec<Box<dyn ConvergenceAction>>,
    pub notes: Vec<String>,
    pub produces: Vec<Artifact>,
}

impl PhasePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, action: impl ConvergenceAction + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn produces(mut self, artifact: Artifact) -> Self {
        self.produces.push(artifact);
        self
    }
}

/// Plans the work of one phase. Execution is left to the sequencer.
pub trait PhaseStep: Send + Sync {
    fn plan(&self, ctx: &PhaseContext<'_>) -> Result<PhasePlan, DeployError>;
}

/// A phase descriptor: position, identity and the step that plans it.
pub struct Phase {
    pub ordinal: usize,
    pub kind: PhaseKind,
    step: Box<dyn PhaseStep>,
}

impl Phase {
    pub fn new(ordinal: usize, kind: PhaseKind, step: impl PhaseStep + 'static) -> Self {
        Self {
            ordinal,
            kind,
            step: Box::new(step),
        }
    }

    pub fn plan(&self, ctx: &PhaseContext<'_>) -> Result<PhasePlan, DeployError> {
        self.step.plan(ctx)
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("ordinal", &self.ordinal)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
