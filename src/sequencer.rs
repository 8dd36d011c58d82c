//! Runs phases strictly in order, one at a time.
//!
//! A phase's artifacts become visible to later phases only after every action
//! in it has converged. The first failure stops the sequence; nothing after
//! the failing phase is planned or executed.

use std::time::{Duration, Instant};

use crate::convergence::{ActionOutcome, ConvergenceResult};
use crate::errors::DeployError;
use crate::phase::{Phase, PhaseContext};

/// Where the sequence stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceState {
    NotStarted,
    Running { index: usize },
    Completed,
    Aborted {
        index: usize,
        phase: String,
        error: String,
    },
}

impl SequenceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SequenceState::Completed | SequenceState::Aborted { .. })
    }
}

/// What one completed phase did.
#[derive(Debug, Clone)]
pub struct PhaseRecord {
    pub ordinal: usize,
    pub phase: &'static str,
    pub outcomes: Vec<ActionOutcome>,
    pub elapsed: Duration,
}

pub struct PhaseSequencer {
    phases: Vec<Phase>,
    state: SequenceState,
    records: Vec<PhaseRecord>,
}

impl PhaseSequencer {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self {
            phases,
            state: SequenceState::NotStarted,
            records: Vec::new(),
        }
    }

    pub fn state(&self) -> &SequenceState {
        &self.state
    }

    /// Records for phases that completed during the last run.
    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    /// Execute every phase in order.
    ///
    /// Returns `DeployError::PhaseAborted` wrapping the first failure.
    pub async fn run(&mut self, ctx: &mut PhaseContext<'_>) -> Result<(), DeployError> {
        self.records.clear();

        for index in 0..self.phases.len() {
            self.state = SequenceState::Running { index };
            let phase = &self.phases[index];
            tracing::info!(ordinal = phase.ordinal, phase = %phase.kind, "phase started");

            match Self::run_phase(phase, ctx).await {
                Ok(record) => {
                    tracing::info!(
                        ordinal = phase.ordinal,
                        phase = %phase.kind,
                        elapsed = ?record.elapsed,
                        "phase completed"
                    );
                    self.records.push(record);
                }
                Err(err) => {
                    tracing::error!(
                        ordinal = phase.ordinal,
                        phase = %phase.kind,
                        error = %err,
                        "phase aborted"
                    );
                    ctx.ui
                        .phase_aborted(phase.ordinal, phase.kind.title(), &err.to_string());
                    self.state = SequenceState::Aborted {
                        index,
                        phase: phase.kind.name().to_string(),
                        error: err.to_string(),
                    };
                    return Err(DeployError::PhaseAborted {
                        ordinal: phase.ordinal,
                        phase: phase.kind.name().to_string(),
                        source: Box::new(err),
                    });
                }
            }
        }

        self.state = SequenceState::Completed;
        Ok(())
    }

    async fn run_phase(
        phase: &Phase,
        ctx: &mut PhaseContext<'_>,
    ) -> Result<PhaseRecord, DeployError> {
        let started = Instant::now();
        ctx.ui
            .start_phase(phase.ordinal, phase.kind.title(), phase.kind.icon());

        let plan = phase.plan(ctx)?;
        let mut outcomes = Vec::with_capacity(plan.actions.len());

        for action in &plan.actions {
            let result = action.converge(ctx.runner).await?;
            let outcome = ActionOutcome {
                action: action.name().to_string(),
                result,
            };
            ctx.ui.action_result(&outcome);

            match &outcome.result {
                ConvergenceResult::Created => {
                    tracing::info!(
                        action = %outcome.action,
                        result = outcome.result.as_str(),
                        "action converged"
                    );
                }
                ConvergenceResult::AlreadyPresent => {
                    tracing::warn!(
                        action = %outcome.action,
                        result = outcome.result.as_str(),
                        "already present, continuing"
                    );
                }
                ConvergenceResult::Failed(detail) => {
                    return Err(DeployError::ConvergenceFailed {
                        action: outcome.action.clone(),
                        detail: detail.clone(),
                    });
                }
            }
            outcomes.push(outcome);
        }

        for note in &plan.notes {
            ctx.ui.note(note);
        }
        for artifact in plan.produces {
            ctx.artifacts.commit(artifact);
        }
        ctx.ui.phase_complete(phase.kind.title());

        Ok(PhaseRecord {
            ordinal: phase.ordinal,
            phase: phase.kind.name(),
            outcomes,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeployConfig, EnvOverrides};
    use crate::convergence::ConvergenceAction;
    use crate::errors::ProcessError;
    use crate::phase::{PhaseKind, PhasePlan, PhaseStep};
    use crate::phases::standard_phases;
    use crate::process::CommandRunner;
    use crate::process::mock::{Reply, ScriptedRunner};
    use crate::ui::DeployUI;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recording {
        name: String,
        journal: Journal,
        result: ConvergenceResult,
    }

    #[async_trait]
    impl ConvergenceAction for Recording {
        fn name(&self) -> &str {
            &self.name
        }

        async fn converge(
            &self,
            _runner: &dyn CommandRunner,
        ) -> Result<ConvergenceResult, DeployError> {
            self.journal.lock().unwrap().push(self.name.clone());
            Ok(self.result.clone())
        }
    }

    struct RecordingStep {
        journal: Journal,
        actions: Vec<(&'static str, ConvergenceResult)>,
    }

    impl PhaseStep for RecordingStep {
        fn plan(&self, _ctx: &PhaseContext<'_>) -> Result<PhasePlan, DeployError> {
            let mut plan = PhasePlan::new();
            for (name, result) in &self.actions {
                plan = plan.action(Recording {
                    name: name.to_string(),
                    journal: self.journal.clone(),
                    result: result.clone(),
                });
            }
            Ok(plan)
        }
    }

    fn recording_phases(
        journal: &Journal,
        per_phase: Vec<Vec<(&'static str, ConvergenceResult)>>,
    ) -> Vec<Phase> {
        PhaseKind::ALL
            .into_iter()
            .zip(per_phase)
            .map(|(kind, actions)| {
                Phase::new(
                    kind.ordinal(),
                    kind,
                    RecordingStep {
                        journal: journal.clone(),
                        actions,
                    },
                )
            })
            .collect()
    }

    fn test_config(dir: &std::path::Path) -> DeployConfig {
        DeployConfig::load(dir, None, &EnvOverrides::default()).unwrap()
    }

    #[tokio::test]
    async fn actions_run_in_phase_then_declaration_order() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let runner = ScriptedRunner::new();
        let ui = DeployUI::quiet(6);
        let journal: Journal = Arc::default();

        let per_phase = vec![
            vec![("1a", ConvergenceResult::Created), ("1b", ConvergenceResult::Created)],
            vec![],
            vec![("3a", ConvergenceResult::AlreadyPresent)],
            vec![("4a", ConvergenceResult::Created)],
            vec![],
            vec![("6a", ConvergenceResult::Created)],
        ];
        let mut sequencer = PhaseSequencer::new(recording_phases(&journal, per_phase));
        let mut ctx = PhaseContext::new(&config, &runner, &ui);

        sequencer.run(&mut ctx).await.unwrap();

        assert_eq!(*journal.lock().unwrap(), vec!["1a", "1b", "3a", "4a", "6a"]);
        assert_eq!(sequencer.state(), &SequenceState::Completed);
        assert_eq!(sequencer.records().len(), 6);
        assert_eq!(
            sequencer.records()[2].outcomes[0].result,
            ConvergenceResult::AlreadyPresent
        );
    }

    #[tokio::test]
    async fn failed_action_aborts_remaining_phases() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let runner = ScriptedRunner::new();
        let ui = DeployUI::quiet(6);
        let journal: Journal = Arc::default();

        let per_phase = vec![
            vec![("1a", ConvergenceResult::Created)],
            vec![
                ("2a", ConvergenceResult::Failed("permission denied".to_string())),
                ("2b", ConvergenceResult::Created),
            ],
            vec![("3a", ConvergenceResult::Created)],
            vec![],
            vec![],
            vec![],
        ];
        let mut sequencer = PhaseSequencer::new(recording_phases(&journal, per_phase));
        let mut ctx = PhaseContext::new(&config, &runner, &ui);

        let err = sequencer.run(&mut ctx).await.unwrap_err();

        assert_eq!(*journal.lock().unwrap(), vec!["1a", "2a"]);
        assert_eq!(err.failed_phase(), Some("orchestration"));
        match err.root() {
            DeployError::ConvergenceFailed { action, detail } => {
                assert_eq!(action, "2a");
                assert_eq!(detail, "permission denied");
            }
            other => panic!("Expected ConvergenceFailed, got {:?}", other),
        }
        match sequencer.state() {
            SequenceState::Aborted { index, phase, .. } => {
                assert_eq!(*index, 1);
                assert_eq!(phase, "orchestration");
            }
            other => panic!("Expected Aborted, got {:?}", other),
        }
        assert_eq!(sequencer.records().len(), 1);
    }

    #[tokio::test]
    async fn foundation_failure_writes_no_documents() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let runner = ScriptedRunner::new().on(
            "docker run",
            Reply::fail(126, "permission denied while trying to connect to the Docker daemon"),
        );
        let ui = DeployUI::quiet(6);
        let mut sequencer = PhaseSequencer::new(standard_phases());
        let mut ctx = PhaseContext::new(&config, &runner, &ui);

        let err = sequencer.run(&mut ctx).await.unwrap_err();

        assert_eq!(err.failed_phase(), Some("foundation"));
        assert!(!config.skills_manifest_path.exists());
        assert!(!config.topology_path.exists());
        assert!(ctx.artifacts.skills.is_none());
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn container_timeout_aborts_foundation() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let runner = ScriptedRunner::new().on("docker run", Reply::TimedOut);
        let ui = DeployUI::quiet(6);
        let mut sequencer = PhaseSequencer::new(standard_phases());
        let mut ctx = PhaseContext::new(&config, &runner, &ui);

        let err = sequencer.run(&mut ctx).await.unwrap_err();

        assert_eq!(err.failed_phase(), Some("foundation"));
        assert!(matches!(
            err.root(),
            DeployError::Process(ProcessError::TimedOut { .. })
        ));
        match sequencer.state() {
            SequenceState::Aborted { index, phase, .. } => {
                assert_eq!(*index, 0);
                assert_eq!(phase, "foundation");
            }
            other => panic!("Expected Aborted, got {:?}", other),
        }
        assert!(sequencer.records().is_empty());
        assert!(!config.skills_manifest_path.exists());
        assert!(!config.topology_path.exists());
    }

    #[tokio::test]
    async fn persistence_error_stops_later_phases() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        // a directory where the manifest should go makes the write fail
        std::fs::create_dir_all(&config.skills_manifest_path).unwrap();
        let runner = ScriptedRunner::new();
        let ui = DeployUI::quiet(6);
        let mut sequencer = PhaseSequencer::new(standard_phases());
        let mut ctx = PhaseContext::new(&config, &runner, &ui);

        let err = sequencer.run(&mut ctx).await.unwrap_err();

        assert_eq!(err.failed_phase(), Some("skills"));
        match err.root() {
            DeployError::Persistence { path, .. } => {
                assert_eq!(path, &config.skills_manifest_path)
            }
            other => panic!("Expected Persistence, got {:?}", other),
        }
        let completed: Vec<&str> = sequencer.records().iter().map(|r| r.phase).collect();
        assert_eq!(completed, vec!["foundation", "orchestration"]);
        assert!(ctx.artifacts.skills.is_none());
        assert!(ctx.artifacts.topology.is_none());
        assert!(!config.topology_path.exists());
    }

    #[tokio::test]
    async fn rerun_converges_to_already_present() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let ui = DeployUI::quiet(6);

        let first_runner = ScriptedRunner::new();
        let mut first = PhaseSequencer::new(standard_phases());
        let mut ctx = PhaseContext::new(&config, &first_runner, &ui);
        first.run(&mut ctx).await.unwrap();
        let first_topology = std::fs::read_to_string(&config.topology_path).unwrap();

        let second_runner = ScriptedRunner::new().on(
            "docker run",
            Reply::fail(
                125,
                "Conflict. The container name \"/apex-neo4j\" is already in use",
            ),
        );
        let mut second = PhaseSequencer::new(standard_phases());
        let mut ctx = PhaseContext::new(&config, &second_runner, &ui);
        second.run(&mut ctx).await.unwrap();

        let results: Vec<&ConvergenceResult> = second
            .records()
            .iter()
            .flat_map(|r| r.outcomes.iter().map(|o| &o.result))
            .collect();
        assert_eq!(results.len(), 3);
        assert!(
            results
                .iter()
                .all(|r| **r == ConvergenceResult::AlreadyPresent)
        );
        assert_eq!(
            std::fs::read_to_string(&config.topology_path).unwrap(),
            first_topology
        );
    }

    #[tokio::test]
    async fn artifacts_flow_from_skills_to_configuration() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let runner = ScriptedRunner::new();
        let ui = DeployUI::quiet(6);
        let mut sequencer = PhaseSequencer::new(standard_phases());
        let mut ctx = PhaseContext::new(&config, &runner, &ui);

        sequencer.run(&mut ctx).await.unwrap();

        let skills = ctx.artifacts.skills.as_ref().unwrap();
        let topology = ctx.artifacts.topology.as_ref().unwrap();
        assert_eq!(topology.architecture.execution.skills, skills.total_skills());
        assert!(sequencer.state().is_terminal());
    }
}
