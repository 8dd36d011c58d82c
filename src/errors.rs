//! Typed error hierarchy for the deployment orchestrator.
//!
//! Two enums cover the two failure surfaces:
//! - `ProcessError`: spawning and waiting on external tools
//! - `DeployError`: everything that stops a deployment

use std::path::PathBuf;
use thiserror::Error;

/// Errors from invoking an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn `{program}`: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` did not finish within {timeout_secs}s")]
    TimedOut { program: String, timeout_secs: u64 },

    #[error("Failed to wait for `{program}`: {source}")]
    WaitFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Missing required tools: {}", .missing.join(", "))]
    MissingPrerequisites { missing: Vec<String> },

    #[error("Action '{action}' failed: {detail}")]
    ConvergenceFailed { action: String, detail: String },

    #[error("Failed to write {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {document}: {source}")]
    Serialization {
        document: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Phase {ordinal} ({phase}) requires the {artifact} produced by an earlier phase")]
    MissingArtifact {
        ordinal: usize,
        phase: String,
        artifact: String,
    },

    #[error("Phase {ordinal} ({phase}) aborted: {source}")]
    PhaseAborted {
        ordinal: usize,
        phase: String,
        #[source]
        source: Box<DeployError>,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl DeployError {
    /// Name of the phase that aborted the sequence, if any.
    pub fn failed_phase(&self) -> Option<&str> {
        match self {
            DeployError::PhaseAborted { phase, .. } => Some(phase),
            _ => None,
        }
    }

    /// Innermost deployment error, unwrapping phase context.
    pub fn root(&self) -> &DeployError {
        match self {
            DeployError::PhaseAborted { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prerequisites_lists_every_tool() {
        let err = DeployError::MissingPrerequisites {
            missing: vec!["Docker".to_string(), "Git".to_string()],
        };
        assert_eq!(err.to_string(), "Missing required tools: Docker, Git");
    }

    #[test]
    fn persistence_carries_path() {
        let err = DeployError::Persistence {
            path: PathBuf::from("/readonly/apex_config.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        match &err {
            DeployError::Persistence { path, source } => {
                assert_eq!(path, &PathBuf::from("/readonly/apex_config.json"));
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected Persistence"),
        }
        assert!(err.to_string().contains("/readonly/apex_config.json"));
    }

    #[test]
    fn phase_aborted_exposes_phase_and_root() {
        let err = DeployError::PhaseAborted {
            ordinal: 1,
            phase: "foundation".to_string(),
            source: Box::new(DeployError::ConvergenceFailed {
                action: "graph database container".to_string(),
                detail: "permission denied".to_string(),
            }),
        };
        assert_eq!(err.failed_phase(), Some("foundation"));
        assert!(matches!(err.root(), DeployError::ConvergenceFailed { .. }));
        assert!(err.to_string().contains("Phase 1 (foundation) aborted"));
    }

    #[test]
    fn process_error_converts_into_deploy_error() {
        let inner = ProcessError::TimedOut {
            program: "docker".to_string(),
            timeout_secs: 5,
        };
        let err: DeployError = inner.into();
        assert!(matches!(
            err,
            DeployError::Process(ProcessError::TimedOut { timeout_secs: 5, .. })
        ));
        assert_eq!(err.to_string(), "`docker` did not finish within 5s");
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&DeployError::MissingPrerequisites { missing: vec![] });
        assert_std_error(&ProcessError::TimedOut {
            program: "git".into(),
            timeout_secs: 1,
        });
    }
}
