//! Convergence actions: idempotent attempts to bring one external resource
//! into a desired state.
//!
//! An action never decides on its own whether a failed invocation means "the
//! resource is already there". That call belongs to a [`FailureClassifier`],
//! so the matching heuristic can be swapped and tested in isolation.

use apex_common::Secret;
use async_trait::async_trait;
use regex::{RegexSet, RegexSetBuilder};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::DeployError;
use crate::process::{CommandOutput, CommandRunner};

/// Patterns treated as "the resource already exists" when no others are configured.
pub const DEFAULT_ALREADY_EXISTS_PATTERNS: &[&str] = &["already in use", "already exists"];

/// Outcome of one convergence action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    Created,
    /// Desired state already held; not a failure
    AlreadyPresent,
    Failed(String),
}

impl ConvergenceResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, ConvergenceResult::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConvergenceResult::Created => "created",
            ConvergenceResult::AlreadyPresent => "already_present",
            ConvergenceResult::Failed(_) => "failed",
        }
    }
}

/// Maps a finished invocation to a [`ConvergenceResult`].
pub trait FailureClassifier: Send + Sync {
    fn classify(&self, output: &CommandOutput) -> ConvergenceResult;
}

/// Classifies a non-zero exit as `AlreadyPresent` when stderr or stdout
/// matches one of a set of case-insensitive patterns.
#[derive(Debug, Clone)]
pub struct AlreadyExistsClassifier {
    patterns: RegexSet,
}

impl AlreadyExistsClassifier {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.patterns.is_match(text)
    }
}

impl Default for AlreadyExistsClassifier {
    fn default() -> Self {
        let escaped: Vec<String> = DEFAULT_ALREADY_EXISTS_PATTERNS
            .iter()
            .map(|p| regex::escape(p))
            .collect();
        Self {
            patterns: RegexSetBuilder::new(escaped)
                .case_insensitive(true)
                .build()
                .expect("escaped literal patterns always compile"),
        }
    }
}

impl FailureClassifier for AlreadyExistsClassifier {
    fn classify(&self, output: &CommandOutput) -> ConvergenceResult {
        if output.success() {
            ConvergenceResult::Created
        } else if self.matches(&output.stderr) || self.matches(&output.stdout) {
            ConvergenceResult::AlreadyPresent
        } else {
            ConvergenceResult::Failed(output.diagnostic())
        }
    }
}

/// A single idempotent unit of work.
///
/// `Ok(Failed(..))` means the target system refused; `Err` means the
/// orchestrator itself could not carry out the attempt. Both are fatal to the
/// sequence.
#[async_trait]
pub trait ConvergenceAction: Send + Sync {
    fn name(&self) -> &str;

    async fn converge(&self, runner: &dyn CommandRunner)
    -> Result<ConvergenceResult, DeployError>;
}

/// Outcome recorded per executed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: String,
    pub result: ConvergenceResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBinding {
    pub host: u16,
    pub container: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    Plain(String),
    Secret(Secret),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub key: String,
    pub value: EnvValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
}

/// A detached, named container launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub ports: Vec<PortBinding>,
    pub env: Vec<EnvVar>,
    pub volumes: Vec<VolumeMount>,
}

impl ContainerSpec {
    /// Arguments for `<runtime> run`, secrets included.
    pub fn run_args(&self) -> Vec<String> {
        self.build_args(|value| match value {
            EnvValue::Plain(v) => v.clone(),
            EnvValue::Secret(s) => s.expose().unwrap_or_default().to_string(),
        })
    }

    /// Printable command line with secret values replaced by `***`.
    pub fn display(&self, runtime: &str) -> String {
        let args = self.build_args(|value| match value {
            EnvValue::Plain(v) => v.clone(),
            EnvValue::Secret(_) => "***".to_string(),
        });
        format!("{} {}", runtime, args.join(" "))
    }

    fn build_args(&self, render: impl Fn(&EnvValue) -> String) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            self.name.clone(),
        ];
        for port in &self.ports {
            args.push("-p".to_string());
            args.push(format!("{}:{}", port.host, port.container));
        }
        for var in &self.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", var.key, render(&var.value)));
        }
        for volume in &self.volumes {
            args.push("-v".to_string());
            args.push(format!("{}:{}", volume.source, volume.target));
        }
        args.push(self.image.clone());
        args
    }
}

/// Ensure a named container is running.
pub struct EnsureContainer {
    label: String,
    runtime: String,
    spec: ContainerSpec,
    classifier: Arc<dyn FailureClassifier>,
    limit: Duration,
}

impl EnsureContainer {
    pub fn new(
        label: impl Into<String>,
        runtime: impl Into<String>,
        spec: ContainerSpec,
        classifier: Arc<dyn FailureClassifier>,
        limit: Duration,
    ) -> Self {
        Self {
            label: label.into(),
            runtime: runtime.into(),
            spec,
            classifier,
            limit,
        }
    }
}

#[async_trait]
impl ConvergenceAction for EnsureContainer {
    fn name(&self) -> &str {
        &self.label
    }

    async fn converge(
        &self,
        runner: &dyn CommandRunner,
    ) -> Result<ConvergenceResult, DeployError> {
        tracing::debug!(command = %self.spec.display(&self.runtime), "launching container");
        let output = runner
            .run(&self.runtime, &self.spec.run_args(), self.limit)
            .await?;
        Ok(self.classifier.classify(&output))
    }
}

/// Ensure a file holds exactly the given JSON text.
pub struct EnsureJsonDocument {
    label: String,
    path: PathBuf,
    contents: String,
}

impl EnsureJsonDocument {
    pub fn new(label: impl Into<String>, path: PathBuf, contents: String) -> Self {
        Self {
            label: label.into(),
            path,
            contents,
        }
    }
}

#[async_trait]
impl ConvergenceAction for EnsureJsonDocument {
    fn name(&self) -> &str {
        &self.label
    }

    async fn converge(
        &self,
        _runner: &dyn CommandRunner,
    ) -> Result<ConvergenceResult, DeployError> {
        if let Ok(existing) = tokio::fs::read_to_string(&self.path).await
            && existing == self.contents
        {
            return Ok(ConvergenceResult::AlreadyPresent);
        }

        tokio::fs::write(&self.path, &self.contents)
            .await
            .map_err(|source| DeployError::Persistence {
                path: self.path.clone(),
                source,
            })?;
        Ok(ConvergenceResult::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::{Reply, ScriptedRunner};
    use tempfile::tempdir;

    fn failed(code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            code: Some(code),
            stderr: stderr.to_string(),
            ..Default::default()
        }
    }

    fn graph_spec() -> ContainerSpec {
        ContainerSpec {
            name: "apex-neo4j".to_string(),
            image: "neo4j:latest".to_string(),
            ports: vec![
                PortBinding {
                    host: 7474,
                    container: 7474,
                },
                PortBinding {
                    host: 7687,
                    container: 7687,
                },
            ],
            env: vec![EnvVar {
                key: "NEO4J_AUTH".to_string(),
                value: EnvValue::Secret(Secret::new("neo4j/hunter22")),
            }],
            volumes: vec![VolumeMount {
                source: "apex_neo4j_data".to_string(),
                target: "/data".to_string(),
            }],
        }
    }

    #[test]
    fn classifier_success_is_created() {
        let ok = CommandOutput {
            code: Some(0),
            ..Default::default()
        };
        assert_eq!(
            AlreadyExistsClassifier::default().classify(&ok),
            ConvergenceResult::Created
        );
    }

    #[test]
    fn classifier_detects_name_conflict() {
        let out = failed(
            125,
            "docker: Error response from daemon: Conflict. The container name \"/apex-neo4j\" is already in use by container \"abc\".",
        );
        assert_eq!(
            AlreadyExistsClassifier::default().classify(&out),
            ConvergenceResult::AlreadyPresent
        );
    }

    #[test]
    fn classifier_is_case_insensitive() {
        let out = failed(1, "Volume ALREADY EXISTS");
        assert_eq!(
            AlreadyExistsClassifier::default().classify(&out),
            ConvergenceResult::AlreadyPresent
        );
    }

    #[test]
    fn classifier_keeps_raw_diagnostic_on_other_failures() {
        let out = failed(126, "permission denied while trying to connect\n");
        assert_eq!(
            AlreadyExistsClassifier::default().classify(&out),
            ConvergenceResult::Failed("permission denied while trying to connect".to_string())
        );
    }

    #[test]
    fn classifier_accepts_custom_patterns() {
        let classifier = AlreadyExistsClassifier::new([r"port \d+ is allocated"]).unwrap();
        assert_eq!(
            classifier.classify(&failed(125, "Bind for 0.0.0.0:7474 failed: port 7474 is allocated")),
            ConvergenceResult::AlreadyPresent
        );
        assert!(classifier.classify(&failed(125, "already in use")).is_failed());
    }

    #[test]
    fn classifier_rejects_invalid_patterns() {
        assert!(AlreadyExistsClassifier::new(["(unclosed"]).is_err());
    }

    #[test]
    fn container_args_embed_secret_but_display_redacts() {
        let spec = graph_spec();
        let args = spec.run_args();
        assert_eq!(&args[..4], &["run", "-d", "--name", "apex-neo4j"]);
        assert!(args.contains(&"7474:7474".to_string()));
        assert!(args.contains(&"NEO4J_AUTH=neo4j/hunter22".to_string()));
        assert!(args.contains(&"apex_neo4j_data:/data".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("neo4j:latest"));

        let shown = spec.display("docker");
        assert!(shown.starts_with("docker run -d"));
        assert!(shown.contains("NEO4J_AUTH=***"));
        assert!(!shown.contains("hunter22"));
    }

    #[tokio::test]
    async fn ensure_container_reports_already_present() {
        let runner = ScriptedRunner::new().on(
            "docker run",
            Reply::fail(125, "Conflict. The container name is already in use"),
        );
        let action = EnsureContainer::new(
            "graph database",
            "docker",
            graph_spec(),
            Arc::new(AlreadyExistsClassifier::default()),
            Duration::from_secs(5),
        );
        let result = action.converge(&runner).await.unwrap();
        assert_eq!(result, ConvergenceResult::AlreadyPresent);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn ensure_container_surfaces_timeout_as_error() {
        let runner = ScriptedRunner::new().on("docker", Reply::TimedOut);
        let action = EnsureContainer::new(
            "graph database",
            "docker",
            graph_spec(),
            Arc::new(AlreadyExistsClassifier::default()),
            Duration::from_secs(1),
        );
        let err = action.converge(&runner).await.unwrap_err();
        assert!(matches!(err, DeployError::Process(_)));
    }

    #[tokio::test]
    async fn json_document_is_created_then_already_present() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let action = EnsureJsonDocument::new("doc", path.clone(), "{\"a\": 1}\n".to_string());
        let runner = ScriptedRunner::new();

        assert_eq!(action.converge(&runner).await.unwrap(), ConvergenceResult::Created);
        assert_eq!(
            action.converge(&runner).await.unwrap(),
            ConvergenceResult::AlreadyPresent
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\": 1}\n");
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn json_document_rewrites_stale_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "{}").unwrap();
        let action = EnsureJsonDocument::new("doc", path.clone(), "{\"a\": 2}\n".to_string());
        assert_eq!(
            action.converge(&ScriptedRunner::new()).await.unwrap(),
            ConvergenceResult::Created
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\": 2}\n");
    }

    #[tokio::test]
    async fn json_document_write_failure_is_persistence_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("doc.json");
        let action = EnsureJsonDocument::new("doc", path.clone(), "{}".to_string());
        let err = action.converge(&ScriptedRunner::new()).await.unwrap_err();
        match err {
            DeployError::Persistence { path: p, .. } => assert_eq!(p, path),
            other => panic!("Expected Persistence, got {:?}", other),
        }
    }
}
