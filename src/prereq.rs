//! Prerequisite gate: every required tool must answer a version query before
//! any phase is allowed to touch an external system.

use apex_common::ComponentDescriptor;
use std::time::Duration;

use crate::errors::DeployError;
use crate::process::CommandRunner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub label: String,
    pub present: bool,
    /// Why the probe failed, when it did
    pub detail: Option<String>,
}

/// Outcome of one prerequisite check, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrerequisiteReport {
    pub tools: Vec<ToolStatus>,
}

impl PrerequisiteReport {
    pub fn passed(&self) -> bool {
        self.tools.iter().all(|t| t.present)
    }

    pub fn missing(&self) -> Vec<String> {
        self.tools
            .iter()
            .filter(|t| !t.present)
            .map(|t| t.label.clone())
            .collect()
    }

    /// Convert a failed verdict into the gating error.
    pub fn into_result(self) -> Result<Self, DeployError> {
        if self.passed() {
            Ok(self)
        } else {
            Err(DeployError::MissingPrerequisites {
                missing: self.missing(),
            })
        }
    }
}

pub struct PrerequisiteChecker<'a> {
    runner: &'a dyn CommandRunner,
    limit: Duration,
}

impl<'a> PrerequisiteChecker<'a> {
    pub fn new(runner: &'a dyn CommandRunner, limit: Duration) -> Self {
        Self { runner, limit }
    }

    /// Probe every tool. Never short-circuits, so all missing tools are reported.
    ///
    /// Descriptors without a version check are skipped.
    pub async fn check(&self, tools: &[ComponentDescriptor]) -> PrerequisiteReport {
        let mut report = PrerequisiteReport::default();
        for tool in tools {
            let Some(check) = &tool.version_check else {
                continue;
            };
            let status = match self.runner.run(&check.program, &check.args, self.limit).await {
                Ok(out) if out.success() => ToolStatus {
                    label: tool.label.clone(),
                    present: true,
                    detail: None,
                },
                Ok(out) => ToolStatus {
                    label: tool.label.clone(),
                    present: false,
                    detail: Some(out.diagnostic()),
                },
                Err(e) => ToolStatus {
                    label: tool.label.clone(),
                    present: false,
                    detail: Some(e.to_string()),
                },
            };
            if status.present {
                tracing::debug!(tool = %tool.name, "prerequisite present");
            } else {
                tracing::warn!(tool = %tool.name, detail = ?status.detail, "prerequisite missing");
            }
            report.tools.push(status);
        }
        report
    }
}
