//! File-level configuration for apex-deploy, read from `apex.toml`.
//!
//! Every section is optional; an absent file reproduces the reference
//! topology. Table-valued sections (`[ports]`, `[repos]`, `[credentials]`,
//! `[[prerequisites]]`) replace their defaults as a whole when present.
//! Environment overrides are applied in [`crate::config::DeployConfig`].
//!
//! # Configuration File Format
//!
//! ```toml
//! [project]
//! version = "1.0.0"
//! mode = "supreme"
//! host = "localhost"
//!
//! [output]
//! dir = "."
//! skills_manifest = "apex_skills_manifest.json"
//! topology = "apex_config.json"
//!
//! [runtime]
//! container_cmd = "docker"
//! version_check_timeout_secs = 15
//! container_timeout_secs = 180
//! already_exists_patterns = ["already in use", "already exists"]
//!
//! [ports]
//! apex_api = 8000
//! dashboard = 3000
//!
//! [[prerequisites]]
//! command = "docker"
//! label = "Docker"
//!
//! [credentials]
//! mem0_pro = "MEM0_PRO_API_KEY"
//!
//! [graph]
//! container_name = "apex-neo4j"
//! image = "neo4j:latest"
//!
//! [skills.categories]
//! memory = ["smart_route", "unified_search"]
//! ```

use anyhow::{Context, Result};
use apex_common::registry::{
    default_components, default_credential_names, default_ports, default_prerequisites,
};
use apex_common::LayerProfile;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::convergence::DEFAULT_ALREADY_EXISTS_PATTERNS;

pub const CONFIG_FILE_NAME: &str = "apex.toml";

/// Project-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Host used in every derived endpoint URL
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_mode() -> String {
    "supreme".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            version: default_version(),
            mode: default_mode(),
            host: default_host(),
        }
    }
}

/// Where the two JSON artifacts land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Relative paths resolve against the project directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default = "default_skills_manifest")]
    pub skills_manifest: String,
    #[serde(default = "default_topology")]
    pub topology: String,
}

fn default_skills_manifest() -> String {
    "apex_skills_manifest.json".to_string()
}

fn default_topology() -> String {
    "apex_config.json".to_string()
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: None,
            skills_manifest: default_skills_manifest(),
            topology: default_topology(),
        }
    }
}

/// External tool invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_cmd: Option<String>,
    #[serde(default = "default_version_check_timeout")]
    pub version_check_timeout_secs: u64,
    #[serde(default = "default_container_timeout")]
    pub container_timeout_secs: u64,
    /// Regular expressions marking an "already exists" failure
    #[serde(default = "default_already_exists_patterns")]
    pub already_exists_patterns: Vec<String>,
}

fn default_version_check_timeout() -> u64 {
    15
}

fn default_container_timeout() -> u64 {
    180
}

fn default_already_exists_patterns() -> Vec<String> {
    DEFAULT_ALREADY_EXISTS_PATTERNS
        .iter()
        .map(|p| regex::escape(p))
        .collect()
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            container_cmd: None,
            version_check_timeout_secs: default_version_check_timeout(),
            container_timeout_secs: default_container_timeout(),
            already_exists_patterns: default_already_exists_patterns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteEntry {
    pub command: String,
    pub label: String,
}

/// Graph database container settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSection {
    #[serde(default = "default_graph_container")]
    pub container_name: String,
    #[serde(default = "default_graph_image")]
    pub image: String,
    #[serde(default = "default_graph_volume")]
    pub volume: String,
    #[serde(default = "default_graph_user")]
    pub user: String,
    /// Environment variable holding the graph database password
    #[serde(default = "default_graph_password_env")]
    pub password_env: String,
}

fn default_graph_container() -> String {
    "apex-neo4j".to_string()
}

fn default_graph_image() -> String {
    "neo4j:latest".to_string()
}

fn default_graph_volume() -> String {
    "apex_neo4j_data".to_string()
}

fn default_graph_user() -> String {
    "neo4j".to_string()
}

fn default_graph_password_env() -> String {
    "APEX_GRAPH_PASSWORD".to_string()
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            container_name: default_graph_container(),
            image: default_graph_image(),
            volume: default_graph_volume(),
            user: default_graph_user(),
            password_env: default_graph_password_env(),
        }
    }
}

/// Static descriptive content of the manifest-only layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayersSection {
    #[serde(default = "default_apex_role")]
    pub apex_role: String,
    #[serde(default = "default_memory_systems")]
    pub memory_systems: Vec<String>,
    #[serde(default = "default_api_integrations")]
    pub api_integrations: u32,
    #[serde(default = "default_networks")]
    pub networks: Vec<String>,
    #[serde(default = "default_workflows")]
    pub workflows: String,
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
    #[serde(default = "default_graph_analytics")]
    pub graph_analytics: String,
}

fn default_apex_role() -> String {
    LayerProfile::default().apex_role
}

fn default_memory_systems() -> Vec<String> {
    LayerProfile::default().memory_systems
}

fn default_api_integrations() -> u32 {
    LayerProfile::default().api_integrations
}

fn default_networks() -> Vec<String> {
    LayerProfile::default().networks
}

fn default_workflows() -> String {
    LayerProfile::default().workflows
}

fn default_capabilities() -> Vec<String> {
    LayerProfile::default().capabilities
}

fn default_graph_analytics() -> String {
    LayerProfile::default().graph_analytics
}

impl Default for LayersSection {
    fn default() -> Self {
        LayerProfile::default().into()
    }
}

impl From<LayerProfile> for LayersSection {
    fn from(p: LayerProfile) -> Self {
        Self {
            apex_role: p.apex_role,
            memory_systems: p.memory_systems,
            api_integrations: p.api_integrations,
            networks: p.networks,
            workflows: p.workflows,
            capabilities: p.capabilities,
            graph_analytics: p.graph_analytics,
        }
    }
}

impl LayersSection {
    pub fn to_profile(&self) -> LayerProfile {
        LayerProfile {
            apex_role: self.apex_role.clone(),
            memory_systems: self.memory_systems.clone(),
            api_integrations: self.api_integrations,
            networks: self.networks.clone(),
            workflows: self.workflows.clone(),
            capabilities: self.capabilities.clone(),
            graph_analytics: self.graph_analytics.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsSection {
    #[serde(default = "apex_common::manifest::default_categories")]
    pub categories: BTreeMap<String, Vec<String>>,
}

impl Default for SkillsSection {
    fn default() -> Self {
        Self {
            categories: apex_common::manifest::default_categories(),
        }
    }
}

/// The complete apex.toml structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployToml {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
    /// Logical service name → host port
    #[serde(default = "default_port_table")]
    pub ports: BTreeMap<String, u16>,
    /// Logical component name → repository identifier
    #[serde(default = "default_repo_table")]
    pub repos: BTreeMap<String, String>,
    #[serde(default = "default_prerequisite_entries")]
    pub prerequisites: Vec<PrerequisiteEntry>,
    /// Logical credential name → environment variable holding its value
    #[serde(default = "default_credential_table")]
    pub credentials: BTreeMap<String, String>,
    #[serde(default)]
    pub graph: GraphSection,
    #[serde(default)]
    pub layers: LayersSection,
    #[serde(default)]
    pub skills: SkillsSection,
}

fn default_port_table() -> BTreeMap<String, u16> {
    default_ports()
        .iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn default_repo_table() -> BTreeMap<String, String> {
    default_components()
        .into_iter()
        .map(|c| (c.name, c.label))
        .collect()
}

fn default_prerequisite_entries() -> Vec<PrerequisiteEntry> {
    default_prerequisites()
        .into_iter()
        .map(|c| PrerequisiteEntry {
            command: c.name,
            label: c.label,
        })
        .collect()
}

fn default_credential_table() -> BTreeMap<String, String> {
    default_credential_names()
        .into_iter()
        .map(|name| {
            let env = format!("APEX_{}", name.to_uppercase());
            (name, env)
        })
        .collect()
}

impl Default for DeployToml {
    fn default() -> Self {
        Self {
            project: ProjectSection::default(),
            output: OutputSection::default(),
            runtime: RuntimeSection::default(),
            ports: default_port_table(),
            repos: default_repo_table(),
            prerequisites: default_prerequisite_entries(),
            credentials: default_credential_table(),
            graph: GraphSection::default(),
            layers: LayersSection::default(),
            skills: SkillsSection::default(),
        }
    }
}

impl DeployToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse apex.toml")
    }

    /// Load `apex.toml` from the project directory, or defaults if absent.
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize apex.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Non-fatal problems worth showing to the operator.
    ///
    /// `env` answers whether an environment variable is set.
    pub fn validate(&self, env: impl Fn(&str) -> bool) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.prerequisites.is_empty() {
            warnings.push("No prerequisites declared; the tool gate will always pass".to_string());
        }

        let mut seen: HashMap<u16, &str> = HashMap::new();
        for (name, port) in &self.ports {
            if *port == 0 {
                warnings.push(format!("Port '{}' is 0", name));
                continue;
            }
            if let Some(other) = seen.insert(*port, name) {
                warnings.push(format!(
                    "Ports '{}' and '{}' both use {}",
                    other, name, port
                ));
            }
        }

        if self.runtime.version_check_timeout_secs == 0 {
            warnings.push("runtime.version_check_timeout_secs is 0".to_string());
        }
        if self.runtime.container_timeout_secs == 0 {
            warnings.push("runtime.container_timeout_secs is 0".to_string());
        }

        for (name, var) in &self.credentials {
            if !env(var) {
                warnings.push(format!(
                    "Credential '{}' declared but {} is not set",
                    name, var
                ));
            }
        }

        if !env(&self.graph.password_env) {
            warnings.push(format!(
                "{} is not set; the graph database will use the development password",
                self.graph.password_env
            ));
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_yields_reference_defaults() {
        let toml = DeployToml::parse("").unwrap();
        assert_eq!(toml.project.host, "localhost");
        assert_eq!(toml.ports.get("graph_http"), Some(&7474));
        assert_eq!(toml.ports.len(), 8);
        assert_eq!(toml.repos.len(), 8);
        assert_eq!(toml.prerequisites.len(), 5);
        assert_eq!(toml.credentials.get("mem0_pro").map(String::as_str), Some("APEX_MEM0_PRO"));
        assert_eq!(toml.output.topology, "apex_config.json");
        assert_eq!(toml.runtime.container_timeout_secs, 180);
        assert_eq!(toml.skills.categories.len(), 4);
    }

    #[test]
    fn sections_override_defaults() {
        let toml = DeployToml::parse(
            r#"
[project]
host = "10.0.0.5"

[runtime]
container_cmd = "podman"
container_timeout_secs = 30

[ports]
graph_http = 17474
dashboard = 13000

[[prerequisites]]
command = "podman"
label = "Podman"

[skills.categories]
memory = ["smart_route"]
"#,
        )
        .unwrap();
        assert_eq!(toml.project.host, "10.0.0.5");
        assert_eq!(toml.project.mode, "supreme");
        assert_eq!(toml.runtime.container_cmd.as_deref(), Some("podman"));
        assert_eq!(toml.runtime.version_check_timeout_secs, 15);
        assert_eq!(toml.ports.len(), 2);
        assert_eq!(toml.prerequisites.len(), 1);
        assert_eq!(toml.skills.categories.len(), 1);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let err = DeployToml::parse("[ports]\ngraph_http = \"not a number\"").unwrap_err();
        assert!(err.to_string().contains("Failed to parse apex.toml"));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut toml = DeployToml::default();
        toml.project.host = "deploy.local".to_string();
        toml.save(&path).unwrap();

        let loaded = DeployToml::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.project.host, "deploy.local");
        assert_eq!(loaded.ports, toml.ports);
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let toml = DeployToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.graph.container_name, "apex-neo4j");
    }

    #[test]
    fn validate_flags_port_collisions_and_zero_timeouts() {
        let toml = DeployToml::parse(
            r#"
[runtime]
container_timeout_secs = 0

[ports]
dashboard = 3000
grafana_legacy = 3000
metrics = 0
"#,
        )
        .unwrap();
        let warnings = toml.validate(|_| true);
        assert!(warnings.iter().any(|w| w.contains("both use 3000")));
        assert!(warnings.iter().any(|w| w.contains("'metrics' is 0")));
        assert!(warnings.iter().any(|w| w.contains("container_timeout_secs is 0")));
    }

    #[test]
    fn validate_reports_unset_credentials() {
        let toml = DeployToml::default();
        let warnings = toml.validate(|var| var == "APEX_MEM0_PRO");
        assert!(!warnings.iter().any(|w| w.contains("'mem0_pro'")));
        assert!(warnings.iter().any(|w| w.contains("'supermemory'")));
        assert!(warnings.iter().any(|w| w.contains("APEX_GRAPH_PASSWORD")));
    }

    #[test]
    fn default_config_validates_cleanly_when_env_is_set() {
        assert!(DeployToml::default().validate(|_| true).is_empty());
    }
}
