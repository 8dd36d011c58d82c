//! Static topology registry: which components exist, which ports they bind
//! and which credentials the deployment carries.
//!
//! A `Registry` is built once at startup and never mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;

/// Logical component keys the assembler knows how to place into layers.
pub mod keys {
    pub const APEX: &str = "apex";
    pub const MEMORY_NEXUS: &str = "memory_nexus";
    pub const MEMORY_TRINITY: &str = "memory_trinity";
    pub const ORCHESTRATOR: &str = "orchestrator";
    pub const ENGINE: &str = "engine";
    pub const INTELLIGENCE: &str = "intelligence";
    pub const ASPEN: &str = "aspen";
    pub const FORENSICS: &str = "forensics";
}

/// Logical port keys used when deriving endpoints.
pub mod ports {
    pub const APEX_API: &str = "apex_api";
    pub const MEMORY_TRINITY: &str = "memory_trinity";
    pub const ORCHESTRATOR: &str = "orchestrator";
    pub const INTELLIGENCE: &str = "intelligence";
    pub const GRAPH_HTTP: &str = "graph_http";
    pub const GRAPH_BOLT: &str = "graph_bolt";
    pub const METRICS: &str = "metrics";
    pub const DASHBOARD: &str = "dashboard";
}

/// Command used to prove a tool is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCheck {
    pub program: String,
    pub args: Vec<String>,
}

impl VersionCheck {
    /// `<program> --version`
    pub fn version_flag(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["--version".to_string()],
        }
    }
}

/// A named component of the deployment.
///
/// Repositories carry no version check; prerequisite tools always do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// Logical name (e.g. `"orchestrator"` or `"docker"`)
    pub name: String,
    /// Human label (repository identifier or tool display name)
    pub label: String,
    pub version_check: Option<VersionCheck>,
}

impl ComponentDescriptor {
    pub fn repo(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            version_check: None,
        }
    }

    pub fn tool(command: impl Into<String>, label: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            version_check: Some(VersionCheck::version_flag(command.clone())),
            name: command,
            label: label.into(),
        }
    }
}

/// Logical service name to host port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortRegistry {
    ports: BTreeMap<String, u16>,
}

impl PortRegistry {
    pub fn new(ports: BTreeMap<String, u16>) -> Self {
        Self { ports }
    }

    pub fn get(&self, key: &str) -> Option<u16> {
        self.ports.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.ports.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, u16)> for PortRegistry {
    fn from_iter<T: IntoIterator<Item = (String, u16)>>(iter: T) -> Self {
        Self {
            ports: iter.into_iter().collect(),
        }
    }
}

/// An opaque secret value.
///
/// Never printed, never serialized. Callers that must hand the value to an
/// external process use [`Secret::expose`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(Option<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Some(value.into()))
    }

    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_present(&self) -> bool {
        self.0.as_deref().is_some_and(|v| !v.is_empty())
    }

    pub fn expose(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_present() {
            f.write_str("Secret(***)")
        } else {
            f.write_str("Secret(<unset>)")
        }
    }
}

/// A declared credential. Only its presence ever leaves the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRef {
    pub name: String,
    pub secret: Secret,
}

impl CredentialRef {
    pub fn new(name: impl Into<String>, secret: Secret) -> Self {
        Self {
            name: name.into(),
            secret,
        }
    }
}

/// Static descriptive content of the non-executable layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerProfile {
    pub apex_role: String,
    pub memory_systems: Vec<String>,
    pub api_integrations: u32,
    pub networks: Vec<String>,
    pub workflows: String,
    pub capabilities: Vec<String>,
    pub graph_analytics: String,
}

impl Default for LayerProfile {
    fn default() -> Self {
        Self {
            apex_role: "Supreme orchestrator".to_string(),
            memory_systems: vec![
                "MemoryPlugin (2 buckets)".to_string(),
                "Supermemory (<300ms)".to_string(),
                "Mem0 (2 accounts)".to_string(),
            ],
            api_integrations: 25,
            networks: vec!["Aspen Grove".to_string()],
            workflows: "advanced".to_string(),
            capabilities: vec![
                "forensics".to_string(),
                "patterns".to_string(),
                "case_matrix".to_string(),
            ],
            graph_analytics: "enabled".to_string(),
        }
    }
}

/// Everything the orchestrator knows about the target topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    /// Host used when deriving endpoint URLs
    pub host: String,
    pub components: Vec<ComponentDescriptor>,
    pub prerequisites: Vec<ComponentDescriptor>,
    pub ports: PortRegistry,
    pub credentials: Vec<CredentialRef>,
    pub layers: LayerProfile,
}

impl Registry {
    /// Look up a component's label by logical name.
    pub fn component(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn label(&self, name: &str) -> Option<String> {
        self.component(name).map(|c| c.label.clone())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            components: default_components(),
            prerequisites: default_prerequisites(),
            ports: default_ports(),
            credentials: default_credential_names()
                .into_iter()
                .map(|name| CredentialRef::new(name, Secret::empty()))
                .collect(),
            layers: LayerProfile::default(),
        }
    }
}

pub fn default_components() -> Vec<ComponentDescriptor> {
    [
        (keys::APEX, "APEX-NEXUS-SUPREME"),
        (keys::MEMORY_NEXUS, "master-memory-nexus"),
        (keys::MEMORY_TRINITY, "mem0-mcp-integration"),
        (keys::ORCHESTRATOR, "MCP-MASTER-OMNI-GRID"),
        (keys::ENGINE, "Omni_Engine"),
        (keys::INTELLIGENCE, "SUPERLUMINAL_CASE_MATRIX"),
        (keys::ASPEN, "second-aspen-grove-integration"),
        (keys::FORENSICS, "FEDERAL-FORENSIC-REPAIR-OMNIBUS"),
    ]
    .into_iter()
    .map(|(name, label)| ComponentDescriptor::repo(name, label))
    .collect()
}

pub fn default_prerequisites() -> Vec<ComponentDescriptor> {
    [
        ("docker", "Docker"),
        ("docker-compose", "Docker Compose"),
        ("python3", "Python 3.9+"),
        ("npm", "Node.js/npm"),
        ("git", "Git"),
    ]
    .into_iter()
    .map(|(cmd, label)| ComponentDescriptor::tool(cmd, label))
    .collect()
}

pub fn default_ports() -> PortRegistry {
    [
        (ports::APEX_API, 8000),
        (ports::MEMORY_TRINITY, 8080),
        (ports::ORCHESTRATOR, 9000),
        (ports::INTELLIGENCE, 9001),
        (ports::GRAPH_HTTP, 7474),
        (ports::GRAPH_BOLT, 7687),
        (ports::METRICS, 9090),
        (ports::DASHBOARD, 3000),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub fn default_credential_names() -> Vec<String> {
    [
        "mem0_pro",
        "mem0_dev",
        "memoryplugin_global",
        "memoryplugin_direct",
        "supermemory",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
