//! Typed topology descriptor (`apex_config.json`) and the pure assembler that
//! builds it from a [`Registry`].
//!
//! The serialized shape is keyed by architecture layer (`L0_APEX` through
//! `L5_GRAPH`), followed by `credentials`, `endpoints` and `monitoring`.
//! Every field a hand-edited file might lack deserializes to its default so
//! that readers can render whatever is present.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::registry::{Registry, keys, ports};

pub const API_HEALTH_PATH: &str = "/api/v1/health";
pub const API_MEMORY_ADD_PATH: &str = "/api/v1/memory/add";
pub const API_MEMORY_SEARCH_PATH: &str = "/api/v1/memory/search";
pub const API_FORENSIC_PATH: &str = "/api/v1/case/forensic";

/// Build `scheme://host:port/path`. An empty path yields no trailing slash.
pub fn endpoint_url(scheme: &str, host: &str, port: u16, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{}://{}:{}", scheme, host, port)
    } else {
        format!("{}://{}:{}/{}", scheme, host, port, path)
    }
}

/// Credential state as recorded in the descriptor. The value itself is never recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Configured,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApexLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_gateway: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLayer {
    #[serde(default)]
    pub repos: Vec<String>,
    #[serde(default)]
    pub systems: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default)]
    pub api_count: u32,
    #[serde(default)]
    pub networks: Vec<String>,
    /// Repositories that provide the network bridges
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_repos: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default)]
    pub skills: usize,
    #[serde(default)]
    pub workflows: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelligenceLayer {
    #[serde(default)]
    pub repos: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLayer {
    /// Bolt protocol URL
    #[serde(rename = "neo4j", default, skip_serializing_if = "Option::is_none")]
    pub bolt: Option<String>,
    /// HTTP browser URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,
    #[serde(rename = "infranodus", default)]
    pub analytics: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    #[serde(rename = "L0_APEX", default)]
    pub apex: ApexLayer,
    #[serde(rename = "L1_MEMORY", default)]
    pub memory: MemoryLayer,
    #[serde(rename = "L2_ORCHESTRATION", default)]
    pub orchestration: OrchestrationLayer,
    #[serde(rename = "L3_EXECUTION", default)]
    pub execution: ExecutionLayer,
    #[serde(rename = "L4_INTELLIGENCE", default)]
    pub intelligence: IntelligenceLayer,
    #[serde(rename = "L5_GRAPH", default)]
    pub graph: GraphLayer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apex_api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_add: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forensic: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitoring {
    #[serde(rename = "grafana", default, skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<String>,
    #[serde(rename = "prometheus", default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
}

/// The persisted shape of a deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyDescriptor {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(default)]
    pub credentials: BTreeMap<String, CredentialStatus>,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub monitoring: Monitoring,
}

impl TopologyDescriptor {
    /// Distinct repository identifiers across all layers, in layer order.
    pub fn repositories(&self) -> Vec<&str> {
        let arch = &self.architecture;
        let mut repos: Vec<&str> = Vec::new();
        let candidates = arch
            .apex
            .repo
            .iter()
            .chain(arch.memory.repos.iter())
            .chain(arch.orchestration.repo.iter())
            .chain(arch.orchestration.network_repos.iter())
            .chain(arch.execution.repo.iter())
            .chain(arch.intelligence.repos.iter());
        for repo in candidates {
            if !repos.contains(&repo.as_str()) {
                repos.push(repo.as_str());
            }
        }
        repos
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Builds a [`TopologyDescriptor`] from registry data. Pure; performs no I/O.
#[derive(Debug, Clone)]
pub struct TopologyAssembler {
    version: String,
    mode: String,
    scheme: String,
    bolt_scheme: String,
}

impl Default for TopologyAssembler {
    fn default() -> Self {
        Self::new("1.0.0", "supreme")
    }
}

impl TopologyAssembler {
    pub fn new(version: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            mode: mode.into(),
            scheme: "http".to_string(),
            bolt_scheme: "bolt".to_string(),
        }
    }

    pub fn assemble(&self, registry: &Registry, skills_total: usize) -> TopologyDescriptor {
        let http = |key: &str, path: &str| self.url(registry, &self.scheme, key, path);
        let labels = |names: &[&str]| -> Vec<String> {
            names.iter().filter_map(|n| registry.label(n)).collect()
        };
        let profile = &registry.layers;

        let architecture = Architecture {
            apex: ApexLayer {
                repo: registry.label(keys::APEX),
                role: profile.apex_role.clone(),
                api_gateway: http(ports::APEX_API, ""),
            },
            memory: MemoryLayer {
                repos: labels(&[keys::MEMORY_NEXUS, keys::MEMORY_TRINITY]),
                systems: profile.memory_systems.clone(),
            },
            orchestration: OrchestrationLayer {
                repo: registry.label(keys::ORCHESTRATOR),
                api_count: profile.api_integrations,
                networks: profile.networks.clone(),
                network_repos: labels(&[keys::ASPEN]),
            },
            execution: ExecutionLayer {
                repo: registry.label(keys::ENGINE),
                skills: skills_total,
                workflows: profile.workflows.clone(),
            },
            intelligence: IntelligenceLayer {
                repos: labels(&[keys::INTELLIGENCE, keys::FORENSICS]),
                capabilities: profile.capabilities.clone(),
            },
            graph: GraphLayer {
                bolt: self.url(registry, &self.bolt_scheme, ports::GRAPH_BOLT, ""),
                http: http(ports::GRAPH_HTTP, ""),
                analytics: profile.graph_analytics.clone(),
            },
        };

        let credentials = registry
            .credentials
            .iter()
            .map(|c| (c.name.clone(), CredentialStatus::Configured))
            .collect();

        let endpoints = Endpoints {
            apex_api: http(ports::APEX_API, ""),
            health: http(ports::APEX_API, API_HEALTH_PATH),
            memory_add: http(ports::APEX_API, API_MEMORY_ADD_PATH),
            memory_search: http(ports::APEX_API, API_MEMORY_SEARCH_PATH),
            forensic: http(ports::APEX_API, API_FORENSIC_PATH),
        };

        let monitoring = Monitoring {
            dashboard: http(ports::DASHBOARD, ""),
            metrics: http(ports::METRICS, ""),
        };

        TopologyDescriptor {
            version: self.version.clone(),
            mode: self.mode.clone(),
            architecture,
            credentials,
            endpoints,
            monitoring,
        }
    }

    fn url(&self, registry: &Registry, scheme: &str, key: &str, path: &str) -> Option<String> {
        registry
            .ports
            .get(key)
            .map(|port| endpoint_url(scheme, &registry.host, port, path))
    }
}
