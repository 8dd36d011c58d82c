use anyhow::{Context, Result};
use apex_common::{ComponentDescriptor, CredentialRef, PortRegistry, Registry, Secret};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::convergence::AlreadyExistsClassifier;
use crate::deploy_config::{DeployToml, GraphSection};

/// Password the graph container falls back to when none is provided.
pub const DEV_GRAPH_PASSWORD: &str = "apex-nexus-dev";

/// Environment values captured once at startup.
///
/// Kept as plain data so configuration resolution never reads the process
/// environment behind the caller's back.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    vars: HashMap<String, String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        // non-UTF-8 variables cannot name anything we read
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Graph database container settings with the password resolved.
#[derive(Debug, Clone)]
pub struct GraphSettings {
    pub container_name: String,
    pub image: String,
    pub volume: String,
    pub user: String,
    pub password: Secret,
    /// True when the development password is in use
    pub default_password: bool,
}

/// Runtime configuration for one deployment run.
///
/// Built once from `apex.toml`, the environment and CLI flags, then passed by
/// reference to every component. Nothing mutates it after construction.
#[derive(Clone)]
pub struct DeployConfig {
    pub output_dir: PathBuf,
    pub skills_manifest_path: PathBuf,
    pub topology_path: PathBuf,
    pub version: String,
    pub mode: String,
    pub container_cmd: String,
    pub version_check_timeout: Duration,
    pub container_timeout: Duration,
    pub classifier: Arc<AlreadyExistsClassifier>,
    pub registry: Registry,
    pub graph: GraphSettings,
    pub skills_categories: std::collections::BTreeMap<String, Vec<String>>,
}

impl std::fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployConfig")
            .field("output_dir", &self.output_dir)
            .field("container_cmd", &self.container_cmd)
            .field("host", &self.registry.host)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl DeployConfig {
    /// Load `apex.toml` (or `config_file`) and resolve it against the environment.
    pub fn load(
        project_dir: &Path,
        config_file: Option<&Path>,
        env: &EnvOverrides,
    ) -> Result<Self> {
        let toml = match config_file {
            Some(path) => DeployToml::load(path)?,
            None => DeployToml::load_or_default(project_dir)?,
        };
        Self::from_toml(project_dir, toml, env)
    }

    pub fn from_toml(
        project_dir: &Path,
        toml: DeployToml,
        env: &EnvOverrides,
    ) -> Result<Self> {
        let output_dir = match &toml.output.dir {
            Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
            Some(dir) => project_dir.join(dir),
            None => project_dir.to_path_buf(),
        };

        let classifier = AlreadyExistsClassifier::new(&toml.runtime.already_exists_patterns)
            .context("Invalid pattern in runtime.already_exists_patterns")?;

        let container_timeout = match env.get("APEX_COMMAND_TIMEOUT") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("APEX_COMMAND_TIMEOUT is not a number: {}", raw))?;
                if secs == 0 {
                    anyhow::bail!("APEX_COMMAND_TIMEOUT must be at least 1 second");
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(toml.runtime.container_timeout_secs),
        };

        let container_cmd = toml
            .runtime
            .container_cmd
            .clone()
            .or_else(|| env.get("APEX_CONTAINER_CMD").map(String::from))
            .unwrap_or_else(|| "docker".to_string());

        let host = env
            .get("APEX_HOST")
            .map(String::from)
            .unwrap_or_else(|| toml.project.host.clone());

        let registry = Registry {
            host,
            components: toml
                .repos
                .iter()
                .map(|(name, repo)| ComponentDescriptor::repo(name, repo))
                .collect(),
            prerequisites: toml
                .prerequisites
                .iter()
                .map(|p| ComponentDescriptor::tool(&p.command, &p.label))
                .collect(),
            ports: toml
                .ports
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect::<PortRegistry>(),
            credentials: toml
                .credentials
                .iter()
                .map(|(name, var)| {
                    let secret = env.get(var).map(Secret::new).unwrap_or_default();
                    CredentialRef::new(name, secret)
                })
                .collect(),
            layers: toml.layers.to_profile(),
        };

        Ok(Self {
            skills_manifest_path: output_dir.join(&toml.output.skills_manifest),
            topology_path: output_dir.join(&toml.output.topology),
            output_dir,
            version: toml.project.version,
            mode: toml.project.mode,
            container_cmd,
            version_check_timeout: Duration::from_secs(toml.runtime.version_check_timeout_secs),
            container_timeout,
            classifier: Arc::new(classifier),
            registry,
            graph: resolve_graph(&toml.graph, env),
            skills_categories: toml.skills.categories,
        })
    }
}

fn resolve_graph(section: &GraphSection, env: &EnvOverrides) -> GraphSettings {
    let (password, default_password) = match env.get(&section.password_env) {
        Some(value) => (Secret::new(value), false),
        None => (Secret::new(DEV_GRAPH_PASSWORD), true),
    };
    GraphSettings {
        container_name: section.container_name.clone(),
        image: section.image.clone(),
        volume: section.volume.clone(),
        user: section.user.clone(),
        password,
        default_password,
    }
}
