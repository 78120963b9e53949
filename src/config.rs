use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub schemas: SchemasConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agents: BTreeMap<String, AgentConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchemasConfig {
    #[serde(default = "default_schemas_dir")]
    pub dir: PathBuf,
}

impl Default for SchemasConfig {
    fn default() -> Self {
        Self {
            dir: default_schemas_dir(),
        }
    }
}

fn default_schemas_dir() -> PathBuf {
    PathBuf::from("./schemas")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_limit() -> i64 {
    12
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7331".to_string()
}

/// One agent known to the tool layer. The agent acts on behalf of exactly one
/// account and may only touch the lists named here.
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub account: String,
    pub lists: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate search
    if config.search.default_limit < 1 {
        anyhow::bail!("search.default_limit must be >= 1");
    }

    // Validate agents
    for (name, agent) in &config.agents {
        if agent.account.trim().is_empty() {
            anyhow::bail!("agents.{}.account must not be empty", name);
        }
        if agent.lists.is_empty() {
            anyhow::bail!("agents.{}.lists must name at least one list", name);
        }
        if agent.lists.iter().any(|l| l.trim().is_empty()) {
            anyhow::bail!("agents.{}.lists must not contain empty names", name);
        }
    }

    Ok(config)
}
