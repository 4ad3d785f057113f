// This module handles config.toml.
// The file is read once at startup. Everything that needs configuration takes a ConfigModule
// (or a snapshot of it), never a global.

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Generated images land in <root>/<server>/<workflow>/.
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// Sent with every prompt so the websocket only reports our jobs.
    /// Generated at startup if missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
}

fn default_request_timeout() -> u64 {
    10
}

fn default_max_wait() -> u64 {
    600
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            request_timeout_secs: default_request_timeout(),
            max_wait_secs: default_max_wait(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub use_ssl: bool,
    /// Bearer token, for servers sitting behind an authenticating proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ServerConfig {
    pub fn url(&self, path: &str) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, path)
    }

    pub fn ws_url(&self, client_id: &str) -> String {
        let scheme = if self.use_ssl { "wss" } else { "ws" };
        format!("{}://{}:{}/ws?clientId={}", scheme, self.host, self.port, client_id)
    }
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(text).context("Error parsing config")?;
        if config.backend.client_id.is_none() {
            config.backend.client_id = Some(uuid::Uuid::new_v4().to_string());
        }
        let mut ids: Vec<&str> = config.servers.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            bail!("Duplicate server id: {}", pair[0]);
        }
        Ok(config)
    }

    pub fn client_id(&self) -> &str {
        self.backend.client_id.as_deref().unwrap_or_default()
    }

    pub fn server(&self, id: &str) -> Result<&ServerConfig> {
        if let Some(server) = self.servers.iter().find(|s| s.id == id || s.name == id) {
            return Ok(server);
        }
        let best = self
            .servers
            .iter()
            .map(|s| (strsim::levenshtein(id, &s.id), &s.id))
            .min_by_key(|(distance, _)| *distance);
        match best {
            Some((distance, best)) if distance <= 2 => bail!("Unknown server: {}. Did you mean {}?", id, best),
            _ => bail!("Unknown server: {}", id),
        }
    }
}

#[derive(Clone)]
pub struct ConfigModule {
    path: PathBuf,
    config: Arc<RwLock<AppConfig>>,
}

impl ConfigModule {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Error reading {}", path.display()))?;
        let config = AppConfig::from_toml(&text)
            .with_context(|| format!("Error loading {}", path.display()))?;
        Ok(Self {
            path,
            config: Arc::new(RwLock::new(config)),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub async fn with_config<T>(&self, f: impl FnOnce(&AppConfig) -> T) -> T {
        f(&*self.config.read().await)
    }

    pub async fn snapshot(&self) -> AppConfig {
        self.config.read().await.clone()
    }
}

#[cfg(test)]
pub fn testconfig() -> AppConfig {
    AppConfig::from_toml(include_str!("../testdata/config.toml")).unwrap()
}
