use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::documents::DEFAULT_MAX_BYTES;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cadrural.toml";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CADRURAL_CONFIG";

/// Configuration stored in cadrural.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub documents: DocumentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Redis URL, `${VAR}` expanded from the environment.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            url: None,
            prefix: default_prefix(),
        }
    }
}

fn default_prefix() -> String {
    "cadrural".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSettings {
    #[serde(default = "default_documents_root")]
    pub root: PathBuf,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            root: default_documents_root(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_documents_root() -> PathBuf {
    PathBuf::from("storage/documentos")
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}

impl AppConfig {
    /// Loads the config from `explicit`, `CADRURAL_CONFIG` or `cadrural.toml`, in that order.
    ///
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Parses TOML and expands `${VAR}` values.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(content).context("Failed to parse config")?;
        if let Some(url) = config.storage.url.take() {
            config.storage.url = Some(expand_env(&url)?);
        }
        config.server.bind = expand_env(&config.server.bind)?;
        Ok(config)
    }
}

/// Expands a value of the form `${VAR}` from the environment; other values pass through.
pub fn expand_env(value: &str) -> Result<String> {
    match value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(var_name) => {
            std::env::var(var_name).with_context(|| format!("Environment variable {var_name} not set"))
        }
        None => Ok(value.to_string()),
    }
}
