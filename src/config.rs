use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_ENV: &str = "KAFKACTL_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the kafkactl config path (set KAFKACTL_CONFIG or HOME)")]
    NoPath,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("kafkactl configuration not found in {path}")]
    MissingSection { path: PathBuf },

    #[error("context '{0}' not found")]
    UnknownContext(String),

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "current-context", default)]
    pub current_context: String,
    #[serde(default)]
    pub contexts: Vec<Context>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    #[serde(default)]
    pub context: ContextDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDetails {
    #[serde(default)]
    pub api: String,
    #[serde(rename = "user-token", default)]
    pub user_token: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Deserialize)]
struct ConfigFileIn {
    kafkactl: Option<Config>,
}

#[derive(Serialize)]
struct ConfigFileOut<'a> {
    kafkactl: &'a Config,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFileIn = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = file.kafkactl.ok_or_else(|| ConfigError::MissingSection {
            path: path.to_path_buf(),
        })?;

        if config.current_context.is_empty()
            && let Some(first) = config.contexts.first()
        {
            config.current_context = first.name.clone();
        }

        Ok(config)
    }

    pub fn current_context(&self) -> Result<&Context, ConfigError> {
        self.contexts
            .iter()
            .find(|context| context.name == self.current_context)
            .ok_or_else(|| ConfigError::UnknownContext(self.current_context.clone()))
    }

    pub fn current_context_mut(&mut self) -> Result<&mut Context, ConfigError> {
        let current = self.current_context.clone();
        self.contexts
            .iter_mut()
            .find(|context| context.name == current)
            .ok_or(ConfigError::UnknownContext(current))
    }

    /// Rewrites the whole document under `kafkactl:` via a temp file and rename.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(&ConfigFileOut { kafkactl: self })
            .map_err(ConfigError::Serialize)?;
        write_atomically(path, yaml.as_bytes()).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".kafkactl").join("config.yml"))
}

fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("yml.tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        restrict_permissions(&file)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> io::Result<()> {
    Ok(())
}
