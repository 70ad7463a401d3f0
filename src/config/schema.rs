use anyhow::{bail, Context, Result};
use directories::{ProjectDirs, UserDirs};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_URL: &str = "FILEDASH_API_URL";
pub const ENV_TOKEN: &str = "FILEDASH_TOKEN";
pub const ENV_LOG: &str = "FILEDASH_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    /// Bearer token given through the environment. Never written to disk.
    #[serde(skip)]
    pub token_override: Option<String>,
}

/// Backend connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the storage backend, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Upper bound for a single request, in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StorageConfig {
    /// Where `login` keeps the bearer token. `~` is expanded.
    pub token_path: String,
    /// Where downloads are saved. `~` is expanded.
    pub download_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            token_override: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            timeout_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let token_path = project_dirs()
            .map(|dirs| dirs.data_dir().join("token").to_string_lossy().into_owned())
            .unwrap_or_else(|| "~/.filedash/token".into());
        let download_dir = UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".into());
        Self {
            token_path,
            download_dir,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "filedash")
}

/// `<config_dir>/filedash/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Loads the default config file (if any), then the environment.
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::finish(Self::default()),
        }
    }

    /// A missing file means defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        Self::finish(config)
    }

    fn finish(mut config: Self) -> Result<Self> {
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies `FILEDASH_*` overrides; blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(url) = get(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(token) = get(ENV_TOKEN) {
            self.token_override = Some(token);
        }
        if let Some(level) = get(ENV_LOG) {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.timeout_secs == 0 {
            bail!("api.timeout_secs must be greater than zero");
        }
        let url = reqwest::Url::parse(&self.api.base_url)
            .with_context(|| format!("api.base_url is not a valid URL: {}", self.api.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api.base_url must use http or https, got {}", url.scheme());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn token_path(&self) -> PathBuf {
        expand(&self.storage.token_path)
    }

    pub fn download_dir(&self) -> PathBuf {
        expand(&self.storage.download_dir)
    }

    /// JSON schema of the config file.
    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(Config);
        serde_json::to_string_pretty(&schema).context("Failed to serialize config schema")
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
