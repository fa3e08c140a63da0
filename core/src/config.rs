//! Layered client configuration.
//!
//! Precedence, lowest to highest:
//! 1. Built-in defaults
//! 2. `<home>/config.toml`
//! 3. `SOLGUARD_*` environment overrides
//!
//! ```no_run
//! use solguard_core::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load().expect("config");
//! println!("{}", config.api_base_url);
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::permissions::PartialFailurePolicy;

/// Default backend endpoint.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Fixed per-request deadline unless overridden.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Well-known key the session credential is persisted under.
pub const TOKEN_KEY: &str = "solguard_token";

/// Keyring service name for the persisted credential.
pub const CREDENTIAL_SERVICE: &str = "solguard";

const CONFIG_FILE: &str = "config.toml";
const HOME_DIR_NAME: &str = ".solguard";

const ENV_BASE_URL: &str = "SOLGUARD_API_BASE_URL";
const ENV_TIMEOUT_MS: &str = "SOLGUARD_TIMEOUT_MS";
const ENV_CREDENTIAL_STORE: &str = "SOLGUARD_CREDENTIAL_STORE";
const ENV_HOME: &str = "SOLGUARD_HOME";
const ENV_PREFIX: &str = "SOLGUARD_";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error loading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid value for ${var}: '{value}' (expected: {expected})")]
    InvalidEnvValue {
        var: String,
        value: String,
        expected: String,
    },

    #[error("Invalid value for `{key}` in config.toml: '{value}' (expected: {expected})")]
    InvalidFileValue {
        key: String,
        value: String,
        expected: String,
    },

    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Where the session credential is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStoreKind {
    /// OS keyring.
    #[default]
    Keyring,
    /// JSON file in the solguard home directory.
    File,
    /// Memory only; nothing survives a restart.
    #[serde(rename = "none")]
    Memory,
}

impl FromStr for CredentialStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(Self::Keyring),
            "file" => Ok(Self::File),
            "none" | "memory" => Ok(Self::Memory),
            other => Err(format!("unknown credential store '{other}'")),
        }
    }
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend API root, without a trailing slash.
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub credential_store: CredentialStoreKind,
    pub token_key: String,
    /// Directory for `config.toml` and file-backed credentials.
    pub home: PathBuf,
    pub partial_failure_policy: PartialFailurePolicy,
}

impl ClientConfig {
    /// Defaults rooted at `home`.
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            credential_store: CredentialStoreKind::default(),
            token_key: TOKEN_KEY.to_string(),
            home,
            partial_failure_policy: PartialFailurePolicy::default(),
        }
    }

    /// Replaces the base URL after validating it.
    pub fn set_api_base_url(&mut self, url: &str) -> Result<(), ConfigError> {
        self.api_base_url = normalize_base_url(url)?;
        Ok(())
    }
}

/// File layer. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    api_base_url: Option<String>,
    request_timeout_ms: Option<u64>,
    credential_store: Option<CredentialStoreKind>,
    token_key: Option<String>,
    partial_failure_policy: Option<PartialFailurePolicy>,
}

/// Builds a [`ClientConfig`] from defaults, file and environment.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    home: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `home` instead of `$SOLGUARD_HOME` / `~/.solguard`.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Uses the given variables instead of the process environment.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn load(self) -> Result<ClientConfig, ConfigError> {
        let env = match self.env {
            Some(env) => env,
            None => std::env::vars()
                .filter(|(k, _)| k.starts_with(ENV_PREFIX))
                .collect(),
        };

        let home = match self.home {
            Some(home) => home,
            None => resolve_home(&env)?,
        };

        let mut config = ClientConfig::with_home(home);
        let file = load_file_layer(&config.home)?;
        apply_file_layer(&mut config, file)?;
        apply_env_layer(&mut config, &env)?;

        tracing::debug!(
            base_url = %config.api_base_url,
            timeout_ms = config.request_timeout.as_millis() as u64,
            credential_store = ?config.credential_store,
            "client configuration loaded"
        );
        Ok(config)
    }
}

fn resolve_home(env: &HashMap<String, String>) -> Result<PathBuf, ConfigError> {
    if let Some(home) = env.get(ENV_HOME) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(HOME_DIR_NAME))
}

fn load_file_layer(home: &Path) -> Result<FileConfig, ConfigError> {
    let path = home.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(toml::from_str(&content)?)
}

fn apply_file_layer(config: &mut ClientConfig, file: FileConfig) -> Result<(), ConfigError> {
    if let Some(url) = file.api_base_url {
        config.set_api_base_url(&url)?;
    }
    if let Some(ms) = file.request_timeout_ms {
        if ms == 0 {
            return Err(ConfigError::InvalidFileValue {
                key: "request_timeout_ms".to_string(),
                value: ms.to_string(),
                expected: "a positive number of milliseconds".to_string(),
            });
        }
        config.request_timeout = Duration::from_millis(ms);
    }
    if let Some(store) = file.credential_store {
        config.credential_store = store;
    }
    if let Some(key) = file.token_key {
        if key.trim().is_empty() {
            return Err(ConfigError::InvalidFileValue {
                key: "token_key".to_string(),
                value: key,
                expected: "a non-empty key".to_string(),
            });
        }
        config.token_key = key;
    }
    if let Some(policy) = file.partial_failure_policy {
        config.partial_failure_policy = policy;
    }
    Ok(())
}

fn apply_env_layer(
    config: &mut ClientConfig,
    env: &HashMap<String, String>,
) -> Result<(), ConfigError> {
    if let Some(url) = env.get(ENV_BASE_URL) {
        config.set_api_base_url(url)?;
    }
    if let Some(value) = env.get(ENV_TIMEOUT_MS) {
        let ms = value
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| {
                invalid_env(ENV_TIMEOUT_MS, value, "a positive number of milliseconds")
            })?;
        config.request_timeout = Duration::from_millis(ms);
    }
    if let Some(value) = env.get(ENV_CREDENTIAL_STORE) {
        config.credential_store = value
            .parse()
            .map_err(|_| invalid_env(ENV_CREDENTIAL_STORE, value, "keyring, file or none"))?;
    }
    Ok(())
}

fn invalid_env(var: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidEnvValue {
        var: var.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
