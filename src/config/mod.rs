//! Configuration management for ragcheck
//!
//! A [`HarnessConfig`] is built once at startup from defaults, an optional
//! YAML file and the process environment, then handed to the credential
//! provider and the query client.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variables read by [`HarnessConfig::apply_env`]
pub mod env {
    pub const ENDPOINT: &str = "APIM_ENDPOINT";
    pub const TOKEN_URL: &str = "IMS_TOKEN_URL";
    pub const CLIENT_ID: &str = "IMS_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "IMS_CLIENT_SECRET";
    pub const CI: &str = "CI";
    pub const MANUAL_TOKEN: &str = "RAG_ACCESS_TOKEN";
    pub const CACHE_PARTITION: &str = "RAG_CACHE_PARTITION";
    pub const CACHE_DIR: &str = "RAGCHECK_CACHE_DIR";
}

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Base URL of the query API gateway (without `/api/query`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_endpoint: Option<String>,

    /// OAuth token endpoint used for the client-credentials grant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Label that selects the token cache file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_partition: Option<String>,

    /// Running under CI rather than on a developer machine
    #[serde(default)]
    pub is_automated_environment: bool,

    /// Token used verbatim, bypassing cache, issuer and login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_token_override: Option<String>,

    /// Directory holding token cache files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,

    /// External interactive login command
    #[serde(default)]
    pub login_command: LoginCommand,

    /// Index name sent with queries when none is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_index: Option<String>,

    /// Number of results requested when none is given
    #[serde(default = "default_count")]
    pub default_count: u32,
}

/// Command that prints a bearer token on stdout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for LoginCommand {
    fn default() -> Self {
        Self {
            program: "aio".to_string(),
            args: vec!["login".to_string(), "--bare".to_string()],
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_login_timeout_secs() -> u64 {
    120
}

fn default_count() -> u32 {
    3
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_endpoint: None,
            token_url: None,
            client_id: None,
            client_secret: None,
            cache_partition: None,
            is_automated_environment: false,
            manual_token_override: None,
            cache_dir: None,
            request_timeout_secs: default_request_timeout_secs(),
            login_timeout_secs: default_login_timeout_secs(),
            login_command: LoginCommand::default(),
            default_index: None,
            default_count: default_count(),
        }
    }
}

impl HarnessConfig {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".ragcheck").join("config.yaml"))
    }

    /// Load the file layer.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(Path::new(p)),
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::load_from(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: HarnessConfig = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Build the full configuration: file layer, then the process environment.
    pub fn from_environment(path: Option<&str>) -> Result<Self> {
        let mut config = Self::load_at(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay values from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(env::ENDPOINT) {
            self.base_endpoint = Some(v);
        }
        if let Some(v) = get(env::TOKEN_URL) {
            self.token_url = Some(v);
        }
        if let Some(v) = get(env::CLIENT_ID) {
            self.client_id = Some(v);
        }
        if let Some(v) = get(env::CLIENT_SECRET) {
            self.client_secret = Some(v);
        }
        if let Some(v) = get(env::CI) {
            self.is_automated_environment = is_truthy(&v);
        }
        if let Some(v) = get(env::MANUAL_TOKEN) {
            self.manual_token_override = Some(v);
        }
        if let Some(v) = get(env::CACHE_PARTITION) {
            self.cache_partition = Some(v);
        }
        if let Some(v) = get(env::CACHE_DIR) {
            self.cache_dir = Some(PathBuf::from(v));
        }
    }

    /// Query endpoint base URL without a trailing slash
    pub fn require_endpoint(&self) -> Result<&str> {
        self.base_endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/'))
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ConfigError::MissingEndpoint.into())
    }

    /// Cache partition label, safe for use in a file name
    pub fn partition(&self) -> String {
        let raw = match self.cache_partition.as_deref() {
            Some(p) if !p.trim().is_empty() => p.trim(),
            _ if self.is_automated_environment => "ci",
            _ => "local",
        };

        raw.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Directory for token cache files (~/.cache/ragcheck by default)
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        let base = dirs::cache_dir().ok_or(ConfigError::Invalid(
            "Could not determine cache directory".to_string(),
        ))?;
        Ok(base.join("ragcheck"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }
}

/// CI systems set `CI=true`; treat explicit negatives as unset.
fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}
