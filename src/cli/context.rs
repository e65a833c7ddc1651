//! Command execution context
//!
//! Builds the configuration once and hands it explicitly to the credential
//! provider and query client, so handlers never read the environment.

use std::sync::Arc;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::QueryClient;
use crate::config::HarnessConfig;
use crate::credential::{
    CredentialProvider, CredentialStore, FileCredentialStore, MemoryCredentialStore,
};
use crate::error::{ConfigError, Result};

/// Context for command execution: merged config plus runtime options.
pub struct HarnessContext {
    /// Defaults, config file, environment and CLI overrides, in that order
    pub config: HarnessConfig,
    /// Output format preference
    pub format: OutputFormat,
    no_persist: bool,
}

impl HarnessContext {
    /// Load configuration and apply CLI overrides.
    ///
    /// # Errors
    /// Returns an error if an explicit config file is missing or malformed.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let mut config = HarnessConfig::from_environment(opts.config_ref())?;
        apply_overrides(&mut config, opts)?;

        Ok(Self {
            config,
            format: opts.format,
            no_persist: opts.no_persist,
        })
    }

    /// Token cache for this run
    pub fn store(&self) -> Result<Arc<dyn CredentialStore>> {
        if self.no_persist {
            return Ok(Arc::new(MemoryCredentialStore::new()));
        }
        Ok(Arc::new(FileCredentialStore::new(self.config.cache_dir()?)))
    }

    /// Credential provider over the standard source chain
    pub fn provider(&self) -> Result<CredentialProvider> {
        CredentialProvider::from_config(&self.config, self.store()?)
    }

    /// Query client for the configured endpoint
    pub fn client(&self) -> Result<QueryClient> {
        QueryClient::from_config(&self.config)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn apply_overrides(config: &mut HarnessConfig, opts: &GlobalOptions) -> Result<()> {
    if let Some(endpoint) = opts.endpoint_ref() {
        config.base_endpoint = Some(endpoint.to_string());
    }
    if let Some(secs) = opts.timeout {
        if secs == 0 {
            return Err(ConfigError::Invalid("--timeout must be at least 1 second".to_string()).into());
        }
        config.request_timeout_secs = secs;
    }
    Ok(())
}
