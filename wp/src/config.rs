//! Workpilot configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use boardclient::{CredentialsConfig, RetryConfig};

/// Main workpilot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend connection and credentials
    pub backend: BackendConfig,

    /// Retry tuning for the resilient client
    pub retry: RetryConfig,

    /// Batch execution tuning
    pub execution: ExecutionConfig,

    /// Default log level (overridden by --log-level)
    pub log_level: Option<String>,
}

/// Connection settings for the work-item tracking backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL including the organization segment,
    /// e.g. `https://dev.azure.com/acme`
    pub organization_url: String,

    /// Organization name used in session keys; derived from the URL when
    /// left empty.
    pub organization: String,

    /// Project the workflow operates in
    pub project: String,

    /// Credential material (static token or client-credential triple)
    pub credentials: CredentialsConfig,

    /// HTTP timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            organization_url: String::new(),
            organization: String::new(),
            project: String::new(),
            credentials: CredentialsConfig::default(),
            timeout_ms: 30_000,
        }
    }
}

impl BackendConfig {
    /// Organization component of session keys.
    pub fn organization_key(&self) -> String {
        if !self.organization.is_empty() {
            return self.organization.clone();
        }
        self.organization_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

/// Batch execution tuning for the execute stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Default creations per chunk
    pub batch_size: usize,

    /// Hard ceiling on a caller-requested batch size
    pub max_batch_size: usize,

    /// Fixed pause between chunks, in milliseconds
    pub batch_delay_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_batch_size: 200,
            batch_delay_ms: 1000,
        }
    }
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.backend.organization_url.is_empty() {
            return Err(eyre::eyre!("backend.organization_url is not set"));
        }
        if self.backend.project.is_empty() {
            return Err(eyre::eyre!("backend.project is not set"));
        }
        let credentials = &self.backend.credentials;
        if credentials.token.is_none() && !credentials.has_client_credentials() {
            return Err(eyre::eyre!(
                "no credentials configured: set backend.credentials.token or the full \
                 tenant_id/client_id/client_secret triple"
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain: explicit path, then
    /// `.workpilot.yml`, then the user config directory, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".workpilot.yml");
        if local_config.exists() {
            return Self::load_from_file(&local_config).context("Failed to load .workpilot.yml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("workpilot").join("config.yml");
            if user_config.exists() {
                return Self::load_from_file(&user_config)
                    .context(format!("Failed to load config from {}", user_config.display()));
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&contents).context(format!("Failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.execution.batch_size, 50);
        assert_eq!(config.execution.max_batch_size, 200);
        assert_eq!(config.execution.batch_delay_ms, 1000);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.backend.timeout_ms, 30_000);
    }

    #[test]
    fn test_validate_rejects_missing_credentials() {
        let mut config = Config::default();
        config.backend.organization_url = "https://board.test/acme".to_string();
        config.backend.project = "web".to_string();
        assert!(config.validate().is_err());

        config.backend.credentials.token = Some("pat".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_organization_key_derived_from_url() {
        let mut backend = BackendConfig {
            organization_url: "https://dev.azure.com/acme/".to_string(),
            ..Default::default()
        };
        assert_eq!(backend.organization_key(), "acme");

        backend.organization = "explicit".to_string();
        assert_eq!(backend.organization_key(), "explicit");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "backend:\n  organization_url: https://board.test/acme\n  project: web\n\
             execution:\n  batch_size: 25\nretry:\n  max_retries: 5"
        )
        .unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.backend.project, "web");
        assert_eq!(config.execution.batch_size, 25);
        assert_eq!(config.execution.max_batch_size, 200);
        assert_eq!(config.retry.max_retries, 5);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/workpilot.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
