//! Client-side configuration: retry tuning and credential material

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry tuning for the resilient client.
///
/// 5xx and network failures follow the exponential schedule derived from
/// these values; 429 responses use the server-provided Retry-After delay
/// instead, sharing only the `max_retries` ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (so `max_retries + 1` total calls).
    pub max_retries: u32,
    /// First backoff delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Ceiling on any single backoff delay.
    pub max_delay_ms: u64,
    /// Multiplier applied per attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Exponential delay for the given attempt, capped at `max_delay_ms`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let ms = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(ms.min(self.max_delay_ms as f64) as u64)
    }

    /// Flat delay used after a 401 before retrying with fresh credentials.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

/// Credential material: either a static token or the full client-credential
/// triple. `BoardCredentials::from_config` rejects configs with neither.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Static bearer token (personal access token).
    pub token: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Override for the token-exchange endpoint. Defaults to the identity
    /// provider URL derived from `tenant_id`.
    pub token_url: Option<String>,
}

impl CredentialsConfig {
    pub fn has_client_credentials(&self) -> bool {
        self.tenant_id.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.initial_delay_ms, 1000);
        assert_eq!(retry.max_delay_ms, 30_000);
        assert_eq!(retry.backoff_multiplier, 2.0);
    }

    #[test]
    fn test_backoff_delay_doubles_per_attempt() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(retry.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(retry.backoff_delay(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_delay_capped_at_max() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff_delay(10), Duration::from_millis(30_000));
    }

    #[test]
    fn test_has_client_credentials_requires_full_triple() {
        let mut config = CredentialsConfig {
            tenant_id: Some("tenant".to_string()),
            client_id: Some("client".to_string()),
            ..Default::default()
        };
        assert!(!config.has_client_credentials());
        config.client_secret = Some("secret".to_string());
        assert!(config.has_client_credentials());
    }
}
