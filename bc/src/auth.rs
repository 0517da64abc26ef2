//! Credential provider: static tokens and OAuth client-credential exchange
//!
//! Client-credential tokens are cached against their expiry and refreshed
//! once they fall inside a five-minute staleness buffer. The retry wrapper
//! invalidates the cache on 401 so the next attempt exchanges a fresh token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::CredentialsConfig;
use crate::error::ClientError;
use crate::transport::{ApiRequest, Transport};

/// Freshness buffer: a cached token within this window of its expiry is
/// treated as stale and refreshed.
const EXPIRY_BUFFER_SECS: i64 = 300;

/// Resource scope requested during the client-credential exchange.
const TOKEN_SCOPE: &str = "499b84ac-1321-427f-aa17-267ca6975798/.default";

/// Produces the Authorization header for each outbound call.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_auth_header(&self) -> Result<String, ClientError>;

    /// Drop any cached token. Idempotent, safe when nothing is cached.
    async fn invalidate(&self);
}

/// A bearer token with an absolute expiry instant.
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// A token is fresh while `now + buffer` is still before its expiry.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(EXPIRY_BUFFER_SECS) < self.expires_at
    }
}

enum Mode {
    Static(String),
    ClientCredentials {
        client_id: String,
        client_secret: String,
        token_url: String,
    },
}

/// Default credential provider covering both configuration modes.
pub struct BoardCredentials {
    mode: Mode,
    cache: Mutex<Option<CachedToken>>,
    transport: Arc<dyn Transport>,
}

impl BoardCredentials {
    /// Build from config. Fails with `Configuration` when neither a static
    /// token nor the full tenant/client id/secret triple is present.
    pub fn from_config(config: &CredentialsConfig, transport: Arc<dyn Transport>) -> Result<Self, ClientError> {
        debug!(
            has_token = config.token.is_some(),
            has_triple = config.has_client_credentials(),
            "from_config: called"
        );
        let mode = if let Some(token) = &config.token {
            Mode::Static(token.clone())
        } else if config.has_client_credentials() {
            let tenant = config.tenant_id.as_deref().unwrap_or_default();
            let token_url = config
                .token_url
                .clone()
                .unwrap_or_else(|| format!("https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token"));
            Mode::ClientCredentials {
                client_id: config.client_id.clone().unwrap_or_default(),
                client_secret: config.client_secret.clone().unwrap_or_default(),
                token_url,
            }
        } else {
            return Err(ClientError::Configuration(
                "no credentials configured: set a static token or the full tenant/client-id/client-secret triple"
                    .to_string(),
            ));
        };

        Ok(Self {
            mode,
            cache: Mutex::new(None),
            transport,
        })
    }

    async fn exchange(&self, client_id: &str, client_secret: &str, token_url: &str) -> Result<CachedToken, ClientError> {
        debug!("exchange: requesting client-credential token");
        let request = ApiRequest::form(
            token_url.to_string(),
            vec![
                ("grant_type".to_string(), "client_credentials".to_string()),
                ("client_id".to_string(), client_id.to_string()),
                ("client_secret".to_string(), client_secret.to_string()),
                ("scope".to_string(), TOKEN_SCOPE.to_string()),
            ],
        );
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        if !response.is_success() {
            return Err(ClientError::Api {
                status: response.status,
                body: response.body,
            });
        }
        let parsed: TokenResponse = response.json()?;
        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: Utc::now() + ChronoDuration::seconds(parsed.expires_in),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[async_trait]
impl CredentialProvider for BoardCredentials {
    async fn get_auth_header(&self) -> Result<String, ClientError> {
        match &self.mode {
            Mode::Static(token) => Ok(format!("Bearer {token}")),
            Mode::ClientCredentials {
                client_id,
                client_secret,
                token_url,
            } => {
                let mut cache = self.cache.lock().await;
                if let Some(cached) = cache.as_ref()
                    && cached.is_fresh(Utc::now())
                {
                    return Ok(format!("Bearer {}", cached.token));
                }
                debug!("get_auth_header: cached token missing or stale, refreshing");
                let token = self.exchange(client_id, client_secret, token_url).await?;
                let header = format!("Bearer {}", token.token);
                *cache = Some(token);
                Ok(header)
            }
        }
    }

    async fn invalidate(&self) {
        debug!("invalidate: clearing cached token");
        let mut cache = self.cache.lock().await;
        *cache = None;
    }
}
