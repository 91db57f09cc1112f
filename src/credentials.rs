//! Lazily exchanged access tokens.
//!
//! [`TokenManager`] trades a client id/secret pair for an access token on
//! first use and caches it for the life of the process. There is no expiry
//! tracking and no background refresh: a token is re-fetched only after
//! [`TokenManager::invalidate`] or [`TokenManager::invalidate_if`] clears
//! the cache.

use crate::config::TokenExchangeConfig;
use crate::error::{LlmError, LlmResult};
use crate::logging::{log_debug, log_info, log_warn};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// A token obtained from the exchange endpoint
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub acquired_at: DateTime<Utc>,
    /// Lifetime reported by the endpoint, informational only.
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Process-wide cache for one exchanged credential
#[derive(Debug)]
pub struct TokenManager {
    client: reqwest::Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    cached: RwLock<Option<AccessToken>>,
    exchanges: AtomicU64,
}

impl TokenManager {
    pub fn new(config: &TokenExchangeConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &TokenExchangeConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            cached: RwLock::new(None),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Return the cached token, exchanging credentials first if none is cached.
    ///
    /// Returns `None` when no credentials are configured or the exchange
    /// fails; the failure is logged.
    pub async fn get_token(&self) -> Option<String> {
        match self.acquire().await {
            Ok(token) => Some(token),
            Err(error) => {
                log_warn!(error = %error, "Access token unavailable");
                None
            }
        }
    }

    /// Like [`get_token`](Self::get_token) but keeps the failure reason.
    pub async fn acquire(&self) -> LlmResult<String> {
        if let Some(token) = self.cached.read().await.as_ref() {
            return Ok(token.value.clone());
        }

        // Concurrent misses queue on the write lock; only the first exchanges.
        let mut slot = self.cached.write().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.value.clone());
        }

        let token = self.exchange().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call exchanges again.
    pub async fn invalidate(&self) {
        if self.cached.write().await.take().is_some() {
            log_info!("Cached access token invalidated");
        }
    }

    /// Drop the cached token only if it is still the one the backend rejected.
    ///
    /// A rejection that arrives after another worker already re-acquired
    /// leaves the newer token in place. Returns whether the cache was cleared.
    pub async fn invalidate_if(&self, rejected: &str) -> bool {
        let mut slot = self.cached.write().await;
        match slot.as_ref() {
            Some(token) if token.value == rejected => {
                *slot = None;
                log_info!("Rejected access token invalidated");
                true
            }
            Some(_) => {
                log_debug!("Rejected access token already replaced, keeping cache");
                false
            }
            None => false,
        }
    }

    /// Snapshot of the cached token, if any.
    pub async fn cached(&self) -> Option<AccessToken> {
        self.cached.read().await.clone()
    }

    /// Number of network exchanges performed so far.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    async fn exchange(&self) -> LlmResult<AccessToken> {
        let (Some(client_id), Some(client_secret)) = (
            self.client_id.as_deref().filter(|s| !s.is_empty()),
            self.client_secret.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Err(LlmError::credential_unavailable(
                "token exchange credentials are not configured",
            ));
        };

        self.exchanges.fetch_add(1, Ordering::Relaxed);
        log_debug!(token_url = %self.token_url, "Exchanging credentials for access token");

        let response = self
            .client
            .post(&self.token_url)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| LlmError::credential_unavailable(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            LlmError::credential_unavailable(format!("token response unreadable: {e}"))
        })?;

        if !status.is_success() {
            return Err(LlmError::credential_unavailable(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::credential_unavailable(format!("token response is not JSON: {e}"))
        })?;

        match parsed.access_token.filter(|t| !t.is_empty()) {
            Some(value) => {
                log_info!(expires_in = ?parsed.expires_in, "Access token acquired");
                Ok(AccessToken {
                    value,
                    acquired_at: Utc::now(),
                    expires_in: parsed.expires_in,
                })
            }
            None => Err(LlmError::credential_unavailable(format!(
                "token endpoint refused exchange: {} {}",
                parsed.error.unwrap_or_default(),
                parsed.error_description.unwrap_or_default()
            ))),
        }
    }
}
