//! Token-exchange adapter
//!
//! Chat endpoint guarded by an access token from [`TokenManager`]. The
//! backend model id is appended to the base URL as a path segment and the
//! token travels both as the `access_token` query parameter the endpoint
//! expects and as a bearer header.
//!
//! The endpoint reports most failures in-band with HTTP 200 and an
//! `error_code`. Codes 110/111 (invalid or expired token) and HTTP 401
//! invalidate the cached token, if it is still the one that was sent, and fail with
//! [`LlmError::CredentialUnavailable`], so the next retry attempt
//! re-acquires a fresh one.

use super::http::BackendHttpClient;
use super::BackendAdapter;
use crate::config::{BackendFamily, TokenExchangeConfig};
use crate::core_types::{AdapterReply, CallRequest, ChatMessage};
use crate::credentials::TokenManager;
use crate::error::{LlmError, LlmResult};
use crate::logging::{log_debug, log_warn};
use crate::router::Route;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// In-band codes meaning the access token is invalid or expired.
const STALE_TOKEN_CODES: [i64; 2] = [110, 111];

#[derive(Debug, Serialize)]
struct AssistantRequest {
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct AssistantResponse {
    result: Option<String>,
    error_code: Option<i64>,
    error_msg: Option<String>,
}

#[derive(Debug)]
pub struct TokenExchangeAdapter {
    http: BackendHttpClient,
    tokens: Arc<TokenManager>,
}

impl TokenExchangeAdapter {
    pub fn new(config: &TokenExchangeConfig, tokens: Arc<TokenManager>) -> Self {
        Self {
            http: BackendHttpClient::new(BackendFamily::TokenExchange, config.requests_per_minute),
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// The endpoint takes user turns only; the system prompt has its own field.
    fn build_request(request: &CallRequest, route: &Route) -> AssistantRequest {
        AssistantRequest {
            messages: vec![ChatMessage::user(request.prompt())],
            system: request.system_prompt().to_string(),
            temperature: route.temperature,
            top_p: route.top_p,
        }
    }

    async fn interpret(&self, body: &str, token: &str) -> LlmResult<AdapterReply> {
        let response: AssistantResponse = serde_json::from_str(body).map_err(|e| {
            LlmError::response_parsing_error(format!("Invalid assistant response: {e}"))
        })?;

        if let Some(code) = response.error_code {
            let message = response.error_msg.unwrap_or_default();
            if STALE_TOKEN_CODES.contains(&code) {
                log_warn!(error_code = code, "Access token rejected, invalidating cache");
                self.tokens.invalidate_if(token).await;
                return Err(LlmError::credential_unavailable(format!(
                    "access token rejected ({code}): {message}"
                )));
            }
            return Err(LlmError::request_failed(
                format!("assistant API error {code}: {message}"),
                None,
            ));
        }

        response
            .result
            .map(AdapterReply::clean)
            .ok_or_else(|| LlmError::response_parsing_error("Assistant response has no result"))
    }
}

#[async_trait]
impl BackendAdapter for TokenExchangeAdapter {
    async fn invoke(&self, request: &CallRequest, route: &Route) -> LlmResult<AdapterReply> {
        let token = self.tokens.acquire().await?;

        let url = format!(
            "{}/{}",
            route.endpoint.trim_end_matches('/'),
            route.backend_model_id.trim_start_matches('/')
        );
        let headers = BackendHttpClient::json_headers(Some(&token))?;
        let body = Self::build_request(request, route);

        log_debug!(
            model = %route.model_name,
            backend_model_id = %route.backend_model_id,
            url = %url,
            "Sending token-exchange request"
        );

        let url = reqwest::Url::parse_with_params(&url, &[("access_token", token.as_str())])
            .map_err(|e| LlmError::configuration_error(format!("Invalid endpoint {url}: {e}")))?;

        let reply = match self.http.post_json(url.as_str(), headers, &body).await {
            Ok(reply) => reply,
            Err(LlmError::AuthenticationFailed { message }) => {
                self.tokens.invalidate_if(&token).await;
                return Err(LlmError::credential_unavailable(message));
            }
            Err(e) => return Err(e),
        };

        self.interpret(&reply.body, &token).await
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::TokenExchange
    }
}
