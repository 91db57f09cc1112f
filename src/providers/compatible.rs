//! Compatible-chat adapter
//!
//! Sends a system + user message pair to an OpenAI-compatible
//! `/chat/completions` endpoint and returns the first choice's text.

use super::http::BackendHttpClient;
use super::openai_shared::{OpenAIRequest, OpenAIResponse};
use super::BackendAdapter;
use crate::config::{BackendFamily, CompatibleChatConfig};
use crate::core_types::{AdapterReply, CallRequest};
use crate::error::{LlmError, LlmResult};
use crate::logging::log_debug;
use crate::router::Route;
use async_trait::async_trait;

#[derive(Debug)]
pub struct CompatibleChatAdapter {
    http: BackendHttpClient,
}

impl CompatibleChatAdapter {
    pub fn new(config: &CompatibleChatConfig) -> Self {
        Self {
            http: BackendHttpClient::new(BackendFamily::CompatibleChat, config.requests_per_minute),
        }
    }

    fn build_request(request: &CallRequest, route: &Route) -> OpenAIRequest {
        OpenAIRequest {
            model: route.backend_model_id.clone(),
            messages: request.chat_messages(),
            temperature: Some(route.temperature),
            top_p: Some(route.top_p),
            max_tokens: Some(route.max_output_tokens),
        }
    }

    fn parse_response(body: &str) -> LlmResult<AdapterReply> {
        let response: OpenAIResponse = serde_json::from_str(body)
            .map_err(|e| LlmError::response_parsing_error(format!("Invalid chat response: {e}")))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::response_parsing_error("No choices in chat response"))?;

        if let Some(usage) = &response.usage {
            log_debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion usage"
            );
        }

        match choice.message.content {
            Some(content) => Ok(AdapterReply::clean(content)),
            None => Err(LlmError::response_parsing_error(
                "Chat response choice has no message content",
            )),
        }
    }
}

#[async_trait]
impl BackendAdapter for CompatibleChatAdapter {
    async fn invoke(&self, request: &CallRequest, route: &Route) -> LlmResult<AdapterReply> {
        let api_key = route.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            LlmError::configuration_error(format!("No API key configured for {}", route.model_name))
        })?;

        let url = format!("{}/chat/completions", route.endpoint.trim_end_matches('/'));
        let headers = BackendHttpClient::json_headers(Some(api_key))?;
        let body = Self::build_request(request, route);

        log_debug!(
            model = %route.model_name,
            backend_model_id = %route.backend_model_id,
            url = %url,
            max_tokens = route.max_output_tokens,
            "Sending compatible chat request"
        );

        let reply = self.http.post_json(&url, headers, &body).await?;
        Self::parse_response(&reply.body)
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::CompatibleChat
    }
}
