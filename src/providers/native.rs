//! Native text-generation adapter
//!
//! Request body is `{model, input: {messages}, parameters}`. The success
//! schema varies by model: the reply is read from `output.text`, else from
//! `output.message` (a string, or an object with `content`). A 2xx body
//! with neither is returned as a [`ReplyShape::RawFallback`] reply rather
//! than an error.
//!
//! [`ReplyShape::RawFallback`]: crate::core_types::ReplyShape::RawFallback

use super::http::BackendHttpClient;
use super::BackendAdapter;
use crate::config::{BackendFamily, NativeGenConfig};
use crate::core_types::{AdapterReply, CallRequest, ChatMessage};
use crate::error::{LlmError, LlmResult};
use crate::logging::{log_debug, log_warn, preview};
use crate::router::Route;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub const GENERATION_PATH: &str = "/services/foundation-models/text-generation/generation";

#[derive(Debug, Serialize)]
struct NativeRequest {
    model: String,
    input: NativeInput,
    parameters: NativeParameters,
}

#[derive(Debug, Serialize)]
struct NativeInput {
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct NativeParameters {
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
}

#[derive(Debug)]
pub struct NativeGenAdapter {
    http: BackendHttpClient,
}

impl NativeGenAdapter {
    pub fn new(config: &NativeGenConfig) -> Self {
        Self {
            http: BackendHttpClient::new(BackendFamily::NativeGen, config.requests_per_minute),
        }
    }

    /// Extract the reply text, falling back to the raw body.
    pub fn parse_response(body: &str) -> AdapterReply {
        let output = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("output").cloned());

        let text = output.as_ref().and_then(|output| {
            if let Some(text) = output.get("text").and_then(Value::as_str) {
                return Some(text.to_string());
            }
            match output.get("message")? {
                Value::String(message) => Some(message.clone()),
                Value::Object(message) => message
                    .get("content")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            }
        });

        match text {
            Some(text) => AdapterReply::clean(text),
            None => {
                log_warn!(
                    body_preview = %preview(body, 200),
                    "Native response has neither output.text nor output.message, using raw body"
                );
                AdapterReply::raw_fallback(body)
            }
        }
    }
}

#[async_trait]
impl BackendAdapter for NativeGenAdapter {
    async fn invoke(&self, request: &CallRequest, route: &Route) -> LlmResult<AdapterReply> {
        let api_key = route.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            LlmError::configuration_error(format!("No API key configured for {}", route.model_name))
        })?;

        let url = format!("{}{}", route.endpoint.trim_end_matches('/'), GENERATION_PATH);
        let headers = BackendHttpClient::json_headers(Some(api_key))?;
        let body = NativeRequest {
            model: route.backend_model_id.clone(),
            input: NativeInput {
                messages: request.chat_messages(),
            },
            parameters: NativeParameters {
                temperature: route.temperature,
                top_p: route.top_p,
                max_tokens: route.max_output_tokens,
            },
        };

        log_debug!(
            model = %route.model_name,
            backend_model_id = %route.backend_model_id,
            url = %url,
            "Sending native generation request"
        );

        let reply = self.http.post_json(&url, headers, &body).await?;
        Ok(Self::parse_response(&reply.body))
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::NativeGen
    }
}
