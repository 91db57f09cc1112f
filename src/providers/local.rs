//! Locally hosted model adapter
//!
//! Posts `{prompt, history, temperature, top_p}` to a single endpoint and
//! reads the reply from `response`. No credential is sent.

use super::http::BackendHttpClient;
use super::BackendAdapter;
use crate::config::{BackendFamily, LocalHttpConfig};
use crate::core_types::{AdapterReply, CallRequest};
use crate::error::{LlmError, LlmResult};
use crate::logging::log_debug;
use crate::router::Route;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct LocalRequest<'a> {
    prompt: &'a str,
    history: Vec<[String; 2]>,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct LocalResponse {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug)]
pub struct LocalHttpAdapter {
    http: BackendHttpClient,
    strip_role_echo: bool,
}

impl LocalHttpAdapter {
    pub fn new(config: &LocalHttpConfig) -> Self {
        Self {
            http: BackendHttpClient::new(BackendFamily::LocalHttp, None),
            strip_role_echo: config.strip_role_echo,
        }
    }

    fn parse_response(&self, body: &str) -> LlmResult<AdapterReply> {
        let response: LocalResponse = serde_json::from_str(body)
            .map_err(|e| LlmError::response_parsing_error(format!("Invalid local response: {e}")))?;

        let text = response.response.unwrap_or_default();
        let text = if self.strip_role_echo {
            strip_role_echo(&text).to_string()
        } else {
            text
        };

        if text.trim().is_empty() {
            return Err(LlmError::empty_response(BackendFamily::LocalHttp.as_str()));
        }
        Ok(AdapterReply::clean(text))
    }
}

/// Drop a chat-template echo: everything up to the last `assistant` marker.
pub fn strip_role_echo(text: &str) -> &str {
    match text.rfind("assistant") {
        Some(pos) => text[pos + "assistant".len()..].trim_start(),
        None => text,
    }
}

#[async_trait]
impl BackendAdapter for LocalHttpAdapter {
    async fn invoke(&self, request: &CallRequest, route: &Route) -> LlmResult<AdapterReply> {
        let headers = BackendHttpClient::json_headers(None)?;
        let body = LocalRequest {
            prompt: request.prompt(),
            history: Vec::new(),
            temperature: route.temperature,
            top_p: route.top_p,
        };

        log_debug!(
            model = %route.model_name,
            url = %route.endpoint,
            "Sending local model request"
        );

        let reply = self.http.post_json(&route.endpoint, headers, &body).await?;
        self.parse_response(&reply.body)
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::LocalHttp
    }
}
