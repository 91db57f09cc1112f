//! Test helper utilities for policy-llm integration tests
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

// Allow dead code in test utilities - functions are used across different test files
#![allow(dead_code)]

use policy_llm::config::DEFAULT_SYSTEM_PROMPT;
use policy_llm::{CallRequest, DispatchConfig, ModelRouter, RetryPolicy, Route};
use std::sync::Arc;
use std::time::Duration;

pub const TOKEN_PATH: &str = "/oauth/2.0/token";
pub const ASSISTANT_PATH: &str = "/wenxinworkshop/chat";
pub const LOCAL_PATH: &str = "/local/chat";

/// Config whose every backend points at `server_uri`, with test credentials.
pub fn mock_config(server_uri: &str) -> DispatchConfig {
    let mut config = DispatchConfig::default();
    config.compatible.base_url = server_uri.to_string();
    config.compatible.api_key = Some("test-dashscope-key".to_string());
    config.native.base_url = server_uri.to_string();
    config.native.api_key = Some("test-dashscope-key".to_string());
    config.token_exchange.base_url = format!("{server_uri}{ASSISTANT_PATH}");
    config.token_exchange.token_url = format!("{server_uri}{TOKEN_PATH}");
    config.token_exchange.client_id = Some("test-client-id".to_string());
    config.token_exchange.client_secret = Some("test-client-secret".to_string());
    config.local.endpoint = format!("{server_uri}{LOCAL_PATH}");
    config.retry_policy = fast_retry_policy(3);
    config.dispatch_timeout = Duration::from_secs(10);
    config
}

/// Retry policy with millisecond delays so failing tests stay fast.
pub fn fast_retry_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        request_timeout: Duration::from_secs(5),
    }
}

/// Route `model` the way the dispatcher would.
pub fn route_for(config: &DispatchConfig, model: &str) -> Route {
    ModelRouter::new(Arc::new(config.clone()))
        .resolve(model)
        .expect("test model should route")
}

pub fn request(prompt: &str) -> CallRequest {
    CallRequest::new(prompt, DEFAULT_SYSTEM_PROMPT)
}

pub fn chat_completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16 }
    })
}

pub fn token_grant(token: &str) -> serde_json::Value {
    serde_json::json!({ "access_token": token, "expires_in": 2592000 })
}
