//! Test helper utilities for policy-llm unit tests
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

#![allow(dead_code)]

use crate::config::{BackendFamily, DispatchConfig, ModelEntry};
use crate::core_types::AdapterReply;
use crate::credentials::TokenManager;
use crate::error::{LlmError, LlmResult};
use crate::providers::{AdapterSet, MockBackendAdapter};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

/// Retry policy with millisecond delays so failing tests stay fast.
pub fn fast_retry_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        backoff_multiplier: 2.0,
        request_timeout: Duration::from_secs(5),
    }
}

/// Default config with fast retries and the given models pinned to families.
pub fn config_with_models(pins: &[(&str, BackendFamily)]) -> DispatchConfig {
    let mut config = DispatchConfig {
        retry_policy: fast_retry_policy(3),
        dispatch_timeout: Duration::from_secs(5),
        ..DispatchConfig::default()
    };
    for (name, family) in pins {
        config.models.upsert(ModelEntry::new(*name).family(*family));
    }
    config
}

/// Production adapters for every family, with nothing listening behind them.
pub fn unreachable_adapters(config: &DispatchConfig) -> AdapterSet {
    AdapterSet::from_config(config, Arc::new(TokenManager::new(&config.token_exchange)))
}

/// Adapter that always answers `content`.
pub fn answering_adapter(family: BackendFamily, content: &'static str) -> MockBackendAdapter {
    let mut adapter = MockBackendAdapter::new();
    adapter
        .expect_invoke()
        .returning(move |_, _| Ok(AdapterReply::clean(content)));
    adapter.expect_family().return_const(family);
    adapter
}

/// Adapter that always fails with a retryable transport error.
pub fn failing_adapter(family: BackendFamily) -> MockBackendAdapter {
    let mut adapter = MockBackendAdapter::new();
    adapter
        .expect_invoke()
        .returning(|_, _| Err(connection_refused()));
    adapter.expect_family().return_const(family);
    adapter
}

pub fn connection_refused() -> LlmError {
    LlmError::request_failed("connection refused", None)
}

pub fn ok_reply(content: &str) -> LlmResult<AdapterReply> {
    Ok(AdapterReply::clean(content))
}

/// Adapter that answers only after `delay`, for timeout tests.
#[derive(Debug)]
pub struct SlowAdapter {
    pub family: BackendFamily,
    pub delay: Duration,
}

#[async_trait::async_trait]
impl crate::providers::BackendAdapter for SlowAdapter {
    async fn invoke(
        &self,
        _request: &crate::core_types::CallRequest,
        _route: &crate::router::Route,
    ) -> LlmResult<AdapterReply> {
        tokio::time::sleep(self.delay).await;
        ok_reply("too late")
    }

    fn family(&self) -> BackendFamily {
        self.family
    }
}

/// Adapter whose worker dies before reporting an outcome.
#[derive(Debug)]
pub struct PanickingAdapter;

#[async_trait::async_trait]
impl crate::providers::BackendAdapter for PanickingAdapter {
    async fn invoke(
        &self,
        _request: &crate::core_types::CallRequest,
        _route: &crate::router::Route,
    ) -> LlmResult<AdapterReply> {
        panic!("adapter bug")
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::NativeGen
    }
}
