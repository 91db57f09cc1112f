//! # policy-llm
//!
//! Concurrent dispatch of one prompt to several LLM backends, with a single
//! normalized result per model.
//!
//! ## Key Features
//!
//! - **Four backend families**: OpenAI-compatible chat, native text generation,
//!   token-exchange chat and a local HTTP model, each behind one adapter trait
//! - **Explicit routing**: model names resolve once to a tagged [`Route`]
//! - **Resilience**: bounded retries with deterministic exponential backoff,
//!   per-attempt timeouts, optional per-family rate limits
//! - **Total results**: every requested model gets exactly one [`CallOutcome`],
//!   whether it answered, failed, timed out or never reported
//!
//! ## Example
//!
//! ```rust,no_run
//! use policy_llm::{DispatchConfig, Dispatcher, FieldParser, KeyValueFieldParser};
//!
//! # async fn example() -> policy_llm::LlmResult<()> {
//! let dispatcher = Dispatcher::from_config(DispatchConfig::from_env()?)?;
//! let report = dispatcher
//!     .dispatch("政策文本……", &["qwen-turbo", "ernie-bot"])
//!     .await;
//!
//! let parser = KeyValueFieldParser::new([("policy_type", "未确定")]);
//! for (model, fields) in report.parse_fields(&parser) {
//!     println!("{model}: {fields:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![allow(clippy::missing_errors_doc)]

pub mod core_types;

// Logging utilities (re-exports tracing with log_* naming) - internal only
pub(crate) mod logging;

pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub(crate) mod internals;
pub mod providers;
pub mod response_parser;
pub mod router;

pub use internals::retry;

#[cfg(test)]
pub mod tests;

pub use config::{
    BackendFamily, CompatibleChatConfig, DispatchConfig, GenerationParams, LocalHttpConfig,
    ModelEntry, ModelTable, NativeGenConfig, RoutingRules, TokenExchangeConfig,
};
pub use core_types::{
    AdapterReply, CallOutcome, CallRequest, ChatMessage, MessageRole, OutcomeStatus, ReplyShape,
};
pub use credentials::{AccessToken, TokenManager};
pub use dispatch::{DispatchReport, Dispatcher};
pub use error::{ErrorCategory, ErrorSeverity, FailureKind, LlmError, LlmResult};
pub use providers::{
    AdapterSet, BackendAdapter, CompatibleChatAdapter, LocalHttpAdapter, NativeGenAdapter,
    TokenExchangeAdapter,
};
pub use response_parser::{FieldMap, FieldParser, KeyValueFieldParser};
pub use retry::{RetryExecutor, RetryOutcome, RetryPolicy};
pub use router::{ModelRouter, Route};
