//! Error types for backend dispatch.
//!
//! Every failure a backend call can produce is an [`LlmError`]. Errors never
//! escape the dispatch boundary: the dispatcher folds them into a
//! [`CallOutcome`](crate::core_types::CallOutcome) carrying the error text and
//! a [`FailureKind`] tag.
//!
//! # Error Handling Example
//!
//! ```rust
//! use policy_llm::{LlmError, error::ErrorCategory};
//!
//! fn handle_error(err: LlmError) {
//!     if err.is_retryable() {
//!         println!("Retryable error: {}", err);
//!     }
//!
//!     match err.category() {
//!         ErrorCategory::Transient => println!("Temporary issue, try again later"),
//!         ErrorCategory::Client => println!("Fix the request or configuration"),
//!         _ => println!("Backend or system issue"),
//!     }
//! }
//! ```

use crate::logging::{log_error, log_warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error categorization types
// ============================================================================

/// High-level categorization of errors for routing and handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// External service failures (model backends, network issues).
    External,

    /// Internal failures (a worker that never reported).
    Internal,

    /// Caller or configuration errors (unknown model, missing key).
    Client,

    /// Temporary failures that should be retried.
    Transient,
}

/// Severity level for logging and alerting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Action failed but system is stable.
    Error,

    /// Unexpected but recoverable situation.
    Warning,

    /// Expected failure, log at info/debug level.
    Info,
}

/// Serializable tag naming which failure produced an error outcome.
///
/// Downstream consumers treat `Timeout` and `Incomplete` identically; the
/// distinction is kept for operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnrecognizedModel,
    Configuration,
    Transport,
    ResponseParsing,
    EmptyResponse,
    RateLimited,
    Authentication,
    CredentialUnavailable,
    Timeout,
    Incomplete,
}

// ============================================================================
// Error type
// ============================================================================

/// Convenient result type for backend operations.
pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Errors that can occur while routing or calling a model backend.
///
/// | Variant | Category | Retryable |
/// |---------|----------|-----------|
/// | `UnrecognizedModel` | Client | No |
/// | `ConfigurationError` | Client | No |
/// | `RequestFailed` | External | Yes |
/// | `ResponseParsingError` | External | No |
/// | `EmptyResponse` | External | Yes |
/// | `RateLimitExceeded` | Transient | Yes |
/// | `AuthenticationFailed` | Client | No |
/// | `CredentialUnavailable` | Transient | Yes |
/// | `Timeout` | Transient | Yes |
/// | `Incomplete` | Internal | No |
#[derive(Error, Debug)]
pub enum LlmError {
    /// No routing rule matches the model name.
    #[error("Unrecognized model: {model}")]
    UnrecognizedModel {
        /// The model name that was requested.
        model: String,
    },

    /// Configuration is invalid or incomplete for this call.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },

    /// Network or HTTP failure inside an adapter.
    #[error("Request failed: {message}")]
    RequestFailed {
        /// Description of the failure.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend answered but the reply could not be interpreted.
    #[error("Response parsing failed: {message}")]
    ResponseParsingError {
        /// Details about the parsing failure.
        message: String,
    },

    /// The backend answered with an empty reply.
    #[error("Empty response from {backend}")]
    EmptyResponse {
        /// Backend family or endpoint that answered.
        backend: String,
    },

    /// Backend rate limit exceeded.
    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimitExceeded {
        /// Recommended wait time before retrying.
        retry_after_seconds: u64,
    },

    /// The backend rejected a static API key.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Details about the authentication failure.
        message: String,
    },

    /// An exchanged token could not be obtained, or was rejected.
    ///
    /// Retried by the retry executor, which re-attempts acquisition.
    #[error("Credential unavailable: {message}")]
    CredentialUnavailable {
        /// Details about the exchange failure.
        message: String,
    },

    /// A call did not finish within its time budget.
    #[error("Request timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// A worker never reported an outcome.
    #[error("Incomplete: no outcome recorded for {model}")]
    Incomplete {
        /// The model whose worker went missing.
        model: String,
    },
}

impl LlmError {
    /// Get the error category for routing and handling decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnrecognizedModel { .. } => ErrorCategory::Client,
            Self::ConfigurationError { .. } => ErrorCategory::Client,
            Self::RequestFailed { .. } => ErrorCategory::External,
            Self::ResponseParsingError { .. } => ErrorCategory::External,
            Self::EmptyResponse { .. } => ErrorCategory::External,
            Self::RateLimitExceeded { .. } => ErrorCategory::Transient,
            Self::AuthenticationFailed { .. } => ErrorCategory::Client,
            Self::CredentialUnavailable { .. } => ErrorCategory::Transient,
            Self::Timeout { .. } => ErrorCategory::Transient,
            Self::Incomplete { .. } => ErrorCategory::Internal,
        }
    }

    /// Get the error severity for logging and alerting.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnrecognizedModel { .. } => ErrorSeverity::Error,
            Self::ConfigurationError { .. } => ErrorSeverity::Error,
            Self::RequestFailed { .. } => ErrorSeverity::Error,
            Self::ResponseParsingError { .. } => ErrorSeverity::Warning,
            Self::EmptyResponse { .. } => ErrorSeverity::Warning,
            Self::RateLimitExceeded { .. } => ErrorSeverity::Warning,
            Self::AuthenticationFailed { .. } => ErrorSeverity::Error,
            Self::CredentialUnavailable { .. } => ErrorSeverity::Warning,
            Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Incomplete { .. } => ErrorSeverity::Info,
        }
    }

    /// Whether another attempt of the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. }
                | Self::EmptyResponse { .. }
                | Self::RateLimitExceeded { .. }
                | Self::CredentialUnavailable { .. }
                | Self::Timeout { .. }
        )
    }

    /// Tag recorded in a failed [`CallOutcome`](crate::core_types::CallOutcome).
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnrecognizedModel { .. } => FailureKind::UnrecognizedModel,
            Self::ConfigurationError { .. } => FailureKind::Configuration,
            Self::RequestFailed { .. } => FailureKind::Transport,
            Self::ResponseParsingError { .. } => FailureKind::ResponseParsing,
            Self::EmptyResponse { .. } => FailureKind::EmptyResponse,
            Self::RateLimitExceeded { .. } => FailureKind::RateLimited,
            Self::AuthenticationFailed { .. } => FailureKind::Authentication,
            Self::CredentialUnavailable { .. } => FailureKind::CredentialUnavailable,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Incomplete { .. } => FailureKind::Incomplete,
        }
    }

    // =========================================================================
    // Constructor methods with automatic logging
    // =========================================================================

    /// Create an unrecognized model error (logs at ERROR level).
    pub fn unrecognized_model(model: impl Into<String>) -> Self {
        let model = model.into();
        log_error!(
            model = %model,
            error_type = "unrecognized_model",
            "Model name matches no routing rule"
        );
        Self::UnrecognizedModel { model }
    }

    pub fn configuration_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "configuration_error",
            message = %message,
            "Dispatch configuration invalid"
        );
        Self::ConfigurationError { message }
    }

    pub fn request_failed(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "request_failed",
            message = %message,
            has_source = source.is_some(),
            "Backend request failed"
        );
        Self::RequestFailed { message, source }
    }

    pub fn response_parsing_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "response_parsing_error",
            message = %message,
            "Backend response format invalid"
        );
        Self::ResponseParsingError { message }
    }

    pub fn empty_response(backend: impl Into<String>) -> Self {
        let backend = backend.into();
        log_warn!(
            error_type = "empty_response",
            backend = %backend,
            "Backend returned an empty reply"
        );
        Self::EmptyResponse { backend }
    }

    pub fn rate_limit_exceeded(retry_after_seconds: u64) -> Self {
        log_warn!(
            error_type = "rate_limit_exceeded",
            retry_after_seconds = retry_after_seconds,
            "Backend rate limit exceeded"
        );
        Self::RateLimitExceeded {
            retry_after_seconds,
        }
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "authentication_failed",
            message = %message,
            "Backend authentication failed"
        );
        Self::AuthenticationFailed { message }
    }

    pub fn credential_unavailable(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "credential_unavailable",
            message = %message,
            "Exchanged credential unavailable"
        );
        Self::CredentialUnavailable { message }
    }

    pub fn timeout(timeout: Duration) -> Self {
        log_warn!(
            error_type = "timeout",
            timeout_ms = timeout.as_millis() as u64,
            "Backend call timed out"
        );
        Self::Timeout { timeout }
    }

    pub fn incomplete(model: impl Into<String>) -> Self {
        let model = model.into();
        log_warn!(
            error_type = "incomplete",
            model = %model,
            "Worker finished without recording an outcome"
        );
        Self::Incomplete { model }
    }
}
