//! Normalized per-model results.
//!
//! Whatever backend answered, and however it failed, the dispatcher records
//! exactly one [`CallOutcome`] per requested model name.

use crate::error::{FailureKind, LlmError};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// How a backend's reply was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyShape {
    /// The reply text came from the documented response field.
    Clean,
    /// The documented fields were absent; the raw body is the content.
    RawFallback,
}

/// Text returned by an adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterReply {
    pub content: String,
    pub shape: ReplyShape,
}

impl AdapterReply {
    pub fn clean(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            shape: ReplyShape::Clean,
        }
    }

    pub fn raw_fallback(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            shape: ReplyShape::RawFallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    /// Usable content, but taken from an unexpected response shape.
    RawFallback,
    Error,
}

/// Terminal, normalized result of calling one model
#[derive(Debug, Clone, Serialize)]
pub struct CallOutcome {
    pub model_name: String,
    pub status: OutcomeStatus,
    pub content: Option<String>,
    pub error: Option<String>,
    pub kind: Option<FailureKind>,
    /// Wall-clock time from worker start to outcome.
    #[serde(rename = "time", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// Adapter invocations made; zero when routing failed.
    pub attempts: u32,
    pub completed_at: DateTime<Utc>,
}

impl CallOutcome {
    pub fn from_reply(
        model_name: impl Into<String>,
        reply: AdapterReply,
        elapsed: Duration,
        attempts: u32,
    ) -> Self {
        let status = match reply.shape {
            ReplyShape::Clean => OutcomeStatus::Success,
            ReplyShape::RawFallback => OutcomeStatus::RawFallback,
        };
        Self {
            model_name: model_name.into(),
            status,
            content: Some(reply.content),
            error: None,
            kind: None,
            elapsed,
            attempts,
            completed_at: Utc::now(),
        }
    }

    pub fn from_error(
        model_name: impl Into<String>,
        error: &LlmError,
        elapsed: Duration,
        attempts: u32,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            status: OutcomeStatus::Error,
            content: None,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
            elapsed,
            attempts,
            completed_at: Utc::now(),
        }
    }

    /// The worker did not finish within the dispatch budget.
    pub fn timed_out(model_name: impl Into<String>, waited: Duration) -> Self {
        Self::from_error(model_name, &LlmError::timeout(waited), waited, 0)
    }

    /// The worker's outcome never materialized.
    pub fn incomplete(model_name: impl Into<String>, elapsed: Duration) -> Self {
        let model_name = model_name.into();
        let mut outcome =
            Self::from_error(&model_name, &LlmError::incomplete(&model_name), elapsed, 0);
        outcome.error = Some("incomplete".to_string());
        outcome
    }

    /// True when `content` holds usable text (clean or raw fallback).
    pub fn is_success(&self) -> bool {
        !matches!(self.status, OutcomeStatus::Error)
    }

    pub fn is_raw_fallback(&self) -> bool {
        self.status == OutcomeStatus::RawFallback
    }
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}
