//! Internal utilities for policy-llm
//!
//! `retry` is public and re-exported from the crate root; throttling is an
//! implementation detail of the HTTP adapters.

pub(crate) mod rate_limit;
pub mod retry;
