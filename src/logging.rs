//! Logging utilities for policy-llm
//!
//! Re-exports tracing macros with log_* naming convention for consistency,
//! plus a helper for keeping prompt and reply text out of log lines.

// Re-export tracing macros with log_* naming
#[allow(unused_imports)]
pub use tracing::{
    debug as log_debug,
    error as log_error,
    info as log_info,
    trace as log_trace,
    warn as log_warn,
};

/// Default number of characters kept by [`preview`].
pub const PREVIEW_CHARS: usize = 120;

/// Truncate text to a bounded, char-safe preview for structured log fields.
///
/// Prompts and model replies are frequently CJK text, so truncation counts
/// chars rather than bytes.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
