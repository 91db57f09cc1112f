//! Shared OpenAI-compatible API structures
//!
//! DashScope's compatible mode and OpenAI itself speak the same chat
//! completion format; both go through the compatible-chat adapter.

pub mod types;

pub use types::*;
