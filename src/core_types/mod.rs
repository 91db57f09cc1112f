//! Core types for backend-agnostic dispatch
//!
//! ## Organization
//! - `messages` - The shared request and the chat message pair
//! - `outcome` - Adapter replies and normalized per-model outcomes

pub mod messages;
pub mod outcome;

pub use messages::{CallRequest, ChatMessage, MessageRole};
pub use outcome::{AdapterReply, CallOutcome, OutcomeStatus, ReplyShape};
