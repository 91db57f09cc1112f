//! Backend adapters
//!
//! One adapter per [`BackendFamily`], all behind the [`BackendAdapter`] trait:
//!
//! - **compatible**: OpenAI-compatible `/chat/completions`
//! - **native**: native text-generation endpoint with a nested request body
//! - **token_exchange**: chat endpoint guarded by an exchanged access token
//! - **local**: locally hosted model behind a bespoke endpoint
//! - **http**: shared JSON POST plumbing and status mapping
//!
//! ```text
//!            http.rs            <- connection pool, throttle, status mapping
//!     |        |        |       |
//! compatible native token_exchange local
//!     |
//! openai_shared                 <- chat completion wire types
//! ```

pub mod compatible;
pub mod http;
pub mod local;
pub mod native;
pub mod openai_shared;
pub mod token_exchange;

pub use compatible::CompatibleChatAdapter;
pub use local::LocalHttpAdapter;
pub use native::NativeGenAdapter;
pub use token_exchange::TokenExchangeAdapter;

use crate::config::{BackendFamily, DispatchConfig};
use crate::core_types::{AdapterReply, CallRequest};
use crate::credentials::TokenManager;
use crate::error::LlmResult;
use crate::router::Route;
use async_trait::async_trait;
use std::sync::Arc;

/// One backend family's wire protocol
///
/// An adapter makes exactly one HTTP exchange per `invoke`. Retries,
/// timeouts and outcome normalization belong to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Send `request` to the model described by `route` and return its text.
    async fn invoke(&self, request: &CallRequest, route: &Route) -> LlmResult<AdapterReply>;

    fn family(&self) -> BackendFamily;
}

/// The adapter serving each family
#[derive(Clone)]
pub struct AdapterSet {
    compatible: Arc<dyn BackendAdapter>,
    native: Arc<dyn BackendAdapter>,
    token_exchange: Arc<dyn BackendAdapter>,
    local: Arc<dyn BackendAdapter>,
}

impl std::fmt::Debug for AdapterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterSet").finish_non_exhaustive()
    }
}

impl AdapterSet {
    /// Build the production adapters from configuration.
    pub fn from_config(config: &DispatchConfig, tokens: Arc<TokenManager>) -> Self {
        Self {
            compatible: Arc::new(CompatibleChatAdapter::new(&config.compatible)),
            native: Arc::new(NativeGenAdapter::new(&config.native)),
            token_exchange: Arc::new(TokenExchangeAdapter::new(&config.token_exchange, tokens)),
            local: Arc::new(LocalHttpAdapter::new(&config.local)),
        }
    }

    /// Replace the adapter for `family`.
    pub fn with_adapter(mut self, family: BackendFamily, adapter: Arc<dyn BackendAdapter>) -> Self {
        match family {
            BackendFamily::CompatibleChat => self.compatible = adapter,
            BackendFamily::NativeGen => self.native = adapter,
            BackendFamily::TokenExchange => self.token_exchange = adapter,
            BackendFamily::LocalHttp => self.local = adapter,
        }
        self
    }

    pub fn for_family(&self, family: BackendFamily) -> &Arc<dyn BackendAdapter> {
        match family {
            BackendFamily::CompatibleChat => &self.compatible,
            BackendFamily::NativeGen => &self.native,
            BackendFamily::TokenExchange => &self.token_exchange,
            BackendFamily::LocalHttp => &self.local,
        }
    }
}
