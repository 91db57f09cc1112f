//! Process-wide dispatch configuration.
//!
//! [`DispatchConfig`] is built once at startup, validated, and then shared
//! read-only (behind an `Arc`) by the router, the adapters and the
//! dispatcher. [`DispatchConfig::from_env`] is the only place that reads
//! environment variables.

use crate::error::{LlmError, LlmResult};
use crate::logging::log_debug;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DASHSCOPE_COMPATIBLE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DASHSCOPE_NATIVE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
pub const OPENAI_URL: &str = "https://api.openai.com/v1";
pub const ERNIE_CHAT_URL: &str = "https://aip.baidubce.com/rpc/2.0/ai_custom/v1/wenxinworkshop/chat";
pub const BAIDU_TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";
pub const LOCAL_CHAT_URL: &str = "http://0.0.0.0:8002/chat";

pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个善于分析政策文本的助手。";

/// The closed set of wire protocols a model can be reached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendFamily {
    /// OpenAI-compatible chat completion.
    CompatibleChat,
    /// Native `input.messages` + `parameters` text generation.
    NativeGen,
    /// Chat endpoint behind an exchanged access token.
    TokenExchange,
    /// Bespoke local HTTP endpoint.
    LocalHttp,
}

impl BackendFamily {
    pub const ALL: [BackendFamily; 4] = [
        BackendFamily::CompatibleChat,
        BackendFamily::NativeGen,
        BackendFamily::TokenExchange,
        BackendFamily::LocalHttp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendFamily::CompatibleChat => "compatible_chat",
            BackendFamily::NativeGen => "native_gen",
            BackendFamily::TokenExchange => "token_exchange",
            BackendFamily::LocalHttp => "local_http",
        }
    }
}

impl fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling parameters sent with every request of a family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.7,
            max_output_tokens: 2000,
        }
    }
}

/// OpenAI-compatible chat completion backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibleChatConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub params: GenerationParams,
    pub requests_per_minute: Option<u32>,
}

impl Default for CompatibleChatConfig {
    fn default() -> Self {
        Self {
            base_url: DASHSCOPE_COMPATIBLE_URL.to_string(),
            api_key: None,
            params: GenerationParams::default(),
            requests_per_minute: None,
        }
    }
}

/// Native text-generation backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeGenConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub params: GenerationParams,
    pub requests_per_minute: Option<u32>,
}

impl Default for NativeGenConfig {
    fn default() -> Self {
        Self {
            base_url: DASHSCOPE_NATIVE_URL.to_string(),
            api_key: None,
            params: GenerationParams::default(),
            requests_per_minute: None,
        }
    }
}

/// Backend whose calls need an access token exchanged from a key pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenExchangeConfig {
    /// Chat endpoint; the backend model id is appended as a path segment.
    pub base_url: String,
    /// Token endpoint (client-credentials grant).
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub params: GenerationParams,
    pub requests_per_minute: Option<u32>,
}

impl Default for TokenExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: ERNIE_CHAT_URL.to_string(),
            token_url: BAIDU_TOKEN_URL.to_string(),
            client_id: None,
            client_secret: None,
            params: GenerationParams::default(),
            requests_per_minute: None,
        }
    }
}

impl TokenExchangeConfig {
    pub fn has_credentials(&self) -> bool {
        self.client_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.client_secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Locally hosted model behind a bespoke HTTP endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalHttpConfig {
    /// Full endpoint URL the prompt is posted to.
    pub endpoint: String,
    pub params: GenerationParams,
    /// Drop everything up to the last `assistant` marker in the reply.
    pub strip_role_echo: bool,
}

impl Default for LocalHttpConfig {
    fn default() -> Self {
        Self {
            endpoint: LOCAL_CHAT_URL.to_string(),
            params: GenerationParams {
                temperature: 0.01,
                top_p: 0.3,
                max_output_tokens: 2000,
            },
            strip_role_echo: false,
        }
    }
}

/// One row of the model table. Every field but `name` is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Friendly name callers use.
    pub name: String,
    /// Identifier sent to the backend; defaults to `name`.
    pub backend_id: Option<String>,
    /// Pins the family, bypassing the name rules.
    pub family: Option<BackendFamily>,
    pub max_output_tokens: Option<u32>,
    /// Endpoint override for this model only.
    pub base_url: Option<String>,
    /// Credential override for this model only.
    pub api_key: Option<String>,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn backend_id(mut self, backend_id: impl Into<String>) -> Self {
        self.backend_id = Some(backend_id.into());
        self
    }

    pub fn family(mut self, family: BackendFamily) -> Self {
        self.family = Some(family);
        self
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn endpoint(mut self, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        self.base_url = Some(base_url.into());
        self.api_key = api_key;
        self
    }
}

/// Model name → backend parameters table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelTable {
    entries: Vec<ModelEntry>,
}

impl ModelTable {
    pub fn new(entries: Vec<ModelEntry>) -> Self {
        Self { entries }
    }

    /// The catalogue of models known to work with the default endpoints.
    pub fn builtin() -> Self {
        let mut entries: Vec<ModelEntry> = [
            "qwen-turbo",
            "qwen-plus",
            "qwen-max",
            "qwen-long",
            "qwen-72b-chat",
            "qwen2-7b-instruct",
            "qwen2-72b-instruct",
            "deepseek-r1",
            "deepseek-v3",
            "ernie-bot",
            "ernie-bot-4",
            "ernie-bot-turbo",
            "chatglm-local",
        ]
        .into_iter()
        .map(ModelEntry::new)
        .collect();

        entries.extend([
            ModelEntry::new("baichuan2-7b-chat").backend_id("Baichuan2-7B-Chat"),
            ModelEntry::new("baichuan2-13b-chat").backend_id("Baichuan2-13B-Chat"),
            ModelEntry::new("llama2-7b-chat").backend_id("Llama-2-7b-chat"),
            ModelEntry::new("llama2-13b-chat").backend_id("Llama-2-13b-chat"),
            ModelEntry::new("gpt-3.5-turbo").endpoint(OPENAI_URL, None),
            ModelEntry::new("gpt-4").endpoint(OPENAI_URL, None),
        ]);

        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Insert or replace the entry with the same name.
    pub fn upsert(&mut self, entry: ModelEntry) {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    /// Set the key on every entry that overrides `base_url` with `url`.
    fn set_key_for_endpoint(&mut self, url: &str, api_key: &str) {
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.base_url.as_deref() == Some(url))
        {
            entry.api_key = Some(api_key.to_string());
        }
    }
}

/// Name conventions used when the model table does not pin a family.
///
/// Rules are evaluated in field order; matching is case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRules {
    /// `starts_with` → compatible chat.
    pub chat_prefixes: Vec<String>,
    /// `contains` → local HTTP.
    pub local_markers: Vec<String>,
    /// `contains` → token exchange.
    pub assistant_markers: Vec<String>,
    /// `starts_with` → native generation.
    pub vendor_prefixes: Vec<String>,
    /// `contains` → large output-token tier.
    pub large_tier_markers: Vec<String>,
    /// `starts_with` → standard output-token tier.
    pub standard_tier_prefixes: Vec<String>,
    pub large_tier_max_tokens: u32,
    pub standard_tier_max_tokens: u32,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RoutingRules {
    fn default() -> Self {
        Self {
            chat_prefixes: strings(&["qwen", "deepseek", "gpt"]),
            local_markers: strings(&["chatglm"]),
            assistant_markers: strings(&["ernie"]),
            vendor_prefixes: strings(&["baichuan", "llama"]),
            large_tier_markers: strings(&["72b"]),
            standard_tier_prefixes: strings(&["qwen", "baichuan", "llama", "gpt"]),
            large_tier_max_tokens: 2000,
            standard_tier_max_tokens: 4000,
        }
    }
}

/// Complete, immutable configuration for one process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub compatible: CompatibleChatConfig,
    pub native: NativeGenConfig,
    pub token_exchange: TokenExchangeConfig,
    pub local: LocalHttpConfig,
    pub models: ModelTable,
    pub routing: RoutingRules,
    pub retry_policy: RetryPolicy,
    /// How long the dispatcher waits for each model's worker.
    pub dispatch_timeout: Duration,
    pub system_prompt: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            compatible: CompatibleChatConfig::default(),
            native: NativeGenConfig::default(),
            token_exchange: TokenExchangeConfig::default(),
            local: LocalHttpConfig::default(),
            models: ModelTable::builtin(),
            routing: RoutingRules::default(),
            retry_policy: RetryPolicy::default(),
            dispatch_timeout: Duration::from_secs(300),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl DispatchConfig {
    /// Validate the configuration
    ///
    /// Credentials are not required here: a missing key only fails the
    /// models that route to that backend, at call time.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigurationError`] if:
    /// - Any backend URL is empty
    /// - The retry policy allows zero attempts
    /// - The dispatch timeout is zero
    pub fn validate(&self) -> LlmResult<()> {
        let urls = [
            ("compatible.base_url", &self.compatible.base_url),
            ("native.base_url", &self.native.base_url),
            ("token_exchange.base_url", &self.token_exchange.base_url),
            ("token_exchange.token_url", &self.token_exchange.token_url),
            ("local.endpoint", &self.local.endpoint),
        ];
        if let Some((field, _)) = urls.iter().find(|(_, url)| url.trim().is_empty()) {
            return Err(LlmError::configuration_error(format!(
                "{field} must not be empty"
            )));
        }

        if self.retry_policy.max_attempts == 0 {
            return Err(LlmError::configuration_error(
                "retry_policy.max_attempts must be at least 1",
            ));
        }

        if self.dispatch_timeout.is_zero() {
            return Err(LlmError::configuration_error(
                "dispatch_timeout must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Models to dispatch to when the caller names none, chosen by which
    /// credentials are present.
    pub fn default_models(&self) -> Vec<String> {
        let openai_key = self
            .models
            .get("gpt-3.5-turbo")
            .and_then(|e| e.api_key.as_deref())
            .is_some_and(|k| !k.is_empty());

        let second = if openai_key {
            "gpt-3.5-turbo"
        } else if self.token_exchange.has_credentials() {
            "ernie-bot"
        } else {
            "qwen-plus"
        };

        vec!["qwen-turbo".to_string(), second.to_string()]
    }

    /// Load configuration from environment variables
    /// This is the ONLY method that should access environment variables
    ///
    /// | Variable | Effect |
    /// |----------|--------|
    /// | `API_KEY` | key for the compatible and native families |
    /// | `OPENAI_API_KEY` | key for models routed to the OpenAI endpoint |
    /// | `BAIDU_API_KEY` / `BAIDU_SECRET_KEY` | token-exchange key pair |
    /// | `CHATGLM_URL` | local endpoint |
    /// | `LLM_MAX_RETRIES` | attempts per call |
    /// | `LLM_DISPATCH_TIMEOUT_SECS` | per-model dispatch wait |
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigurationError`] if a numeric variable does not
    /// parse or the resulting configuration fails [`validate`](Self::validate).
    pub fn from_env() -> LlmResult<Self> {
        let mut config = Self::default();

        if let Some(key) = env_non_empty("API_KEY") {
            config.compatible.api_key = Some(key.clone());
            config.native.api_key = Some(key);
        }
        if let Some(key) = env_non_empty("OPENAI_API_KEY") {
            config.models.set_key_for_endpoint(OPENAI_URL, &key);
        }
        config.token_exchange.client_id = env_non_empty("BAIDU_API_KEY");
        config.token_exchange.client_secret = env_non_empty("BAIDU_SECRET_KEY");
        if let Some(url) = env_non_empty("CHATGLM_URL") {
            config.local.endpoint = url;
        }
        if let Some(attempts) = env_parse::<u32>("LLM_MAX_RETRIES")? {
            config.retry_policy.max_attempts = attempts;
        }
        if let Some(secs) = env_parse::<u64>("LLM_DISPATCH_TIMEOUT_SECS")? {
            config.dispatch_timeout = Duration::from_secs(secs);
        }

        config.validate()?;

        log_debug!(
            has_dashscope_key = config.compatible.api_key.is_some(),
            has_token_credentials = config.token_exchange.has_credentials(),
            local_endpoint = %config.local.endpoint,
            max_attempts = config.retry_policy.max_attempts,
            dispatch_timeout_secs = config.dispatch_timeout.as_secs(),
            "Dispatch configuration loaded from environment"
        );

        Ok(config)
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> LlmResult<Option<T>> {
    match env_non_empty(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            LlmError::configuration_error(format!("{name} is not a valid number: {raw}"))
        }),
    }
}
