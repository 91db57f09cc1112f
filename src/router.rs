//! Model name → backend family resolution.
//!
//! The router is the only place that inspects model-name strings. It
//! resolves a name once into a [`Route`] carrying an explicit
//! [`BackendFamily`] tag plus the concrete parameters for that call; adapter
//! selection downstream is a single exhaustive match on the tag.

use crate::config::{BackendFamily, DispatchConfig, ModelEntry, RoutingRules};
use crate::error::{LlmError, LlmResult};
use crate::logging::log_debug;
use std::sync::Arc;

/// Everything an adapter needs to call one model
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Name the caller asked for.
    pub model_name: String,
    pub family: BackendFamily,
    /// Identifier sent on the wire.
    pub backend_model_id: String,
    pub max_output_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    /// Endpoint for this call (base URL, or full URL for the local family).
    pub endpoint: String,
    /// Static credential, when the family uses one.
    pub api_key: Option<String>,
}

/// Resolves model names against the shared configuration
#[derive(Debug, Clone)]
pub struct ModelRouter {
    config: Arc<DispatchConfig>,
}

impl ModelRouter {
    pub fn new(config: Arc<DispatchConfig>) -> Self {
        Self { config }
    }

    /// Resolve `model_name` to its family and call parameters.
    ///
    /// Performs no I/O.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::UnrecognizedModel`] when the model table does not
    /// pin a family and no naming rule matches.
    pub fn resolve(&self, model_name: &str) -> LlmResult<Route> {
        let entry = self.config.models.get(model_name);
        let family = match entry.and_then(|e| e.family) {
            Some(family) => family,
            None => classify(&self.config.routing, model_name)
                .ok_or_else(|| LlmError::unrecognized_model(model_name))?,
        };

        let route = self.build_route(model_name, family, entry);

        log_debug!(
            model = %model_name,
            family = %route.family,
            backend_model_id = %route.backend_model_id,
            max_output_tokens = route.max_output_tokens,
            "Model routed"
        );

        Ok(route)
    }

    /// Backend identifier for `model_name`, identity when not in the table.
    pub fn backend_model_id(&self, model_name: &str) -> String {
        self.config
            .models
            .get(model_name)
            .and_then(|e| e.backend_id.clone())
            .unwrap_or_else(|| model_name.to_string())
    }

    fn build_route(
        &self,
        model_name: &str,
        family: BackendFamily,
        entry: Option<&ModelEntry>,
    ) -> Route {
        let config = &self.config;
        let (params, endpoint, api_key) = match family {
            BackendFamily::CompatibleChat => (
                &config.compatible.params,
                config.compatible.base_url.clone(),
                config.compatible.api_key.clone(),
            ),
            BackendFamily::NativeGen => (
                &config.native.params,
                config.native.base_url.clone(),
                config.native.api_key.clone(),
            ),
            BackendFamily::TokenExchange => (
                &config.token_exchange.params,
                config.token_exchange.base_url.clone(),
                None,
            ),
            BackendFamily::LocalHttp => (&config.local.params, config.local.endpoint.clone(), None),
        };

        let max_output_tokens = entry
            .and_then(|e| e.max_output_tokens)
            .or_else(|| tier_limit(&config.routing, model_name))
            .unwrap_or(params.max_output_tokens);

        // An endpoint override brings its own credential with it.
        let (endpoint, api_key) = match entry.and_then(|e| e.base_url.clone()) {
            Some(url) => (url, entry.and_then(|e| e.api_key.clone())),
            None => (endpoint, entry.and_then(|e| e.api_key.clone()).or(api_key)),
        };

        Route {
            model_name: model_name.to_string(),
            family,
            backend_model_id: self.backend_model_id(model_name),
            max_output_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            endpoint,
            api_key,
        }
    }
}

/// Apply the naming rules in priority order.
pub fn classify(rules: &RoutingRules, model_name: &str) -> Option<BackendFamily> {
    let name = model_name.to_lowercase();
    let starts = |prefixes: &[String]| prefixes.iter().any(|p| name.starts_with(p.as_str()));
    let contains = |markers: &[String]| markers.iter().any(|m| name.contains(m.as_str()));

    if starts(&rules.chat_prefixes) {
        Some(BackendFamily::CompatibleChat)
    } else if contains(&rules.local_markers) {
        Some(BackendFamily::LocalHttp)
    } else if contains(&rules.assistant_markers) {
        Some(BackendFamily::TokenExchange)
    } else if starts(&rules.vendor_prefixes) {
        Some(BackendFamily::NativeGen)
    } else {
        None
    }
}

/// Output-token cap by model size tier; larger models are capped lower.
fn tier_limit(rules: &RoutingRules, model_name: &str) -> Option<u32> {
    let name = model_name.to_lowercase();
    if rules
        .large_tier_markers
        .iter()
        .any(|m| name.contains(m.as_str()))
    {
        Some(rules.large_tier_max_tokens)
    } else if rules
        .standard_tier_prefixes
        .iter()
        .any(|p| name.starts_with(p.as_str()))
    {
        Some(rules.standard_tier_max_tokens)
    } else {
        None
    }
}
