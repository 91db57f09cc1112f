//! Parallel dispatch of one prompt to many models
//!
//! [`Dispatcher::dispatch`] spawns one task per distinct model name. Each
//! task routes its model, runs the adapter under the retry executor and
//! inserts exactly one [`CallOutcome`] into a shared map. The coordinator
//! waits on every task independently, bounded by the dispatch timeout, and
//! then fills in any model whose outcome never arrived. The returned map's
//! key set always equals the set of requested names.
//!
//! Tasks that outlive the timeout are not cancelled. They finish in the
//! background and their late insert lands in a map nobody reads anymore.

use crate::config::DispatchConfig;
use crate::core_types::{CallOutcome, CallRequest};
use crate::credentials::TokenManager;
use crate::error::LlmResult;
use crate::internals::retry::{RetryExecutor, RetryOutcome};
use crate::logging::{log_debug, log_error, log_info, log_warn, preview, PREVIEW_CHARS};
use crate::providers::AdapterSet;
use crate::response_parser::{FieldMap, FieldParser};
use crate::router::ModelRouter;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

type OutcomeMap = Arc<Mutex<HashMap<String, CallOutcome>>>;

/// Result of one dispatch: one outcome per requested model name
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub dispatch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub prompt: String,
    pub outcomes: HashMap<String, CallOutcome>,
}

impl DispatchReport {
    pub fn get(&self, model_name: &str) -> Option<&CallOutcome> {
        self.outcomes.get(model_name)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcomes with usable content, including raw fallbacks.
    pub fn successes(&self) -> impl Iterator<Item = &CallOutcome> {
        self.outcomes.values().filter(|o| o.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &CallOutcome> {
        self.outcomes.values().filter(|o| !o.is_success())
    }

    /// Run `parser` over every successful outcome's content.
    pub fn parse_fields(&self, parser: &dyn FieldParser) -> HashMap<String, FieldMap> {
        self.successes()
            .filter_map(|o| {
                o.content
                    .as_deref()
                    .map(|content| (o.model_name.clone(), parser.parse(content)))
            })
            .collect()
    }

    pub fn into_outcomes(self) -> HashMap<String, CallOutcome> {
        self.outcomes
    }
}

struct DispatcherInner {
    config: Arc<DispatchConfig>,
    router: ModelRouter,
    adapters: AdapterSet,
    retry: RetryExecutor,
}

/// Runs prompts against sets of models concurrently
///
/// Cheap to clone; clones share adapters, connection pools and the token
/// cache.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("dispatch_timeout", &self.inner.config.dispatch_timeout)
            .field("retry_policy", self.inner.retry.policy())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Build a dispatcher with the production adapters.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigurationError`](crate::LlmError::ConfigurationError)
    /// if `config` fails validation.
    pub fn from_config(config: DispatchConfig) -> LlmResult<Self> {
        let tokens = Arc::new(TokenManager::new(&config.token_exchange));
        let adapters = AdapterSet::from_config(&config, tokens);
        Self::with_adapters(config, adapters)
    }

    /// Build a dispatcher from environment variables.
    pub fn from_env() -> LlmResult<Self> {
        Self::from_config(DispatchConfig::from_env()?)
    }

    /// Build a dispatcher around caller-supplied adapters.
    pub fn with_adapters(config: DispatchConfig, adapters: AdapterSet) -> LlmResult<Self> {
        config.validate()?;
        let config = Arc::new(config);

        log_info!(
            dispatch_timeout_secs = config.dispatch_timeout.as_secs(),
            max_attempts = config.retry_policy.max_attempts,
            models = config.models.entries().len(),
            "Dispatcher initialized"
        );

        Ok(Self {
            inner: Arc::new(DispatcherInner {
                router: ModelRouter::new(Arc::clone(&config)),
                retry: RetryExecutor::new(config.retry_policy.clone()),
                adapters,
                config,
            }),
        })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    pub fn router(&self) -> &ModelRouter {
        &self.inner.router
    }

    /// Dispatch `prompt` to every model in `model_names`, waiting up to the
    /// configured dispatch timeout for each.
    pub async fn dispatch<S: AsRef<str>>(&self, prompt: &str, model_names: &[S]) -> DispatchReport {
        self.dispatch_with_timeout(prompt, model_names, self.inner.config.dispatch_timeout)
            .await
    }

    /// Dispatch `prompt` to the configuration's default models.
    pub async fn dispatch_default(&self, prompt: &str) -> DispatchReport {
        let models = self.inner.config.default_models();
        self.dispatch(prompt, &models).await
    }

    /// Like [`dispatch`](Self::dispatch) with an explicit per-model wait.
    ///
    /// Never fails: every failure mode becomes an error outcome for the
    /// model it belongs to. Duplicate names collapse to one key.
    pub async fn dispatch_with_timeout<S: AsRef<str>>(
        &self,
        prompt: &str,
        model_names: &[S],
        per_call_timeout: Duration,
    ) -> DispatchReport {
        let dispatch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();

        let mut seen = HashSet::new();
        let names: Vec<String> = model_names
            .iter()
            .map(|n| n.as_ref().to_string())
            .filter(|n| seen.insert(n.clone()))
            .collect();

        log_info!(
            dispatch_id = %dispatch_id,
            models = ?names,
            timeout_secs = per_call_timeout.as_secs(),
            prompt_preview = %preview(prompt, PREVIEW_CHARS),
            "Dispatch started"
        );

        let request = Arc::new(CallRequest::new(
            prompt,
            self.inner.config.system_prompt.as_str(),
        ));
        let results: OutcomeMap = Arc::new(Mutex::new(HashMap::with_capacity(names.len())));

        let waits = names.iter().map(|name| {
            let handle = tokio::spawn(run_worker(
                Arc::clone(&self.inner),
                Arc::clone(&request),
                name.clone(),
                Arc::clone(&results),
            ));
            let name = name.clone();
            async move { (name, tokio::time::timeout(per_call_timeout, handle).await) }
        });
        let waited = join_all(waits).await;

        // Late workers now insert into an empty map that is never read.
        let mut outcomes = std::mem::take(&mut *results.lock().await);

        for (name, wait) in waited {
            if outcomes.contains_key(&name) {
                continue;
            }
            let outcome = match wait {
                Err(_elapsed) => {
                    log_warn!(
                        dispatch_id = %dispatch_id,
                        model = %name,
                        timeout_secs = per_call_timeout.as_secs(),
                        "Model did not finish within dispatch timeout"
                    );
                    CallOutcome::timed_out(&name, per_call_timeout)
                }
                Ok(Err(join_error)) => {
                    log_error!(
                        dispatch_id = %dispatch_id,
                        model = %name,
                        error = %join_error,
                        "Model worker aborted"
                    );
                    CallOutcome::incomplete(&name, started.elapsed())
                }
                Ok(Ok(())) => CallOutcome::incomplete(&name, started.elapsed()),
            };
            outcomes.insert(name, outcome);
        }

        for name in &names {
            outcomes
                .entry(name.clone())
                .or_insert_with(|| CallOutcome::incomplete(name, started.elapsed()));
        }

        let report = DispatchReport {
            dispatch_id,
            started_at,
            prompt: prompt.to_string(),
            outcomes,
        };

        log_info!(
            dispatch_id = %dispatch_id,
            succeeded = report.successes().count(),
            failed = report.failures().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dispatch finished"
        );

        report
    }
}

async fn run_worker(
    inner: Arc<DispatcherInner>,
    request: Arc<CallRequest>,
    model_name: String,
    results: OutcomeMap,
) {
    let outcome = call_model(&inner, &request, &model_name).await;
    results.lock().await.insert(model_name, outcome);
}

/// Route, invoke with retries, and normalize into one outcome.
async fn call_model(inner: &DispatcherInner, request: &CallRequest, model_name: &str) -> CallOutcome {
    let started = Instant::now();

    let route = match inner.router.resolve(model_name) {
        Ok(route) => route,
        Err(error) => return CallOutcome::from_error(model_name, &error, started.elapsed(), 0),
    };
    let adapter = inner.adapters.for_family(route.family);

    let outcome = inner
        .retry
        .run(model_name, || adapter.invoke(request, &route))
        .await;

    match outcome {
        RetryOutcome::Succeeded {
            value, attempts, ..
        } => {
            log_debug!(
                model = %model_name,
                family = %route.family,
                attempts = attempts,
                elapsed_ms = started.elapsed().as_millis() as u64,
                response_preview = %preview(&value.content, PREVIEW_CHARS),
                "Model answered"
            );
            CallOutcome::from_reply(model_name, value, started.elapsed(), attempts)
        }
        RetryOutcome::Exhausted {
            error, attempts, ..
        } => CallOutcome::from_error(model_name, &error, started.elapsed(), attempts),
    }
}
