//! Parallel dispatch example: one sentence, several models, one report.
//!
//! This example shows how to:
//! - Load the dispatch configuration from the environment
//! - Send one prompt to several backends concurrently
//! - Inspect per-model outcomes, including failures and timeouts
//! - Feed successful replies to a key/value field parser
//!
//! # Running
//!
//! ```bash
//! export API_KEY="sk-..."             # DashScope key (qwen, llama2, baichuan2)
//! export BAIDU_API_KEY="..."          # optional, enables ernie-bot
//! export BAIDU_SECRET_KEY="..."
//! RUST_LOG=policy_llm=debug cargo run --example parallel_dispatch -- qwen-turbo ernie-bot
//! ```
//!
//! With no model arguments the configuration's default models are used.

use policy_llm::{Dispatcher, FieldParser, KeyValueFieldParser, OutcomeStatus};
use tracing_subscriber::EnvFilter;

const SENTENCE: &str = "对符合条件的新市民、青年人，按每月500元标准发放租赁补贴。";

const FIELDS: [(&str, &str); 7] = [
    ("policy_object", "未匹配"),
    ("policy_stage", "未确定"),
    ("policy_type", "未确定"),
    ("policy_tool", "未定义"),
    ("policy_geo_scope", "未指定"),
    ("policy_target_scope", "未指定"),
    ("tool_parameter", "无"),
];

fn build_prompt(sentence: &str) -> String {
    let keys: Vec<&str> = FIELDS.iter().map(|(key, _)| *key).collect();
    format!(
        "请分析以下政策句子，并按 `key: value` 的形式用分号分隔输出这些字段：{}。\n句子：{}",
        keys.join(", "),
        sentence
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("policy_llm=info")),
        )
        .init();

    let dispatcher = Dispatcher::from_env()?;
    let models: Vec<String> = std::env::args().skip(1).collect();
    let models = if models.is_empty() {
        dispatcher.config().default_models()
    } else {
        models
    };

    println!("Dispatching to {models:?}\n");
    let report = dispatcher.dispatch(&build_prompt(SENTENCE), &models).await;

    let parser = KeyValueFieldParser::new(FIELDS);
    let mut names: Vec<&String> = report.outcomes.keys().collect();
    names.sort();

    for name in names {
        let outcome = &report.outcomes[name];
        println!(
            "== {name} [{:?}] {:.2}s, {} attempt(s)",
            outcome.status,
            outcome.elapsed.as_secs_f64(),
            outcome.attempts
        );
        match outcome.status {
            OutcomeStatus::Error => {
                println!("   error: {}", outcome.error.as_deref().unwrap_or("unknown"));
            }
            OutcomeStatus::Success | OutcomeStatus::RawFallback => {
                let content = outcome.content.as_deref().unwrap_or_default();
                for (key, value) in parser.parse(content) {
                    println!("   {key}: {value}");
                }
            }
        }
    }

    println!(
        "\n{} succeeded, {} failed (dispatch {})",
        report.successes().count(),
        report.failures().count(),
        report.dispatch_id
    );

    Ok(())
}
