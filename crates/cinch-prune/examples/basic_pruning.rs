//! Minimal agent-loop integration: gate, prune, send, record.
//!
//! Simulates a few rounds of a coding agent that reads large files. Each
//! round the loop asks the pruner for the history to send; the stored
//! history is never modified.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=cinch_prune=debug cargo run --example basic_pruning
//! ```

use chrono::{TimeDelta, Utc};
use cinch_prune::prelude::*;
use cinch_prune::tools::DEFAULT_TOOL_OUTPUT_MAX_CHARS;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<(), String> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // 1. Pick a config and a context budget for the model.
    let model = "anthropic/claude-sonnet-4";
    let config = Preset::for_model(model).config();
    let pruner = ContextPruner::new(config, ContextBudget::new(100_000).with_output_reserve(8_000))
        .map_err(|e| format!("invalid pruning config: {e}"))?;

    // 2. The agent loop owns the history and the timing cell.
    let mut history = vec![
        Message::system("You are a helpful coding assistant. Be concise."),
        Message::user("Find out why the integration tests are slow."),
    ];
    let last_call = LastApiCall::new();
    let mut now = Utc::now();

    for round in 0..8 {
        // 3. Right before the call: gate and prune.
        let sent = pruner.prepare(&history, &last_call, now);
        let usage = pruner.budget().estimate_usage(&sent);
        println!("round {round}: sending {} messages, {}", sent.len(), usage.to_log_string());

        // (The model call would happen here.)
        last_call.record(now);

        // 4. The "model" asks for a file; the tool output is capped on the way in.
        let id = format!("call_{round}");
        history.push(Message::assistant_tool_calls(vec![ToolCall::new(
            id.as_str(),
            "read_file",
            format!(r#"{{"path":"tests/suite_{round}.rs"}}"#),
        )]));
        let output = vec![ContentBlock::text(format!("// suite {round}\n").repeat(2_500))];
        history.push(Message::tool_result_truncated(
            id,
            "read_file",
            &output,
            DEFAULT_TOOL_OUTPUT_MAX_CHARS,
            TruncationMode::Tail,
        ));

        // Rounds alternate between quick follow-ups and long pauses.
        now += if round % 2 == 0 {
            TimeDelta::seconds(20)
        } else {
            TimeDelta::minutes(7)
        };
    }

    let stored = pruner.budget().estimate_usage(&history);
    println!("stored history (never pruned): {}", stored.to_log_string());
    Ok(())
}
