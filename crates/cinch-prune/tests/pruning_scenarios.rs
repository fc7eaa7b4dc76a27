//! End-to-end pruning scenarios through the public API.

use cinch_prune::context::estimator;
use chrono::{DateTime, TimeDelta, Utc};
use cinch_prune::context::PruneSkip;
use cinch_prune::context::strategies::{
    DEFAULT_PLACEHOLDER, TRIM_NOTICE_PREFIX, TRIM_SEPARATOR, is_soft_trimmed,
};
use cinch_prune::prelude::*;
use std::borrow::Cow;

fn scenario_config() -> PruningConfig {
    PruningConfig {
        mode: PruneMode::Always,
        soft_trim_ratio: 0.3,
        hard_clear_ratio: 0.5,
        min_prunable_chars: 1_000,
        soft_trim: SoftTrimConfig {
            max_chars: 4_000,
            head_chars: 1_500,
            tail_chars: 1_500,
        },
        hard_clear: HardClearConfig {
            enabled: true,
            placeholder: "[cleared]".into(),
        },
        keep_last_assistants: 1,
        tools: ToolRules {
            allow: vec!["*".into()],
            deny: vec![],
        },
        ..PruningConfig::default()
    }
}

/// One earlier 10k-char tool result, then one exempt assistant + result pair.
fn scenario_history(tool: &str) -> Vec<Message> {
    let big = format!("{}{}{}", "H".repeat(1_500), "m".repeat(7_000), "T".repeat(1_500));
    vec![
        Message::system("You are a coding agent."),
        Message::user("Investigate the failing build."),
        Message::assistant_tool_calls(vec![ToolCall::new("c1", tool, r#"{"path":"build.log"}"#)]),
        Message::tool_result("c1", tool, big),
        Message::assistant_tool_calls(vec![ToolCall::new("c2", "grep", r#"{"q":"error"}"#)]),
        Message::tool_result("c2", "grep", "src/main.rs:12: error"),
    ]
}

/// A budget that puts `history` at `pct` usage (rounded up slightly).
fn budget_at(history: &[Message], pct: f64) -> ContextBudget {
    let total = estimator::estimate_history(history) as f64;
    ContextBudget::new((total / pct / 4.0).floor() as usize)
}

#[test]
fn hard_clear_at_sixty_percent() {
    let history = scenario_history("file_read");
    let pruner = ContextPruner::new(scenario_config(), budget_at(&history, 0.6)).unwrap();
    let outcome = pruner.prune(&history);

    assert!(outcome.report.usage.usage_pct >= 0.6);
    assert_eq!(outcome.messages[3].content, vec![ContentBlock::text("[cleared]")]);
    assert_eq!(outcome.messages[4..], history[4..]);
    assert_eq!(outcome.messages[..3], history[..3]);
}

#[test]
fn soft_trim_at_thirty_five_percent() {
    let history = scenario_history("file_read");
    let pruner = ContextPruner::new(scenario_config(), budget_at(&history, 0.35)).unwrap();
    let outcome = pruner.prune(&history);

    let usage = outcome.report.usage.usage_pct;
    assert!((0.35..0.5).contains(&usage), "usage {usage}");

    let text = outcome.messages[3].text();
    let expected_prefix = format!("{}{TRIM_SEPARATOR}{}", "H".repeat(1_500), "T".repeat(1_500));
    assert!(text.starts_with(&expected_prefix));
    assert!(text.contains("kept 3000 of 10000 chars"));
    assert!(!text.contains("mmm"));
    assert_eq!(outcome.messages[4..], history[4..]);
}

#[test]
fn denied_tool_survives_high_usage() {
    let mut config = scenario_config();
    config.tools.deny = vec!["web_search".into()];
    let history = scenario_history("web_search");
    let pruner = ContextPruner::new(config, budget_at(&history, 0.9)).unwrap();
    let outcome = pruner.prune(&history);

    assert!(outcome.report.usage.usage_pct >= 0.9);
    assert_eq!(outcome.messages, history);
    assert!(!outcome.report.changed());
}

#[test]
fn input_history_is_never_mutated() {
    let history = scenario_history("file_read");
    let snapshot = history.clone();
    let pruner = ContextPruner::new(scenario_config(), budget_at(&history, 0.9)).unwrap();
    let outcome = pruner.prune(&history);
    assert!(outcome.report.changed());
    assert_eq!(history, snapshot);
}

#[test]
fn messages_are_never_removed_or_reordered() {
    let history = scenario_history("file_read");
    let pruner = ContextPruner::new(scenario_config(), budget_at(&history, 0.9)).unwrap();
    let outcome = pruner.prune(&history);
    assert_eq!(outcome.messages.len(), history.len());
    for (before, after) in history.iter().zip(&outcome.messages) {
        assert_eq!(before.role, after.role);
        assert_eq!(before.tool_call_id, after.tool_call_id);
        assert_eq!(before.tool_calls, after.tool_calls);
    }
}

#[test]
fn short_session_stays_untouched_with_defaults() {
    let config = PruningConfig::default()
        .with_mode(PruneMode::Always)
        .with_keep_last_assistants(1);
    let history = scenario_history("file_read");
    let pruner = ContextPruner::new(config, budget_at(&history, 0.9)).unwrap();
    let outcome = pruner.prune(&history);
    assert_eq!(outcome.messages, history);
    assert_eq!(
        outcome.report.skipped,
        Some(PruneSkip::BelowFloor {
            prunable_chars: 10_000,
            floor: 50_000,
        })
    );
}

#[test]
fn output_ending_in_trim_notice_is_still_trimmed() {
    let mut config = scenario_config();
    config.hard_clear.enabled = false;
    let fetched = format!(
        "{}{TRIM_NOTICE_PREFIX}3000 of 10000 chars (first 1500, last 1500).]",
        "p".repeat(100_000)
    );
    let history = vec![
        Message::user("Summarize the page."),
        Message::assistant_tool_calls(vec![ToolCall::new("c1", "read_file", "{}")]),
        Message::tool_result("c1", "read_file", fetched),
        Message::assistant_text("Done."),
    ];
    let pruner = ContextPruner::new(config, budget_at(&history, 0.9)).unwrap();
    let outcome = pruner.prune(&history);

    assert!(outcome.report.usage.usage_pct >= 0.9);
    assert_eq!(outcome.report.soft_trimmed, 1);
    let text = outcome.messages[2].text();
    assert!(text.chars().count() < 4_000);
    assert!(is_soft_trimmed(&text));
}

#[test]
fn agent_loop_with_cache_ttl_preset() {
    let mut history = vec![Message::user("Refactor the parser.")];
    for i in 0..6 {
        let id = format!("c{i}");
        history.push(Message::assistant_tool_calls(vec![ToolCall::new(
            id.as_str(),
            "read_file",
            "{}",
        )]));
        history.push(Message::tool_result(id, "read_file", "r".repeat(20_000)));
    }

    let pruner =
        ContextPruner::new(Preset::Anthropic.config(), ContextBudget::new(50_000)).unwrap();
    let last_call = LastApiCall::new();
    let t0: DateTime<Utc> = DateTime::from_timestamp(1_767_225_600, 0).unwrap();

    // First call: nothing recorded yet, so the cache-ttl gate skips.
    let sent = pruner.prepare(&history, &last_call, t0);
    assert!(matches!(sent, Cow::Borrowed(_)));
    last_call.record(t0);

    // A quick follow-up hits a warm cache.
    let sent = pruner.prepare(&history, &last_call, t0 + TimeDelta::seconds(30));
    assert!(matches!(sent, Cow::Borrowed(_)));
    last_call.record(t0 + TimeDelta::seconds(30));

    // After the TTL the old results are cleared; the last three turns stay.
    let sent = pruner.prepare(&history, &last_call, t0 + TimeDelta::minutes(10));
    let Cow::Owned(pruned) = sent else {
        panic!("expected pruning after the cache expired");
    };
    let cleared: Vec<bool> = pruned
        .iter()
        .filter(|m| m.is_tool_result())
        .map(|m| m.text() == DEFAULT_PLACEHOLDER)
        .collect();
    assert_eq!(cleared, vec![true, true, true, false, false, false]);
    assert_eq!(history[2].text().len(), 20_000);
}

#[test]
fn report_tracks_saved_chars() {
    let history = scenario_history("file_read");
    let pruner = ContextPruner::new(scenario_config(), budget_at(&history, 0.35)).unwrap();
    let outcome = pruner.prune(&history);
    let report = &outcome.report;
    assert_eq!(report.soft_trimmed, 1);
    assert_eq!(report.prunable_chars, 10_000);
    assert!(report.chars_saved() > 6_000);

    let trimmed = outcome.messages[3].text();
    assert!(is_soft_trimmed(&trimmed));
    assert_eq!(
        report.chars_after,
        report.chars_before - 10_000 + trimmed.chars().count()
    );
}
