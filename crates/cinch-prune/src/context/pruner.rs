//! Context pruner: the orchestrator that shrinks old tool results.
//!
//! For every call the pruner:
//!
//! 1. protects the exempt span, which starts at the N-th most recent
//!    assistant message and runs to the end of the history;
//! 2. collects the tool-result blocks before it whose owning tool passes
//!    the [tool rules](super::rules);
//! 3. takes one [`ContextUsage`] snapshot of the whole history;
//! 4. hard-clears every eligible block when usage is past the hard-clear
//!    ratio, or soft-trims oversized ones when it is past the soft-trim
//!    ratio.
//!
//! The input slice is never mutated. The result is a fresh `Vec`, so
//! concurrent callers and the agent loop's stored history never see a
//! partially pruned state.

use std::borrow::Cow;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::context::budget::{ContextBudget, ContextUsage};
use crate::context::config::{ConfigError, PruningConfig};
use crate::context::estimator;
use crate::context::gate::{GateDecision, LastApiCall, PruneGate};
use crate::context::strategies;
use crate::{ContentBlock, Message};

/// Why a prune pass made no changes before looking at individual blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneSkip {
    /// No tool-result block outside the exempt span is eligible.
    NothingPrunable,
    /// Eligible content is smaller than `min_prunable_chars`.
    BelowFloor { prunable_chars: usize, floor: usize },
    /// Aggregate usage is below `soft_trim_ratio`.
    BelowThreshold,
}

impl std::fmt::Display for PruneSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PruneSkip::NothingPrunable => write!(f, "nothing prunable"),
            PruneSkip::BelowFloor {
                prunable_chars,
                floor,
            } => write!(f, "{prunable_chars} prunable chars below floor of {floor}"),
            PruneSkip::BelowThreshold => write!(f, "usage below soft-trim ratio"),
        }
    }
}

/// What a prune pass did.
#[derive(Debug, Clone, PartialEq)]
pub struct PruneReport {
    /// Set when the pass bailed out early.
    pub skipped: Option<PruneSkip>,
    /// The single usage snapshot every decision in the pass was based on.
    pub usage: ContextUsage,
    /// Index of the first exempt message (`len` when nothing is exempt).
    pub exempt_from: usize,
    /// Total estimated size of the eligible blocks.
    pub prunable_chars: usize,
    /// Blocks soft-trimmed in this pass.
    pub soft_trimmed: usize,
    /// Blocks hard-cleared in this pass.
    pub hard_cleared: usize,
    /// Estimated history size before pruning.
    pub chars_before: usize,
    /// Estimated history size after pruning.
    pub chars_after: usize,
}

impl PruneReport {
    /// Whether any block was altered.
    pub fn changed(&self) -> bool {
        self.soft_trimmed + self.hard_cleared > 0
    }

    /// Characters saved by this pass.
    pub fn chars_saved(&self) -> usize {
        self.chars_before.saturating_sub(self.chars_after)
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        match self.skipped {
            Some(reason) => format!(
                "pruning skipped: {reason} ({})",
                self.usage.to_log_string()
            ),
            None => format!(
                "pruned: {} trimmed, {} cleared, {} -> {} chars ({})",
                self.soft_trimmed,
                self.hard_cleared,
                self.chars_before,
                self.chars_after,
                self.usage.to_log_string(),
            ),
        }
    }
}

/// A pruned history plus the report describing how it was produced.
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub messages: Vec<Message>,
    pub report: PruneReport,
}

/// Strategy chosen for one block, from one usage snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    HardClear,
    SoftTrim,
    Keep,
}

/// Stateless pruning engine bound to one config and one context budget.
///
/// Construction validates the config; [`prune`](Self::prune) itself cannot
/// fail. A pruner is `Send + Sync` and can be shared across sessions.
#[derive(Debug, Clone)]
pub struct ContextPruner {
    config: PruningConfig,
    budget: ContextBudget,
}

impl ContextPruner {
    /// Build a pruner, rejecting invalid configs and empty budgets.
    pub fn new(config: PruningConfig, budget: ContextBudget) -> Result<Self, ConfigError> {
        config.validate()?;
        if budget.char_budget() == 0 {
            return Err(ConfigError::ZeroContextWindow);
        }
        Ok(Self { config, budget })
    }

    pub fn config(&self) -> &PruningConfig {
        &self.config
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    /// Ask the gate whether a call at `now` should be pruned.
    pub fn gate(&self, last_call: &LastApiCall, now: DateTime<Utc>) -> GateDecision {
        PruneGate::check(self.config.mode, self.config.ttl, last_call, now)
    }

    /// Gate and prune in one step, for use right before serializing history.
    ///
    /// Returns the input borrowed when the gate skips or nothing changed.
    pub fn prepare<'a>(
        &self,
        history: &'a [Message],
        last_call: &LastApiCall,
        now: DateTime<Utc>,
    ) -> Cow<'a, [Message]> {
        if let GateDecision::Skip(reason) = self.gate(last_call, now) {
            debug!("Context pruning gated off: {reason}");
            return Cow::Borrowed(history);
        }

        let outcome = self.prune(history);
        if outcome.report.changed() {
            Cow::Owned(outcome.messages)
        } else {
            Cow::Borrowed(history)
        }
    }

    /// Prune a history, ignoring the gate.
    pub fn prune(&self, history: &[Message]) -> PruneOutcome {
        let chars_before = estimator::estimate_history(history);
        let usage = self.budget.usage_for_chars(chars_before);
        let exempt_from = exempt_start(history, self.config.keep_last_assistants);
        let eligible = self.eligible_messages(history, exempt_from);

        let prunable_chars: usize = history
            .iter()
            .zip(&eligible)
            .filter(|(_, ok)| **ok)
            .map(|(msg, _)| estimator::estimate_blocks(&msg.content))
            .sum();

        let mut report = PruneReport {
            skipped: None,
            usage,
            exempt_from,
            prunable_chars,
            soft_trimmed: 0,
            hard_cleared: 0,
            chars_before,
            chars_after: chars_before,
        };

        let skip = if !eligible.contains(&true) {
            Some(PruneSkip::NothingPrunable)
        } else if prunable_chars < self.config.min_prunable_chars {
            Some(PruneSkip::BelowFloor {
                prunable_chars,
                floor: self.config.min_prunable_chars,
            })
        } else if report.usage.usage_pct < self.config.soft_trim_ratio {
            Some(PruneSkip::BelowThreshold)
        } else {
            None
        };

        if let Some(reason) = skip {
            report.skipped = Some(reason);
            debug!("{}", report.to_log_string());
            return PruneOutcome {
                messages: history.to_vec(),
                report,
            };
        }

        let usage_pct = report.usage.usage_pct;
        let messages: Vec<Message> = history
            .iter()
            .zip(&eligible)
            .map(|(msg, &ok)| {
                if !ok {
                    return msg.clone();
                }
                let content = msg
                    .content
                    .iter()
                    .map(|block| self.prune_block(block, usage_pct, &mut report))
                    .collect();
                Message {
                    role: msg.role,
                    content,
                    tool_calls: msg.tool_calls.clone(),
                    tool_call_id: msg.tool_call_id.clone(),
                    tool_name: msg.tool_name.clone(),
                }
            })
            .collect();

        report.chars_after = estimator::estimate_history(&messages);
        if report.changed() {
            info!("Context {}", report.to_log_string());
        } else {
            debug!("{}", report.to_log_string());
        }

        PruneOutcome { messages, report }
    }

    fn action_for(&self, block: &ContentBlock, usage_pct: f64) -> Action {
        if usage_pct >= self.config.hard_clear_ratio && self.config.hard_clear.enabled {
            Action::HardClear
        } else if usage_pct >= self.config.soft_trim_ratio
            && estimator::estimate_block(block) > self.config.soft_trim.max_chars
        {
            Action::SoftTrim
        } else {
            Action::Keep
        }
    }

    fn prune_block(
        &self,
        block: &ContentBlock,
        usage_pct: f64,
        report: &mut PruneReport,
    ) -> ContentBlock {
        let replaced = match self.action_for(block, usage_pct) {
            Action::HardClear => strategies::hard_clear(block, &self.config.hard_clear.placeholder)
                .inspect(|_| report.hard_cleared += 1),
            Action::SoftTrim => strategies::soft_trim_block(block, &self.config.soft_trim)
                .inspect(|_| report.soft_trimmed += 1),
            Action::Keep => None,
        };
        replaced.unwrap_or_else(|| block.clone())
    }

    /// Per message: is it a tool result before the exempt span whose owning
    /// tool passes the rules?
    fn eligible_messages(&self, history: &[Message], exempt_from: usize) -> Vec<bool> {
        let call_names: HashMap<&str, &str> = history
            .iter()
            .filter(|m| m.is_assistant())
            .filter_map(|m| m.tool_calls.as_deref())
            .flatten()
            .map(|call| (call.id.as_str(), call.name.as_str()))
            .collect();

        history
            .iter()
            .enumerate()
            .map(|(i, msg)| {
                i < exempt_from
                    && msg.is_tool_result()
                    && self
                        .config
                        .tools
                        .is_prunable(owning_tool(msg, &call_names))
            })
            .collect()
    }
}

/// Index of the first exempt message.
///
/// `keep == 0` exempts nothing. With fewer than `keep` assistant messages
/// the whole history is exempt.
pub fn exempt_start(history: &[Message], keep: usize) -> usize {
    if keep == 0 {
        return history.len();
    }
    history
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, m)| m.is_assistant())
        .nth(keep - 1)
        .map_or(0, |(i, _)| i)
}

/// The tool that produced a tool-result message: its `tool_name`, else the
/// name of the assistant call it answers, else the empty string.
///
/// An unattributed result still goes through the rules as `""`, so a narrow
/// allow list such as `["read_*"]` keeps it. Pruning content whose origin is
/// unknown would bypass an allow list the caller chose to restrict.
fn owning_tool<'a>(msg: &'a Message, call_names: &HashMap<&str, &'a str>) -> &'a str {
    if let Some(name) = msg.tool_name.as_deref() {
        return name;
    }
    msg.tool_call_id
        .as_deref()
        .and_then(|id| call_names.get(id).copied())
        .unwrap_or("")
}
