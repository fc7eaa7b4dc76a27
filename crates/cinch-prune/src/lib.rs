//! Context pruning engine for long-running LLM tool-use agents.
//!
//! `cinch-prune` keeps a growing conversation history inside a model's
//! context-window budget by shrinking or clearing large tool results right
//! before each model call. The stored history is never touched: every call
//! gets a fresh, pruning-applied copy, so the agent loop can always fall
//! back to the original.
//!
//! The core abstraction is the [`ContextPruner`](context::pruner::ContextPruner).
//! It walks a history, protects the most recent assistant turns, classifies
//! every tool result with the [tool rules](context::rules), and applies the
//! cheapest sufficient [strategy](context::strategies): soft-trim (keep
//! head and tail) or hard-clear (replace with a placeholder).
//!
//! # Getting started
//!
//! ```
//! use cinch_prune::prelude::*;
//!
//! let config = PruningConfig {
//!     mode: PruneMode::Always,
//!     keep_last_assistants: 1,
//!     min_prunable_chars: 1_000,
//!     ..Default::default()
//! };
//! let pruner = ContextPruner::new(config, ContextBudget::new(8_000)).unwrap();
//!
//! let history = vec![
//!     Message::user("Read the log file."),
//!     Message::assistant_tool_calls(vec![ToolCall::new("c1", "read_file", "{}")]),
//!     Message::tool_result("c1", "read_file", "x".repeat(20_000)),
//!     Message::assistant_text("The log is mostly noise."),
//! ];
//!
//! let outcome = pruner.prune(&history);
//! assert_eq!(outcome.messages.len(), history.len());
//! assert!(outcome.report.changed());
//! ```
//!
//! # Where to find things
//!
//! - **Size estimates:** [`context::estimator`] turns blocks and messages
//!   into character or token counts; [`ContextBudget`](context::ContextBudget)
//!   turns a model window into the usage ratio denominator.
//! - **Per-tool protection:** [`context::rules`] evaluates deny/allow globs.
//! - **Shrinking a block:** [`context::strategies`].
//! - **When to prune at all:** [`context::gate`] and
//!   [`LastApiCall`](context::gate::LastApiCall).
//! - **Configuration:** [`PruningConfig`](context::config::PruningConfig)
//!   and the provider [presets](context::presets).
//! - **Truncating tool output before it enters history:**
//!   [`tools::truncation`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`context`] | Estimator, budget, tool rules, strategies, pruner, gate, config, presets |
//! | [`tools`] | Production-time tool output truncation |

pub mod context;
pub mod prelude;
pub mod tools;

use serde::{Deserialize, Serialize};

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    /// The lowercase wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of an opaque media payload.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

/// One unit of message content.
///
/// Only the blocks of [`MessageRole::Tool`] messages are ever altered by
/// pruning; everything else passes through untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },
    /// An opaque media reference (URL, file id, base64 handle).
    Media {
        kind: MediaKind,
        #[serde(default)]
        reference: String,
    },
    /// Nested structured data, serialized when its size is estimated.
    Structured { data: serde_json::Value },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn media(kind: MediaKind, reference: impl Into<String>) -> Self {
        ContentBlock::Media {
            kind,
            reference: reference.into(),
        }
    }

    pub fn structured(data: serde_json::Value) -> Self {
        ContentBlock::Structured { data }
    }

    /// The text payload, if this is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A tool call requested by the assistant.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    #[serde(default)]
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A message in the conversation history.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced this result (tool messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    fn with_role(role: MessageRole, content: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, vec![ContentBlock::text(content)])
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, vec![ContentBlock::text(content)])
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, vec![ContentBlock::text(content)])
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::with_role(MessageRole::Assistant, Vec::new())
        }
    }

    /// A single-text-block tool result.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::tool_result_blocks(call_id, tool_name, vec![ContentBlock::text(content)])
    }

    /// A tool result carrying arbitrary content blocks.
    pub fn tool_result_blocks(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: Vec<ContentBlock>,
    ) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            tool_name: Some(tool_name.into()),
            ..Self::with_role(MessageRole::Tool, content)
        }
    }

    /// Build a tool result whose output has already been cut down by
    /// [`truncate_tool_output`](tools::truncation::truncate_tool_output).
    ///
    /// A notice is appended when truncation happened so the model knows
    /// the output is partial.
    pub fn tool_result_truncated(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: &[ContentBlock],
        max_chars: usize,
        mode: tools::truncation::TruncationMode,
    ) -> Self {
        let truncated = tools::truncation::truncate_tool_output(output, max_chars, mode);
        let content = if truncated.truncated {
            let kept = context::estimator::estimate_blocks(&truncated.content);
            tools::truncation::add_truncation_notice(
                truncated.content,
                truncated.original_chars,
                kept,
            )
        } else {
            truncated.content
        };
        Self::tool_result_blocks(call_id, tool_name, content)
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }

    pub fn is_tool_result(&self) -> bool {
        self.role == MessageRole::Tool
    }

    /// Concatenated text of all text blocks, separated by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
