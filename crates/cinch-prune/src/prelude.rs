//! Convenience re-exports for common `cinch-prune` types.
//!
//! Meant to be glob-imported by agent loops:
//!
//! ```
//! use cinch_prune::prelude::*;
//! ```
//!
//! This pulls in the message types, the pruner with its config and budget,
//! and the gate's timing cell. Strategy functions and estimator helpers are
//! left out; import those from their modules directly when needed.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ContentBlock, MediaKind, Message, MessageRole, ToolCall};

// ── Context management ──────────────────────────────────────────────
pub use crate::context::{
    ConfigError, ContextBudget, ContextPruner, ContextUsage, GateDecision, HardClearConfig,
    LastApiCall, Preset, PruneMode, PruneOutcome, PruneReport, PruningConfig, SoftTrimConfig,
    ToolRules,
};

// ── Tools ───────────────────────────────────────────────────────────
pub use crate::tools::TruncationMode;
