//! Context window management: size estimates, budgets, and pruning.
//!
//! Tool results are the largest context consumer in an agent loop. This
//! module keeps them in check right before each model call:
//!
//! 1. **[`estimator`]**: cheap character/token estimates for blocks and
//!    messages. No tokenizer.
//!
//! 2. **[`budget`]**: [`ContextBudget`] turns a model window into the
//!    denominator of the usage ratio; [`ContextUsage`] is one snapshot.
//!
//! 3. **[`rules`]**: deny/allow globs deciding which tools' results may be
//!    pruned.
//!
//! 4. **[`strategies`]**: soft-trim (keep head and tail) and hard-clear
//!    (replace with a placeholder) for a single block.
//!
//! 5. **[`pruner`]**: [`ContextPruner`] walks a history, protects recent
//!    turns, and applies the strategies against one usage snapshot.
//!
//! 6. **[`gate`]**: decides per call whether pruning runs at all, based on
//!    [`PruneMode`] and the time since the last call.
//!
//! Configuration lives in [`config`]; provider defaults in [`presets`].

pub mod budget;
pub mod config;
pub mod estimator;
pub mod gate;
pub mod presets;
pub mod pruner;
pub mod rules;
pub mod strategies;

// Re-export commonly used items at the module level.
pub use budget::{ContextBudget, ContextUsage, DEFAULT_CHARS_PER_TOKEN, DEFAULT_CONTEXT_WINDOW};
pub use config::{ConfigError, PruneMode, PruningConfig};
pub use gate::{GateDecision, LastApiCall, PruneGate, SkipReason};
pub use presets::Preset;
pub use pruner::{ContextPruner, PruneOutcome, PruneReport, PruneSkip};
pub use rules::{ToolRules, is_prunable};
pub use strategies::{HardClearConfig, SoftTrimConfig};
