//! Context budget: the assumed total window that usage ratios are measured
//! against.
//!
//! The pruner never knows the real model limits. The caller supplies the
//! window size (usually from a per-model lookup) and the budget converts it
//! into a character budget so that a single [`ContextUsage`] snapshot can be
//! computed per call.

use crate::Message;
use crate::context::estimator;

/// Default context window size in tokens.
pub const DEFAULT_CONTEXT_WINDOW: usize = 200_000;

/// Default characters per token.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = estimator::CHARS_PER_TOKEN as f64;

/// The assumed total context budget for one model.
///
/// # Example
///
/// ```
/// use cinch_prune::context::ContextBudget;
///
/// let budget = ContextBudget::new(128_000).with_output_reserve(8_000);
/// assert_eq!(budget.effective_max_tokens(), 120_000);
/// assert_eq!(budget.char_budget(), 480_000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBudget {
    /// Maximum context window in tokens.
    max_tokens: usize,
    /// Tokens reserved for model output (per-response token limit).
    output_reserve: usize,
    /// Characters per token ratio.
    chars_per_token: f64,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_WINDOW)
    }
}

impl ContextBudget {
    /// Create a budget for a model window of `max_tokens`.
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            output_reserve: 0,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }

    /// Set tokens reserved for model output.
    pub fn with_output_reserve(mut self, tokens: usize) -> Self {
        self.output_reserve = tokens;
        self
    }

    /// Override the characters-per-token ratio. Non-positive or non-finite
    /// values are ignored.
    pub fn with_chars_per_token(mut self, cpt: f64) -> Self {
        if cpt.is_finite() && cpt > 0.0 {
            self.chars_per_token = cpt;
        }
        self
    }

    /// Return the maximum context window size in tokens.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Effective context window: `max_tokens` minus the output reserve.
    pub fn effective_max_tokens(&self) -> usize {
        self.max_tokens.saturating_sub(self.output_reserve)
    }

    /// The effective window expressed in characters.
    pub fn char_budget(&self) -> usize {
        (self.effective_max_tokens() as f64 * self.chars_per_token) as usize
    }

    /// Usage snapshot for an already-computed character total.
    pub fn usage_for_chars(&self, total_chars: usize) -> ContextUsage {
        let budget = self.char_budget();
        let usage_pct = if budget > 0 {
            total_chars as f64 / budget as f64
        } else {
            1.0
        };
        ContextUsage {
            estimated_chars: total_chars,
            estimated_tokens: (total_chars as f64 / self.chars_per_token).ceil() as usize,
            max_tokens: self.max_tokens,
            usage_pct,
        }
    }

    /// Estimate the usage of a whole history.
    pub fn estimate_usage(&self, messages: &[Message]) -> ContextUsage {
        self.usage_for_chars(estimator::estimate_history(messages))
    }
}

/// Snapshot of context usage at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextUsage {
    /// Estimated characters consumed.
    pub estimated_chars: usize,
    /// Estimated tokens consumed.
    pub estimated_tokens: usize,
    /// Maximum context window.
    pub max_tokens: usize,
    /// Usage as a fraction of the effective budget (0.0 to 1.0+).
    pub usage_pct: f64,
}

impl ContextUsage {
    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "context: ~{} tokens ({:.0}% of {})",
            self.estimated_tokens,
            self.usage_pct * 100.0,
            self.max_tokens,
        )
    }
}
