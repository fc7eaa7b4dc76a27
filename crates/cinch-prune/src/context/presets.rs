//! Named pruning presets per model provider.
//!
//! Providers with prompt caching get `cache-ttl` mode so a warm cache is
//! never invalidated by pruning. Providers with large windows prune later
//! and protect more recent turns.

use std::time::Duration;

use crate::context::config::{PruneMode, PruningConfig};

/// A named pruning configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Cache-aware pruning for Anthropic models.
    Anthropic,
    /// Anthropic ratios without waiting for the cache to expire.
    AnthropicAlways,
    /// OpenAI models: prune every call, less aggressively.
    OpenAi,
    /// Gemini models: very large windows, prune late.
    Gemini,
    /// Pruning off.
    Disabled,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Anthropic,
        Preset::AnthropicAlways,
        Preset::OpenAi,
        Preset::Gemini,
        Preset::Disabled,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Anthropic => "anthropic",
            Preset::AnthropicAlways => "anthropic-always",
            Preset::OpenAi => "openai",
            Preset::Gemini => "gemini",
            Preset::Disabled => "disabled",
        }
    }

    /// Build the preset's config.
    pub fn config(&self) -> PruningConfig {
        let base = PruningConfig::default();
        match self {
            Preset::Anthropic => base
                .with_mode(PruneMode::CacheTtl)
                .with_ttl(Duration::from_secs(5 * 60))
                .with_keep_last_assistants(3)
                .with_ratios(0.3, 0.5)
                .with_min_prunable_chars(50_000),
            Preset::AnthropicAlways => Preset::Anthropic.config().with_mode(PruneMode::Always),
            Preset::OpenAi => base
                .with_mode(PruneMode::Always)
                .with_keep_last_assistants(5)
                .with_ratios(0.5, 0.7)
                .with_min_prunable_chars(75_000),
            Preset::Gemini => base
                .with_mode(PruneMode::Always)
                .with_keep_last_assistants(10)
                .with_ratios(0.6, 0.8)
                .with_min_prunable_chars(100_000),
            Preset::Disabled => PruningConfig::disabled(),
        }
    }

    /// Pick a preset from a model id such as `anthropic/claude-sonnet-4`
    /// or a bare `gpt-4o`. Unknown models get [`Preset::Disabled`].
    pub fn for_model(model: &str) -> Preset {
        let lower = model.to_lowercase();
        let (provider, name) = match lower.rsplit_once('/') {
            Some((provider, name)) => (provider, name),
            None => ("", lower.as_str()),
        };

        if provider == "anthropic" || name.starts_with("claude") {
            Preset::Anthropic
        } else if provider == "openai"
            || name.starts_with("gpt-")
            || name.starts_with("o1")
            || name.starts_with("o3")
            || name.starts_with("o4")
        {
            Preset::OpenAi
        } else if provider == "google" || name.starts_with("gemini") {
            Preset::Gemini
        } else {
            Preset::Disabled
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Preset::ALL.iter().map(Preset::name).collect();
                format!("unknown preset '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
