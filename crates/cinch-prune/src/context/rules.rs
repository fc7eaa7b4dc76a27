//! Per-tool pruning eligibility.
//!
//! Tool results are prunable unless a rule protects them. Deny patterns are
//! checked first and always win; an empty allow list allows everything, so
//! only deny entries restrict by default.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Allow/deny glob lists deciding which tools' results may be pruned.
///
/// Patterns are case-insensitive; `*` matches any run of characters and
/// everything else is literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ToolRules {
    /// Tool name patterns whose results may be pruned.
    pub allow: Vec<String>,
    /// Tool name patterns whose results are never pruned.
    pub deny: Vec<String>,
}

impl Default for ToolRules {
    fn default() -> Self {
        Self {
            allow: vec!["*".to_string()],
            deny: Vec::new(),
        }
    }
}

impl ToolRules {
    /// Rules that allow every tool.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Add an allow pattern.
    pub fn allow(mut self, pattern: impl Into<String>) -> Self {
        self.allow.push(pattern.into());
        self
    }

    /// Add a deny pattern.
    pub fn deny(mut self, pattern: impl Into<String>) -> Self {
        self.deny.push(pattern.into());
        self
    }

    /// Whether results of `tool_name` may be pruned under these rules.
    pub fn is_prunable(&self, tool_name: &str) -> bool {
        is_prunable(tool_name, self)
    }
}

/// Whether results of `tool_name` may be pruned under `rules`.
pub fn is_prunable(tool_name: &str, rules: &ToolRules) -> bool {
    if rules.deny.iter().any(|p| glob_matches(p, tool_name)) {
        return false;
    }
    if rules.allow.is_empty() {
        return true;
    }
    rules.allow.iter().any(|p| glob_matches(p, tool_name))
}

/// Case-insensitive glob match where `*` matches any run of characters.
pub fn glob_matches(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().flat_map(char::to_lowercase).collect();
    let name: Vec<char> = name.chars().flat_map(char::to_lowercase).collect();
    glob_matches_inner(&pattern, &name)
}

fn glob_matches_inner(pattern: &[char], name: &[char]) -> bool {
    let mut pi = 0; // pattern index
    let mut si = 0; // name index

    // Last `*` seen, for backtracking.
    let mut star_pi = usize::MAX;
    let mut star_si = 0;

    while si < name.len() {
        if pi < pattern.len() && pattern[pi] == '*' {
            star_pi = pi;
            star_si = si;
            pi += 1;
            continue;
        }

        if pi < pattern.len() && pattern[pi] == name[si] {
            pi += 1;
            si += 1;
            continue;
        }

        if star_pi != usize::MAX {
            star_si += 1;
            si = star_si;
            pi = star_pi + 1;
            continue;
        }

        return false;
    }

    // Trailing stars match the empty remainder.
    pattern[pi..].iter().all(|&c| c == '*')
}
