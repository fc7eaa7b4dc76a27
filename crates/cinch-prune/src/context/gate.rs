//! Mode/trigger gate: decides whether pruning runs for a call at all.
//!
//! In `cache-ttl` mode the gate compares the time since the previous
//! outbound call against the configured TTL. While the provider's prompt
//! cache is presumably warm, shrinking the prefix would force a re-cache,
//! so pruning waits until the cache has expired.
//!
//! The timing state lives in a [`LastApiCall`] owned by the agent loop,
//! one per session. The gate only reads it.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use crate::context::config::PruneMode;

/// Sentinel stored while no call has been recorded.
const NO_CALL: i64 = i64::MIN;

/// Timestamp of the previous completed outbound call.
///
/// Stored as unix milliseconds in an atomic, so several threads driving the
/// same session can record calls without a lock.
#[derive(Debug)]
pub struct LastApiCall {
    millis: AtomicI64,
}

impl Default for LastApiCall {
    fn default() -> Self {
        Self::new()
    }
}

impl LastApiCall {
    /// A cell with no call recorded yet.
    pub fn new() -> Self {
        Self {
            millis: AtomicI64::new(NO_CALL),
        }
    }

    /// A cell initialized to `at`.
    pub fn at(at: DateTime<Utc>) -> Self {
        let cell = Self::new();
        cell.record(at);
        cell
    }

    /// Record a completed call at `now`. Called after every call,
    /// regardless of what the gate decided.
    pub fn record(&self, now: DateTime<Utc>) {
        self.millis.store(now.timestamp_millis(), Ordering::Release);
    }

    /// Time of the previous call, if any.
    pub fn get(&self) -> Option<DateTime<Utc>> {
        match self.millis.load(Ordering::Acquire) {
            NO_CALL => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }

    /// Forget the previous call.
    pub fn reset(&self) {
        self.millis.store(NO_CALL, Ordering::Release);
    }
}

/// Why the gate skipped pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Mode is `off`.
    Disabled,
    /// `cache-ttl` mode with no recorded call.
    NoPreviousCall,
    /// `cache-ttl` mode and the cache is still warm.
    CacheWarm { remaining: Duration },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "pruning disabled"),
            SkipReason::NoPreviousCall => write!(f, "no previous call recorded"),
            SkipReason::CacheWarm { remaining } => {
                write!(f, "prompt cache warm for another {}s", remaining.as_secs())
            }
        }
    }
}

/// Result of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Run,
    Skip(SkipReason),
}

impl GateDecision {
    pub fn should_run(&self) -> bool {
        matches!(self, GateDecision::Run)
    }
}

/// The mode/trigger state machine.
pub struct PruneGate;

impl PruneGate {
    /// Decide whether pruning runs for a call made at `now`.
    pub fn check(
        mode: PruneMode,
        ttl: Duration,
        last_call: &LastApiCall,
        now: DateTime<Utc>,
    ) -> GateDecision {
        match mode {
            PruneMode::Off => GateDecision::Skip(SkipReason::Disabled),
            PruneMode::Always => GateDecision::Run,
            PruneMode::CacheTtl => {
                let Some(last) = last_call.get() else {
                    return GateDecision::Skip(SkipReason::NoPreviousCall);
                };
                // A clock that went backwards counts as zero elapsed time.
                let elapsed = (now - last).max(TimeDelta::zero());
                let elapsed = elapsed.to_std().unwrap_or_default();
                if elapsed >= ttl {
                    GateDecision::Run
                } else {
                    GateDecision::Skip(SkipReason::CacheWarm {
                        remaining: ttl - elapsed,
                    })
                }
            }
        }
    }
}
