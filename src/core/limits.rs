//! Run limits, retry policy and cooperative cancellation.
//!
//! Keeps a run bounded through configurable limits on:
//! - Concurrent generator workers
//! - Per-generator and whole-run timeouts
//! - The contingency share of the budget held back from allocation
//! - The weakest relationship edge still applied during integration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Phase;

/// Limits for one orchestration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationLimits {
    /// Generators running at once (default: 4)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Timeout for a single generator attempt (default: 10s)
    #[serde(default = "default_generator_timeout")]
    pub generator_timeout_ms: u64,

    /// Total run timeout in seconds (default: 120)
    #[serde(default = "default_run_timeout")]
    pub run_timeout_seconds: u64,

    /// Share of the budget held back from allocation (default: 0.1)
    #[serde(default = "default_contingency_reserve")]
    pub contingency_reserve: f64,

    /// Relationship edges weaker than this are ignored (default: 0.2)
    #[serde(default = "default_min_edge_strength")]
    pub min_edge_strength: f64,
}

fn default_max_workers() -> usize {
    4
}
fn default_generator_timeout() -> u64 {
    10_000
}
fn default_run_timeout() -> u64 {
    120
}
fn default_contingency_reserve() -> f64 {
    0.1
}
fn default_min_edge_strength() -> f64 {
    0.2
}

impl Default for OrchestrationLimits {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            generator_timeout_ms: default_generator_timeout(),
            run_timeout_seconds: default_run_timeout(),
            contingency_reserve: default_contingency_reserve(),
            min_edge_strength: default_min_edge_strength(),
        }
    }
}

impl OrchestrationLimits {
    pub fn generator_timeout(&self) -> Duration {
        Duration::from_millis(self.generator_timeout_ms)
    }

    /// Worker count, never zero
    pub fn workers(&self) -> usize {
        self.max_workers.max(1)
    }

    /// Contingency share clamped to [0, 0.5]
    pub fn contingency_share(&self) -> f64 {
        self.contingency_reserve.clamp(0.0, 0.5)
    }

    /// Check run state at a phase boundary
    pub fn check(&self, tracker: &RunTracker, next: Phase) -> Result<(), LimitViolation> {
        if tracker.cancel.is_cancelled() {
            return Err(LimitViolation::Cancelled { before: next });
        }

        let elapsed = tracker.started_at.elapsed().as_secs();
        if elapsed >= self.run_timeout_seconds {
            return Err(LimitViolation::RunTimeout {
                elapsed_seconds: elapsed,
                limit_seconds: self.run_timeout_seconds,
            });
        }

        Ok(())
    }
}

/// Tracks progress of a run against its limits
#[derive(Debug, Clone)]
pub struct RunTracker {
    /// When the run started
    pub started_at: Instant,

    /// Phase boundaries passed
    pub checkpoints: u32,

    /// Generator attempts made, including retries
    pub generator_attempts: u32,

    cancel: CancellationFlag,
}

impl RunTracker {
    pub fn new(cancel: CancellationFlag) -> Self {
        Self {
            started_at: Instant::now(),
            checkpoints: 0,
            generator_attempts: 0,
            cancel,
        }
    }

    pub fn record_checkpoint(&mut self) {
        self.checkpoints += 1;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

/// Cooperative cancellation shared between a caller and a run
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Retry configuration for generator calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay between retries in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier (delay *= multiplier after each retry)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    2
}
fn default_initial_delay() -> u64 {
    50
}
fn default_max_delay() -> u64 {
    1000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no delay
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 0,
            ..Default::default()
        }
    }

    /// Calculate delay for a specific attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.initial_delay_ms);
        }

        let delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }

    /// Check if we should retry based on attempt count
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Limit violations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LimitViolation {
    #[error("cancelled before {before}")]
    Cancelled { before: Phase },

    #[error("run timeout: {elapsed_seconds}s >= {limit_seconds}s")]
    RunTimeout {
        elapsed_seconds: u64,
        limit_seconds: u64,
    },
}
