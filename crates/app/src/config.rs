//! Engine tuning knobs with production defaults.

use std::time::Duration;

/// Configuration for the engine's dispatcher, runner, and scheduler loop.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the scheduler loop polls for due jobs.
    pub poll_interval: Duration,
    /// How long a claimed job may sit before the janitor returns it to
    /// pending for re-claim.
    pub claim_lease: Duration,
    /// Maximum `TriggerRule` chain depth before `ActionChainTooDeep`.
    pub max_chain_depth: u32,
    /// Deadline applied to a single action handler invocation.
    pub action_timeout: Duration,
    /// Retries after the first failed webhook attempt.
    pub webhook_max_retries: u32,
    /// Base delay for webhook retry backoff (doubles per attempt).
    pub webhook_backoff_base: Duration,
    /// Upper bound on concurrently executing actions per dispatcher.
    pub max_concurrent_actions: usize,
    /// Maximum due jobs processed per scheduler tick.
    pub due_batch_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            claim_lease: Duration::from_secs(300),
            max_chain_depth: 5,
            action_timeout: Duration::from_secs(30),
            webhook_max_retries: 3,
            webhook_backoff_base: Duration::from_millis(100),
            max_concurrent_actions: 8,
            due_batch_size: 50,
        }
    }
}

impl EngineConfig {
    /// The claim lease as a chrono duration for timestamp arithmetic.
    #[must_use]
    pub fn claim_lease_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.claim_lease).unwrap_or_else(|_| chrono::Duration::minutes(5))
    }
}
