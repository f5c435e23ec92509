//! Reconnect backoff for stream subscribers

use std::time::Duration;

use rand::Rng;

/// Parameters of the exponential reconnect schedule
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of the delay applied as random jitter in both directions, 0.0..=1.0
    pub jitter: f64,
    /// `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: 0.5,
            max_attempts: Some(10),
        }
    }
}

impl ReconnectPolicy {
    /// Un-jittered delay before retry number `attempt` (zero based)
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(31));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Retry counter driven by a [`ReconnectPolicy`]
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Retries scheduled since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.policy
            .max_attempts
            .map_or(false, |max| self.attempt >= max)
    }

    /// Delay before the next retry, `None` once attempts are used up
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.next_delay_with(&mut rand::thread_rng())
    }

    pub fn next_delay_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let nominal = self.policy.nominal_delay(self.attempt);
        self.attempt += 1;

        let jitter = self.policy.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return Some(nominal);
        }
        let scale = rng.gen_range((1.0 - jitter)..=(1.0 + jitter));
        Some(nominal.mul_f64(scale))
    }

    /// Start over after a successful connection
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
