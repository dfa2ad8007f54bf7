//! Pacing for remote calls.
//!
//! A single [`RateLimiter`] is shared (behind an `Arc`) by everything that
//! issues create calls, so the remote per-caller limit is respected globally
//! rather than per source. Time comes from `tokio::time`, which lets tests
//! run against a paused clock.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::trace;

/// Longest single sleep while waiting for a token.
const MAX_TOKEN_WAIT: Duration = Duration::from_secs(3600);

/// How calls are spaced out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimitPolicy {
  /// No pacing.
  Disabled,

  /// At least this much time between the starts of consecutive calls.
  FixedDelay(Duration),

  /// Token bucket refilled at `per_second`, holding at most `burst` tokens.
  TokenBucket { per_second: f64, burst: u32 },
}

impl Default for RateLimitPolicy {
  fn default() -> Self {
    RateLimitPolicy::FixedDelay(Duration::from_millis(500))
  }
}

#[derive(Debug)]
struct LimiterState {
  last_call: Option<Instant>,
  tokens: f64,
  last_refill: Instant,
}

/// Shared limiter implementing a [`RateLimitPolicy`].
#[derive(Debug)]
pub struct RateLimiter {
  policy: RateLimitPolicy,
  state: Mutex<LimiterState>,
}

impl RateLimiter {
  pub fn new(policy: RateLimitPolicy) -> Self {
    let tokens = match policy {
      RateLimitPolicy::TokenBucket { burst, .. } => f64::from(burst.max(1)),
      _ => 0.0,
    };

    Self {
      policy,
      state: Mutex::new(LimiterState {
        last_call: None,
        tokens,
        last_refill: Instant::now(),
      }),
    }
  }

  pub fn disabled() -> Self {
    Self::new(RateLimitPolicy::Disabled)
  }

  pub fn policy(&self) -> RateLimitPolicy {
    self.policy
  }

  /// Wait until the policy allows another call.
  ///
  /// Waiters are served one at a time; the lock is held while sleeping so
  /// concurrent callers queue behind each other.
  pub async fn acquire(&self) {
    match self.policy {
      RateLimitPolicy::Disabled => {}
      RateLimitPolicy::FixedDelay(delay) => {
        let mut state = self.state.lock().await;
        if let Some(last) = state.last_call {
          let ready = last + delay;
          if ready > Instant::now() {
            trace!(wait_ms = (ready - Instant::now()).as_millis() as u64, "pacing call");
            sleep_until(ready).await;
          }
        }
        state.last_call = Some(Instant::now());
      }
      RateLimitPolicy::TokenBucket { per_second, burst } => {
        let per_second = per_second.max(f64::MIN_POSITIVE);
        let capacity = f64::from(burst.max(1));
        let mut state = self.state.lock().await;

        loop {
          let now = Instant::now();
          let refill = now.duration_since(state.last_refill).as_secs_f64() * per_second;
          state.tokens = (state.tokens + refill).min(capacity);
          state.last_refill = now;

          if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            break;
          }

          let wait = Duration::try_from_secs_f64((1.0 - state.tokens) / per_second)
            .unwrap_or(MAX_TOKEN_WAIT)
            .min(MAX_TOKEN_WAIT);
          trace!(wait_ms = wait.as_millis() as u64, "waiting for token");
          sleep(wait).await;
        }
      }
    }
  }
}
