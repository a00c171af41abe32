//! Startup connection retry
//!
//! Both external services are reached with the same fixed-delay policy:
//! try, wait, try again, up to a fixed number of attempts.

use crate::config::RetryConfig;
use crate::domain::errors::ConnectionError;
use crate::log_retry_attempt;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Wait between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// One attempt, no waiting
    pub const fn single() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Time spent sleeping when every attempt fails
    pub fn total_delay(&self) -> Duration {
        self.delay * self.max_attempts.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(2))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_secs(config.delay_seconds))
    }
}

/// Shutdown receiver that never fires, for one-shot commands with no signal
pub fn no_shutdown() -> watch::Receiver<bool> {
    watch::channel(false).1
}

/// Run `attempt` until it succeeds or the policy is used up
///
/// `attempt` receives the 1-based attempt number. Every failure is logged;
/// there is no sleep after the last one. Each attempt and each delay is raced
/// against `shutdown`; a dropped sender never interrupts.
///
/// # Errors
///
/// Returns [`ConnectionError::Exhausted`] carrying the last failure message,
/// or [`ConnectionError::Interrupted`] once `shutdown` turns `true`.
pub async fn connect_with_retry<T, E, F, Fut>(
    service: &str,
    policy: &RetryPolicy,
    mut shutdown: watch::Receiver<bool>,
    mut attempt: F,
) -> Result<T, ConnectionError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut current = 1;
    let interrupted = |attempts: u32| {
        tracing::info!(service, attempts, "Connection attempts interrupted by shutdown");
        ConnectionError::Interrupted {
            service: service.to_string(),
            attempts,
        }
    };

    loop {
        if *shutdown.borrow() {
            return Err(interrupted(current - 1));
        }

        let outcome = tokio::select! {
            biased;

            () = shutdown_requested(&mut shutdown) => return Err(interrupted(current)),
            outcome = attempt(current) => outcome,
        };

        match outcome {
            Ok(handle) => {
                tracing::debug!(service, attempt = current, "Connection established");
                return Ok(handle);
            }
            Err(e) => {
                log_retry_attempt!(service, current, max_attempts, e);

                if current >= max_attempts {
                    return Err(ConnectionError::Exhausted {
                        service: service.to_string(),
                        attempts: current,
                        message: e.to_string(),
                    });
                }

                tokio::select! {
                    biased;

                    () = shutdown_requested(&mut shutdown) => return Err(interrupted(current)),
                    () = tokio::time::sleep(policy.delay) => {}
                }
                current += 1;
            }
        }
    }
}

/// Resolves once the channel holds `true`; pends forever if the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
