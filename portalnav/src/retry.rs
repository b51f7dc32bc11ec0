//! Retry execution for actions a remote, script-driven UI may silently
//! ignore.
//!
//! A click or form submit can report success at the driver level and still
//! have no effect on the page. Instead of assuming, every flaky action is
//! expressed as an ordered list of independent [`ActionStrategy`]s, each
//! paired with its own verification, and run through one shared executor
//! so every call site gets the same bounded policy.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::NavigationError;
use crate::state::ActionOutcome;

/// One concrete way of attempting an action, with its own success check.
/// Verification looks for an observable side effect (a field clearing, a
/// marker element appearing), never at whether the attempt "ran".
#[async_trait]
pub trait ActionStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn attempt(&self) -> Result<(), NavigationError>;

    /// Whether the action's effect is now observable.
    async fn verify(&self) -> Result<bool, NavigationError>;
}

type AttemptFn = Box<dyn Fn() -> BoxFuture<'static, Result<(), NavigationError>> + Send + Sync>;
type VerifyFn = Box<dyn Fn() -> BoxFuture<'static, Result<bool, NavigationError>> + Send + Sync>;

/// Closure-backed strategy. The executor knows nothing about the target
/// UI; callers capture whatever driver handles they need.
pub struct FnStrategy {
    name: String,
    attempt_fn: AttemptFn,
    verify_fn: VerifyFn,
}

impl FnStrategy {
    pub fn new(
        name: impl Into<String>,
        attempt: impl Fn() -> BoxFuture<'static, Result<(), NavigationError>>
            + Send
            + Sync
            + 'static,
        verify: impl Fn() -> BoxFuture<'static, Result<bool, NavigationError>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            attempt_fn: Box::new(attempt),
            verify_fn: Box::new(verify),
        }
    }

    pub fn boxed(
        name: impl Into<String>,
        attempt: impl Fn() -> BoxFuture<'static, Result<(), NavigationError>>
            + Send
            + Sync
            + 'static,
        verify: impl Fn() -> BoxFuture<'static, Result<bool, NavigationError>>
            + Send
            + Sync
            + 'static,
    ) -> Box<dyn ActionStrategy> {
        Box::new(Self::new(name, attempt, verify))
    }
}

#[async_trait]
impl ActionStrategy for FnStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self) -> Result<(), NavigationError> {
        (self.attempt_fn)().await
    }

    async fn verify(&self) -> Result<bool, NavigationError> {
        (self.verify_fn)().await
    }
}

pub struct RetryableActionExecutor {
    /// Pause between an attempt and its verification, giving the remote UI
    /// time to react.
    settle_delay: Duration,
}

impl RetryableActionExecutor {
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    /// Run strategies in order until one verifies. Returns immediately on
    /// the first verified strategy; strategies after it are never touched.
    /// `max_wait_per_attempt` caps each verification, so a hung wait
    /// cannot stall the run past its budget.
    pub async fn execute(
        &self,
        action: &str,
        strategies: &[Box<dyn ActionStrategy>],
        max_wait_per_attempt: Duration,
    ) -> ActionOutcome {
        let mut last_error: Option<String> = None;

        for strategy in strategies {
            debug!(action, strategy = strategy.name(), "attempting strategy");

            if let Err(e) = strategy.attempt().await {
                debug!(action, strategy = strategy.name(), error = %e, "attempt errored");
                last_error = Some(e.to_string());
                continue;
            }

            tokio::time::sleep(self.settle_delay).await;

            match tokio::time::timeout(max_wait_per_attempt, strategy.verify()).await {
                Ok(Ok(true)) => {
                    debug!(action, strategy = strategy.name(), "strategy verified");
                    return ActionOutcome {
                        succeeded: true,
                        strategy_used: Some(strategy.name().to_string()),
                        error: None,
                    };
                }
                Ok(Ok(false)) => {
                    last_error = Some(format!(
                        "strategy '{}' had no observable effect",
                        strategy.name()
                    ));
                }
                Ok(Err(e)) => {
                    last_error = Some(e.to_string());
                }
                Err(_) => {
                    last_error = Some(format!(
                        "strategy '{}' verification timed out after {:?}",
                        strategy.name(),
                        max_wait_per_attempt
                    ));
                }
            }
        }

        warn!(action, error = ?last_error, "all strategies exhausted");
        ActionOutcome {
            succeeded: false,
            strategy_used: None,
            error: last_error.or_else(|| Some("no strategies supplied".to_string())),
        }
    }
}
