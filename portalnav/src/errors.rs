use std::time::Duration;
use thiserror::Error;

/// Faults reported by a [`RemoteUIDriver`](crate::driver::RemoteUIDriver)
/// implementation. These describe the transport/browser boundary only;
/// workflow-level failures live in [`NavigationError`].
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("tab not found: {0}")]
    TabNotFound(String),

    #[error("wait timed out: {0}")]
    Timeout(String),

    #[error("driver transport error: {0}")]
    Transport(String),
}

/// Workflow-level error taxonomy. Every variant is terminal for the step
/// that produced it; the state machine decides whether it is retried
/// locally or moves the run to `Step::Error`.
#[derive(Error, Debug)]
pub enum NavigationError {
    /// The portal redirected to its login page mid-run. Fatal for the run;
    /// re-authentication is never attempted automatically so credential
    /// problems stay visible.
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// The portal landed somewhere the workflow does not recognize.
    #[error("unexpected redirect to {location}")]
    AmbiguousRedirect { location: String },

    /// Every strategy supplied to the retry executor ran without a
    /// verifiable effect.
    #[error("action strategies exhausted: {0}")]
    ActionExhausted(String),

    /// A pagination step failed to move the observed page counter.
    #[error("pagination stuck: {0}")]
    PaginationStuck(String),

    /// The multi-factor challenge was not completed within the ceiling.
    #[error("challenge not completed within {waited:?}")]
    ChallengeTimeout { waited: Duration },

    /// An expected tab or element never showed up, even after the local
    /// retry budget.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Credentials were rejected (still on the login page after a verified
    /// submit). Distinct from `SessionExpired` so a bad password is never
    /// reported as a stale session.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A control-surface call arrived in a state that cannot accept it
    /// (second `start`, page selection outside the suspend point, ...).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The extraction collaborator could not be reached at all.
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("invalid portal configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}
