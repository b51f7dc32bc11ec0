//! Run state and the values that cross component boundaries.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// The workflow's logical position. Transitions only move along the edges
/// the state machine defines; `Error` is terminal for the run but not for
/// the process, since a later run may start fresh over the same browser
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Initial,
    LoginPage,
    Authenticating,
    Dashboard,
    Listing,
    PageSelection,
    ReturningToListing,
    ProcessingRecord,
    ExtractingData,
    ExtractionComplete,
    Error,
}

impl Step {
    /// Whether automatic progression stops at this step.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::ExtractionComplete | Step::Error)
    }
}

/// What the caller asked for when starting a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Start from the top of the (sorted) listing.
    FirstCase,
    /// Continue with the record after the one the previous run processed.
    NextCase,
    /// Navigate straight to a known record id.
    SpecificCase(String),
}

/// Immutable once submitted; one per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub mode: RunMode,
}

impl RunRequest {
    pub fn new(mode: RunMode) -> Self {
        Self { mode }
    }
}

/// The single mutable record of a run. Mutated exclusively by the state
/// machine; the controller only ever reads it for status reporting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub current_step: Step,
    pub is_authenticated: bool,
    pub error: Option<String>,
    /// Unix millis.
    pub session_started_at: u64,
    /// Unix millis; bumped on every state-machine step.
    pub last_activity_at: u64,
    pub current_record_id: Option<String>,
    pub current_url: Option<String>,
    /// Step-specific payload (pagination info while suspended, extraction
    /// report once complete).
    pub data: Option<serde_json::Value>,
    pub run_id: Option<String>,
}

impl NavigationState {
    pub fn new() -> Self {
        let now = now_millis();
        Self {
            current_step: Step::Initial,
            is_authenticated: false,
            error: None,
            session_started_at: now,
            last_activity_at: now,
            current_record_id: None,
            current_url: None,
            data: None,
            run_id: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity_at = now_millis();
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read from the listing's rendered state; recomputed after every
/// navigation, never cached across steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub total_pages: u32,
    pub current_page: u32,
}

impl PaginationInfo {
    /// What a listing without a pagination widget amounts to.
    pub fn single_page() -> Self {
        Self {
            total_pages: 1,
            current_page: 1,
        }
    }
}

/// Result of one retry-executor invocation. Consumed immediately, never
/// persisted.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub succeeded: bool,
    pub strategy_used: Option<String>,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn into_result(self, action: &str) -> Result<String, crate::errors::NavigationError> {
        if self.succeeded {
            Ok(self.strategy_used.unwrap_or_default())
        } else {
            Err(crate::errors::NavigationError::ActionExhausted(format!(
                "{action}: {}",
                self.error
                    .unwrap_or_else(|| "no strategy verified".to_string())
            )))
        }
    }
}

/// The unit returned from every state-machine transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub success: bool,
    pub next_step: Step,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl WorkflowResult {
    pub fn advance(next_step: Step) -> Self {
        Self {
            success: true,
            next_step,
            error: None,
            data: None,
        }
    }

    pub fn advance_with(next_step: Step, data: serde_json::Value) -> Self {
        Self {
            success: true,
            next_step,
            error: None,
            data: Some(data),
        }
    }

    /// A suspend point: the run halts at `at` until an external event
    /// resumes it.
    pub fn suspend(at: Step, data: serde_json::Value) -> Self {
        Self {
            success: true,
            next_step: at,
            error: None,
            data: Some(data),
        }
    }

    pub fn fail(error: &crate::errors::NavigationError) -> Self {
        Self {
            success: false,
            next_step: Step::Error,
            error: Some(error.to_string()),
            data: None,
        }
    }
}

/// Non-blocking projection of [`NavigationState`] for the status surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub run_id: Option<String>,
    pub active: bool,
    pub current_step: Step,
    pub current_url: Option<String>,
    pub current_record_id: Option<String>,
    pub is_authenticated: bool,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub session_started_at: u64,
    pub last_activity_at: u64,
}

impl StatusSnapshot {
    pub fn project(state: &NavigationState, active: bool) -> Self {
        Self {
            run_id: state.run_id.clone(),
            active,
            current_step: state.current_step,
            current_url: state.current_url.clone(),
            current_record_id: state.current_record_id.clone(),
            is_authenticated: state.is_authenticated,
            error: state.error.clone(),
            data: state.data.clone(),
            session_started_at: state.session_started_at,
            last_activity_at: state.last_activity_at,
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
