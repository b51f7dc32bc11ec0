//! Resumable navigation/session engine for session-based web portals that
//! expose no programmatic API.
//!
//! The engine signs in, survives multi-factor interstitials, walks a
//! paginated record listing, opens records, and hands each confirmed
//! record tab to an extraction collaborator. All of it sits behind a
//! start/poll-status/stop surface so a decoupled caller can drive it
//! without holding a connection open.
//!
//! The browser itself is abstracted behind [`RemoteUIDriver`]; nothing in
//! this crate knows a CSS selector from an accessibility query. The target
//! portal is described entirely by a [`PortalConfig`].

pub mod config;
pub mod controller;
pub mod driver;
pub mod errors;
pub mod extract;
pub mod location;
pub mod pagination;
pub mod retry;
pub mod state;
pub mod tabs;
#[cfg(test)]
mod tests;
pub mod workflow;

pub use config::{Credentials, PortalConfig, PortalElements, PortalUrls, TimingConfig};
pub use controller::ResumableWorkflowController;
pub use driver::{ElementRef, RemoteUIDriver, TabHandle, WaitCondition};
pub use errors::{DriverError, NavigationError};
pub use extract::{DataExtractor, ExtractionReport};
pub use location::{LocationClassifier, PageKind};
pub use pagination::PaginationNavigator;
pub use retry::{ActionStrategy, FnStrategy, RetryableActionExecutor};
pub use state::{
    ActionOutcome, NavigationState, PaginationInfo, RunMode, RunRequest, StatusSnapshot, Step,
    WorkflowResult,
};
pub use tabs::{SessionResourceManager, TabRole};
pub use workflow::NavigationStateMachine;
