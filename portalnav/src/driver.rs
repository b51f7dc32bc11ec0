//! The consumed browser capability.
//!
//! The engine never talks to a browser directly; everything goes through
//! [`RemoteUIDriver`]. Element descriptions are opaque strings supplied by
//! [`PortalConfig`](crate::config::PortalConfig); what they mean (CSS
//! selector, accessibility query, ...) is the driver implementation's
//! business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::DriverError;

/// Opaque reference to one open browser tab.
///
/// The id is stable for the lifetime of the tab and unique within the
/// session. Role bookkeeping (listing vs. record detail) is *not* stored
/// here; that lives in [`SessionResourceManager`](crate::tabs::SessionResourceManager).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabHandle {
    pub id: String,
}

impl TabHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for TabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A located element. Drivers re-resolve the description on every action,
/// so a ref never goes stale while its tab is alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub tab: TabHandle,
    pub description: String,
}

/// Declarative wait conditions. Kept as data rather than closures so the
/// trait stays object-safe and scripted test drivers can evaluate them
/// synchronously.
#[derive(Debug, Clone)]
pub enum WaitCondition {
    /// An element matching the description is present in the tab.
    ElementPresent(String),
    /// No element matching the description is present in the tab.
    ElementAbsent(String),
    /// The tab's location contains the given fragment.
    LocationContains(String),
}

/// Minimal browser surface the engine depends on.
#[async_trait]
pub trait RemoteUIDriver: Send + Sync {
    /// Point the tab at a URL and wait for the navigation to settle.
    async fn navigate(&self, tab: &TabHandle, url: &str) -> Result<(), DriverError>;

    /// The tab's current location. May differ from the last navigated URL
    /// after a redirect.
    async fn current_location(&self, tab: &TabHandle) -> Result<String, DriverError>;

    /// Enumerate all open tabs, in the browser's own order.
    async fn tabs(&self) -> Result<Vec<TabHandle>, DriverError>;

    /// Open a new tab at the given URL.
    async fn open_tab(&self, url: &str) -> Result<TabHandle, DriverError>;

    async fn focus(&self, tab: &TabHandle) -> Result<(), DriverError>;

    async fn close(&self, tab: &TabHandle) -> Result<(), DriverError>;

    /// Resolve an element description within a tab.
    async fn locate(&self, tab: &TabHandle, description: &str)
        -> Result<ElementRef, DriverError>;

    /// Whether an element matching the description currently exists.
    /// Unlike [`locate`](Self::locate) this never errors on absence.
    async fn exists(&self, tab: &TabHandle, description: &str) -> Result<bool, DriverError>;

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError>;

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), DriverError>;

    async fn read_text(&self, element: &ElementRef) -> Result<String, DriverError>;

    /// Poll until the condition holds or the timeout elapses. Returns
    /// whether the condition held; the timeout itself is not an error.
    async fn wait_for(
        &self,
        tab: &TabHandle,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<bool, DriverError>;
}
