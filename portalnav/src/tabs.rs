//! Tab ownership and role bookkeeping.
//!
//! Tabs get opened, closed, and reordered as records are processed; no
//! other component is allowed to re-derive tab identity from position or
//! count. This manager keeps exactly one authoritative tab per role and
//! re-validates stored handles against the driver's live tab set before
//! handing them out, so a caller never receives a closed handle.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::driver::{RemoteUIDriver, TabHandle};
use crate::errors::{DriverError, NavigationError};
use crate::location::{LocationClassifier, PageKind};

/// Inferred role of an open tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabRole {
    Listing,
    RecordDetail,
    Unknown,
}

pub struct SessionResourceManager {
    driver: Arc<dyn RemoteUIDriver>,
    classifier: LocationClassifier,
    /// Structural probe confirming a listing tab (the results table).
    listing_probe: String,
    /// Structural probe confirming a record-detail tab.
    record_probe: String,
    listing_tab: Option<TabHandle>,
    record_tab: Option<TabHandle>,
}

impl SessionResourceManager {
    pub fn new(
        driver: Arc<dyn RemoteUIDriver>,
        classifier: LocationClassifier,
        listing_probe: String,
        record_probe: String,
    ) -> Self {
        Self {
            driver,
            classifier,
            listing_probe,
            record_probe,
            listing_tab: None,
            record_tab: None,
        }
    }

    /// Classify a tab by URL pattern, confirmed by a structural probe.
    /// URL alone is insufficient: a record tab's URL can transiently
    /// resemble a listing URL mid-redirect, so the probe always gets the
    /// final word.
    pub async fn classify(&self, tab: &TabHandle) -> Result<TabRole, DriverError> {
        let location = self.driver.current_location(tab).await?;
        let role = match self.classifier.classify(&location) {
            PageKind::Listing => {
                if self.driver.exists(tab, &self.listing_probe).await? {
                    TabRole::Listing
                } else {
                    TabRole::Unknown
                }
            }
            PageKind::Record(_) => {
                if self.driver.exists(tab, &self.record_probe).await? {
                    TabRole::RecordDetail
                } else {
                    TabRole::Unknown
                }
            }
            _ => {
                // URL inconclusive; let the probes decide.
                if self.driver.exists(tab, &self.record_probe).await? {
                    TabRole::RecordDetail
                } else if self.driver.exists(tab, &self.listing_probe).await? {
                    TabRole::Listing
                } else {
                    TabRole::Unknown
                }
            }
        };
        debug!(tab = %tab, %location, ?role, "classified tab");
        Ok(role)
    }

    /// The authoritative listing tab, re-resolving from the live tab set
    /// when the stored handle is missing or stale.
    pub async fn listing_tab(&mut self) -> Result<TabHandle, NavigationError> {
        if let Some(stored) = self.listing_tab.clone() {
            let live = self.driver.tabs().await?;
            if live.contains(&stored) {
                return Ok(stored);
            }
            warn!(tab = %stored, "stored listing tab is gone; re-resolving");
            self.listing_tab = None;
        }
        self.resolve_listing_tab().await
    }

    /// The authoritative record tab, if a live one is stored.
    pub async fn record_tab(&mut self) -> Result<Option<TabHandle>, NavigationError> {
        if let Some(stored) = self.record_tab.clone() {
            let live = self.driver.tabs().await?;
            if live.contains(&stored) {
                return Ok(Some(stored));
            }
            debug!(tab = %stored, "stored record tab is gone");
            self.record_tab = None;
        }
        Ok(None)
    }

    /// Stored handles without validation; for cheap diagnostics only.
    pub fn peek_record_tab(&self) -> Option<&TabHandle> {
        self.record_tab.as_ref()
    }

    pub fn peek_listing_tab(&self) -> Option<&TabHandle> {
        self.listing_tab.as_ref()
    }

    /// Pick the listing tab out of the open set. When classification is
    /// ambiguous for every tab, falls back to the first one rather than
    /// failing the run; the ambiguity is logged for diagnosis.
    pub async fn resolve_listing_tab(&mut self) -> Result<TabHandle, NavigationError> {
        let tabs = self.driver.tabs().await?;
        if tabs.is_empty() {
            return Err(NavigationError::ResourceUnavailable(
                "no browser tabs are open".into(),
            ));
        }

        for tab in &tabs {
            match self.classify(tab).await {
                Ok(TabRole::Listing) => {
                    self.set_listing(tab.clone());
                    return Ok(tab.clone());
                }
                Ok(_) => {}
                Err(e) => debug!(tab = %tab, error = %e, "could not classify tab"),
            }
        }

        let first = tabs[0].clone();
        warn!(
            tab = %first,
            open_tabs = tabs.len(),
            "no tab classified as the listing; falling back to the first tab"
        );
        self.set_listing(first.clone());
        Ok(first)
    }

    /// Explicit role assignment, used right after an action is known to
    /// have opened or focused a tab.
    pub fn promote_to_record_tab(&mut self, tab: TabHandle) {
        if self.listing_tab.as_ref() == Some(&tab) {
            self.listing_tab = None;
        }
        debug!(tab = %tab, "promoted to record tab");
        self.record_tab = Some(tab);
    }

    pub fn promote_to_listing_tab(&mut self, tab: TabHandle) {
        self.set_listing(tab);
    }

    fn set_listing(&mut self, tab: TabHandle) {
        if self.record_tab.as_ref() == Some(&tab) {
            self.record_tab = None;
        }
        debug!(tab = %tab, "promoted to listing tab");
        self.listing_tab = Some(tab);
    }

    /// Close every tab not classified as the listing and clear the stored
    /// record-tab reference. Invoked before re-entering the listing so
    /// record tabs never accumulate across a run. Idempotent.
    pub async fn close_non_listing_tabs(&mut self) -> Result<(), NavigationError> {
        let tabs = self.driver.tabs().await?;
        let mut kept: Option<TabHandle> = None;

        for tab in tabs {
            let role = self.classify(&tab).await.unwrap_or(TabRole::Unknown);
            if role == TabRole::Listing && kept.is_none() {
                kept = Some(tab);
                continue;
            }
            debug!(tab = %tab, ?role, "closing non-listing tab");
            if let Err(e) = self.driver.close(&tab).await {
                warn!(tab = %tab, error = %e, "failed to close tab");
            }
        }

        self.record_tab = None;
        self.listing_tab = kept;
        Ok(())
    }

    /// Drop all stored role assignments (fresh run over the same browser).
    pub fn reset(&mut self) {
        self.listing_tab = None;
        self.record_tab = None;
    }
}
