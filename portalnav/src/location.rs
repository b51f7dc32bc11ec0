//! URL classification.
//!
//! The portal's auth protocol is a black box; the only observable signal
//! after each step is where the browser ended up. This module turns a raw
//! location into a [`PageKind`] the state machine can branch on.

use regex::Regex;
use tracing::trace;

use crate::config::PortalUrls;
use crate::errors::NavigationError;

/// Where a location points within the portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    Login,
    Dashboard,
    Listing,
    Record(String),
    Challenge,
    /// Anywhere the workflow does not recognize; carries the raw location
    /// for diagnosis.
    Other(String),
}

/// Compiled form of [`PortalUrls`]; the record template becomes a regex
/// with a capture group for the id.
#[derive(Debug, Clone)]
pub struct LocationClassifier {
    login: String,
    dashboard: String,
    listing: String,
    challenge: String,
    record: Regex,
}

impl LocationClassifier {
    pub fn new(urls: &PortalUrls) -> Result<Self, NavigationError> {
        if !urls.record_template.contains("{id}") {
            return Err(NavigationError::Config(
                "record_template must contain an {id} placeholder".into(),
            ));
        }
        let pattern = format!(
            "^{}",
            regex::escape(&urls.record_template).replace(r"\{id\}", "([^/?#&]+)")
        );
        let record = Regex::new(&pattern)
            .map_err(|e| NavigationError::Config(format!("bad record_template: {e}")))?;

        Ok(Self {
            login: urls.login.clone(),
            dashboard: urls.dashboard.clone(),
            listing: urls.listing.clone(),
            challenge: urls.challenge.clone(),
            record,
        })
    }

    /// Classify a raw location. Most-specific patterns win: a record URL
    /// that shares the listing's prefix still classifies as a record.
    pub fn classify(&self, location: &str) -> PageKind {
        let kind = if let Some(caps) = self.record.captures(location) {
            PageKind::Record(caps[1].to_string())
        } else if location.starts_with(&self.challenge) {
            PageKind::Challenge
        } else if location.starts_with(&self.login) {
            PageKind::Login
        } else if location.starts_with(&self.listing) {
            PageKind::Listing
        } else if location.starts_with(&self.dashboard) {
            PageKind::Dashboard
        } else {
            PageKind::Other(location.to_string())
        };
        trace!(%location, ?kind, "classified location");
        kind
    }
}
