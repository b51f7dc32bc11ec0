//! Portal description. Everything the engine must know about the target
//! portal (URLs, element descriptions, credentials, timing) arrives
//! through this struct; nothing portal-specific is hard-coded anywhere
//! else in the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub urls: PortalUrls,
    pub elements: PortalElements,
    pub credentials: Credentials,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Landmark URLs of the portal. Matching is prefix-based except for the
/// record template, which is compiled to a regex by
/// [`LocationClassifier`](crate::location::LocationClassifier).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalUrls {
    pub login: String,
    pub dashboard: String,
    pub listing: String,
    /// Record detail URL template; `{id}` is replaced with the record id.
    pub record_template: String,
    /// The multi-factor challenge interstitial.
    pub challenge: String,
}

impl PortalUrls {
    pub fn record_url(&self, record_id: &str) -> String {
        self.record_template.replace("{id}", record_id)
    }
}

/// Element descriptions, interpreted by the driver implementation (for the
/// CDP driver these are CSS selectors). Templates use `{id}` / `{page}`
/// placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalElements {
    pub username_field: String,
    pub password_field: String,
    pub login_button: String,

    /// Structural probe for a listing tab: the results table itself.
    pub listing_table: String,
    /// Element whose text is the rendered page's record ids, one per line.
    pub record_id_index: String,
    /// Per-record link in the listing; `{id}` placeholder.
    pub record_link_template: String,
    /// Structural probe for a record-detail tab.
    pub record_marker: String,

    /// Sort control applied once per fresh run, if the portal has one.
    #[serde(default)]
    pub sort_control: Option<String>,
    /// Element that appears once the sort has been applied.
    #[serde(default)]
    pub sort_applied_marker: Option<String>,

    pub page_current: String,
    pub page_total: String,
    /// Direct page-jump control; `{page}` placeholder. Pagination widgets
    /// often render only a window of these around the current page.
    pub page_link_template: String,
    pub page_next: String,
    pub page_prev: String,
}

impl PortalElements {
    pub fn record_link(&self, record_id: &str) -> String {
        self.record_link_template.replace("{id}", record_id)
    }

    pub fn page_link(&self, page: u32) -> String {
        self.page_link_template.replace("{page}", &page.to_string())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Keep the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Every retry loop in the engine is bounded by something in here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause between an attempted action and its verification.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Per-strategy ceiling inside the retry executor, and the default
    /// wait for structural probes.
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
    /// How often the challenge wait re-reads the tab location.
    #[serde(default = "default_challenge_poll_ms")]
    pub challenge_poll_ms: u64,
    /// How many polls before the challenge wait gives up.
    #[serde(default = "default_challenge_max_polls")]
    pub challenge_max_polls: u32,
    /// Extra pagination steps granted beyond `|target - current|`.
    #[serde(default = "default_pagination_slack")]
    pub pagination_slack: u32,
    /// Local retries before a missing tab/element is promoted to fatal.
    #[serde(default = "default_resource_retries")]
    pub resource_retries: u32,
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_action_timeout_ms() -> u64 {
    10_000
}

fn default_challenge_poll_ms() -> u64 {
    5_000
}

fn default_challenge_max_polls() -> u32 {
    36 // three minutes at the default poll interval
}

fn default_pagination_slack() -> u32 {
    3
}

fn default_resource_retries() -> u32 {
    3
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            action_timeout_ms: default_action_timeout_ms(),
            challenge_poll_ms: default_challenge_poll_ms(),
            challenge_max_polls: default_challenge_max_polls(),
            pagination_slack: default_pagination_slack(),
            resource_retries: default_resource_retries(),
        }
    }
}

impl TimingConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn challenge_poll(&self) -> Duration {
        Duration::from_millis(self.challenge_poll_ms)
    }
}
