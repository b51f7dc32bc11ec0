mod fake_driver;

pub use fake_driver::{ClickEffect, FakeDriver, FakeExtractor};

use crate::config::{Credentials, PortalConfig, PortalElements, PortalUrls, TimingConfig};

// Initialize tracing for tests
#[allow(dead_code)]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_test_writer()
        .try_init();
}

/// A portal description every suite shares; timings are tightened so the
/// bounded waits resolve in milliseconds.
pub fn test_config() -> PortalConfig {
    PortalConfig {
        urls: PortalUrls {
            login: "https://portal.test/login".into(),
            dashboard: "https://portal.test/home".into(),
            listing: "https://portal.test/cases".into(),
            record_template: "https://portal.test/case/{id}".into(),
            challenge: "https://portal.test/mfa".into(),
        },
        elements: PortalElements {
            username_field: "#username".into(),
            password_field: "#password".into(),
            login_button: "#login".into(),
            listing_table: "#case-table".into(),
            record_id_index: "#case-ids".into(),
            record_link_template: "#case-link-{id}".into(),
            record_marker: "#case-detail".into(),
            sort_control: None,
            sort_applied_marker: None,
            page_current: "#page-current".into(),
            page_total: "#page-total".into(),
            page_link_template: "#page-{page}".into(),
            page_next: "#page-next".into(),
            page_prev: "#page-prev".into(),
        },
        credentials: Credentials {
            username: "agent".into(),
            password: "hunter2".into(),
        },
        timing: TimingConfig {
            settle_delay_ms: 0,
            action_timeout_ms: 50,
            challenge_poll_ms: 1,
            challenge_max_polls: 2,
            pagination_slack: 3,
            resource_retries: 1,
        },
    }
}
