//! Bounded pagination over uncertain page controls.
//!
//! Some pagination widgets render only a window of page numbers around the
//! current page, so the target's control may not exist until we step
//! closer. The navigator prefers a direct jump, then steps one page at a
//! time, verifying after every step that the counter actually moved in the
//! expected direction. A step that changes nothing aborts the whole move:
//! a stuck widget is a failure, not something to spin on.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::PortalElements;
use crate::driver::{RemoteUIDriver, TabHandle};
use crate::errors::NavigationError;
use crate::state::PaginationInfo;

pub struct PaginationNavigator {
    driver: Arc<dyn RemoteUIDriver>,
    elements: PortalElements,
    slack: u32,
    settle_delay: Duration,
}

impl PaginationNavigator {
    pub fn new(
        driver: Arc<dyn RemoteUIDriver>,
        elements: PortalElements,
        slack: u32,
        settle_delay: Duration,
    ) -> Self {
        Self {
            driver,
            elements,
            slack,
            settle_delay,
        }
    }

    /// Read the listing's rendered pagination state. A listing without a
    /// pagination widget reads as a single page.
    pub async fn read_info(&self, tab: &TabHandle) -> Result<PaginationInfo, NavigationError> {
        let current = match self.read_counter(tab, &self.elements.page_current).await? {
            Some(n) => n,
            None => {
                debug!(tab = %tab, "no page counter rendered; treating listing as single-page");
                return Ok(PaginationInfo::single_page());
            }
        };
        let total = self
            .read_counter(tab, &self.elements.page_total)
            .await?
            .unwrap_or(current);
        Ok(PaginationInfo {
            total_pages: total.max(current),
            current_page: current,
        })
    }

    async fn read_counter(
        &self,
        tab: &TabHandle,
        description: &str,
    ) -> Result<Option<u32>, NavigationError> {
        if !self.driver.exists(tab, description).await? {
            return Ok(None);
        }
        let element = self.driver.locate(tab, description).await?;
        let text = self.driver.read_text(&element).await?;
        let value = text.trim().parse::<u32>().map_err(|_| {
            NavigationError::ResourceUnavailable(format!(
                "page counter '{description}' shows non-numeric text '{}'",
                text.trim()
            ))
        })?;
        Ok(Some(value))
    }

    /// Move the listing to `target`, returning the confirmed pagination
    /// state on arrival. The attempt budget is `|target - current| +
    /// slack`; exhausting it, or a step that does not move the counter,
    /// fails with [`NavigationError::PaginationStuck`].
    #[instrument(skip(self, tab), fields(tab = %tab))]
    pub async fn to_page(
        &self,
        tab: &TabHandle,
        target: u32,
    ) -> Result<PaginationInfo, NavigationError> {
        if target == 0 {
            return Err(NavigationError::InvalidState(
                "page numbers start at 1".into(),
            ));
        }

        let mut info = self.read_info(tab).await?;
        if target > info.total_pages {
            return Err(NavigationError::InvalidState(format!(
                "page {target} requested but the listing shows {} pages",
                info.total_pages
            )));
        }

        let mut attempts = target.abs_diff(info.current_page) + self.slack;

        loop {
            if info.current_page == target {
                debug!(page = target, "arrived at target page");
                return Ok(info);
            }
            if attempts == 0 {
                return Err(NavigationError::PaginationStuck(format!(
                    "attempt budget exhausted at page {} before reaching page {target}",
                    info.current_page
                )));
            }
            attempts -= 1;
            let before = info.current_page;

            // Direct jump when the target's control is rendered.
            let link = self.elements.page_link(target);
            if self.driver.exists(tab, &link).await? {
                self.click(tab, &link).await?;
                info = self.read_info(tab).await?;
                if info.current_page == target {
                    return Ok(info);
                }
                if info.current_page == before {
                    return Err(NavigationError::PaginationStuck(format!(
                        "direct jump to page {target} had no effect (still on page {before})"
                    )));
                }
                // Landed somewhere else; keep going from there.
                continue;
            }

            // Progressive step toward the target.
            let control = if target > before {
                &self.elements.page_next
            } else {
                &self.elements.page_prev
            };
            self.click(tab, control).await?;
            info = self.read_info(tab).await?;

            let moved_toward = if target > before {
                info.current_page > before
            } else {
                info.current_page < before
            };
            if !moved_toward {
                warn!(
                    before,
                    after = info.current_page,
                    target,
                    "pagination step made no forward progress"
                );
                return Err(NavigationError::PaginationStuck(format!(
                    "page counter did not advance from {before} toward {target}"
                )));
            }
        }
    }

    async fn click(&self, tab: &TabHandle, description: &str) -> Result<(), NavigationError> {
        let element = self.driver.locate(tab, description).await?;
        self.driver.click(&element).await?;
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }
}
