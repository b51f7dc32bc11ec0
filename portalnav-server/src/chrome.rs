//! [`RemoteUIDriver`] over the Chrome DevTools Protocol.
//!
//! `headless_chrome` is a synchronous client, so every CDP call runs on
//! the blocking pool. Element descriptions are CSS selectors here; the
//! engine never assumes that, it only passes them through.

use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use portalnav::{DriverError, ElementRef, RemoteUIDriver, TabHandle, WaitCondition};

/// How often [`RemoteUIDriver::wait_for`] re-evaluates its condition.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct ChromeDriver {
    browser: Browser,
}

impl ChromeDriver {
    /// Attach to a running Chrome when a CDP URL is given, otherwise
    /// launch a fresh one.
    pub async fn attach_or_launch(cdp_url: Option<String>, headless: bool) -> Result<Self> {
        let browser = tokio::task::spawn_blocking(move || -> Result<Browser> {
            if let Some(url) = cdp_url {
                info!("attaching to Chrome at {url}");
                return Browser::connect(url.clone())
                    .with_context(|| format!("attaching to Chrome at {url}"));
            }

            info!(headless, "launching Chrome");
            let options = LaunchOptions {
                headless,
                idle_browser_timeout: Duration::from_secs(3600),
                ..Default::default()
            };
            Browser::new(options).context("launching Chrome")
        })
        .await
        .context("browser setup task failed")??;

        Ok(Self { browser })
    }

    /// Run a synchronous CDP operation on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, DriverError>
    where
        T: Send + 'static,
        F: FnOnce(Browser) -> Result<T, DriverError> + Send + 'static,
    {
        let browser = self.browser.clone();
        tokio::task::spawn_blocking(move || f(browser))
            .await
            .map_err(|e| DriverError::Transport(format!("blocking task failed: {e}")))?
    }
}

fn tab_by_id(browser: &Browser, id: &str) -> Result<Arc<Tab>, DriverError> {
    let tabs = browser
        .get_tabs()
        .lock()
        .map_err(|e| DriverError::Transport(format!("tab registry poisoned: {e}")))?;
    tabs.iter()
        .find(|tab| tab.get_target_id().as_str() == id)
        .cloned()
        .ok_or_else(|| DriverError::TabNotFound(id.to_string()))
}

fn transport(err: anyhow::Error) -> DriverError {
    DriverError::Transport(err.to_string())
}

#[async_trait]
impl RemoteUIDriver for ChromeDriver {
    async fn navigate(&self, tab: &TabHandle, url: &str) -> Result<(), DriverError> {
        let id = tab.id.clone();
        let url = url.to_string();
        self.blocking(move |browser| {
            let tab = tab_by_id(&browser, &id)?;
            tab.navigate_to(&url).map_err(transport)?;
            tab.wait_until_navigated().map_err(transport)?;
            Ok(())
        })
        .await
    }

    async fn current_location(&self, tab: &TabHandle) -> Result<String, DriverError> {
        let id = tab.id.clone();
        self.blocking(move |browser| Ok(tab_by_id(&browser, &id)?.get_url()))
            .await
    }

    async fn tabs(&self) -> Result<Vec<TabHandle>, DriverError> {
        self.blocking(move |browser| {
            let tabs = browser
                .get_tabs()
                .lock()
                .map_err(|e| DriverError::Transport(format!("tab registry poisoned: {e}")))?;
            Ok(tabs
                .iter()
                .map(|tab| TabHandle::new(tab.get_target_id().to_string()))
                .collect())
        })
        .await
    }

    async fn open_tab(&self, url: &str) -> Result<TabHandle, DriverError> {
        let url = url.to_string();
        self.blocking(move |browser| {
            let tab = browser.new_tab().map_err(transport)?;
            tab.navigate_to(&url).map_err(transport)?;
            tab.wait_until_navigated().map_err(transport)?;
            Ok(TabHandle::new(tab.get_target_id().to_string()))
        })
        .await
    }

    async fn focus(&self, tab: &TabHandle) -> Result<(), DriverError> {
        let id = tab.id.clone();
        self.blocking(move |browser| {
            tab_by_id(&browser, &id)?.activate().map_err(transport)?;
            Ok(())
        })
        .await
    }

    async fn close(&self, tab: &TabHandle) -> Result<(), DriverError> {
        let id = tab.id.clone();
        self.blocking(move |browser| {
            tab_by_id(&browser, &id)?.close(true).map_err(transport)?;
            Ok(())
        })
        .await
    }

    async fn locate(&self, tab: &TabHandle, description: &str) -> Result<ElementRef, DriverError> {
        let id = tab.id.clone();
        let selector = description.to_string();
        let found = self
            .blocking(move |browser| {
                let tab = tab_by_id(&browser, &id)?;
                Ok(tab.find_element(&selector).is_ok())
            })
            .await?;
        if found {
            Ok(ElementRef {
                tab: tab.clone(),
                description: description.to_string(),
            })
        } else {
            Err(DriverError::ElementNotFound(description.to_string()))
        }
    }

    async fn exists(&self, tab: &TabHandle, description: &str) -> Result<bool, DriverError> {
        let id = tab.id.clone();
        let selector = description.to_string();
        self.blocking(move |browser| {
            let tab = tab_by_id(&browser, &id)?;
            Ok(tab.find_element(&selector).is_ok())
        })
        .await
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        let id = element.tab.id.clone();
        let selector = element.description.clone();
        self.blocking(move |browser| {
            let tab = tab_by_id(&browser, &id)?;
            let element = tab
                .find_element(&selector)
                .map_err(|e| DriverError::ElementNotFound(format!("{selector}: {e}")))?;
            element.click().map_err(transport)?;
            Ok(())
        })
        .await
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        let id = element.tab.id.clone();
        let selector = element.description.clone();
        let text = text.to_string();
        self.blocking(move |browser| {
            let tab = tab_by_id(&browser, &id)?;
            let element = tab
                .find_element(&selector)
                .map_err(|e| DriverError::ElementNotFound(format!("{selector}: {e}")))?;
            element.type_into(&text).map_err(transport)?;
            Ok(())
        })
        .await
    }

    async fn read_text(&self, element: &ElementRef) -> Result<String, DriverError> {
        let id = element.tab.id.clone();
        let selector = element.description.clone();
        self.blocking(move |browser| {
            let tab = tab_by_id(&browser, &id)?;
            let element = tab
                .find_element(&selector)
                .map_err(|e| DriverError::ElementNotFound(format!("{selector}: {e}")))?;
            element.get_inner_text().map_err(transport)
        })
        .await
    }

    async fn wait_for(
        &self,
        tab: &TabHandle,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<bool, DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            let holds = match condition {
                WaitCondition::ElementPresent(selector) => self.exists(tab, selector).await?,
                WaitCondition::ElementAbsent(selector) => !self.exists(tab, selector).await?,
                WaitCondition::LocationContains(fragment) => {
                    self.current_location(tab).await?.contains(fragment.as_str())
                }
            };
            if holds {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                debug!(?condition, ?timeout, "wait condition never held");
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL.min(deadline - Instant::now())).await;
        }
    }
}
