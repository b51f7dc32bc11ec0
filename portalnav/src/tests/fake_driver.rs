//! A scripted, in-memory portal standing in for the real browser.
//!
//! Pages are keyed by URL and hold `description -> text` elements. Clicks
//! consult a rule table; an unscripted click is a silent no-op, which is
//! exactly the failure mode the retry executor exists for. Navigations can
//! be redirected per request and locations can auto-advance after a number
//! of reads, which is how the multi-factor branches are driven.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::driver::{ElementRef, RemoteUIDriver, TabHandle, WaitCondition};
use crate::errors::{DriverError, NavigationError};
use crate::extract::{DataExtractor, ExtractionReport};

#[derive(Clone)]
pub enum ClickEffect {
    /// Navigate the clicked tab.
    Goto(String),
    /// Open a new tab (a record link with target=_blank).
    OpenTab(String),
    /// Swallow the click.
    Nothing,
}

#[derive(Default, Clone)]
struct FakePage {
    elements: HashMap<String, String>,
}

struct FakeTab {
    id: String,
    url: String,
}

#[derive(Default)]
struct FakeState {
    tabs: Vec<FakeTab>,
    next_tab: u32,
    pages: HashMap<String, FakePage>,
    click_rules: HashMap<(String, String), ClickEffect>,
    /// Per-URL queues of where a navigation actually lands.
    redirects: HashMap<String, VecDeque<String>>,
    /// url -> (reads remaining, url the tab moves to).
    auto_advance: HashMap<String, (u32, String)>,
    calls: Vec<(String, String)>,
}

impl FakeState {
    fn land(&mut self, url: &str) -> String {
        if let Some(queue) = self.redirects.get_mut(url) {
            if let Some(target) = queue.pop_front() {
                return target;
            }
        }
        url.to_string()
    }

    fn tab_mut(&mut self, handle: &TabHandle) -> Result<&mut FakeTab, DriverError> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == handle.id)
            .ok_or_else(|| DriverError::TabNotFound(handle.id.clone()))
    }

    fn tab(&self, handle: &TabHandle) -> Result<&FakeTab, DriverError> {
        self.tabs
            .iter()
            .find(|t| t.id == handle.id)
            .ok_or_else(|| DriverError::TabNotFound(handle.id.clone()))
    }

    fn open(&mut self, url: &str) -> TabHandle {
        let landed = self.land(url);
        self.next_tab += 1;
        let id = format!("tab-{}", self.next_tab);
        self.tabs.push(FakeTab {
            id: id.clone(),
            url: landed,
        });
        TabHandle::new(id)
    }

    fn element_exists(&self, url: &str, description: &str) -> bool {
        self.pages
            .get(url)
            .map(|p| p.elements.contains_key(description))
            .unwrap_or(false)
    }
}

#[derive(Default)]
pub struct FakeDriver {
    inner: Mutex<FakeState>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, url: &str, elements: &[(&str, &str)]) {
        let mut state = self.inner.lock().unwrap();
        let page = state.pages.entry(url.to_string()).or_default();
        for (description, text) in elements {
            page.elements
                .insert(description.to_string(), text.to_string());
        }
    }

    pub fn open_initial_tab(&self, url: &str) -> TabHandle {
        self.inner.lock().unwrap().open(url)
    }

    pub fn on_click(&self, url: &str, description: &str, effect: ClickEffect) {
        self.inner
            .lock()
            .unwrap()
            .click_rules
            .insert((url.to_string(), description.to_string()), effect);
    }

    /// The next navigation/open targeting `requested` lands on `actual`
    /// instead; later ones behave normally (unless queued again).
    pub fn redirect_once(&self, requested: &str, actual: &str) {
        self.inner
            .lock()
            .unwrap()
            .redirects
            .entry(requested.to_string())
            .or_default()
            .push_back(actual.to_string());
    }

    /// After `reads` location reads of a tab sitting at `url`, the tab
    /// moves to `then` (a human finishing the challenge out of band).
    pub fn auto_advance_after(&self, url: &str, reads: u32, then: &str) {
        self.inner
            .lock()
            .unwrap()
            .auto_advance
            .insert(url.to_string(), (reads, then.to_string()));
    }

    pub fn count_calls(&self, method: &str, detail_contains: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(m, d)| m == method && d.contains(detail_contains))
            .count()
    }

    pub fn tab_urls(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .tabs
            .iter()
            .map(|t| t.url.clone())
            .collect()
    }

    pub fn tab_count(&self) -> usize {
        self.inner.lock().unwrap().tabs.len()
    }

    fn record(&self, method: &str, detail: String) {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push((method.to_string(), detail));
    }
}

#[async_trait]
impl RemoteUIDriver for FakeDriver {
    async fn navigate(&self, tab: &TabHandle, url: &str) -> Result<(), DriverError> {
        self.record("navigate", url.to_string());
        let mut state = self.inner.lock().unwrap();
        let landed = state.land(url);
        state.tab_mut(tab)?.url = landed;
        Ok(())
    }

    async fn current_location(&self, tab: &TabHandle) -> Result<String, DriverError> {
        let mut state = self.inner.lock().unwrap();
        let url = state.tab(tab)?.url.clone();
        self.inner_record(&mut state, "current_location", url.clone());

        if let Some((remaining, target)) = state.auto_advance.get(&url).cloned() {
            if remaining <= 1 {
                state.auto_advance.remove(&url);
                let target = target.clone();
                state.tab_mut(tab)?.url = target.clone();
                return Ok(target);
            }
            state.auto_advance.insert(url.clone(), (remaining - 1, target));
        }
        Ok(url)
    }

    async fn tabs(&self) -> Result<Vec<TabHandle>, DriverError> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .tabs
            .iter()
            .map(|t| TabHandle::new(t.id.clone()))
            .collect())
    }

    async fn open_tab(&self, url: &str) -> Result<TabHandle, DriverError> {
        self.record("open_tab", url.to_string());
        Ok(self.inner.lock().unwrap().open(url))
    }

    async fn focus(&self, tab: &TabHandle) -> Result<(), DriverError> {
        let state = self.inner.lock().unwrap();
        state.tab(tab)?;
        Ok(())
    }

    async fn close(&self, tab: &TabHandle) -> Result<(), DriverError> {
        self.record("close", tab.id.clone());
        let mut state = self.inner.lock().unwrap();
        let before = state.tabs.len();
        state.tabs.retain(|t| t.id != tab.id);
        if state.tabs.len() == before {
            return Err(DriverError::TabNotFound(tab.id.clone()));
        }
        Ok(())
    }

    async fn locate(
        &self,
        tab: &TabHandle,
        description: &str,
    ) -> Result<ElementRef, DriverError> {
        let state = self.inner.lock().unwrap();
        let url = state.tab(tab)?.url.clone();
        if state.element_exists(&url, description) {
            Ok(ElementRef {
                tab: tab.clone(),
                description: description.to_string(),
            })
        } else {
            Err(DriverError::ElementNotFound(format!(
                "{description} on {url}"
            )))
        }
    }

    async fn exists(&self, tab: &TabHandle, description: &str) -> Result<bool, DriverError> {
        let state = self.inner.lock().unwrap();
        let url = state.tab(tab)?.url.clone();
        Ok(state.element_exists(&url, description))
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        let mut state = self.inner.lock().unwrap();
        let url = state.tab(&element.tab)?.url.clone();
        self.inner_record(
            &mut state,
            "click",
            format!("{url} {}", element.description),
        );

        let rule = state
            .click_rules
            .get(&(url.clone(), element.description.clone()))
            .cloned();
        match rule {
            Some(ClickEffect::Goto(target)) => {
                let landed = state.land(&target);
                state.tab_mut(&element.tab)?.url = landed;
            }
            Some(ClickEffect::OpenTab(target)) => {
                state.open(&target);
            }
            // Unscripted clicks are silently swallowed, like a real
            // script-driven UI dropping an event.
            Some(ClickEffect::Nothing) | None => {}
        }
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        let mut state = self.inner.lock().unwrap();
        let url = state.tab(&element.tab)?.url.clone();
        if !state.element_exists(&url, &element.description) {
            return Err(DriverError::ElementNotFound(format!(
                "{} on {url}",
                element.description
            )));
        }
        state
            .pages
            .entry(url)
            .or_default()
            .elements
            .insert(element.description.clone(), text.to_string());
        Ok(())
    }

    async fn read_text(&self, element: &ElementRef) -> Result<String, DriverError> {
        let state = self.inner.lock().unwrap();
        let url = state.tab(&element.tab)?.url.clone();
        state
            .pages
            .get(&url)
            .and_then(|p| p.elements.get(&element.description))
            .cloned()
            .ok_or_else(|| {
                DriverError::ElementNotFound(format!("{} on {url}", element.description))
            })
    }

    async fn wait_for(
        &self,
        tab: &TabHandle,
        condition: &WaitCondition,
        _timeout: Duration,
    ) -> Result<bool, DriverError> {
        // The fake portal only changes via clicks/navigations, so a single
        // immediate evaluation is equivalent to polling.
        let state = self.inner.lock().unwrap();
        let url = state.tab(tab)?.url.clone();
        Ok(match condition {
            WaitCondition::ElementPresent(description) => state.element_exists(&url, description),
            WaitCondition::ElementAbsent(description) => !state.element_exists(&url, description),
            WaitCondition::LocationContains(fragment) => url.contains(fragment),
        })
    }
}

impl FakeDriver {
    /// Record while the state lock is already held.
    fn inner_record(&self, state: &mut FakeState, method: &str, detail: String) {
        state.calls.push((method.to_string(), detail));
    }
}

/// Extraction collaborator double: records what it was handed and returns
/// a canned report.
pub struct FakeExtractor {
    pub calls: Mutex<Vec<String>>,
    report: ExtractionReport,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            report: ExtractionReport {
                success: true,
                records_inserted: 1,
                error: None,
            },
        }
    }

    pub fn extracted_ids(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataExtractor for FakeExtractor {
    async fn extract(
        &self,
        record_id: &str,
        _tab: &TabHandle,
    ) -> Result<ExtractionReport, NavigationError> {
        self.calls.lock().unwrap().push(record_id.to_string());
        Ok(self.report.clone())
    }
}
