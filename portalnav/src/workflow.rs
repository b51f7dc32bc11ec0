//! The ordered workflow: authenticate, reach the listing, select or resume
//! a record, hand off to extraction, return for the next one.
//!
//! Every transition returns a [`WorkflowResult`]; a failed transition moves
//! the run to `Step::Error` and stops automatic progression without
//! tearing down the browser session, so a later run can reuse the
//! authenticated session.

use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::config::PortalConfig;
use crate::driver::{RemoteUIDriver, TabHandle, WaitCondition};
use crate::errors::{DriverError, NavigationError};
use crate::extract::{DataExtractor, ExtractionReport};
use crate::location::{LocationClassifier, PageKind};
use crate::pagination::PaginationNavigator;
use crate::retry::{ActionStrategy, FnStrategy, RetryableActionExecutor};
use crate::state::{NavigationState, RunMode, RunRequest, Step, WorkflowResult};
use crate::tabs::SessionResourceManager;

pub struct NavigationStateMachine {
    driver: Arc<dyn RemoteUIDriver>,
    extractor: Arc<dyn DataExtractor>,
    config: PortalConfig,
    classifier: LocationClassifier,
    tabs: SessionResourceManager,
    executor: RetryableActionExecutor,
    paginator: PaginationNavigator,
    state: Arc<Mutex<NavigationState>>,
    /// Page chosen by the caller while suspended at `PageSelection`.
    pending_page: Option<u32>,
}

impl NavigationStateMachine {
    pub fn new(
        driver: Arc<dyn RemoteUIDriver>,
        extractor: Arc<dyn DataExtractor>,
        config: PortalConfig,
    ) -> Result<Self, NavigationError> {
        let classifier = LocationClassifier::new(&config.urls)?;
        let tabs = SessionResourceManager::new(
            Arc::clone(&driver),
            classifier.clone(),
            config.elements.listing_table.clone(),
            config.elements.record_marker.clone(),
        );
        let executor = RetryableActionExecutor::new(config.timing.settle_delay());
        let paginator = PaginationNavigator::new(
            Arc::clone(&driver),
            config.elements.clone(),
            config.timing.pagination_slack,
            config.timing.settle_delay(),
        );
        Ok(Self {
            driver,
            extractor,
            config,
            classifier,
            tabs,
            executor,
            paginator,
            state: Arc::new(Mutex::new(NavigationState::new())),
            pending_page: None,
        })
    }

    /// Shared run state; the controller reads it for status reporting.
    pub fn state(&self) -> Arc<Mutex<NavigationState>> {
        Arc::clone(&self.state)
    }

    /// Position the machine for a new run. An authenticated session is
    /// reused; a fresh session starts at `Initial`.
    pub async fn begin_run(&mut self, request: &RunRequest, run_id: &str) {
        self.pending_page = None;
        let mut st = self.state.lock().await;
        let resume = st.is_authenticated;

        st.run_id = Some(run_id.to_string());
        st.error = None;
        st.data = None;
        st.touch();

        st.current_step = if !resume {
            self.tabs.reset();
            st.current_record_id = None;
            Step::Initial
        } else {
            match request.mode {
                // Direct navigation needs no listing pass.
                RunMode::SpecificCase(_) => Step::ProcessingRecord,
                RunMode::FirstCase | RunMode::NextCase => Step::ReturningToListing,
            }
        };
        if matches!(request.mode, RunMode::FirstCase) {
            st.current_record_id = None;
        }
        info!(run_id, mode = ?request.mode, step = ?st.current_step, "run positioned");
    }

    pub fn set_page_choice(&mut self, page: u32) {
        self.pending_page = Some(page);
    }

    pub fn has_page_choice(&self) -> bool {
        self.pending_page.is_some()
    }

    /// Execute exactly one logical step. No step begins before the
    /// previous one's result was observed; tab role changes happen
    /// synchronously inside the step that caused them.
    #[instrument(skip(self, request))]
    pub async fn advance(&mut self, request: &RunRequest) -> WorkflowResult {
        let step = { self.state.lock().await.current_step };
        if step.is_terminal() {
            // Nothing to do, and the terminal error must stay visible.
            return WorkflowResult::advance(step);
        }

        let outcome = match step {
            Step::Initial => self.step_initial().await,
            Step::LoginPage => self.step_login().await,
            Step::Authenticating => self.step_authenticating().await,
            Step::Dashboard => self.step_dashboard().await,
            Step::Listing => self.step_listing(request).await,
            Step::PageSelection => self.step_page_selection().await,
            Step::ReturningToListing => self.step_return_to_listing().await,
            Step::ProcessingRecord => self.step_processing_record(request).await,
            Step::ExtractingData => self.step_extracting_data().await,
            Step::ExtractionComplete | Step::Error => unreachable!("terminal steps return above"),
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(?step, error = %e, "step failed; run moves to Error");
                WorkflowResult::fail(&e)
            }
        };

        let url = self.observed_url().await;
        let mut st = self.state.lock().await;
        st.touch();
        st.current_step = result.next_step;
        st.error = result.error.clone();
        if result.data.is_some() {
            st.data = result.data.clone();
        }
        if url.is_some() {
            st.current_url = url;
        }
        result
    }

    // ------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------

    async fn step_initial(&mut self) -> Result<WorkflowResult, NavigationError> {
        let login_url = self.config.urls.login.clone();
        let tabs = self.driver.tabs().await?;
        match tabs.first() {
            Some(tab) => {
                self.driver.focus(tab).await?;
                self.driver.navigate(tab, &login_url).await?;
            }
            None => {
                self.driver.open_tab(&login_url).await?;
            }
        }
        Ok(WorkflowResult::advance(Step::LoginPage))
    }

    async fn step_login(&mut self) -> Result<WorkflowResult, NavigationError> {
        let tab = self.sole_tab().await?;
        let elements = &self.config.elements;

        let username = self
            .locate_with_retries(&tab, &elements.username_field)
            .await?;
        self.driver
            .type_text(&username, &self.config.credentials.username)
            .await?;
        let password = self
            .locate_with_retries(&tab, &elements.password_field)
            .await?;
        self.driver
            .type_text(&password, &self.config.credentials.password)
            .await?;

        // Submitting the form is a classic silently-ignored action:
        // independent strategies, each verified by the password field
        // disappearing (the portal navigates away on success).
        let verify_gone = self.absence_verifier(&tab, &elements.password_field);
        let strategies: Vec<Box<dyn ActionStrategy>> = vec![
            self.click_strategy("click-login-button", &tab, &elements.login_button, &verify_gone),
            self.type_strategy(
                "submit-from-password-field",
                &tab,
                &elements.password_field,
                "\n",
                &verify_gone,
            ),
            self.refocus_click_strategy(
                "refocus-and-click",
                &tab,
                &elements.login_button,
                &verify_gone,
            ),
        ];

        self.executor
            .execute("login submit", &strategies, self.config.timing.action_timeout())
            .await
            .into_result("login submit")?;

        Ok(WorkflowResult::advance(Step::Authenticating))
    }

    async fn step_authenticating(&mut self) -> Result<WorkflowResult, NavigationError> {
        let tab = self.sole_tab().await?;
        let location = self.driver.current_location(&tab).await?;

        let landed = match self.classifier.classify(&location) {
            PageKind::Challenge => {
                info!("multi-factor challenge detected; waiting for completion");
                let after = self.wait_out_challenge(&tab).await?;
                self.classifier.classify(&after)
            }
            kind => kind,
        };

        match landed {
            PageKind::Dashboard => {
                self.mark_authenticated().await;
                Ok(WorkflowResult::advance(Step::Dashboard))
            }
            PageKind::Listing => {
                // Some portals skip the dashboard entirely.
                self.mark_authenticated().await;
                self.tabs.promote_to_listing_tab(tab);
                Ok(WorkflowResult::advance(Step::Listing))
            }
            PageKind::Login => Err(NavigationError::AuthenticationFailed(
                "portal returned to the login page after submit".into(),
            )),
            PageKind::Challenge => unreachable!("wait_out_challenge only returns on departure"),
            PageKind::Record(_) | PageKind::Other(_) => {
                let location = self.driver.current_location(&tab).await?;
                Err(NavigationError::AmbiguousRedirect { location })
            }
        }
    }

    async fn step_dashboard(&mut self) -> Result<WorkflowResult, NavigationError> {
        let tab = self.sole_tab().await?;
        let listing_url = self.config.urls.listing.clone();
        let table = self.config.elements.listing_table.clone();

        let mut attempts = self.config.timing.resource_retries.max(1);
        loop {
            self.driver.navigate(&tab, &listing_url).await?;
            let rendered = self
                .driver
                .wait_for(
                    &tab,
                    &WaitCondition::ElementPresent(table.clone()),
                    self.config.timing.action_timeout(),
                )
                .await?;
            if rendered {
                break;
            }
            attempts -= 1;
            if attempts == 0 {
                return Err(NavigationError::ResourceUnavailable(format!(
                    "listing table '{table}' never rendered"
                )));
            }
            debug!(remaining = attempts, "listing table not rendered; retrying navigation");
        }

        self.tabs.promote_to_listing_tab(tab);
        Ok(WorkflowResult::advance(Step::Listing))
    }

    async fn step_listing(&mut self, request: &RunRequest) -> Result<WorkflowResult, NavigationError> {
        let tab = self.tabs.listing_tab().await?;

        // Filters/sort are applied in place, once per fresh listing pass.
        if matches!(request.mode, RunMode::FirstCase) {
            self.apply_listing_sort(&tab).await?;
        }

        let info = self.paginator.read_info(&tab).await?;
        let data = serde_json::to_value(info).unwrap_or(serde_json::Value::Null);

        match &request.mode {
            RunMode::FirstCase if info.total_pages > 1 => {
                info!(
                    total_pages = info.total_pages,
                    "multiple pages; suspending for caller page choice"
                );
                Ok(WorkflowResult::suspend(Step::PageSelection, data))
            }
            _ => Ok(WorkflowResult::advance_with(Step::ProcessingRecord, data)),
        }
    }

    async fn step_page_selection(&mut self) -> Result<WorkflowResult, NavigationError> {
        let tab = self.tabs.listing_tab().await?;
        let Some(page) = self.pending_page.take() else {
            // Still waiting on the caller; re-surface the suspension.
            let info = self.paginator.read_info(&tab).await?;
            let data = serde_json::to_value(info).unwrap_or(serde_json::Value::Null);
            return Ok(WorkflowResult::suspend(Step::PageSelection, data));
        };

        let info = self.paginator.to_page(&tab, page).await?;
        let data = serde_json::to_value(info).unwrap_or(serde_json::Value::Null);
        Ok(WorkflowResult::advance_with(Step::ProcessingRecord, data))
    }

    async fn step_return_to_listing(&mut self) -> Result<WorkflowResult, NavigationError> {
        self.tabs.close_non_listing_tabs().await?;

        let tab = match self.tabs.listing_tab().await {
            Ok(tab) => tab,
            Err(_) => {
                // Nothing listing-shaped survived; reopen it.
                let tab = self.driver.open_tab(&self.config.urls.listing).await?;
                self.tabs.promote_to_listing_tab(tab.clone());
                tab
            }
        };
        self.driver.focus(&tab).await?;

        let table = self.config.elements.listing_table.clone();
        let rendered = self
            .driver
            .wait_for(
                &tab,
                &WaitCondition::ElementPresent(table.clone()),
                self.config.timing.action_timeout(),
            )
            .await?;
        if !rendered {
            // The tab may have gone stale while a record was processed.
            self.driver.navigate(&tab, &self.config.urls.listing).await?;
            let rendered = self
                .driver
                .wait_for(
                    &tab,
                    &WaitCondition::ElementPresent(table.clone()),
                    self.config.timing.action_timeout(),
                )
                .await?;
            if !rendered {
                return Err(NavigationError::ResourceUnavailable(format!(
                    "listing table '{table}' never rendered on return"
                )));
            }
        }

        Ok(WorkflowResult::advance(Step::Listing))
    }

    async fn step_processing_record(
        &mut self,
        request: &RunRequest,
    ) -> Result<WorkflowResult, NavigationError> {
        let (record_id, tab) = match &request.mode {
            RunMode::SpecificCase(id) => {
                let id = id.clone();
                let tab = self.open_record_directly(&id).await?;
                (id, tab)
            }
            mode => {
                let id = self.choose_record(mode).await?;
                let tab = self.open_record_from_listing(&id).await?;
                (id, tab)
            }
        };

        self.tabs.promote_to_record_tab(tab);
        let mut st = self.state.lock().await;
        st.current_record_id = Some(record_id.clone());
        drop(st);

        info!(%record_id, "record ready for extraction");
        Ok(WorkflowResult::advance(Step::ExtractingData))
    }

    async fn step_extracting_data(&mut self) -> Result<WorkflowResult, NavigationError> {
        let record_id = {
            let st = self.state.lock().await;
            st.current_record_id.clone().ok_or_else(|| {
                NavigationError::InvalidState("extracting without a current record".into())
            })?
        };
        let tab = self.tabs.record_tab().await?.ok_or_else(|| {
            NavigationError::ResourceUnavailable("record tab vanished before extraction".into())
        })?;

        // The report is folded into status data either way; extraction
        // problems never feed back into navigation.
        let report = match self.extractor.extract(&record_id, &tab).await {
            Ok(report) => report,
            Err(e) => {
                warn!(%record_id, error = %e, "extraction collaborator failed");
                ExtractionReport::failed(e.to_string())
            }
        };

        let data = serde_json::json!({
            "recordId": record_id,
            "extraction": report,
        });
        Ok(WorkflowResult::advance_with(Step::ExtractionComplete, data))
    }

    // ------------------------------------------------------------------
    // Record opening
    // ------------------------------------------------------------------

    /// Direct navigation to a known record id, with the redirect ladder:
    /// expected record, one dashboard retry, bounded challenge wait,
    /// fatal login redirect, and everything else surfaced for diagnosis.
    async fn open_record_directly(&mut self, record_id: &str) -> Result<TabHandle, NavigationError> {
        let url = self.config.urls.record_url(record_id);
        let tab = match self.tabs.record_tab().await? {
            Some(tab) => {
                self.driver.navigate(&tab, &url).await?;
                tab
            }
            None => self.driver.open_tab(&url).await?,
        };

        let mut dashboard_retried = false;
        loop {
            let location = self.driver.current_location(&tab).await?;
            match self.classifier.classify(&location) {
                PageKind::Record(found) if found == record_id => return Ok(tab),
                PageKind::Dashboard if !dashboard_retried => {
                    // Transient session hiccup; one more direct attempt.
                    debug!(record_id, "redirected to dashboard; retrying direct navigation once");
                    dashboard_retried = true;
                    self.driver.navigate(&tab, &url).await?;
                }
                PageKind::Dashboard => {
                    info!(record_id, "direct navigation keeps landing on the dashboard; falling back to the listing");
                    self.driver.navigate(&tab, &self.config.urls.listing).await?;
                    self.tabs.promote_to_listing_tab(tab);
                    return self.open_record_from_listing(record_id).await;
                }
                PageKind::Challenge => {
                    info!(record_id, "challenge interposed during record navigation; waiting");
                    self.wait_out_challenge(&tab).await?;
                    // Loop re-classifies wherever the wait landed.
                }
                PageKind::Login => {
                    return Err(NavigationError::SessionExpired(format!(
                        "redirected to login while opening record {record_id}"
                    )));
                }
                PageKind::Record(_) | PageKind::Listing | PageKind::Other(_) => {
                    return Err(NavigationError::AmbiguousRedirect { location });
                }
            }
        }
    }

    /// Open a record through its link in the listing. Clicking the link
    /// may navigate in place or open a new tab; either way success is
    /// verified by a record-detail tab for this id existing, and only the
    /// verified tab is promoted.
    async fn open_record_from_listing(
        &mut self,
        record_id: &str,
    ) -> Result<TabHandle, NavigationError> {
        let listing = self.tabs.listing_tab().await?;
        let link = self.config.elements.record_link(record_id);
        let record_url = self.config.urls.record_url(record_id);
        let verify = self.record_open_verifier(record_id);

        let strategies: Vec<Box<dyn ActionStrategy>> = vec![
            self.click_strategy("click-record-link", &listing, &link, &verify),
            // The listing's link handler can silently drop the click;
            // opening the record URL in a fresh tab is an independent path
            // to the same outcome.
            {
                let driver = Arc::clone(&self.driver);
                let url = record_url.clone();
                FnStrategy::boxed(
                    "open-record-url",
                    move || {
                        let driver = Arc::clone(&driver);
                        let url = url.clone();
                        async move {
                            driver.open_tab(&url).await?;
                            Ok(())
                        }
                        .boxed()
                    },
                    verify.clone_fn(),
                )
            },
        ];

        self.executor
            .execute(
                "open record",
                &strategies,
                self.config.timing.action_timeout(),
            )
            .await
            .into_result("open record")?;

        match find_record_tab(
            &self.driver,
            &self.classifier,
            &self.config.elements.record_marker,
            record_id,
        )
        .await?
        {
            Some(tab) => Ok(tab),
            None => Err(NavigationError::ResourceUnavailable(format!(
                "record tab for {record_id} verified but not found"
            ))),
        }
    }

    /// Pick the record id for this run from the rendered listing index.
    async fn choose_record(&mut self, mode: &RunMode) -> Result<String, NavigationError> {
        let listing = self.tabs.listing_tab().await?;
        let ids = self.read_record_index(&listing).await?;
        if ids.is_empty() {
            return Err(NavigationError::ResourceUnavailable(
                "listing shows no records".into(),
            ));
        }

        let current = { self.state.lock().await.current_record_id.clone() };
        let chosen = match mode {
            RunMode::NextCase => {
                match current.and_then(|c| ids.iter().position(|id| *id == c)) {
                    // Wraps to the top once the last record is done.
                    Some(pos) => ids.get(pos + 1).or_else(|| ids.first()),
                    None => ids.first(),
                }
            }
            _ => ids.first(),
        };
        chosen.cloned().ok_or_else(|| {
            NavigationError::ResourceUnavailable("listing shows no records".into())
        })
    }

    async fn read_record_index(&self, tab: &TabHandle) -> Result<Vec<String>, NavigationError> {
        let description = self.config.elements.record_id_index.clone();
        let element = self.locate_with_retries(tab, &description).await?;
        let text = self.driver.read_text(&element).await?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn apply_listing_sort(&mut self, tab: &TabHandle) -> Result<(), NavigationError> {
        let Some(sort_control) = self.config.elements.sort_control.clone() else {
            return Ok(());
        };

        let verify: VerifierFn = match self.config.elements.sort_applied_marker.clone() {
            Some(marker) => self.presence_verifier(tab, &marker),
            // No marker to check; the settle delay is all we have.
            None => VerifierFn::always_true(),
        };

        let strategies: Vec<Box<dyn ActionStrategy>> = vec![
            self.click_strategy("click-sort-control", tab, &sort_control, &verify),
            self.refocus_click_strategy("refocus-and-sort", tab, &sort_control, &verify),
        ];

        self.executor
            .execute(
                "apply listing sort",
                &strategies,
                self.config.timing.action_timeout(),
            )
            .await
            .into_result("apply listing sort")?;
        Ok(())
    }

    /// Bounded external wait for a human to complete the multi-factor
    /// challenge. Polls the tab location; exceeding the ceiling is a hard
    /// failure, never an infinite retry. Returns the location the wait
    /// landed on.
    async fn wait_out_challenge(&self, tab: &TabHandle) -> Result<String, NavigationError> {
        let interval = self.config.timing.challenge_poll();
        let max_polls = self.config.timing.challenge_max_polls;

        for poll in 1..=max_polls {
            tokio::time::sleep(interval).await;
            let location = self.driver.current_location(tab).await?;
            if !matches!(self.classifier.classify(&location), PageKind::Challenge) {
                info!(poll, %location, "challenge cleared");
                return Ok(location);
            }
            debug!(poll, max_polls, "still on the challenge page");
        }

        Err(NavigationError::ChallengeTimeout {
            waited: interval * max_polls,
        })
    }

    async fn mark_authenticated(&self) {
        let mut st = self.state.lock().await;
        st.is_authenticated = true;
    }

    /// The only tab during the pre-listing phase (login/dashboard).
    async fn sole_tab(&self) -> Result<TabHandle, NavigationError> {
        let tabs = self.driver.tabs().await?;
        tabs.into_iter().next().ok_or_else(|| {
            NavigationError::ResourceUnavailable("no browser tabs are open".into())
        })
    }

    async fn locate_with_retries(
        &self,
        tab: &TabHandle,
        description: &str,
    ) -> Result<crate::driver::ElementRef, NavigationError> {
        let mut last = String::new();
        for _ in 0..=self.config.timing.resource_retries {
            match self.driver.locate(tab, description).await {
                Ok(element) => return Ok(element),
                Err(DriverError::ElementNotFound(msg)) => {
                    last = msg;
                    tokio::time::sleep(self.config.timing.settle_delay()).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(NavigationError::ResourceUnavailable(format!(
            "element '{description}' not found after {} retries: {last}",
            self.config.timing.resource_retries
        )))
    }

    async fn observed_url(&self) -> Option<String> {
        let tab = if let Some(tab) = self.tabs.peek_record_tab() {
            tab.clone()
        } else if let Some(tab) = self.tabs.peek_listing_tab() {
            tab.clone()
        } else {
            self.driver.tabs().await.ok()?.into_iter().next()?
        };
        self.driver.current_location(&tab).await.ok()
    }

    // Strategy builders. Each closure clones its own driver handle so the
    // boxed futures stay 'static.

    fn click_strategy(
        &self,
        name: &str,
        tab: &TabHandle,
        description: &str,
        verify: &VerifierFn,
    ) -> Box<dyn ActionStrategy> {
        let driver = Arc::clone(&self.driver);
        let tab = tab.clone();
        let description = description.to_string();
        FnStrategy::boxed(
            name,
            move || {
                let driver = Arc::clone(&driver);
                let tab = tab.clone();
                let description = description.clone();
                async move {
                    let element = driver.locate(&tab, &description).await?;
                    driver.click(&element).await?;
                    Ok(())
                }
                .boxed()
            },
            verify.clone_fn(),
        )
    }

    fn refocus_click_strategy(
        &self,
        name: &str,
        tab: &TabHandle,
        description: &str,
        verify: &VerifierFn,
    ) -> Box<dyn ActionStrategy> {
        let driver = Arc::clone(&self.driver);
        let tab = tab.clone();
        let description = description.to_string();
        FnStrategy::boxed(
            name,
            move || {
                let driver = Arc::clone(&driver);
                let tab = tab.clone();
                let description = description.clone();
                async move {
                    driver.focus(&tab).await?;
                    let element = driver.locate(&tab, &description).await?;
                    driver.click(&element).await?;
                    Ok(())
                }
                .boxed()
            },
            verify.clone_fn(),
        )
    }

    fn type_strategy(
        &self,
        name: &str,
        tab: &TabHandle,
        description: &str,
        text: &str,
        verify: &VerifierFn,
    ) -> Box<dyn ActionStrategy> {
        let driver = Arc::clone(&self.driver);
        let tab = tab.clone();
        let description = description.to_string();
        let text = text.to_string();
        FnStrategy::boxed(
            name,
            move || {
                let driver = Arc::clone(&driver);
                let tab = tab.clone();
                let description = description.clone();
                let text = text.clone();
                async move {
                    let element = driver.locate(&tab, &description).await?;
                    driver.type_text(&element, &text).await?;
                    Ok(())
                }
                .boxed()
            },
            verify.clone_fn(),
        )
    }

    fn absence_verifier(&self, tab: &TabHandle, description: &str) -> VerifierFn {
        let driver = Arc::clone(&self.driver);
        let tab = tab.clone();
        let description = description.to_string();
        let timeout = self.config.timing.action_timeout();
        VerifierFn::new(move || {
            let driver = Arc::clone(&driver);
            let tab = tab.clone();
            let description = description.clone();
            async move {
                let held = driver
                    .wait_for(&tab, &WaitCondition::ElementAbsent(description), timeout)
                    .await?;
                Ok(held)
            }
            .boxed()
        })
    }

    fn presence_verifier(&self, tab: &TabHandle, description: &str) -> VerifierFn {
        let driver = Arc::clone(&self.driver);
        let tab = tab.clone();
        let description = description.to_string();
        let timeout = self.config.timing.action_timeout();
        VerifierFn::new(move || {
            let driver = Arc::clone(&driver);
            let tab = tab.clone();
            let description = description.clone();
            async move {
                let held = driver
                    .wait_for(&tab, &WaitCondition::ElementPresent(description), timeout)
                    .await?;
                Ok(held)
            }
            .boxed()
        })
    }

    fn record_open_verifier(&self, record_id: &str) -> VerifierFn {
        let driver = Arc::clone(&self.driver);
        let classifier = self.classifier.clone();
        let marker = self.config.elements.record_marker.clone();
        let record_id = record_id.to_string();
        VerifierFn::new(move || {
            let driver = Arc::clone(&driver);
            let classifier = classifier.clone();
            let marker = marker.clone();
            let record_id = record_id.clone();
            async move {
                let found = find_record_tab(&driver, &classifier, &marker, &record_id).await?;
                Ok(found.is_some())
            }
            .boxed()
        })
    }
}

/// Scan the open tabs for a confirmed record-detail tab for this id.
async fn find_record_tab(
    driver: &Arc<dyn RemoteUIDriver>,
    classifier: &LocationClassifier,
    marker: &str,
    record_id: &str,
) -> Result<Option<TabHandle>, NavigationError> {
    for tab in driver.tabs().await? {
        let Ok(location) = driver.current_location(&tab).await else {
            continue;
        };
        if let PageKind::Record(found) = classifier.classify(&location) {
            if found == record_id && driver.exists(&tab, marker).await.unwrap_or(false) {
                return Ok(Some(tab));
            }
        }
    }
    Ok(None)
}

type VerifierClosure = Arc<
    dyn Fn() -> futures::future::BoxFuture<'static, Result<bool, NavigationError>> + Send + Sync,
>;

/// A reusable verification closure, shared across the strategies of one
/// action (they attempt differently but all verify the same effect).
pub struct VerifierFn {
    inner: VerifierClosure,
}

impl VerifierFn {
    pub fn new(
        f: impl Fn() -> futures::future::BoxFuture<'static, Result<bool, NavigationError>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self { inner: Arc::new(f) }
    }

    pub fn always_true() -> Self {
        Self::new(|| async { Ok(true) }.boxed())
    }

    /// A fresh closure over the same verification, for handing to a
    /// [`FnStrategy`].
    pub fn clone_fn(
        &self,
    ) -> impl Fn() -> futures::future::BoxFuture<'static, Result<bool, NavigationError>>
           + Send
           + Sync
           + 'static {
        let inner = Arc::clone(&self.inner);
        move || (inner)()
    }
}
