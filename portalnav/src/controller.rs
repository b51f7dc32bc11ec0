//! Start/poll-status/stop surface over the state machine.
//!
//! The caller cannot hold a connection open, so a run advances on a
//! background task and communicates through the shared
//! [`NavigationState`] only. Exactly one run may be active at a time:
//! the browser session has a single writer.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::errors::NavigationError;
use crate::state::{NavigationState, RunRequest, StatusSnapshot, Step};
use crate::workflow::NavigationStateMachine;

/// Mid-run input from the caller. Delivered between steps only; an
/// in-flight action always runs to completion or verified failure first.
#[derive(Debug, Clone, Copy)]
enum RunCommand {
    PageChoice(u32),
    Stop,
}

struct ActiveRun {
    run_id: String,
    command_tx: mpsc::UnboundedSender<RunCommand>,
    handle: JoinHandle<()>,
}

pub struct ResumableWorkflowController {
    machine: Arc<Mutex<NavigationStateMachine>>,
    state: Arc<Mutex<NavigationState>>,
    active: Mutex<Option<ActiveRun>>,
}

impl ResumableWorkflowController {
    pub fn new(machine: NavigationStateMachine) -> Self {
        let state = machine.state();
        Self {
            machine: Arc::new(Mutex::new(machine)),
            state,
            active: Mutex::new(None),
        }
    }

    /// Begin a run. Fails fast with `InvalidState` when one is already
    /// active; two runs must never interleave against one browser
    /// session.
    #[instrument(skip(self))]
    pub async fn start(&self, request: RunRequest) -> Result<String, NavigationError> {
        let mut active = self.active.lock().await;
        if let Some(run) = active.as_ref() {
            if !run.handle.is_finished() {
                return Err(NavigationError::InvalidState(format!(
                    "run {} is already active",
                    run.run_id
                )));
            }
        }

        let run_id = Uuid::new_v4().to_string();
        {
            let mut machine = self.machine.lock().await;
            machine.begin_run(&request, &run_id).await;
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.machine),
            Arc::clone(&self.state),
            request,
            command_rx,
        ));

        info!(%run_id, "run started");
        *active = Some(ActiveRun {
            run_id: run_id.clone(),
            command_tx,
            handle,
        });
        Ok(run_id)
    }

    /// Non-blocking snapshot of the run state; safe at any polling
    /// interval.
    pub async fn status(&self) -> StatusSnapshot {
        let active = {
            let active = self.active.lock().await;
            active
                .as_ref()
                .map(|run| !run.handle.is_finished())
                .unwrap_or(false)
        };
        let state = self.state.lock().await;
        StatusSnapshot::project(&state, active)
    }

    /// Deliver the caller's page choice. Only valid while the run is
    /// suspended at `PageSelection`.
    pub async fn submit_page_selection(&self, page: u32) -> Result<(), NavigationError> {
        if page == 0 {
            return Err(NavigationError::InvalidState(
                "page numbers start at 1".into(),
            ));
        }
        {
            let state = self.state.lock().await;
            if state.current_step != Step::PageSelection {
                return Err(NavigationError::InvalidState(format!(
                    "page selection only applies while suspended at PageSelection (currently {:?})",
                    state.current_step
                )));
            }
        }

        let active = self.active.lock().await;
        let Some(run) = active.as_ref().filter(|run| !run.handle.is_finished()) else {
            return Err(NavigationError::InvalidState("no active run".into()));
        };
        run.command_tx
            .send(RunCommand::PageChoice(page))
            .map_err(|_| NavigationError::InvalidState("run is no longer accepting input".into()))
    }

    /// Request a graceful halt. The engine finishes its current atomic
    /// step and then stops, leaving the browser session intact.
    pub async fn stop(&self) {
        let active = self.active.lock().await;
        if let Some(run) = active.as_ref() {
            if !run.handle.is_finished() {
                info!(run_id = %run.run_id, "stop requested");
                let _ = run.command_tx.send(RunCommand::Stop);
                return;
            }
        }
        debug!("stop requested with no active run");
    }
}

/// Advance the state machine until a terminal step, a stop request, or a
/// dropped command channel. The machine lock is held for the whole run;
/// status reads go through the shared state instead.
async fn run_loop(
    machine: Arc<Mutex<NavigationStateMachine>>,
    state: Arc<Mutex<NavigationState>>,
    request: RunRequest,
    mut commands: mpsc::UnboundedReceiver<RunCommand>,
) {
    let mut machine = machine.lock().await;

    loop {
        // Cancellation is checked between steps only.
        let mut stop = false;
        while let Ok(command) = commands.try_recv() {
            match command {
                RunCommand::Stop => stop = true,
                RunCommand::PageChoice(page) => machine.set_page_choice(page),
            }
        }
        if stop {
            info!("run halted between steps");
            break;
        }

        let step = { state.lock().await.current_step };
        if step.is_terminal() {
            debug!(?step, "run reached a terminal step");
            break;
        }

        // Caller-resumed suspension: no timeout, the decision legitimately
        // belongs to a human.
        if step == Step::PageSelection && !machine.has_page_choice() {
            match commands.recv().await {
                Some(RunCommand::PageChoice(page)) => {
                    machine.set_page_choice(page);
                    continue;
                }
                Some(RunCommand::Stop) | None => {
                    info!("run halted while suspended at PageSelection");
                    break;
                }
            }
        }

        let result = machine.advance(&request).await;
        if !result.success {
            warn!(error = ?result.error, "run ended in error");
        }
    }
}
