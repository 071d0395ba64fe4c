use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::checkpoint::{CheckpointStore, RunMode, RunState};
use crate::config::SweepConfig;
use crate::element::PageElement;
use crate::errors::SweepError;
use crate::runner::ActionRunner;
use crate::Page;

/// Where the orchestrator currently is in a run's lifecycle.
///
/// Owned privately and exposed only through accessors; call sites never
/// branch on raw booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Confirming,
    Running,
    Stopping,
    Done,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The work queue was exhausted.
    Completed,
    /// There was nothing eligible to delete in the first place.
    NothingToDo,
    /// The user stopped the run; the in-flight item finished first.
    Stopped,
    /// Too many consecutive item failures; the page has likely changed
    /// incompatibly.
    Aborted,
}

/// Terminal report of a run, emitted for every ending including a
/// zero-result one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub deleted: u32,
    pub errors: u32,
    pub outcome: RunOutcome,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            RunOutcome::NothingToDo => write!(f, "No entities found to delete"),
            RunOutcome::Completed => write!(
                f,
                "Deletion complete. Deleted: {}, Errors: {}",
                self.deleted, self.errors
            ),
            RunOutcome::Stopped => write!(
                f,
                "Deletion stopped by user. Deleted: {}, Errors: {}",
                self.deleted, self.errors
            ),
            RunOutcome::Aborted => write!(
                f,
                "Deletion aborted after repeated errors. Deleted: {}, Errors: {}",
                self.deleted, self.errors
            ),
        }
    }
}

/// What one entry into the orchestrator produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTurn {
    /// The run ended; the checkpoint is cleared.
    Finished(RunSummary),
    /// The run persisted its state and requested a page reload; it continues
    /// through [`Orchestrator::resume_on_load`] on the next page generation.
    Suspended,
    /// The confirmation gate declined; nothing was started or persisted.
    Declined,
}

/// A run about to start, handed to the [`ConfirmGate`] for approval.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub mode: RunMode,
    /// Entities that would be affected, for display in the prompt.
    pub count: usize,
}

/// Decides whether a requested run proceeds.
///
/// Implementations own the presentation: a modal dialog, a cancellable
/// countdown, or both. The orchestrator stays in `Confirming` until the gate
/// answers.
#[async_trait]
pub trait ConfirmGate: Send + Sync {
    async fn confirm(&self, request: &RunRequest) -> bool;
}

/// Gate that approves every run; the default, and what tests use.
pub struct AutoConfirm;

#[async_trait]
impl ConfirmGate for AutoConfirm {
    async fn confirm(&self, _request: &RunRequest) -> bool {
        true
    }
}

/// Receives progress ticks and the terminal summary.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, processed: u32, total: u32);
    fn on_summary(&self, summary: &RunSummary);
}

/// Default sink: structured log lines.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&self, processed: u32, total: u32) {
        info!(processed, total, "bulk delete progress");
    }

    fn on_summary(&self, summary: &RunSummary) {
        info!(
            deleted = summary.deleted,
            errors = summary.errors,
            outcome = ?summary.outcome,
            "bulk delete finished"
        );
    }
}

/// Drives bulk deletion runs over a [`Page`]: starts them behind a
/// confirmation gate, advances the work queue item by item, checkpoints
/// after every outcome and resumes pending runs on page load.
///
/// The orchestrator is the sole writer of the persisted [`RunState`] and of
/// the in-memory phase; at most one run is active at a time.
pub struct Orchestrator {
    page: Page,
    runner: ActionRunner,
    checkpoint: CheckpointStore,
    config: SweepConfig,
    gate: Arc<dyn ConfirmGate>,
    progress: Arc<dyn ProgressSink>,
    phase: Mutex<Phase>,
    stop_requested: AtomicBool,
}

impl Orchestrator {
    pub fn new(page: Page, checkpoint: CheckpointStore, config: SweepConfig) -> Self {
        let runner = ActionRunner::new(page.clone(), config.clone());
        Self {
            page,
            runner,
            checkpoint,
            config,
            gate: Arc::new(AutoConfirm),
            progress: Arc::new(LogProgress),
            phase: Mutex::new(Phase::Idle),
            stop_requested: AtomicBool::new(false),
        }
    }

    pub fn with_confirm_gate(mut self, gate: Arc<dyn ConfirmGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_progress_sink(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Install the user-facing controls into the page chrome.
    ///
    /// Safe to call any number of times, from a background observer included;
    /// repeated calls are no-ops and never touch persisted state.
    pub fn setup(&self) -> bool {
        self.page.install_controls()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap()
    }

    /// Whether a run currently owns the page (confirming, running or
    /// winding down).
    pub fn is_running(&self) -> bool {
        matches!(
            self.phase(),
            Phase::Confirming | Phase::Running | Phase::Stopping
        )
    }

    /// Cooperative stop: the in-flight item finishes, the next one never
    /// starts, and the reload that would resume the run is suppressed.
    pub fn request_stop(&self) {
        let mut phase = self.phase.lock().unwrap();
        if *phase == Phase::Running {
            *phase = Phase::Stopping;
            self.stop_requested.store(true, Ordering::SeqCst);
            info!("stop requested; finishing the in-flight item");
        }
    }

    /// Start a run over every eligible entity in the live list.
    ///
    /// The list is re-queried each step, so entities added or removed by the
    /// page mid-run are picked up naturally.
    #[instrument(level = "info", skip(self))]
    pub async fn start_all(&self) -> Result<RunTurn, SweepError> {
        self.guard_not_running()?;

        // Host check happens before any item is attempted.
        let eligible = self.eligible_candidates()?;
        if eligible.is_empty() {
            info!("no deletable entities found");
            return Ok(self.finish(0, 0, RunOutcome::NothingToDo));
        }

        self.set_phase(Phase::Confirming);
        let request = RunRequest {
            mode: RunMode::All,
            count: eligible.len(),
        };
        if !self.gate.confirm(&request).await {
            info!("run declined at confirmation");
            self.set_phase(Phase::Idle);
            return Ok(RunTurn::Declined);
        }

        let state = RunState::new_all(eligible.len() as u32);
        self.checkpoint.save(&state);
        self.stop_requested.store(false, Ordering::SeqCst);
        self.set_phase(Phase::Running);
        info!(total = state.total, "starting bulk delete of all entities");
        Ok(self.run_all_turn(state).await)
    }

    /// Start a run over an explicit selection of durable identifiers.
    ///
    /// The selection is snapshotted now; protected entities and identifiers
    /// that do not resolve are left out. The queue only ever shrinks after
    /// this point.
    #[instrument(level = "info", skip(self, ids))]
    pub async fn start_selected(&self, ids: Vec<String>) -> Result<RunTurn, SweepError> {
        self.guard_not_running()?;
        self.page.host_root()?;

        let mut remaining = Vec::new();
        for id in ids {
            match self.page.find_by_durable_id(&id) {
                Ok(el) if self.page.is_protected(&el) => {
                    info!(id = %id, "selected entity is protected, leaving it out");
                }
                Ok(_) => remaining.push(id),
                Err(e) => {
                    warn!(id = %id, error = %e, "selected entity did not resolve, leaving it out");
                }
            }
        }
        if remaining.is_empty() {
            info!("selection contains nothing deletable");
            return Ok(self.finish(0, 0, RunOutcome::NothingToDo));
        }

        self.set_phase(Phase::Confirming);
        let request = RunRequest {
            mode: RunMode::Selected,
            count: remaining.len(),
        };
        if !self.gate.confirm(&request).await {
            info!("run declined at confirmation");
            self.set_phase(Phase::Idle);
            return Ok(RunTurn::Declined);
        }

        let state = RunState::new_selected(remaining);
        self.checkpoint.save(&state);
        self.stop_requested.store(false, Ordering::SeqCst);
        self.set_phase(Phase::Running);
        info!(total = state.total, "starting bulk delete of selected entities");
        // One item per page generation: kick off with a clean page.
        Ok(self.suspend(&state))
    }

    /// Re-enter a pending run after a page load.
    ///
    /// Returns `Ok(None)` when nothing is pending or a run already owns the
    /// page (a reload racing a user click; the active run wins).
    #[instrument(level = "info", skip(self))]
    pub async fn resume_on_load(&self) -> Result<Option<RunTurn>, SweepError> {
        if self.is_running() {
            return Ok(None);
        }
        let Some(state) = self.checkpoint.load() else {
            return Ok(None);
        };

        self.stop_requested.store(false, Ordering::SeqCst);
        self.set_phase(Phase::Running);
        info!(
            mode = ?state.mode,
            processed = state.processed(),
            total = state.total,
            "resuming bulk delete after page load"
        );
        let turn = match state.mode {
            RunMode::All => self.run_all_turn(state).await,
            RunMode::Selected => self.run_selected_turn(state).await,
        };
        Ok(Some(turn))
    }

    /// Live same-page loop: delete the first eligible entity, re-query,
    /// repeat until the visible list is exhausted or the run ends.
    async fn run_all_turn(&self, mut state: RunState) -> RunTurn {
        let mut processed_this_turn = 0u32;
        let mut skipped_this_turn = 0usize;

        loop {
            if self.stop_requested.load(Ordering::SeqCst) {
                return self.finish(
                    state.success_count,
                    state.failure_count,
                    RunOutcome::Stopped,
                );
            }

            // The page mutates under us; re-query every iteration.
            let eligible = match self.eligible_candidates() {
                Ok(items) => items,
                Err(e) => {
                    warn!(error = %e, "host container lost mid-run, treating list as exhausted");
                    Vec::new()
                }
            };

            // Failed items stay in the page; index past them so each visible
            // entity is attempted at most once per turn.
            let Some(item) = eligible.get(skipped_this_turn) else {
                if processed_this_turn == 0 {
                    let outcome = if state.processed() == 0 {
                        RunOutcome::NothingToDo
                    } else {
                        RunOutcome::Completed
                    };
                    return self.finish(state.success_count, state.failure_count, outcome);
                }
                // More items may be hiding behind this page generation.
                return self.suspend(&state);
            };

            // List growth during a long run revises the denominator upward,
            // keeping processed <= total.
            let unattempted = (eligible.len() - skipped_this_turn) as u32;
            if state.processed() + unattempted > state.total {
                state.total = state.processed() + unattempted;
            }

            match self.runner.delete_item(item).await {
                Ok(()) => state.record_success(),
                Err(e) if e.is_item_failure() => {
                    warn!(error = %e, "item failed");
                    state.record_failure();
                    skipped_this_turn += 1;
                }
                Err(e) => {
                    error!(error = %e, "unexpected error while deleting, counted as item failure");
                    state.record_failure();
                    skipped_this_turn += 1;
                }
            }
            processed_this_turn += 1;
            self.checkpoint.save(&state);
            self.progress.on_progress(state.processed(), state.total);

            if state.consecutive_failures > self.config.max_consecutive_failures {
                error!(
                    failures = state.consecutive_failures,
                    "too many consecutive errors, aborting run"
                );
                return self.finish(
                    state.success_count,
                    state.failure_count,
                    RunOutcome::Aborted,
                );
            }
            if state.consecutive_failures > 0 {
                tokio::time::sleep(self.config.failure_pause).await;
            }
        }
    }

    /// Per-item reload cycle: resolve the head of the queue, process it,
    /// advance the checkpoint, reload.
    async fn run_selected_turn(&self, mut state: RunState) -> RunTurn {
        if self.stop_requested.load(Ordering::SeqCst) {
            return self.finish(
                state.success_count,
                state.failure_count,
                RunOutcome::Stopped,
            );
        }

        let Some(id) = state.remaining.first().cloned() else {
            let outcome = if state.processed() == 0 {
                RunOutcome::NothingToDo
            } else {
                RunOutcome::Completed
            };
            return self.finish(state.success_count, state.failure_count, outcome);
        };

        match self.page.find_by_durable_id(&id) {
            Ok(item) => match self.runner.delete_item(&item).await {
                Ok(()) => state.record_success(),
                Err(e) => {
                    warn!(id = %id, error = %e, "selected item failed");
                    state.record_failure();
                }
            },
            Err(e) => {
                // The entity cannot reasonably reappear; skip and advance.
                warn!(id = %id, error = %e, "selected entity is gone, skipping");
                state.record_failure();
            }
        }

        state.remaining.remove(0);
        self.checkpoint.save(&state);
        self.progress.on_progress(state.processed(), state.total);

        if state.consecutive_failures > self.config.max_consecutive_failures {
            error!(
                failures = state.consecutive_failures,
                "too many consecutive errors, aborting run"
            );
            return self.finish(
                state.success_count,
                state.failure_count,
                RunOutcome::Aborted,
            );
        }
        if self.stop_requested.load(Ordering::SeqCst) {
            return self.finish(
                state.success_count,
                state.failure_count,
                RunOutcome::Stopped,
            );
        }
        if state.remaining.is_empty() {
            return self.finish(
                state.success_count,
                state.failure_count,
                RunOutcome::Completed,
            );
        }
        if state.consecutive_failures > 0 {
            tokio::time::sleep(self.config.failure_pause).await;
        }
        self.suspend(&state)
    }

    /// Both the in-memory phase and the persisted state are consulted; either
    /// alone can miss a reload racing a user click.
    fn guard_not_running(&self) -> Result<(), SweepError> {
        if self.is_running() || self.checkpoint.is_pending() {
            return Err(SweepError::RunInProgress);
        }
        Ok(())
    }

    fn eligible_candidates(&self) -> Result<Vec<PageElement>, SweepError> {
        let host = self.page.host_root()?;
        let items = self.page.query(&self.config.candidates, Some(&host))?;
        Ok(items
            .into_iter()
            .filter(|item| !self.page.is_protected(item))
            .collect())
    }

    fn finish(&self, deleted: u32, errors: u32, outcome: RunOutcome) -> RunTurn {
        self.checkpoint.clear();
        self.set_phase(Phase::Done);
        let summary = RunSummary {
            deleted,
            errors,
            outcome,
        };
        self.progress.on_summary(&summary);
        RunTurn::Finished(summary)
    }

    fn suspend(&self, state: &RunState) -> RunTurn {
        info!(
            processed = state.processed(),
            total = state.total,
            "suspending run for page re-sync"
        );
        self.set_phase(Phase::Idle);
        self.page.reload();
        RunTurn::Suspended
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap() = phase;
    }
}
