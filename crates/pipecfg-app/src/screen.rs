// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

use crate::{
    ApiError, ApiResult, CheckOutcome, CheckToken, CoreError, CoreResult, DeleteGuard, DeleteImpactReport,
    DeleteOutcome, DeleteReference, DeleteToken, EntityApi, EntityKind, GuardPhase, PageSize,
    Record, ReloadOutcome, ReloadToken, SortDirection, TableRows, TableView,
};

/// Runs collaborator calls off the screen's thread.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, task: Box<dyn FnOnce() + Send + 'static>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSpawner;

impl TaskSpawner for ThreadSpawner {
    fn spawn(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        thread::spawn(task);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenCommand {
    SetFilter(String),
    SetSort {
        column: Option<String>,
        direction: SortDirection,
    },
    SetPage {
        index: usize,
        size: PageSize,
    },
    Reload,
    CheckDelete(String),
    ConfirmDelete,
    CancelDelete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    ViewChanged,
    ReloadStarted(ReloadToken),
    Reloaded { records: usize },
    ReloadFailed(CoreError),
    CheckStarted { id: String },
    ReportReady { id: String, report: DeleteImpactReport },
    CheckFailed { id: String, error: CoreError },
    DeleteStarted { id: String },
    Deleted { id: String },
    DeleteFailed { id: String, error: CoreError },
    DeleteCancelled { id: String },
    /// A result arrived for a request that was superseded or cancelled.
    StaleResultDiscarded,
}

enum WorkerResult {
    Reload {
        token: ReloadToken,
        result: ApiResult<Vec<Record>>,
    },
    Check {
        token: CheckToken,
        id: String,
        result: ApiResult<Vec<DeleteReference>>,
    },
    Delete {
        token: DeleteToken,
        id: String,
        result: ApiResult<()>,
    },
}

/// One entity list screen: its table view, its delete guard, and the
/// channel collaborator results come back on. Results are only applied when
/// the owner pumps [`EntityScreen::process_events`] or
/// [`EntityScreen::wait_events`].
pub struct EntityScreen {
    api: Arc<dyn EntityApi>,
    spawner: Arc<dyn TaskSpawner>,
    view: TableView<Record>,
    guard: DeleteGuard,
    tx: Sender<WorkerResult>,
    rx: Receiver<WorkerResult>,
    in_flight: usize,
}

impl EntityScreen {
    pub fn new(api: Arc<dyn EntityApi>) -> Self {
        Self::with_spawner(api, Arc::new(ThreadSpawner))
    }

    pub fn with_spawner(api: Arc<dyn EntityApi>, spawner: Arc<dyn TaskSpawner>) -> Self {
        let (tx, rx) = mpsc::channel();
        let view = TableView::new(api.kind().schema().columns());
        Self {
            api,
            spawner,
            view,
            guard: DeleteGuard::new(),
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.api.kind()
    }

    pub fn api(&self) -> &Arc<dyn EntityApi> {
        &self.api
    }

    pub fn view(&self) -> &TableView<Record> {
        &self.view
    }

    pub fn rows(&self) -> TableRows<'_, Record> {
        self.view.compute_view()
    }

    pub fn guard_phase(&self) -> GuardPhase {
        self.guard.phase()
    }

    pub fn pending_report(&self) -> Option<&DeleteImpactReport> {
        self.guard.report()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn dispatch(&mut self, command: ScreenCommand) -> CoreResult<Vec<ScreenEvent>> {
        match command {
            ScreenCommand::SetFilter(filter) => {
                self.view.set_filter_string(filter);
                Ok(vec![ScreenEvent::ViewChanged])
            }
            ScreenCommand::SetSort { column, direction } => {
                self.view.set_sort(column.as_deref(), direction);
                Ok(vec![ScreenEvent::ViewChanged])
            }
            ScreenCommand::SetPage { index, size } => {
                self.view.set_page(index, size)?;
                Ok(vec![ScreenEvent::ViewChanged])
            }
            ScreenCommand::Reload => Ok(vec![self.start_reload()]),
            ScreenCommand::CheckDelete(id) => {
                let token = self.guard.begin_check(&id)?;
                let api = Arc::clone(&self.api);
                let task_id = id.clone();
                let result_id = id.clone();
                self.spawn(
                    move || api.check_delete(&task_id),
                    move |result| WorkerResult::Check {
                        token,
                        id: result_id,
                        result,
                    },
                );
                Ok(vec![ScreenEvent::CheckStarted { id }])
            }
            ScreenCommand::ConfirmDelete => {
                let id = self
                    .guard
                    .pending_id()
                    .map(str::to_owned)
                    .ok_or(CoreError::InvalidState {
                        operation: "confirm delete",
                        state: GuardPhase::Idle.as_str(),
                    })?;
                let token = self.guard.begin_delete(&id)?;
                let api = Arc::clone(&self.api);
                let task_id = id.clone();
                let result_id = id.clone();
                self.spawn(
                    move || api.delete(&task_id),
                    move |result| WorkerResult::Delete {
                        token,
                        id: result_id,
                        result,
                    },
                );
                Ok(vec![ScreenEvent::DeleteStarted { id }])
            }
            ScreenCommand::CancelDelete => {
                let id = self.guard.cancel()?;
                Ok(vec![ScreenEvent::DeleteCancelled { id }])
            }
        }
    }

    /// Applies every result that has already arrived.
    pub fn process_events(&mut self) -> Vec<ScreenEvent> {
        let mut events = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            events.extend(self.apply(result));
        }
        events
    }

    /// Waits up to `timeout` for the next result, then applies it along with
    /// anything else already queued. Empty on timeout.
    pub fn wait_events(&mut self, timeout: Duration) -> Vec<ScreenEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => {
                let mut events = self.apply(result);
                events.extend(self.process_events());
                events
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Vec::new(),
        }
    }

    fn start_reload(&mut self) -> ScreenEvent {
        let token = self.view.begin_reload();
        let api = Arc::clone(&self.api);
        self.spawn(
            move || api.list(None),
            move |result| WorkerResult::Reload { token, result },
        );
        ScreenEvent::ReloadStarted(token)
    }

    /// Runs `call` through the spawner and sends its result back wrapped by
    /// `wrap`. A panicking call is reported as a network failure so the
    /// request is still accounted for.
    fn spawn<T, F, W>(&mut self, call: F, wrap: W)
    where
        F: FnOnce() -> ApiResult<T> + Send + 'static,
        W: FnOnce(ApiResult<T>) -> WorkerResult + Send + 'static,
    {
        let sender = self.tx.clone();
        let kind = self.kind();
        self.in_flight += 1;
        self.spawner.spawn(Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|_| {
                error!(kind = kind.as_str(), "collaborator call panicked");
                Err(ApiError::Network(format!(
                    "{} request failed unexpectedly",
                    kind.as_str()
                )))
            });
            let _ = sender.send(wrap(result));
        }));
    }

    fn apply(&mut self, result: WorkerResult) -> Vec<ScreenEvent> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            WorkerResult::Reload { token, result } => {
                match self.view.finish_reload(token, result) {
                    Ok(ReloadOutcome::Applied { records }) => {
                        vec![ScreenEvent::Reloaded { records }]
                    }
                    Ok(ReloadOutcome::Stale) => vec![ScreenEvent::StaleResultDiscarded],
                    Err(error) => vec![ScreenEvent::ReloadFailed(error)],
                }
            }
            WorkerResult::Check { token, id, result } => {
                match self.guard.finish_check(token, result) {
                    Ok(CheckOutcome::Ready { id, report }) => {
                        vec![ScreenEvent::ReportReady { id, report }]
                    }
                    Ok(CheckOutcome::Discarded) => vec![ScreenEvent::StaleResultDiscarded],
                    Err(error) => vec![ScreenEvent::CheckFailed { id, error }],
                }
            }
            WorkerResult::Delete { token, id, result } => {
                match self.guard.finish_delete(token, result) {
                    Ok(DeleteOutcome::Deleted { id }) => {
                        debug!(kind = self.kind().as_str(), id = id.as_str(), "reloading after delete");
                        vec![ScreenEvent::Deleted { id }, self.start_reload()]
                    }
                    Ok(DeleteOutcome::Discarded) => vec![ScreenEvent::StaleResultDiscarded],
                    Err(error) => vec![ScreenEvent::DeleteFailed { id, error }],
                }
            }
        }
    }
}
