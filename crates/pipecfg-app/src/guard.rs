// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Delete guard: a record is only deleted after the operator has seen which
//! other records reference it and confirmed.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::{
    ApiError, CheckToken, CoreError, CoreResult, DeleteReference, DeleteToken, EntityApi,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteImpact {
    pub description: String,
    pub referencing_ids: Vec<String>,
}

/// Pre-delete references grouped by referencing type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteImpactReport {
    entries: BTreeMap<String, DeleteImpact>,
}

impl DeleteImpactReport {
    /// Groups references by type. Each group's description is the action of
    /// the last reference of that type; ids keep arrival order.
    pub fn from_references<I>(references: I) -> Self
    where
        I: IntoIterator<Item = DeleteReference>,
    {
        let mut entries: BTreeMap<String, DeleteImpact> = BTreeMap::new();
        for reference in references {
            let entry = entries.entry(reference.referencing_type).or_default();
            entry.description = reference.action;
            entry.referencing_ids.push(reference.referencing_object_id);
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, referencing_type: &str) -> Option<&DeleteImpact> {
        self.entries.get(referencing_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeleteImpact)> {
        self.entries
            .iter()
            .map(|(referencing_type, impact)| (referencing_type.as_str(), impact))
    }

    pub fn reference_count(&self) -> usize {
        self.entries
            .values()
            .map(|impact| impact.referencing_ids.len())
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPhase {
    Idle,
    Checking,
    ReportReady,
    Deleting,
}

impl GuardPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::ReportReady => "report ready",
            Self::Deleting => "deleting",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GuardState {
    Idle,
    Checking { id: String, token: CheckToken },
    ReportReady { id: String, report: DeleteImpactReport },
    Deleting { id: String, token: DeleteToken },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Ready {
        id: String,
        report: DeleteImpactReport,
    },
    /// The check was cancelled or superseded before its answer arrived.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The caller should reload the table.
    Deleted { id: String },
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteGuard {
    state: GuardState,
    last_check: CheckToken,
    last_delete: DeleteToken,
}

impl Default for DeleteGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl DeleteGuard {
    pub fn new() -> Self {
        Self {
            state: GuardState::Idle,
            last_check: CheckToken::default(),
            last_delete: DeleteToken::default(),
        }
    }

    pub fn phase(&self) -> GuardPhase {
        match self.state {
            GuardState::Idle => GuardPhase::Idle,
            GuardState::Checking { .. } => GuardPhase::Checking,
            GuardState::ReportReady { .. } => GuardPhase::ReportReady,
            GuardState::Deleting { .. } => GuardPhase::Deleting,
        }
    }

    pub fn pending_id(&self) -> Option<&str> {
        match &self.state {
            GuardState::Idle => None,
            GuardState::Checking { id, .. }
            | GuardState::ReportReady { id, .. }
            | GuardState::Deleting { id, .. } => Some(id),
        }
    }

    pub fn report(&self) -> Option<&DeleteImpactReport> {
        match &self.state {
            GuardState::ReportReady { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Starts a pre-delete check. Re-checking the pending id refreshes it;
    /// any other id is rejected until the pending one is resolved.
    pub fn begin_check(&mut self, id: &str) -> CoreResult<CheckToken> {
        match &self.state {
            GuardState::Idle => {}
            GuardState::Checking { id: pending, .. }
            | GuardState::ReportReady { id: pending, .. }
                if pending == id => {}
            GuardState::Checking { id: pending, .. }
            | GuardState::ReportReady { id: pending, .. }
            | GuardState::Deleting { id: pending, .. } => {
                return Err(CoreError::GuardBusy {
                    pending: pending.clone(),
                    requested: id.to_owned(),
                });
            }
        }

        self.last_check = self.last_check.next();
        self.state = GuardState::Checking {
            id: id.to_owned(),
            token: self.last_check,
        };
        debug!(id, token = self.last_check.get(), "delete check issued");
        Ok(self.last_check)
    }

    pub fn finish_check(
        &mut self,
        token: CheckToken,
        result: Result<Vec<DeleteReference>, ApiError>,
    ) -> CoreResult<CheckOutcome> {
        let id = match &self.state {
            GuardState::Checking { id, token: current } if *current == token => id.clone(),
            _ => {
                warn!(token = token.get(), "discarding delete check answer with no waiting check");
                return Ok(CheckOutcome::Discarded);
            }
        };

        match result {
            Ok(references) => {
                let report = DeleteImpactReport::from_references(references);
                debug!(
                    id = id.as_str(),
                    types = report.len(),
                    references = report.reference_count(),
                    "delete report ready"
                );
                self.state = GuardState::ReportReady {
                    id: id.clone(),
                    report: report.clone(),
                };
                Ok(CheckOutcome::Ready { id, report })
            }
            Err(error) => {
                warn!(id = id.as_str(), %error, "delete check failed");
                self.state = GuardState::Idle;
                Err(CoreError::Api(error))
            }
        }
    }

    /// Confirms the pending report for `id` and starts the delete.
    pub fn begin_delete(&mut self, id: &str) -> CoreResult<DeleteToken> {
        match &self.state {
            GuardState::ReportReady { id: pending, .. } if pending == id => {}
            GuardState::ReportReady { id: pending, .. } => {
                return Err(CoreError::GuardBusy {
                    pending: pending.clone(),
                    requested: id.to_owned(),
                });
            }
            _ => {
                return Err(CoreError::InvalidState {
                    operation: "confirm delete",
                    state: self.phase().as_str(),
                });
            }
        }

        self.last_delete = self.last_delete.next();
        self.state = GuardState::Deleting {
            id: id.to_owned(),
            token: self.last_delete,
        };
        debug!(id, token = self.last_delete.get(), "delete issued");
        Ok(self.last_delete)
    }

    pub fn finish_delete(
        &mut self,
        token: DeleteToken,
        result: Result<(), ApiError>,
    ) -> CoreResult<DeleteOutcome> {
        let id = match &self.state {
            GuardState::Deleting { id, token: current } if *current == token => id.clone(),
            _ => {
                warn!(token = token.get(), "discarding delete answer with no waiting delete");
                return Ok(DeleteOutcome::Discarded);
            }
        };

        self.state = GuardState::Idle;
        match result {
            Ok(()) => {
                debug!(id = id.as_str(), "record deleted");
                Ok(DeleteOutcome::Deleted { id })
            }
            Err(error) => {
                warn!(id = id.as_str(), %error, "delete failed");
                Err(CoreError::Api(error))
            }
        }
    }

    /// Drops the pending report, or the in-flight check whose answer will
    /// then be discarded on arrival. Returns the id that was pending.
    pub fn cancel(&mut self) -> CoreResult<String> {
        match std::mem::replace(&mut self.state, GuardState::Idle) {
            GuardState::ReportReady { id, .. } | GuardState::Checking { id, .. } => {
                debug!(id = id.as_str(), "delete cancelled");
                Ok(id)
            }
            other => {
                self.state = other;
                Err(CoreError::InvalidState {
                    operation: "cancel delete",
                    state: self.phase().as_str(),
                })
            }
        }
    }

    /// Runs a check against `api` on the current thread.
    pub fn check_deletion<A>(&mut self, api: &A, id: &str) -> CoreResult<DeleteImpactReport>
    where
        A: EntityApi + ?Sized,
    {
        let token = self.begin_check(id)?;
        match self.finish_check(token, api.check_delete(id))? {
            CheckOutcome::Ready { report, .. } => Ok(report),
            CheckOutcome::Discarded => Err(CoreError::InvalidState {
                operation: "check deletion",
                state: self.phase().as_str(),
            }),
        }
    }

    /// Runs a confirmed delete against `api` on the current thread.
    pub fn confirm_delete<A>(&mut self, api: &A, id: &str) -> CoreResult<DeleteOutcome>
    where
        A: EntityApi + ?Sized,
    {
        let token = self.begin_delete(id)?;
        self.finish_delete(token, api.delete(id))
    }
}

#[cfg(test)]
mod tests {
    use super::{CheckOutcome, DeleteGuard, DeleteImpactReport, DeleteOutcome, GuardPhase};
    use crate::{
        ApiError, ApiResult, CoreError, DeleteReference, EntityApi, EntityKind, Record,
    };
    use anyhow::Result;
    use std::sync::Mutex;

    struct ScriptedApi {
        references: Vec<DeleteReference>,
        delete_error: Option<ApiError>,
        deleted: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        fn new(references: Vec<DeleteReference>) -> Self {
            Self {
                references,
                delete_error: None,
                deleted: Mutex::new(Vec::new()),
            }
        }

        fn deleted(&self) -> Vec<String> {
            self.deleted.lock().map(|ids| ids.clone()).unwrap_or_default()
        }
    }

    impl EntityApi for ScriptedApi {
        fn kind(&self) -> EntityKind {
            EntityKind::Device
        }

        fn list(&self, _filter: Option<&str>) -> ApiResult<Vec<Record>> {
            Ok(Vec::new())
        }

        fn get_by_id(&self, id: &str) -> ApiResult<Record> {
            Err(ApiError::NotFound(id.to_owned()))
        }

        fn create(&self, record: &Record) -> ApiResult<Record> {
            Ok(record.clone())
        }

        fn update(&self, _id: &str, record: &Record) -> ApiResult<Record> {
            Ok(record.clone())
        }

        fn delete(&self, id: &str) -> ApiResult<()> {
            if let Some(error) = &self.delete_error {
                return Err(error.clone());
            }
            if let Ok(mut deleted) = self.deleted.lock() {
                deleted.push(id.to_owned());
            }
            Ok(())
        }

        fn check_delete(&self, _id: &str) -> ApiResult<Vec<DeleteReference>> {
            Ok(self.references.clone())
        }
    }

    fn metric_references() -> Vec<DeleteReference> {
        vec![
            DeleteReference::new("metric", "m1", "will be unlinked"),
            DeleteReference::new("metric", "m2", "will be deleted"),
        ]
    }

    #[test]
    fn report_keeps_last_action_per_type() -> Result<()> {
        let mut guard = DeleteGuard::new();
        let api = ScriptedApi::new(metric_references());

        let report = guard.check_deletion(&api, "dev1")?;
        assert_eq!(report.len(), 1);
        let metric = report.get("metric").expect("metric group");
        assert_eq!(metric.description, "will be deleted");
        assert_eq!(metric.referencing_ids, vec!["m1", "m2"]);
        assert_eq!(guard.phase(), GuardPhase::ReportReady);
        Ok(())
    }

    #[test]
    fn report_groups_each_referencing_type() {
        let report = DeleteImpactReport::from_references(vec![
            DeleteReference::new("A", "a1", "first"),
            DeleteReference::new("B", "b1", "only"),
            DeleteReference::new("A", "a2", "second"),
        ]);

        assert_eq!(report.len(), 2);
        assert_eq!(report.reference_count(), 3);
        let a = report.get("A").expect("group A");
        assert_eq!(a.referencing_ids, vec!["a1", "a2"]);
        assert_eq!(a.description, "second");
        let b = report.get("B").expect("group B");
        assert_eq!(b.referencing_ids, vec!["b1"]);
        assert_eq!(b.description, "only");
    }

    #[test]
    fn empty_answer_yields_empty_report() -> Result<()> {
        let mut guard = DeleteGuard::new();
        let report = guard.check_deletion(&ScriptedApi::new(Vec::new()), "dev1")?;
        assert!(report.is_empty());
        Ok(())
    }

    #[test]
    fn confirmed_delete_returns_to_idle_and_requests_reload() -> Result<()> {
        let mut guard = DeleteGuard::new();
        let api = ScriptedApi::new(metric_references());

        guard.check_deletion(&api, "dev1")?;
        let outcome = guard.confirm_delete(&api, "dev1")?;

        assert_eq!(
            outcome,
            DeleteOutcome::Deleted {
                id: "dev1".to_owned()
            }
        );
        assert_eq!(guard.phase(), GuardPhase::Idle);
        assert_eq!(api.deleted(), vec!["dev1"]);
        Ok(())
    }

    #[test]
    fn confirm_without_report_is_rejected_without_calling_delete() {
        let mut guard = DeleteGuard::new();
        let api = ScriptedApi::new(Vec::new());

        let error = guard
            .confirm_delete(&api, "dev1")
            .expect_err("no report yet");
        assert!(matches!(error, CoreError::InvalidState { .. }));
        assert!(api.deleted().is_empty());
    }

    #[test]
    fn failed_delete_returns_to_idle_with_error() -> Result<()> {
        let mut guard = DeleteGuard::new();
        let mut api = ScriptedApi::new(Vec::new());
        api.delete_error = Some(ApiError::Conflict("in use".to_owned()));

        guard.check_deletion(&api, "dev1")?;
        let error = guard
            .confirm_delete(&api, "dev1")
            .expect_err("conflict surfaces");

        assert_eq!(error, CoreError::Api(ApiError::Conflict("in use".to_owned())));
        assert_eq!(guard.phase(), GuardPhase::Idle);
        Ok(())
    }

    #[test]
    fn failed_check_returns_to_idle() -> Result<()> {
        let mut guard = DeleteGuard::new();
        let token = guard.begin_check("dev1")?;

        let error = guard
            .finish_check(token, Err(ApiError::Network("session expired".to_owned())))
            .expect_err("network failure surfaces");

        assert!(matches!(error, CoreError::Api(ApiError::Network(_))));
        assert_eq!(guard.phase(), GuardPhase::Idle);
        guard.begin_check("dev2")?;
        Ok(())
    }

    #[test]
    fn second_id_is_rejected_while_check_pending() -> Result<()> {
        let mut guard = DeleteGuard::new();
        guard.begin_check("dev1")?;

        let busy = guard.begin_check("dev2").expect_err("guard is busy");
        assert_eq!(
            busy,
            CoreError::GuardBusy {
                pending: "dev1".to_owned(),
                requested: "dev2".to_owned(),
            }
        );

        let token = guard.begin_check("dev1")?;
        guard.finish_check(token, Ok(Vec::new()))?;
        assert!(guard.begin_check("dev2").is_err());
        Ok(())
    }

    #[test]
    fn recheck_of_same_id_replaces_report() -> Result<()> {
        let mut guard = DeleteGuard::new();
        let first = guard.begin_check("dev1")?;
        guard.finish_check(first, Ok(metric_references()))?;

        let second = guard.begin_check("dev1")?;
        let outcome = guard.finish_check(
            second,
            Ok(vec![DeleteReference::new("group", "g1", "delete group from device")]),
        )?;

        let CheckOutcome::Ready { report, .. } = outcome else {
            panic!("expected a fresh report");
        };
        assert!(report.get("metric").is_none());
        assert_eq!(report.get("group").map(|g| g.referencing_ids.len()), Some(1));
        assert_eq!(guard.report(), Some(&report));
        Ok(())
    }

    #[test]
    fn superseded_check_answer_is_discarded() -> Result<()> {
        let mut guard = DeleteGuard::new();
        let first = guard.begin_check("dev1")?;
        let second = guard.begin_check("dev1")?;

        assert_eq!(
            guard.finish_check(first, Ok(metric_references()))?,
            CheckOutcome::Discarded
        );
        assert_eq!(guard.phase(), GuardPhase::Checking);
        guard.finish_check(second, Ok(Vec::new()))?;
        assert_eq!(guard.report().map(DeleteImpactReport::len), Some(0));
        Ok(())
    }

    #[test]
    fn cancel_discards_report_without_deleting() -> Result<()> {
        let mut guard = DeleteGuard::new();
        let api = ScriptedApi::new(metric_references());
        guard.check_deletion(&api, "dev1")?;

        assert_eq!(guard.cancel()?, "dev1");
        assert_eq!(guard.phase(), GuardPhase::Idle);
        assert!(guard.report().is_none());
        assert!(api.deleted().is_empty());
        assert!(matches!(
            guard.cancel(),
            Err(CoreError::InvalidState { .. })
        ));
        Ok(())
    }

    #[test]
    fn check_resolving_after_cancel_is_ignored() -> Result<()> {
        let mut guard = DeleteGuard::new();
        let token = guard.begin_check("dev1")?;
        guard.cancel()?;

        let outcome = guard.finish_check(token, Ok(metric_references()))?;
        assert_eq!(outcome, CheckOutcome::Discarded);
        assert_eq!(guard.phase(), GuardPhase::Idle);
        Ok(())
    }

    #[test]
    fn confirm_for_other_id_is_busy() -> Result<()> {
        let mut guard = DeleteGuard::new();
        let token = guard.begin_check("dev1")?;
        guard.finish_check(token, Ok(Vec::new()))?;

        assert!(matches!(
            guard.begin_delete("dev2"),
            Err(CoreError::GuardBusy { .. })
        ));
        assert_eq!(guard.phase(), GuardPhase::ReportReady);
        Ok(())
    }
}
