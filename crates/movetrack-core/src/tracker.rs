//! Milestone state machine.
//!
//! `Tracker` owns the progression rules for a move: milestones complete
//! strictly in catalog order, completion is gated on mandatory documents, and
//! every transition commits its milestone change, audit events and alerts in
//! one compare-and-swap write. Notifications go out only after the write
//! succeeds.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::alert::{Alert, AlertPolicy};
use crate::catalog::Catalog;
use crate::config::{Config, NotificationConfig};
use crate::documents::{self, DocumentGate, DocumentStore, MatchPolicy};
use crate::error::{Result, TrackError};
use crate::event::{Event, EventFilter, EventPage, EventSource, History};
use crate::milestone::{Milestone, PlanUpdate};
use crate::moves::{Move, MoveDetail, MoveSummary, NewMove};
use crate::notify::{Audience, Dispatcher, LogNotifier, Notification, Notifier, WebhookNotifier};
use crate::paths;
use crate::sla::SlaCalculator;
use crate::store::{Commit, MoveStore, RedbStore};
use crate::timeline::{SlaReport, Timeline};
use crate::types::{EventCategory, EventKind, MilestoneKind};

/// Largest page the event listing hands out.
pub const MAX_EVENT_PAGE: usize = 200;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    #[serde(rename = "move")]
    pub record: MoveSummary,
    pub milestone: Milestone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub evaluated: usize,
    pub raised: Vec<Alert>,
    /// Moves skipped because another writer got there first.
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

pub struct Tracker {
    catalog: Catalog,
    sla: SlaCalculator,
    alert_policy: AlertPolicy,
    match_policy: MatchPolicy,
    store: Arc<dyn MoveStore>,
    documents: Arc<dyn DocumentStore>,
    notifications: Dispatcher,
}

impl Tracker {
    pub fn new(
        store: Arc<dyn MoveStore>,
        documents: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog: Catalog::default(),
            sla: SlaCalculator::default(),
            alert_policy: AlertPolicy::default(),
            match_policy: MatchPolicy::default(),
            store,
            documents,
            notifications: Dispatcher::spawn(notifier),
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_sla(mut self, sla: SlaCalculator) -> Self {
        self.sla = sla;
        self
    }

    pub fn with_alert_policy(mut self, policy: AlertPolicy) -> Self {
        self.alert_policy = policy;
        self
    }

    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    /// Load `.movetrack/config.yaml` under `root` and wire up the configured
    /// collaborators.
    pub fn open(root: &Path) -> Result<Self> {
        let cfg = Config::load(root)?;
        Self::from_config(root, &cfg)
    }

    pub fn from_config(root: &Path, cfg: &Config) -> Result<Self> {
        let store = Arc::new(RedbStore::open(&paths::db_path(root))?);
        let documents = documents::store_from_config(root, &cfg.documents);
        let notifier: Arc<dyn Notifier> = match &cfg.notifications {
            NotificationConfig::Log => Arc::new(LogNotifier),
            NotificationConfig::Webhook { url, timeout_ms } => Arc::new(WebhookNotifier::new(
                url.clone(),
                Duration::from_millis(*timeout_ms),
            )),
        };
        Ok(Self::new(store, documents, notifier)
            .with_catalog(Catalog::from_config(&cfg.catalog))
            .with_sla(SlaCalculator::new(cfg.sla.warning_window_days))
            .with_alert_policy(AlertPolicy::new(cfg.alerts.critical_after_days))
            .with_match_policy(cfg.documents.match_policy.clone()))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn sla(&self) -> &SlaCalculator {
        &self.sla
    }

    /// Resolve a move key, either a UUID or a move number such as `MV-000042`.
    pub fn resolve(&self, key: &str) -> Result<Uuid> {
        if let Ok(id) = Uuid::parse_str(key.trim()) {
            return Ok(id);
        }
        let sequence =
            paths::parse_sequence(key).map_err(|_| TrackError::MoveNotFound(key.to_string()))?;
        Ok(self.store.load_by_sequence(sequence)?.id)
    }

    // -----------------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------------

    pub fn create_move(&self, new: NewMove, actor: Option<&str>) -> Result<Move> {
        self.create_move_at(new, actor, Utc::now())
    }

    pub fn create_move_at(&self, new: NewMove, actor: Option<&str>, now: DateTime<Utc>) -> Result<Move> {
        new.validate()?;
        let first = self.catalog.first(new.move_type);
        let catalog = &self.catalog;

        let record = self.store.create(&mut |sequence| {
            let mv = Move {
                id: Uuid::new_v4(),
                sequence,
                move_type: new.move_type,
                current: first,
                priority: new.priority,
                client: new.client.as_ref().map(|c| c.trim().to_string()),
                created_at: now,
                estimated_completion: new.estimated_completion,
                closed_at: None,
                milestones: Vec::new(),
                version: 0,
            };
            let event = Event::new(
                mv.id,
                EventKind::MoveCreated,
                EventCategory::User,
                format!("{} created ({})", mv.number(), mv.move_type),
                now,
            )
            .with_snapshots(None, serde_json::json!(mv.summary(catalog)))
            .with_actor(actor);
            (mv, vec![event])
        })?;

        tracing::info!(move_id = %record.id, number = %record.number(), move_type = %record.move_type, "move created");
        self.notify(Notification {
            move_id: record.id,
            audience: Audience::Client,
            template: "move_created".to_string(),
            payload: serde_json::json!({
                "number": record.number(),
                "move_type": record.move_type,
            }),
        });
        Ok(record)
    }

    pub fn get_move(&self, id: Uuid) -> Result<Move> {
        self.store.load(id)
    }

    pub fn move_detail(&self, id: Uuid) -> Result<MoveDetail> {
        let mv = self.store.load(id)?;
        Ok(MoveDetail::new(&mv, &self.catalog))
    }

    pub fn list_moves(&self, include_closed: bool) -> Result<Vec<MoveSummary>> {
        Ok(self
            .store
            .list()?
            .iter()
            .filter(|m| include_closed || !m.is_closed())
            .map(|m| m.summary(&self.catalog))
            .collect())
    }

    // -----------------------------------------------------------------------
    // Milestone transitions
    // -----------------------------------------------------------------------

    fn ensure_editable(&self, mv: &Move, kind: MilestoneKind) -> Result<()> {
        if mv.is_closed() {
            return Err(TrackError::InvalidTransition {
                kind: kind.to_string(),
                current: mv.current.to_string(),
                reason: format!("move {} is closed", mv.number()),
            });
        }
        if !self.catalog.contains(mv.move_type, kind) {
            return Err(TrackError::KindNotInSequence {
                kind: kind.to_string(),
                move_type: mv.move_type.to_string(),
            });
        }
        Ok(())
    }

    pub fn edit_plan(
        &self,
        id: Uuid,
        kind: MilestoneKind,
        update: PlanUpdate,
        actor: Option<&str>,
    ) -> Result<Milestone> {
        self.edit_plan_at(id, kind, update, actor, Utc::now())
    }

    pub fn edit_plan_at(
        &self,
        id: Uuid,
        kind: MilestoneKind,
        update: PlanUpdate,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Milestone> {
        let mv = self.store.load(id)?;
        self.ensure_editable(&mv, kind)?;
        update.validate()?;
        if mv.milestone(kind).is_some_and(|m| m.completed) {
            return Err(TrackError::InvalidTransition {
                kind: kind.to_string(),
                current: mv.current.to_string(),
                reason: "completed milestones cannot be edited".to_string(),
            });
        }

        let expected = mv.version;
        let before = serde_json::to_value(mv.milestone(kind))?;
        let mut next = mv;
        let sla_days = self.catalog.sla_days_for(kind);
        next.milestone_mut(kind, sla_days).apply(&update, now);
        let milestone = next.milestone_mut(kind, sla_days).clone();

        let event = Event::new(
            id,
            EventKind::MilestoneEdited,
            EventCategory::User,
            format!("{} plan updated", self.catalog.label_for(kind)),
            now,
        )
        .with_snapshots(Some(before), serde_json::to_value(&milestone)?)
        .with_actor(actor);

        let mut commit = Commit::new(next, expected);
        commit.events.push(event);
        let raised = if kind == commit.record.current {
            self.stage_alert(&mut commit, now)?
        } else {
            None
        };
        let stored = self.store.commit(commit)?;

        tracing::info!(move_id = %id, kind = %kind, version = stored.version, "milestone plan updated");
        if let Some(alert) = &raised {
            self.notify_alert(&stored, alert);
        }
        Ok(milestone)
    }

    pub fn complete(&self, id: Uuid, kind: MilestoneKind, actor: Option<&str>) -> Result<Completion> {
        self.complete_at(id, kind, actor, Utc::now())
    }

    pub fn complete_at(
        &self,
        id: Uuid,
        kind: MilestoneKind,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Completion> {
        let mv = self.store.load(id)?;
        self.ensure_editable(&mv, kind)?;
        if mv.current != kind {
            let reason = if mv.milestone(kind).is_some_and(|m| m.completed) {
                "milestone is already completed"
            } else {
                "only the current milestone can be completed"
            };
            return Err(TrackError::InvalidTransition {
                kind: kind.to_string(),
                current: mv.current.to_string(),
                reason: reason.to_string(),
            });
        }

        let gate = DocumentGate::new(self.documents.as_ref(), &self.catalog, &self.match_policy);
        let report = gate.check(id, kind)?;
        if !report.is_open() {
            tracing::warn!(
                move_id = %id,
                kind = %kind,
                missing = ?report.missing,
                "completion rejected: mandatory documents missing"
            );
            return Err(TrackError::DocumentsMissing {
                kind: kind.to_string(),
                missing: report.missing,
            });
        }

        let expected = mv.version;
        let before = self.snapshot(&mv, kind);
        let mut next = mv;
        next.milestone_mut(kind, self.catalog.sla_days_for(kind))
            .complete(now, report.satisfied);
        match self.catalog.next_after(next.move_type, kind) {
            Some(following) => next.current = following,
            None => next.closed_at = Some(now),
        }
        let after = self.snapshot(&next, kind);

        let event = Event::new(
            id,
            EventKind::MilestoneCompleted,
            EventCategory::User,
            format!("{} completed", self.catalog.label_for(kind)),
            now,
        )
        .with_snapshots(Some(before), after)
        .with_actor(actor);

        let mut commit = Commit::new(next, expected);
        commit.events.push(event);
        let raised = self.stage_alert(&mut commit, now)?;
        let stored = self.store.commit(commit)?;

        let milestone = stored
            .milestone(kind)
            .cloned()
            .ok_or_else(|| TrackError::Store(format!("milestone {kind} missing after commit")))?;
        let summary = stored.summary(&self.catalog);

        tracing::info!(
            move_id = %id,
            kind = %kind,
            current = %stored.current,
            progress = summary.progress,
            "milestone completed"
        );
        self.notify(Notification {
            move_id: id,
            audience: Audience::Client,
            template: if stored.is_closed() {
                "move_closed".to_string()
            } else {
                "milestone_completed".to_string()
            },
            payload: serde_json::json!({
                "number": summary.number,
                "kind": kind,
                "label": self.catalog.label_for(kind),
                "progress": summary.progress,
                "current": stored.current,
            }),
        });
        if let Some(alert) = &raised {
            self.notify_alert(&stored, alert);
        }

        Ok(Completion {
            record: summary,
            milestone,
            alert: raised,
        })
    }

    /// Before/after payload recorded on completion events.
    fn snapshot(&self, mv: &Move, kind: MilestoneKind) -> serde_json::Value {
        serde_json::json!({
            "milestone": mv.milestone(kind),
            "current": mv.current,
            "progress": mv.progress(&self.catalog),
            "closed": mv.is_closed(),
        })
    }

    // -----------------------------------------------------------------------
    // Timeline / SLA
    // -----------------------------------------------------------------------

    pub fn timeline(&self, id: Uuid) -> Result<Timeline> {
        self.timeline_at(id, Utc::now())
    }

    pub fn timeline_at(&self, id: Uuid, now: DateTime<Utc>) -> Result<Timeline> {
        let mv = self.store.load(id)?;
        Ok(Timeline::build(&mv, &self.catalog, &self.sla, now))
    }

    pub fn sla_report_at(&self, id: Uuid, now: DateTime<Utc>) -> Result<SlaReport> {
        Ok(SlaReport::from(&self.timeline_at(id, now)?))
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    pub fn history(&self, id: Uuid, filter: EventFilter) -> Result<History<'_>> {
        self.store.load(id)?;
        Ok(History::new(self, id, filter))
    }

    pub fn events_page(
        &self,
        id: Uuid,
        filter: &EventFilter,
        before: Option<Uuid>,
        limit: usize,
    ) -> Result<EventPage> {
        self.store.load(id)?;
        self.store
            .events_page(id, filter, before, limit.clamp(1, MAX_EVENT_PAGE))
    }

    // -----------------------------------------------------------------------
    // Alerts
    // -----------------------------------------------------------------------

    pub fn alerts(&self, id: Uuid, active_only: bool) -> Result<Vec<Alert>> {
        self.store.load(id)?;
        let mut alerts = self.store.alerts_for(id)?;
        if active_only {
            alerts.retain(Alert::is_active);
        }
        Ok(alerts)
    }

    pub fn get_alert(&self, alert_id: Uuid) -> Result<Alert> {
        self.store.load_alert(alert_id)
    }

    /// Stage an alert for the move in `commit` if its current milestone is in
    /// breach and not already covered.
    fn stage_alert(&self, commit: &mut Commit, now: DateTime<Utc>) -> Result<Option<Alert>> {
        let existing = self.store.alerts_for(commit.record.id)?;
        let Some(alert) =
            self.alert_policy
                .evaluate(&commit.record, &self.catalog, &self.sla, &existing, now)
        else {
            return Ok(None);
        };
        commit.events.push(
            Event::new(
                alert.move_id,
                EventKind::AlertRaised,
                EventCategory::Automatic,
                format!("{} alert: {}", alert.severity, alert.title),
                now,
            )
            .with_snapshots(None, serde_json::to_value(&alert)?),
        );
        commit.alerts.push(alert.clone());
        Ok(Some(alert))
    }

    pub fn evaluate(&self, id: Uuid) -> Result<Option<Alert>> {
        self.evaluate_at(id, Utc::now())
    }

    /// Raise an alert for the move's current milestone if it is delayed.
    /// Writes nothing when no new alert is warranted.
    pub fn evaluate_at(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<Alert>> {
        let mv = self.store.load(id)?;
        let expected = mv.version;
        let mut commit = Commit::new(mv, expected);
        let Some(alert) = self.stage_alert(&mut commit, now)? else {
            return Ok(None);
        };
        let stored = self.store.commit(commit)?;
        tracing::info!(move_id = %id, kind = %alert.kind, severity = %alert.severity, "alert raised");
        self.notify_alert(&stored, &alert);
        Ok(Some(alert))
    }

    pub fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now())
    }

    /// Evaluate every open move.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        for mv in self.store.list()?.into_iter().filter(|m| !m.is_closed()) {
            report.evaluated += 1;
            match self.evaluate_at(mv.id, now) {
                Ok(Some(alert)) => report.raised.push(alert),
                Ok(None) => {}
                Err(TrackError::ConcurrentModification { .. }) => {
                    tracing::warn!(move_id = %mv.id, "sweep skipped move modified concurrently");
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        tracing::info!(
            evaluated = report.evaluated,
            raised = report.raised.len(),
            "alert sweep finished"
        );
        Ok(report)
    }

    /// Load the owning move before the alert so a concurrent change to the
    /// alert always shows up as a version conflict.
    fn load_alert_with_move(&self, alert_id: Uuid) -> Result<(Move, Alert)> {
        let move_id = self.store.load_alert(alert_id)?.move_id;
        let mv = self.store.load(move_id)?;
        let alert = self.store.load_alert(alert_id)?;
        Ok((mv, alert))
    }

    pub fn resolve_alert(&self, alert_id: Uuid, actor: Option<&str>) -> Result<Alert> {
        self.resolve_alert_at(alert_id, actor, Utc::now())
    }

    pub fn resolve_alert_at(&self, alert_id: Uuid, actor: Option<&str>, now: DateTime<Utc>) -> Result<Alert> {
        let (mv, mut alert) = self.load_alert_with_move(alert_id)?;
        let before = serde_json::to_value(&alert)?;
        alert.resolve(actor, now)?;

        let expected = mv.version;
        let mut commit = Commit::new(mv, expected);
        commit.events.push(
            Event::new(
                alert.move_id,
                EventKind::AlertResolved,
                EventCategory::User,
                format!("alert resolved: {}", alert.title),
                now,
            )
            .with_snapshots(Some(before), serde_json::to_value(&alert)?)
            .with_actor(actor),
        );
        commit.alerts.push(alert.clone());
        self.store.commit(commit)?;

        tracing::info!(alert_id = %alert_id, move_id = %alert.move_id, "alert resolved");
        Ok(alert)
    }

    pub fn acknowledge_alert(&self, alert_id: Uuid, actor: Option<&str>) -> Result<Alert> {
        self.acknowledge_alert_at(alert_id, actor, Utc::now())
    }

    pub fn acknowledge_alert_at(
        &self,
        alert_id: Uuid,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Alert> {
        let (mv, mut alert) = self.load_alert_with_move(alert_id)?;
        let before = serde_json::to_value(&alert)?;
        if !alert.acknowledge(actor, now)? {
            return Ok(alert);
        }

        let expected = mv.version;
        let mut commit = Commit::new(mv, expected);
        commit.events.push(
            Event::new(
                alert.move_id,
                EventKind::AlertAcknowledged,
                EventCategory::User,
                format!("alert acknowledged: {}", alert.title),
                now,
            )
            .with_snapshots(Some(before), serde_json::to_value(&alert)?)
            .with_actor(actor),
        );
        commit.alerts.push(alert.clone());
        self.store.commit(commit)?;

        tracing::info!(alert_id = %alert_id, move_id = %alert.move_id, "alert acknowledged");
        Ok(alert)
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    fn notify(&self, notification: Notification) {
        self.notifications.enqueue(notification);
    }

    /// Wait until every notification queued so far has been handed to the
    /// notifier.
    pub fn flush_notifications(&self) {
        self.notifications.flush();
    }

    fn notify_alert(&self, mv: &Move, alert: &Alert) {
        self.notify(Notification {
            move_id: mv.id,
            audience: Audience::Coordinator,
            template: "sla_breach".to_string(),
            payload: serde_json::json!({
                "number": mv.number(),
                "kind": alert.kind,
                "severity": alert.severity,
                "message": alert.message,
            }),
        });
    }
}

impl EventSource for Tracker {
    fn events_page(
        &self,
        move_id: Uuid,
        filter: &EventFilter,
        before: Option<Uuid>,
        limit: usize,
    ) -> Result<EventPage> {
        self.store.events_page(move_id, filter, before, limit)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
