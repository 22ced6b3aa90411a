//! SLA breach alerts.
//!
//! Alerts are derived from the SLA reading of a move's current milestone.
//! They are never deleted and never resolved automatically.

use crate::catalog::Catalog;
use crate::error::{Result, TrackError};
use crate::moves::Move;
use crate::sla::{SlaCalculator, SlaStatus};
use crate::types::{MilestoneKind, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub move_id: Uuid,
    pub kind: MilestoneKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}

impl Alert {
    pub fn is_active(&self) -> bool {
        !self.resolved
    }

    pub fn resolve(&mut self, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if self.resolved {
            return Err(TrackError::AlreadyResolved(self.id.to_string()));
        }
        self.resolved = true;
        self.resolved_at = Some(now);
        self.resolved_by = actor.map(str::to_string);
        Ok(())
    }

    /// Record the first acknowledgement. Returns `false` when it was already
    /// acknowledged, leaving the original timestamp and actor in place.
    pub fn acknowledge(&mut self, actor: Option<&str>, now: DateTime<Utc>) -> Result<bool> {
        if self.resolved {
            return Err(TrackError::AlreadyResolved(self.id.to_string()));
        }
        if self.acknowledged_at.is_some() {
            return Ok(false);
        }
        self.acknowledged_at = Some(now);
        self.acknowledged_by = actor.map(str::to_string);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// AlertPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct AlertPolicy {
    pub critical_after_days: i64,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            critical_after_days: 3,
        }
    }
}

impl AlertPolicy {
    pub fn new(critical_after_days: i64) -> Self {
        Self {
            critical_after_days,
        }
    }

    /// Severity for a milestone overdue by `overdue_days` (> 0).
    pub fn severity_for(&self, overdue_days: i64) -> Severity {
        if overdue_days > self.critical_after_days {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }

    /// Decide whether the move's current milestone warrants a new alert.
    ///
    /// Returns `None` when the milestone is not delayed, or when an unresolved
    /// alert for the same kind already carries equal or higher severity.
    pub fn evaluate(
        &self,
        mv: &Move,
        catalog: &Catalog,
        sla: &SlaCalculator,
        existing: &[Alert],
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        if mv.is_closed() {
            return None;
        }
        let kind = mv.current;
        let milestone = mv.milestone(kind)?;
        let reading = sla.classify(milestone, true, now);
        if reading.status != SlaStatus::Delayed {
            return None;
        }
        let overdue = -reading.days_delta?;
        let severity = self.severity_for(overdue);

        let covered = existing
            .iter()
            .any(|a| a.move_id == mv.id && a.kind == kind && a.is_active() && a.severity >= severity);
        if covered {
            return None;
        }

        let label = catalog.label_for(kind);
        let planned = milestone
            .planned_date
            .map(|d| d.to_string())
            .unwrap_or_default();
        let plural = if overdue == 1 { "" } else { "s" };
        Some(Alert {
            id: Uuid::new_v4(),
            move_id: mv.id,
            kind,
            severity,
            title: format!("{label} overdue"),
            message: format!(
                "{} milestone '{label}' was planned for {planned} and is {overdue} day{plural} overdue",
                mv.number()
            ),
            raised_at: now,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
