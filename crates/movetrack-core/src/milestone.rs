use crate::error::{Result, TrackError};
use crate::types::MilestoneKind;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Milestone
// ---------------------------------------------------------------------------

/// One stage of a move. Materialized the first time it is planned or completed;
/// until then the timeline synthesizes it from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub kind: MilestoneKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub sla_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    #[serde(default)]
    pub notes: String,
    /// Document types that satisfied this milestone's requirements at completion.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub documents: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Milestone {
    pub fn new(kind: MilestoneKind, sla_days: u32) -> Self {
        Self {
            kind,
            planned_date: None,
            actual_date: None,
            completed: false,
            sla_days,
            responsible: None,
            notes: String::new(),
            documents: BTreeSet::new(),
            updated_at: None,
        }
    }

    pub fn apply(&mut self, update: &PlanUpdate, now: DateTime<Utc>) {
        if let Some(date) = update.planned_date {
            self.planned_date = Some(date);
        }
        if let Some(days) = update.sla_days {
            self.sla_days = days;
        }
        if let Some(responsible) = &update.responsible {
            let trimmed = responsible.trim();
            self.responsible = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(notes) = &update.notes {
            self.notes = notes.clone();
        }
        self.updated_at = Some(now);
    }

    /// Mark complete at `now`. Keeps `completed ⇒ actual_date.is_some()`.
    pub fn complete(&mut self, now: DateTime<Utc>, documents: BTreeSet<String>) {
        self.completed = true;
        self.actual_date = Some(now);
        self.documents = documents;
        self.updated_at = Some(now);
    }
}

// ---------------------------------------------------------------------------
// PlanUpdate
// ---------------------------------------------------------------------------

/// Mutable plan fields of a milestone. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanUpdate {
    #[serde(default, alias = "plannedDate")]
    pub planned_date: Option<NaiveDate>,
    #[serde(default, alias = "slaDays")]
    pub sla_days: Option<u32>,
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PlanUpdate {
    pub fn is_empty(&self) -> bool {
        self.planned_date.is_none()
            && self.sla_days.is_none()
            && self.responsible.is_none()
            && self.notes.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(TrackError::Validation(
                "plan update must set at least one field".to_string(),
            ));
        }
        if self.sla_days == Some(0) {
            return Err(TrackError::Validation(
                "sla_days must be at least 1".to_string(),
            ));
        }
        if self.notes.as_ref().is_some_and(|n| n.len() > 4_000) {
            return Err(TrackError::Validation(
                "notes must be at most 4000 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut m = Milestone::new(MilestoneKind::Packing, 2);
        m.notes = "fragile piano".into();
        m.apply(
            &PlanUpdate {
                planned_date: NaiveDate::from_ymd_opt(2026, 3, 10),
                responsible: Some("  Dana ".into()),
                ..PlanUpdate::default()
            },
            now(),
        );
        assert_eq!(m.planned_date, NaiveDate::from_ymd_opt(2026, 3, 10));
        assert_eq!(m.responsible.as_deref(), Some("Dana"));
        assert_eq!(m.notes, "fragile piano");
        assert_eq!(m.sla_days, 2);
        assert_eq!(m.updated_at, Some(now()));
    }

    #[test]
    fn blank_responsible_clears() {
        let mut m = Milestone::new(MilestoneKind::Packing, 2);
        m.responsible = Some("Dana".into());
        m.apply(
            &PlanUpdate {
                responsible: Some("   ".into()),
                ..PlanUpdate::default()
            },
            now(),
        );
        assert!(m.responsible.is_none());
    }

    #[test]
    fn complete_sets_actual() {
        let mut m = Milestone::new(MilestoneKind::Delivery, 1);
        m.complete(now(), BTreeSet::from(["Proof of delivery".to_string()]));
        assert!(m.completed);
        assert_eq!(m.actual_date, Some(now()));
        assert!(m.documents.contains("Proof of delivery"));
    }

    #[test]
    fn validate_rejects_empty_and_zero_sla() {
        assert!(PlanUpdate::default().validate().is_err());
        let zero = PlanUpdate {
            sla_days: Some(0),
            ..PlanUpdate::default()
        };
        assert!(matches!(zero.validate(), Err(TrackError::Validation(_))));
        let ok = PlanUpdate {
            notes: Some(String::new()),
            ..PlanUpdate::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn plan_update_rejects_unknown_fields() {
        let json = r#"{"planned_date":"2026-03-10","sla":3}"#;
        assert!(serde_json::from_str::<PlanUpdate>(json).is_err());
        let json = r#"{"planned_date":"2026-03-10","sla_days":3}"#;
        let parsed: PlanUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.sla_days, Some(3));
        let json = r#"{"plannedDate":"2026-03-10","slaDays":4}"#;
        let parsed: PlanUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.sla_days, Some(4));
    }
}
