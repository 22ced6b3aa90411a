use crate::catalog::Catalog;
use crate::milestone::Milestone;
use crate::moves::Move;
use crate::sla::{SlaCalculator, SlaReading};
use crate::types::{MilestoneKind, MoveType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub kind: MilestoneKind,
    pub label: String,
    pub milestone: Milestone,
    pub is_past: bool,
    pub is_current: bool,
    pub is_future: bool,
    pub sla: SlaReading,
}

#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub move_id: Uuid,
    pub number: String,
    pub move_type: MoveType,
    pub current: MilestoneKind,
    pub closed: bool,
    pub progress: u8,
    pub compliance: u8,
    pub entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// One entry per kind in the move's sequence. Kinds never planned or
    /// completed get a synthesized milestone carrying the catalog SLA.
    pub fn build(mv: &Move, catalog: &Catalog, sla: &SlaCalculator, now: DateTime<Utc>) -> Self {
        let seq = catalog.sequence_for(mv.move_type);
        let closed = mv.is_closed();
        let current_pos = catalog.position(mv.move_type, mv.current).unwrap_or(0);

        let entries = seq
            .iter()
            .enumerate()
            .map(|(i, &kind)| {
                let milestone = mv
                    .milestone(kind)
                    .cloned()
                    .unwrap_or_else(|| Milestone::new(kind, catalog.sla_days_for(kind)));
                let is_current = !closed && i == current_pos;
                let is_past = closed || i < current_pos;
                let reading = sla.classify(&milestone, is_current, now);
                TimelineEntry {
                    kind,
                    label: catalog.label_for(kind).to_string(),
                    milestone,
                    is_past,
                    is_current,
                    is_future: !is_past && !is_current,
                    sla: reading,
                }
            })
            .collect();

        Self {
            move_id: mv.id,
            number: mv.number(),
            move_type: mv.move_type,
            current: mv.current,
            closed,
            progress: mv.progress(catalog),
            compliance: sla.aggregate_compliance(&mv.milestones),
            entries,
        }
    }

    pub fn entry(&self, kind: MilestoneKind) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| e.kind == kind)
    }
}

// ---------------------------------------------------------------------------
// SlaReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct KindReading {
    pub kind: MilestoneKind,
    #[serde(flatten)]
    pub reading: SlaReading,
}

/// Compact SLA view of a move: compliance plus the non-`none` readings.
#[derive(Debug, Clone, Serialize)]
pub struct SlaReport {
    pub move_id: Uuid,
    pub compliance: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<KindReading>,
    pub milestones: Vec<KindReading>,
}

impl From<&Timeline> for SlaReport {
    fn from(t: &Timeline) -> Self {
        let reading = |e: &TimelineEntry| KindReading {
            kind: e.kind,
            reading: e.sla,
        };
        Self {
            move_id: t.move_id,
            compliance: t.compliance,
            current: t.entries.iter().find(|e| e.is_current).map(reading),
            milestones: t
                .entries
                .iter()
                .filter(|e| e.sla.status != crate::sla::SlaStatus::None)
                .map(reading)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sla::SlaStatus;
    use crate::types::Priority;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn d0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()
    }

    fn at(date: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_hms_opt(11, 0, 0).unwrap())
    }

    fn domestic() -> Move {
        Move {
            id: Uuid::new_v4(),
            sequence: 3,
            move_type: MoveType::Domestic,
            current: MilestoneKind::Inspection,
            priority: Priority::Low,
            client: None,
            created_at: at(d0()),
            estimated_completion: None,
            closed_at: None,
            milestones: Vec::new(),
            version: 1,
        }
    }

    #[test]
    fn inspection_on_time_and_quotation_delayed() {
        let catalog = Catalog::default();
        let mut mv = domestic();
        let insp = mv.milestone_mut(MilestoneKind::Inspection, 1);
        insp.planned_date = Some(d0());
        insp.complete(at(d0()), Default::default());
        mv.current = MilestoneKind::Quotation;
        mv.milestone_mut(MilestoneKind::Quotation, 2).planned_date = Some(d0() + Duration::days(1));

        let now = at(d0() + Duration::days(3));
        let t = Timeline::build(&mv, &catalog, &SlaCalculator::default(), now);

        let insp = t.entry(MilestoneKind::Inspection).unwrap();
        assert_eq!(insp.sla.status, SlaStatus::OnTime);
        assert_eq!(insp.sla.days_delta, Some(0));
        assert!(insp.is_past);

        let quote = t.entry(MilestoneKind::Quotation).unwrap();
        assert!(quote.is_current);
        assert_eq!(quote.sla.status, SlaStatus::Delayed);
        assert_eq!(quote.sla.days_delta, Some(-2));

        let packing = t.entry(MilestoneKind::Packing).unwrap();
        assert!(packing.is_future);
        assert_eq!(packing.sla.status, SlaStatus::None);
        assert_eq!(packing.milestone.sla_days, catalog.sla_days_for(MilestoneKind::Packing));

        assert_eq!(t.entries.len(), 14);
        assert_eq!(t.progress, 7);
        assert_eq!(t.compliance, 100);

        let report = SlaReport::from(&t);
        assert_eq!(report.current.unwrap().reading.status, SlaStatus::Delayed);
        assert_eq!(report.milestones.len(), 2);
    }

    #[test]
    fn closed_move_has_no_current() {
        let catalog = Catalog::default();
        let mut mv = domestic();
        mv.current = MilestoneKind::Closed;
        mv.closed_at = Some(at(d0()));
        let t = Timeline::build(&mv, &catalog, &SlaCalculator::default(), at(d0()));
        assert!(t.closed);
        assert!(t.entries.iter().all(|e| e.is_past && !e.is_current && !e.is_future));
    }
}
