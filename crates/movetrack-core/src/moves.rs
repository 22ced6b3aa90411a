use crate::catalog::Catalog;
use crate::error::{Result, TrackError};
use crate::milestone::Milestone;
use crate::paths;
use crate::sla::rounded_percent;
use crate::types::{MilestoneKind, MoveType, Priority};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// A relocation job. Progress is never stored; see [`Move::progress`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub id: Uuid,
    pub sequence: u64,
    pub move_type: MoveType,
    pub current: MilestoneKind,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Materialized milestones, in the order they were first touched.
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    /// Compare-and-swap token, bumped by every committed mutation.
    #[serde(default)]
    pub version: u64,
}

impl Move {
    pub fn number(&self) -> String {
        paths::format_sequence(self.sequence)
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    pub fn milestone(&self, kind: MilestoneKind) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.kind == kind)
    }

    /// The stored milestone for `kind`, materializing it with `sla_days` if absent.
    pub fn milestone_mut(&mut self, kind: MilestoneKind, sla_days: u32) -> &mut Milestone {
        let idx = match self.milestones.iter().position(|m| m.kind == kind) {
            Some(i) => i,
            None => {
                self.milestones.push(Milestone::new(kind, sla_days));
                self.milestones.len() - 1
            }
        };
        &mut self.milestones[idx]
    }

    /// `round(100 × completed / sequence length)` over the move's sequence.
    pub fn progress(&self, catalog: &Catalog) -> u8 {
        let seq = catalog.sequence_for(self.move_type);
        let done = seq
            .iter()
            .filter(|&&k| self.milestone(k).is_some_and(|m| m.completed))
            .count() as u64;
        rounded_percent(done, seq.len() as u64)
    }

    pub fn summary(&self, catalog: &Catalog) -> MoveSummary {
        MoveSummary {
            id: self.id,
            number: self.number(),
            move_type: self.move_type,
            current: self.current,
            current_label: catalog.label_for(self.current).to_string(),
            priority: self.priority,
            client: self.client.clone(),
            progress: self.progress(catalog),
            created_at: self.created_at,
            estimated_completion: self.estimated_completion,
            closed_at: self.closed_at,
            version: self.version,
        }
    }
}

// ---------------------------------------------------------------------------
// NewMove
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMove {
    #[serde(default)]
    pub move_type: MoveType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub estimated_completion: Option<NaiveDate>,
}

impl NewMove {
    pub fn validate(&self) -> Result<()> {
        if let Some(client) = &self.client {
            if client.trim().is_empty() {
                return Err(TrackError::Validation(
                    "client must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MoveSummary
// ---------------------------------------------------------------------------

/// Read projection of a move with derived progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveSummary {
    pub id: Uuid,
    pub number: String,
    pub move_type: MoveType,
    pub current: MilestoneKind,
    pub current_label: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    pub version: u64,
}

/// Full move with its materialized milestones.
#[derive(Debug, Clone, Serialize)]
pub struct MoveDetail {
    #[serde(flatten)]
    pub summary: MoveSummary,
    pub milestones: Vec<Milestone>,
}

impl MoveDetail {
    pub fn new(mv: &Move, catalog: &Catalog) -> Self {
        let seq = catalog.sequence_for(mv.move_type);
        let mut milestones = mv.milestones.clone();
        milestones.sort_by_key(|m| seq.iter().position(|&k| k == m.kind));
        Self {
            summary: mv.summary(catalog),
            milestones,
        }
    }
}
