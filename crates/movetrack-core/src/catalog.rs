//! Milestone catalog: the ordered milestone sequence for each move type, with
//! default SLA durations and document requirements per milestone kind.
//!
//! The catalog is read-only once built. Project config may override the SLA
//! days or the requirement list of individual kinds.

use crate::config::CatalogConfig;
use crate::types::{MilestoneKind, MoveType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use MilestoneKind::*;

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

const DOMESTIC: &[MilestoneKind] = &[
    Inspection,
    Quotation,
    QuotationSent,
    QuotationAccepted,
    Booking,
    BookingConfirmed,
    PackScheduling,
    Packing,
    Warehousing,
    Dispatch,
    Transit,
    DeliveryScheduling,
    Delivery,
    Closed,
];

const INTERNATIONAL_SEA: &[MilestoneKind] = &[
    Inspection,
    Quotation,
    QuotationSent,
    QuotationAccepted,
    Booking,
    BookingRequested,
    BookingConfirmed,
    PackScheduling,
    Packing,
    Dispatch,
    PortTransfer,
    ExportComplete,
    InternationalTransit,
    PortArrival,
    Customs,
    CustomsProcessing,
    ReleaseApproved,
    DeliveryScheduling,
    Delivery,
    ContainerReturned,
    Closed,
];

const INTERNATIONAL_AIR: &[MilestoneKind] = &[
    Inspection,
    Quotation,
    QuotationSent,
    QuotationAccepted,
    Booking,
    BookingRequested,
    BookingConfirmed,
    PackScheduling,
    Packing,
    Dispatch,
    ExportComplete,
    InternationalTransit,
    Customs,
    CustomsProcessing,
    ReleaseApproved,
    DeliveryScheduling,
    Delivery,
    Closed,
];

// ---------------------------------------------------------------------------
// DocumentRequirement / CatalogEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequirement {
    pub document_type: String,
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
}

fn default_mandatory() -> bool {
    true
}

impl DocumentRequirement {
    pub fn mandatory(document_type: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            mandatory: true,
        }
    }

    pub fn optional(document_type: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            mandatory: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub kind: MilestoneKind,
    pub label: &'static str,
    pub sla_days: u32,
    pub requirements: Vec<DocumentRequirement>,
}

fn default_entry(kind: MilestoneKind) -> CatalogEntry {
    let (label, sla_days, requirements) = match kind {
        Inspection => (
            "Inspection",
            2,
            vec![DocumentRequirement::mandatory("Survey report")],
        ),
        Quotation => ("Quotation", 2, vec![]),
        QuotationSent => (
            "Quotation sent",
            1,
            vec![DocumentRequirement::mandatory("Quotation")],
        ),
        QuotationAccepted => (
            "Quotation accepted",
            5,
            vec![DocumentRequirement::mandatory("Signed quotation")],
        ),
        Booking => ("Booking", 3, vec![]),
        BookingRequested => ("Booking requested", 2, vec![]),
        BookingConfirmed => (
            "Booking confirmed",
            3,
            vec![DocumentRequirement::mandatory("Booking confirmation")],
        ),
        PackScheduling => ("Pack scheduling", 3, vec![]),
        Packing => (
            "Packing",
            2,
            vec![
                DocumentRequirement::mandatory("Packing list final"),
                DocumentRequirement::optional("Inventory photos"),
            ],
        ),
        Warehousing => (
            "Warehousing",
            30,
            vec![DocumentRequirement::optional("Warehouse receipt")],
        ),
        Dispatch => ("Dispatch", 1, vec![]),
        PortTransfer => ("Port transfer", 2, vec![]),
        ExportComplete => (
            "Export complete",
            3,
            vec![
                DocumentRequirement::mandatory("Bill of lading"),
                DocumentRequirement::optional("Export declaration"),
            ],
        ),
        Transit => ("Transit", 5, vec![]),
        InternationalTransit => ("International transit", 35, vec![]),
        PortArrival => ("Port arrival", 2, vec![]),
        Customs => (
            "Customs",
            5,
            vec![
                DocumentRequirement::mandatory("Customs declaration"),
                DocumentRequirement::mandatory("Passport copy"),
            ],
        ),
        CustomsProcessing => ("Customs processing", 5, vec![]),
        ReleaseApproved => (
            "Release approved",
            2,
            vec![DocumentRequirement::mandatory("Release order")],
        ),
        DeliveryScheduling => ("Delivery scheduling", 3, vec![]),
        Delivery => (
            "Delivery",
            1,
            vec![DocumentRequirement::mandatory("Proof of delivery")],
        ),
        ContainerReturned => ("Container returned", 5, vec![]),
        Closed => (
            "Closed",
            7,
            vec![DocumentRequirement::optional("Client feedback")],
        ),
    };
    CatalogEntry {
        kind,
        label,
        sla_days,
        requirements,
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: HashMap<MilestoneKind, CatalogEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        let entries = MilestoneKind::all()
            .iter()
            .map(|&k| (k, default_entry(k)))
            .collect();
        Self { entries }
    }
}

impl Catalog {
    /// Build the default catalog and apply per-kind overrides. Overrides keyed
    /// by an unknown kind are skipped; `Config::validate` reports them.
    pub fn from_config(cfg: &CatalogConfig) -> Self {
        let mut catalog = Self::default();
        for (key, ov) in &cfg.overrides {
            let Ok(kind) = MilestoneKind::from_str(key) else {
                continue;
            };
            if let Some(entry) = catalog.entries.get_mut(&kind) {
                if let Some(days) = ov.sla_days {
                    entry.sla_days = days;
                }
                if let Some(reqs) = &ov.requirements {
                    entry.requirements = reqs.clone();
                }
            }
        }
        catalog
    }

    pub fn sequence_for(&self, move_type: MoveType) -> &'static [MilestoneKind] {
        match move_type {
            MoveType::Domestic => DOMESTIC,
            MoveType::InternationalSea => INTERNATIONAL_SEA,
            MoveType::InternationalAir => INTERNATIONAL_AIR,
        }
    }

    pub fn entry(&self, kind: MilestoneKind) -> &CatalogEntry {
        // Every kind is inserted by `Default`, overrides never remove entries.
        &self.entries[&kind]
    }

    pub fn requirements_for(&self, kind: MilestoneKind) -> &[DocumentRequirement] {
        &self.entry(kind).requirements
    }

    pub fn sla_days_for(&self, kind: MilestoneKind) -> u32 {
        self.entry(kind).sla_days
    }

    pub fn label_for(&self, kind: MilestoneKind) -> &'static str {
        self.entry(kind).label
    }

    pub fn position(&self, move_type: MoveType, kind: MilestoneKind) -> Option<usize> {
        self.sequence_for(move_type).iter().position(|&k| k == kind)
    }

    pub fn contains(&self, move_type: MoveType, kind: MilestoneKind) -> bool {
        self.position(move_type, kind).is_some()
    }

    pub fn first(&self, move_type: MoveType) -> MilestoneKind {
        self.sequence_for(move_type)[0]
    }

    /// The kind after `kind`, or `None` when `kind` is terminal or not in the sequence.
    pub fn next_after(&self, move_type: MoveType, kind: MilestoneKind) -> Option<MilestoneKind> {
        let seq = self.sequence_for(move_type);
        let i = self.position(move_type, kind)?;
        seq.get(i + 1).copied()
    }

    pub fn is_terminal(&self, move_type: MoveType, kind: MilestoneKind) -> bool {
        self.sequence_for(move_type).last() == Some(&kind)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogOverride;

    #[test]
    fn sequences_start_and_end_consistently() {
        let catalog = Catalog::default();
        for &mt in MoveType::all() {
            let seq = catalog.sequence_for(mt);
            assert_eq!(seq[0], Inspection, "{mt} must start at inspection");
            assert_eq!(*seq.last().unwrap(), Closed, "{mt} must end at closed");
            let unique: std::collections::BTreeSet<_> = seq.iter().collect();
            assert_eq!(unique.len(), seq.len(), "{mt} has duplicate kinds");
        }
    }

    #[test]
    fn sequence_lengths() {
        let catalog = Catalog::default();
        assert_eq!(catalog.sequence_for(MoveType::Domestic).len(), 14);
        assert_eq!(catalog.sequence_for(MoveType::InternationalSea).len(), 21);
        assert_eq!(catalog.sequence_for(MoveType::InternationalAir).len(), 18);
    }

    #[test]
    fn next_after_walks_forward() {
        let catalog = Catalog::default();
        assert_eq!(
            catalog.next_after(MoveType::Domestic, Inspection),
            Some(Quotation)
        );
        assert_eq!(catalog.next_after(MoveType::Domestic, Closed), None);
        assert_eq!(catalog.next_after(MoveType::Domestic, PortArrival), None);
        assert!(catalog.is_terminal(MoveType::InternationalAir, Closed));
    }

    #[test]
    fn packing_requires_final_packing_list() {
        let catalog = Catalog::default();
        let mandatory: Vec<_> = catalog
            .requirements_for(Packing)
            .iter()
            .filter(|r| r.mandatory)
            .map(|r| r.document_type.as_str())
            .collect();
        assert_eq!(mandatory, vec!["Packing list final"]);
    }

    #[test]
    fn overrides_apply_and_unknown_keys_are_ignored() {
        let mut cfg = CatalogConfig::default();
        cfg.overrides.insert(
            "packing".to_string(),
            CatalogOverride {
                sla_days: Some(4),
                requirements: Some(vec![DocumentRequirement::mandatory("Crate manifest")]),
            },
        );
        cfg.overrides.insert(
            "teleport".to_string(),
            CatalogOverride {
                sla_days: Some(1),
                requirements: None,
            },
        );
        let catalog = Catalog::from_config(&cfg);
        assert_eq!(catalog.sla_days_for(Packing), 4);
        assert_eq!(
            catalog.requirements_for(Packing)[0].document_type,
            "Crate manifest"
        );
        assert_eq!(catalog.sla_days_for(Inspection), 2);
    }
}
