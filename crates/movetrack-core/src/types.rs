use crate::error::TrackError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// MilestoneKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Inspection,
    Quotation,
    QuotationSent,
    QuotationAccepted,
    Booking,
    BookingRequested,
    BookingConfirmed,
    PackScheduling,
    Packing,
    Warehousing,
    Dispatch,
    PortTransfer,
    ExportComplete,
    Transit,
    InternationalTransit,
    PortArrival,
    Customs,
    CustomsProcessing,
    ReleaseApproved,
    DeliveryScheduling,
    Delivery,
    ContainerReturned,
    Closed,
}

impl MilestoneKind {
    pub fn all() -> &'static [MilestoneKind] {
        use MilestoneKind::*;
        &[
            Inspection,
            Quotation,
            QuotationSent,
            QuotationAccepted,
            Booking,
            BookingRequested,
            BookingConfirmed,
            PackScheduling,
            Packing,
            Warehousing,
            Dispatch,
            PortTransfer,
            ExportComplete,
            Transit,
            InternationalTransit,
            PortArrival,
            Customs,
            CustomsProcessing,
            ReleaseApproved,
            DeliveryScheduling,
            Delivery,
            ContainerReturned,
            Closed,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MilestoneKind::Inspection => "inspection",
            MilestoneKind::Quotation => "quotation",
            MilestoneKind::QuotationSent => "quotation_sent",
            MilestoneKind::QuotationAccepted => "quotation_accepted",
            MilestoneKind::Booking => "booking",
            MilestoneKind::BookingRequested => "booking_requested",
            MilestoneKind::BookingConfirmed => "booking_confirmed",
            MilestoneKind::PackScheduling => "pack_scheduling",
            MilestoneKind::Packing => "packing",
            MilestoneKind::Warehousing => "warehousing",
            MilestoneKind::Dispatch => "dispatch",
            MilestoneKind::PortTransfer => "port_transfer",
            MilestoneKind::ExportComplete => "export_complete",
            MilestoneKind::Transit => "transit",
            MilestoneKind::InternationalTransit => "international_transit",
            MilestoneKind::PortArrival => "port_arrival",
            MilestoneKind::Customs => "customs",
            MilestoneKind::CustomsProcessing => "customs_processing",
            MilestoneKind::ReleaseApproved => "release_approved",
            MilestoneKind::DeliveryScheduling => "delivery_scheduling",
            MilestoneKind::Delivery => "delivery",
            MilestoneKind::ContainerReturned => "container_returned",
            MilestoneKind::Closed => "closed",
        }
    }
}

impl fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MilestoneKind {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().replace('-', "_");
        MilestoneKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| TrackError::InvalidKind(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MoveType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveType {
    #[default]
    Domestic,
    InternationalSea,
    InternationalAir,
}

impl MoveType {
    pub fn all() -> &'static [MoveType] {
        &[
            MoveType::Domestic,
            MoveType::InternationalSea,
            MoveType::InternationalAir,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MoveType::Domestic => "domestic",
            MoveType::InternationalSea => "international_sea",
            MoveType::InternationalAir => "international_air",
        }
    }
}

impl fmt::Display for MoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MoveType {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domestic" => Ok(MoveType::Domestic),
            "international_sea" | "international-sea" | "sea" => Ok(MoveType::InternationalSea),
            "international_air" | "international-air" | "air" => Ok(MoveType::InternationalAir),
            _ => Err(TrackError::Validation(format!("unknown move type '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Priority {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(TrackError::Validation(format!("unknown priority '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// EventKind / EventCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MoveCreated,
    MilestoneEdited,
    MilestoneCompleted,
    AlertRaised,
    AlertAcknowledged,
    AlertResolved,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::MoveCreated => "move_created",
            EventKind::MilestoneEdited => "milestone_edited",
            EventKind::MilestoneCompleted => "milestone_completed",
            EventKind::AlertRaised => "alert_raised",
            EventKind::AlertAcknowledged => "alert_acknowledged",
            EventKind::AlertResolved => "alert_resolved",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move_created" => Ok(EventKind::MoveCreated),
            "milestone_edited" => Ok(EventKind::MilestoneEdited),
            "milestone_completed" => Ok(EventKind::MilestoneCompleted),
            "alert_raised" => Ok(EventKind::AlertRaised),
            "alert_acknowledged" => Ok(EventKind::AlertAcknowledged),
            "alert_resolved" => Ok(EventKind::AlertResolved),
            _ => Err(TrackError::Validation(format!("unknown event kind '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    System,
    User,
    Automatic,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventCategory::System => "system",
            EventCategory::User => "user",
            EventCategory::Automatic => "automatic",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for EventCategory {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(EventCategory::System),
            "user" => Ok(EventCategory::User),
            "automatic" => Ok(EventCategory::Automatic),
            _ => Err(TrackError::Validation(format!(
                "unknown event category '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_all_complete() {
        assert_eq!(MilestoneKind::all().len(), 23);
        assert_eq!(MilestoneKind::all()[0], MilestoneKind::Inspection);
        assert_eq!(*MilestoneKind::all().last().unwrap(), MilestoneKind::Closed);
    }

    #[test]
    fn kind_parse_accepts_dashes() {
        assert_eq!(
            MilestoneKind::from_str("quotation-sent").unwrap(),
            MilestoneKind::QuotationSent
        );
        assert_eq!(
            MilestoneKind::from_str("packing").unwrap(),
            MilestoneKind::Packing
        );
    }

    #[test]
    fn kind_parse_rejects_unknown() {
        assert!(matches!(
            MilestoneKind::from_str("teleport"),
            Err(TrackError::InvalidKind(_))
        ));
    }

    #[test]
    fn kind_serde_matches_as_str() {
        for kind in MilestoneKind::all() {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn move_type_aliases() {
        assert_eq!(
            MoveType::from_str("sea").unwrap(),
            MoveType::InternationalSea
        );
        assert!(MoveType::from_str("rocket").is_err());
    }
}
