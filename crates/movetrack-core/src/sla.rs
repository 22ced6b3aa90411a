//! SLA classification of milestones from planned vs. actual dates.
//!
//! Everything here is pure: the caller supplies `now`, so readings are
//! reproducible with a fixed clock.

use crate::milestone::Milestone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    OnTime,
    Warning,
    Delayed,
    None,
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlaStatus::OnTime => "on_time",
            SlaStatus::Warning => "warning",
            SlaStatus::Delayed => "delayed",
            SlaStatus::None => "none",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaReading {
    pub status: SlaStatus,
    /// Completed: `actual − planned`. Pending current: `planned − today`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_delta: Option<i64>,
}

impl SlaReading {
    pub const NONE: SlaReading = SlaReading {
        status: SlaStatus::None,
        days_delta: None,
    };
}

#[derive(Debug, Clone, Copy)]
pub struct SlaCalculator {
    pub warning_window_days: i64,
}

impl Default for SlaCalculator {
    fn default() -> Self {
        Self {
            warning_window_days: 2,
        }
    }
}

impl SlaCalculator {
    pub fn new(warning_window_days: i64) -> Self {
        Self {
            warning_window_days,
        }
    }

    pub fn classify(&self, m: &Milestone, is_current: bool, now: DateTime<Utc>) -> SlaReading {
        let Some(planned) = m.planned_date else {
            return SlaReading::NONE;
        };

        if m.completed {
            let Some(actual) = m.actual_date else {
                return SlaReading::NONE;
            };
            let delta = (actual.date_naive() - planned).num_days();
            let status = if delta <= 0 {
                SlaStatus::OnTime
            } else if delta <= self.warning_window_days {
                SlaStatus::Warning
            } else {
                SlaStatus::Delayed
            };
            return SlaReading {
                status,
                days_delta: Some(delta),
            };
        }

        if !is_current {
            return SlaReading::NONE;
        }

        let delta = (planned - now.date_naive()).num_days();
        let status = if delta < 0 {
            SlaStatus::Delayed
        } else if delta <= self.warning_window_days {
            SlaStatus::Warning
        } else {
            SlaStatus::OnTime
        };
        SlaReading {
            status,
            days_delta: Some(delta),
        }
    }

    /// Share of completed, fully-dated milestones finished on or before plan,
    /// as a rounded percentage. 100 when no milestone has both dates.
    pub fn aggregate_compliance<'a>(&self, milestones: impl IntoIterator<Item = &'a Milestone>) -> u8 {
        let mut dated = 0u64;
        let mut on_time = 0u64;
        for m in milestones {
            if !m.completed {
                continue;
            }
            let (Some(planned), Some(actual)) = (m.planned_date, m.actual_date) else {
                continue;
            };
            dated += 1;
            if (actual.date_naive() - planned).num_days() <= 0 {
                on_time += 1;
            }
        }
        if dated == 0 {
            return 100;
        }
        rounded_percent(on_time, dated)
    }
}

/// `round(100 × part / whole)` with halves rounded up. `whole` must be non-zero.
pub(crate) fn rounded_percent(part: u64, whole: u64) -> u8 {
    ((200 * part + whole) / (2 * whole)).min(100) as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MilestoneKind;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn d0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 10).unwrap()
    }

    fn at(date: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_hms_opt(15, 30, 0).unwrap())
    }

    fn completed(planned: NaiveDate, actual: NaiveDate) -> Milestone {
        let mut m = Milestone::new(MilestoneKind::Packing, 2);
        m.planned_date = Some(planned);
        m.complete(at(actual), Default::default());
        m
    }

    fn pending(planned: NaiveDate) -> Milestone {
        let mut m = Milestone::new(MilestoneKind::Quotation, 2);
        m.planned_date = Some(planned);
        m
    }

    #[test]
    fn completed_thresholds() {
        let calc = SlaCalculator::default();
        let cases = [
            (-3, SlaStatus::OnTime),
            (0, SlaStatus::OnTime),
            (1, SlaStatus::Warning),
            (2, SlaStatus::Warning),
            (3, SlaStatus::Delayed),
        ];
        for (delta, expected) in cases {
            let m = completed(d0(), d0() + Duration::days(delta));
            let r = calc.classify(&m, false, at(d0() + Duration::days(30)));
            assert_eq!(r.status, expected, "delta {delta}");
            assert_eq!(r.days_delta, Some(delta));
        }
    }

    #[test]
    fn pending_current_thresholds() {
        let calc = SlaCalculator::default();
        let m = pending(d0());
        let cases = [
            (1, SlaStatus::Delayed, -1),
            (0, SlaStatus::Warning, 0),
            (-2, SlaStatus::Warning, 2),
            (-3, SlaStatus::OnTime, 3),
        ];
        for (offset, expected, delta) in cases {
            let r = calc.classify(&m, true, at(d0() + Duration::days(offset)));
            assert_eq!(r.status, expected, "offset {offset}");
            assert_eq!(r.days_delta, Some(delta));
        }
    }

    #[test]
    fn pending_non_current_or_unplanned_is_none() {
        let calc = SlaCalculator::default();
        let now = at(d0() + Duration::days(10));
        assert_eq!(calc.classify(&pending(d0()), false, now), SlaReading::NONE);
        let unplanned = Milestone::new(MilestoneKind::Quotation, 2);
        assert_eq!(calc.classify(&unplanned, true, now), SlaReading::NONE);
    }

    #[test]
    fn classify_is_deterministic() {
        let calc = SlaCalculator::default();
        let m = pending(d0());
        let now = at(d0() + Duration::days(2));
        assert_eq!(calc.classify(&m, true, now), calc.classify(&m, true, now));
    }

    #[test]
    fn time_of_day_does_not_shift_delta() {
        let calc = SlaCalculator::default();
        let m = pending(d0());
        let late_evening = Utc.from_utc_datetime(&d0().and_hms_opt(23, 59, 0).unwrap());
        assert_eq!(calc.classify(&m, true, late_evening).days_delta, Some(0));
    }

    #[test]
    fn wider_window_from_config() {
        let calc = SlaCalculator::new(4);
        let m = completed(d0(), d0() + Duration::days(4));
        assert_eq!(calc.classify(&m, false, at(d0())).status, SlaStatus::Warning);
    }

    #[test]
    fn compliance_vacuous_is_100() {
        let calc = SlaCalculator::default();
        assert_eq!(calc.aggregate_compliance(&[]), 100);
        assert_eq!(calc.aggregate_compliance(&[pending(d0())]), 100);
    }

    #[test]
    fn compliance_rounds() {
        let calc = SlaCalculator::default();
        let ms = [
            completed(d0(), d0()),
            completed(d0(), d0() - Duration::days(1)),
            completed(d0(), d0() + Duration::days(1)),
        ];
        assert_eq!(calc.aggregate_compliance(&ms), 67);
    }

    #[test]
    fn rounded_percent_half_up() {
        assert_eq!(rounded_percent(1, 8), 13);
        assert_eq!(rounded_percent(1, 3), 33);
        assert_eq!(rounded_percent(14, 14), 100);
        assert_eq!(rounded_percent(0, 14), 0);
    }
}
