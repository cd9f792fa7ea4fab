use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::period::IsoPeriod;

/// Errors produced while resolving a duration specification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid ISO-8601 period: {0}")]
    Parse(String),
    #[error("resolved start {start} is after resolved end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("duration resolution failed: {0}")]
    Resolution(String),
}

/// Calendar unit a relative start can snap to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarUnit {
    Week,
    Month,
    Year,
}

/// Duration specification of a data need.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Duration {
    /// Concrete instants, returned unchanged by resolution.
    Absolute {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Offsets from an injected evaluation instant. A missing side means
    /// unbounded in that direction.
    Relative {
        start: Option<IsoPeriod>,
        end: Option<IsoPeriod>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sticky_start_calendar_unit: Option<CalendarUnit>,
    },
}

/// Outcome of resolving a [`Duration`]. `None` on a side means that
/// direction is unbounded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResolvedTimeframe {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ResolvedTimeframe {
    pub fn bounded(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

impl Duration {
    /// Resolves this duration against `now`, never the system clock.
    ///
    /// Sticky calendar snapping is evaluated in `zone`, the time zone the
    /// owning connector declares, and mapped back to UTC.
    pub fn resolve(
        &self,
        now: DateTime<Utc>,
        zone: FixedOffset,
    ) -> Result<ResolvedTimeframe, DurationError> {
        let resolved = match self {
            Duration::Absolute { start, end } => ResolvedTimeframe::bounded(*start, *end),
            Duration::Relative {
                start,
                end,
                sticky_start_calendar_unit,
            } => {
                let mut resolved_start = start.map(|offset| offset.apply_to(now)).transpose()?;
                if let (Some(start), Some(unit)) = (resolved_start, sticky_start_calendar_unit) {
                    resolved_start = Some(snap_to_unit_start(start, *unit, zone)?);
                }
                let resolved_end = end.map(|offset| offset.apply_to(now)).transpose()?;
                ResolvedTimeframe {
                    start: resolved_start,
                    end: resolved_end,
                }
            }
        };

        if let (Some(start), Some(end)) = (resolved.start, resolved.end) {
            if start > end {
                return Err(DurationError::Inverted { start, end });
            }
        }
        Ok(resolved)
    }
}

/// Rounds `at` down to the start of the containing calendar unit in `zone`.
///
/// Weeks start Monday 00:00, months on day 1, years on January 1st.
fn snap_to_unit_start(
    at: DateTime<Utc>,
    unit: CalendarUnit,
    zone: FixedOffset,
) -> Result<DateTime<Utc>, DurationError> {
    let local = at.with_timezone(&zone);
    let date = local.date_naive();
    let snapped = match unit {
        CalendarUnit::Week => date
            .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
            .ok_or_else(|| DurationError::Resolution("week snap out of range".to_string()))?,
        CalendarUnit::Month => date
            .with_day(1)
            .ok_or_else(|| DurationError::Resolution("month snap out of range".to_string()))?,
        CalendarUnit::Year => date
            .with_month(1)
            .and_then(|d| d.with_day(1))
            .ok_or_else(|| DurationError::Resolution("year snap out of range".to_string()))?,
    };
    let midnight = snapped.and_time(NaiveTime::MIN);
    zone.from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| DurationError::Resolution("ambiguous local midnight".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn relative(start: &str, end: &str) -> Duration {
        Duration::Relative {
            start: Some(start.parse().unwrap()),
            end: Some(end.parse().unwrap()),
            sticky_start_calendar_unit: None,
        }
    }

    fn sticky(start: &str, end: Option<&str>, unit: CalendarUnit) -> Duration {
        Duration::Relative {
            start: Some(start.parse().unwrap()),
            end: end.map(|e| e.parse().unwrap()),
            sticky_start_calendar_unit: Some(unit),
        }
    }

    fn utc_zone() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    // Reference instant shared by the relative-resolution tests.
    fn reference() -> DateTime<Utc> {
        utc(2024, 4, 10)
    }

    #[test]
    fn absolute_duration_is_returned_unchanged() {
        let duration = Duration::Absolute {
            start: utc(2024, 4, 1),
            end: utc(2024, 4, 25),
        };
        let resolved = duration.resolve(reference(), utc_zone()).unwrap();
        assert_eq!(
            resolved,
            ResolvedTimeframe::bounded(utc(2024, 4, 1), utc(2024, 4, 25))
        );
    }

    #[test]
    fn relative_offsets_are_applied_to_now() {
        let resolved = relative("-P5D", "P18D")
            .resolve(reference(), utc_zone())
            .unwrap();
        assert_eq!(resolved.start, Some(utc(2024, 4, 5)));
        assert_eq!(resolved.end, Some(utc(2024, 4, 28)));
    }

    #[test]
    fn open_sides_stay_unbounded() {
        let duration = Duration::Relative {
            start: None,
            end: None,
            sticky_start_calendar_unit: None,
        };
        let resolved = duration.resolve(reference(), utc_zone()).unwrap();
        assert_eq!(resolved.start, None);
        assert_eq!(resolved.end, None);
    }

    #[test]
    fn sticky_week_snaps_to_monday() {
        // 2024-04-05 is a Friday; the containing week starts Monday the 1st.
        let resolved = sticky("-P5D", None, CalendarUnit::Week)
            .resolve(reference(), utc_zone())
            .unwrap();
        assert_eq!(resolved.start, Some(utc(2024, 4, 1)));
        assert_eq!(resolved.end, None);
    }

    #[test]
    fn sticky_month_snaps_to_first_day() {
        let resolved = sticky("-P15D", Some("P18D"), CalendarUnit::Month)
            .resolve(reference(), utc_zone())
            .unwrap();
        assert_eq!(resolved.start, Some(utc(2024, 3, 1)));
        assert_eq!(resolved.end, Some(utc(2024, 4, 28)));
    }

    #[test]
    fn sticky_year_always_lands_on_january_first() {
        for start in ["-P15D", "-P3M10D", "-P1M"] {
            let resolved = sticky(start, Some("P18D"), CalendarUnit::Year)
                .resolve(reference(), utc_zone())
                .unwrap();
            assert_eq!(resolved.start, Some(utc(2024, 1, 1)), "offset {start}");
        }
    }

    #[test]
    fn sticky_snap_honors_the_declared_zone() {
        // 2024-04-01 00:30 UTC is still 2024-03-31 in UTC-2, so the
        // containing month starts March 1st in that zone.
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 0, 30, 0).unwrap();
        let zone = FixedOffset::west_opt(2 * 3600).unwrap();
        let duration = sticky("P0D", None, CalendarUnit::Month);
        let resolved = duration.resolve(now, zone).unwrap();
        let expected = zone
            .with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(resolved.start, Some(expected));
    }

    #[test]
    fn inverted_resolution_is_rejected() {
        let err = relative("P5D", "-P5D")
            .resolve(reference(), utc_zone())
            .unwrap_err();
        assert!(matches!(err, DurationError::Inverted { .. }));
    }

    #[test]
    fn snapping_only_moves_the_start() {
        let resolved = sticky("-P5D", Some("P2D"), CalendarUnit::Year)
            .resolve(reference(), utc_zone())
            .unwrap();
        assert_eq!(resolved.start, Some(utc(2024, 1, 1)));
        assert_eq!(resolved.end, Some(utc(2024, 4, 12)));
    }
}
