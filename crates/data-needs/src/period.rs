use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration as ChronoDuration, Months, TimeZone};
use serde::{Deserialize, Serialize};

use crate::duration::DurationError;

/// Signed ISO-8601 period such as `-P1Y`, `P3M10D` or `PT15M`.
///
/// Each field is independently optional in the textual form and additive when
/// applied to an instant. The sign applies to the period as a whole.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct IsoPeriod {
    pub negative: bool,
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl IsoPeriod {
    /// Applies this period to `at`, keeping the zone of the input.
    ///
    /// Calendar fields (years, months) are applied first with end-of-month
    /// clamping, then the fixed-length remainder.
    pub fn apply_to<Tz: TimeZone>(&self, at: DateTime<Tz>) -> Result<DateTime<Tz>, DurationError> {
        let months = Months::new(self.years.saturating_mul(12).saturating_add(self.months));
        let shifted = if self.negative {
            at.checked_sub_months(months)
        } else {
            at.checked_add_months(months)
        }
        .ok_or_else(|| DurationError::Resolution("month arithmetic out of range".to_string()))?;

        let rest = ChronoDuration::days(i64::from(self.days))
            + ChronoDuration::hours(i64::from(self.hours))
            + ChronoDuration::minutes(i64::from(self.minutes))
            + ChronoDuration::seconds(i64::from(self.seconds));
        let shifted = if self.negative {
            shifted.checked_sub_signed(rest)
        } else {
            shifted.checked_add_signed(rest)
        }
        .ok_or_else(|| DurationError::Resolution("duration arithmetic out of range".to_string()))?;
        Ok(shifted)
    }

    fn is_zero(&self) -> bool {
        self.years == 0
            && self.months == 0
            && self.days == 0
            && self.hours == 0
            && self.minutes == 0
            && self.seconds == 0
    }
}

impl FromStr for IsoPeriod {
    type Err = DurationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parse_err = || DurationError::Parse(raw.to_string());
        let mut rest = raw.trim();

        let negative = rest.starts_with('-');
        if negative || rest.starts_with('+') {
            rest = &rest[1..];
        }
        rest = rest.strip_prefix(['P', 'p']).ok_or_else(parse_err)?;
        if rest.is_empty() {
            return Err(parse_err());
        }

        let mut period = IsoPeriod {
            negative,
            ..IsoPeriod::default()
        };
        let mut in_time = false;
        let mut saw_component = false;
        let mut digits = String::new();

        for ch in rest.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            if (ch == 'T' || ch == 't') && !in_time {
                if !digits.is_empty() {
                    return Err(parse_err());
                }
                in_time = true;
                continue;
            }
            let value: u32 = digits.parse().map_err(|_| parse_err())?;
            digits.clear();
            let slot = match (ch.to_ascii_uppercase(), in_time) {
                ('Y', false) => &mut period.years,
                ('M', false) => &mut period.months,
                ('W', false) => {
                    period.days = period.days.saturating_add(value.saturating_mul(7));
                    saw_component = true;
                    continue;
                }
                ('D', false) => &mut period.days,
                ('H', true) => &mut period.hours,
                ('M', true) => &mut period.minutes,
                ('S', true) => &mut period.seconds,
                _ => return Err(parse_err()),
            };
            *slot = slot.saturating_add(value);
            saw_component = true;
        }

        if !digits.is_empty() || !saw_component {
            return Err(parse_err());
        }
        // Normalize "-P0D" to the unsigned zero period.
        if period.is_zero() {
            period.negative = false;
        }
        Ok(period)
    }
}

impl fmt::Display for IsoPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("P0D");
        }
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str("P")?;
        if self.years > 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months > 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0 {
            f.write_str("T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0 {
                write!(f, "{}S", self.seconds)?;
            }
        }
        Ok(())
    }
}

impl Serialize for IsoPeriod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IsoPeriod {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
