use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Shared error type used at the seams between GridGrant crates.
#[derive(Debug, Error, Clone)]
pub enum GridError {
    #[error("{message}")]
    Message { message: String },
}

impl GridError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Identifier of one permission instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PermissionId(pub Uuid);

impl PermissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DataNeedId(pub String);

impl DataNeedId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Ties a permission request to the originating interaction.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Identifier of one regional authority ("connector").
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectorId(pub String);

impl ConnectorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of the data source bound to a permission on acceptance.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DataSourceId(pub String);

impl DataSourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Measurement interval, ordered finest to coarsest.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Granularity {
    Pt5m,
    Pt10m,
    Pt15m,
    Pt30m,
    Pt1h,
    P1d,
    P1m,
    P1y,
}

impl Granularity {
    /// All granularities in ascending (finest-first) order.
    pub const ALL: [Granularity; 8] = [
        Granularity::Pt5m,
        Granularity::Pt10m,
        Granularity::Pt15m,
        Granularity::Pt30m,
        Granularity::Pt1h,
        Granularity::P1d,
        Granularity::P1m,
        Granularity::P1y,
    ];

    pub fn as_iso8601(&self) -> &'static str {
        match self {
            Granularity::Pt5m => "PT5M",
            Granularity::Pt10m => "PT10M",
            Granularity::Pt15m => "PT15M",
            Granularity::Pt30m => "PT30M",
            Granularity::Pt1h => "PT1H",
            Granularity::P1d => "P1D",
            Granularity::P1m => "P1M",
            Granularity::P1y => "P1Y",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_iso8601())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown granularity: {0}")]
pub struct ParseGranularityError(pub String);

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_iso8601().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseGranularityError(s.to_string()))
    }
}

impl Serialize for Granularity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_iso8601())
    }
}

impl<'de> Deserialize<'de> for Granularity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyType {
    Electricity,
    Gas,
    Heat,
}

/// Closed interval of concrete instants.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Timeframe {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Timeframe {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Overlap of two timeframes, `None` when they do not intersect.
    pub fn intersect(&self, other: &Timeframe) -> Option<Timeframe> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start > end {
            return None;
        }
        Some(Timeframe { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn granularity_order_is_finest_first() {
        assert!(Granularity::Pt5m < Granularity::Pt15m);
        assert!(Granularity::Pt1h < Granularity::P1d);
        assert!(Granularity::P1m < Granularity::P1y);
        let mut sorted = Granularity::ALL;
        sorted.sort();
        assert_eq!(sorted, Granularity::ALL);
    }

    #[test]
    fn granularity_round_trips_through_iso_labels() {
        for g in Granularity::ALL {
            assert_eq!(g.as_iso8601().parse::<Granularity>(), Ok(g));
        }
        assert!("PT7M".parse::<Granularity>().is_err());
    }

    #[test]
    fn granularity_serializes_as_iso_string() {
        let json = serde_json::to_string(&Granularity::Pt15m).unwrap();
        assert_eq!(json, "\"PT15M\"");
        let back: Granularity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Granularity::Pt15m);
    }

    #[test]
    fn timeframe_intersection() {
        let a = Timeframe::new(utc(2024, 1, 1), utc(2024, 6, 1));
        let b = Timeframe::new(utc(2024, 3, 1), utc(2024, 9, 1));
        let overlap = a.intersect(&b).unwrap();
        assert_eq!(overlap.start, utc(2024, 3, 1));
        assert_eq!(overlap.end, utc(2024, 6, 1));
    }

    #[test]
    fn disjoint_timeframes_do_not_intersect() {
        let a = Timeframe::new(utc(2024, 1, 1), utc(2024, 2, 1));
        let b = Timeframe::new(utc(2024, 3, 1), utc(2024, 4, 1));
        assert!(a.intersect(&b).is_none());
    }
}
