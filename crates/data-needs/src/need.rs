use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gridgrant_core_types::{ConnectorId, DataNeedId, EnergyType, Granularity};

use crate::duration::Duration;

/// Errors raised while constructing a [`DataNeed`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataNeedError {
    #[error("data need kind {0:?} requires a duration")]
    MissingDuration(DataNeedKind),
    #[error("data need kind {0:?} never carries a duration")]
    UnexpectedDuration(DataNeedKind),
    #[error("min granularity {min} is coarser than max granularity {max}")]
    InvertedGranularity { min: Granularity, max: Granularity },
    #[error("invalid transmission schedule: {0}")]
    InvalidSchedule(String),
}

/// Closed set of data need categories.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataNeedKind {
    /// One-shot accounting point lookup, never timeframed.
    AccountingPoint,
    ValidatedHistorical,
    InboundNearRealTime,
    OutboundNearRealTime,
}

impl DataNeedKind {
    /// A kind either always carries a duration or never does.
    pub fn requires_timeframe(&self) -> bool {
        !matches!(self, DataNeedKind::AccountingPoint)
    }

    pub fn requires_granularity(&self) -> bool {
        matches!(self, DataNeedKind::ValidatedHistorical)
    }
}

/// Inclusive granularity bounds, `min <= max` in the defined total order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GranularityRange {
    pub min: Granularity,
    pub max: Granularity,
}

impl GranularityRange {
    pub fn new(min: Granularity, max: Granularity) -> Result<Self, DataNeedError> {
        if min > max {
            return Err(DataNeedError::InvertedGranularity { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, granularity: Granularity) -> bool {
        self.min <= granularity && granularity <= self.max
    }
}

/// Restricts which connectors a need may be evaluated against.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "connector_ids", rename_all = "snake_case")]
pub enum ConnectorFilter {
    Allowlist(BTreeSet<ConnectorId>),
    Blocklist(BTreeSet<ConnectorId>),
}

impl ConnectorFilter {
    pub fn excludes(&self, id: &ConnectorId) -> bool {
        match self {
            ConnectorFilter::Allowlist(ids) => !ids.contains(id),
            ConnectorFilter::Blocklist(ids) => ids.contains(id),
        }
    }
}

/// Immutable specification of requested data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataNeed {
    pub id: DataNeedId,
    pub kind: DataNeedKind,
    pub energy_type: EnergyType,
    pub duration: Option<Duration>,
    pub granularity: Option<GranularityRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission_schedule: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub data_tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_filter: Option<ConnectorFilter>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl DataNeed {
    pub fn new(
        id: DataNeedId,
        kind: DataNeedKind,
        energy_type: EnergyType,
        duration: Option<Duration>,
        granularity: Option<GranularityRange>,
    ) -> Result<Self, DataNeedError> {
        match (kind.requires_timeframe(), &duration) {
            (true, None) => return Err(DataNeedError::MissingDuration(kind)),
            (false, Some(_)) => return Err(DataNeedError::UnexpectedDuration(kind)),
            _ => {}
        }
        Ok(Self {
            id,
            kind,
            energy_type,
            duration,
            granularity,
            transmission_schedule: None,
            data_tags: BTreeSet::new(),
            connector_filter: None,
            enabled: true,
        })
    }

    /// Attaches a cron-like transmission schedule, validated for shape only.
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Result<Self, DataNeedError> {
        let schedule = schedule.into();
        let fields = schedule.split_whitespace().count();
        if !(5..=6).contains(&fields) {
            return Err(DataNeedError::InvalidSchedule(schedule));
        }
        self.transmission_schedule = Some(schedule);
        Ok(self)
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.data_tags = tags.into_iter().collect();
        self
    }

    pub fn with_connector_filter(mut self, filter: ConnectorFilter) -> Self {
        self.connector_filter = Some(filter);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated_historical() -> DataNeed {
        DataNeed::new(
            DataNeedId::new("need-1"),
            DataNeedKind::ValidatedHistorical,
            EnergyType::Electricity,
            Some(Duration::Relative {
                start: Some("-P1Y".parse().unwrap()),
                end: None,
                sticky_start_calendar_unit: None,
            }),
            Some(GranularityRange::new(Granularity::Pt15m, Granularity::P1d).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn timeframed_kind_requires_duration() {
        let err = DataNeed::new(
            DataNeedId::new("need-2"),
            DataNeedKind::ValidatedHistorical,
            EnergyType::Electricity,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DataNeedError::MissingDuration(DataNeedKind::ValidatedHistorical)
        );
    }

    #[test]
    fn accounting_point_rejects_duration() {
        let err = DataNeed::new(
            DataNeedId::new("need-3"),
            DataNeedKind::AccountingPoint,
            EnergyType::Electricity,
            Some(Duration::Relative {
                start: None,
                end: None,
                sticky_start_calendar_unit: None,
            }),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DataNeedError::UnexpectedDuration(DataNeedKind::AccountingPoint)
        );
    }

    #[test]
    fn granularity_range_must_be_ordered() {
        let err = GranularityRange::new(Granularity::P1d, Granularity::Pt15m).unwrap_err();
        assert!(matches!(err, DataNeedError::InvertedGranularity { .. }));

        let range = GranularityRange::new(Granularity::Pt15m, Granularity::Pt15m).unwrap();
        assert!(range.contains(Granularity::Pt15m));
        assert!(!range.contains(Granularity::Pt30m));
    }

    #[test]
    fn allowlist_excludes_unlisted_connectors() {
        let filter = ConnectorFilter::Allowlist(
            [ConnectorId::new("at-eda")].into_iter().collect(),
        );
        assert!(!filter.excludes(&ConnectorId::new("at-eda")));
        assert!(filter.excludes(&ConnectorId::new("fr-enedis")));

        let filter = ConnectorFilter::Blocklist(
            [ConnectorId::new("at-eda")].into_iter().collect(),
        );
        assert!(filter.excludes(&ConnectorId::new("at-eda")));
        assert!(!filter.excludes(&ConnectorId::new("fr-enedis")));
    }

    #[test]
    fn schedule_shape_is_validated() {
        let need = validated_historical();
        assert!(need.clone().with_schedule("0 */15 * * * *").is_ok());
        assert!(matches!(
            need.with_schedule("every day"),
            Err(DataNeedError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn serde_round_trip() {
        let need = validated_historical().with_tags(vec!["AT0030000000000000000000000001".into()]);
        let json = serde_json::to_string(&need).unwrap();
        let back: DataNeed = serde_json::from_str(&json).unwrap();
        assert_eq!(back, need);
    }
}
