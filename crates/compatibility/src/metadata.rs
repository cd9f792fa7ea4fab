use std::collections::BTreeSet;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gridgrant_core_types::{ConnectorId, Granularity};
use gridgrant_data_needs::{DataNeedKind, IsoPeriod};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("connector {0} declares no country codes")]
    NoCountryCodes(ConnectorId),
    #[error("connector {0} declares no supported data need kinds")]
    NoSupportedKinds(ConnectorId),
}

/// Descriptor of one regional authority.
///
/// `earliest_start` and `latest_end` are offsets from the evaluation instant
/// bounding how far back and forward data or permissions may reach.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConnectorMetadata {
    pub id: ConnectorId,
    #[serde(with = "offset_serde")]
    pub time_zone: FixedOffset,
    pub country_codes: BTreeSet<String>,
    pub covered_metering_points: u64,
    pub earliest_start: IsoPeriod,
    pub latest_end: IsoPeriod,
    pub supported_granularities: BTreeSet<Granularity>,
    pub supported_kinds: BTreeSet<DataNeedKind>,
}

impl RegionConnectorMetadata {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ConnectorId,
        time_zone: FixedOffset,
        country_codes: BTreeSet<String>,
        covered_metering_points: u64,
        earliest_start: IsoPeriod,
        latest_end: IsoPeriod,
        supported_granularities: BTreeSet<Granularity>,
        supported_kinds: BTreeSet<DataNeedKind>,
    ) -> Result<Self, MetadataError> {
        if country_codes.is_empty() {
            return Err(MetadataError::NoCountryCodes(id));
        }
        if supported_kinds.is_empty() {
            return Err(MetadataError::NoSupportedKinds(id));
        }
        Ok(Self {
            id,
            time_zone,
            country_codes,
            covered_metering_points,
            earliest_start,
            latest_end,
            supported_granularities,
            supported_kinds,
        })
    }
}

/// Serializes the declared zone as its `+HH:MM` offset string.
mod offset_serde {
    use chrono::FixedOffset;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(offset: &FixedOffset, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(offset)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FixedOffset, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
