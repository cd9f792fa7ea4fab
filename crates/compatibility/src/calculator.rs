use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use gridgrant_core_types::{Granularity, Timeframe};
use gridgrant_data_needs::{DataNeed, DurationError, GranularityRange};

use crate::metadata::RegionConnectorMetadata;

/// Outcome of evaluating one data need against one connector.
///
/// Produced fresh per (need, connector, now) triple and never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompatibilityResult {
    Supported {
        /// Feasible granularities, sorted finest-first. Never reduced to a
        /// single value; which one wins is a connector-side concern.
        granularities: Vec<Granularity>,
        permission_timeframe: Option<Timeframe>,
        energy_data_timeframe: Option<Timeframe>,
    },
    Unsupported {
        reason: String,
    },
}

impl CompatibilityResult {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    pub fn supports_data_need(&self) -> bool {
        matches!(self, Self::Supported { .. })
    }
}

/// Determines whether `connector` can satisfy `need` at the instant `now`.
///
/// Pure: no clocks, no side effects beyond tracing, safe to call
/// concurrently for any number of (need, connector) pairs.
pub fn check_compatibility(
    need: &DataNeed,
    connector: &RegionConnectorMetadata,
    now: DateTime<Utc>,
) -> CompatibilityResult {
    if !need.enabled {
        return refuse(need, connector, "data need is disabled");
    }

    if let Some(filter) = &need.connector_filter {
        if filter.excludes(&connector.id) {
            return refuse(
                need,
                connector,
                format!("connector {} is excluded by the data need filter", connector.id),
            );
        }
    }

    if !connector.supported_kinds.contains(&need.kind) {
        let supported = connector
            .supported_kinds
            .iter()
            .map(|kind| format!("{kind:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        return refuse(
            need,
            connector,
            format!(
                "data need kind {:?} not supported, connector supports {supported}",
                need.kind
            ),
        );
    }

    let granularities = match feasible_granularities(need.granularity, connector) {
        Ok(granularities) => granularities,
        Err(reason) => return refuse(need, connector, reason),
    };

    let Some(duration) = &need.duration else {
        // One-shot lookups carry no timeframes at all.
        return CompatibilityResult::Supported {
            granularities,
            permission_timeframe: None,
            energy_data_timeframe: None,
        };
    };

    let window = match connector_window(connector, now) {
        Ok(window) => window,
        Err(err) => return refuse(need, connector, err.to_string()),
    };
    let requested = match duration.resolve(now, connector.time_zone) {
        Ok(resolved) => resolved,
        Err(err) => return refuse(need, connector, err.to_string()),
    };

    // Open sides of the need clamp to the connector window.
    let requested = Timeframe::new(
        requested.start.unwrap_or(window.start),
        requested.end.unwrap_or(window.end),
    );
    let Some(permission_timeframe) = requested.intersect(&window) else {
        return refuse(
            need,
            connector,
            "requested timeframe is outside the connector window",
        );
    };

    // Only the past portion of the window holds measurable data.
    let energy_data_timeframe = if permission_timeframe.start > now {
        None
    } else {
        Some(Timeframe::new(
            permission_timeframe.start,
            permission_timeframe.end.min(now),
        ))
    };

    CompatibilityResult::Supported {
        granularities,
        permission_timeframe: Some(permission_timeframe),
        energy_data_timeframe,
    }
}

fn feasible_granularities(
    range: Option<GranularityRange>,
    connector: &RegionConnectorMetadata,
) -> Result<Vec<Granularity>, String> {
    let Some(range) = range else {
        return Ok(Vec::new());
    };
    // BTreeSet iteration is ascending, which is finest-first in this order.
    let feasible: Vec<Granularity> = connector
        .supported_granularities
        .iter()
        .copied()
        .filter(|g| range.contains(*g))
        .collect();
    if feasible.is_empty() {
        return Err(format!(
            "no supported granularity between {} and {}",
            range.min, range.max
        ));
    }
    Ok(feasible)
}

fn connector_window(
    connector: &RegionConnectorMetadata,
    now: DateTime<Utc>,
) -> Result<Timeframe, DurationError> {
    let local_now = now.with_timezone(&connector.time_zone);
    let start = connector.earliest_start.apply_to(local_now)?;
    let end = connector.latest_end.apply_to(local_now)?;
    Ok(Timeframe::new(
        start.with_timezone(&Utc),
        end.with_timezone(&Utc),
    ))
}

fn refuse(
    need: &DataNeed,
    connector: &RegionConnectorMetadata,
    reason: impl Into<String>,
) -> CompatibilityResult {
    let reason = reason.into();
    debug!(
        target: "gridgrant-compatibility",
        need = %need.id.0,
        connector = %connector.id,
        %reason,
        "data need not supported"
    );
    CompatibilityResult::Unsupported { reason }
}
