use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gridgrant_core_types::{
    ConnectionId, ConnectorId, DataNeedId, DataSourceId, PermissionId, Timeframe,
};

use crate::status::PermissionProcessStatus;

/// Mutable lifecycle record of one permission.
///
/// `start_time` and `expiration_time` are frozen when the timeframe is
/// bound: relative durations are evaluated exactly once, never recomputed
/// on later reads. Mutation happens only through engine-approved
/// transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub id: PermissionId,
    pub data_need_id: DataNeedId,
    pub connection_id: ConnectionId,
    pub status: PermissionProcessStatus,
    pub connector_id: Option<ConnectorId>,
    pub start_time: Option<DateTime<Utc>>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub data_source_id: Option<DataSourceId>,
    /// Detail from the most recent transition, if any.
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PermissionRequest {
    pub fn new(
        data_need_id: DataNeedId,
        connection_id: ConnectionId,
        timeframe: Option<Timeframe>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PermissionId::new(),
            data_need_id,
            connection_id,
            status: PermissionProcessStatus::Created,
            connector_id: None,
            start_time: timeframe.map(|t| t.start),
            expiration_time: timeframe.map(|t| t.end),
            data_source_id: None,
            message: None,
            updated_at: created_at,
        }
    }
}
