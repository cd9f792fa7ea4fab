use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use gridgrant_core_types::{
    ConnectionId, ConnectorId, DataNeedId, DataSourceId, PermissionId, Timeframe,
};

use crate::error::LifecycleError;
use crate::event::PermissionEvent;
use crate::request::PermissionRequest;
use crate::status::PermissionProcessStatus;

/// Emitted once per successful transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub permission_id: PermissionId,
    pub from: PermissionProcessStatus,
    pub to: PermissionProcessStatus,
    pub timestamp: DateTime<Utc>,
}

/// Observer-facing view of one permission, served to pollers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: PermissionProcessStatus,
    pub message: Option<String>,
    pub additional_information: Option<String>,
}

/// What happened to a delivered external event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was applied and a [`StatusChanged`] event emitted.
    Applied(StatusChanged),
    /// The permission was already in the event's target status; re-delivery
    /// over an at-least-once channel, nothing emitted.
    AlreadyApplied,
    /// The permission is terminal; the late event was dropped, nothing
    /// emitted.
    Discarded,
}

/// Owns the lifecycle of all permission instances.
///
/// Transitions for one permission id are serialized behind a per-id async
/// mutex; permissions with different ids proceed fully in parallel.
pub struct PermissionEngine {
    requests: DashMap<PermissionId, Arc<Mutex<PermissionRequest>>>,
    events: broadcast::Sender<StatusChanged>,
}

impl PermissionEngine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(128);
        Self {
            requests: DashMap::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusChanged> {
        self.events.subscribe()
    }

    /// Registers a new permission in `Created`.
    ///
    /// When a timeframe is given (resolved once from a compatibility
    /// result), the start and expiration instants are frozen here and never
    /// recomputed.
    pub fn create(
        &self,
        data_need_id: DataNeedId,
        connection_id: ConnectionId,
        timeframe: Option<Timeframe>,
    ) -> PermissionId {
        let request = PermissionRequest::new(data_need_id, connection_id, timeframe, Utc::now());
        let id = request.id;
        self.requests.insert(id, Arc::new(Mutex::new(request)));
        debug!(target: "gridgrant-lifecycle", permission = %id, "permission created");
        id
    }

    /// Binds the connector chosen for this permission. Not a transition.
    pub async fn assign_connector(
        &self,
        id: PermissionId,
        connector_id: ConnectorId,
    ) -> Result<(), LifecycleError> {
        let entry = self.entry(id)?;
        let mut request = entry.lock().await;
        request.connector_id = Some(connector_id);
        Ok(())
    }

    /// Delivers an external event translated by a connector.
    ///
    /// Lenient by design: re-delivery of an event whose target status is
    /// already current, or any event arriving in a terminal status, is a
    /// silent no-op. Everything else is held to the transition table.
    pub async fn notify_event(
        &self,
        id: PermissionId,
        event: &PermissionEvent,
    ) -> Result<TransitionOutcome, LifecycleError> {
        let entry = self.entry(id)?;
        let mut request = entry.lock().await;
        let target = event.target_status();

        if request.status == target {
            debug!(
                target: "gridgrant-lifecycle",
                permission = %id,
                status = ?target,
                "duplicate event delivery ignored"
            );
            return Ok(TransitionOutcome::AlreadyApplied);
        }
        if request.status.is_terminal() {
            debug!(
                target: "gridgrant-lifecycle",
                permission = %id,
                status = ?request.status,
                event = ?target,
                "event after terminal status discarded"
            );
            return Ok(TransitionOutcome::Discarded);
        }

        let changed = self.apply(&mut request, event)?;
        Ok(TransitionOutcome::Applied(changed))
    }

    /// Owner operation: accept the request, binding the data source in the
    /// same transition. Strict: guard violations fail.
    pub async fn accept(
        &self,
        id: PermissionId,
        data_source_id: DataSourceId,
    ) -> Result<StatusChanged, LifecycleError> {
        if data_source_id.0.trim().is_empty() {
            return Err(LifecycleError::MissingDataSource);
        }
        self.strict(id, &PermissionEvent::Accepted { data_source_id })
            .await
    }

    /// Owner operation: reject the request. Strict.
    pub async fn reject(&self, id: PermissionId) -> Result<StatusChanged, LifecycleError> {
        self.strict(id, &PermissionEvent::Rejected).await
    }

    /// Owner operation: revoke a granted permission. Strict; only the
    /// active-data statuses allow it.
    pub async fn revoke(&self, id: PermissionId) -> Result<StatusChanged, LifecycleError> {
        self.strict(id, &PermissionEvent::RevocationReceived).await
    }

    /// Marks the permission unfulfillable after every candidate connector
    /// reported the need unsupported.
    pub async fn mark_unfulfillable(
        &self,
        id: PermissionId,
        reason: impl Into<String>,
    ) -> Result<StatusChanged, LifecycleError> {
        self.strict(
            id,
            &PermissionEvent::Unfulfillable {
                reason: reason.into(),
            },
        )
        .await
    }

    /// Current observer-facing status, polled by the status protocol.
    pub async fn get_status(&self, id: PermissionId) -> Result<StatusReport, LifecycleError> {
        let entry = self.entry(id)?;
        let request = entry.lock().await;
        Ok(StatusReport {
            status: request.status,
            message: request.message.clone(),
            additional_information: request
                .data_source_id
                .as_ref()
                .map(|source| format!("data source {}", source.0)),
        })
    }

    /// Full copy of the lifecycle record.
    pub async fn snapshot(&self, id: PermissionId) -> Result<PermissionRequest, LifecycleError> {
        let entry = self.entry(id)?;
        let request = entry.lock().await;
        Ok(request.clone())
    }

    fn entry(&self, id: PermissionId) -> Result<Arc<Mutex<PermissionRequest>>, LifecycleError> {
        self.requests
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(LifecycleError::NotFound(id))
    }

    async fn strict(
        &self,
        id: PermissionId,
        event: &PermissionEvent,
    ) -> Result<StatusChanged, LifecycleError> {
        let entry = self.entry(id)?;
        let mut request = entry.lock().await;
        self.apply(&mut request, event)
    }

    /// Applies one guarded transition and emits its event. Callers hold the
    /// per-id lock.
    fn apply(
        &self,
        request: &mut PermissionRequest,
        event: &PermissionEvent,
    ) -> Result<StatusChanged, LifecycleError> {
        let from = request.status;
        let to = event.target_status();
        if !from.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition { from, to });
        }

        request.status = to;
        request.message = event.detail().map(str::to_string);
        if let Some(source) = event.data_source() {
            request.data_source_id = Some(source.clone());
        }
        let timestamp = Utc::now();
        request.updated_at = timestamp;

        let changed = StatusChanged {
            permission_id: request.id,
            from,
            to,
            timestamp,
        };
        debug!(
            target: "gridgrant-lifecycle",
            permission = %request.id,
            from = ?from,
            to = ?to,
            "status changed"
        );
        // Send errors only mean nobody is subscribed right now.
        let _ = self.events.send(changed.clone());
        Ok(changed)
    }
}

impl Default for PermissionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_request() -> (PermissionEngine, PermissionId) {
        let engine = PermissionEngine::new();
        let id = engine.create(
            DataNeedId::new("need-1"),
            ConnectionId::new("conn-1"),
            None,
        );
        (engine, id)
    }

    #[tokio::test]
    async fn new_permission_starts_created() {
        let (engine, id) = engine_with_request();
        let report = engine.get_status(id).await.unwrap();
        assert_eq!(report.status, PermissionProcessStatus::Created);
        assert_eq!(report.message, None);
    }

    #[tokio::test]
    async fn unknown_permission_is_not_found() {
        let engine = PermissionEngine::new();
        let err = engine.get_status(PermissionId::new()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
    }

    #[tokio::test]
    async fn accept_requires_a_usable_data_source() {
        let (engine, id) = engine_with_request();
        let err = engine
            .accept(id, DataSourceId::new("   "))
            .await
            .unwrap_err();
        assert_eq!(err, LifecycleError::MissingDataSource);
    }

    #[tokio::test]
    async fn assign_connector_does_not_change_status() {
        let (engine, id) = engine_with_request();
        engine
            .assign_connector(id, ConnectorId::new("at-eda"))
            .await
            .unwrap();
        let snapshot = engine.snapshot(id).await.unwrap();
        assert_eq!(snapshot.connector_id, Some(ConnectorId::new("at-eda")));
        assert_eq!(snapshot.status, PermissionProcessStatus::Created);
    }
}
