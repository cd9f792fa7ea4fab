use serde::{Deserialize, Serialize};

use gridgrant_core_types::DataSourceId;

use crate::status::PermissionProcessStatus;

/// Fixed vocabulary of external events driving lifecycle transitions.
///
/// Connectors translate their own wire protocols (webhooks, polling
/// responses, national document formats) into these variants; the engine
/// never sees connector-specific payloads. Events arrive over at-least-once
/// channels, so delivery of the same event twice must be harmless.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PermissionEvent {
    Validated,
    Malformed { reason: String },
    UnableToSend { reason: String },
    SentToPermissionAdministrator,
    Accepted { data_source_id: DataSourceId },
    Rejected,
    Invalid { reason: String },
    TimedOut,
    Unfulfillable { reason: String },
    WaitingForStart,
    StreamingStarted,
    ExpirationReached,
    TerminatedByAuthority { reason: String },
    ExternalTerminationRequired,
    ExternallyTerminated,
    TerminationFailed { reason: String },
    RevocationReceived,
    Revoked,
    FailedToStart { reason: String },
}

impl PermissionEvent {
    /// The status this event drives the permission into.
    pub fn target_status(&self) -> PermissionProcessStatus {
        match self {
            PermissionEvent::Validated => PermissionProcessStatus::Validated,
            PermissionEvent::Malformed { .. } => PermissionProcessStatus::Malformed,
            PermissionEvent::UnableToSend { .. } => PermissionProcessStatus::UnableToSend,
            PermissionEvent::SentToPermissionAdministrator => {
                PermissionProcessStatus::SentToPermissionAdministrator
            }
            PermissionEvent::Accepted { .. } => PermissionProcessStatus::Accepted,
            PermissionEvent::Rejected => PermissionProcessStatus::Rejected,
            PermissionEvent::Invalid { .. } => PermissionProcessStatus::Invalid,
            PermissionEvent::TimedOut => PermissionProcessStatus::TimedOut,
            PermissionEvent::Unfulfillable { .. } => PermissionProcessStatus::Unfulfillable,
            PermissionEvent::WaitingForStart => PermissionProcessStatus::WaitingForStart,
            PermissionEvent::StreamingStarted => PermissionProcessStatus::StreamingData,
            PermissionEvent::ExpirationReached => PermissionProcessStatus::Fulfilled,
            PermissionEvent::TerminatedByAuthority { .. } => PermissionProcessStatus::Terminated,
            PermissionEvent::ExternalTerminationRequired => {
                PermissionProcessStatus::RequiresExternalTermination
            }
            PermissionEvent::ExternallyTerminated => PermissionProcessStatus::ExternallyTerminated,
            PermissionEvent::TerminationFailed { .. } => PermissionProcessStatus::FailedToTerminate,
            PermissionEvent::RevocationReceived => PermissionProcessStatus::RevocationReceived,
            PermissionEvent::Revoked => PermissionProcessStatus::Revoked,
            PermissionEvent::FailedToStart { .. } => PermissionProcessStatus::FailedToStart,
        }
    }

    /// Human-readable detail carried by the event, surfaced in status reports.
    pub fn detail(&self) -> Option<&str> {
        match self {
            PermissionEvent::Malformed { reason }
            | PermissionEvent::UnableToSend { reason }
            | PermissionEvent::Invalid { reason }
            | PermissionEvent::Unfulfillable { reason }
            | PermissionEvent::TerminatedByAuthority { reason }
            | PermissionEvent::TerminationFailed { reason }
            | PermissionEvent::FailedToStart { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn data_source(&self) -> Option<&DataSourceId> {
        match self {
            PermissionEvent::Accepted { data_source_id } => Some(data_source_id),
            _ => None,
        }
    }
}
