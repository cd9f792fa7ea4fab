use serde::{Deserialize, Serialize};

use self::PermissionProcessStatus::*;

/// Canonical lifecycle status of one permission request.
///
/// The set is closed: connectors with richer internal workflows layer
/// private sub-states underneath these and only ever surface the canonical
/// vocabulary.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionProcessStatus {
    Created,
    Validated,
    SentToPermissionAdministrator,
    Accepted,
    WaitingForStart,
    StreamingData,
    RevocationReceived,
    RequiresExternalTermination,
    // Terminal statuses.
    Rejected,
    Invalid,
    TimedOut,
    Revoked,
    Fulfilled,
    Terminated,
    ExternallyTerminated,
    FailedToTerminate,
    Malformed,
    UnableToSend,
    Unfulfillable,
    FailedToStart,
}

impl PermissionProcessStatus {
    /// Statuses reachable from this one in a single transition.
    pub fn allowed_next(&self) -> &'static [PermissionProcessStatus] {
        match self {
            Created => &[Validated, Malformed, UnableToSend],
            Validated => &[
                SentToPermissionAdministrator,
                Malformed,
                UnableToSend,
                Unfulfillable,
            ],
            SentToPermissionAdministrator => {
                &[Accepted, Rejected, Invalid, TimedOut, Unfulfillable]
            }
            Accepted => &[WaitingForStart, RevocationReceived, FailedToStart],
            WaitingForStart => &[StreamingData, RevocationReceived, FailedToStart],
            StreamingData => &[
                Fulfilled,
                Terminated,
                RequiresExternalTermination,
                RevocationReceived,
            ],
            RevocationReceived => &[Revoked],
            RequiresExternalTermination => &[ExternallyTerminated, FailedToTerminate],
            Rejected | Invalid | TimedOut | Revoked | Fulfilled | Terminated
            | ExternallyTerminated | FailedToTerminate | Malformed | UnableToSend
            | Unfulfillable | FailedToStart => &[],
        }
    }

    pub fn can_transition_to(&self, next: PermissionProcessStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }
}
