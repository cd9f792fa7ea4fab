use thiserror::Error;

use gridgrant_core_types::{GridError, PermissionId};

use crate::status::PermissionProcessStatus;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("permission {0} not found")]
    NotFound(PermissionId),
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: PermissionProcessStatus,
        to: PermissionProcessStatus,
    },
    #[error("accepting a permission requires a non-empty data source id")]
    MissingDataSource,
}

impl From<LifecycleError> for GridError {
    fn from(value: LifecycleError) -> Self {
        GridError::new(value.to_string())
    }
}
