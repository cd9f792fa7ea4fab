mod engine;
mod error;
mod event;
mod request;
mod status;

pub use engine::{PermissionEngine, StatusChanged, StatusReport, TransitionOutcome};
pub use error::LifecycleError;
pub use event::PermissionEvent;
pub use request::PermissionRequest;
pub use status::PermissionProcessStatus;
