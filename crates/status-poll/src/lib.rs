//! Client-side polling of permission status.
//!
//! Permission administrators rarely push; the eligible party asks. Each
//! observed permission gets its own cancellable task that fetches the
//! current status through the [`StatusFetch`] seam, notifies on every
//! change, and stops on terminal statuses or after too many consecutive
//! fetch failures.

mod fetch;
mod poller;

pub use fetch::{PollError, StatusFetch};
pub use poller::{PollNotice, PollResume, PollerConfig, PollerHandle, StatusPoller};
