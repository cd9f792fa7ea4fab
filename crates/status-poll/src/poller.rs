use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use gridgrant_lifecycle::{PermissionProcessStatus, StatusReport};

use crate::fetch::StatusFetch;

/// Timing and failure budget for one polling task. All values are explicit;
/// there are no ambient deadlines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollerConfig {
    /// Wait between successful fetches.
    pub poll_interval: Duration,
    /// Wait after a failed fetch before trying again.
    pub retry_interval: Duration,
    /// Consecutive failures tolerated before the task gives up. A successful
    /// fetch restores the full budget.
    pub max_retries: u32,
}

/// What the poller observed. Delivered in order on the handle's channel.
pub enum PollNotice {
    /// The fetched status differs from the last-observed one.
    StatusChanged(StatusReport),
    /// A terminal status was reached; this is the final notice and the task
    /// has stopped.
    Finished(StatusReport),
    /// The retry budget ran out. The task has stopped; polling can be picked
    /// up again from the carried resume point.
    Exhausted(PollResume),
}

impl fmt::Debug for PollNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollNotice::StatusChanged(report) => {
                f.debug_tuple("StatusChanged").field(report).finish()
            }
            PollNotice::Finished(report) => f.debug_tuple("Finished").field(report).finish(),
            PollNotice::Exhausted(resume) => f.debug_tuple("Exhausted").field(resume).finish(),
        }
    }
}

/// Resume point handed out when a poller exhausts its retry budget.
///
/// Resuming continues from the last-observed status: the status already
/// notified is not notified again, and the flow is not replayed from the
/// beginning.
pub struct PollResume {
    fetcher: Box<dyn StatusFetch>,
    last_observed: Option<PermissionProcessStatus>,
}

impl PollResume {
    pub fn last_observed(&self) -> Option<PermissionProcessStatus> {
        self.last_observed
    }
}

impl fmt::Debug for PollResume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollResume")
            .field("last_observed", &self.last_observed)
            .finish_non_exhaustive()
    }
}

/// Handle to one running polling task.
pub struct PollerHandle {
    cancel: CancellationToken,
    notices: mpsc::Receiver<PollNotice>,
}

impl PollerHandle {
    /// Next notice, or `None` once the task has stopped and drained.
    pub async fn recv(&mut self) -> Option<PollNotice> {
        self.notices.recv().await
    }

    /// Stops the task promptly, interrupting in-flight waits. Nothing is
    /// emitted after cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct StatusPoller;

impl StatusPoller {
    /// Starts polling a fresh permission. The first fetched status always
    /// counts as a change.
    pub fn spawn<F>(fetcher: F, config: PollerConfig) -> PollerHandle
    where
        F: StatusFetch + 'static,
    {
        Self::spawn_from(Box::new(fetcher), config, None)
    }

    /// Continues a polling task that previously exhausted its retry budget.
    pub fn resume(resume: PollResume, config: PollerConfig) -> PollerHandle {
        Self::spawn_from(resume.fetcher, config, resume.last_observed)
    }

    fn spawn_from(
        fetcher: Box<dyn StatusFetch>,
        config: PollerConfig,
        last_observed: Option<PermissionProcessStatus>,
    ) -> PollerHandle {
        let cancel = CancellationToken::new();
        let (tx, notices) = mpsc::channel(16);
        let token = cancel.clone();
        tokio::spawn(poll_loop(fetcher, config, last_observed, token, tx));
        PollerHandle { cancel, notices }
    }
}

async fn poll_loop(
    fetcher: Box<dyn StatusFetch>,
    config: PollerConfig,
    mut last_observed: Option<PermissionProcessStatus>,
    cancel: CancellationToken,
    tx: mpsc::Sender<PollNotice>,
) {
    let mut retries_left = config.max_retries;
    loop {
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return,
            fetched = fetcher.fetch_status() => fetched,
        };

        match fetched {
            Ok(report) => {
                retries_left = config.max_retries;
                if last_observed != Some(report.status) {
                    last_observed = Some(report.status);
                    if report.status.is_terminal() {
                        debug!(
                            target: "gridgrant-status-poll",
                            status = ?report.status,
                            "terminal status reached, polling stops"
                        );
                        let _ = tx.send(PollNotice::Finished(report)).await;
                        return;
                    }
                    debug!(
                        target: "gridgrant-status-poll",
                        status = ?report.status,
                        "status changed"
                    );
                    if tx.send(PollNotice::StatusChanged(report)).await.is_err() {
                        return;
                    }
                } else if report.status.is_terminal() {
                    // Resumed onto a terminal status already notified.
                    return;
                }
                if !pause(&cancel, config.poll_interval).await {
                    return;
                }
            }
            Err(err) => {
                retries_left = retries_left.saturating_sub(1);
                warn!(
                    target: "gridgrant-status-poll",
                    error = %err,
                    retries_left,
                    "status fetch failed"
                );
                if retries_left == 0 {
                    let _ = tx
                        .send(PollNotice::Exhausted(PollResume {
                            fetcher,
                            last_observed,
                        }))
                        .await;
                    return;
                }
                if !pause(&cancel, config.retry_interval).await {
                    return;
                }
            }
        }
    }
}

/// Cancellable wait. Returns false when cancelled.
async fn pause(cancel: &CancellationToken, interval: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(interval) => true,
    }
}
