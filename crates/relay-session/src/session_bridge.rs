//! Cross-context dispatch bridge between HTTP workers and the session task.
//!
//! A submitter enqueues a send request carrying a single-use result slot, then
//! waits on that slot under a bounded timeout. The session task is the only
//! consumer of the queue and drains it in submission order. The queue and the
//! per-request slots are the only state shared across contexts.

use std::time::Duration;

use async_trait::async_trait;
use relay_core::{current_unix_timestamp_ms, RenderedMessage, SendReceipt, SessionSendError};
use tokio::sync::{mpsc, oneshot, watch};

pub const DEFAULT_SEND_QUEUE_DEPTH: usize = 64;
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug)]
/// Ownership-transferred send task: the message plus the slot the session
/// task fulfills exactly once.
pub struct SendRequest {
    pub message: RenderedMessage,
    pub submitted_unix_ms: u64,
    result_tx: oneshot::Sender<Result<SendReceipt, SessionSendError>>,
}

impl SendRequest {
    /// Fulfills the result slot. A waiter that already timed out has dropped
    /// its receiver; the outcome is discarded silently in that case.
    pub fn fulfill(self, outcome: Result<SendReceipt, SessionSendError>) {
        let _ = self.result_tx.send(outcome);
    }
}

#[async_trait]
/// Seam the ingress layer submits through, so tests can substitute a
/// recording double for the live session connection.
pub trait SendSubmitter: Send + Sync {
    async fn submit_send(&self, message: RenderedMessage)
        -> Result<SendReceipt, SessionSendError>;
}

#[derive(Clone)]
/// Submitting half of the bridge. Cheap to clone; all clones feed the same
/// single-consumer queue.
pub struct SessionBridge {
    queue_tx: mpsc::Sender<SendRequest>,
    shutdown_rx: watch::Receiver<bool>,
    send_timeout: Duration,
}

/// Builds a bridge. Returns the submitting half, the queue receiver the
/// session task drains, and the shutdown flag that makes the bridge reject
/// further submissions.
pub fn session_bridge(
    queue_depth: usize,
    send_timeout: Duration,
) -> (
    SessionBridge,
    mpsc::Receiver<SendRequest>,
    watch::Sender<bool>,
) {
    let (queue_tx, queue_rx) = mpsc::channel(queue_depth.max(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let bridge = SessionBridge {
        queue_tx,
        shutdown_rx,
        send_timeout,
    };
    (bridge, queue_rx, shutdown_tx)
}

#[async_trait]
impl SendSubmitter for SessionBridge {
    async fn submit_send(
        &self,
        message: RenderedMessage,
    ) -> Result<SendReceipt, SessionSendError> {
        if *self.shutdown_rx.borrow() {
            return Err(SessionSendError::ShuttingDown);
        }

        let timeout_ms = self.send_timeout.as_millis().min(u64::MAX as u128) as u64;
        let (result_tx, result_rx) = oneshot::channel();
        let request = SendRequest {
            message,
            submitted_unix_ms: current_unix_timestamp_ms(),
            result_tx,
        };

        // The timeout covers both the enqueue (the queue is bounded and may be
        // full while the session is stuck) and the wait for fulfillment.
        let wait = async {
            if self.queue_tx.send(request).await.is_err() {
                return Err(SessionSendError::ShuttingDown);
            }
            match result_rx.await {
                Ok(outcome) => outcome,
                // Session task dropped the request without fulfilling it,
                // which only happens while its loop is tearing down.
                Err(_) => Err(SessionSendError::ShuttingDown),
            }
        };
        match tokio::time::timeout(self.send_timeout, wait).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SessionSendError::Timeout { timeout_ms }),
        }
    }
}
