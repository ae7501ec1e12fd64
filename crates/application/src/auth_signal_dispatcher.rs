//! Queue-backed signal intake for [`AuthController`].
//!
//! UI code usually fires signals from callbacks that cannot await the
//! outcome. The dispatcher funnels every signal through one worker task so
//! they are handled strictly in submission order.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use authflow_core::{AppError, AppResult};
use authflow_domain::{AuthSignal, AuthStatus};

use crate::AuthController;

struct QueuedSignal {
    signal: AuthSignal,
    reply: Option<oneshot::Sender<AppResult<AuthStatus>>>,
}

/// Cloneable handle that enqueues signals for the controller worker.
#[derive(Clone)]
pub struct AuthSignalDispatcher {
    sender: mpsc::UnboundedSender<QueuedSignal>,
}

impl AuthSignalDispatcher {
    /// Starts the worker task on the current runtime.
    ///
    /// The worker exits once every dispatcher handle has been dropped and
    /// the queue is drained; the returned handle resolves at that point.
    #[must_use]
    pub fn spawn(controller: AuthController) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(controller, receiver));

        (Self { sender }, worker)
    }

    /// Enqueues a signal and waits for its processing result.
    pub async fn dispatch(&self, signal: AuthSignal) -> AppResult<AuthStatus> {
        let (reply, response) = oneshot::channel();
        self.enqueue(QueuedSignal {
            signal,
            reply: Some(reply),
        })?;

        response.await.map_err(|_| {
            AppError::Internal(format!(
                "auth signal worker stopped before answering '{signal}'"
            ))
        })?
    }

    /// Enqueues a signal without waiting. Processing failures are logged.
    pub fn submit(&self, signal: AuthSignal) -> AppResult<()> {
        self.enqueue(QueuedSignal {
            signal,
            reply: None,
        })
    }

    fn enqueue(&self, queued: QueuedSignal) -> AppResult<()> {
        let signal = queued.signal;
        self.sender.send(queued).map_err(|_| {
            AppError::Internal(format!("auth signal queue is closed, dropped '{signal}'"))
        })
    }
}

async fn run_worker(
    controller: AuthController,
    mut receiver: mpsc::UnboundedReceiver<QueuedSignal>,
) {
    while let Some(QueuedSignal { signal, reply }) = receiver.recv().await {
        let result = controller.process(signal).await;

        match reply {
            Some(reply) => {
                if reply.send(result).is_err() {
                    debug!(signal = %signal, "auth signal caller went away before the reply");
                }
            }
            None => {
                if let Err(error) = result {
                    warn!(signal = %signal, error = %error, "queued auth signal failed");
                }
            }
        }
    }

    debug!("auth signal queue closed, worker stopping");
}
