//! Fan-out of authentication statuses to observers.
//!
//! Every subscriber gets its own unbounded queue, so a slow observer never
//! drops or coalesces statuses and always sees them in publish order.

use std::sync::{Arc, Mutex, MutexGuard};

use authflow_core::{AppError, AppResult};
use authflow_domain::AuthStatus;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Default)]
struct BusState {
    current: AuthStatus,
    subscribers: Vec<UnboundedSender<AuthStatus>>,
}

/// Broadcasts the current authentication status and every replacement.
#[derive(Clone, Default)]
pub(crate) struct AuthStatusBus {
    state: Arc<Mutex<BusState>>,
}

impl AuthStatusBus {
    /// Creates a bus holding [`AuthStatus::Uninitialized`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to the status sequence.
    ///
    /// The subscription first yields the status current at the time of the
    /// call, then every status published afterwards.
    pub fn subscribe(&self) -> AppResult<AuthStatusSubscription> {
        let mut state = self.lock_state()?;
        let (sender, receiver) = mpsc::unbounded_channel();
        // Receiver is alive here, so the send cannot fail.
        let _ = sender.send(state.current.clone());
        state.subscribers.push(sender);

        Ok(AuthStatusSubscription { receiver })
    }

    /// Replaces the current status and delivers it to all live subscribers.
    pub fn publish(&self, status: AuthStatus) -> AppResult<()> {
        let mut state = self.lock_state()?;
        state
            .subscribers
            .retain(|subscriber| subscriber.send(status.clone()).is_ok());
        state.current = status;

        Ok(())
    }

    /// Returns the most recently published status.
    pub fn current(&self) -> AppResult<AuthStatus> {
        Ok(self.lock_state()?.current.clone())
    }

    fn lock_state(&self) -> AppResult<MutexGuard<'_, BusState>> {
        self.state.lock().map_err(|error| {
            AppError::Internal(format!("failed to lock auth status bus state: {error}"))
        })
    }
}

/// Ordered stream of statuses for a single observer.
#[derive(Debug)]
pub struct AuthStatusSubscription {
    receiver: UnboundedReceiver<AuthStatus>,
}

impl AuthStatusSubscription {
    /// Waits for the next status. Returns `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<AuthStatus> {
        self.receiver.recv().await
    }

    /// Returns the next already-delivered status without waiting.
    pub fn try_next(&mut self) -> Option<AuthStatus> {
        self.receiver.try_recv().ok()
    }

    /// Drains every status delivered so far.
    pub fn drain(&mut self) -> Vec<AuthStatus> {
        let mut statuses = Vec::new();
        while let Some(status) = self.try_next() {
            statuses.push(status);
        }

        statuses
    }
}
