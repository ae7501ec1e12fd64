//! Authentication lifecycle controller.
//!
//! Reduces [`AuthSignal`]s to [`AuthStatus`] values by consulting the
//! [`IdentityGateway`], and publishes each resulting status to every
//! subscriber. Signals are processed one at a time: a fair async mutex
//! guards processing, so concurrent callers queue in arrival order and each
//! signal publishes its status before the next one starts.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use authflow_core::{AppError, AppResult, NonEmptyString};
use authflow_domain::{AuthSignal, AuthStatus};

use crate::auth_status_bus::AuthStatusBus;
use crate::{AuthStatusSubscription, IdentityGateway};

/// Tuning knobs for [`AuthController`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthControllerConfig {
    /// Upper bound for each gateway query. `None` waits indefinitely.
    pub query_timeout: Option<Duration>,
}

/// Single authentication authority for a running application.
#[derive(Clone)]
pub struct AuthController {
    gateway: Arc<dyn IdentityGateway>,
    status_bus: AuthStatusBus,
    processing: Arc<Mutex<()>>,
    sign_outs: Arc<Mutex<Vec<JoinHandle<()>>>>,
    config: AuthControllerConfig,
}

impl AuthController {
    /// Creates a controller in the [`AuthStatus::Uninitialized`] state.
    #[must_use]
    pub fn new(gateway: Arc<dyn IdentityGateway>) -> Self {
        Self::with_config(gateway, AuthControllerConfig::default())
    }

    /// Creates a controller with explicit configuration.
    #[must_use]
    pub fn with_config(gateway: Arc<dyn IdentityGateway>, config: AuthControllerConfig) -> Self {
        Self {
            gateway,
            status_bus: AuthStatusBus::new(),
            processing: Arc::new(Mutex::new(())),
            sign_outs: Arc::new(Mutex::new(Vec::new())),
            config,
        }
    }

    /// Subscribes to the status sequence, starting with the current status.
    pub fn subscribe(&self) -> AppResult<AuthStatusSubscription> {
        self.status_bus.subscribe()
    }

    /// Returns the current status.
    pub fn current(&self) -> AppResult<AuthStatus> {
        self.status_bus.current()
    }

    /// Processes one signal to completion and returns the published status.
    ///
    /// - `AppStarted` never fails: any gateway error resolves to
    ///   [`AuthStatus::Unauthenticated`].
    /// - `LoggedIn` propagates identity-fetch failures and publishes nothing.
    /// - `LoggedOut` publishes [`AuthStatus::Unauthenticated`] first, then
    ///   launches a sign-out on the runtime without waiting for it.
    pub async fn process(&self, signal: AuthSignal) -> AppResult<AuthStatus> {
        let _processing = self.processing.lock().await;
        debug!(signal = %signal, "processing auth signal");

        match signal {
            AuthSignal::AppStarted => {
                let status = self.resolve_startup_status().await;
                self.publish(signal, status)
            }
            AuthSignal::LoggedIn => {
                let display_name = self.fetch_identity_name().await?;
                self.publish(signal, AuthStatus::authenticated(display_name))
            }
            AuthSignal::LoggedOut => {
                let status = self.publish(signal, AuthStatus::Unauthenticated)?;
                self.spawn_sign_out().await;
                Ok(status)
            }
        }
    }

    /// Waits for every sign-out launched by `LoggedOut` to finish.
    ///
    /// Signal processing never calls this. A UI that starts a new provider
    /// sign-in right after logging out calls it first, so the old sign-out
    /// cannot clear the new session.
    pub async fn settle_sign_outs(&self) {
        let pending = std::mem::take(&mut *self.sign_outs.lock().await);
        for task in pending {
            if let Err(error) = task.await {
                warn!(error = %error, "identity gateway sign-out task aborted");
            }
        }
    }

    async fn resolve_startup_status(&self) -> AuthStatus {
        match self.lookup_session().await {
            Ok(status) => status,
            Err(error) => {
                warn!(
                    error = %error,
                    "session check failed during start-up, treating as unauthenticated"
                );
                AuthStatus::Unauthenticated
            }
        }
    }

    async fn lookup_session(&self) -> AppResult<AuthStatus> {
        let has_session = self
            .query("session check", self.gateway.has_valid_session())
            .await?;
        if !has_session {
            return Ok(AuthStatus::Unauthenticated);
        }

        let display_name = self.fetch_identity_name().await?;
        Ok(AuthStatus::authenticated(display_name))
    }

    async fn fetch_identity_name(&self) -> AppResult<NonEmptyString> {
        let name = self
            .query("identity fetch", self.gateway.current_identity_name())
            .await?;

        NonEmptyString::new(name).map_err(|_| {
            AppError::Internal("identity gateway returned an empty identity name".to_owned())
        })
    }

    async fn query<T>(
        &self,
        operation: &'static str,
        request: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        let Some(limit) = self.config.query_timeout else {
            return request.await;
        };

        tokio::time::timeout(limit, request)
            .await
            .map_err(|_| {
                AppError::Internal(format!(
                    "identity gateway {operation} timed out after {} ms",
                    limit.as_millis()
                ))
            })?
    }

    fn publish(&self, signal: AuthSignal, status: AuthStatus) -> AppResult<AuthStatus> {
        self.status_bus.publish(status.clone())?;
        info!(signal = %signal, status = %status.as_str(), "auth status published");

        Ok(status)
    }

    async fn spawn_sign_out(&self) {
        let gateway = Arc::clone(&self.gateway);
        let task = tokio::spawn(async move {
            match gateway.sign_out().await {
                Ok(()) => debug!("identity gateway sign-out completed"),
                Err(error) => warn!(error = %error, "identity gateway sign-out failed"),
            }
        });

        let mut sign_outs = self.sign_outs.lock().await;
        sign_outs.retain(|task| !task.is_finished());
        sign_outs.push(task);
    }
}
