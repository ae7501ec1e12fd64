//! Scriptable identity gateway shared by the service tests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use authflow_core::{AppError, AppResult};
use authflow_domain::ProviderAssertion;

use crate::IdentityGateway;

/// How a fake gateway operation answers.
#[derive(Debug, Clone)]
pub(crate) enum Reply<T> {
    Value(T),
    Fail,
    Stall,
}

impl<T: Clone> Reply<T> {
    async fn resolve(&self, operation: &str) -> AppResult<T> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Fail => Err(AppError::Internal(format!("{operation} failed"))),
            Self::Stall => std::future::pending().await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GatewayCall {
    SessionCheck,
    IdentityFetch,
    SignIn,
    SignOut,
}

pub(crate) struct FakeIdentityGateway {
    pub(crate) session: Reply<bool>,
    pub(crate) identity: Reply<String>,
    pub(crate) sign_out: Reply<()>,
    pub(crate) identity_delay: Option<Duration>,
    pub(crate) calls: Mutex<Vec<GatewayCall>>,
    signed_out: Notify,
}

impl FakeIdentityGateway {
    pub(crate) fn new(session: Reply<bool>, identity: Reply<String>) -> Self {
        Self {
            session,
            identity,
            sign_out: Reply::Value(()),
            identity_delay: None,
            calls: Mutex::new(Vec::new()),
            signed_out: Notify::new(),
        }
    }

    pub(crate) fn signed_in_as(name: &str) -> Self {
        Self::new(Reply::Value(true), Reply::Value(name.to_owned()))
    }

    pub(crate) fn without_session() -> Self {
        Self::new(Reply::Value(false), Reply::Fail)
    }

    pub(crate) async fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().await.clone()
    }

    pub(crate) async fn count(&self, call: GatewayCall) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|recorded| **recorded == call)
            .count()
    }

    /// Waits until a sign-out has been invoked, or gives up after a second.
    pub(crate) async fn wait_for_sign_out(&self) -> bool {
        tokio::time::timeout(Duration::from_secs(1), self.signed_out.notified())
            .await
            .is_ok()
    }

    async fn record(&self, call: GatewayCall) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl IdentityGateway for FakeIdentityGateway {
    async fn has_valid_session(&self) -> AppResult<bool> {
        self.record(GatewayCall::SessionCheck).await;
        self.session.resolve("session check").await
    }

    async fn current_identity_name(&self) -> AppResult<String> {
        self.record(GatewayCall::IdentityFetch).await;
        if let Some(delay) = self.identity_delay {
            tokio::time::sleep(delay).await;
        }
        self.identity.resolve("identity fetch").await
    }

    async fn sign_in(&self, _assertion: ProviderAssertion) -> AppResult<()> {
        self.record(GatewayCall::SignIn).await;
        Ok(())
    }

    async fn sign_out(&self) -> AppResult<()> {
        self.record(GatewayCall::SignOut).await;
        self.signed_out.notify_one();
        self.sign_out.resolve("sign-out").await
    }
}
