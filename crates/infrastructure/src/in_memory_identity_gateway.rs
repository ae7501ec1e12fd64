use std::collections::HashMap;

use async_trait::async_trait;
use authflow_application::IdentityGateway;
use authflow_core::{AppError, AppResult};
use authflow_domain::{EmailAddress, FederatedProvider, ProviderAssertion};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Default)]
struct IdentityState {
    passwords: HashMap<String, String>,
    federated_tokens: HashMap<(FederatedProvider, String), String>,
    session: Option<String>,
}

/// Process-local identity provider for development and demos.
///
/// Accounts and sessions live only as long as the value does.
#[derive(Debug, Default)]
pub struct InMemoryIdentityGateway {
    state: RwLock<IdentityState>,
}

impl InMemoryIdentityGateway {
    /// Creates an empty provider with no accounts and no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an email/password account.
    #[must_use]
    pub fn with_account(mut self, email: EmailAddress, password: impl Into<String>) -> Self {
        self.state
            .get_mut()
            .passwords
            .insert(email.into(), password.into());
        self
    }

    /// Seeds a federated token that resolves to the given email.
    #[must_use]
    pub fn with_federated_identity(
        mut self,
        provider: FederatedProvider,
        id_token: impl Into<String>,
        email: EmailAddress,
    ) -> Self {
        self.state
            .get_mut()
            .federated_tokens
            .insert((provider, id_token.into()), email.into());
        self
    }

    /// Starts with an already established session, as after an app restart.
    #[must_use]
    pub fn with_active_session(mut self, email: EmailAddress) -> Self {
        self.state.get_mut().session = Some(email.into());
        self
    }
}

#[async_trait]
impl IdentityGateway for InMemoryIdentityGateway {
    async fn has_valid_session(&self) -> AppResult<bool> {
        Ok(self.state.read().await.session.is_some())
    }

    async fn current_identity_name(&self) -> AppResult<String> {
        self.state
            .read()
            .await
            .session
            .clone()
            .ok_or_else(|| AppError::Unauthorized("no active session".to_owned()))
    }

    async fn sign_in(&self, assertion: ProviderAssertion) -> AppResult<()> {
        let kind = assertion.kind();
        let mut state = self.state.write().await;

        let email = match assertion {
            ProviderAssertion::Password { email, password } => {
                let matches = state
                    .passwords
                    .get(email.as_str())
                    .is_some_and(|stored| *stored == password);
                if !matches {
                    return Err(AppError::Unauthorized(
                        "invalid email or password".to_owned(),
                    ));
                }
                String::from(email)
            }
            ProviderAssertion::Registration { email, password } => {
                if state.passwords.contains_key(email.as_str()) {
                    return Err(AppError::Conflict(
                        "an account already exists for this email".to_owned(),
                    ));
                }
                let email = String::from(email);
                state.passwords.insert(email.clone(), password);
                email
            }
            ProviderAssertion::Federated { provider, id_token } => state
                .federated_tokens
                .get(&(provider, id_token))
                .cloned()
                .ok_or_else(|| {
                    AppError::Unauthorized(format!(
                        "{} token was not recognised",
                        provider.as_str()
                    ))
                })?,
        };

        info!(assertion = kind, email = %email, "in-memory identity session started");
        state.session = Some(email);

        Ok(())
    }

    async fn sign_out(&self) -> AppResult<()> {
        if let Some(email) = self.state.write().await.session.take() {
            info!(email = %email, "in-memory identity session ended");
        }

        Ok(())
    }
}
