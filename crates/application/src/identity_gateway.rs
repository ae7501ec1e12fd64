use async_trait::async_trait;

use authflow_core::AppResult;
use authflow_domain::ProviderAssertion;

/// Port for the external identity provider that owns session truth.
///
/// Implementations are shared between the controller, its detached
/// sign-out tasks and the UI layer, so every call may run concurrently.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Returns whether the provider currently holds a valid session.
    async fn has_valid_session(&self) -> AppResult<bool>;

    /// Returns the identifying name of the signed-in user.
    ///
    /// Only meaningful while a session exists; implementations return an
    /// error otherwise.
    async fn current_identity_name(&self) -> AppResult<String>;

    /// Exchanges an assertion for a provider session.
    async fn sign_in(&self, assertion: ProviderAssertion) -> AppResult<()>;

    /// Terminates the current session.
    async fn sign_out(&self) -> AppResult<()>;
}
