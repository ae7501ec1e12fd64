//! Identity gateway backed by an Identity-Toolkit-style REST API.
//!
//! The provider issues an ID token on sign-in; the gateway keeps it in memory
//! and validates it with `accounts:lookup` whenever a session check is
//! requested. Nothing is persisted, so a restarted process starts signed out.

use std::time::Duration;

use async_trait::async_trait;
use authflow_application::IdentityGateway;
use authflow_core::{AppError, AppResult};
use authflow_domain::ProviderAssertion;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{info, warn};
use url::Url;
use url::form_urlencoded;

/// Provider codes meaning the stored ID token no longer identifies a session.
const SESSION_INVALIDATING_CODES: &[&str] = &[
    "INVALID_ID_TOKEN",
    "TOKEN_EXPIRED",
    "USER_NOT_FOUND",
    "USER_DISABLED",
];

/// Connection settings for [`RestIdentityGateway`].
#[derive(Debug, Clone)]
pub struct RestIdentityConfig {
    /// API root, e.g. `https://identitytoolkit.googleapis.com`.
    pub base_url: Url,
    /// Project API key sent as the `key` query parameter.
    pub api_key: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
struct RestSession {
    id_token: String,
    email: Option<String>,
    display_name: Option<String>,
}

impl RestSession {
    fn identity_name(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or(self.display_name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

enum RequestError {
    Rejected { status: u16, code: String },
    Failed(AppError),
}

impl From<RequestError> for AppError {
    fn from(value: RequestError) -> Self {
        match value {
            RequestError::Rejected { status, code } => map_provider_code(status, code.as_str()),
            RequestError::Failed(error) => error,
        }
    }
}

/// Identity gateway talking to a remote identity provider over HTTPS.
pub struct RestIdentityGateway {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: String,
    session: RwLock<Option<RestSession>>,
}

impl RestIdentityGateway {
    /// Creates a gateway with its own HTTP client.
    pub fn new(config: RestIdentityConfig) -> AppResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::Validation(
                "identity provider API key must not be empty".to_owned(),
            ));
        }

        if config.base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "identity provider base URL '{}' cannot be used as a base",
                config.base_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http_client,
            base_url: config.base_url,
            api_key: config.api_key,
            session: RwLock::new(None),
        })
    }

    fn endpoint(&self, method: &str) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Internal(format!(
                    "identity provider base URL '{}' cannot be used as a base",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("v1")
            .push(format!("accounts:{method}").as_str());
        url.query_pairs_mut().append_pair("key", self.api_key.as_str());

        Ok(url)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
    ) -> Result<T, RequestError> {
        let endpoint = self.endpoint(method).map_err(RequestError::Failed)?;
        let response = self
            .http_client
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|error| {
                RequestError::Failed(AppError::Internal(format!(
                    "failed to call identity provider '{method}': {error}"
                )))
            })?;

        let status = response.status();
        if !status.is_success() {
            let code = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => "<body unavailable>".to_owned(),
            };
            return Err(RequestError::Rejected {
                status: status.as_u16(),
                code,
            });
        }

        response.json::<T>().await.map_err(|error| {
            RequestError::Failed(AppError::Internal(format!(
                "failed to parse identity provider '{method}' response body: {error}"
            )))
        })
    }

    async fn start_session(&self, response: SignInResponse) {
        let session = RestSession {
            id_token: response.id_token,
            email: response.email,
            display_name: response.display_name,
        };
        *self.session.write().await = Some(session);
    }
}

#[async_trait]
impl IdentityGateway for RestIdentityGateway {
    async fn has_valid_session(&self) -> AppResult<bool> {
        let Some(id_token) = self
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.id_token.clone())
        else {
            return Ok(false);
        };

        match self
            .post::<LookupResponse>("lookup", &json!({ "idToken": id_token }))
            .await
        {
            Ok(lookup) => {
                let mut session = self.session.write().await;
                let Some(current) = session
                    .as_mut()
                    .filter(|current| current.id_token == id_token)
                else {
                    // Replaced by a newer sign-in while the lookup was in flight.
                    return Ok(session.is_some());
                };

                match lookup.users.into_iter().next() {
                    Some(user) => {
                        current.email = user.email.or(current.email.take());
                        current.display_name = user.display_name.or(current.display_name.take());
                        Ok(true)
                    }
                    None => {
                        *session = None;
                        Ok(false)
                    }
                }
            }
            Err(RequestError::Rejected { code, .. })
                if SESSION_INVALIDATING_CODES.contains(&provider_code(code.as_str())) =>
            {
                warn!(code = %code, "identity provider rejected stored session");
                let mut session = self.session.write().await;
                if session
                    .as_ref()
                    .is_some_and(|current| current.id_token == id_token)
                {
                    *session = None;
                }
                Ok(false)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn current_identity_name(&self) -> AppResult<String> {
        let session = self.session.read().await;
        let Some(session) = session.as_ref() else {
            return Err(AppError::Unauthorized("no active session".to_owned()));
        };

        session.identity_name().map(str::to_owned).ok_or_else(|| {
            AppError::Internal("identity provider returned no email or display name".to_owned())
        })
    }

    async fn sign_in(&self, assertion: ProviderAssertion) -> AppResult<()> {
        let kind = assertion.kind();
        let (method, body) = match assertion {
            ProviderAssertion::Password { email, password } => (
                "signInWithPassword",
                json!({
                    "email": email.as_str(),
                    "password": password,
                    "returnSecureToken": true,
                }),
            ),
            ProviderAssertion::Registration { email, password } => (
                "signUp",
                json!({
                    "email": email.as_str(),
                    "password": password,
                    "returnSecureToken": true,
                }),
            ),
            ProviderAssertion::Federated { provider, id_token } => {
                let post_body = form_urlencoded::Serializer::new(String::new())
                    .append_pair("id_token", id_token.as_str())
                    .append_pair("providerId", provider.as_str())
                    .finish();
                (
                    "signInWithIdp",
                    json!({
                        "postBody": post_body,
                        "requestUri": "http://localhost",
                        "returnIdpCredential": true,
                        "returnSecureToken": true,
                    }),
                )
            }
        };

        let response = self.post::<SignInResponse>(method, &body).await?;
        info!(
            assertion = kind,
            email = response.email.as_deref().unwrap_or("<none>"),
            "identity provider session started"
        );
        self.start_session(response).await;

        Ok(())
    }

    async fn sign_out(&self) -> AppResult<()> {
        if self.session.write().await.take().is_some() {
            info!("identity provider session cleared");
        }

        Ok(())
    }
}

/// Strips the human-readable suffix from codes like `WEAK_PASSWORD : ...`.
fn provider_code(message: &str) -> &str {
    message.split([' ', ':']).next().unwrap_or(message)
}

fn map_provider_code(status: u16, message: &str) -> AppError {
    match provider_code(message) {
        "EMAIL_NOT_FOUND"
        | "INVALID_PASSWORD"
        | "INVALID_LOGIN_CREDENTIALS"
        | "INVALID_IDP_RESPONSE"
        | "INVALID_ID_TOKEN"
        | "TOKEN_EXPIRED"
        | "USER_NOT_FOUND" => AppError::Unauthorized(message.to_owned()),
        "USER_DISABLED" | "TOO_MANY_ATTEMPTS_TRY_LATER" | "OPERATION_NOT_ALLOWED" => {
            AppError::Forbidden(message.to_owned())
        }
        "EMAIL_EXISTS" => AppError::Conflict(message.to_owned()),
        "WEAK_PASSWORD" | "INVALID_EMAIL" | "MISSING_PASSWORD" | "MISSING_EMAIL" => {
            AppError::Validation(message.to_owned())
        }
        _ => AppError::Internal(format!(
            "identity provider returned status {status}: {message}"
        )),
    }
}

#[cfg(test)]
mod tests;
