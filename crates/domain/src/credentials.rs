//! Sign-in assertions handed to the identity provider by the UI layer.

use std::fmt::{Debug, Formatter};
use std::str::FromStr;

use authflow_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Minimum password length accepted when creating an account.
pub const PASSWORD_MIN_LENGTH: usize = 6;

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one `@`,
    /// local part and domain are non-empty, domain contains at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        };

        if domain.contains('@') {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Validates a password chosen for a new account.
pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Third-party identity providers whose tokens can be exchanged for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FederatedProvider {
    /// Google Sign-In.
    Google,
}

impl FederatedProvider {
    /// Returns the provider identifier expected by identity toolkits.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google.com",
        }
    }
}

impl FromStr for FederatedProvider {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "google.com" | "google" => Ok(Self::Google),
            _ => Err(AppError::Validation(format!(
                "unknown federated provider '{value}'"
            ))),
        }
    }
}

/// Proof of identity presented to the identity gateway.
#[derive(Clone, PartialEq, Eq)]
pub enum ProviderAssertion {
    /// Existing email/password account.
    Password {
        /// Account email.
        email: EmailAddress,
        /// Plaintext password, forwarded to the provider only.
        password: String,
    },
    /// New email/password account, signed in on creation.
    Registration {
        /// Account email.
        email: EmailAddress,
        /// Plaintext password, forwarded to the provider only.
        password: String,
    },
    /// Token issued by a federated provider after its own sign-in flow.
    Federated {
        /// Issuing provider.
        provider: FederatedProvider,
        /// Provider-issued ID token.
        id_token: String,
    },
}

impl ProviderAssertion {
    /// Builds a password assertion for an existing account.
    pub fn password(email: &str, password: impl Into<String>) -> AppResult<Self> {
        let password = password.into();
        if password.is_empty() {
            return Err(AppError::Validation("password must not be empty".to_owned()));
        }

        Ok(Self::Password {
            email: EmailAddress::new(email)?,
            password,
        })
    }

    /// Builds a registration assertion, enforcing the password policy.
    pub fn registration(email: &str, password: impl Into<String>) -> AppResult<Self> {
        let password = password.into();
        validate_password(&password)?;

        Ok(Self::Registration {
            email: EmailAddress::new(email)?,
            password,
        })
    }

    /// Builds a federated assertion from a provider ID token.
    pub fn federated(provider: FederatedProvider, id_token: impl Into<String>) -> AppResult<Self> {
        let id_token = id_token.into();
        if id_token.trim().is_empty() {
            return Err(AppError::Validation(
                "federated id token must not be empty".to_owned(),
            ));
        }

        Ok(Self::Federated { provider, id_token })
    }

    /// Returns a stable label for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Registration { .. } => "registration",
            Self::Federated { .. } => "federated",
        }
    }
}

// Secrets never reach logs.
impl Debug for ProviderAssertion {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { email, .. } | Self::Registration { email, .. } => formatter
                .debug_struct(self.kind())
                .field("email", &email.as_str())
                .finish_non_exhaustive(),
            Self::Federated { provider, .. } => formatter
                .debug_struct(self.kind())
                .field("provider", &provider.as_str())
                .finish_non_exhaustive(),
        }
    }
}
