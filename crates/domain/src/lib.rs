//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod auth;
mod credentials;

pub use auth::{AuthSignal, AuthStatus};
pub use credentials::{
    EmailAddress, FederatedProvider, PASSWORD_MIN_LENGTH, ProviderAssertion, validate_password,
};
