//! Application services and ports.

#![forbid(unsafe_code)]

mod auth_controller;
mod auth_signal_dispatcher;
mod auth_status_bus;
mod identity_gateway;

#[cfg(test)]
mod test_support;

pub use auth_controller::{AuthController, AuthControllerConfig};
pub use auth_signal_dispatcher::AuthSignalDispatcher;
pub use auth_status_bus::AuthStatusSubscription;
pub use identity_gateway::IdentityGateway;
