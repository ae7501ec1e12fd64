//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_identity_gateway;
mod rest_identity_gateway;

pub use in_memory_identity_gateway::InMemoryIdentityGateway;
pub use rest_identity_gateway::{RestIdentityConfig, RestIdentityGateway};
