//! Authentication lifecycle values.
//!
//! [`AuthStatus`] is what the controller publishes to observers and
//! [`AuthSignal`] is what it consumes. Both are closed sets: adding a case is
//! a breaking change for every `match` downstream.

use std::fmt::{Display, Formatter};

use authflow_core::NonEmptyString;
use serde::{Deserialize, Serialize};

/// Current authoritative authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthStatus {
    /// No signal has been processed yet.
    #[default]
    Uninitialized,
    /// A confirmed, currently valid session.
    Authenticated {
        /// Identifying name for the signed-in user, usually an email address.
        display_name: NonEmptyString,
    },
    /// Confirmed absence of a valid session.
    Unauthenticated,
}

impl AuthStatus {
    /// Creates an authenticated status for the given identity name.
    #[must_use]
    pub fn authenticated(display_name: NonEmptyString) -> Self {
        Self::Authenticated { display_name }
    }

    /// Returns a stable label for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Authenticated { .. } => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        }
    }

    /// Returns the display name when a session is active.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Authenticated { display_name } => Some(display_name.as_str()),
            Self::Uninitialized | Self::Unauthenticated => None,
        }
    }
}

impl Display for AuthStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authenticated { display_name } => {
                write!(formatter, "authenticated({display_name})")
            }
            Self::Uninitialized | Self::Unauthenticated => formatter.write_str(self.as_str()),
        }
    }
}

/// Lifecycle trigger delivered to the authentication controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthSignal {
    /// Emitted once at process start.
    AppStarted,
    /// Emitted after the UI layer completed a credential exchange.
    LoggedIn,
    /// Emitted when the user requests logout.
    LoggedOut,
}

impl AuthSignal {
    /// Returns a stable label for this signal.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppStarted => "app_started",
            Self::LoggedIn => "logged_in",
            Self::LoggedOut => "logged_out",
        }
    }
}

impl Display for AuthSignal {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
