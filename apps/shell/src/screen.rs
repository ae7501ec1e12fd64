use authflow_domain::AuthStatus;

/// What the user sees for a given authentication status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Splash,
    Login,
    Home { display_name: String },
}

impl Screen {
    pub fn render(&self) -> String {
        match self {
            Self::Splash => "[splash] checking your session...".to_owned(),
            Self::Login => "[login] sign in with 'login', 'register' or 'google'".to_owned(),
            Self::Home { display_name } => {
                format!("[home] welcome, {display_name}! type 'logout' to sign out")
            }
        }
    }
}

impl From<&AuthStatus> for Screen {
    fn from(status: &AuthStatus) -> Self {
        match status {
            AuthStatus::Uninitialized => Self::Splash,
            AuthStatus::Authenticated { display_name } => Self::Home {
                display_name: display_name.to_string(),
            },
            AuthStatus::Unauthenticated => Self::Login,
        }
    }
}
