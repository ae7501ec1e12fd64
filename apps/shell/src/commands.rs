use std::str::FromStr;

use authflow_core::AppError;
use authflow_domain::FederatedProvider;

pub const HELP: &str = "\
commands:
  login <email> <password>     sign in with an existing account
  register <email> <password>  create an account and sign in
  google <id-token>            sign in with a Google ID token
  logout                       sign out (the provider session is closed in the background;
                               a following sign-in waits for it)
  status                       show the current authentication status
  help                         show this message
  quit                         exit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Login { email: String, password: String },
    Register { email: String, password: String },
    Federated {
        provider: FederatedProvider,
        id_token: String,
    },
    Logout,
    Status,
    Help,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Err(AppError::Validation("empty command".to_owned()));
        };
        let arguments: Vec<&str> = words.collect();

        let name = command.to_ascii_lowercase();
        match (name.as_str(), arguments.as_slice()) {
            ("login", [email, password]) => Ok(Self::Login {
                email: (*email).to_owned(),
                password: (*password).to_owned(),
            }),
            ("register", [email, password]) => Ok(Self::Register {
                email: (*email).to_owned(),
                password: (*password).to_owned(),
            }),
            ("logout", []) => Ok(Self::Logout),
            ("status", []) => Ok(Self::Status),
            ("help" | "?", []) => Ok(Self::Help),
            ("quit" | "exit", []) => Ok(Self::Quit),
            ("login" | "register", _) => Err(AppError::Validation(format!(
                "usage: {command} <email> <password>"
            ))),
            (name, arguments) => {
                let Ok(provider) = FederatedProvider::from_str(name) else {
                    return Err(AppError::Validation(format!(
                        "unknown command '{line}', type 'help' for a list"
                    )));
                };
                let [id_token] = arguments else {
                    return Err(AppError::Validation(format!("usage: {command} <id-token>")));
                };

                Ok(Self::Federated {
                    provider,
                    id_token: (*id_token).to_owned(),
                })
            }
        }
    }
}
