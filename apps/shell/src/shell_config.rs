use std::env;
use std::time::Duration;

use authflow_core::{AppError, AppResult};
use authflow_domain::EmailAddress;
use authflow_infrastructure::RestIdentityConfig;
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

#[derive(Debug, Clone)]
pub enum GatewayConfig {
    InMemory {
        seed_accounts: Vec<(EmailAddress, String)>,
        seed_google_tokens: Vec<(String, EmailAddress)>,
    },
    Rest(RestIdentityConfig),
}

impl GatewayConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InMemory { .. } => "memory",
            Self::Rest(_) => "rest",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub gateway: GatewayConfig,
    pub query_timeout: Option<Duration>,
}

impl ShellConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let gateway = match read("AUTH_GATEWAY").as_deref().unwrap_or("memory") {
            "memory" | "in_memory" => GatewayConfig::InMemory {
                seed_accounts: parse_pairs(read("DEV_SEED_ACCOUNTS"), "DEV_SEED_ACCOUNTS")?
                    .into_iter()
                    .map(|(email, password)| Ok((EmailAddress::new(email)?, password)))
                    .collect::<AppResult<_>>()?,
                seed_google_tokens: parse_pairs(
                    read("DEV_SEED_GOOGLE_TOKENS"),
                    "DEV_SEED_GOOGLE_TOKENS",
                )?
                .into_iter()
                .map(|(token, email)| Ok((token, EmailAddress::new(email)?)))
                .collect::<AppResult<_>>()?,
            },
            "rest" => {
                let api_key = read("IDENTITY_API_KEY").ok_or_else(|| {
                    AppError::Validation("IDENTITY_API_KEY is required".to_owned())
                })?;
                let base_url_value = read("IDENTITY_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_IDENTITY_BASE_URL.to_owned());
                let base_url = Url::parse(base_url_value.as_str()).map_err(|error| {
                    AppError::Validation(format!(
                        "invalid IDENTITY_BASE_URL value '{base_url_value}': {error}"
                    ))
                })?;
                let timeout_secs = parse_u64(
                    read("IDENTITY_HTTP_TIMEOUT_SECS"),
                    "IDENTITY_HTTP_TIMEOUT_SECS",
                )?
                .unwrap_or(15);
                if timeout_secs == 0 {
                    return Err(AppError::Validation(
                        "IDENTITY_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
                    ));
                }

                GatewayConfig::Rest(RestIdentityConfig {
                    base_url,
                    api_key,
                    request_timeout: Duration::from_secs(timeout_secs),
                })
            }
            other => {
                return Err(AppError::Validation(format!(
                    "invalid AUTH_GATEWAY value '{other}', expected 'memory' or 'rest'"
                )));
            }
        };

        let query_timeout_ms = parse_u64(read("AUTH_QUERY_TIMEOUT_MS"), "AUTH_QUERY_TIMEOUT_MS")?;
        let query_timeout = match query_timeout_ms {
            Some(0) => {
                return Err(AppError::Validation(
                    "AUTH_QUERY_TIMEOUT_MS must be greater than zero".to_owned(),
                ));
            }
            Some(millis) => Some(Duration::from_millis(millis)),
            None => None,
        };

        Ok(Self {
            gateway,
            query_timeout,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_u64(value: Option<String>, name: &str) -> AppResult<Option<u64>> {
    value
        .map(|value| {
            value.parse::<u64>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            })
        })
        .transpose()
}

/// Parses `left:right` pairs separated by commas.
fn parse_pairs(value: Option<String>, name: &str) -> AppResult<Vec<(String, String)>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once(':')
                .map(|(left, right)| (left.trim().to_owned(), right.trim().to_owned()))
                .filter(|(left, right)| !left.is_empty() && !right.is_empty())
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "invalid {name} entry '{entry}', expected 'left:right'"
                    ))
                })
        })
        .collect()
}
