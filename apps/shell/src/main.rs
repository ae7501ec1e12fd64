//! Authflow interactive shell: composition root for the auth controller.

#![forbid(unsafe_code)]

mod commands;
mod screen;
mod shell_config;

use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use authflow_application::{
    AuthController, AuthControllerConfig, AuthSignalDispatcher, AuthStatusSubscription,
    IdentityGateway,
};
use authflow_core::{AppError, AppResult};
use authflow_domain::{AuthSignal, FederatedProvider, ProviderAssertion};
use authflow_infrastructure::{InMemoryIdentityGateway, RestIdentityGateway};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::commands::{HELP, ShellCommand};
use crate::screen::Screen;
use crate::shell_config::{GatewayConfig, ShellConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ShellConfig::load()?;
    let gateway = build_gateway(&config.gateway)?;
    let controller = AuthController::with_config(
        Arc::clone(&gateway),
        AuthControllerConfig {
            query_timeout: config.query_timeout,
        },
    );

    let renderer = tokio::spawn(render_screens(controller.subscribe()?, std::io::stdout()));
    let (dispatcher, worker) = AuthSignalDispatcher::spawn(controller.clone());

    info!(
        gateway = config.gateway.kind(),
        query_timeout_ms = config
            .query_timeout
            .map(|timeout| u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
        "authflow-shell started"
    );
    dispatcher.submit(AuthSignal::AppStarted)?;

    run_command_loop(&dispatcher, gateway.as_ref(), &controller).await?;

    drop(dispatcher);
    worker
        .await
        .map_err(|error| AppError::Internal(format!("auth signal worker panicked: {error}")))?;
    // The subscription ends once the last controller handle is gone.
    drop(controller);
    renderer
        .await
        .map_err(|error| AppError::Internal(format!("screen renderer panicked: {error}")))?;
    info!("authflow-shell stopped");

    Ok(())
}

fn build_gateway(config: &GatewayConfig) -> AppResult<Arc<dyn IdentityGateway>> {
    match config {
        GatewayConfig::InMemory {
            seed_accounts,
            seed_google_tokens,
        } => {
            let mut gateway = InMemoryIdentityGateway::new();
            for (email, password) in seed_accounts {
                gateway = gateway.with_account(email.clone(), password.as_str());
            }
            for (id_token, email) in seed_google_tokens {
                gateway = gateway.with_federated_identity(
                    FederatedProvider::Google,
                    id_token.as_str(),
                    email.clone(),
                );
            }

            Ok(Arc::new(gateway))
        }
        GatewayConfig::Rest(rest_config) => {
            Ok(Arc::new(RestIdentityGateway::new(rest_config.clone())?))
        }
    }
}

async fn render_screens<W: Write>(mut subscription: AuthStatusSubscription, mut output: W) -> W {
    while let Some(status) = subscription.next().await {
        if writeln!(output, "{}", Screen::from(&status).render()).is_err() {
            break;
        }
    }

    output
}

async fn run_command_loop(
    dispatcher: &AuthSignalDispatcher,
    gateway: &dyn IdentityGateway,
    controller: &AuthController,
) -> AppResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|error| AppError::Internal(format!("failed to read stdin: {error}")))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let command = match ShellCommand::from_str(line.as_str()) {
            Ok(command) => command,
            Err(error) => {
                println!("{error}");
                continue;
            }
        };

        match command {
            ShellCommand::Login { email, password } => {
                let assertion = ProviderAssertion::password(email.as_str(), password);
                sign_in_and_notify(dispatcher, controller, gateway, assertion).await;
            }
            ShellCommand::Register { email, password } => {
                let assertion = ProviderAssertion::registration(email.as_str(), password);
                sign_in_and_notify(dispatcher, controller, gateway, assertion).await;
            }
            ShellCommand::Federated { provider, id_token } => {
                let assertion = ProviderAssertion::federated(provider, id_token);
                sign_in_and_notify(dispatcher, controller, gateway, assertion).await;
            }
            ShellCommand::Logout => {
                dispatcher.dispatch(AuthSignal::LoggedOut).await?;
            }
            ShellCommand::Status => println!("status: {}", controller.current()?),
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => break,
        }
    }

    Ok(())
}

/// Runs the provider sign-in, then reports `LoggedIn` only on success.
///
/// Sign-outs still running from an earlier `logout` finish first, so they
/// cannot clear the session this sign-in creates.
async fn sign_in_and_notify(
    dispatcher: &AuthSignalDispatcher,
    controller: &AuthController,
    gateway: &dyn IdentityGateway,
    assertion: AppResult<ProviderAssertion>,
) {
    let result = match assertion {
        Ok(assertion) => {
            controller.settle_sign_outs().await;
            gateway.sign_in(assertion).await
        }
        Err(error) => Err(error),
    };

    if let Err(error) = result {
        warn!(error = %error, "sign-in failed");
        println!("sign-in failed: {error}");
        return;
    }

    if let Err(error) = dispatcher.dispatch(AuthSignal::LoggedIn).await {
        warn!(error = %error, "signed in but the session could not be loaded");
        println!("signed in but the session could not be loaded: {error}");
    }
}
