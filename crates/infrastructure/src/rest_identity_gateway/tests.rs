use std::time::Duration;

use authflow_application::IdentityGateway;
use authflow_core::AppError;
use authflow_domain::{FederatedProvider, ProviderAssertion};
use axum::Json;
use axum::Router;
use axum::http::{StatusCode, Uri};
use serde_json::{Value, json};
use url::Url;

use super::{RestIdentityConfig, RestIdentityGateway, map_provider_code, provider_code};

const API_KEY: &str = "test-key";

fn rejection(code: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": {"code": 400, "message": code}})),
    )
}

async fn mock_identity_api(uri: Uri, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if uri.query() != Some("key=test-key") {
        return rejection("API_KEY_INVALID");
    }

    let field = |name: &str| body.get(name).and_then(Value::as_str).unwrap_or_default();
    match uri.path() {
        "/v1/accounts:signInWithPassword" => match field("password") {
            "secret1" => (
                StatusCode::OK,
                Json(json!({"idToken": "token-a", "email": field("email")})),
            ),
            "expire-me" => (
                StatusCode::OK,
                Json(json!({"idToken": "expired", "email": field("email")})),
            ),
            "break-me" => (
                StatusCode::OK,
                Json(json!({"idToken": "broken", "email": field("email")})),
            ),
            _ => rejection("INVALID_LOGIN_CREDENTIALS"),
        },
        "/v1/accounts:signUp" => match field("email") {
            "taken@b.com" => rejection("EMAIL_EXISTS"),
            email => (
                StatusCode::OK,
                Json(json!({"idToken": "token-new", "email": email})),
            ),
        },
        "/v1/accounts:signInWithIdp" => {
            if field("postBody") == "id_token=google-token&providerId=google.com" {
                (
                    StatusCode::OK,
                    Json(json!({"idToken": "token-g", "email": "g@b.com", "displayName": "G"})),
                )
            } else {
                rejection("INVALID_IDP_RESPONSE")
            }
        }
        "/v1/accounts:lookup" => match field("idToken") {
            "expired" => rejection("TOKEN_EXPIRED"),
            "broken" => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": {"code": 500, "message": "INTERNAL"}})),
            ),
            _ => (
                StatusCode::OK,
                Json(json!({"users": [{"email": "a@b.com", "displayName": "Alice"}]})),
            ),
        },
        _ => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn spawn_gateway() -> Option<RestIdentityGateway> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.ok()?;
    let address = listener.local_addr().ok()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, Router::new().fallback(mock_identity_api)).await;
    });

    RestIdentityGateway::new(RestIdentityConfig {
        base_url: Url::parse(&format!("http://{address}")).ok()?,
        api_key: API_KEY.to_owned(),
        request_timeout: Duration::from_secs(5),
    })
    .ok()
}

async fn sign_in_with_password(gateway: &RestIdentityGateway, password: &str) -> bool {
    match ProviderAssertion::password("a@b.com", password) {
        Ok(assertion) => gateway.sign_in(assertion).await.is_ok(),
        Err(_) => false,
    }
}

#[test]
fn endpoint_appends_method_and_key() {
    let gateway = Url::parse("https://identity.example.com/api/")
        .ok()
        .and_then(|base_url| {
            RestIdentityGateway::new(RestIdentityConfig {
                base_url,
                api_key: API_KEY.to_owned(),
                request_timeout: Duration::from_secs(5),
            })
            .ok()
        });
    let endpoint = gateway.and_then(|gateway| gateway.endpoint("lookup").ok());

    assert_eq!(
        endpoint.map(String::from).unwrap_or_default(),
        "https://identity.example.com/api/v1/accounts:lookup?key=test-key"
    );
}

#[test]
fn blank_api_key_is_rejected() {
    let gateway = Url::parse("https://identity.example.com").ok().map(|base_url| {
        RestIdentityGateway::new(RestIdentityConfig {
            base_url,
            api_key: "  ".to_owned(),
            request_timeout: Duration::from_secs(5),
        })
    });
    assert!(matches!(gateway, Some(Err(AppError::Validation(_)))));
}

#[test]
fn provider_codes_map_to_error_categories() {
    assert_eq!(
        provider_code("WEAK_PASSWORD : Password should be at least 6 characters"),
        "WEAK_PASSWORD"
    );
    assert!(matches!(
        map_provider_code(400, "EMAIL_EXISTS"),
        AppError::Conflict(_)
    ));
    assert!(matches!(
        map_provider_code(400, "INVALID_LOGIN_CREDENTIALS"),
        AppError::Unauthorized(_)
    ));
    assert!(matches!(
        map_provider_code(400, "USER_DISABLED"),
        AppError::Forbidden(_)
    ));
    assert!(matches!(
        map_provider_code(400, "WEAK_PASSWORD : too short"),
        AppError::Validation(_)
    ));
    assert!(matches!(
        map_provider_code(503, "BACKEND_ERROR"),
        AppError::Internal(_)
    ));
}

#[tokio::test]
async fn no_session_is_reported_without_calling_provider() {
    let Some(gateway) = spawn_gateway().await else {
        panic!("mock identity provider failed to start");
    };

    assert!(matches!(gateway.has_valid_session().await, Ok(false)));
    assert!(matches!(
        gateway.current_identity_name().await,
        Err(AppError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn password_sign_in_establishes_verified_session() {
    let Some(gateway) = spawn_gateway().await else {
        panic!("mock identity provider failed to start");
    };

    assert!(sign_in_with_password(&gateway, "secret1").await);
    assert!(matches!(gateway.has_valid_session().await, Ok(true)));
    assert_eq!(
        gateway.current_identity_name().await.unwrap_or_default(),
        "a@b.com"
    );
}

#[tokio::test]
async fn rejected_credentials_surface_as_unauthorized() {
    let Some(gateway) = spawn_gateway().await else {
        panic!("mock identity provider failed to start");
    };

    let result = match ProviderAssertion::password("a@b.com", "wrong") {
        Ok(assertion) => gateway.sign_in(assertion).await,
        Err(error) => Err(error),
    };
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert!(matches!(gateway.has_valid_session().await, Ok(false)));
}

#[tokio::test]
async fn registration_conflict_is_reported() {
    let Some(gateway) = spawn_gateway().await else {
        panic!("mock identity provider failed to start");
    };

    let taken = match ProviderAssertion::registration("taken@b.com", "secret1") {
        Ok(assertion) => gateway.sign_in(assertion).await,
        Err(error) => Err(error),
    };
    assert!(matches!(taken, Err(AppError::Conflict(_))));

    let fresh = match ProviderAssertion::registration("new@b.com", "secret1") {
        Ok(assertion) => gateway.sign_in(assertion).await,
        Err(error) => Err(error),
    };
    assert!(fresh.is_ok());
    assert_eq!(
        gateway.current_identity_name().await.unwrap_or_default(),
        "new@b.com"
    );
}

#[tokio::test]
async fn federated_sign_in_forwards_provider_token() {
    let Some(gateway) = spawn_gateway().await else {
        panic!("mock identity provider failed to start");
    };

    let result = match ProviderAssertion::federated(FederatedProvider::Google, "google-token") {
        Ok(assertion) => gateway.sign_in(assertion).await,
        Err(error) => Err(error),
    };
    assert!(result.is_ok());
    assert_eq!(
        gateway.current_identity_name().await.unwrap_or_default(),
        "g@b.com"
    );
}

#[tokio::test]
async fn expired_token_clears_session() {
    let Some(gateway) = spawn_gateway().await else {
        panic!("mock identity provider failed to start");
    };

    assert!(sign_in_with_password(&gateway, "expire-me").await);
    assert!(matches!(gateway.has_valid_session().await, Ok(false)));
    assert!(gateway.current_identity_name().await.is_err());
}

#[tokio::test]
async fn provider_outage_is_an_error_not_a_missing_session() {
    let Some(gateway) = spawn_gateway().await else {
        panic!("mock identity provider failed to start");
    };

    assert!(sign_in_with_password(&gateway, "break-me").await);
    assert!(matches!(
        gateway.has_valid_session().await,
        Err(AppError::Internal(_))
    ));
    // The session survives a transient provider failure.
    assert_eq!(
        gateway.current_identity_name().await.unwrap_or_default(),
        "a@b.com"
    );
}

#[tokio::test]
async fn sign_out_clears_local_session() {
    let Some(gateway) = spawn_gateway().await else {
        panic!("mock identity provider failed to start");
    };

    assert!(sign_in_with_password(&gateway, "secret1").await);
    assert!(gateway.sign_out().await.is_ok());
    assert!(gateway.sign_out().await.is_ok());
    assert!(matches!(gateway.has_valid_session().await, Ok(false)));
}
