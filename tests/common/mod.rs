//! Shared fixtures for the wiremock-backed integration tests.
//!
//! One `MockServer` plays both the OIDC provider and the guest identity
//! provider; the flow only cares about paths, so sharing a host is fine.

#![allow(dead_code)]

use std::path::Path;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use guest_idp_flow::oidc::discovery::DiscoveryDocument;
use guest_idp_flow::Config;

/// Callback registered for the test client.
pub const CALLBACK_URI: &str = "http://localhost:3000/oidc/guest/callback";

/// Signs `claims` with a throwaway HMAC key.
pub fn mint_token(claims: serde_json::Value) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("token must encode")
}

/// Discovery document whose endpoints live on `base_url`.
pub fn discovery_body(base_url: &str) -> serde_json::Value {
    serde_json::json!({
        "issuer": format!("{base_url}/"),
        "authorization_endpoint": format!("{base_url}/oauth2/auth"),
        "token_endpoint": format!("{base_url}/oauth2/token"),
        "jwks_uri": format!("{base_url}/.well-known/jwks.json"),
        "scopes_supported": ["offline_access", "offline", "openid"],
        "response_types_supported": ["code", "code id_token", "id_token", "token id_token", "token", "token id_token code"]
    })
}

pub fn discovery_document(base_url: &str) -> DiscoveryDocument {
    serde_json::from_value(discovery_body(base_url)).expect("fixture is a valid discovery document")
}

/// Configuration pointing every endpoint at `base_url`.
pub fn test_config(base_url: &str, cache_path: &Path) -> Config {
    let mut config = Config::default();
    config.oidc.issuer_url = base_url.to_string();
    config.oidc.client_id = "test-client".to_string();
    config.oidc.redirect_uri = CALLBACK_URI.to_string();
    config.guest_idp.base_url = base_url.to_string();
    config.discovery.cache_path = cache_path.to_path_buf();
    config.http.timeout_seconds = Some(10);
    config
}

// ---------------------------------------------------------------------------
// Flow step mocks
// ---------------------------------------------------------------------------

/// `GET /oauth2/auth` redirecting to the login URL with `challenge`.
pub async fn mount_authorize(server: &MockServer, challenge: &str) {
    let location = format!("{}/login?login_challenge={challenge}", server.uri());
    Mock::given(method("GET"))
        .and(path("/oauth2/auth"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", location.as_str()))
        .expect(1)
        .mount(server)
        .await;
}

/// `POST /v0/guest/login` accepting `challenge`.
pub async fn mount_login(server: &MockServer, challenge: &str) {
    let redirect = format!("{}/oauth2/auth/login-accepted?login_verifier=V1", server.uri());
    Mock::given(method("POST"))
        .and(path("/v0/guest/login"))
        .and(body_json(serde_json::json!({ "challenge": challenge })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "redirect": redirect })))
        .expect(1)
        .mount(server)
        .await;
}

/// Login-accepted URL redirecting (relatively) to the consent URL.
pub async fn mount_login_accepted(server: &MockServer, consent_challenge: &str) {
    let location = format!("/consent?consent_challenge={consent_challenge}");
    Mock::given(method("GET"))
        .and(path("/oauth2/auth/login-accepted"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", location.as_str()))
        .expect(1)
        .mount(server)
        .await;
}

/// `POST /v0/guest/consent` accepting `challenge`.
pub async fn mount_consent(server: &MockServer, challenge: &str) {
    let redirect = format!(
        "{}/oauth2/auth/consent-accepted?consent_verifier=V2",
        server.uri()
    );
    Mock::given(method("POST"))
        .and(path("/v0/guest/consent"))
        .and(body_json(serde_json::json!({ "challenge": challenge })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "redirect": redirect })))
        .expect(1)
        .mount(server)
        .await;
}

/// Consent-accepted URL redirecting to the app callback.
pub async fn mount_consent_accepted(server: &MockServer, code: &str, state: &str) {
    let location = format!("{CALLBACK_URI}?code={code}&scope=openid&state={state}");
    Mock::given(method("GET"))
        .and(path("/oauth2/auth/consent-accepted"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", location.as_str()))
        .expect(1)
        .mount(server)
        .await;
}

/// Token endpoint answering the exchange of `code` with `body`.
pub async fn mount_token(server: &MockServer, code: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={code}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

/// Token endpoint body with JWT access and ID tokens.
pub fn token_body() -> serde_json::Value {
    serde_json::json!({
        "access_token": mint_token(serde_json::json!({
            "sub": "guest-123",
            "aud": ["react-client"],
            "scp": ["openid"],
            "exp": 1700003600,
            "iat": 1700000000
        })),
        "id_token": mint_token(serde_json::json!({
            "sub": "guest-123",
            "aud": ["test-client"],
            "iss": "http://oidc.localhost/",
            "exp": 1700003600,
            "iat": 1700000000
        })),
        "token_type": "bearer",
        "expires_in": 3599,
        "scope": "openid"
    })
}

/// Mounts every step of a successful run.
pub async fn mount_happy_path(server: &MockServer) {
    mount_authorize(server, "L1").await;
    mount_login(server, "L1").await;
    mount_login_accepted(server, "C1").await;
    mount_consent(server, "C1").await;
    mount_consent_accepted(server, "XYZ", "echoed-state").await;
    mount_token(server, "XYZ", token_body()).await;
}

/// Forbids any request to `request_path` with `http_method`.
pub async fn forbid(server: &MockServer, http_method: &str, request_path: &str) {
    Mock::given(method(http_method))
        .and(path(request_path))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}
