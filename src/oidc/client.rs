//! Relying-party side of the OAuth2 authorization code flow
//!
//! [`OidcClient`] plays the application that initiates the flow: it builds
//! the authorization URL (recording the anti-forgery `state`), reads the
//! authorization code out of the callback URL, and exchanges that code for
//! tokens at the token endpoint. It never talks to the browser session; the
//! [`UserAgent`](super::user_agent::UserAgent) does that.

use std::collections::HashMap;

use base64::Engine as _;
use serde::Deserialize;
use url::Url;

use crate::config::OidcConfig;
use crate::error::{FlowError, Result};

// ---------------------------------------------------------------------------
// OidcClientConfig
// ---------------------------------------------------------------------------

/// Registration details of the relying party.
///
/// # Examples
///
/// ```
/// use guest_idp_flow::oidc::client::OidcClientConfig;
///
/// let config = OidcClientConfig {
///     client_id: "my-client".to_string(),
///     client_secret: None,
///     scope: "openid".to_string(),
///     redirect_uri: "http://localhost:3000/oidc/guest/callback".to_string(),
///     audience: Some("react-client".to_string()),
/// };
/// assert_eq!(config.scope, "openid");
/// ```
#[derive(Debug, Clone)]
pub struct OidcClientConfig {
    /// OAuth2 client identifier.
    pub client_id: String,

    /// Secret for confidential clients, sent with HTTP Basic auth.
    pub client_secret: Option<String>,

    /// Space-separated scopes to request.
    pub scope: String,

    /// Callback URL registered for the client.
    pub redirect_uri: String,

    /// Optional `audience` authorization parameter.
    pub audience: Option<String>,
}

impl From<&OidcConfig> for OidcClientConfig {
    fn from(config: &OidcConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
            redirect_uri: config.redirect_uri.clone(),
            audience: config.audience.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Flow values
// ---------------------------------------------------------------------------

/// An authorization URL together with the `state` embedded in it.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// URL the browser is sent to.
    pub url: Url,
    /// Anti-forgery value the callback should echo back.
    pub state: String,
}

/// Parameters the authorization server appended to the callback URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    /// The authorization code.
    pub code: String,
    /// The echoed `state`, if any.
    pub state: Option<String>,
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    /// The access token.
    pub access_token: String,

    /// The OIDC ID token; present when the `openid` scope was granted.
    #[serde(default)]
    pub id_token: Option<String>,

    /// Token type, typically `bearer`.
    pub token_type: String,

    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// Refresh token, when `offline` access was granted.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Scopes actually granted.
    #[serde(default)]
    pub scope: Option<String>,
}

// ---------------------------------------------------------------------------
// OidcClient
// ---------------------------------------------------------------------------

/// OAuth2 client driving the relying-party half of the flow.
pub struct OidcClient {
    http: reqwest::Client,
    config: OidcClientConfig,
}

impl OidcClient {
    /// Creates a client that uses `http` for the token exchange.
    pub fn new(http: reqwest::Client, config: OidcClientConfig) -> Self {
        Self { http, config }
    }

    /// Builds the authorization URL for `authorization_endpoint` with a
    /// freshly generated `state`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Config`] if the endpoint is not a valid URL.
    pub fn authorization_url(&self, authorization_endpoint: &str) -> Result<AuthorizationRequest> {
        let state = generate_state();
        let url = self.build_authorization_url(authorization_endpoint, &state)?;
        Ok(AuthorizationRequest { url, state })
    }

    fn build_authorization_url(&self, authorization_endpoint: &str, state: &str) -> Result<Url> {
        let mut url = Url::parse(authorization_endpoint).map_err(|e| {
            FlowError::Config(format!(
                "invalid authorization endpoint URL {authorization_endpoint}: {e}"
            ))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", &self.config.redirect_uri);
            query.append_pair("scope", &self.config.scope);
            query.append_pair("state", state);
            if let Some(audience) = &self.config.audience {
                query.append_pair("audience", audience);
            }
        }

        Ok(url)
    }

    /// Exchanges the code carried by `callback_url` for tokens.
    ///
    /// When `expected_state` is given the callback's `state` must equal it.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Authorization`] if the callback carries an OAuth
    /// error, [`FlowError::MissingField`] if it has no code,
    /// [`FlowError::StateMismatch`] on a state mismatch, and
    /// [`FlowError::TokenExchange`] if the token endpoint fails.
    pub async fn exchange_code(
        &self,
        token_endpoint: &str,
        callback_url: &Url,
        expected_state: Option<&str>,
    ) -> Result<TokenSet> {
        let callback = parse_callback(callback_url)?;
        if let Some(expected) = expected_state {
            verify_state(&callback, expected)?;
        }

        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", &callback.code);
        params.insert("redirect_uri", &self.config.redirect_uri);
        params.insert("client_id", &self.config.client_id);

        let mut request = self.http.post(token_endpoint).form(&params);
        if let Some(secret) = &self.config.client_secret {
            request = request.basic_auth(&self.config.client_id, Some(secret));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| FlowError::TokenExchange(format!("token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(
                FlowError::TokenExchange(format!("token endpoint returned {status}: {body}")).into(),
            );
        }

        let tokens: TokenSet = resp
            .json()
            .await
            .map_err(|e| FlowError::TokenExchange(format!("failed to parse token response: {e}")))?;

        Ok(tokens)
    }
}

// ---------------------------------------------------------------------------
// Utility functions
// ---------------------------------------------------------------------------

/// Generates a random anti-forgery state.
///
/// 16 random bytes encoded as base64url without padding.
pub fn generate_state() -> String {
    use rand::RngCore as _;
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Returns the first value of query parameter `name` in `url`, decoded.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use guest_idp_flow::oidc::client::query_param;
///
/// let url = Url::parse("http://oidc.localhost/login?login_challenge=abc123").unwrap();
/// assert_eq!(query_param(&url, "login_challenge").as_deref(), Some("abc123"));
/// assert!(query_param(&url, "consent_challenge").is_none());
/// ```
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Reads the authorization response out of a callback URL.
///
/// # Errors
///
/// Returns [`FlowError::Authorization`] if the URL carries an `error`
/// parameter and [`FlowError::MissingField`] if it has no `code`.
pub fn parse_callback(callback_url: &Url) -> Result<CallbackParams> {
    if let Some(error) = query_param(callback_url, "error") {
        return Err(FlowError::Authorization {
            error,
            description: query_param(callback_url, "error_description"),
        }
        .into());
    }

    let code = query_param(callback_url, "code").ok_or_else(|| {
        FlowError::MissingField(format!("code in callback URL {callback_url}"))
    })?;

    Ok(CallbackParams {
        code,
        state: query_param(callback_url, "state"),
    })
}

/// Checks that the callback echoed `expected` as its `state`.
///
/// # Errors
///
/// Returns [`FlowError::StateMismatch`] when the state is absent or differs.
pub fn verify_state(callback: &CallbackParams, expected: &str) -> Result<()> {
    match callback.state.as_deref() {
        Some(state) if state == expected => Ok(()),
        _ => Err(FlowError::StateMismatch.into()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
