//! Client for the guest identity provider
//!
//! The guest identity provider accepts every login and consent challenge it
//! is handed and answers with the URL the browser should visit next. The
//! flow submits challenges through the browser session so the calls look
//! exactly like the login app's own.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FlowError, Result};

/// Login endpoint path.
pub const LOGIN_PATH: &str = "/v0/guest/login";

/// Consent endpoint path.
pub const CONSENT_PATH: &str = "/v0/guest/consent";

/// Body posted to the login and consent endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeRequest {
    /// The login or consent challenge issued by the OIDC provider.
    pub challenge: String,
}

/// Successful response: where to send the browser next.
#[derive(Debug, Clone, Deserialize)]
pub struct RedirectResponse {
    /// Absolute URL on the OIDC provider.
    #[serde(default)]
    pub redirect: Option<String>,
}

/// Error body the guest identity provider renders on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Short error code, e.g. `invalid`.
    pub error: String,
    /// Human-readable detail.
    #[serde(default)]
    pub message: Option<String>,
}

/// HTTP client for the `/v0/guest/*` endpoints.
pub struct GuestIdpClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GuestIdpClient {
    /// Creates a client that sends requests through `http`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Config`] if `base_url` is not a valid URL.
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FlowError::Config(format!("invalid guest IdP URL {base_url}: {e}")))?;
        Ok(Self { http, base_url })
    }

    /// Accepts a login challenge and returns the login-accepted redirect.
    ///
    /// # Errors
    ///
    /// See [`Self::consent`].
    pub async fn login(&self, challenge: &str) -> Result<Url> {
        self.submit("login", LOGIN_PATH, challenge).await
    }

    /// Accepts a consent challenge and returns the consent-accepted redirect.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnexpectedStatus`] for any status other than
    /// `200`, with the service's error message attached as context, and
    /// [`FlowError::MissingField`] if the body has no `redirect`.
    pub async fn consent(&self, challenge: &str) -> Result<Url> {
        self.submit("consent", CONSENT_PATH, challenge).await
    }

    /// Appends `path` to the base URL, keeping any path prefix it carries.
    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let full = format!("{}{}", self.base_url.path().trim_end_matches('/'), path);
        url.set_path(&full);
        url
    }

    async fn submit(&self, step: &str, path: &str, challenge: &str) -> Result<Url> {
        let endpoint = self.endpoint(path);
        tracing::debug!(step, %endpoint, "submitting challenge to guest IdP");

        let resp = self
            .http
            .post(endpoint.clone())
            .json(&ChallengeRequest {
                challenge: challenge.to_string(),
            })
            .send()
            .await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => match err.message {
                    Some(message) => format!("{}: {}", err.error, message),
                    None => err.error,
                },
                Err(_) => body,
            };
            let error = FlowError::UnexpectedStatus {
                step: format!("guest IdP {step}"),
                expected: "200 OK".to_string(),
                actual: status.as_u16(),
            };
            return Err(anyhow::Error::from(error)
                .context(format!("guest IdP rejected {step} challenge: {detail}")));
        }

        let body: RedirectResponse = resp.json().await.map_err(FlowError::Http)?;
        let redirect = body
            .redirect
            .ok_or_else(|| FlowError::MissingField(format!("redirect in guest IdP {step} response")))?;

        Ok(Url::parse(&redirect)?)
    }
}
