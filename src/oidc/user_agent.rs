//! Simulated browser session
//!
//! The [`UserAgent`] stands in for the user's browser. It keeps cookies
//! between requests, which is how the OIDC provider ties the login and
//! consent steps to one session, but it never follows redirects on its own:
//! each step inspects the redirect it receives and decides what to do next.

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use url::Url;

use crate::config::HttpConfig;
use crate::error::{FlowError, Result};

/// Which redirect statuses a navigation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedRedirect {
    /// Exactly `302 Found`.
    Found,
    /// Any `3xx` status.
    Any,
}

impl ExpectedRedirect {
    fn accepts(self, status: StatusCode) -> bool {
        match self {
            Self::Found => status == StatusCode::FOUND,
            Self::Any => status.is_redirection(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Found => "302 Found",
            Self::Any => "a 3xx redirect",
        }
    }
}

/// A cookie-bearing HTTP client that does not follow redirects.
#[derive(Debug, Clone)]
pub struct UserAgent {
    http: reqwest::Client,
}

impl UserAgent {
    /// Creates a fresh session with an empty cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Http`] if the client cannot be constructed.
    pub fn new(http_config: &HttpConfig) -> Result<Self> {
        let builder = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(Policy::none());
        let http = http_config.apply(builder).build().map_err(FlowError::Http)?;
        Ok(Self { http })
    }

    /// The underlying client. Requests sent through it share the session's
    /// cookies.
    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }

    /// Navigates to `url` and returns the absolute target of the redirect it
    /// answers with.
    ///
    /// `step` names the flow step in errors and logs. A relative `Location`
    /// is resolved against `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnexpectedStatus`] if the status is not accepted
    /// by `expected`, and [`FlowError::MissingField`] if the response has no
    /// usable `Location` header.
    pub async fn follow(&self, step: &str, url: &Url, expected: ExpectedRedirect) -> Result<Url> {
        tracing::debug!(step, %url, "browser navigating");

        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status();
        if !expected.accepts(status) {
            return Err(FlowError::UnexpectedStatus {
                step: step.to_string(),
                expected: expected.describe().to_string(),
                actual: status.as_u16(),
            }
            .into());
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| FlowError::MissingField(format!("Location header in {step} response")))?;

        let target = url.join(location)?;
        tracing::debug!(step, status = status.as_u16(), %target, "browser redirected");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_accepts_only_302() {
        assert!(ExpectedRedirect::Found.accepts(StatusCode::FOUND));
        assert!(!ExpectedRedirect::Found.accepts(StatusCode::SEE_OTHER));
        assert!(!ExpectedRedirect::Found.accepts(StatusCode::OK));
    }

    #[test]
    fn test_any_accepts_all_redirects() {
        assert!(ExpectedRedirect::Any.accepts(StatusCode::FOUND));
        assert!(ExpectedRedirect::Any.accepts(StatusCode::SEE_OTHER));
        assert!(ExpectedRedirect::Any.accepts(StatusCode::TEMPORARY_REDIRECT));
        assert!(!ExpectedRedirect::Any.accepts(StatusCode::OK));
        assert!(!ExpectedRedirect::Any.accepts(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_user_agent_builds_with_timeout() {
        let config = HttpConfig {
            timeout_seconds: Some(5),
        };
        assert!(UserAgent::new(&config).is_ok());
    }

    // Redirect and cookie handling against a live server is covered in
    // tests/flow_test.rs
}
