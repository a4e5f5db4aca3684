//! End-to-end authorization code flow against the guest identity provider
//!
//! [`FlowDriver::run`] walks the flow in a fixed order; every step consumes
//! the URL produced by the step before it, so a challenge can only ever be
//! submitted right after the redirect that carried it.
//!
//! 1. The app builds the authorization URL and records `state`.
//! 2. The browser visits it; the provider must answer `302` to the login URL.
//! 3. The login app extracts `login_challenge` and submits it to the guest
//!    IdP, which answers with the login-accepted URL.
//! 4. The browser visits that URL; the provider redirects to the consent URL.
//! 5. The login app extracts `consent_challenge` and submits it to the guest
//!    IdP, which answers with the consent-accepted URL.
//! 6. The browser visits that URL; the provider redirects to the app
//!    callback, carrying the authorization code.
//! 7. The app exchanges the code for tokens.
//! 8. Both tokens are decoded, without verification, and printed.
//!
//! Any failure aborts the run. Nothing is retried.

use colored::Colorize;
use url::Url;

use crate::config::Config;
use crate::error::{FlowError, Result};
use crate::oidc::client::{query_param, AuthorizationRequest, OidcClient, OidcClientConfig, TokenSet};
use crate::oidc::discovery::{DiscoveryDocument, DiscoveryLoader};
use crate::oidc::guest_idp::GuestIdpClient;
use crate::oidc::token::{describe_timestamps, inspect_unverified, UnverifiedToken};
use crate::oidc::user_agent::{ExpectedRedirect, UserAgent};

// ---------------------------------------------------------------------------
// FlowOutcome
// ---------------------------------------------------------------------------

/// Everything a completed run observed, in flow order.
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    /// Authorization URL and the `state` sent with it.
    pub authorization: AuthorizationRequest,
    /// Login URL the provider redirected to.
    pub login_url: Url,
    /// Challenge extracted from [`Self::login_url`].
    pub login_challenge: String,
    /// Redirect returned by the guest IdP after login.
    pub login_accepted_url: Url,
    /// Consent URL the provider redirected to.
    pub consent_url: Url,
    /// Challenge extracted from [`Self::consent_url`].
    pub consent_challenge: String,
    /// Redirect returned by the guest IdP after consent.
    pub consent_accepted_url: Url,
    /// App callback URL carrying the authorization code.
    pub callback_url: Url,
    /// Raw token endpoint response.
    pub tokens: TokenSet,
    /// The ID token from [`Self::tokens`].
    pub id_token: String,
    /// Decoded access token.
    pub access_token_decoded: UnverifiedToken,
    /// Decoded ID token.
    pub id_token_decoded: UnverifiedToken,
}

// ---------------------------------------------------------------------------
// FlowDriver
// ---------------------------------------------------------------------------

/// Runs one authorization code flow with a fresh browser session.
pub struct FlowDriver {
    oidc: OidcClient,
    user_agent: UserAgent,
    guest_idp: GuestIdpClient,
    verify_state: bool,
}

impl FlowDriver {
    /// Assembles a driver from its collaborators.
    ///
    /// The guest IdP client should share the user agent's HTTP client so
    /// challenge submissions carry the session cookies.
    pub fn new(oidc: OidcClient, user_agent: UserAgent, guest_idp: GuestIdpClient) -> Self {
        Self {
            oidc,
            user_agent,
            guest_idp,
            verify_state: false,
        }
    }

    /// Builds a driver for the endpoints and client in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be constructed or the guest
    /// IdP URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let user_agent = UserAgent::new(&config.http)?;
        let http = config
            .http
            .apply(reqwest::Client::builder())
            .build()
            .map_err(FlowError::Http)?;
        let oidc = OidcClient::new(http, OidcClientConfig::from(&config.oidc));
        let guest_idp = GuestIdpClient::new(user_agent.client().clone(), &config.guest_idp.base_url)?;

        Ok(Self::new(oidc, user_agent, guest_idp).with_state_verification(config.oidc.verify_state))
    }

    /// Rejects the callback when its `state` differs from the one sent.
    pub fn with_state_verification(mut self, verify_state: bool) -> Self {
        self.verify_state = verify_state;
        self
    }

    /// Runs the flow against the endpoints in `discovery`.
    ///
    /// # Errors
    ///
    /// Returns the first failure any step hits; see the module docs for the
    /// order. Status failures surface as [`FlowError::UnexpectedStatus`],
    /// absent challenges or headers as [`FlowError::MissingField`], and
    /// undecodable tokens as [`FlowError::Decode`].
    pub async fn run(&self, discovery: &DiscoveryDocument) -> Result<FlowOutcome> {
        section("app");
        say("App initiates an oauth2 flow");
        let authorization = self
            .oidc
            .authorization_url(&discovery.authorization_endpoint)?;
        show("authorization_url", &authorization.url);
        show("state", &authorization.state);

        say("App's oidc client redirects browser to authorization URL");
        section("oidc");
        let login_url = self
            .user_agent
            .follow(
                "authorization redirect",
                &authorization.url,
                ExpectedRedirect::Found,
            )
            .await?;
        say("OIDC implementation redirects browser to login URL");
        show("login_url", &login_url);

        section("login app");
        say("Login app gets login challenge");
        let login_challenge = extract_challenge(&login_url, "login_challenge")?;
        show("login_challenge", &login_challenge);

        say("Login app sends challenge to idp service");
        let login_accepted_url = self.guest_idp.login(&login_challenge).await?;
        say("idp service sends back a redirect URL");
        show("login_accepted_url", &login_accepted_url);
        say("Login app redirects browser to URL");

        section("oidc");
        let consent_url = self
            .user_agent
            .follow("consent redirect", &login_accepted_url, ExpectedRedirect::Any)
            .await?;
        say("OIDC implementation redirects browser to consent URL");
        show("consent_url", &consent_url);

        section("login app");
        say("Login app gets consent challenge");
        let consent_challenge = extract_challenge(&consent_url, "consent_challenge")?;
        show("consent_challenge", &consent_challenge);

        say("Login app sends challenge to idp service");
        let consent_accepted_url = self.guest_idp.consent(&consent_challenge).await?;
        say("idp service sends back a redirect URL");
        show("consent_accepted_url", &consent_accepted_url);
        say("Login app redirects browser to URL");

        section("oidc");
        let callback_url = self
            .user_agent
            .follow(
                "callback redirect",
                &consent_accepted_url,
                ExpectedRedirect::Any,
            )
            .await?;
        say("OIDC implementation redirects browser to callback URL");
        show("callback_url", &callback_url);

        section("app");
        say("App exchanges code for tokens");
        let expected_state = self.verify_state.then_some(authorization.state.as_str());
        let tokens = self
            .oidc
            .exchange_code(&discovery.token_endpoint, &callback_url, expected_state)
            .await?;
        let id_token = tokens
            .id_token
            .clone()
            .ok_or_else(|| FlowError::MissingField("id_token in token response".to_string()))?;

        let access_token_decoded = inspect_unverified(&tokens.access_token)?;
        print_token("access_token", &access_token_decoded)?;
        let id_token_decoded = inspect_unverified(&id_token)?;
        print_token("id_token", &id_token_decoded)?;

        Ok(FlowOutcome {
            authorization,
            login_url,
            login_challenge,
            login_accepted_url,
            consent_url,
            consent_challenge,
            consent_accepted_url,
            callback_url,
            tokens,
            id_token,
            access_token_decoded,
            id_token_decoded,
        })
    }
}

/// Loads discovery and runs one flow with the settings in `config`.
///
/// # Errors
///
/// Returns [`FlowError::Discovery`] if discovery cannot be loaded, and any
/// error [`FlowDriver::run`] returns.
pub async fn run(config: &Config) -> Result<FlowOutcome> {
    let discovery = DiscoveryLoader::from_config(config)?.get_discovery().await?;

    println!("Discovered OIDC:");
    show("authorization_endpoint", &discovery.authorization_endpoint);
    show("token_endpoint", &discovery.token_endpoint);
    show(
        "scopes_supported",
        describe_scopes(discovery.scopes_supported.as_deref()),
    );
    println!();

    FlowDriver::from_config(config)?.run(&discovery).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns the challenge named `name` from the query of `url`.
///
/// # Errors
///
/// Returns [`FlowError::MissingField`] if the parameter is absent or empty.
pub fn extract_challenge(url: &Url, name: &str) -> Result<String> {
    query_param(url, name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| FlowError::MissingField(format!("{name} in {url}")).into())
}

/// Renders advertised scopes as a space-separated list, or `-` when the
/// provider does not advertise any.
fn describe_scopes(scopes: Option<&[String]>) -> String {
    match scopes {
        Some(scopes) if !scopes.is_empty() => scopes.join(" "),
        _ => "-".to_string(),
    }
}

fn section(name: &str) {
    println!("{}", format!("---{name}---").bold().cyan());
}

fn say(message: &str) {
    println!("{message}");
}

fn show(name: &str, value: impl std::fmt::Display) {
    println!("{}={}", name.dimmed(), value);
}

fn print_token(name: &str, token: &UnverifiedToken) -> Result<()> {
    println!("{}", format!("Decoded {name}:").bold());
    println!("  alg={:?} kid={}", token.header.alg, token.header.kid.as_deref().unwrap_or("-"));
    for (claim, at) in describe_timestamps(&token.claims) {
        println!("  {claim} -> {at}");
    }
    println!("{}", serde_json::to_string_pretty(&token.claims)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_challenge_exact_value() {
        let url = Url::parse("http://oidc.localhost/login?login_challenge=abc123").unwrap();
        assert_eq!(extract_challenge(&url, "login_challenge").unwrap(), "abc123");
    }

    #[test]
    fn test_extract_challenge_first_of_repeated() {
        let url = Url::parse("http://oidc.localhost/consent?consent_challenge=C1&consent_challenge=C2")
            .unwrap();
        assert_eq!(extract_challenge(&url, "consent_challenge").unwrap(), "C1");
    }

    #[test]
    fn test_extract_challenge_missing() {
        let url = Url::parse("http://oidc.localhost/login?other=1").unwrap();
        let err = extract_challenge(&url, "login_challenge").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FlowError>(),
            Some(FlowError::MissingField(_))
        ));
    }

    #[test]
    fn test_extract_challenge_empty_value_is_missing() {
        let url = Url::parse("http://oidc.localhost/login?login_challenge=").unwrap();
        assert!(extract_challenge(&url, "login_challenge").is_err());
    }

    #[test]
    fn test_extract_challenge_ignores_similar_names() {
        let url = Url::parse("http://oidc.localhost/login?login_challenge_v2=x").unwrap();
        assert!(extract_challenge(&url, "login_challenge").is_err());
    }

    #[test]
    fn test_describe_scopes_lists_values() {
        let scopes = vec!["openid".to_string(), "offline".to_string()];
        assert_eq!(describe_scopes(Some(scopes.as_slice())), "openid offline");
    }

    #[test]
    fn test_describe_scopes_absent_or_empty() {
        assert_eq!(describe_scopes(None), "-");
        assert_eq!(describe_scopes(Some(&[][..])), "-");
    }

    #[test]
    fn test_from_config_builds_driver() {
        let mut config = Config::default();
        config.oidc.verify_state = true;
        let driver = FlowDriver::from_config(&config).unwrap();
        assert!(driver.verify_state);
    }

    // End-to-end runs against mock servers are in tests/flow_test.rs
}
