//! Configuration management for the flow driver
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Every hostname, the redirect URI and the discovery cache path live here
//! so tests can point the driver at mock servers.

use crate::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Relying party and OIDC provider settings
    #[serde(default)]
    pub oidc: OidcConfig,
    /// Guest identity provider settings
    #[serde(default)]
    pub guest_idp: GuestIdpConfig,
    /// Discovery document cache settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Shared HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// OIDC provider and relying party configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// Issuer base URL; discovery is fetched from
    /// `{issuer_url}/.well-known/openid-configuration`
    #[serde(default = "default_issuer_url")]
    pub issuer_url: String,

    /// OAuth2 client identifier registered with the provider
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Client secret for confidential clients
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Space-separated scopes to request
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Value of the `audience` authorization parameter
    #[serde(default = "default_audience")]
    pub audience: Option<String>,

    /// Relying party callback URL
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Compare the callback `state` with the one sent before exchanging the
    /// code
    #[serde(default)]
    pub verify_state: bool,
}

fn default_issuer_url() -> String {
    "http://oidc.localhost".to_string()
}

fn default_client_id() -> String {
    "f2f9cd70-fdd9-4e88-aba3-aff68357759e".to_string()
}

fn default_scope() -> String {
    "openid".to_string()
}

fn default_audience() -> Option<String> {
    Some("react-client".to_string())
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/oidc/guest/callback".to_string()
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            issuer_url: default_issuer_url(),
            client_id: default_client_id(),
            client_secret: None,
            scope: default_scope(),
            audience: default_audience(),
            redirect_uri: default_redirect_uri(),
            verify_state: false,
        }
    }
}

/// Guest identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestIdpConfig {
    /// Base URL the `/v0/guest/*` endpoints are resolved against
    #[serde(default = "default_guest_idp_url")]
    pub base_url: String,
}

fn default_guest_idp_url() -> String {
    "http://guest-idp.localhost:4000".to_string()
}

impl Default for GuestIdpConfig {
    fn default() -> Self {
        Self {
            base_url: default_guest_idp_url(),
        }
    }
}

/// Discovery document cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Location of the cached discovery document
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Skip the cache read and always fetch from the network
    #[serde(default)]
    pub refresh: bool,
}

fn default_cache_path() -> PathBuf {
    std::env::temp_dir().join("guest_idp_oidc.json")
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            refresh: false,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout; unset means requests may wait indefinitely
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl HttpConfig {
    /// Applies the configured timeout, if any, to a client builder
    pub fn apply(&self, builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        match self.timeout_seconds {
            Some(secs) => builder.timeout(std::time::Duration::from_secs(secs)),
            None => builder,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            oidc: OidcConfig::default(),
            guest_idp: GuestIdpConfig::default(),
            discovery: DiscoveryConfig::default(),
            http: HttpConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FlowError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| FlowError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(client_id) = std::env::var("OIDC_CLIENT") {
            self.oidc.client_id = client_id;
        }

        if let Ok(secret) = std::env::var("OIDC_CLIENT_SECRET") {
            self.oidc.client_secret = Some(secret);
        }

        if let Ok(issuer) = std::env::var("OIDC_ISSUER_URL") {
            self.oidc.issuer_url = issuer;
        }

        if let Ok(redirect_uri) = std::env::var("OIDC_REDIRECT_URI") {
            self.oidc.redirect_uri = redirect_uri;
        }

        if let Ok(scope) = std::env::var("OIDC_SCOPE") {
            self.oidc.scope = scope;
        }

        if let Ok(audience) = std::env::var("OIDC_AUDIENCE") {
            // An empty value drops the parameter altogether.
            self.oidc.audience = if audience.is_empty() {
                None
            } else {
                Some(audience)
            };
        }

        if let Ok(base_url) = std::env::var("GUEST_IDP_URL") {
            self.guest_idp.base_url = base_url;
        }

        if let Ok(cache_path) = std::env::var("OIDC_DISCOVERY_CACHE") {
            self.discovery.cache_path = PathBuf::from(cache_path);
        }

        if let Ok(timeout) = std::env::var("GUEST_IDP_FLOW_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.http.timeout_seconds = Some(value);
            } else {
                tracing::warn!("Invalid GUEST_IDP_FLOW_TIMEOUT_SECONDS: {}", timeout);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if cli.refresh_discovery {
            self.discovery.refresh = true;
        }

        if cli.verify_state {
            self.oidc.verify_state = true;
        }
    }

    /// Validate the configuration
    ///
    /// Ensures required identifiers are set and every configured URL is an
    /// absolute http(s) URL.
    ///
    /// # Returns
    ///
    /// Returns Ok if configuration is valid
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.oidc.client_id.trim().is_empty() {
            return Err(FlowError::Config("oidc.client_id cannot be empty".to_string()).into());
        }

        if self.oidc.scope.trim().is_empty() {
            return Err(FlowError::Config("oidc.scope cannot be empty".to_string()).into());
        }

        require_http_url("oidc.issuer_url", &self.oidc.issuer_url)?;
        require_http_url("oidc.redirect_uri", &self.oidc.redirect_uri)?;
        require_http_url("guest_idp.base_url", &self.guest_idp.base_url)?;

        if self.http.timeout_seconds == Some(0) {
            return Err(FlowError::Config(
                "http.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

fn require_http_url(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| FlowError::Config(format!("{field} is not a valid URL ({value}): {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FlowError::Config(format!(
            "{field} must use http or https, got {other}"
        ))
        .into()),
    }
}
