//! OpenID Connect discovery with a local file cache
//!
//! The discovery document is read from a cache file when present. On a cache
//! miss it is fetched from `{issuer}/.well-known/openid-configuration` and
//! written back to the cache, pretty-printed, for later runs. The cache has
//! no expiry: once a file exists it is trusted until deleted or refreshed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::error::{FlowError, Result};

/// Path appended to the issuer to locate the discovery document.
pub const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";

// ---------------------------------------------------------------------------
// DiscoveryDocument
// ---------------------------------------------------------------------------

/// OIDC provider metadata (OpenID Connect Discovery 1.0).
///
/// Only the fields the flow needs are typed. Everything else the provider
/// advertises is kept in [`Self::extra`] so the document survives a round
/// trip through the cache unchanged.
///
/// # Examples
///
/// ```
/// use guest_idp_flow::oidc::discovery::DiscoveryDocument;
///
/// let json = r#"{
///     "issuer": "http://oidc.localhost/",
///     "authorization_endpoint": "http://oidc.localhost/oauth2/auth",
///     "token_endpoint": "http://oidc.localhost/oauth2/token",
///     "scopes_supported": ["openid", "offline"],
///     "jwks_uri": "http://oidc.localhost/.well-known/jwks.json"
/// }"#;
///
/// let doc: DiscoveryDocument = serde_json::from_str(json).unwrap();
/// assert_eq!(doc.token_endpoint, "http://oidc.localhost/oauth2/token");
/// assert!(doc.extra.contains_key("jwks_uri"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    /// The issuer identifier of the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// The URL of the authorization endpoint.
    pub authorization_endpoint: String,

    /// The URL of the token endpoint.
    pub token_endpoint: String,

    /// Scopes the provider supports, if advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// Additional metadata not modelled above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Builds the discovery URL for an issuer by appending
/// [`WELL_KNOWN_PATH`] to its path.
///
/// # Errors
///
/// Returns [`FlowError::Config`] if `issuer` is not a valid URL.
///
/// # Examples
///
/// ```
/// use guest_idp_flow::oidc::discovery::discovery_url;
///
/// let url = discovery_url("http://oidc.localhost/").unwrap();
/// assert_eq!(url.as_str(), "http://oidc.localhost/.well-known/openid-configuration");
/// ```
pub fn discovery_url(issuer: &str) -> Result<Url> {
    let mut url = Url::parse(issuer)
        .map_err(|e| FlowError::Config(format!("invalid issuer URL {issuer}: {e}")))?;
    let path = format!("{}{}", url.path().trim_end_matches('/'), WELL_KNOWN_PATH);
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

// ---------------------------------------------------------------------------
// DiscoveryLoader
// ---------------------------------------------------------------------------

/// Loads the discovery document from the cache file or the network.
pub struct DiscoveryLoader {
    http: reqwest::Client,
    discovery_url: Url,
    cache_path: PathBuf,
    refresh: bool,
}

impl DiscoveryLoader {
    /// Creates a loader that reads `cache_path` before falling back to
    /// `discovery_url`.
    pub fn new(http: reqwest::Client, discovery_url: Url, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            http,
            discovery_url,
            cache_path: cache_path.into(),
            refresh: false,
        }
    }

    /// Builds a loader from the issuer and cache settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the issuer URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = config.http.apply(reqwest::Client::builder()).build()?;
        let url = discovery_url(&config.oidc.issuer_url)?;
        Ok(Self::new(http, url, config.discovery.cache_path.clone())
            .with_refresh(config.discovery.refresh))
    }

    /// When `refresh` is set the cache is never read, only overwritten.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Location of the cache file.
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Returns the discovery document, from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Discovery`] if the cache exists but cannot be
    /// read or parsed, if the network fetch fails or returns a non-success
    /// status, or if the fetched document lacks the required endpoints.
    pub async fn get_discovery(&self) -> Result<DiscoveryDocument> {
        if !self.refresh {
            if let Some(doc) = self.read_cache().await? {
                tracing::debug!(path = %self.cache_path.display(), "using cached discovery document");
                return Ok(doc);
            }
        }

        let raw = self.fetch().await?;
        let doc: DiscoveryDocument = serde_json::from_value(raw.clone()).map_err(|e| {
            FlowError::Discovery(format!(
                "discovery document from {} is incomplete: {e}",
                self.discovery_url
            ))
        })?;

        self.write_cache(&raw).await?;
        Ok(doc)
    }

    async fn read_cache(&self) -> Result<Option<DiscoveryDocument>> {
        let contents = match tokio::fs::read_to_string(&self.cache_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(FlowError::Discovery(format!(
                    "failed to read discovery cache {}: {e}",
                    self.cache_path.display()
                ))
                .into())
            }
        };

        let doc = serde_json::from_str(&contents).map_err(|e| {
            FlowError::Discovery(format!(
                "invalid discovery cache {}: {e}",
                self.cache_path.display()
            ))
        })?;
        Ok(Some(doc))
    }

    async fn fetch(&self) -> Result<serde_json::Value> {
        tracing::info!(url = %self.discovery_url, "fetching discovery document");

        let resp = self
            .http
            .get(self.discovery_url.clone())
            .send()
            .await
            .map_err(|e| FlowError::Discovery(format!("discovery fetch failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(FlowError::Discovery(format!(
                "discovery endpoint {} returned {}",
                self.discovery_url,
                resp.status()
            ))
            .into());
        }

        let raw = resp.json().await.map_err(|e| {
            FlowError::Discovery(format!("failed to parse discovery document: {e}"))
        })?;
        Ok(raw)
    }

    async fn write_cache(&self, raw: &serde_json::Value) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    FlowError::Discovery(format!(
                        "failed to create discovery cache directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        // serde_json's pretty printer indents with two spaces.
        let contents = serde_json::to_string_pretty(raw)?;
        tokio::fs::write(&self.cache_path, contents)
            .await
            .map_err(|e| {
                FlowError::Discovery(format!(
                    "failed to write discovery cache {}: {e}",
                    self.cache_path.display()
                ))
            })?;

        tracing::debug!(path = %self.cache_path.display(), "wrote discovery cache");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_url_for_root_issuer() {
        let url = discovery_url("http://oidc.localhost").unwrap();
        assert_eq!(
            url.as_str(),
            "http://oidc.localhost/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_discovery_url_appends_to_issuer_path() {
        let url = discovery_url("https://auth.example.com/tenant/v2/").unwrap();
        assert_eq!(
            url.as_str(),
            "https://auth.example.com/tenant/v2/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_discovery_url_drops_query_and_fragment() {
        let url = discovery_url("http://oidc.localhost/?x=1#frag").unwrap();
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_discovery_url_rejects_invalid_issuer() {
        let err = discovery_url("oidc.localhost").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FlowError>(),
            Some(FlowError::Config(_))
        ));
    }

    #[test]
    fn test_discovery_document_requires_token_endpoint() {
        let json = r#"{"authorization_endpoint": "http://oidc.localhost/auth"}"#;
        assert!(serde_json::from_str::<DiscoveryDocument>(json).is_err());
    }

    #[test]
    fn test_discovery_document_reserializes_without_nulls() {
        let json = serde_json::json!({
            "authorization_endpoint": "http://oidc.localhost/auth",
            "token_endpoint": "http://oidc.localhost/token",
            "response_types_supported": ["code", "id_token"]
        });

        let doc: DiscoveryDocument = serde_json::from_value(json.clone()).unwrap();
        assert!(doc.issuer.is_none());
        assert!(doc.scopes_supported.is_none());
        assert_eq!(serde_json::to_value(&doc).unwrap(), json);
    }

    #[test]
    fn test_loader_refresh_flag() {
        let loader = DiscoveryLoader::new(
            reqwest::Client::new(),
            discovery_url("http://oidc.localhost").unwrap(),
            "/tmp/unused.json",
        )
        .with_refresh(true);
        assert!(loader.refresh);
        assert_eq!(loader.cache_path(), Path::new("/tmp/unused.json"));
    }

    // Cache and network behaviour is covered in tests/discovery_test.rs
}
