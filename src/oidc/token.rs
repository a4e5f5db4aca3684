//! Unverified token inspection
//!
//! Decodes the header and payload of a JWS compact token so a developer can
//! read the claims an authorization server issued. Signatures are NOT
//! verified. Nothing in this module may be used to decide whether a token is
//! trustworthy.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use jsonwebtoken::Header;

use crate::error::{FlowError, Result};

/// Claims carried in a token payload.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// base64url engine that accepts segments with or without `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Numeric-date claims rendered as timestamps by [`describe_timestamps`].
const TIMESTAMP_CLAIMS: [&str; 4] = ["exp", "iat", "nbf", "auth_time"];

/// Header and claims of a token decoded without signature verification.
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    /// The JOSE header.
    pub header: Header,
    /// The payload claims.
    pub claims: Claims,
}

/// Decodes the payload of `token` without verifying its signature.
///
/// # Errors
///
/// Returns [`FlowError::Decode`] if the token is not three dot-separated
/// segments, the header is not a valid JOSE header, or the payload is not a
/// base64url-encoded JSON object.
///
/// # Examples
///
/// ```
/// use guest_idp_flow::oidc::token::decode_unverified;
///
/// // {"alg":"HS256"} . {"sub":"guest"} . (signature is never checked)
/// let claims = decode_unverified("eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJndWVzdCJ9.c2ln").unwrap();
/// assert_eq!(claims["sub"], "guest");
///
/// assert!(decode_unverified("not-a-token").is_err());
/// ```
pub fn decode_unverified(token: &str) -> Result<Claims> {
    Ok(inspect_unverified(token)?.claims)
}

/// Decodes header and payload of `token` without verifying its signature.
///
/// # Errors
///
/// Same as [`decode_unverified`].
pub fn inspect_unverified(token: &str) -> Result<UnverifiedToken> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(FlowError::Decode(format!(
            "expected 3 dot-separated segments, found {}",
            segments.len()
        ))
        .into());
    }

    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| FlowError::Decode(format!("invalid header: {e}")))?;

    let payload = URL_SAFE_LENIENT
        .decode(segments[1])
        .map_err(|e| FlowError::Decode(format!("payload is not base64url: {e}")))?;

    let claims: Claims = serde_json::from_slice(&payload)
        .map_err(|e| FlowError::Decode(format!("payload is not a JSON object: {e}")))?;

    Ok(UnverifiedToken { header, claims })
}

/// Renders the numeric-date claims present in `claims` as RFC 3339 strings.
///
/// Claims that are absent or not integral seconds are skipped.
pub fn describe_timestamps(claims: &Claims) -> Vec<(&'static str, String)> {
    TIMESTAMP_CLAIMS
        .iter()
        .filter_map(|name| {
            let secs = claims.get(*name)?.as_i64()?;
            let at: DateTime<Utc> = DateTime::from_timestamp(secs, 0)?;
            Some((*name, at.to_rfc3339()))
        })
        .collect()
}
