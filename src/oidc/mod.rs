//! OIDC authorization code flow against the guest identity provider
//!
//! # Module Layout
//!
//! - [`discovery`]  -- discovery document loading with a file cache
//! - [`client`]     -- relying party: authorization URL, callback, token exchange
//! - [`user_agent`] -- simulated cookie-bearing browser
//! - [`guest_idp`]  -- guest identity provider login/consent endpoints
//! - [`flow`]       -- the end-to-end flow driver
//! - [`token`]      -- unverified token inspection

pub mod client;
pub mod discovery;
pub mod flow;
pub mod guest_idp;
pub mod token;
pub mod user_agent;
