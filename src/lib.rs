//! guest-idp-flow - end-to-end OIDC flow driver library
//!
//! Runs one OAuth2 / OpenID Connect authorization code flow against an OIDC
//! provider and the guest identity provider, simulating the browser in
//! between, and decodes the issued tokens for inspection.
//!
//! # Architecture
//!
//! - `oidc`: discovery, relying-party client, simulated browser, guest IdP
//!   client, flow driver and token inspection
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use guest_idp_flow::{cli::Cli, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Cli::default())?;
//!     config.validate()?;
//!
//!     let outcome = guest_idp_flow::oidc::flow::run(&config).await?;
//!     println!("subject: {:?}", outcome.id_token_decoded.claims.get("sub"));
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod oidc;

// Re-export commonly used types
pub use config::Config;
pub use error::{FlowError, Result};
pub use oidc::flow::{FlowDriver, FlowOutcome};
pub use oidc::token::decode_unverified;
