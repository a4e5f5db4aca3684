//! guest-idp-flow - end-to-end OIDC flow against the guest identity provider
//!
//! Main entry point: runs the whole flow once and prints the decoded tokens.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use guest_idp_flow::cli::Cli;
use guest_idp_flow::config::Config;
use guest_idp_flow::oidc::flow;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    tracing::info!(
        issuer = %config.oidc.issuer_url,
        guest_idp = %config.guest_idp.base_url,
        client_id = %config.oidc.client_id,
        "Starting OIDC flow"
    );

    let outcome = flow::run(&config).await?;

    tracing::info!(
        subject = ?outcome.id_token_decoded.claims.get("sub"),
        "Flow completed"
    );
    Ok(())
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so stdout carries only the flow report.
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "guest_idp_flow=debug"
    } else {
        "guest_idp_flow=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
