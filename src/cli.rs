//! Command-line interface definition for the flow driver
//!
//! Running the binary without arguments executes the whole flow once. The
//! flags only adjust where configuration comes from and opt into extra
//! checks.

use clap::Parser;

/// guest-idp-flow - end-to-end OIDC flow against the guest identity provider
///
/// Simulates a browser walking through discovery, login challenge, consent
/// challenge and token exchange, then prints the decoded tokens.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "guest-idp-flow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Ignore the cached discovery document and fetch it again
    #[arg(long)]
    pub refresh_discovery: bool,

    /// Reject the callback when its `state` differs from the one sent
    #[arg(long)]
    pub verify_state: bool,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_arguments() {
        let cli = Cli::try_parse_from(["guest-idp-flow"]).unwrap();
        assert!(!cli.verbose);
        assert!(!cli.refresh_discovery);
        assert!(!cli.verify_state);
    }

    #[test]
    fn test_cli_parse_all_flags() {
        let cli = Cli::try_parse_from([
            "guest-idp-flow",
            "--config",
            "local.yaml",
            "--verbose",
            "--refresh-discovery",
            "--verify-state",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("local.yaml"));
        assert!(cli.verbose);
        assert!(cli.refresh_discovery);
        assert!(cli.verify_state);
    }

    #[test]
    fn test_cli_rejects_unknown_flag() {
        assert!(Cli::try_parse_from(["guest-idp-flow", "--bogus"]).is_err());
    }
}
