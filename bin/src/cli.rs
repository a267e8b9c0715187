use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use lookback_common::time::parse_target_date;
use lookback_server::api_types::BalanceAtDateResponse;
use lookback_utils::{
    alloy::StringExt,
    config::Config,
    disk_storage::DiskStorageInterface,
    etherscan::Etherscan,
    historic_balances::{BlockTimestampLocator, LocatorConfig, TargetQuery},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lookback", bin_name = "lookback", version)]
#[command(about = "Historical ETH balance of an address at a calendar date", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the JSON API
    Serve {
        /// Port to listen on, defaults to the config file or 3000
        #[arg(long, short, env = "LOOKBACK_PORT")]
        port: Option<u16>,
    },

    /// Look up the balance of an address at a date and print it as JSON
    Lookup {
        address: String,

        /// YYYY-MM-DD, an RFC 3339 timestamp or unix seconds
        date: String,

        /// Stop probing once a block is this many seconds from the date
        #[arg(long)]
        tolerance: Option<u64>,

        /// Max block timestamp lookups spent searching
        #[arg(long)]
        max_probes: Option<u32>,
    },

    /// Inspect or change the config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective config with the API key masked
    Show,

    /// Store the Etherscan API key in the config file
    SetApiKey { key: String },

    /// Print the config file location
    Path,
}

impl Commands {
    pub async fn handle(self) -> crate::error::Result<()> {
        match self {
            Commands::Serve { port } => serve(port).await,
            Commands::Lookup {
                address,
                date,
                tolerance,
                max_probes,
            } => lookup(&address, &date, tolerance, max_probes).await,
            Commands::Config(cmd) => cmd.handle(),
        }
    }
}

impl ConfigCommands {
    fn handle(self) -> crate::error::Result<()> {
        match self {
            ConfigCommands::Show => {
                let config = Config::load_with_env()?;
                println!("{}", describe(&config));
            }
            ConfigCommands::SetApiKey { key } => {
                Config::set_etherscan_api_key(key.trim().to_string())?;
                println!("{} API key saved to {}", style("✓").green(), Config::path()?.display());
            }
            ConfigCommands::Path => println!("{}", Config::path()?.display()),
        }
        Ok(())
    }
}

/// Cancelled on Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C, shutting down");
            signal.cancel();
        }
    });
    token
}

async fn serve(port: Option<u16>) -> crate::error::Result<()> {
    let config = Config::load_with_env()?;
    let port = port.unwrap_or(config.server_port);
    let oracle = Arc::new(Etherscan::from_config(&config)?);

    lookback_server::serve(
        port,
        oracle,
        BlockTimestampLocator::new(config.locator),
        ctrl_c_token(),
    )
    .await?;

    Ok(())
}

async fn lookup(
    address: &str,
    date: &str,
    tolerance: Option<u64>,
    max_probes: Option<u32>,
) -> crate::error::Result<()> {
    let query = TargetQuery {
        address: address.parse_as_address()?,
        target_timestamp: parse_target_date(date)?,
    };

    let config = Config::load_with_env()?;
    let oracle = Etherscan::from_config(&config)?;
    let locator = BlockTimestampLocator::new(with_overrides(config.locator, tolerance, max_probes));

    let located = locator.locate(&oracle, query, &ctrl_c_token()).await?;
    let response = BalanceAtDateResponse::from(&located);
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

fn with_overrides(
    mut locator: LocatorConfig,
    tolerance: Option<u64>,
    max_probes: Option<u32>,
) -> LocatorConfig {
    if let Some(tolerance) = tolerance {
        locator.tolerance_secs = tolerance;
    }
    if let Some(max_probes) = max_probes {
        locator.max_probes = max_probes;
    }
    locator
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}

fn describe(config: &Config) -> String {
    let api_key = config
        .etherscan_api_key
        .as_deref()
        .map(mask)
        .unwrap_or_else(|| "(not set)".to_string());

    [
        format!("etherscan_api_key    = {api_key}"),
        format!("etherscan_api_url    = {}", config.etherscan_api_url),
        format!("chain_id             = {}", config.chain_id),
        format!("request_timeout_secs = {}", config.request_timeout_secs),
        format!("server_port          = {}", config.server_port),
        format!("tolerance_secs       = {}", config.locator.tolerance_secs),
        format!("max_probes           = {}", config.locator.max_probes),
        format!("probe_delay_ms       = {}", config.locator.probe_delay_ms),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_lookup() {
        let cli = Cli::try_parse_from([
            "lookback",
            "lookup",
            "0x742d35Cc6634C0532925a3b844Bc454e4438f44e",
            "2020-01-01",
            "--max-probes",
            "12",
        ])
        .unwrap();

        match cli.cmd {
            Commands::Lookup {
                date,
                tolerance,
                max_probes,
                ..
            } => {
                assert_eq!(date, "2020-01-01");
                assert_eq!(tolerance, None);
                assert_eq!(max_probes, Some(12));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_subcommands() {
        let cli = Cli::try_parse_from(["lookback", "config", "set-api-key", "abc"]).unwrap();
        assert!(matches!(
            cli.cmd,
            Commands::Config(ConfigCommands::SetApiKey { ref key }) if key == "abc"
        ));
        assert!(Cli::try_parse_from(["lookback", "config"]).is_err());
    }

    #[test]
    fn test_with_overrides() {
        let config = with_overrides(LocatorConfig::default(), Some(60), None);
        assert_eq!(config.tolerance_secs, 60);
        assert_eq!(config.max_probes, LocatorConfig::default().max_probes);
    }

    #[test]
    fn test_describe_masks_api_key() {
        let config = Config {
            etherscan_api_key: Some("ABCDEFGHIJKLMNOP".to_string()),
            ..Config::default()
        };
        let text = describe(&config);
        assert!(text.contains("ABCD****"));
        assert!(!text.contains("EFGH"));
    }
}
