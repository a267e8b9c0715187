use serde::{Deserialize, Serialize};

use crate::{
    disk_storage::DiskStorageInterface, etherscan::ETHERSCAN_API_URL,
    historic_balances::LocatorConfig,
};

pub const ENV_ETHERSCAN_API_KEY: &str = "ETHERSCAN_API_KEY";
pub const ENV_PORT: &str = "LOOKBACK_PORT";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub etherscan_api_key: Option<String>,
    #[serde(default = "default_api_url")]
    pub etherscan_api_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default)]
    pub locator: LocatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            etherscan_api_key: None,
            etherscan_api_url: default_api_url(),
            chain_id: default_chain_id(),
            request_timeout_secs: default_request_timeout_secs(),
            server_port: default_server_port(),
            locator: LocatorConfig::default(),
        }
    }
}

fn default_api_url() -> String {
    ETHERSCAN_API_URL.to_string()
}

fn default_chain_id() -> u64 {
    1
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_server_port() -> u16 {
    3000
}

impl DiskStorageInterface for Config {
    const FILE_NAME: &'static str = "config";
}

impl Config {
    /// Loads the config file and applies environment overrides on top.
    pub fn load_with_env() -> crate::Result<Self> {
        let mut config = Config::load()?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_ETHERSCAN_API_KEY).filter(|key| !key.trim().is_empty()) {
            self.etherscan_api_key = Some(key.trim().to_string());
        }

        if let Some(port) = lookup(ENV_PORT) {
            self.server_port = port.trim().parse().map_err(|_| crate::Error::InvalidEnvValue {
                name: ENV_PORT,
                value: port,
            })?;
        }

        Ok(())
    }

    pub fn etherscan_api_key(&self) -> crate::Result<String> {
        self.etherscan_api_key
            .clone()
            .ok_or(crate::Error::EtherscanApiKeyNotSet)
    }

    pub fn set_etherscan_api_key(etherscan_api_key: String) -> crate::Result<()> {
        let mut config = Config::load()?;
        config.etherscan_api_key = Some(etherscan_api_key);
        config.save()?;
        Ok(())
    }
}
