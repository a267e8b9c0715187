//! Client for the Etherscan v2 multichain API, used as the [`ChainTimeOracle`]
//! behind historical balance lookups.
//!
//! Every call goes through the `proxy` module, which answers with JSON-RPC
//! quantities. Errors come back in Etherscan's own envelope
//! (`{"status":"0","message":"NOTOK","result":"Max rate limit reached"}`)
//! or as a JSON-RPC `error` object.

use std::time::Duration;

use alloy::primitives::{Address, U256};
use lookback_common::text::truncate_body;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{
    alloy::StringExt, config::Config, oracle::ChainTimeOracle, serde::SerdeResponseParse,
    Reqwest,
};

pub const ETHERSCAN_API_URL: &str = "https://api.etherscan.io/v2/api";

/// Etherscan answers `NOTOK` when the key's request quota is exhausted.
const RATE_LIMITED_MESSAGE: &str = "NOTOK";

const UPSTREAM_TEXT_LIMIT: usize = 160;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EtherscanEnvelope {
    status: Option<String>,
    message: Option<String>,
    result: Option<Value>,
    error: Option<RpcErrorObj>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObj {
    code: i64,
    message: String,
}

impl EtherscanEnvelope {
    fn into_result(self) -> crate::Result<Value> {
        if let Some(error) = self.error {
            return Err(crate::Error::EtherscanRpcFailed {
                code: error.code,
                message: truncate_body(&error.message, UPSTREAM_TEXT_LIMIT),
            });
        }

        if self.status.as_deref() == Some("0") {
            let message = self.message.unwrap_or_default();
            let result = match self.result {
                Some(Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => String::new(),
            };
            let result = truncate_body(&result, UPSTREAM_TEXT_LIMIT);

            if message == RATE_LIMITED_MESSAGE || mentions_rate_limit(&result) {
                return Err(crate::Error::RateLimited(result));
            }
            return Err(crate::Error::EtherscanFailed { message, result });
        }

        Ok(self.result.unwrap_or(Value::Null))
    }
}

fn mentions_rate_limit(text: &str) -> bool {
    text.to_ascii_lowercase().contains("rate limit")
}

/// Extracts a hex quantity from a `result`, telling a rate-limit notice that
/// slipped through as a plain string apart from garbage.
fn quantity(value: &Value) -> crate::Result<&str> {
    match value {
        Value::String(s) if s.starts_with("0x") => Ok(s),
        Value::String(s) if mentions_rate_limit(s) => Err(crate::Error::RateLimited(
            truncate_body(s, UPSTREAM_TEXT_LIMIT),
        )),
        other => Err(crate::Error::InvalidHexQuantity(truncate_body(
            &other.to_string(),
            UPSTREAM_TEXT_LIMIT,
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    timestamp: String,
}

#[derive(Clone, Debug)]
pub struct Etherscan {
    client: Client,
    api_url: Url,
    api_key: String,
    chain_id: u64,
}

impl Etherscan {
    pub fn new(
        api_url: &str,
        api_key: String,
        chain_id: u64,
        timeout: Duration,
    ) -> crate::Result<Self> {
        let api_url = api_url
            .parse::<Url>()
            .map_err(|_| crate::Error::InvalidUrl(api_url.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url,
            api_key,
            chain_id,
        })
    }

    pub fn from_config(config: &Config) -> crate::Result<Self> {
        Self::new(
            &config.etherscan_api_url,
            config.etherscan_api_key()?,
            config.chain_id,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn proxy_call(&self, action: &str, params: &[(&str, String)]) -> crate::Result<Value> {
        let mut query = vec![
            ("chainid", self.chain_id.to_string()),
            ("module", "proxy".to_string()),
            ("action", action.to_string()),
        ];
        query.extend(params.iter().cloned());

        debug!(action, ?params, "etherscan request");

        Reqwest::get(&self.client, &self.api_url)?
            .query(&query)
            .secret_query(&[("apikey", self.api_key.as_str())])
            .receive_json::<EtherscanEnvelope>()
            .await?
            .into_result()
    }

    pub async fn block_number(&self) -> crate::Result<u64> {
        let result = self.proxy_call("eth_blockNumber", &[]).await?;
        quantity(&result)?.parse_hex_u64()
    }

    pub async fn block_timestamp(&self, height: u64) -> crate::Result<u64> {
        let result = self
            .proxy_call(
                "eth_getBlockByNumber",
                &[("tag", format!("{height:#x}")), ("boolean", "false".to_string())],
            )
            .await?;

        match result {
            Value::Null => Err(crate::Error::BlockNotFound(height)),
            Value::String(s) if mentions_rate_limit(&s) => Err(crate::Error::RateLimited(
                truncate_body(&s, UPSTREAM_TEXT_LIMIT),
            )),
            block => {
                let header: BlockHeader = block.serde_parse_custom()?;
                header.timestamp.parse_hex_u64()
            }
        }
    }

    pub async fn balance(&self, address: Address, height: u64) -> crate::Result<U256> {
        let result = self
            .proxy_call(
                "eth_getBalance",
                &[("address", address.to_string()), ("tag", format!("{height:#x}"))],
            )
            .await?;
        quantity(&result)?.parse_hex_u256()
    }
}

impl ChainTimeOracle for Etherscan {
    async fn latest_block_height(&self) -> crate::Result<u64> {
        self.block_number().await
    }

    async fn block_timestamp(&self, height: u64) -> crate::Result<u64> {
        Etherscan::block_timestamp(self, height).await
    }

    async fn balance_at(&self, address: Address, height: u64) -> crate::Result<U256> {
        self.balance(address, height).await
    }
}
