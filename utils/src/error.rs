use std::path::PathBuf;

use serde_json::Value;
use url::Url;

use crate::reqwest::{ReqwestErrorContext, ReqwestInnerError, ReqwestStage};

pub type Result<T> = std::result::Result<T, UtilsError>;

/// Coarse classification of an error, which is what callers (HTTP status,
/// CLI exit message) decide on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    RateLimited,
    UpstreamUnavailable,
    Aborted,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum UtilsError {
    #[error(transparent)]
    Common(#[from] lookback_common::Error),

    #[error("Address '{0}' is not a valid Ethereum address.")]
    InvalidAddress(String),

    #[error("Missing required input: {0}.")]
    MissingInput(&'static str),

    #[error("Etherscan API key not set, please set it with `lookback config set-api-key` or ETHERSCAN_API_KEY.")]
    EtherscanApiKeyNotSet,

    #[error("Etherscan rate limit reached, please try again shortly. (Upstream: {0})")]
    RateLimited(String),

    #[error("Etherscan returned an error: {message} (Result: {result})")]
    EtherscanFailed { message: String, result: String },

    #[error("Etherscan RPC error {code}: {message}")]
    EtherscanRpcFailed { code: i64, message: String },

    #[error("Value {0} is not a valid hex quantity.")]
    InvalidHexQuantity(String),

    #[error("Block {0} was not found.")]
    BlockNotFound(u64),

    #[error("Lookup aborted due to shutdown or cancelled request.")]
    AbortDueToShutdown,

    #[error("Failed to get base directories.")]
    BaseDirsFailed,

    #[error("Failed to create directory: {0:?}. (Error: {1:?})")]
    CreateDirAllFailed(PathBuf, std::io::Error),

    #[error("Failed to read the file: {0}. (Error: {1:?})")]
    FileReadFailed(PathBuf, std::io::Error),

    #[error("Failed to write to the file: {0}. (Error: {1:?})")]
    FileWriteFailed(PathBuf, std::io::Error),

    #[error("Parsing the toml file failed: {0}. (Error: {1:?})")]
    TomlParsingFailed(PathBuf, toml::de::Error),

    #[error("Formatting to toml format failed: {0}. (Error: {1:?})")]
    TomlFormattingFailed(String, toml::ser::Error),

    #[error("Environment variable {name} has an invalid value: {value}")]
    InvalidEnvValue { name: &'static str, value: String },

    #[error("Failed to parse JSON value: {0:?}. (Error: {1:?})")]
    SerdeJsonValueParseFailed(Value, serde_json::Error),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error("Please check your internet connection, the URL seems to be unreachable: {0}")]
    Internet(Url),

    #[error("Request '{url}' failed at stage '{stage:?}' (Error='{inner:?}', Context='{context:?}')", url = context.url)]
    ReqwestFailed {
        stage: ReqwestStage,
        context: Box<ReqwestErrorContext>,
        inner: ReqwestInnerError,
    },

    #[error("Reqwest builder missing error context, this is a bug please report it.")]
    ReqwestErrorContextMissing,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl UtilsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Common(_) | Self::InvalidAddress(_) | Self::MissingInput(_) => {
                ErrorKind::InvalidInput
            }
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::AbortDueToShutdown => ErrorKind::Aborted,
            Self::EtherscanFailed { .. }
            | Self::EtherscanRpcFailed { .. }
            | Self::InvalidHexQuantity(_)
            | Self::BlockNotFound(_)
            | Self::SerdeJsonValueParseFailed(..)
            | Self::ReqwestError(_)
            | Self::Internet(_)
            | Self::ReqwestFailed { .. } => ErrorKind::UpstreamUnavailable,
            Self::EtherscanApiKeyNotSet
            | Self::BaseDirsFailed
            | Self::CreateDirAllFailed(..)
            | Self::FileReadFailed(..)
            | Self::FileWriteFailed(..)
            | Self::TomlParsingFailed(..)
            | Self::TomlFormattingFailed(..)
            | Self::InvalidEnvValue { .. }
            | Self::ReqwestErrorContextMissing
            | Self::InvalidUrl(_) => ErrorKind::Internal,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }

    pub fn is_connect(&self) -> bool {
        match self {
            Self::Internet(_) => true,
            Self::ReqwestFailed { inner, .. } => inner.is_connect(),
            _ => false,
        }
    }
}
