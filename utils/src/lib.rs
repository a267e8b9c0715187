pub mod alloy;
pub mod config;
pub mod disk_storage;
pub mod error;
pub mod etherscan;
pub mod historic_balances;
pub mod log;
pub mod oracle;
pub mod reqwest;
pub mod serde;
pub mod shutdown;

pub use error::{ErrorKind, Result, UtilsError as Error};

pub use reqwest::Reqwest;
