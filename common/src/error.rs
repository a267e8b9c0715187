use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Date '{0}' is not valid, expected YYYY-MM-DD, an RFC 3339 timestamp or unix seconds.")]
    InvalidDate(String),

    #[error("Cannot scale an amount by {0} decimals.")]
    InvalidDecimals(u8),
}
