pub mod error;
pub mod text;
pub mod time;
pub mod units;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
