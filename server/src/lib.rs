//! A small JSON HTTP server in front of the historical balance locator.
//!
//! `GET /api/balance-at-date?address=0x..&date=YYYY-MM-DD` answers with the
//! balance at the block closest to the date. Errors come back as
//! `{ "error": "..." }` with 400 for bad input, 429 when the explorer rate
//! limits us and 500 for other upstream failures.
pub mod api_types;
pub mod error;
mod serve;

pub use error::{ApiError, Result, ServerError as Error};
pub use serve::*;
