//! The three point-queries the balance locator needs from a chain explorer.

use std::future::Future;

use alloy::primitives::{Address, U256};

/// Source of block heights, block timestamps and historical balances.
///
/// Implementations report quota exhaustion as [`crate::Error::RateLimited`]
/// and a missing block as [`crate::Error::BlockNotFound`]; the locator relies
/// on that distinction to decide between aborting and skipping a sample.
pub trait ChainTimeOracle: Send + Sync {
    fn latest_block_height(&self) -> impl Future<Output = crate::Result<u64>> + Send;

    /// Unix timestamp (seconds) of the block at `height`.
    fn block_timestamp(&self, height: u64) -> impl Future<Output = crate::Result<u64>> + Send;

    /// Native balance in wei of `address` as of the end of block `height`.
    fn balance_at(
        &self,
        address: Address,
        height: u64,
    ) -> impl Future<Output = crate::Result<U256>> + Send;
}
