//! Historical balance lookup.
//!
//! There is no timestamp index to query, so the block closest to a point in
//! time is found by binary searching block heights, one remote
//! `block_timestamp` call per probe. Block timestamps never decrease with
//! height, but block times vary, so the answer is "best within budget": the
//! search stops as soon as a sample is within tolerance, when the probe budget
//! is spent, or when the window crosses. The balance is then read at the
//! closest block seen.

use std::time::Duration;

use alloy::primitives::{Address, U256};
use lookback_common::units::format_ether;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    oracle::ChainTimeOracle,
    shutdown::{handle_abort, sleep_or_abort},
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LocatorConfig {
    /// Largest `|block timestamp - target|` in seconds that is close enough to
    /// stop probing.
    pub tolerance_secs: u64,
    /// Max midpoint probes per lookup, which bounds the remote calls spent on
    /// the search itself.
    pub max_probes: u32,
    /// Pause between probes to stay under the upstream requests-per-second cap.
    pub probe_delay_ms: u64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            tolerance_secs: 3600,
            max_probes: 20,
            probe_delay_ms: 200,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetQuery {
    pub address: Address,
    pub target_timestamp: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Earlier,
    Later,
}

/// Heights still worth probing. May end crossed (`low == high + 1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SearchBounds {
    low: u64,
    high: u64,
}

impl SearchBounds {
    fn is_open(&self) -> bool {
        self.low <= self.high
    }

    fn mid(&self) -> u64 {
        self.low + (self.high - self.low) / 2
    }

    fn narrow(&mut self, mid: u64, towards: Direction) {
        match towards {
            Direction::Later => self.low = mid + 1,
            Direction::Earlier => self.high = mid.saturating_sub(1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BestMatch {
    pub height: u64,
    pub timestamp: u64,
    pub distance: u64,
}

impl BestMatch {
    fn new(height: u64, timestamp: u64, target: i64) -> Self {
        Self {
            height,
            timestamp,
            distance: distance(timestamp, target),
        }
    }

    /// Takes the candidate only if it is strictly closer to the target.
    fn offer(&mut self, candidate: BestMatch) -> bool {
        if candidate.distance < self.distance {
            *self = candidate;
            true
        } else {
            false
        }
    }
}

fn distance(timestamp: u64, target: i64) -> u64 {
    let diff = (i128::from(timestamp) - i128::from(target)).unsigned_abs();
    u64::try_from(diff).unwrap_or(u64::MAX)
}

fn is_before(timestamp: u64, target: i64) -> bool {
    i128::from(timestamp) < i128::from(target)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Target is at or after the chain head, no search was needed.
    TargetAfterHead,
    WithinTolerance,
    BudgetExhausted,
    WindowCrossed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedBalance {
    pub address: Address,
    pub target_timestamp: i64,
    pub height: u64,
    pub timestamp: u64,
    pub distance_seconds: u64,
    pub balance_wei: U256,
    pub probes: u32,
    pub stop_reason: StopReason,
}

impl LocatedBalance {
    pub fn balance_ether(&self) -> String {
        format_ether(self.balance_wei)
    }

    pub fn target_after_head(&self) -> bool {
        self.stop_reason == StopReason::TargetAfterHead
    }
}

#[derive(Clone, Debug, Default)]
pub struct BlockTimestampLocator {
    config: LocatorConfig,
}

impl BlockTimestampLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Finds the block closest to `query.target_timestamp` and reads the
    /// balance of `query.address` there.
    ///
    /// Calls are strictly sequential: head height, head timestamp, at most
    /// `max_probes` midpoint timestamps, then one balance read. A rate limit
    /// from any call is returned immediately. A failed midpoint is skipped.
    /// Cancelling `shutdown` abandons the in-flight call.
    pub async fn locate<O: ChainTimeOracle>(
        &self,
        oracle: &O,
        query: TargetQuery,
        shutdown: &CancellationToken,
    ) -> crate::Result<LocatedBalance> {
        let target = query.target_timestamp;

        let head = handle_abort(shutdown, || oracle.latest_block_height()).await??;
        let head_timestamp = handle_abort(shutdown, || oracle.block_timestamp(head)).await??;
        let mut best = BestMatch::new(head, head_timestamp, target);

        let (stop_reason, probes) = if i128::from(target) >= i128::from(head_timestamp) {
            debug!(head, head_timestamp, target, "target is at or after chain head");
            (StopReason::TargetAfterHead, 0)
        } else {
            self.search(oracle, target, head, &mut best, shutdown).await?
        };

        let balance_wei =
            handle_abort(shutdown, || oracle.balance_at(query.address, best.height)).await??;

        info!(
            address = %query.address,
            target,
            height = best.height,
            distance = best.distance,
            probes,
            ?stop_reason,
            "located historical balance"
        );

        Ok(LocatedBalance {
            address: query.address,
            target_timestamp: target,
            height: best.height,
            timestamp: best.timestamp,
            distance_seconds: best.distance,
            balance_wei,
            probes,
            stop_reason,
        })
    }

    async fn search<O: ChainTimeOracle>(
        &self,
        oracle: &O,
        target: i64,
        head: u64,
        best: &mut BestMatch,
        shutdown: &CancellationToken,
    ) -> crate::Result<(StopReason, u32)> {
        let delay = Duration::from_millis(self.config.probe_delay_ms);
        let mut bounds = SearchBounds { low: 1, high: head };
        let mut last_direction = None;
        let mut probes = 0;

        loop {
            if !bounds.is_open() {
                return Ok((StopReason::WindowCrossed, probes));
            }
            if probes >= self.config.max_probes {
                return Ok((StopReason::BudgetExhausted, probes));
            }
            if probes > 0 {
                sleep_or_abort(shutdown, delay).await?;
            }

            let mid = bounds.mid();
            probes += 1;

            match handle_abort(shutdown, || oracle.block_timestamp(mid)).await? {
                Ok(timestamp) => {
                    let sample = BestMatch::new(mid, timestamp, target);
                    if best.offer(sample) {
                        debug!(height = mid, timestamp, distance = sample.distance, "closer block");
                    }
                    if sample.distance <= self.config.tolerance_secs {
                        return Ok((StopReason::WithinTolerance, probes));
                    }

                    let towards = if is_before(timestamp, target) {
                        Direction::Later
                    } else {
                        Direction::Earlier
                    };
                    bounds.narrow(mid, towards);
                    last_direction = Some(towards);
                }
                Err(err) if err.is_rate_limited() => return Err(err),
                Err(err) => {
                    // No sample, so reuse the last known direction. Convergence
                    // is best effort here, the target may leave the window.
                    let towards = last_direction.unwrap_or(Direction::Later);
                    warn!(
                        height = mid,
                        error = %err,
                        connect = err.is_connect(),
                        ?towards,
                        "skipping failed probe"
                    );
                    bounds.narrow(mid, towards);
                }
            }
        }
    }
}
