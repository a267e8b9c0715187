use lookback_common::time::to_iso8601;
use lookback_utils::historic_balances::{LocatedBalance, StopReason};
use serde::{Deserialize, Serialize};

const FUTURE_DATE_NOTE: &str =
    "Requested date is at or after the latest block, showing the balance at the chain head.";

#[derive(Debug, Default, Deserialize)]
pub struct BalanceAtDateParams {
    pub address: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceAtDateResponse {
    pub success: bool,
    pub address: String,
    /// ETH, as an exact decimal string.
    pub balance: String,
    pub balance_wei: String,
    pub block: u64,
    /// ISO-8601 time of `block`.
    pub timestamp: String,
    pub requested_timestamp: i64,
    pub actual_timestamp: u64,
    pub time_difference_seconds: u64,
    pub future_date: bool,
    pub note: Option<String>,
    pub probes: u32,
    pub stop_reason: StopReason,
}

impl From<&LocatedBalance> for BalanceAtDateResponse {
    fn from(located: &LocatedBalance) -> Self {
        let timestamp = i64::try_from(located.timestamp)
            .ok()
            .and_then(to_iso8601)
            .unwrap_or_else(|| located.timestamp.to_string());

        Self {
            success: true,
            address: located.address.to_string(),
            balance: located.balance_ether(),
            balance_wei: located.balance_wei.to_string(),
            block: located.height,
            timestamp,
            requested_timestamp: located.target_timestamp,
            actual_timestamp: located.timestamp,
            time_difference_seconds: located.distance_seconds,
            future_date: located.target_after_head(),
            note: located
                .target_after_head()
                .then(|| FUTURE_DATE_NOTE.to_string()),
            probes: located.probes,
            stop_reason: located.stop_reason,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
