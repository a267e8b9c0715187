use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use lookback_common::time::parse_target_date;
use lookback_utils::{
    alloy::StringExt,
    historic_balances::{BlockTimestampLocator, TargetQuery},
    oracle::ChainTimeOracle,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    api_types::{BalanceAtDateParams, BalanceAtDateResponse},
    ApiError,
};

struct ServerState<O> {
    oracle: Arc<O>,
    locator: Arc<BlockTimestampLocator>,
    shutdown: CancellationToken,
}

impl<O> Clone for ServerState<O> {
    fn clone(&self) -> Self {
        Self {
            oracle: Arc::clone(&self.oracle),
            locator: Arc::clone(&self.locator),
            shutdown: self.shutdown.clone(),
        }
    }
}

/// Builds the application routes. Lookups in flight are cancelled when
/// `shutdown` fires.
pub fn router<O>(oracle: Arc<O>, locator: BlockTimestampLocator, shutdown: CancellationToken) -> Router
where
    O: ChainTimeOracle + 'static,
{
    let state = ServerState {
        oracle,
        locator: Arc::new(locator),
        shutdown,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/balance-at-date", get(balance_at_date::<O>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server. This function will block the current task during server lifetime
/// and returns once `shutdown` is cancelled and open connections are drained.
///
/// # Arguments
/// * `port` - Port to listen on.
/// * `oracle` - Explorer used for every lookup.
/// * `locator` - Search settings shared by all requests.
/// * `shutdown` - Cancel to stop the server and abort running lookups.
pub async fn serve<O>(
    port: u16,
    oracle: Arc<O>,
    locator: BlockTimestampLocator,
    shutdown: CancellationToken,
) -> crate::Result<()>
where
    O: ChainTimeOracle + 'static,
{
    let settings = locator.config().clone();
    let app = router(oracle, locator, shutdown.clone());
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| crate::Error::PortBindingFailed(port, e))?;

    info!(
        port,
        tolerance_secs = settings.tolerance_secs,
        max_probes = settings.max_probes,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(crate::Error::ServerCrashed)?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| lookback_utils::Error::MissingInput(name).into())
}

async fn balance_at_date<O>(
    State(state): State<ServerState<O>>,
    Query(params): Query<BalanceAtDateParams>,
) -> Result<Json<BalanceAtDateResponse>, ApiError>
where
    O: ChainTimeOracle + 'static,
{
    let address = required(&params.address, "address")?;
    let date = required(&params.date, "date")?;

    let query = TargetQuery {
        address: address.parse_as_address()?,
        target_timestamp: parse_target_date(date)?,
    };

    // dropped with this handler if the client goes away
    let cancel = state.shutdown.child_token();
    let located = state
        .locator
        .locate(state.oracle.as_ref(), query, &cancel)
        .await?;

    Ok(Json(BalanceAtDateResponse::from(&located)))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, U256};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use lookback_utils::historic_balances::LocatorConfig;
    use tower::ServiceExt;

    use super::*;

    const ADDRESS: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

    #[derive(Clone, Copy)]
    enum Upstream {
        Healthy,
        RateLimited,
        Down,
    }

    struct StubOracle {
        upstream: Upstream,
    }

    impl StubOracle {
        fn check(&self) -> lookback_utils::Result<()> {
            match self.upstream {
                Upstream::Healthy => Ok(()),
                Upstream::RateLimited => Err(lookback_utils::Error::RateLimited(
                    "Max rate limit reached".into(),
                )),
                Upstream::Down => Err(lookback_utils::Error::EtherscanFailed {
                    message: "Internal error".into(),
                    result: String::new(),
                }),
            }
        }
    }

    // 2020-01-01T00:00:00Z is block 10_000, 12 second blocks, head 20_000
    impl ChainTimeOracle for StubOracle {
        async fn latest_block_height(&self) -> lookback_utils::Result<u64> {
            self.check()?;
            Ok(20_000)
        }

        async fn block_timestamp(&self, height: u64) -> lookback_utils::Result<u64> {
            self.check()?;
            Ok(1_577_836_800 - 120_000 + height * 12)
        }

        async fn balance_at(
            &self,
            _address: Address,
            _height: u64,
        ) -> lookback_utils::Result<U256> {
            self.check()?;
            Ok(U256::from(1_000_000_000_000_000_000u64))
        }
    }

    fn app(upstream: Upstream) -> Router {
        router(
            Arc::new(StubOracle { upstream }),
            BlockTimestampLocator::new(LocatorConfig {
                tolerance_secs: 0,
                max_probes: 32,
                probe_delay_ms: 0,
            }),
            CancellationToken::new(),
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(app(Upstream::Healthy), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_balance_at_date() {
        let uri = format!("/api/balance-at-date?address={ADDRESS}&date=2020-01-01");
        let (status, body) = get_json(app(Upstream::Healthy), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["block"], json!(10_000));
        assert_eq!(body["timestamp"], json!("2020-01-01T00:00:00Z"));
        assert_eq!(body["timeDifferenceSeconds"], json!(0));
        assert_eq!(body["balance"], json!("1"));
        assert_eq!(body["futureDate"], json!(false));
    }

    #[tokio::test]
    async fn test_future_date_returns_head() {
        let uri = format!("/api/balance-at-date?address={ADDRESS}&date=2100-01-01");
        let (status, body) = get_json(app(Upstream::Healthy), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["block"], json!(20_000));
        assert_eq!(body["futureDate"], json!(true));
        assert!(body["note"].is_string());
        assert_eq!(body["probes"], json!(0));
    }

    #[tokio::test]
    async fn test_bad_input() {
        for uri in [
            "/api/balance-at-date".to_string(),
            "/api/balance-at-date?date=2020-01-01".to_string(),
            format!("/api/balance-at-date?address={ADDRESS}"),
            format!("/api/balance-at-date?address={ADDRESS}&date=%20"),
            format!("/api/balance-at-date?address={ADDRESS}&date=someday"),
            "/api/balance-at-date?address=0x1234&date=2020-01-01".to_string(),
        ] {
            let (status, body) = get_json(app(Upstream::Healthy), &uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_upstream_errors() {
        let uri = format!("/api/balance-at-date?address={ADDRESS}&date=2020-01-01");

        let (status, body) = get_json(app(Upstream::RateLimited), &uri).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["error"].as_str().unwrap().contains("try again shortly"));

        let (status, body) = get_json(app(Upstream::Down), &uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_shutdown_aborts_lookups() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let app = router(
            Arc::new(StubOracle {
                upstream: Upstream::Healthy,
            }),
            BlockTimestampLocator::default(),
            shutdown,
        );

        let uri = format!("/api/balance-at-date?address={ADDRESS}&date=2020-01-01");
        let (status, _) = get_json(app, &uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
