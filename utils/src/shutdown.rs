use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Runs `f` until it completes or `shutdown_signal` fires, whichever is first.
/// On cancellation the future is dropped, abandoning any in-flight request.
pub async fn handle_abort<F, Fut>(
    shutdown_signal: &CancellationToken,
    f: F,
) -> crate::Result<Fut::Output>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    if shutdown_signal.is_cancelled() {
        return Err(crate::Error::AbortDueToShutdown);
    }

    tokio::select! {
        _ = shutdown_signal.cancelled() => {
            Err(crate::Error::AbortDueToShutdown)
        }
        result = f() => {
            Ok(result)
        }
    }
}

/// Sleeps for `delay` unless `shutdown_signal` fires first.
pub async fn sleep_or_abort(
    shutdown_signal: &CancellationToken,
    delay: Duration,
) -> crate::Result<()> {
    if delay.is_zero() {
        return Ok(());
    }
    handle_abort(shutdown_signal, || tokio::time::sleep(delay)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_abort_passes_result_through() {
        let token = CancellationToken::new();
        let result = handle_abort(&token, || async { 42 }).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn test_handle_abort_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        let mut called = false;
        let result = handle_abort(&token, || {
            called = true;
            async {}
        })
        .await;

        assert!(matches!(result, Err(crate::Error::AbortDueToShutdown)));
        assert!(!called);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_or_abort_cancelled_mid_sleep() {
        let token = CancellationToken::new();
        let child = token.child_token();

        let sleeper =
            tokio::spawn(async move { sleep_or_abort(&child, Duration::from_secs(60)).await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();

        let result = sleeper.await.unwrap();
        assert!(matches!(result, Err(crate::Error::AbortDueToShutdown)));
    }
}
