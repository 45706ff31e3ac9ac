//! Bounded contract reads.

use std::fmt::Display;
use std::future::IntoFuture;
use std::time::Duration;

/// Await an RPC read for at most `timeout`, flattening both failure modes
/// into a message.
pub async fn bounded<F, T, E>(timeout: Duration, what: &str, call: F) -> Result<T, String>
where
    F: IntoFuture<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{} failed: {}", what, e)),
        Err(_) => Err(format!("{} timed out after {}ms", what, timeout.as_millis())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_value_through() {
        let result = bounded(Duration::from_millis(50), "decimals()", async {
            Ok::<_, String>(8u8)
        })
        .await;
        assert_eq!(result, Ok(8));
    }

    #[tokio::test]
    async fn test_bounded_reports_call_error() {
        let result: Result<u8, String> =
            bounded(Duration::from_millis(50), "decimals()", async {
                Err::<u8, _>("execution reverted")
            })
            .await;
        assert_eq!(result.unwrap_err(), "decimals() failed: execution reverted");
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<u8, String> = bounded(Duration::from_millis(50), "decimals()", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<u8, String>(8)
        })
        .await;
        assert!(result.unwrap_err().contains("timed out after 50ms"));
    }
}
