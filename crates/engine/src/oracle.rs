//! Oracle reader: turns a raw feed round into a normalized, fresh price sample.
//!
//! The feed itself is a collaborator behind [`PriceFeed`]: the monitor binds it
//! to an on-chain aggregator, tests bind it to a fixed round.

use chrono::{DateTime, Utc};

use sentinel_common::error::OracleError;
use sentinel_common::fixed::Fix;
use sentinel_common::types::{FeedRound, PriceSample};

/// An external price feed.
pub trait PriceFeed {
    /// Latest round published by the feed.
    fn latest_round(&self) -> Result<FeedRound, OracleError>;
}

/// A feed round fetched ahead of time (e.g. over RPC) and replayed into a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot(pub Result<FeedRound, OracleError>);

impl PriceFeed for FeedSnapshot {
    fn latest_round(&self) -> Result<FeedRound, OracleError> {
        self.0.clone()
    }
}

/// Reads one feed and enforces the staleness cutoff.
#[derive(Debug, Clone, Copy)]
pub struct OracleReader {
    /// Seconds after which a round is rejected.
    timeout_secs: u64,
}

impl OracleReader {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    /// Sample the feed at `now`.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Unavailable`] if the feed cannot be read or its answer is not positive
    /// - [`OracleError::InvalidPrice`] if the answer cannot be represented at 18 decimals
    /// - [`OracleError::Stale`] if the round is older than the timeout
    pub fn sample<F: PriceFeed + ?Sized>(
        &self,
        feed: &F,
        now: DateTime<Utc>,
    ) -> Result<PriceSample, OracleError> {
        let round = feed.latest_round()?;

        if round.answer <= 0 {
            return Err(OracleError::Unavailable(format!(
                "non-positive answer {}",
                round.answer
            )));
        }

        let price = Fix::from_decimals(round.answer.unsigned_abs(), round.decimals)
            .filter(|p| !p.is_zero())
            .ok_or_else(|| {
                OracleError::InvalidPrice(format!(
                    "answer {} with {} decimals",
                    round.answer, round.decimals
                ))
            })?;

        let age = now.signed_duration_since(round.updated_at).num_seconds();
        if age > 0 && age as u64 > self.timeout_secs {
            return Err(OracleError::Stale {
                updated_at: round.updated_at,
                now,
                timeout_secs: self.timeout_secs,
            });
        }

        Ok(PriceSample {
            price,
            timestamp: round.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn round(answer: i128, decimals: u8, updated_at: DateTime<Utc>) -> FeedSnapshot {
        FeedSnapshot(Ok(FeedRound {
            answer,
            decimals,
            updated_at,
        }))
    }

    #[test]
    fn test_normalizes_8_decimal_feed() {
        let reader = OracleReader::new(86_400);
        let sample = reader.sample(&round(100_000_000, 8, t0()), t0()).unwrap();
        assert_eq!(sample.price, Fix::ONE);
        assert_eq!(sample.timestamp, t0());
    }

    #[test]
    fn test_heterogeneous_decimals_agree() {
        let reader = OracleReader::new(86_400);
        let a = reader.sample(&round(150_000_000, 8, t0()), t0()).unwrap();
        let b = reader
            .sample(&round(1_500_000_000_000_000_000, 18, t0()), t0())
            .unwrap();
        assert_eq!(a.price, b.price);
    }

    #[test]
    fn test_non_positive_answer_is_unavailable() {
        let reader = OracleReader::new(86_400);
        for answer in [0, -1] {
            let err = reader.sample(&round(answer, 8, t0()), t0()).unwrap_err();
            assert!(matches!(err, OracleError::Unavailable(_)));
        }
    }

    #[test]
    fn test_answer_truncated_to_zero_is_invalid() {
        let reader = OracleReader::new(86_400);
        let err = reader.sample(&round(5, 20, t0()), t0()).unwrap_err();
        assert!(matches!(err, OracleError::InvalidPrice(_)));
    }

    #[test]
    fn test_stale_only_after_timeout() {
        let reader = OracleReader::new(3_600);
        let feed = round(100_000_000, 8, t0());
        assert!(reader.sample(&feed, t0() + Duration::seconds(3_600)).is_ok());
        let err = reader
            .sample(&feed, t0() + Duration::seconds(3_601))
            .unwrap_err();
        assert!(matches!(err, OracleError::Stale { timeout_secs: 3_600, .. }));
    }

    #[test]
    fn test_future_round_is_fresh() {
        let reader = OracleReader::new(60);
        let feed = round(100_000_000, 8, t0() + Duration::seconds(30));
        assert!(reader.sample(&feed, t0()).is_ok());
    }

    #[test]
    fn test_feed_error_passes_through() {
        let reader = OracleReader::new(60);
        let feed = FeedSnapshot(Err(OracleError::Unavailable("rpc down".to_string())));
        assert_eq!(
            reader.sample(&feed, t0()),
            Err(OracleError::Unavailable("rpc down".to_string()))
        );
    }
}
