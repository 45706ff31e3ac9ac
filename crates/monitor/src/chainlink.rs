//! Chainlink aggregator reader.
//!
//! Reads `latestRoundData()` and `decimals()` from an `AggregatorV3Interface`
//! and hands the raw round to the engine as a [`FeedSnapshot`]. Transport
//! errors and timeouts become [`OracleError::Unavailable`]; answers or
//! timestamps that do not fit become [`OracleError::InvalidPrice`].

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, I256, U256};
use alloy::providers::Provider;
use alloy::sol;
use chrono::{DateTime, TimeZone, Utc};

use sentinel_common::error::OracleError;
use sentinel_common::types::FeedRound;
use sentinel_engine::oracle::FeedSnapshot;

use crate::rpc::bounded;

sol! {
    #[sol(rpc)]
    interface AggregatorV3Interface {
        function decimals() external view returns (uint8);

        function latestRoundData()
            external
            view
            returns (
                uint80 roundId,
                int256 answer,
                uint256 startedAt,
                uint256 updatedAt,
                uint80 answeredInRound
            );
    }
}

/// One aggregator contract.
#[derive(Debug, Clone)]
pub struct ChainlinkFeed {
    address: Address,
    timeout: Duration,
}

impl ChainlinkFeed {
    pub fn new(address: Address, timeout: Duration) -> Self {
        Self { address, timeout }
    }

    /// Parse a 0x-prefixed aggregator address.
    pub fn from_address_str(address: &str, timeout: Duration) -> anyhow::Result<Self> {
        let address = Address::from_str(address)
            .map_err(|e| anyhow::anyhow!("invalid feed address {}: {}", address, e))?;
        Ok(Self::new(address, timeout))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Fetch the latest round. Never fails outright: the outcome is replayed
    /// into the collateral, which absorbs feed faults into its status.
    pub async fn snapshot(&self, provider: &(impl Provider + Clone)) -> FeedSnapshot {
        let result = self.fetch_round(provider).await;
        if let Err(e) = &result {
            tracing::debug!(feed = %self.address, error = %e, "Feed read failed");
        }
        FeedSnapshot(result)
    }

    async fn fetch_round(
        &self,
        provider: &(impl Provider + Clone),
    ) -> Result<FeedRound, OracleError> {
        let aggregator = AggregatorV3Interface::new(self.address, provider.clone());

        let decimals = bounded(self.timeout, "decimals()", aggregator.decimals().call())
            .await
            .map_err(OracleError::Unavailable)?;
        let round = bounded(
            self.timeout,
            "latestRoundData()",
            aggregator.latestRoundData().call(),
        )
        .await
        .map_err(OracleError::Unavailable)?;

        round_from_raw(round.answer, decimals, round.updatedAt)
    }
}

/// Narrow the ABI words of a round into a [`FeedRound`].
pub fn round_from_raw(
    answer: I256,
    decimals: u8,
    updated_at: U256,
) -> Result<FeedRound, OracleError> {
    let answer = i128::try_from(answer)
        .map_err(|_| OracleError::InvalidPrice(format!("answer {} out of range", answer)))?;
    let updated_at = timestamp(updated_at)
        .ok_or_else(|| OracleError::InvalidPrice(format!("updatedAt {} out of range", updated_at)))?;

    Ok(FeedRound {
        answer,
        decimals,
        updated_at,
    })
}

fn timestamp(secs: U256) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(u64::try_from(secs).ok()?).ok()?;
    Utc.timestamp_opt(secs, 0).single()
}
