//! Measured ref-per-token sources.
//!
//! Fiat-style collateral is its own reference and reports a fixed rate. Wrapped
//! collateral reports how much underlying backs one wrapper token:
//! `balanceOf(wrapper)` of the underlying over the wrapper's `totalSupply()`,
//! each normalized by its own `decimals()`.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol;
use serde::{Deserialize, Serialize};

use sentinel_common::error::CollateralError;
use sentinel_common::fixed::Fix;
use sentinel_engine::reference::AccountingSnapshot;

use crate::rpc::bounded;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }
}

/// Ref-per-token source as written in the assets file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefPerTokSpec {
    Fixed { value: Fix },
    BackingRatio { underlying: String, wrapper: String },
}

/// Resolved ref-per-token source.
#[derive(Debug, Clone)]
pub enum Accounting {
    Fixed(Fix),
    BackingRatio {
        underlying: Address,
        wrapper: Address,
        timeout: Duration,
    },
}

impl Accounting {
    pub fn from_spec(spec: &RefPerTokSpec, timeout: Duration) -> Result<Self, CollateralError> {
        match spec {
            RefPerTokSpec::Fixed { value } => {
                if value.is_zero() {
                    return Err(CollateralError::ConfigInvalid(
                        "fixed ref_per_tok must be > 0".to_string(),
                    ));
                }
                Ok(Accounting::Fixed(*value))
            }
            RefPerTokSpec::BackingRatio {
                underlying,
                wrapper,
            } => Ok(Accounting::BackingRatio {
                underlying: parse_address(underlying)?,
                wrapper: parse_address(wrapper)?,
                timeout,
            }),
        }
    }

    /// Measure the current ref-per-token.
    pub async fn snapshot(&self, provider: &(impl Provider + Clone)) -> AccountingSnapshot {
        AccountingSnapshot(self.measure(provider).await)
    }

    pub async fn measure(&self, provider: &(impl Provider + Clone)) -> Result<Fix, CollateralError> {
        let (underlying, wrapper, timeout) = match self {
            Accounting::Fixed(value) => return Ok(*value),
            Accounting::BackingRatio {
                underlying,
                wrapper,
                timeout,
            } => (*underlying, *wrapper, *timeout),
        };

        let underlying_token = IERC20::new(underlying, provider.clone());
        let wrapper_token = IERC20::new(wrapper, provider.clone());

        let balance = bounded(timeout, "balanceOf()", underlying_token.balanceOf(wrapper).call())
            .await
            .map_err(CollateralError::AccountingUnavailable)?;
        let balance_decimals = bounded(timeout, "decimals()", underlying_token.decimals().call())
            .await
            .map_err(CollateralError::AccountingUnavailable)?;
        let supply = bounded(timeout, "totalSupply()", wrapper_token.totalSupply().call())
            .await
            .map_err(CollateralError::AccountingUnavailable)?;
        let supply_decimals = bounded(timeout, "decimals()", wrapper_token.decimals().call())
            .await
            .map_err(CollateralError::AccountingUnavailable)?;

        backing_ratio(balance, balance_decimals, supply, supply_decimals)
    }
}

fn parse_address(address: &str) -> Result<Address, CollateralError> {
    Address::from_str(address)
        .map_err(|e| CollateralError::ConfigInvalid(format!("invalid address {}: {}", address, e)))
}

/// Underlying per wrapper token.
pub fn backing_ratio(
    balance: U256,
    balance_decimals: u8,
    supply: U256,
    supply_decimals: u8,
) -> Result<Fix, CollateralError> {
    let balance = normalize(balance, balance_decimals, "balance")?;
    let supply = normalize(supply, supply_decimals, "supply")?;
    if supply.is_zero() {
        return Err(CollateralError::AccountingUnavailable(
            "wrapper has zero supply".to_string(),
        ));
    }
    balance.checked_div(supply).ok_or_else(|| {
        CollateralError::AccountingUnavailable(format!("ratio {} / {} overflows", balance, supply))
    })
}

fn normalize(amount: U256, decimals: u8, what: &str) -> Result<Fix, CollateralError> {
    u128::try_from(amount)
        .ok()
        .and_then(|raw| Fix::from_decimals(raw, decimals))
        .ok_or_else(|| {
            CollateralError::AccountingUnavailable(format!("{} {} out of range", what, amount))
        })
}
