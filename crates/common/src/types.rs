use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CollateralError;
use crate::fixed::Fix;

/// Longest debounce window a collateral may be configured with (two weeks).
pub const MAX_DELAY_UNTIL_DEFAULT_SECS: u64 = 1_209_600;

/// Collateral health status.
///
/// `Sound` and `Iffy` may alternate; `Disabled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Sound,
    Iffy,
    Disabled,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Sound => write!(f, "SOUND"),
            Status::Iffy => write!(f, "IFFY"),
            Status::Disabled => write!(f, "DISABLED"),
        }
    }
}

/// Raw reading of an external price feed, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedRound {
    /// Signed answer quoted with `decimals` decimals.
    pub answer: i128,
    pub decimals: u8,
    pub updated_at: DateTime<Utc>,
}

/// A normalized oracle price observed at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceSample {
    pub price: Fix,
    pub timestamp: DateTime<Utc>,
}

/// Uncertainty band around a price. `low <= high` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBand {
    pub low: Fix,
    pub high: Fix,
}

impl PriceBand {
    pub fn width(&self) -> Fix {
        self.high.saturating_sub(self.low)
    }

    /// Whether `price` lies inside the band (inclusive).
    pub fn contains(&self, price: Fix) -> bool {
        self.low <= price && price <= self.high
    }

    /// Multiply both bounds by `factor`, rounding the band outward.
    pub fn scaled_by(&self, factor: Fix) -> Option<PriceBand> {
        Some(PriceBand {
            low: self.low.checked_mul(factor)?,
            high: self.high.checked_mul_ceil(factor)?,
        })
    }
}

/// Token price band plus the latest target-per-ref reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub band: PriceBand,
    pub peg_price: Fix,
}

fn default_target_per_ref() -> Fix {
    Fix::ONE
}

/// Immutable per-asset configuration.
///
/// Durations are whole seconds; fractions are [`Fix`] values in `[0, 1)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralConfig {
    /// Address of the monitored token.
    pub erc20: String,
    /// Name of the peg currency (e.g. "USD", "ARS").
    pub target_name: String,
    /// Age at which a sample's band reaches its widest.
    pub price_timeout: u64,
    /// Age beyond which a feed reading is rejected as stale.
    pub oracle_timeout: u64,
    pub oracle_error: Fix,
    pub default_threshold: Fix,
    pub delay_until_default: u64,
    pub max_trade_volume: Fix,
    /// Tolerated ref-per-token drawdown before a drop is reported.
    #[serde(default)]
    pub revenue_hiding: Fix,
    /// Expected target-per-ref.
    #[serde(default = "default_target_per_ref")]
    pub target_per_ref: Fix,
}

impl CollateralConfig {
    /// Check every construction-time invariant.
    pub fn validate(&self) -> Result<(), CollateralError> {
        let invalid = |msg: &str| Err(CollateralError::ConfigInvalid(msg.to_string()));

        if !is_valid_address(&self.erc20) {
            return invalid("erc20 must be a 0x-prefixed 20-byte hex address");
        }
        if self.erc20[2..].bytes().all(|b| b == b'0') {
            return invalid("erc20 must not be the zero address");
        }
        if self.target_name.is_empty() {
            return invalid("target_name must not be empty");
        }
        if self.target_name.len() > 32 {
            return invalid("target_name must fit in 32 bytes");
        }
        if self.price_timeout == 0 {
            return invalid("price_timeout must be positive");
        }
        if self.oracle_timeout == 0 {
            return invalid("oracle_timeout must be positive");
        }
        if self.oracle_error.is_zero() || self.oracle_error >= Fix::ONE {
            return invalid("oracle_error must be in (0, 1)");
        }
        if self.default_threshold >= Fix::ONE {
            return invalid("default_threshold must be below 1");
        }
        if self.default_threshold <= self.oracle_error {
            return invalid("default_threshold must exceed oracle_error");
        }
        if self.delay_until_default > MAX_DELAY_UNTIL_DEFAULT_SECS {
            return invalid("delay_until_default must be at most two weeks");
        }
        if self.max_trade_volume.is_zero() {
            return invalid("max_trade_volume must be positive");
        }
        if self.revenue_hiding >= Fix::ONE {
            return invalid("revenue_hiding must be below 1");
        }
        if self.target_per_ref.is_zero() {
            return invalid("target_per_ref must be positive");
        }
        Ok(())
    }
}

/// Check for a `0x`-prefixed, 40 hex digit address.
pub fn is_valid_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].bytes().all(|b| b.is_ascii_hexdigit())
}
