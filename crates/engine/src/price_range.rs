//! Price range estimator.
//!
//! Turns a sample into a `(low, high)` band of `price * (1 ± error)`, where the
//! error grows linearly with the sample's age from `oracle_error` at age zero to
//! [`MAX_STALENESS_MULTIPLIER`] times that at `price_timeout`, and stays there.

use chrono::{DateTime, Utc};

use sentinel_common::error::OracleError;
use sentinel_common::fixed::Fix;
use sentinel_common::types::{CollateralConfig, PriceBand, PriceSample};

/// Ceiling on how far staleness may widen the configured error.
pub const MAX_STALENESS_MULTIPLIER: Fix = Fix::from_int(2);

/// Error multiplier for a sample that is `elapsed_secs` old.
pub fn staleness_multiplier(elapsed_secs: u64, price_timeout_secs: u64) -> Fix {
    if price_timeout_secs == 0 || elapsed_secs >= price_timeout_secs {
        return MAX_STALENESS_MULTIPLIER;
    }
    let growth = MAX_STALENESS_MULTIPLIER
        .saturating_sub(Fix::ONE)
        .scaled(elapsed_secs, price_timeout_secs)
        .unwrap_or(Fix::ZERO);
    Fix::ONE.saturating_add(growth)
}

/// Estimate the price band for `sample` as seen at `now`.
///
/// # Errors
///
/// [`OracleError::InvalidPrice`] if the sample price is zero or the band overflows.
pub fn estimate(
    sample: &PriceSample,
    now: DateTime<Utc>,
    config: &CollateralConfig,
) -> Result<PriceBand, OracleError> {
    if sample.price.is_zero() {
        return Err(OracleError::InvalidPrice("zero price".to_string()));
    }

    let elapsed = now
        .signed_duration_since(sample.timestamp)
        .num_seconds()
        .max(0) as u64;
    let multiplier = staleness_multiplier(elapsed, config.price_timeout);

    let overflow = || OracleError::InvalidPrice(format!("band overflow at {}", sample.price));

    let effective_error = config
        .oracle_error
        .checked_mul_ceil(multiplier)
        .ok_or_else(overflow)?;

    let low = match Fix::ONE.checked_sub(effective_error) {
        Some(keep) => sample.price.checked_mul(keep).ok_or_else(overflow)?,
        None => Fix::ZERO,
    };
    let high = Fix::ONE
        .checked_add(effective_error)
        .and_then(|grow| sample.price.checked_mul_ceil(grow))
        .ok_or_else(overflow)?;

    Ok(PriceBand { low, high })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const PRICE_TIMEOUT: u64 = 604_800;

    fn fix(s: &str) -> Fix {
        s.parse().unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn config(oracle_error: &str) -> CollateralConfig {
        CollateralConfig {
            erc20: "0x5e40f26e89213660514c51fb61b2d357dbf63c85".to_string(),
            target_name: "USD".to_string(),
            price_timeout: PRICE_TIMEOUT,
            oracle_timeout: 86_400,
            oracle_error: fix(oracle_error),
            default_threshold: fix("0.0125"),
            delay_until_default: 86_400,
            max_trade_volume: Fix::from_int(1_000_000),
            revenue_hiding: Fix::ZERO,
            target_per_ref: Fix::ONE,
        }
    }

    fn sample(price: &str) -> PriceSample {
        PriceSample {
            price: fix(price),
            timestamp: t0(),
        }
    }

    #[test]
    fn test_fresh_sample_uses_configured_error() {
        let band = estimate(&sample("1"), t0(), &config("0.0025")).unwrap();
        assert_eq!(band.low, fix("0.9975"));
        assert_eq!(band.high, fix("1.0025"));
    }

    #[test]
    fn test_multiplier_is_linear_then_capped() {
        assert_eq!(staleness_multiplier(0, PRICE_TIMEOUT), Fix::ONE);
        assert_eq!(
            staleness_multiplier(PRICE_TIMEOUT / 2, PRICE_TIMEOUT),
            fix("1.5")
        );
        assert_eq!(
            staleness_multiplier(PRICE_TIMEOUT, PRICE_TIMEOUT),
            MAX_STALENESS_MULTIPLIER
        );
        assert_eq!(
            staleness_multiplier(PRICE_TIMEOUT * 10, PRICE_TIMEOUT),
            MAX_STALENESS_MULTIPLIER
        );
    }

    #[test]
    fn test_band_width_non_decreasing_with_age() {
        let cfg = config("0.01");
        let s = sample("1.37");
        let mut last_width = Fix::ZERO;
        for hours in (0..=(2 * PRICE_TIMEOUT / 3_600)).step_by(7) {
            let band = estimate(&s, t0() + Duration::hours(hours as i64), &cfg).unwrap();
            assert!(band.low <= band.high);
            assert!(band.width() >= last_width, "band narrowed at {}h", hours);
            last_width = band.width();
        }
        let saturated = estimate(&s, t0() + Duration::seconds(PRICE_TIMEOUT as i64), &cfg).unwrap();
        let far = estimate(&s, t0() + Duration::days(365), &cfg).unwrap();
        assert_eq!(saturated, far);
        assert_eq!(far.low, fix("1.3426"));
        assert_eq!(far.high, fix("1.3974"));
    }

    #[test]
    fn test_low_clamps_at_zero() {
        let band = estimate(
            &sample("1"),
            t0() + Duration::days(30),
            &config("0.6"),
        )
        .unwrap();
        assert_eq!(band.low, Fix::ZERO);
        assert_eq!(band.high, fix("2.2"));
    }

    #[test]
    fn test_zero_price_is_invalid() {
        let err = estimate(&sample("0"), t0(), &config("0.0025")).unwrap_err();
        assert!(matches!(err, OracleError::InvalidPrice(_)));
    }

    #[test]
    fn test_sample_from_future_treated_as_fresh() {
        let band = estimate(
            &sample("1"),
            t0() - Duration::minutes(5),
            &config("0.0025"),
        )
        .unwrap();
        assert_eq!(band.high, fix("1.0025"));
    }
}
