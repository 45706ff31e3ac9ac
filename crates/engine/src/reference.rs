//! Reference tracker: revenue-hiding clamp on ref-per-token.
//!
//! Small drawdowns (rounding, rebasing jitter) inside the tolerance are hidden
//! behind the high-water mark. Anything deeper resets the mark and is reported
//! as-is so that a real loss of backing becomes visible.

use sentinel_common::error::CollateralError;
use sentinel_common::fixed::Fix;

/// Source of the raw measured ref-per-token for one asset.
pub trait RefPerTokSource {
    fn measured_ref_per_tok(&self) -> Result<Fix, CollateralError>;
}

/// A constant rate, e.g. for fiat collateral that is its own reference.
impl RefPerTokSource for Fix {
    fn measured_ref_per_tok(&self) -> Result<Fix, CollateralError> {
        Ok(*self)
    }
}

/// A measurement fetched ahead of time and replayed into a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountingSnapshot(pub Result<Fix, CollateralError>);

impl RefPerTokSource for AccountingSnapshot {
    fn measured_ref_per_tok(&self) -> Result<Fix, CollateralError> {
        self.0.clone()
    }
}

/// Per-asset reference rate memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceState {
    /// Value reported by the last update.
    pub last_ref_per_tok: Fix,
    pub high_water_mark: Fix,
}

/// Fold a fresh measurement into `state` and return the rate to report.
pub fn update(measured: Fix, state: &mut ReferenceState, revenue_hiding_tolerance: Fix) -> Fix {
    let reported = if measured >= state.high_water_mark {
        state.high_water_mark = measured;
        measured
    } else {
        let floor = state
            .high_water_mark
            .saturating_mul(Fix::ONE.saturating_sub(revenue_hiding_tolerance));
        if measured >= floor {
            state.high_water_mark
        } else {
            tracing::debug!(
                measured = %measured,
                high_water_mark = %state.high_water_mark,
                "ref-per-token drop exceeds revenue-hiding tolerance"
            );
            state.high_water_mark = measured;
            measured
        }
    };
    state.last_ref_per_tok = reported;
    reported
}
