//! Peg deviation judge.
//!
//! A peg is broken only when the whole price band lies outside
//! `[peg * (1 - threshold), peg * (1 + threshold)]`. Touching an edge is not a
//! breach, and a band that straddles the peg never is.

use serde::Serialize;

use sentinel_common::fixed::Fix;
use sentinel_common::types::PriceBand;

/// Tolerated target-per-ref interval around the expected peg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PegWindow {
    pub bottom: Fix,
    pub top: Fix,
}

impl PegWindow {
    pub fn new(expected_peg: Fix, default_threshold: Fix) -> Self {
        Self {
            bottom: expected_peg.saturating_mul(Fix::ONE.saturating_sub(default_threshold)),
            top: Fix::ONE
                .checked_add(default_threshold)
                .and_then(|grow| expected_peg.checked_mul_ceil(grow))
                .unwrap_or(Fix::MAX),
        }
    }

    pub fn is_broken_by(&self, band: &PriceBand) -> bool {
        band.high < self.bottom || band.low > self.top
    }
}

/// Whether `band` implies the peg has been lost.
pub fn is_peg_broken(band: &PriceBand, expected_peg: Fix, default_threshold: Fix) -> bool {
    PegWindow::new(expected_peg, default_threshold).is_broken_by(band)
}
