//! Collateral status state machine.
//!
//! Each [`Collateral`] owns its reference state, status and default timer. A
//! refresh reads the oracle and the accounting source, derives the band, the
//! reported ref-per-token and the peg verdict, then applies one transition:
//!
//! ```text
//! SOUND    --breach-->                 IFFY      (timer starts)
//! IFFY     --cleared-->                SOUND     (timer cleared)
//! IFFY     --breach for >= delay-->    DISABLED  (terminal)
//! DISABLED --anything-->               DISABLED
//! ```
//!
//! All derived values are staged on copies and committed together. An
//! unreadable accounting source counts as a breach and leaves the reference
//! state where it was.

use chrono::{DateTime, Utc};

use sentinel_common::error::{CollateralError, OracleError};
use sentinel_common::fixed::Fix;
use sentinel_common::types::{
    CollateralConfig, PriceBand, PriceQuote, PriceSample, Status,
};

use crate::oracle::{OracleReader, PriceFeed};
use crate::peg::PegWindow;
use crate::price_range;
use crate::reference::{self, RefPerTokSource, ReferenceState};
use crate::timer::DefaultTimer;

/// Why a refresh judged the collateral unsound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultCause {
    Oracle(OracleError),
    /// The ref-per-token source could not be read this refresh.
    Accounting(String),
    PegBroken { band: PriceBand, window: PegWindow },
    RefPerTokDrop { peak: Fix, reported: Fix },
}

impl std::fmt::Display for DefaultCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefaultCause::Oracle(err) => write!(f, "{}", err),
            DefaultCause::Accounting(msg) => write!(f, "{}", msg),
            DefaultCause::PegBroken { band, window } => write!(
                f,
                "peg broken: band [{}, {}] outside [{}, {}]",
                band.low, band.high, window.bottom, window.top
            ),
            DefaultCause::RefPerTokDrop { peak, reported } => {
                write!(f, "ref-per-token dropped from {} to {}", peak, reported)
            }
        }
    }
}

/// Outcome of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub previous: Status,
    pub status: Status,
    pub cause: Option<DefaultCause>,
    pub ref_per_tok: Fix,
}

impl RefreshReport {
    pub fn transitioned(&self) -> bool {
        self.previous != self.status
    }
}

/// One monitored collateral asset.
#[derive(Debug, Clone)]
pub struct Collateral {
    config: CollateralConfig,
    reader: OracleReader,
    peg: PegWindow,
    reference: ReferenceState,
    /// Pre-drop ref-per-token the rate has to recover to after a genuine drop.
    drawdown_peak: Option<Fix>,
    status: Status,
    timer: DefaultTimer,
    last_sample: Option<PriceSample>,
    band: Option<PriceBand>,
    last_cause: Option<DefaultCause>,
    last_refresh: Option<DateTime<Utc>>,
    disabled_at: Option<DateTime<Utc>>,
}

impl Collateral {
    /// Validate `config` and start monitoring in `SOUND`.
    pub fn new(config: CollateralConfig) -> Result<Self, CollateralError> {
        config.validate()?;
        let mut config = config;
        config.erc20 = config.erc20.to_lowercase();

        Ok(Self {
            reader: OracleReader::new(config.oracle_timeout),
            peg: PegWindow::new(config.target_per_ref, config.default_threshold),
            config,
            reference: ReferenceState::default(),
            drawdown_peak: None,
            status: Status::Sound,
            timer: DefaultTimer::new(),
            last_sample: None,
            band: None,
            last_cause: None,
            last_refresh: None,
            disabled_at: None,
        })
    }

    /// Re-evaluate the collateral at `now`.
    ///
    /// Feed, accounting and peg faults are all absorbed into the status.
    pub fn refresh<F, A>(&mut self, now: DateTime<Utc>, feed: &F, accounting: &A) -> RefreshReport
    where
        F: PriceFeed + ?Sized,
        A: RefPerTokSource + ?Sized,
    {
        let previous = self.status;
        if previous == Status::Disabled {
            return RefreshReport {
                previous,
                status: previous,
                cause: self.last_cause.clone(),
                ref_per_tok: self.ref_per_tok(),
            };
        }

        // Reference tracking; an unreadable source keeps the previous rate
        let mut reference = self.reference;
        let mut drawdown_peak = self.drawdown_peak;
        let (reported, ref_cause) = match accounting.measured_ref_per_tok() {
            Ok(measured) => {
                let before = reference.last_ref_per_tok;
                let tolerance = self.config.revenue_hiding;
                let reported = reference::update(measured, &mut reference, tolerance);
                if reported < before {
                    drawdown_peak.get_or_insert(before);
                }
                let cause = match drawdown_peak {
                    Some(peak)
                        if reported < peak.saturating_mul(Fix::ONE.saturating_sub(tolerance)) =>
                    {
                        Some(DefaultCause::RefPerTokDrop { peak, reported })
                    }
                    Some(_) => {
                        drawdown_peak = None;
                        None
                    }
                    None => None,
                };
                (reported, cause)
            }
            Err(e) => (
                reference.last_ref_per_tok,
                Some(DefaultCause::Accounting(e.to_string())),
            ),
        };

        // Oracle and price band
        let sampled = self.reader.sample(feed, now).and_then(|sample| {
            price_range::estimate(&sample, now, &self.config).map(|band| (sample, band))
        });
        let (last_sample, band, oracle_cause) = match sampled {
            Ok((sample, band)) => (Some(sample), Some(band), None),
            Err(err) => {
                // Keep widening the last good sample's band while the feed is down
                let band = self
                    .last_sample
                    .as_ref()
                    .and_then(|sample| price_range::estimate(sample, now, &self.config).ok());
                (self.last_sample, band, Some(DefaultCause::Oracle(err)))
            }
        };

        // Peg
        let peg_cause = match (&oracle_cause, band) {
            (None, Some(band)) if self.peg.is_broken_by(&band) => Some(DefaultCause::PegBroken {
                band,
                window: self.peg,
            }),
            _ => None,
        };

        let cause = oracle_cause.or(peg_cause).or(ref_cause);

        // Transition
        let mut timer = self.timer;
        let status = match (previous, cause.is_some()) {
            (Status::Sound, false) => Status::Sound,
            (Status::Sound, true) => {
                timer.start(now);
                Status::Iffy
            }
            (Status::Iffy, false) => {
                timer.clear();
                Status::Sound
            }
            (Status::Iffy, true) => {
                timer.start(now);
                if timer.has_elapsed(now, self.config.delay_until_default) {
                    Status::Disabled
                } else {
                    Status::Iffy
                }
            }
            (Status::Disabled, _) => Status::Disabled,
        };

        // Commit
        self.reference = reference;
        self.drawdown_peak = drawdown_peak;
        self.last_sample = last_sample;
        self.band = band;
        self.timer = timer;
        self.status = status;
        self.last_cause = cause.clone();
        self.last_refresh = Some(now);
        if status == Status::Disabled {
            self.disabled_at = Some(now);
        }

        let report = RefreshReport {
            previous,
            status,
            cause,
            ref_per_tok: reported,
        };
        self.log_report(&report);
        report
    }

    fn log_report(&self, report: &RefreshReport) {
        let cause = report.cause.as_ref().map(|c| c.to_string());
        match (report.transitioned(), report.status) {
            (true, Status::Sound) => tracing::info!(
                erc20 = %self.config.erc20,
                from = %report.previous,
                "Collateral recovered"
            ),
            (true, Status::Iffy) => tracing::warn!(
                erc20 = %self.config.erc20,
                cause = cause.as_deref().unwrap_or_default(),
                delay_until_default = self.config.delay_until_default,
                "Collateral became IFFY"
            ),
            (true, Status::Disabled) => tracing::warn!(
                erc20 = %self.config.erc20,
                cause = cause.as_deref().unwrap_or_default(),
                iffy_since = ?self.timer.iffy_since(),
                "Collateral DISABLED"
            ),
            (false, status) => tracing::debug!(
                erc20 = %self.config.erc20,
                status = %status,
                ref_per_tok = %report.ref_per_tok,
                "Collateral refreshed"
            ),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Current (possibly hidden) ref-per-token.
    pub fn ref_per_tok(&self) -> Fix {
        self.reference.last_ref_per_tok
    }

    /// Token price band (reference band times ref-per-token).
    ///
    /// Fails with [`CollateralError::StaleOrDisabled`] when disabled or never priced.
    pub fn price(&self) -> Result<PriceBand, CollateralError> {
        self.try_price().map(|quote| quote.band)
    }

    /// Token price band together with the latest target-per-ref reading.
    pub fn try_price(&self) -> Result<PriceQuote, CollateralError> {
        if self.status == Status::Disabled {
            return Err(CollateralError::StaleOrDisabled);
        }
        let (Some(band), Some(sample)) = (self.band, self.last_sample) else {
            return Err(CollateralError::StaleOrDisabled);
        };
        let band = band
            .scaled_by(self.ref_per_tok())
            .ok_or(CollateralError::StaleOrDisabled)?;
        Ok(PriceQuote {
            band,
            peg_price: sample.price,
        })
    }

    /// When the collateral defaults (or defaulted); `None` while `SOUND`.
    pub fn when_default(&self) -> Option<DateTime<Utc>> {
        match self.status {
            Status::Sound => None,
            Status::Iffy => self.timer.when_default(self.config.delay_until_default),
            Status::Disabled => self.disabled_at,
        }
    }

    pub fn iffy_since(&self) -> Option<DateTime<Utc>> {
        self.timer.iffy_since()
    }

    pub fn config(&self) -> &CollateralConfig {
        &self.config
    }

    pub fn erc20(&self) -> &str {
        &self.config.erc20
    }

    pub fn peg_window(&self) -> PegWindow {
        self.peg
    }

    pub fn last_cause(&self) -> Option<&DefaultCause> {
        self.last_cause.as_ref()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }
}
