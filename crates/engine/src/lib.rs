//! Collateral health engine.
//!
//! - [`oracle`]: feed reader with decimal normalization and staleness cutoff
//! - [`price_range`]: staleness-widened price bands
//! - [`reference`]: revenue-hiding ref-per-token tracker
//! - [`peg`]: peg deviation judge
//! - [`timer`]: debounce before default
//! - [`collateral`]: per-asset SOUND / IFFY / DISABLED state machine
//! - [`book`]: the set of monitored assets

pub mod book;
pub mod collateral;
pub mod oracle;
pub mod peg;
pub mod price_range;
pub mod reference;
pub mod timer;
