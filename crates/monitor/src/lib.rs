//! Refresh service: binds monitored collateral to on-chain feeds and
//! accounting contracts, and drives the collateral book on a fixed cadence.

pub mod accounting;
pub mod assets;
pub mod chainlink;
pub mod poller;
pub mod rpc;
