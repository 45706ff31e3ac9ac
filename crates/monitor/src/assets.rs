//! Monitored asset definitions.
//!
//! The assets file is a JSON array. Each entry carries the collateral
//! parameters, the aggregator address and a ref-per-token source:
//!
//! ```json
//! [{
//!   "erc20": "0x5e40f26e89213660514c51fb61b2d357dbf63c85",
//!   "target_name": "ARS",
//!   "price_timeout": 604800,
//!   "oracle_timeout": 86400,
//!   "oracle_error": "0.0025",
//!   "default_threshold": "0.0125",
//!   "delay_until_default": 86400,
//!   "max_trade_volume": "1000000",
//!   "revenue_hiding": "0.000001",
//!   "feed": "0x7e860098F58bBFC8648a4311b374B1D669a2bc6B",
//!   "ref_per_tok": { "kind": "fixed", "value": "1" }
//! }]
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use sentinel_common::types::CollateralConfig;
use sentinel_engine::collateral::Collateral;

use crate::accounting::{Accounting, RefPerTokSpec};
use crate::chainlink::ChainlinkFeed;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    #[serde(flatten)]
    pub collateral: CollateralConfig,
    /// Chainlink aggregator quoting target-per-ref.
    pub feed: String,
    pub ref_per_tok: RefPerTokSpec,
}

/// On-chain collaborators of one registered collateral.
#[derive(Debug, Clone)]
pub struct AssetSource {
    pub erc20: String,
    pub feed: ChainlinkFeed,
    pub accounting: Accounting,
}

impl AssetSpec {
    /// Validate the entry and split it into the engine-side collateral and its
    /// RPC-side sources.
    pub fn into_parts(self, rpc_timeout: Duration) -> anyhow::Result<(Collateral, AssetSource)> {
        let collateral = Collateral::new(self.collateral)?;
        let feed = ChainlinkFeed::from_address_str(&self.feed, rpc_timeout)?;
        let accounting = Accounting::from_spec(&self.ref_per_tok, rpc_timeout)?;

        let source = AssetSource {
            erc20: collateral.erc20().to_string(),
            feed,
            accounting,
        };
        Ok((collateral, source))
    }
}

pub fn parse_assets(json: &str) -> anyhow::Result<Vec<AssetSpec>> {
    let specs: Vec<AssetSpec> = serde_json::from_str(json)
        .map_err(|e| anyhow::anyhow!("invalid assets definition: {}", e))?;
    if specs.is_empty() {
        anyhow::bail!("assets definition lists no collateral");
    }
    Ok(specs)
}

/// Read and parse the assets file at `path`.
pub fn load_assets(path: impl AsRef<Path>) -> anyhow::Result<Vec<AssetSpec>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    let specs = parse_assets(&json)?;
    tracing::info!(path = %path.display(), count = specs.len(), "Loaded asset definitions");
    Ok(specs)
}
