//! Collateral book: the set of independently monitored assets.
//!
//! Assets are keyed by lower-cased `erc20` address. Each entry owns its own
//! state, so refreshing one never touches another. The book is shared between
//! the refresh poller and the HTTP API behind a [`SharedBook`] lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use sentinel_common::error::CollateralError;
use sentinel_common::fixed::Fix;
use sentinel_common::types::{PriceBand, Status};

use crate::collateral::Collateral;

/// Book shared across tasks.
pub type SharedBook = Arc<RwLock<CollateralBook>>;

/// Read model of one collateral, as exposed to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub erc20: String,
    pub target_name: String,
    pub status: Status,
    pub ref_per_tok: Fix,
    /// Token price band; absent when disabled or never priced.
    pub price: Option<PriceBand>,
    pub peg_price: Option<Fix>,
    pub cause: Option<String>,
    pub iffy_since: Option<DateTime<Utc>>,
    pub when_default: Option<DateTime<Utc>>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub max_trade_volume: Fix,
}

impl From<&Collateral> for AssetSummary {
    fn from(collateral: &Collateral) -> Self {
        let quote = collateral.try_price().ok();
        Self {
            erc20: collateral.erc20().to_string(),
            target_name: collateral.config().target_name.clone(),
            status: collateral.status(),
            ref_per_tok: collateral.ref_per_tok(),
            price: quote.map(|q| q.band),
            peg_price: quote.map(|q| q.peg_price),
            cause: collateral.last_cause().map(|c| c.to_string()),
            iffy_since: collateral.iffy_since(),
            when_default: collateral.when_default(),
            last_refresh: collateral.last_refresh(),
            max_trade_volume: collateral.config().max_trade_volume,
        }
    }
}

#[derive(Debug, Default)]
pub struct CollateralBook {
    assets: BTreeMap<String, Collateral>,
}

impl CollateralBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedBook {
        Arc::new(RwLock::new(self))
    }

    /// Add a collateral. Each `erc20` may be registered once.
    pub fn register(&mut self, collateral: Collateral) -> Result<(), CollateralError> {
        let key = collateral.erc20().to_string();
        if self.assets.contains_key(&key) {
            return Err(CollateralError::ConfigInvalid(format!(
                "collateral {} registered twice",
                key
            )));
        }
        tracing::info!(
            erc20 = %key,
            target = %collateral.config().target_name,
            "Registered collateral"
        );
        self.assets.insert(key, collateral);
        Ok(())
    }

    pub fn get(&self, erc20: &str) -> Option<&Collateral> {
        self.assets.get(&erc20.to_lowercase())
    }

    pub fn get_mut(&mut self, erc20: &str) -> Option<&mut Collateral> {
        self.assets.get_mut(&erc20.to_lowercase())
    }

    pub fn summaries(&self) -> Vec<AssetSummary> {
        self.assets.values().map(AssetSummary::from).collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
