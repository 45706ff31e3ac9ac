use std::time::Duration;

use alloy::providers::{Provider, ProviderBuilder};
use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use sentinel_common::types::Status;
use sentinel_engine::book::{CollateralBook, SharedBook};
use sentinel_engine::oracle::FeedSnapshot;
use sentinel_engine::reference::AccountingSnapshot;

use crate::assets::AssetSource;

/// Inputs fetched for one collateral ahead of a refresh.
#[derive(Debug, Clone)]
pub struct Observation {
    pub erc20: String,
    pub round: FeedSnapshot,
    pub measured: AccountingSnapshot,
}

/// Tally of one refresh round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub refreshed: usize,
    pub skipped: usize,
    pub transitions: usize,
    pub iffy: usize,
    pub disabled: usize,
}

/// Refresh every observed collateral at `now`.
///
/// Feed and accounting failures are judged by the collateral itself; only
/// observations for unregistered assets are skipped.
pub fn apply_round(
    book: &mut CollateralBook,
    observations: &[Observation],
    now: DateTime<Utc>,
) -> RoundSummary {
    let mut summary = RoundSummary::default();

    for observation in observations {
        let Some(collateral) = book.get_mut(&observation.erc20) else {
            tracing::warn!(erc20 = %observation.erc20, "Observation for unregistered collateral");
            summary.skipped += 1;
            continue;
        };

        let report = collateral.refresh(now, &observation.round, &observation.measured);
        summary.refreshed += 1;
        if report.transitioned() {
            summary.transitions += 1;
        }
        match report.status {
            Status::Iffy => summary.iffy += 1,
            Status::Disabled => summary.disabled += 1,
            Status::Sound => {}
        }
    }

    summary
}

/// Periodically reads every feed and accounting source, then refreshes the book.
pub struct RefreshPoller {
    rpc_url: String,
    poll_interval: Duration,
    sources: Vec<AssetSource>,
    book: SharedBook,
}

impl RefreshPoller {
    pub fn new(
        rpc_url: String,
        poll_interval_ms: u64,
        sources: Vec<AssetSource>,
        book: SharedBook,
    ) -> Self {
        Self {
            rpc_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            sources,
            book,
        }
    }

    /// Start the polling loop. Runs indefinitely until the task is cancelled.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);

        tracing::info!(
            assets = self.sources.len(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Refresh poller started"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let observations = self.observe(&provider).await;

            // Single write section per round, no awaits while held
            let now = Utc::now();
            let summary = {
                let mut book = self.book.write().await;
                apply_round(&mut book, &observations, now)
            };

            tracing::debug!(
                refreshed = summary.refreshed,
                skipped = summary.skipped,
                transitions = summary.transitions,
                iffy = summary.iffy,
                disabled = summary.disabled,
                "Refresh round complete"
            );
        }
    }

    /// Fetch feed rounds and accounting for every source.
    async fn observe(&self, provider: &(impl Provider + Clone)) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let round = source.feed.snapshot(provider).await;
            let measured = source.accounting.snapshot(provider).await;
            observations.push(Observation {
                erc20: source.erc20.clone(),
                round,
                measured,
            });
        }
        observations
    }
}
