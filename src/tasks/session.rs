use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::time::sleep;

use crate::{
    config::PollConfig,
    domain::BidOutcome,
    infrastructure::shutdown::ShutdownListener,
    marketplace::MarketplaceDriver,
    store::BidStateStore,
    tasks::{intake::IntakeFilter, processor::BidProcessor},
};

/// Pacing between discovery passes. The base interval doubles for each
/// consecutive pass that produced no eligible candidate, capped at
/// `max_backoff`, and resets as soon as a pass has work again.
pub struct PollPolicy {
    interval: Duration,
    max_backoff: Duration,
}

impl PollPolicy {
    pub fn new(config: &PollConfig) -> Self {
        Self {
            interval: config.interval,
            max_backoff: config.max_backoff.max(config.interval),
        }
    }

    pub fn delay_after(&self, consecutive_empty_passes: u32) -> Duration {
        let factor = 2u32.saturating_pow(consecutive_empty_passes.min(16));
        self.interval.saturating_mul(factor).min(self.max_backoff)
    }
}

/// The indefinite discovery/bid loop. Candidates are processed strictly in
/// discovery order and one at a time; the single browser session cannot be
/// driven by two operations at once.
pub struct SessionLoop {
    driver: Arc<dyn MarketplaceDriver>,
    filter: IntakeFilter,
    processor: BidProcessor,
    store: Arc<BidStateStore>,
    policy: PollPolicy,
    session_bids: u64,
}

impl SessionLoop {
    pub fn new(
        driver: Arc<dyn MarketplaceDriver>,
        filter: IntakeFilter,
        processor: BidProcessor,
        store: Arc<BidStateStore>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            driver,
            filter,
            processor,
            store,
            policy,
            session_bids: 0,
        }
    }

    pub async fn run(mut self, mut shutdown: ShutdownListener) -> Result<()> {
        let mut consecutive_empty = 0u32;
        loop {
            if shutdown.is_triggered() {
                break;
            }

            tracing::info!(
                target: "session",
                lifetime = self.store.submitted_count(),
                session = self.session_bids,
                "checking for new projects"
            );

            let batch = match self.driver.list_candidates().await {
                Ok(batch) => batch,
                Err(err) => {
                    // Transient scrape failures re-offer the same candidates
                    // on the next pass; nothing is recorded for them.
                    tracing::warn!(target: "session", error = %err, "discovery pass failed");
                    Vec::new()
                }
            };
            let discovered = batch.len();
            let eligible = self.filter.filter(batch)?;
            tracing::info!(
                target: "session",
                discovered,
                eligible = eligible.len(),
                "discovery pass filtered"
            );

            let had_work = !eligible.is_empty();
            for candidate in &eligible {
                if shutdown.is_triggered() {
                    return Ok(());
                }
                tracing::info!(
                    target: "session",
                    title = %candidate.title,
                    budget = %candidate.budget,
                    description = %candidate.description,
                    "processing project"
                );
                if self.processor.process(candidate).await? == BidOutcome::Submitted {
                    self.session_bids += 1;
                }
                tracing::info!(
                    target: "session",
                    lifetime = self.store.submitted_count(),
                    session = self.session_bids,
                    "bids placed so far"
                );
            }

            consecutive_empty = if had_work {
                0
            } else {
                consecutive_empty.saturating_add(1)
            };
            let delay = self.policy.delay_after(consecutive_empty);
            tracing::debug!(target: "session", ?delay, "waiting before the next pass");
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.notified() => break,
            }
        }
        tracing::info!(target: "session", "session loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(interval_ms: u64, max_ms: u64) -> PollPolicy {
        PollPolicy::new(&PollConfig {
            interval: Duration::from_millis(interval_ms),
            max_backoff: Duration::from_millis(max_ms),
        })
    }

    #[test]
    fn busy_passes_keep_the_base_interval() {
        let policy = policy(1_000, 30_000);
        assert_eq!(policy.delay_after(0), Duration::from_millis(1_000));
    }

    #[test]
    fn empty_passes_back_off_exponentially_to_the_cap() {
        let policy = policy(1_000, 30_000);
        assert_eq!(policy.delay_after(1), Duration::from_millis(2_000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(4_000));
        assert_eq!(policy.delay_after(4), Duration::from_millis(16_000));
        assert_eq!(policy.delay_after(5), Duration::from_millis(30_000));
        assert_eq!(policy.delay_after(60), Duration::from_millis(30_000));
    }

    #[test]
    fn cap_never_undercuts_the_interval() {
        let policy = policy(5_000, 1_000);
        assert_eq!(policy.delay_after(3), Duration::from_millis(5_000));
    }
}
