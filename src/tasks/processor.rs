use std::sync::Arc;

use chrono::Utc;

use crate::{
    ai::ProposalResolver,
    domain::{
        budget::parse_min_budget, BidDuration, BidOutcome, ProjectCandidate, SkipReason,
        SkippedBid, SubmittedBid,
    },
    marketplace::{FormFields, MarketplaceDriver},
    store::{BidStateStore, StoreError},
};

/// Fixed bidding policy: commit to 5 days on fixed-price listings, 50 hours
/// per week on hourly ones.
const BID_DAYS: u32 = 5;
const BID_HOURS: u32 = 50;

/// Drives one eligible candidate to its terminal outcome: submitted, or
/// skipped with a persisted reason. Every failure branch is an enumerated
/// outcome; only a store failure escapes, because no further processing is
/// safe once persistence is gone.
pub struct BidProcessor {
    driver: Arc<dyn MarketplaceDriver>,
    resolver: ProposalResolver,
    store: Arc<BidStateStore>,
}

impl BidProcessor {
    pub fn new(
        driver: Arc<dyn MarketplaceDriver>,
        resolver: ProposalResolver,
        store: Arc<BidStateStore>,
    ) -> Self {
        Self {
            driver,
            resolver,
            store,
        }
    }

    pub async fn process(&self, candidate: &ProjectCandidate) -> Result<BidOutcome, StoreError> {
        // The intake filter already checked both stores, but a candidate can
        // be re-offered between passes; the guard is re-checked here.
        if self.store.contains(&candidate.title) {
            return self.skip(candidate, SkipReason::AlreadyBidPrevious);
        }

        let full_description = match self.driver.fetch_full_description(&candidate.link).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => candidate.description.clone(),
            Err(err) => {
                tracing::debug!(
                    target: "processor",
                    title = %candidate.title,
                    error = %err,
                    "detail fetch failed; falling back to the listing description"
                );
                candidate.description.clone()
            }
        };

        let fields = match self.driver.form_fields_present(&candidate.link).await {
            Ok(fields) => fields,
            Err(err) => {
                tracing::warn!(
                    target: "processor",
                    title = %candidate.title,
                    error = %err,
                    "could not inspect the bid form"
                );
                return self.skip(candidate, SkipReason::UnhandledError);
            }
        };
        let duration = match plan_duration(&fields) {
            Some(duration) => duration,
            None => return self.skip(candidate, SkipReason::RestrictedProject),
        };

        let min_budget = parse_min_budget(&candidate.budget);
        let proposal = self
            .resolver
            .resolve(&candidate.title, &full_description, min_budget)
            .await;

        if let Err(err) = self
            .driver
            .submit_bid(&candidate.link, min_budget, duration, &proposal)
            .await
        {
            tracing::warn!(
                target: "processor",
                title = %candidate.title,
                error = %err,
                "bid submission failed"
            );
            return self.skip(candidate, SkipReason::SubmitFailed);
        }

        self.store.record_submitted(SubmittedBid {
            title: candidate.title.clone(),
            budget: candidate.budget.clone(),
            description: candidate.description.clone(),
            full_description,
            proposal,
            min_budget,
            duration,
            link: candidate.link.clone(),
            submitted_at: Utc::now(),
        })?;
        tracing::info!(
            target: "processor",
            title = %candidate.title,
            min_budget,
            ?duration,
            "bid submitted"
        );
        Ok(BidOutcome::Submitted)
    }

    fn skip(
        &self,
        candidate: &ProjectCandidate,
        reason: SkipReason,
    ) -> Result<BidOutcome, StoreError> {
        self.store
            .record_skipped(SkippedBid::from_candidate(candidate, reason))?;
        tracing::info!(target: "processor", title = %candidate.title, %reason, "project skipped");
        Ok(BidOutcome::Skipped(reason))
    }
}

/// Required fields: amount, proposal text, and exactly one period variant.
/// When a page exposes both variants, the days field wins.
fn plan_duration(fields: &FormFields) -> Option<BidDuration> {
    if !fields.has_amount || !fields.has_description {
        return None;
    }
    if fields.has_days_period {
        Some(BidDuration::Days(BID_DAYS))
    } else if fields.has_hours_period {
        Some(BidDuration::Hours(BID_HOURS))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::{
        ai::{GenerationFailure, ProposalGenerator},
        config::IntakeConfig,
        infrastructure::directories::ResolvedPaths,
        marketplace::DriverError,
        tasks::intake::IntakeFilter,
    };

    struct FakeGenerator;

    #[async_trait]
    impl ProposalGenerator for FakeGenerator {
        async fn generate(&self, _: &str, _: &str, _: u32) -> Result<String, GenerationFailure> {
            Ok("Hello, a generated proposal. Best regards, AlphaFusion Corporation".into())
        }
    }

    #[derive(Debug, Clone)]
    struct SubmitCall {
        amount: u32,
        duration: BidDuration,
        proposal: String,
    }

    struct FakeDriver {
        fields: FormFields,
        fail_fetch: bool,
        fail_submit: bool,
        submissions: Mutex<Vec<SubmitCall>>,
    }

    impl FakeDriver {
        fn with_fields(fields: FormFields) -> Self {
            Self {
                fields,
                fail_fetch: false,
                fail_submit: false,
                submissions: Mutex::new(Vec::new()),
            }
        }

        fn all_fields() -> FormFields {
            FormFields {
                has_amount: true,
                has_days_period: true,
                has_hours_period: false,
                has_description: true,
            }
        }
    }

    #[async_trait]
    impl MarketplaceDriver for FakeDriver {
        async fn login(&self) -> Result<(), DriverError> {
            Ok(())
        }

        async fn list_candidates(&self) -> Result<Vec<ProjectCandidate>, DriverError> {
            Ok(Vec::new())
        }

        async fn fetch_full_description(&self, _link: &str) -> Result<String, DriverError> {
            if self.fail_fetch {
                Err(DriverError::Timeout {
                    selector: "description".into(),
                })
            } else {
                Ok("the full project description".into())
            }
        }

        async fn form_fields_present(&self, _link: &str) -> Result<FormFields, DriverError> {
            Ok(self.fields)
        }

        async fn submit_bid(
            &self,
            _link: &str,
            amount: u32,
            duration: BidDuration,
            proposal: &str,
        ) -> Result<(), DriverError> {
            if self.fail_submit {
                return Err(DriverError::Protocol("place bid button not found".into()));
            }
            self.submissions.lock().push(SubmitCall {
                amount,
                duration,
                proposal: proposal.to_string(),
            });
            Ok(())
        }
    }

    fn candidate() -> ProjectCandidate {
        ProjectCandidate {
            title: "Build a CRM dashboard".into(),
            link: "https://example.com/p/crm".into(),
            budget: "$500-800".into(),
            description: "short description".into(),
            skills: vec!["React".into(), "Node.js".into()],
        }
    }

    fn store() -> (tempfile::TempDir, Arc<BidStateStore>) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ResolvedPaths {
            logs_dir: dir.path().join("logs"),
            data_dir: dir.path().to_path_buf(),
            submitted_path: dir.path().join("submitted_bids.json"),
            skipped_path: dir.path().join("skipped_bids.json"),
        };
        (dir, Arc::new(BidStateStore::open(&paths).unwrap()))
    }

    fn processor(
        driver: Arc<FakeDriver>,
        store: Arc<BidStateStore>,
    ) -> BidProcessor {
        BidProcessor::new(
            driver,
            ProposalResolver::new(Arc::new(FakeGenerator)),
            store,
        )
    }

    #[tokio::test]
    async fn full_run_reaches_submitted_with_fixed_policy_values() {
        let (_dir, store) = store();
        let driver = Arc::new(FakeDriver::with_fields(FakeDriver::all_fields()));
        let processor = processor(driver.clone(), store.clone());

        let outcome = processor.process(&candidate()).await.unwrap();
        assert_eq!(outcome, BidOutcome::Submitted);

        let call = driver.submissions.lock()[0].clone();
        assert_eq!(call.amount, 500);
        assert_eq!(call.duration, BidDuration::Days(5));
        assert!(!call.proposal.is_empty());

        assert!(store.has_submitted("Build a CRM dashboard"));
        assert!(!store.has_skipped("Build a CRM dashboard"));
    }

    #[tokio::test]
    async fn second_pass_short_circuits_without_mutation() {
        let (_dir, store) = store();
        let driver = Arc::new(FakeDriver::with_fields(FakeDriver::all_fields()));
        let processor = processor(driver.clone(), store.clone());

        processor.process(&candidate()).await.unwrap();
        let filter = IntakeFilter::new(
            &IntakeConfig {
                exclude_keywords: vec![],
            },
            store.clone(),
        );
        let eligible = filter.filter(vec![candidate()]).unwrap();
        assert!(eligible.is_empty());
        assert_eq!(driver.submissions.lock().len(), 1);
        assert!(!store.has_skipped("Build a CRM dashboard"));

        // Even a direct re-process stops at the guard.
        let outcome = processor.process(&candidate()).await.unwrap();
        assert_eq!(
            outcome,
            BidOutcome::Skipped(SkipReason::AlreadyBidPrevious)
        );
        assert_eq!(driver.submissions.lock().len(), 1);
    }

    #[tokio::test]
    async fn missing_amount_field_restricts_the_project_once() {
        let (_dir, store) = store();
        let driver = Arc::new(FakeDriver::with_fields(FormFields {
            has_amount: false,
            has_days_period: true,
            has_hours_period: false,
            has_description: true,
        }));
        let processor = processor(driver.clone(), store.clone());

        let outcome = processor.process(&candidate()).await.unwrap();
        assert_eq!(outcome, BidOutcome::Skipped(SkipReason::RestrictedProject));
        assert!(store.has_skipped("Build a CRM dashboard"));

        // The same title reappearing in a later pass records nothing new.
        let outcome = processor.process(&candidate()).await.unwrap();
        assert_eq!(
            outcome,
            BidOutcome::Skipped(SkipReason::AlreadyBidPrevious)
        );
        assert!(driver.submissions.lock().is_empty());
    }

    #[tokio::test]
    async fn missing_period_variants_restrict_the_project() {
        let (_dir, store) = store();
        let driver = Arc::new(FakeDriver::with_fields(FormFields {
            has_amount: true,
            has_days_period: false,
            has_hours_period: false,
            has_description: true,
        }));
        let processor = processor(driver, store.clone());

        let outcome = processor.process(&candidate()).await.unwrap();
        assert_eq!(outcome, BidOutcome::Skipped(SkipReason::RestrictedProject));
    }

    #[tokio::test]
    async fn hourly_listings_bid_fifty_hours() {
        let (_dir, store) = store();
        let driver = Arc::new(FakeDriver::with_fields(FormFields {
            has_amount: true,
            has_days_period: false,
            has_hours_period: true,
            has_description: true,
        }));
        let processor = processor(driver.clone(), store.clone());

        let outcome = processor.process(&candidate()).await.unwrap();
        assert_eq!(outcome, BidOutcome::Submitted);
        assert_eq!(
            driver.submissions.lock()[0].duration,
            BidDuration::Hours(50)
        );
    }

    #[tokio::test]
    async fn submit_failure_records_a_skip() {
        let (_dir, store) = store();
        let mut driver = FakeDriver::with_fields(FakeDriver::all_fields());
        driver.fail_submit = true;
        let processor = processor(Arc::new(driver), store.clone());

        let outcome = processor.process(&candidate()).await.unwrap();
        assert_eq!(outcome, BidOutcome::Skipped(SkipReason::SubmitFailed));
        assert!(store.has_skipped("Build a CRM dashboard"));
        assert!(!store.has_submitted("Build a CRM dashboard"));
    }

    #[tokio::test]
    async fn detail_fetch_failure_is_not_fatal() {
        let (_dir, store) = store();
        let mut driver = FakeDriver::with_fields(FakeDriver::all_fields());
        driver.fail_fetch = true;
        let processor = processor(Arc::new(driver), store.clone());

        let outcome = processor.process(&candidate()).await.unwrap();
        assert_eq!(outcome, BidOutcome::Submitted);
    }
}
