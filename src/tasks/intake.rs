use std::sync::Arc;

use crate::{
    config::IntakeConfig,
    domain::{ProjectCandidate, SkipReason, SkippedBid},
    store::{BidStateStore, StoreError},
};

/// Keyword exclusion plus deduplication against the persisted stores.
/// Exclusions suppress a candidate for the current pass only; they are never
/// written to the permanent skip store.
pub struct IntakeFilter {
    keywords: Vec<String>,
    store: Arc<BidStateStore>,
}

impl IntakeFilter {
    pub fn new(config: &IntakeConfig, store: Arc<BidStateStore>) -> Self {
        Self {
            keywords: config
                .exclude_keywords
                .iter()
                .map(|keyword| keyword.to_lowercase())
                .collect(),
            store,
        }
    }

    /// Reduces one discovery pass to the candidates eligible for processing,
    /// preserving discovery order. The whole batch is always scanned; a
    /// duplicate sighting never aborts the remainder.
    pub fn filter(
        &self,
        batch: Vec<ProjectCandidate>,
    ) -> Result<Vec<ProjectCandidate>, StoreError> {
        let mut eligible = Vec::new();
        for candidate in batch {
            if let Some(keyword) = self.matched_keyword(&candidate) {
                tracing::info!(
                    target: "intake",
                    title = %candidate.title,
                    keyword,
                    "excluded by keyword filter"
                );
                continue;
            }
            if self.store.has_skipped(&candidate.title) {
                continue;
            }
            if self.store.has_submitted(&candidate.title) {
                // Write-once annotation; the store declines it for any title
                // that already carries a terminal outcome.
                self.store.record_skipped(SkippedBid::from_candidate(
                    &candidate,
                    SkipReason::AlreadyBidPrevious,
                ))?;
                continue;
            }
            eligible.push(candidate);
        }
        Ok(eligible)
    }

    fn matched_keyword(&self, candidate: &ProjectCandidate) -> Option<&str> {
        let title = candidate.title.to_lowercase();
        let skills: Vec<String> = candidate
            .skills
            .iter()
            .map(|skill| skill.to_lowercase())
            .collect();
        self.keywords
            .iter()
            .find(|keyword| {
                title.contains(keyword.as_str())
                    || skills.iter().any(|skill| skill.contains(keyword.as_str()))
            })
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        config::IntakeConfig,
        domain::{BidDuration, SubmittedBid},
        infrastructure::directories::ResolvedPaths,
    };

    fn candidate(title: &str, skills: &[&str]) -> ProjectCandidate {
        ProjectCandidate {
            title: title.to_string(),
            link: format!("https://example.com/p/{}", title.replace(' ', "-")),
            budget: "$500-800".into(),
            description: "short".into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn filter_with_store() -> (tempfile::TempDir, Arc<BidStateStore>, IntakeFilter) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ResolvedPaths {
            logs_dir: dir.path().join("logs"),
            data_dir: dir.path().to_path_buf(),
            submitted_path: dir.path().join("submitted_bids.json"),
            skipped_path: dir.path().join("skipped_bids.json"),
        };
        let store = Arc::new(BidStateStore::open(&paths).unwrap());
        let config = IntakeConfig {
            exclude_keywords: vec!["wordpress".into(), "shopify".into()],
        };
        let filter = IntakeFilter::new(&config, store.clone());
        (dir, store, filter)
    }

    #[test]
    fn keyword_exclusion_writes_nothing() {
        let (_dir, store, filter) = filter_with_store();
        let batch = vec![
            candidate("Fix my WordPress site", &[]),
            candidate("Shop redesign", &["Shopify", "CSS"]),
            candidate("Build a CRM dashboard", &["React", "Node.js"]),
        ];

        let eligible = filter.filter(batch).unwrap();
        let titles: Vec<_> = eligible.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Build a CRM dashboard"]);
        assert!(!store.contains("Fix my WordPress site"));
        assert!(!store.contains("Shop redesign"));
    }

    #[test]
    fn skipped_titles_drop_silently() {
        let (_dir, store, filter) = filter_with_store();
        let seen = candidate("Restricted one", &[]);
        store
            .record_skipped(SkippedBid::from_candidate(
                &seen,
                SkipReason::RestrictedProject,
            ))
            .unwrap();

        let eligible = filter.filter(vec![seen]).unwrap();
        assert!(eligible.is_empty());
        assert!(store.has_skipped("Restricted one"));
        assert!(!store.has_submitted("Restricted one"));
    }

    #[test]
    fn submitted_titles_drop_without_new_records() {
        let (_dir, store, filter) = filter_with_store();
        store
            .record_submitted(SubmittedBid {
                title: "Build a CRM dashboard".into(),
                budget: "$500-800".into(),
                description: "short".into(),
                full_description: "long".into(),
                proposal: "Hello,".into(),
                min_budget: 500,
                duration: BidDuration::Days(5),
                link: "https://example.com/p/crm".into(),
                submitted_at: Utc::now(),
            })
            .unwrap();

        let eligible = filter
            .filter(vec![candidate("Build a CRM dashboard", &["React"])])
            .unwrap();
        assert!(eligible.is_empty());
        // The duplicate sighting must not demote the submitted record.
        assert!(!store.has_skipped("Build a CRM dashboard"));
        assert!(store.has_submitted("Build a CRM dashboard"));
    }

    #[test]
    fn a_duplicate_never_aborts_the_batch() {
        let (_dir, store, filter) = filter_with_store();
        let first = candidate("Already skipped", &[]);
        store
            .record_skipped(SkippedBid::from_candidate(
                &first,
                SkipReason::SubmitFailed,
            ))
            .unwrap();

        let eligible = filter
            .filter(vec![first, candidate("Fresh project", &[])])
            .unwrap();
        let titles: Vec<_> = eligible.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Fresh project"]);
    }

    #[test]
    fn keyword_match_is_case_insensitive_over_skills() {
        let (_dir, _store, filter) = filter_with_store();
        let eligible = filter
            .filter(vec![candidate("Storefront tweaks", &["SHOPIFY Plus"])])
            .unwrap();
        assert!(eligible.is_empty());
    }
}
