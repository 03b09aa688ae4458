use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One project listing as seen during a discovery pass. The title is the
/// only identity the marketplace gives us that survives across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCandidate {
    pub title: String,
    pub link: String,
    pub budget: String,
    pub description: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum BidDuration {
    Days(u32),
    Hours(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedBid {
    pub title: String,
    pub budget: String,
    pub description: String,
    pub full_description: String,
    pub proposal: String,
    pub min_budget: u32,
    pub duration: BidDuration,
    pub link: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyBidPrevious,
    RestrictedProject,
    SubmitFailed,
    UnhandledError,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SkipReason::AlreadyBidPrevious => "already bid previously",
            SkipReason::RestrictedProject => "bidding restricted on this project",
            SkipReason::SubmitFailed => "could not place bid",
            SkipReason::UnhandledError => "unhandled error during processing",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedBid {
    pub title: String,
    pub link: String,
    pub budget: String,
    pub reason: SkipReason,
    pub description: String,
    pub skills: Vec<String>,
    pub skipped_at: DateTime<Utc>,
}

impl SkippedBid {
    pub fn from_candidate(candidate: &ProjectCandidate, reason: SkipReason) -> Self {
        Self {
            title: candidate.title.clone(),
            link: candidate.link.clone(),
            budget: candidate.budget.clone(),
            reason,
            description: candidate.description.clone(),
            skills: candidate.skills.clone(),
            skipped_at: Utc::now(),
        }
    }
}

/// Terminal classification of one processed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidOutcome {
    Submitted,
    Skipped(SkipReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_serializes_tagged() {
        let json = serde_json::to_value(BidDuration::Days(5)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "days", "value": 5}));
        let json = serde_json::to_value(BidDuration::Hours(50)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "hours", "value": 50}));
    }

    #[test]
    fn skip_reason_round_trips_snake_case() {
        let json = serde_json::to_string(&SkipReason::AlreadyBidPrevious).unwrap();
        assert_eq!(json, "\"already_bid_previous\"");
        let back: SkipReason = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SkipReason::AlreadyBidPrevious);
    }
}
