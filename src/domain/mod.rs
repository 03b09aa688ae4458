pub mod budget;
pub mod project;

pub use project::{BidDuration, BidOutcome, ProjectCandidate, SkipReason, SkippedBid, SubmittedBid};
