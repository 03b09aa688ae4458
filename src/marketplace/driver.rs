use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BidDuration, ProjectCandidate};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("webdriver request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webdriver protocol error: {0}")]
    Protocol(String),
    #[error("timed out waiting for `{selector}`")]
    Timeout { selector: String },
    #[error("marketplace login failed: {0}")]
    Login(String),
}

/// Which bid-form inputs the project detail page exposes. A listing that
/// hides any of the required inputs is closed to bidding for this account.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormFields {
    pub has_amount: bool,
    pub has_days_period: bool,
    pub has_hours_period: bool,
    pub has_description: bool,
}

/// The one interactive browser session, behind a narrow seam so the
/// orchestration core can be exercised against a fake.
#[async_trait]
pub trait MarketplaceDriver: Send + Sync {
    async fn login(&self) -> Result<(), DriverError>;

    /// One discovery pass over the search listing, in page order.
    async fn list_candidates(&self) -> Result<Vec<ProjectCandidate>, DriverError>;

    async fn fetch_full_description(&self, link: &str) -> Result<String, DriverError>;

    async fn form_fields_present(&self, link: &str) -> Result<FormFields, DriverError>;

    async fn submit_bid(
        &self,
        link: &str,
        amount: u32,
        duration: BidDuration,
        proposal: &str,
    ) -> Result<(), DriverError>;
}
