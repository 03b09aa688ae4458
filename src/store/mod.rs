mod bids;

pub use bids::{BidStateStore, StoreError};
