pub mod intake;
pub mod processor;
pub mod session;

pub use intake::IntakeFilter;
pub use processor::BidProcessor;
pub use session::{PollPolicy, SessionLoop};
