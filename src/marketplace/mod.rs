pub mod driver;
pub mod freelancer;
pub mod webdriver;

pub use driver::{DriverError, FormFields, MarketplaceDriver};
pub use freelancer::FreelancerDriver;
