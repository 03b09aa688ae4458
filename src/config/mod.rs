pub mod env;
mod loader;

pub use env::{
    AppConfig, ConfigError, CredentialConfig, DirectoryConfig, IntakeConfig, OpenRouterConfig,
    PollConfig, WebDriverConfig,
};
pub use loader::load_config;
