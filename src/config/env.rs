use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: CredentialConfig,
    pub openrouter: OpenRouterConfig,
    pub webdriver: WebDriverConfig,
    pub intake: IntakeConfig,
    pub poll: PollConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct CredentialConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub server_url: String,
    pub search_url: String,
    pub page_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub exclude_keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub submitted_filename: String,
    pub skipped_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
}
