use std::{env, time::Duration};

use super::env::{
    AppConfig, ConfigError, CredentialConfig, DirectoryConfig, IntakeConfig, LoggingConfig,
    OpenRouterConfig, PollConfig, WebDriverConfig,
};

const DEFAULT_SEARCH_URL: &str =
    "https://www.freelancer.com/search/projects?projectLanguages=en";
const DEFAULT_EXCLUDE_KEYWORDS: &[&str] =
    &["wordpress", "woocommerce", "template", "shopify", "wix"];

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let credentials = CredentialConfig {
            email: env::var("FREELANCER_EMAIL")
                .map_err(|_| ConfigError::Missing("FREELANCER_EMAIL"))?,
            password: env::var("FREELANCER_PASSWORD")
                .map_err(|_| ConfigError::Missing("FREELANCER_PASSWORD"))?,
        };

        let openrouter = OpenRouterConfig {
            api_key: env::var("OPENROUTER_API_KEY").ok().filter(|v| !v.is_empty()),
            model: env::var("OPENROUTER_MODEL")
                .unwrap_or_else(|_| "deepseek/deepseek-chat-v3.1:free".to_string()),
            request_timeout: millis("OPENROUTER_TIMEOUT_MS", 30_000),
        };

        let webdriver = WebDriverConfig {
            server_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".to_string()),
            search_url: env::var("SEARCH_URL").unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string()),
            page_timeout: millis("PAGE_TIMEOUT_MS", 10_000),
        };

        let intake = IntakeConfig {
            exclude_keywords: env::var("EXCLUDE_KEYWORDS")
                .map(|value| {
                    value
                        .split(',')
                        .map(|part| part.trim().to_lowercase())
                        .filter(|part| !part.is_empty())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_else(|_| {
                    DEFAULT_EXCLUDE_KEYWORDS
                        .iter()
                        .map(|kw| kw.to_string())
                        .collect()
                }),
        };

        let poll = PollConfig {
            interval: millis("POLL_INTERVAL_MS", 1_000),
            max_backoff: millis("POLL_MAX_BACKOFF_MS", 30_000),
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            submitted_filename: env::var("SUBMITTED_FILE")
                .unwrap_or_else(|_| "submitted_bids.json".to_string()),
            skipped_filename: env::var("SKIPPED_FILE")
                .unwrap_or_else(|_| "skipped_bids.json".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            credentials,
            openrouter,
            webdriver,
            intake,
            poll,
            directories,
            logging,
        })
    }
}

fn millis(key: &str, default: u64) -> Duration {
    Duration::from_millis(
        env::var(key)
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(default),
    )
}
