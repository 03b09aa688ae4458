use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::{
    config::{CredentialConfig, WebDriverConfig},
    domain::{BidDuration, ProjectCandidate},
};

use super::{
    driver::{DriverError, FormFields, MarketplaceDriver},
    webdriver::WebDriverClient,
};

const LOGIN_URL: &str = "https://www.freelancer.com/login";
const LOGIN_SETTLE: Duration = Duration::from_secs(6);
const MAX_SCROLL_ROUNDS: usize = 10;

const CARD_WAIT_SELECTOR: &str = ".ProjectCard, ul.search-result-list li";
const FULL_DESCRIPTION_SELECTOR: &str =
    "app-project-details-description .ProjectDescription fl-interactive-text .ContentWrapper span";
const AMOUNT_SELECTOR: &str = "#bidAmountInput";
const DAYS_PERIOD_SELECTOR: &str = "#periodInput";
const HOURS_PERIOD_SELECTOR: &str = "#weeklyLimitInput";
const DESCRIPTION_SELECTOR: &str = "#descriptionTextArea";
const PLACE_BID_SELECTOR: &str = "fl-button[fltrackinglabel='PlaceBidButton'] button";

/// Pulls every listing card the search page renders, in page order, covering
/// both card markups the site serves.
const EXTRACT_CANDIDATES_SCRIPT: &str = r#"
const out = [];
document.querySelectorAll('.ProjectCard').forEach((card) => {
    const titleEl = card.querySelector('.Title-text');
    const linkEl = card.closest('a');
    if (!titleEl || !linkEl) return;
    const budgetEl = card.querySelector('.BudgetUpgradeWrapper-budget .text-foreground');
    const descEl = card.querySelector('p[data-margin-bottom]');
    const skills = Array.from(card.querySelectorAll('.SkillsWrapper .Content'))
        .map((s) => s.textContent.trim())
        .filter(Boolean);
    out.push({
        title: titleEl.textContent.trim(),
        link: linkEl.href,
        budget: budgetEl ? budgetEl.textContent.trim() : 'N/A',
        description: descEl ? descEl.innerText.split('\n')[0].trim() : '',
        skills,
    });
});
document.querySelectorAll('ul.search-result-list li').forEach((card) => {
    const titleEl = card.querySelector('.info-card-title a');
    if (!titleEl) return;
    const budgetEl = card.querySelector('.info-card-price span');
    const descEl = card.querySelector('.info-card-description');
    const skills = Array.from(card.querySelectorAll('.info-card-skills span'))
        .map((s) => s.textContent.trim())
        .filter(Boolean);
    out.push({
        title: titleEl.textContent.trim(),
        link: titleEl.href,
        budget: budgetEl ? budgetEl.textContent.trim() : 'N/A',
        description: descEl ? descEl.textContent.trim() : '',
        skills,
    });
});
return out;
"#;

const CLICK_LOGIN_BUTTON_SCRIPT: &str = r#"
const buttons = document.querySelectorAll('button');
for (const button of buttons) {
    if (button.textContent.trim().toLowerCase().includes('log in')) {
        button.click();
        return true;
    }
}
return false;
"#;

/// Fills an input through the DOM so the site's framework sees the change.
const FILL_INPUT_SCRIPT: &str = r#"
const input = arguments[0];
input.value = arguments[1];
input.dispatchEvent(new Event('input', { bubbles: true }));
input.dispatchEvent(new Event('change', { bubbles: true }));
"#;

const SCROLL_TO_BOTTOM_SCRIPT: &str =
    "window.scrollTo(0, document.body.scrollHeight); return document.body.scrollHeight;";

pub struct FreelancerDriver {
    client: WebDriverClient,
    config: WebDriverConfig,
    credentials: CredentialConfig,
    current_page: Mutex<Option<String>>,
}

impl FreelancerDriver {
    pub async fn connect(
        http: Client,
        config: WebDriverConfig,
        credentials: CredentialConfig,
    ) -> Result<Self, DriverError> {
        let client = WebDriverClient::connect(http, &config.server_url).await?;
        Ok(Self {
            client,
            config,
            credentials,
            current_page: Mutex::new(None),
        })
    }

    /// Navigates only when the session is not already on the page. Every
    /// driver operation takes the project link, but within one candidate the
    /// fetch/validate/submit calls all land on the same detail page.
    async fn ensure_page(&self, link: &str) -> Result<(), DriverError> {
        {
            let current = self.current_page.lock();
            if current.as_deref() == Some(link) {
                return Ok(());
            }
        }
        self.client.goto(link).await?;
        *self.current_page.lock() = Some(link.to_string());
        Ok(())
    }

    async fn scroll_to_end(&self) -> Result<(), DriverError> {
        let mut last_height = i64::MIN;
        for _ in 0..MAX_SCROLL_ROUNDS {
            let height = self
                .client
                .execute(SCROLL_TO_BOTTOM_SCRIPT, vec![])
                .await?
                .as_i64()
                .unwrap_or(0);
            if height == last_height {
                break;
            }
            last_height = height;
            sleep(Duration::from_millis(500)).await;
        }
        Ok(())
    }

    async fn fill_via_script(&self, element: &str, value: Value) -> Result<(), DriverError> {
        self.client
            .execute(
                FILL_INPUT_SCRIPT,
                vec![WebDriverClient::element_arg(element), value],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MarketplaceDriver for FreelancerDriver {
    async fn login(&self) -> Result<(), DriverError> {
        self.client.goto(LOGIN_URL).await?;

        let email_input = self
            .client
            .wait_for("#emailOrUsernameInput", self.config.page_timeout)
            .await?
            .ok_or_else(|| DriverError::Login("email input not found".into()))?;
        let password_input = self
            .client
            .find("#passwordInput")
            .await?
            .ok_or_else(|| DriverError::Login("password input not found".into()))?;

        self.client
            .send_keys(&email_input, &self.credentials.email)
            .await?;
        self.client
            .send_keys(&password_input, &self.credentials.password)
            .await?;

        let clicked = self
            .client
            .execute(CLICK_LOGIN_BUTTON_SCRIPT, vec![])
            .await?
            .as_bool()
            .unwrap_or(false);
        if !clicked {
            return Err(DriverError::Login("login button not found".into()));
        }

        sleep(LOGIN_SETTLE).await;
        tracing::info!(target: "marketplace", "logged in to the marketplace");
        Ok(())
    }

    async fn list_candidates(&self) -> Result<Vec<ProjectCandidate>, DriverError> {
        self.client.goto(&self.config.search_url).await?;
        *self.current_page.lock() = Some(self.config.search_url.clone());

        let cards = self
            .client
            .wait_for(CARD_WAIT_SELECTOR, self.config.page_timeout)
            .await?;
        if cards.is_none() {
            tracing::warn!(target: "marketplace", "no project cards rendered on the search page");
            return Ok(Vec::new());
        }

        self.scroll_to_end().await?;

        let raw = self.client.execute(EXTRACT_CANDIDATES_SCRIPT, vec![]).await?;
        let candidates: Vec<ProjectCandidate> = serde_json::from_value(raw)
            .map_err(|err| DriverError::Protocol(format!("malformed listing payload: {err}")))?;
        Ok(candidates
            .into_iter()
            .filter(|candidate| !candidate.title.trim().is_empty())
            .collect())
    }

    async fn fetch_full_description(&self, link: &str) -> Result<String, DriverError> {
        self.ensure_page(link).await?;
        let element = self
            .client
            .wait_for(FULL_DESCRIPTION_SELECTOR, self.config.page_timeout)
            .await?
            .ok_or_else(|| DriverError::Timeout {
                selector: FULL_DESCRIPTION_SELECTOR.into(),
            })?;
        let text = self.client.text(&element).await?;
        Ok(text.trim().to_string())
    }

    async fn form_fields_present(&self, link: &str) -> Result<FormFields, DriverError> {
        self.ensure_page(link).await?;
        let amount = self
            .client
            .wait_for(AMOUNT_SELECTOR, self.config.page_timeout)
            .await?;
        let days = self.client.find(DAYS_PERIOD_SELECTOR).await?;
        let hours = self.client.find(HOURS_PERIOD_SELECTOR).await?;
        let description = self.client.find(DESCRIPTION_SELECTOR).await?;

        Ok(FormFields {
            has_amount: amount.is_some(),
            has_days_period: days.is_some(),
            has_hours_period: hours.is_some(),
            has_description: description.is_some(),
        })
    }

    async fn submit_bid(
        &self,
        link: &str,
        amount: u32,
        duration: BidDuration,
        proposal: &str,
    ) -> Result<(), DriverError> {
        self.ensure_page(link).await?;

        let amount_input = self
            .client
            .wait_for(AMOUNT_SELECTOR, self.config.page_timeout)
            .await?
            .ok_or_else(|| DriverError::Timeout {
                selector: AMOUNT_SELECTOR.into(),
            })?;
        self.fill_via_script(&amount_input, json!(amount)).await?;

        let (period_selector, period_value) = match duration {
            BidDuration::Days(days) => (DAYS_PERIOD_SELECTOR, days),
            BidDuration::Hours(hours) => (HOURS_PERIOD_SELECTOR, hours),
        };
        let period_input =
            self.client
                .find(period_selector)
                .await?
                .ok_or_else(|| DriverError::Timeout {
                    selector: period_selector.into(),
                })?;
        self.client.clear(&period_input).await?;
        self.client
            .send_keys(&period_input, &period_value.to_string())
            .await?;

        let proposal_input =
            self.client
                .find(DESCRIPTION_SELECTOR)
                .await?
                .ok_or_else(|| DriverError::Timeout {
                    selector: DESCRIPTION_SELECTOR.into(),
                })?;
        self.client.clear(&proposal_input).await?;
        self.client.send_keys(&proposal_input, proposal).await?;

        // The button only mounts once the form validates client-side.
        let place_bid = self
            .client
            .wait_for(PLACE_BID_SELECTOR, self.config.page_timeout)
            .await?
            .ok_or_else(|| DriverError::Timeout {
                selector: PLACE_BID_SELECTOR.into(),
            })?;
        self.client.click(&place_bid).await?;
        Ok(())
    }
}
