use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::client::ProposalGenerator;

pub const MAX_PROPOSAL_LENGTH: usize = 1500;

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Wraps the external generator with a deterministic, always-terminating
/// fallback. `resolve` never fails and never returns an empty or over-length
/// proposal, so the bid processor can treat proposal text as infallible.
pub struct ProposalResolver {
    generator: Arc<dyn ProposalGenerator>,
}

impl ProposalResolver {
    pub fn new(generator: Arc<dyn ProposalGenerator>) -> Self {
        Self { generator }
    }

    pub async fn resolve(&self, title: &str, full_description: &str, min_budget: u32) -> String {
        match self
            .generator
            .generate(title, full_description, min_budget)
            .await
        {
            Ok(raw) => {
                let cleaned = postprocess(&raw);
                if cleaned.is_empty() {
                    tracing::warn!(
                        target: "proposal",
                        title,
                        "generator returned an empty proposal; using fallback template"
                    );
                    fallback_proposal(title, min_budget)
                } else {
                    cleaned
                }
            }
            Err(err) => {
                tracing::warn!(
                    target: "proposal",
                    title,
                    error = %err,
                    "proposal generation failed; using fallback template"
                );
                fallback_proposal(title, min_budget)
            }
        }
    }
}

fn postprocess(raw: &str) -> String {
    let stripped = MARKUP_TAG.replace_all(raw, "");
    let trimmed = stripped.trim();
    if trimmed.chars().count() <= MAX_PROPOSAL_LENGTH {
        return trimmed.to_string();
    }
    truncate_to_sentence(trimmed)
}

/// Cuts at the length ceiling, then backs up to the last `.` so the proposal
/// never ends mid-sentence.
fn truncate_to_sentence(text: &str) -> String {
    let cut = text
        .char_indices()
        .nth(MAX_PROPOSAL_LENGTH)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());
    let window = &text[..cut];
    match window.rfind('.') {
        Some(period) => window[..=period].trim_end().to_string(),
        None => {
            let mut clipped: String = window
                .chars()
                .take(MAX_PROPOSAL_LENGTH - 1)
                .collect::<String>()
                .trim_end()
                .to_string();
            clipped.push('.');
            clipped
        }
    }
}

fn fallback_proposal(title: &str, min_budget: u32) -> String {
    let budget_text = if min_budget > 0 {
        min_budget.to_string()
    } else {
        "Negotiable".to_string()
    };
    format!(
        "Hello,\n\n\
         I am pleased to submit my bid for '{title}'. At AlphaFusion Corporation, we specialize \
         in developing intelligent and secure solutions across AI, machine learning, software \
         engineering, cybersecurity, and automation. Our teams have successfully delivered \
         enterprise-grade projects spanning fintech, defense, healthcare, smart infrastructure, \
         and cloud platforms, consistently ensuring performance, scalability, and robust \
         security.\n\n\
         Approach:\n\
         - Thoroughly analyze your project requirements to align with business objectives.\n\
         - Apply best practices and advanced technologies to execute tasks efficiently.\n\
         - Maintain proactive communication with regular updates and milestone reviews.\n\
         - Deliver a secure, scalable, and polished solution within the proposed timeline.\n\
         - Provide recommendations for next steps, implementation strategies, and risk mitigation.\n\n\
         We pride ourselves on engineering solutions that are not only technically sound but also \
         tailored to the unique needs of our clients, ensuring measurable impact and long-term \
         value. Budget: {budget_text}\n\n\
         Best regards,\nAlphaFusion Corporation"
    )
}
