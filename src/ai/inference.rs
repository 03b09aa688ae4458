use anyhow::{Context, Result};
use reqwest::Response;
use serde::{Deserialize, Serialize};

pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are an experienced corporate proposal writer representing \
**AlphaFusion Corporation**, a leader in AI, software engineering, automation, and cybersecurity.";

const COMPANY_PROFILE: &str = r#"AlphaFusion Corporation is a next-generation technology company that bridges the power of Artificial Intelligence, Machine Learning, and Advanced Software Engineering to build intelligent solutions for the modern world. Our expertise spans finance, cybersecurity, automation, data analytics, cloud infrastructure, and full-stack development, empowering global businesses to innovate, scale, and lead with confidence.

Core Domains:
1) AI & ML: predictive modeling, NLP, computer vision, recommendation systems, autonomous decision engines.
2) Software & Web Development: full-stack apps, APIs, enterprise-grade platforms (React, Next.js, Node.js, Python, etc.).
3) Fintech & Data Analytics: advanced trading dashboards, AI-powered market forecasting, global data visualization.
4) Cybersecurity: Zero Trust architectures, threat detection, encryption, AI-driven security automation.
5) Automation & Cloud: scalable cloud deployments (AWS, Azure, GCP), Kubernetes, DevOps, intelligent process automation.

Why Work With Us:
- Cross-disciplinary expertise across AI, enterprise platforms, and cloud systems.
- Custom-built solutions tailored to every business.
- End-to-end delivery from concept to deployment.
- Trusted by clients worldwide across finance, defense, healthcare, retail, and smart infrastructure."#;

pub fn build_request(model: String, title: &str, description: &str, budget: u32) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system".into(),
                content: SYSTEM_PROMPT.into(),
            },
            ChatMessage {
                role: "user".into(),
                content: build_prompt(title, description, budget),
            },
        ],
        temperature: 0.7,
        max_tokens: 700,
    }
}

fn build_prompt(title: &str, description: &str, budget: u32) -> String {
    let budget_text = if budget > 0 {
        budget.to_string()
    } else {
        "Not specified".to_string()
    };
    format!(
        "Write a professional, institution-grade proposal for the following project:\n\n\
         Title: {title}\n\
         Description: {description}\n\
         Budget: {budget_text}\n\n\
         Use this company profile for context:\n{COMPANY_PROFILE}\n\n\
         Follow these rules strictly:\n\
         - Keep total length smaller than 1500 characters.\n\
         - Start with a short greeting: 'Hello,' (no client name).\n\
         - Maintain a confident, objective tone with no unnecessary gratitude \
           (avoid phrases like \"thank you for considering\").\n\
         - Summarize AlphaFusion's relevant expertise and credibility clearly.\n\
         - Include an **Approach** section in bullet points (4-5 points max).\n\
         - Mention budget/timeline only if relevant, but never state or promise any hard deadlines.\n\
         - End with a clear call-to-action (discussion, call, or demo).\n\
         - Close with:\n  Best regards,\n  AlphaFusion Corporation\n\
         - Return only the final polished proposal text without extra commentary.\n\
         - Do NOT include any special tokens such as <begin_of_sentence> or similar markers.\n\
         Return plain text only."
    )
}

pub async fn parse_response(response: Response) -> Result<String> {
    let completion: ChatCompletionResponse = response.json().await?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .context("completion response did not contain any choices")?;

    choice
        .message
        .and_then(|msg| msg.content)
        .context("completion response missing message content")
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: i32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: Option<ChatCompletionMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionMessage {
    pub content: Option<String>,
}
