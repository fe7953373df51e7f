use crate::config::AnalyzerConfig;
use crate::types::{IntelError, Result, SourceKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SYSTEM_PROMPT: &str = r#"You triage cryptocurrency regulation intelligence. Read one social post or news article and return a JSON object with these keys:
- "priority": "P1" (urgent: regulatory policy change, major enforcement action, exchange delisting), "P2" (important: compliance guidance, industry self-regulation, significant litigation) or "P3" (general: industry news, research)
- "category": short label in Chinese, e.g. "执法行动", "监管政策", "行业动态"
- "title": headline of at most 20 characters
- "summary": summary of at most 100 characters
- "impact": one sentence on who is affected and how
- "affected_assets": array of asset tickers or project names, may be empty
- "action": recommended follow-up for a compliance team
- "rationale": why this priority was chosen
Leave a key as an empty string when unsure. Return only the JSON object."#;

/// Structured answer of an external analysis provider. Every field may be
/// blank; the classifier fills blanks from the keyword rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderAnalysis {
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub affected_assets: Vec<String>,
    #[serde(default, alias = "recommended_action")]
    pub action: Option<String>,
    #[serde(default, alias = "reasoning")]
    pub rationale: Option<String>,
}

/// An external natural-language classification service
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    fn provider_name(&self) -> String;

    /// Any error (timeout, HTTP failure, unparseable answer) means
    /// "no analysis available" to the caller.
    async fn analyze(&self, text: &str, kind: SourceKind) -> Result<ProviderAnalysis>;
}

/// OpenAI-compatible chat completions endpoint asked for a JSON object
pub struct ChatCompletionAnalyzer {
    http: Client,
    api_key: String,
    config: AnalyzerConfig,
}

impl ChatCompletionAnalyzer {
    /// `None` when no API key is configured.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        let http = Client::builder()
            .user_agent(format!("intel-aggregator/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Some(Self {
            http,
            api_key,
            config: config.clone(),
        }))
    }
}

#[async_trait]
impl AnalysisProvider for ChatCompletionAnalyzer {
    fn provider_name(&self) -> String {
        format!("chat-completion ({})", self.config.model)
    }

    async fn analyze(&self, text: &str, kind: SourceKind) -> Result<ProviderAnalysis> {
        let request = build_request(self.config.model.clone(), text, kind);
        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| IntelError::Analysis("response missing message content".to_string()))?;

        debug!("Provider answered with {} bytes", content.len());
        parse_analysis(&content)
    }
}

pub fn build_request(model: String, text: &str, kind: SourceKind) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system".into(),
                content: SYSTEM_PROMPT.into(),
            },
            ChatMessage {
                role: "user".into(),
                content: format!("[{}]\n{}", kind, text),
            },
        ],
        temperature: 0.2,
        max_tokens: 1024,
        response_format: ResponseFormat {
            r#type: "json_object".into(),
        },
    }
}

/// Parse the model's content, tolerating a surrounding markdown code fence.
pub fn parse_analysis(content: &str) -> Result<ProviderAnalysis> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body)
        .map_err(|e| IntelError::Analysis(format!("unparseable analysis: {}", e)))
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: i32,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub r#type: String,
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
