/// Backend gateway: the two generation calls the planner makes.
/// `GeminiGateway` talks to the Gemini `generateContent` REST endpoint;
/// tests substitute their own `Gateway` implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::PlannerConfig;
use planner_core::PlanningError;

/// Per-call generation settings
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    /// Enable the backend's web search grounding tool
    pub web_search: bool,
    /// Constrain output to this schema (JSON mode)
    pub response_schema: Option<Value>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode Gemini response: {0}")]
    Decode(String),

    #[error("no response text from Gemini")]
    EmptyResponse,
}

impl From<GatewayError> for PlanningError {
    fn from(err: GatewayError) -> Self {
        PlanningError::Transport(err.to_string())
    }
}

/// Single-shot, stateless generation calls. No retry, no streaming.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// "Propose destinations": raw text expected to hold a JSON array
    async fn request_recommendations(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GatewayError>;

    /// "Produce plan": raw markdown
    async fn request_itinerary(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GatewayError>;
}

/// Gemini generateContent request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Tool {
    pub google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
pub struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

/// Gemini generateContent response
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentRequest {
    pub fn new(prompt: &str, options: &GenerationOptions) -> Self {
        let tools = if options.web_search {
            vec![Tool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        };

        let generation_config = options.response_schema.clone().map(|schema| GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: schema,
        });

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            tools,
            generation_config,
        }
    }
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate. Search grounding can
    /// split one answer across several parts.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.trim().is_empty() { None } else { Some(text) }
    }
}

pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl GeminiGateway {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.gemini_api_key.clone(),
            api_base: config.api_base.clone(),
        }
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, GatewayError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, options.model);
        let request = GenerateContentRequest::new(prompt, options);

        tracing::debug!(
            model = %options.model,
            web_search = options.web_search,
            strict_schema = options.response_schema.is_some(),
            prompt_len = prompt.len(),
            "→ Calling Gemini"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        let text = body.text().ok_or(GatewayError::EmptyResponse)?;
        tracing::debug!(response_len = text.len(), "✓ Gemini responded");
        Ok(text)
    }
}

#[async_trait]
impl Gateway for GeminiGateway {
    async fn request_recommendations(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GatewayError> {
        self.generate(prompt, options).await
    }

    async fn request_itinerary(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GatewayError> {
        self.generate(prompt, options).await
    }
}
