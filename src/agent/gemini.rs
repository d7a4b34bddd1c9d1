use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::interface::ChatModel;
use crate::config::GeminiConfig;
use crate::conversations::types::{Role, Turn};
use crate::error::{send_with_retry, ProviderError};

// Generation parameters the frontend was tuned against.
const TEMPERATURE: f64 = 1.0;
const TOP_P: f64 = 0.95;
const TOP_K: i32 = 40;
const MAX_OUTPUT_TOKENS: i32 = 8192;
const RESPONSE_MIME_TYPE: &str = "text/plain";

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        info!(
            "Initialized GeminiClient: model={}, base_url={}",
            config.model, config.base_url
        );
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }

    /// System turns become the `systemInstruction`; user/model turns map to
    /// `contents` and the instruction goes last as an extra user message.
    fn build_request<'a>(history: &'a [Turn], instruction: &'a str) -> GenerateContentRequest<'a> {
        let system_texts: Vec<&str> = history
            .iter()
            .filter(|turn| turn.role == Role::System)
            .flat_map(|turn| turn.parts.iter().map(String::as_str))
            .collect();
        let system_instruction = if system_texts.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: system_texts.into_iter().map(|text| Part { text }).collect(),
            })
        };

        let mut contents: Vec<Content> = history
            .iter()
            .filter(|turn| turn.role != Role::System)
            .map(|turn| Content {
                role: Some(match turn.role {
                    Role::Model => "model",
                    _ => "user",
                }),
                parts: turn.parts.iter().map(|text| Part { text }).collect(),
            })
            .collect();
        contents.push(Content {
            role: Some("user"),
            parts: vec![Part { text: instruction }],
        });

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                top_k: TOP_K,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: RESPONSE_MIME_TYPE,
            },
        }
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn generate(&self, history: &[Turn], instruction: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let request = Self::build_request(history, instruction);
        debug!(
            "Requesting follow-up: {} content entries",
            request.contents.len()
        );

        let response = send_with_retry(self.client.post(&url).json(&request)).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(ProviderError::from_reqwest)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));
            return Err(ProviderError::Service(message));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Transport(format!("malformed chat response: {}", e)))?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Service("chat response contained no candidates".to_string()))?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect();
        if text.is_empty() {
            return Err(ProviderError::Service(
                "chat response contained no text".to_string(),
            ));
        }
        Ok(text)
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: i32,
    max_output_tokens: i32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
