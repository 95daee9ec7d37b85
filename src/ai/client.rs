//! OpenAI-compatible model client
//!
//! Posts to `{base_url}/chat/completions` and reads a JSON object with
//! `filename`, `confidence` and `reasoning` out of the reply. Works against
//! OpenAI itself and local servers such as Ollama or LM Studio; the bearer
//! token is only sent when an API key is configured.

use super::prompts::{build_rename_prompt, build_second_pass_prompt, RENAME_SYSTEM_PROMPT};
use super::utils::extract_json_object;
use super::{SuggestionError, SuggestionService};
use crate::config::LlmConfig;
use crate::models::{Confidence, ExtractedContent, Suggestion};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 300;

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: Message,
}

#[derive(Deserialize, Debug)]
struct Message {
    content: Option<String>,
}

/// Shape the model is asked to reply with
#[derive(Deserialize, Debug)]
struct RawSuggestion {
    #[serde(default, alias = "name", alias = "new_name")]
    filename: String,
    #[serde(default)]
    confidence: String,
    #[serde(default)]
    reasoning: String,
}

/// Filename suggester backed by a chat completions endpoint
pub struct LlmSuggester {
    client: Client,
    config: LlmConfig,
}

impl LlmSuggester {
    /// Build a suggester with its own pooled HTTP client
    ///
    /// Per-call time limits are enforced by the orchestrator; the client
    /// only bounds connection setup.
    pub fn new(config: LlmConfig) -> Result<Self, SuggestionError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| SuggestionError::Network(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            model = %config.model,
            base_url = %config.base_url,
            has_api_key = config.api_key.is_some(),
            "[LlmSuggester] Initialized"
        );

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// One chat round trip, returning the assistant text
    async fn chat(&self, user_prompt: &str) -> Result<String, SuggestionError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": RENAME_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": self.config.temperature,
        });

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "[LlmSuggester] API error");
            return Err(map_status(status, &text));
        }

        let response_text = response.text().await.map_err(map_transport_error)?;
        parse_chat_response(&response_text)
    }
}

#[async_trait]
impl SuggestionService for LlmSuggester {
    async fn suggest(
        &self,
        original_name: &str,
        content: &ExtractedContent,
    ) -> Result<Suggestion, SuggestionError> {
        if content.text.trim().is_empty() {
            return Err(SuggestionError::EmptyContent);
        }

        let reply = self.chat(&build_rename_prompt(original_name, content)).await?;
        let first = parse_suggestion(&reply)?;

        tracing::debug!(
            file = %original_name,
            filename = %first.filename,
            confidence = %first.confidence,
            "[LlmSuggester] First pass"
        );

        if first.confidence != Confidence::Low || !self.config.second_pass {
            return Ok(first);
        }

        // Low confidence: one focused look at the first pages
        let second = self
            .chat(&build_second_pass_prompt(original_name, content))
            .await
            .and_then(|reply| parse_suggestion(&reply));

        match second {
            Ok(suggestion) => {
                tracing::debug!(
                    file = %original_name,
                    filename = %suggestion.filename,
                    confidence = %suggestion.confidence,
                    "[LlmSuggester] Second pass"
                );
                Ok(suggestion)
            }
            Err(e) => {
                tracing::warn!(
                    file = %original_name,
                    error = %e,
                    "[LlmSuggester] Second pass failed, keeping first answer"
                );
                Ok(first)
            }
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> SuggestionError {
    if e.is_timeout() {
        SuggestionError::Timeout
    } else if e.is_decode() {
        SuggestionError::Malformed(e.to_string())
    } else {
        SuggestionError::Network(e.to_string())
    }
}

fn map_status(status: StatusCode, body: &str) -> SuggestionError {
    let message: String = body.chars().take(MAX_ERROR_BODY).collect();
    if status == StatusCode::TOO_MANY_REQUESTS {
        SuggestionError::RateLimited(message)
    } else {
        SuggestionError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Pull the assistant text out of a chat completions body
fn parse_chat_response(body: &str) -> Result<String, SuggestionError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| SuggestionError::Malformed(format!("invalid response body: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(SuggestionError::Malformed("empty content".to_string()));
    }
    Ok(content)
}

/// Turn the assistant text into a `Suggestion`
pub fn parse_suggestion(reply: &str) -> Result<Suggestion, SuggestionError> {
    let json = extract_json_object(reply)
        .ok_or_else(|| SuggestionError::Malformed("no JSON object in reply".to_string()))?;

    let raw: RawSuggestion = serde_json::from_str(json)
        .map_err(|e| SuggestionError::Malformed(format!("invalid suggestion JSON: {}", e)))?;

    let filename = raw.filename.trim().to_string();
    if filename.is_empty() {
        return Err(SuggestionError::InvalidFilename(raw.filename));
    }

    Ok(Suggestion {
        filename,
        confidence: Confidence::parse(&raw.confidence),
        reasoning: raw.reasoning.trim().to_string(),
    })
}
