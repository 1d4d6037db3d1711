use crate::error::GenError;
use crate::llm::TextGenerator;
use crate::providers::http_errors::{provider_request_error, provider_status_error};
use crate::providers::require_api_key;
use anyhow::Result;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "gemini-pro";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

/// Non-text parts (inline data, function calls) carry no `text`.
#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Gemini `generateContent` over the REST API.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: Client, api_key: &str) -> Result<Self, GenError> {
        Ok(Self {
            http,
            api_key: require_api_key(PROVIDER, api_key)?,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<Vec<String>> {
        let api_url = self.endpoint();
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };
        debug!(
            api_url = %api_url,
            model = %self.model,
            prompt_len = prompt.len(),
            "sending gemini generateContent request"
        );

        let response = self
            .http
            .post(&api_url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|err| {
                warn!(api_url = %api_url, error = %err, "gemini request failed");
                provider_request_error(PROVIDER, err, &api_url)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let response_body = response
                .text()
                .unwrap_or_else(|_| "<failed to read response body>".to_string());
            warn!(
                api_url = %api_url,
                status = %status,
                response_body_len = response_body.len(),
                "gemini returned non-success status"
            );
            return Err(provider_status_error(PROVIDER, status, &response_body).into());
        }

        let parsed: GenerateContentResponse = response.json().map_err(|err| {
            GenError::request(PROVIDER, format!("failed to parse response JSON: {err}"))
        })?;
        debug!(
            candidates = parsed.candidates.len(),
            "received gemini response"
        );
        Ok(extract_fragments(parsed)?)
    }
}

/// Text parts of the first candidate that has content, in order.
fn extract_fragments(response: GenerateContentResponse) -> Result<Vec<String>, GenError> {
    let block_reason = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason);

    let content = response
        .candidates
        .into_iter()
        .find_map(|candidate| candidate.content);

    match content {
        Some(content) => Ok(content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect()),
        None => match block_reason {
            Some(reason) => Err(GenError::request(
                PROVIDER,
                format!("prompt was blocked ({reason})"),
            )),
            None => Err(GenError::request(
                PROVIDER,
                "response contained no candidate content",
            )),
        },
    }
}
