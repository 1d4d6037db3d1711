use crate::error::GenError;
use crate::llm::TextGenerator;
use crate::providers::http_errors::{provider_request_error, provider_status_error};
use crate::providers::require_api_key;
use anyhow::Result;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const PROVIDER: &str = "chatgpt";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat completions with a single user message.
pub struct ChatGptClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ChatGptClient {
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
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl TextGenerator for ChatGptClient {
    fn generate(&self, prompt: &str) -> Result<Vec<String>> {
        let api_url = self.endpoint();
        let req = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };
        debug!(
            api_url = %api_url,
            model = %self.model,
            prompt_len = prompt.len(),
            "sending chat completion request"
        );

        let response = self
            .http
            .post(&api_url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .map_err(|err| {
                warn!(api_url = %api_url, error = %err, "chat completion request failed");
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
                "chat completion returned non-success status"
            );
            return Err(provider_status_error(PROVIDER, status, &response_body).into());
        }

        let parsed: ChatResponse = response.json().map_err(|err| {
            GenError::request(PROVIDER, format!("failed to parse response JSON: {err}"))
        })?;
        debug!(choices = parsed.choices.len(), "received chat completion");
        Ok(extract_content(parsed)?)
    }
}

fn extract_content(resp: ChatResponse) -> Result<Vec<String>, GenError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenError::request(PROVIDER, "no choices in response"))?;
    Ok(vec![choice.message.content.unwrap_or_default()])
}
