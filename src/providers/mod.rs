pub mod chatgpt;
pub mod gemini;
pub(crate) mod http_errors;

use crate::error::GenError;

fn require_api_key(provider: &'static str, api_key: &str) -> Result<String, GenError> {
    let key = api_key.trim();
    if key.is_empty() {
        return Err(GenError::client(
            provider,
            format!("no API key configured; set the {provider} ApiKey in your config file"),
        ));
    }
    Ok(key.to_string())
}
