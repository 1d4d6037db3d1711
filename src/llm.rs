use crate::config::Provider;
use crate::providers::chatgpt::ChatGptClient;
use crate::providers::gemini::GeminiClient;
use anyhow::Result;
use reqwest::blocking::Client;

/// Sends one prompt and returns the completion as ordered text fragments.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<Vec<String>>;
}

/// Builds the generator for the provider picked at runtime.
pub trait GeneratorFactory {
    fn build(
        &self,
        provider: Provider,
        api_key: &str,
        model: Option<&str>,
    ) -> Result<Box<dyn TextGenerator>>;
}

pub struct HttpGeneratorFactory {
    client: Client,
}

impl HttpGeneratorFactory {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpGeneratorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorFactory for HttpGeneratorFactory {
    fn build(
        &self,
        provider: Provider,
        api_key: &str,
        model: Option<&str>,
    ) -> Result<Box<dyn TextGenerator>> {
        let generator: Box<dyn TextGenerator> = match provider {
            Provider::Gemini => {
                let mut client = GeminiClient::new(self.client.clone(), api_key)?;
                if let Some(model) = model {
                    client = client.with_model(model);
                }
                Box::new(client)
            }
            Provider::ChatGpt => {
                let mut client = ChatGptClient::new(self.client.clone(), api_key)?;
                if let Some(model) = model {
                    client = client.with_model(model);
                }
                Box::new(client)
            }
        };
        Ok(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenError;

    #[test]
    fn blank_key_fails_before_any_request() {
        let factory = HttpGeneratorFactory::new();
        for provider in [Provider::Gemini, Provider::ChatGpt] {
            let err = factory.build(provider, "  ", None).err().unwrap();
            assert!(
                matches!(
                    err.downcast_ref::<GenError>(),
                    Some(GenError::ProviderClient { .. })
                ),
                "unexpected error for {}: {err:#}",
                provider.as_str()
            );
        }
    }

    #[test]
    fn builds_both_providers_with_a_key() {
        let factory = HttpGeneratorFactory::new();
        assert!(factory.build(Provider::Gemini, "key", None).is_ok());
        assert!(factory
            .build(Provider::ChatGpt, "key", Some("gpt-4o-mini"))
            .is_ok());
    }
}
