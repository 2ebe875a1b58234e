use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::prompt::build_prompt;
use super::response::normalize_body;
use super::Completer;
use crate::config::{Config, GenerationParameters};
use crate::error::{ChatError, Result};

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

/// Hosted text-generation client with a single fallback model.
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    primary_url: String,
    fallback_url: String,
    parameters: GenerationParameters,
}

impl InferenceClient {
    pub fn new(primary_url: &str, fallback_url: &str) -> Self {
        Self {
            client: Client::new(),
            primary_url: primary_url.to_string(),
            fallback_url: fallback_url.to_string(),
            parameters: GenerationParameters::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.primary_endpoint(), &config.fallback_endpoint())
            .with_parameters(config.generation_parameters())
    }

    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn primary_url(&self) -> &str {
        &self.primary_url
    }

    pub fn fallback_url(&self) -> &str {
        &self.fallback_url
    }

    /// Send `prompt` to the primary model, then once to the fallback if the
    /// primary answers with a non-success status.
    pub async fn query(&self, credential: &str, prompt: &str) -> Result<String> {
        let request = GenerationRequest {
            inputs: prompt,
            parameters: self.parameters,
        };

        tracing::debug!(url = %self.primary_url, prompt_chars = prompt.chars().count(), "querying primary model");
        let response = self.post(&self.primary_url, credential, &request).await?;

        let response = if response.status().is_success() {
            response
        } else {
            tracing::info!(
                status = %response.status(),
                fallback = %self.fallback_url,
                "primary model failed, trying fallback"
            );
            let fallback = self.post(&self.fallback_url, credential, &request).await?;
            if !fallback.status().is_success() {
                let status = fallback.status();
                tracing::warn!(%status, "fallback model failed");
                return Err(ChatError::from_status(status));
            }
            fallback
        };

        let body = response.text().await?;
        normalize_body(&body)
    }

    async fn post(
        &self,
        url: &str,
        credential: &str,
        request: &GenerationRequest<'_>,
    ) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", credential))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl Completer for InferenceClient {
    async fn complete(
        &self,
        credential: Option<&str>,
        user_input: &str,
        context: Option<&str>,
    ) -> Result<String> {
        let credential = credential
            .filter(|c| !c.is_empty())
            .ok_or(ChatError::MissingCredential)?;
        let prompt = build_prompt(user_input, context);
        self.query(credential, &prompt).await
    }
}
