use crate::constants::*;
use crate::specs::gemini::*;
use crate::types::{JarvisError, Result};
use async_trait::async_trait;

/// Text-in, text-out generation backend. The dispatch loop only ever calls `generate`.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into().trim().to_string(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    pub fn build_request(prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(GEMINI_MAX_OUTPUT_TOKENS),
                temperature: Some(GEMINI_TEMPERATURE),
                top_p: Some(GEMINI_TOP_P),
                top_k: Some(GEMINI_TOP_K),
            }),
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = Self::build_request(prompt);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(JarvisError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = match response.text().await {
                Ok(text) => text,
                Err(_) => "Unknown error".to_string(),
            };
            return Err(JarvisError::Upstream(status, error_body).into());
        }

        let body: GenerateContentResponse = response.json().await.map_err(JarvisError::Network)?;
        match body.text() {
            Some(text) => Ok(text),
            None => {
                let reason = body
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .or_else(|| body.candidates.first().and_then(|c| c.finish_reason.clone()))
                    .unwrap_or_else(|| "no candidates".to_string());
                Err(JarvisError::Protocol(format!("Gemini returned no text ({})", reason)).into())
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
