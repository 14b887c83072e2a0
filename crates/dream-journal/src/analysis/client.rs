//! HTTP client for the hosted completion and image endpoints.
use tracing::{debug, info, warn};

use crate::analysis::extract::extract_json;
use crate::analysis::prompts;
use crate::analysis::types::{
    AnalysisConfig, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
    DreamAnalysisResponse, ImageFormat, ImageGenerationRequest, ImageGenerationResponse, Language,
};
use crate::error::{AnalysisError, AnalysisResult};
use crate::journal_db::schema::{now_millis, Dream, GlobalAnalysis, ThemeAnalysis};

/// Stateless request/response wrapper; one network round trip per call.
#[derive(Clone)]
pub struct AnalysisClient {
    config: AnalysisConfig,
    http_client: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(config: AnalysisConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        info!(
            "Analysis client initialized: {} (model {}, language {})",
            config.base_url, config.chat_model, config.language
        );
        Self {
            http_client: builder.build().unwrap_or_default(),
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn language(&self) -> Language {
        self.config.language
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn api_key(&self) -> AnalysisResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AnalysisError::MissingApiKey)
    }

    /// Structured interpretation of one dream text.
    pub async fn analyze_dream(&self, dream: &str) -> AnalysisResult<DreamAnalysisResponse> {
        let prompt = prompts::dream_prompt(self.config.language, dream);
        let content = self.complete(prompt).await?;
        let response: DreamAnalysisResponse = extract_json(&content)?;
        debug!(
            "Dream analyzed: '{}' ({} aspects)",
            response.title,
            response.interpretations.len()
        );
        Ok(response)
    }

    /// Meaning of a theme; the result is keyed by the lower-cased request theme.
    pub async fn analyze_theme(&self, theme: &str) -> AnalysisResult<ThemeAnalysis> {
        let prompt = prompts::theme_prompt(self.config.language, theme);
        let content = self.complete(prompt).await?;
        let analysis: ThemeAnalysis = extract_json(&content)?;
        Ok(ThemeAnalysis {
            theme: ThemeAnalysis::normalize_key(theme),
            timestamp: now_millis(),
            ..analysis
        })
    }

    /// Cross-dream analysis over the most recent dreams with content.
    pub async fn analyze_global_dreams(&self, dreams: &[Dream]) -> AnalysisResult<GlobalAnalysis> {
        let recent = prompts::select_recent_dreams(dreams);
        info!("Running global analysis over {} dreams", recent.len());
        let prompt = prompts::global_prompt(self.config.language, &recent);
        let content = self.complete(prompt).await?;
        let analysis: GlobalAnalysis = extract_json(&content)?;
        Ok(GlobalAnalysis {
            timestamp: now_millis(),
            ..analysis
        })
    }

    /// Image reference for a prompt: a URL or a `data:` URI depending on configuration.
    pub async fn generate_image(&self, prompt: &str) -> AnalysisResult<String> {
        let api_key = self.api_key()?;
        let request = ImageGenerationRequest {
            model: &self.config.image_model,
            prompt,
            n: 1,
            size: &self.config.image_size,
            quality: &self.config.image_quality,
            style: &self.config.image_style,
            response_format: self.config.image_format.as_str(),
        };

        let response = self
            .http_client
            .post(self.endpoint("images/generations"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Image(format!("request failed: {}", e)))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Image endpoint returned {}", status);
            return Err(AnalysisError::Image(format!("endpoint returned {}: {}", status, body)));
        }

        let generated: ImageGenerationResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Image(format!("invalid response body: {}", e)))?;
        let image = generated
            .data
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::Image("response contained no image".into()))?;

        match self.config.image_format {
            ImageFormat::B64Json => image
                .b64_json
                .map(|b64| format!("data:image/png;base64,{}", b64)),
            ImageFormat::Url => image.url,
        }
        .ok_or_else(|| {
            AnalysisError::Image(format!(
                "response is missing the {} field",
                self.config.image_format.as_str()
            ))
        })
    }

    /// One chat completion; returns the raw message text.
    async fn complete(&self, prompt: String) -> AnalysisResult<String> {
        let api_key = self.api_key()?;
        let request = ChatCompletionRequest {
            model: &self.config.chat_model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: self.config.temperature,
        };

        let response = self
            .http_client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Request(format!("completion request failed: {}", e)))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Request(format!(
                "completion endpoint returned {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Parse(format!("invalid completion body: {}", e)))?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AnalysisError::Parse("completion contained no message content".into()))
    }
}
