//! Wire shapes for the completion and image endpoints, plus client settings.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::journal_db::schema::{DreamAnalysis, Explanation, Interpretation};

/// Prompt language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fr" | "french" | "français" => Ok(Language::Fr),
            "en" | "english" => Ok(Language::En),
            other => Err(format!("unsupported language '{}', expected 'fr' or 'en'", other)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::Fr => "fr",
            Language::En => "en",
        })
    }
}

/// How the image endpoint returns the picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    Url,
    /// Base64 payload, turned into a `data:image/png;base64,` URI.
    #[default]
    B64Json,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Url => "url",
            ImageFormat::B64Json => "b64_json",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "url" => Ok(ImageFormat::Url),
            "b64_json" | "b64" | "base64" => Ok(ImageFormat::B64Json),
            other => Err(format!("unsupported image format '{}', expected 'url' or 'b64_json'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub temperature: f32,
    pub image_model: String,
    pub image_size: String,
    pub image_quality: String,
    pub image_style: String,
    pub image_format: ImageFormat,
    pub language: Language,
    /// `None` leaves requests without a client-side deadline.
    pub request_timeout: Option<Duration>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            image_quality: "standard".to_string(),
            image_style: "vivid".to_string(),
            image_format: ImageFormat::B64Json,
            language: Language::Fr,
            request_timeout: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageGenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub n: u8,
    pub size: &'a str,
    pub quality: &'a str,
    pub style: &'a str,
    pub response_format: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageGenerationResponse {
    #[serde(default)]
    pub data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageData {
    pub url: Option<String>,
    pub b64_json: Option<String>,
}

/// Structured interpretation returned for one dream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamAnalysisResponse {
    pub title: String,
    #[serde(default)]
    pub image_prompt: String,
    pub interpretations: Vec<Interpretation>,
    pub overall_mood: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl DreamAnalysisResponse {
    /// Analysis ready to embed in a dream, with every explanation unvalidated.
    pub fn to_analysis(&self, timestamp: i64) -> DreamAnalysis {
        DreamAnalysis {
            interpretations: self
                .interpretations
                .iter()
                .map(|interpretation| Interpretation {
                    aspect: interpretation.aspect.clone(),
                    explanations: interpretation
                        .explanations
                        .iter()
                        .map(|e| Explanation { is_validated: false, ..e.clone() })
                        .collect(),
                })
                .collect(),
            overall_mood: self.overall_mood.clone(),
            keywords: self.keywords.clone(),
            timestamp,
        }
    }
}
