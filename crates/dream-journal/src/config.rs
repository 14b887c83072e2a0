use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::analysis::{AnalysisConfig, ImageFormat, Language};

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub chat_model: String,
    pub temperature: f32,
    pub image_model: String,
    pub image_size: String,
    pub image_quality: String,
    pub image_style: String,
    pub image_format: ImageFormat,
    pub language: Language,
    /// 0 disables the client-side timeout.
    pub request_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let temperature: f32 = var("DREAM_TEMPERATURE", "0.7")
            .parse()
            .context("DREAM_TEMPERATURE must be a number")?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow::anyhow!(
                "DREAM_TEMPERATURE must be between 0 and 2, got {}",
                temperature
            ));
        }

        Ok(Self {
            db_path: PathBuf::from(var("DREAM_DB_PATH", "./data/dreams.db")),
            api_key: lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty()),
            api_base_url: var("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            chat_model: var("DREAM_CHAT_MODEL", "gpt-4o-mini"),
            temperature,
            image_model: var("DREAM_IMAGE_MODEL", "dall-e-3"),
            image_size: var("DREAM_IMAGE_SIZE", "1024x1024"),
            image_quality: var("DREAM_IMAGE_QUALITY", "standard"),
            image_style: var("DREAM_IMAGE_STYLE", "vivid"),
            image_format: var("DREAM_IMAGE_FORMAT", "b64_json")
                .parse()
                .map_err(|e: String| anyhow::anyhow!("DREAM_IMAGE_FORMAT: {}", e))?,
            language: var("DREAM_LANGUAGE", "fr")
                .parse()
                .map_err(|e: String| anyhow::anyhow!("DREAM_LANGUAGE: {}", e))?,
            request_timeout_seconds: var("REQUEST_TIMEOUT_SECONDS", "0")
                .parse()
                .context("REQUEST_TIMEOUT_SECONDS must be a whole number of seconds")?,
        })
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            api_key: self.api_key.clone(),
            base_url: self.api_base_url.clone(),
            chat_model: self.chat_model.clone(),
            temperature: self.temperature,
            image_model: self.image_model.clone(),
            image_size: self.image_size.clone(),
            image_quality: self.image_quality.clone(),
            image_style: self.image_style.clone(),
            image_format: self.image_format,
            language: self.language,
            request_timeout: (self.request_timeout_seconds > 0)
                .then(|| Duration::from_secs(self.request_timeout_seconds)),
        }
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- Database: {}", self.db_path.display());
        info!("- API Base URL: {}", self.api_base_url);
        info!(
            "- API Key: {}",
            if self.api_key.is_some() { "set" } else { "not set" }
        );
        info!("- Chat Model: {} (temperature {})", self.chat_model, self.temperature);
        info!(
            "- Image: {} {} {} {} ({})",
            self.image_model,
            self.image_size,
            self.image_quality,
            self.image_style,
            self.image_format.as_str()
        );
        info!("- Language: {}", self.language);
        if self.request_timeout_seconds > 0 {
            info!("- Request Timeout: {}s", self.request_timeout_seconds);
        } else {
            info!("- Request Timeout: none");
        }
    }
}
