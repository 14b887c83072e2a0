//! Analysis client - prompt construction, one HTTP round trip and JSON extraction
pub mod client;
pub mod extract;
pub mod prompts;
pub mod types;
pub use client::AnalysisClient;
pub use extract::{extract_json, ExtractionStrategy};
pub use types::{AnalysisConfig, DreamAnalysisResponse, ImageFormat, Language};
