//! Pull a JSON object out of free-form completion text.
//!
//! Models sometimes answer with bare JSON and sometimes wrap it in a
//! markdown code fence. Strategies run in order; each failure falls through
//! to the next and the last failure is reported as a parse error.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{AnalysisError, AnalysisResult};

lazy_static! {
    static ref FENCED_JSON: Regex = Regex::new(r"(?s)```(?i:json)?\s*(\{.*\})\s*```").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Object inside a ```json ... ``` (any case, or bare ```) fence.
    FencedBlock,
    /// Whole reply, trimmed.
    RawText,
}

impl ExtractionStrategy {
    pub const ORDERED: [ExtractionStrategy; 2] =
        [ExtractionStrategy::FencedBlock, ExtractionStrategy::RawText];

    fn candidate<'a>(&self, text: &'a str) -> Option<&'a str> {
        match self {
            ExtractionStrategy::FencedBlock => FENCED_JSON
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str()),
            ExtractionStrategy::RawText => Some(text.trim()).filter(|t| !t.is_empty()),
        }
    }
}

/// Deserialize `T` from the first strategy that yields valid JSON of that shape.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> AnalysisResult<T> {
    let mut last_error = String::from("empty response");

    for strategy in ExtractionStrategy::ORDERED {
        let Some(candidate) = strategy.candidate(text) else {
            continue;
        };
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => {
                debug!("Parsed completion with {:?} strategy", strategy);
                return Ok(value);
            }
            Err(e) => {
                debug!("{:?} strategy failed: {}", strategy, e);
                last_error = e.to_string();
            }
        }
    }

    warn!("Failed to parse completion: {}", last_error);
    debug!("Raw completion: {}", text);
    Err(AnalysisError::Parse(last_error))
}
