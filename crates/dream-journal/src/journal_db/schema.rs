//! Persisted record shapes for the dream journal.
//!
//! Field names serialize in camelCase; they are the contract between the store
//! and any importer or exporter of journal data.
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Key of the single global analysis row.
pub const GLOBAL_ANALYSIS_KEY: &str = "latest";

/// Milliseconds since the Unix epoch, the timestamp unit of every record.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dream {
    pub id: String,
    pub date: i64,
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub analysis: Option<DreamAnalysis>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Dream {
    /// Fresh, unanalyzed dream with a generated id dated now.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date: now_millis(),
            title: String::new(),
            content: content.into(),
            analysis: None,
            thumbnail: None,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamAnalysis {
    pub interpretations: Vec<Interpretation>,
    pub overall_mood: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub timestamp: i64,
}

impl DreamAnalysis {
    pub fn explanations(&self) -> impl Iterator<Item = &Explanation> {
        self.interpretations.iter().flat_map(|i| i.explanations.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    pub aspect: String,
    pub explanations: Vec<Explanation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub explanation: String,
    #[serde(deserialize_with = "confidence_from_any")]
    pub confidence: u8,
    #[serde(default)]
    pub is_validated: bool,
}

/// Stored interpretation of a single recurring theme, keyed by lower-cased name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeAnalysis {
    #[serde(default)]
    pub theme: String,
    pub explanation: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub related_themes: Vec<String>,
    #[serde(default)]
    pub timestamp: i64,
}

impl ThemeAnalysis {
    pub fn normalize_key(theme: &str) -> String {
        theme.trim().to_lowercase()
    }
}

/// Cross-dream analysis. Only the latest one is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAnalysis {
    #[serde(default)]
    pub patterns: Vec<DreamPattern>,
    pub psychological_insights: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub emotional_themes: EmotionalThemes,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamPattern {
    pub title: String,
    pub description: String,
    /// Share of analyzed dreams showing the pattern, 0-100.
    #[serde(deserialize_with = "frequency_from_any")]
    pub frequency: f64,
    /// 1-based positions in the list of dreams sent for analysis.
    #[serde(default, deserialize_with = "positions_from_any")]
    pub related_dreams: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalThemes {
    pub dominant: String,
    #[serde(default)]
    pub secondary: Vec<String>,
    #[serde(default)]
    pub evolution: String,
}

/// A number as completion models emit it: a JSON number or a numeric
/// string, optionally suffixed with `%`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Number(f64),
    Text(String),
}

impl LenientNumber {
    fn finite<E: serde::de::Error>(self, field: &str) -> Result<f64, E> {
        let value = match self {
            LenientNumber::Number(n) => n,
            LenientNumber::Text(s) => s
                .trim()
                .trim_end_matches('%')
                .trim()
                .parse::<f64>()
                .map_err(|e| E::custom(format!("{}: {}", field, e)))?,
        };
        if !value.is_finite() {
            return Err(E::custom(format!("{} must be a finite number", field)));
        }
        Ok(value)
    }
}

/// Percentages in any representation, rounded and clamped to 0-100.
fn confidence_from_any<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = LenientNumber::deserialize(deserializer)?.finite::<D::Error>("confidence")?;
    Ok(value.round().clamp(0.0, 100.0) as u8)
}

fn frequency_from_any<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = LenientNumber::deserialize(deserializer)?.finite::<D::Error>("frequency")?;
    Ok(value.clamp(0.0, 100.0))
}

/// Dream positions as numbers, floats or numeric strings; rounded.
fn positions_from_any<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<LenientNumber>::deserialize(deserializer)?
        .into_iter()
        .map(|raw| {
            let value = raw.finite::<D::Error>("relatedDreams")?.round();
            if value < 0.0 || value > f64::from(u32::MAX) {
                return Err(serde::de::Error::custom(format!(
                    "relatedDreams entry out of range: {}",
                    value
                )));
            }
            Ok(value as u32)
        })
        .collect()
}
