//! Descriptive statistics over an in-memory dream collection.
//!
//! Everything here is pure: no storage, no clock except the time zone used to
//! bucket timestamps into hours, days and months.
pub mod calendar;

pub use calendar::{activity_calendar, activity_calendar_in, CalendarDay, Intensity};

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::journal_db::schema::Dream;

/// Number of keywords reported in `common_themes`.
pub const COMMON_THEMES_LIMIT: usize = 10;
/// Number of keywords reported per month.
pub const MONTHLY_THEMES_LIMIT: usize = 3;
/// Mood label for analyses whose `overallMood` is blank.
pub const UNKNOWN_MOOD: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamInsights {
    pub total_dreams: usize,
    pub analyzed_dreams: usize,
    pub mood_distribution: BTreeMap<String, usize>,
    /// Most frequent keywords, descending; ties keep first-seen order.
    pub common_themes: Vec<ThemeCount>,
    /// `"HH:00"` buckets over every dream, analyzed or not.
    pub time_distribution: BTreeMap<String, usize>,
    pub average_confidence: f64,
    pub validated_interpretations: usize,
    /// Newest month first.
    pub monthly_trends: Vec<MonthlyTrend>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeCount {
    pub theme: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// `"YYYY-MM"`
    pub month: String,
    pub count: usize,
    /// `None` when no dream of the month is analyzed.
    pub dominant_mood: Option<String>,
    pub dominant_themes: Vec<String>,
}

/// Counter that remembers insertion order so rankings break ties by first appearance.
#[derive(Debug, Default)]
struct OrderedCounter {
    index: HashMap<String, usize>,
    entries: Vec<(String, usize)>,
}

impl OrderedCounter {
    fn add(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    /// Descending by count; `sort_by` is stable so equal counts keep first-seen order.
    fn ranked(&self) -> Vec<(String, usize)> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    fn top(&self, n: usize) -> Vec<(String, usize)> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }
}

#[derive(Default)]
struct MonthBucket {
    count: usize,
    moods: OrderedCounter,
    themes: OrderedCounter,
}

fn mood_label(mood: &str) -> &str {
    if mood.trim().is_empty() {
        UNKNOWN_MOOD
    } else {
        mood
    }
}

/// Statistics bucketed in the local time zone.
pub fn compute_insights(dreams: &[Dream]) -> DreamInsights {
    compute_insights_in(dreams, &Local)
}

/// Statistics with hours and months taken in `tz`.
pub fn compute_insights_in<Tz: TimeZone>(dreams: &[Dream], tz: &Tz) -> DreamInsights {
    let mut mood_distribution = BTreeMap::new();
    let mut themes = OrderedCounter::default();
    let mut time_distribution = BTreeMap::new();
    let mut months: BTreeMap<String, MonthBucket> = BTreeMap::new();
    let mut analyzed_dreams = 0;
    let mut confidence_sum = 0u64;
    let mut explanation_count = 0u64;
    let mut validated_interpretations = 0;

    for dream in dreams {
        let local = local_time(dream.date, tz);
        if let Some(local) = &local {
            *time_distribution
                .entry(format!("{:02}:00", local.hour()))
                .or_insert(0) += 1;
        }
        let mut bucket = match &local {
            Some(local) => Some(
                months
                    .entry(format!("{:04}-{:02}", local.year(), local.month()))
                    .or_default(),
            ),
            None => None,
        };
        if let Some(bucket) = bucket.as_mut() {
            bucket.count += 1;
        }

        let Some(analysis) = &dream.analysis else {
            continue;
        };
        analyzed_dreams += 1;

        let mood = mood_label(&analysis.overall_mood);
        *mood_distribution.entry(mood.to_string()).or_insert(0) += 1;
        for keyword in &analysis.keywords {
            themes.add(keyword);
        }
        for explanation in analysis.explanations() {
            confidence_sum += u64::from(explanation.confidence);
            explanation_count += 1;
            if explanation.is_validated {
                validated_interpretations += 1;
            }
        }

        if let Some(bucket) = bucket {
            bucket.moods.add(mood);
            for keyword in &analysis.keywords {
                bucket.themes.add(keyword);
            }
        }
    }

    let average_confidence = if explanation_count == 0 {
        0.0
    } else {
        confidence_sum as f64 / explanation_count as f64
    };

    let monthly_trends = months
        .into_iter()
        .rev()
        .map(|(month, bucket)| MonthlyTrend {
            month,
            count: bucket.count,
            dominant_mood: bucket.moods.top(1).into_iter().next().map(|(mood, _)| mood),
            dominant_themes: bucket
                .themes
                .top(MONTHLY_THEMES_LIMIT)
                .into_iter()
                .map(|(theme, _)| theme)
                .collect(),
        })
        .collect();

    DreamInsights {
        total_dreams: dreams.len(),
        analyzed_dreams,
        mood_distribution,
        common_themes: themes
            .top(COMMON_THEMES_LIMIT)
            .into_iter()
            .map(|(theme, count)| ThemeCount { theme, count })
            .collect(),
        time_distribution,
        average_confidence,
        validated_interpretations,
        monthly_trends,
    }
}

/// `None` for timestamps outside chrono's representable range.
pub(crate) fn local_time<Tz: TimeZone>(millis: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    tz.timestamp_millis_opt(millis).single()
}
