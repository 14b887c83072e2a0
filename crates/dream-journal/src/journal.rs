//! Caller-facing journal service combining the store and the analysis client.
use std::sync::Arc;

use chrono::{Local, LocalResult, NaiveDate, TimeZone, Timelike};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analysis::AnalysisClient;
use crate::error::{JournalResult, StoreError};
use crate::insights::{self, CalendarDay, DreamInsights};
use crate::journal_db::schema::{now_millis, Dream, GlobalAnalysis, ThemeAnalysis};
use crate::journal_db::JournalDatabase;

/// Result of [`DreamJournal::analyze_dream`].
#[derive(Debug)]
pub struct AnalyzedDream {
    /// The record as persisted with its analysis, before any thumbnail.
    pub dream: Dream,
    /// Background thumbnail generation; `None` when the analysis had no image prompt.
    pub thumbnail_task: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct DreamJournal {
    db: Arc<JournalDatabase>,
    client: Arc<AnalysisClient>,
}

impl DreamJournal {
    pub fn new(db: Arc<JournalDatabase>, client: Arc<AnalysisClient>) -> Self {
        Self { db, client }
    }

    pub fn database(&self) -> &Arc<JournalDatabase> {
        &self.db
    }

    /// Every dream, newest first.
    pub async fn load_all(&self) -> JournalResult<Vec<Dream>> {
        let mut dreams = self.db.dreams.get_all_dreams().await?;
        dreams.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(dreams)
    }

    pub async fn get(&self, id: &str) -> JournalResult<Dream> {
        Ok(self.require(id).await?)
    }

    pub async fn add(&self, dream: &Dream) -> JournalResult<()> {
        Ok(self.db.dreams.add_dream(dream).await?)
    }

    pub async fn update(&self, dream: &Dream) -> JournalResult<()> {
        Ok(self.db.dreams.update_dream(dream).await?)
    }

    pub async fn delete(&self, id: &str) -> JournalResult<bool> {
        Ok(self.db.dreams.delete_dream(id).await?)
    }

    /// Create and store a new, unanalyzed dream.
    pub async fn record_dream(&self, content: &str) -> JournalResult<Dream> {
        let dream = Dream::new(content.trim());
        self.db.dreams.add_dream(&dream).await?;
        info!("Recorded dream {}", dream.id);
        Ok(dream)
    }

    /// Analyze a stored dream and persist the result.
    ///
    /// A failed analysis leaves the record untouched, and a dream deleted
    /// while the request was pending stays deleted. On success a detached
    /// task generates the thumbnail and stores it in a second update; its
    /// failure is logged and never affects the analysis.
    pub async fn analyze_dream(&self, id: &str) -> JournalResult<AnalyzedDream> {
        let mut dream = self.require(id).await?;
        let response = self.client.analyze_dream(&dream.content).await?;

        dream.title = response.title.clone();
        dream.analysis = Some(response.to_analysis(now_millis()));
        // Deleted while the request was in flight: drop the result.
        if !self.db.dreams.replace_existing(&dream).await? {
            debug!("Dream {} was deleted before its analysis was stored", dream.id);
            return Err(StoreError::NotFound(format!("dream {}", id)).into());
        }
        info!("Stored analysis for dream {}", dream.id);

        let thumbnail_task = if response.image_prompt.trim().is_empty() {
            debug!("Analysis of dream {} returned no image prompt", dream.id);
            None
        } else {
            Some(self.spawn_thumbnail(dream.id.clone(), response.image_prompt))
        };
        Ok(AnalyzedDream { dream, thumbnail_task })
    }

    fn spawn_thumbnail(&self, id: String, prompt: String) -> JoinHandle<()> {
        let db = Arc::clone(&self.db);
        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            let thumbnail = match client.generate_image(&prompt).await {
                Ok(thumbnail) => thumbnail,
                Err(e) => {
                    warn!("Thumbnail generation for dream {} failed: {}", id, e);
                    return;
                }
            };
            // The dream may have been edited or deleted while the image was generated.
            match db.dreams.get_dream(&id).await {
                Ok(Some(mut current)) => {
                    current.thumbnail = Some(thumbnail);
                    match db.dreams.replace_existing(&current).await {
                        Ok(true) => info!("Stored thumbnail for dream {}", id),
                        Ok(false) => debug!("Dream {} was deleted before its thumbnail was stored", id),
                        Err(e) => warn!("Failed to store thumbnail for dream {}: {}", id, e),
                    }
                }
                Ok(None) => debug!("Dream {} was deleted before its thumbnail was ready", id),
                Err(e) => warn!("Failed to reload dream {} for thumbnail: {}", id, e),
            }
        })
    }

    /// Flip the validation flag of one explanation and persist the dream.
    pub async fn toggle_explanation_validation(
        &self,
        id: &str,
        aspect_index: usize,
        explanation_index: usize,
    ) -> JournalResult<Dream> {
        let mut dream = self.require(id).await?;
        let analysis = dream
            .analysis
            .as_mut()
            .ok_or_else(|| StoreError::Invalid(format!("dream {} has not been analyzed", id)))?;
        let explanation = analysis
            .interpretations
            .get_mut(aspect_index)
            .and_then(|interpretation| interpretation.explanations.get_mut(explanation_index))
            .ok_or_else(|| {
                StoreError::Invalid(format!(
                    "dream {} has no explanation {} for aspect {}",
                    id, explanation_index, aspect_index
                ))
            })?;
        explanation.is_validated = !explanation.is_validated;
        debug!(
            "Explanation {}/{} of dream {} validated: {}",
            aspect_index, explanation_index, id, explanation.is_validated
        );

        self.db.dreams.update_dream(&dream).await?;
        Ok(dream)
    }

    pub async fn rename_dream(&self, id: &str, title: &str) -> JournalResult<Dream> {
        let mut dream = self.require(id).await?;
        dream.title = title.trim().to_string();
        self.db.dreams.update_dream(&dream).await?;
        Ok(dream)
    }

    /// Move a dream to another local calendar day, keeping its hour and minute.
    pub async fn move_dream_to_day(&self, id: &str, day: NaiveDate) -> JournalResult<Dream> {
        self.move_dream_to_day_in(id, day, &Local).await
    }

    pub async fn move_dream_to_day_in<Tz: TimeZone>(
        &self,
        id: &str,
        day: NaiveDate,
        tz: &Tz,
    ) -> JournalResult<Dream> {
        let mut dream = self.require(id).await?;
        dream.date = redate(dream.date, day, tz)
            .ok_or_else(|| StoreError::Invalid(format!("cannot move dream {} to {}", id, day)))?;
        self.db.dreams.update_dream(&dream).await?;
        info!("Moved dream {} to {}", id, day);
        Ok(dream)
    }

    /// Stored analysis of a theme, or a fresh one that is then stored.
    pub async fn explore_theme(&self, theme: &str) -> JournalResult<ThemeAnalysis> {
        if theme.trim().is_empty() {
            return Err(StoreError::Invalid("theme is empty".into()).into());
        }
        if let Some(cached) = self.db.themes.get_theme_analysis(theme).await? {
            debug!("Theme '{}' served from the journal", cached.theme);
            return Ok(cached);
        }
        let analysis = self.client.analyze_theme(theme).await?;
        self.db.themes.add_or_replace_theme_analysis(&analysis).await?;
        Ok(analysis)
    }

    pub async fn delete_theme(&self, theme: &str) -> JournalResult<bool> {
        Ok(self.db.themes.delete_theme_analysis(theme).await?)
    }

    /// Stored themes sorted by name.
    pub async fn saved_themes(&self) -> JournalResult<Vec<ThemeAnalysis>> {
        let mut themes = self.db.themes.get_all_theme_analyses().await?;
        themes.sort_by(|a, b| a.theme.cmp(&b.theme));
        Ok(themes)
    }

    pub async fn search_themes(&self, query: &str) -> JournalResult<Vec<ThemeAnalysis>> {
        let mut themes = self.db.themes.search_theme_analyses(query).await?;
        themes.sort_by(|a, b| a.theme.cmp(&b.theme));
        Ok(themes)
    }

    /// Analyze the whole journal and replace the stored global analysis.
    pub async fn refresh_global_analysis(&self) -> JournalResult<GlobalAnalysis> {
        let dreams = self.db.dreams.get_all_dreams().await?;
        let analysis = self.client.analyze_global_dreams(&dreams).await?;
        self.db.global.save_global_analysis(&analysis).await?;
        Ok(analysis)
    }

    pub async fn latest_global_analysis(&self) -> JournalResult<Option<GlobalAnalysis>> {
        Ok(self.db.global.get_latest_global_analysis().await?)
    }

    pub async fn insights(&self) -> JournalResult<DreamInsights> {
        let dreams = self.db.dreams.get_all_dreams().await?;
        Ok(insights::compute_insights(&dreams))
    }

    /// Activity over the `days` days ending today, local time.
    pub async fn calendar(&self, days: u32) -> JournalResult<Vec<CalendarDay>> {
        let dreams = self.db.dreams.get_all_dreams().await?;
        let today = Local::now().date_naive();
        Ok(insights::activity_calendar(&dreams, today, days))
    }

    async fn require(&self, id: &str) -> Result<Dream, StoreError> {
        self.db
            .dreams
            .get_dream(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("dream {}", id)))
    }
}

/// `millis` moved to `day` in `tz`, keeping hour and minute and dropping seconds.
fn redate<Tz: TimeZone>(millis: i64, day: NaiveDate, tz: &Tz) -> Option<i64> {
    let current = insights::local_time(millis, tz)?.naive_local();
    let target = day.and_hms_opt(current.hour(), current.minute(), 0)?;
    match tz.from_local_datetime(&target) {
        LocalResult::Single(moved) => Some(moved.timestamp_millis()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp_millis()),
        LocalResult::None => None,
    }
}
