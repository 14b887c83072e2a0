pub mod analysis;
pub mod config;
pub mod error;
pub mod insights;
pub mod journal;
pub mod journal_db;
pub mod telemetry;

// Public API exports
pub use analysis::{AnalysisClient, AnalysisConfig, DreamAnalysisResponse, ImageFormat, Language};
pub use config::Config;
pub use error::{AnalysisError, JournalError, StoreError};
pub use insights::{
    activity_calendar, activity_calendar_in, compute_insights, compute_insights_in, CalendarDay,
    DreamInsights, Intensity, MonthlyTrend, ThemeCount,
};
pub use journal::{AnalyzedDream, DreamJournal};
pub use journal_db::{
    Dream, DreamAnalysis, DreamPattern, EmotionalThemes, Explanation, GlobalAnalysis,
    Interpretation, JournalDatabase, ThemeAnalysis,
};
