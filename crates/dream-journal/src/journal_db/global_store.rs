//! Storage for the single latest global analysis
use crate::error::StoreResult;
use crate::journal_db::schema::{GlobalAnalysis, GLOBAL_ANALYSIS_KEY};
use crate::journal_db::{connection, logged, SharedPool};
use rusqlite::{params, OptionalExtension};
use tracing::info;

pub struct GlobalAnalysisStore {
    pool: SharedPool,
}

impl GlobalAnalysisStore {
    pub(crate) fn new(pool: SharedPool) -> Self {
        Self { pool }
    }

    /// Replace the stored analysis.
    pub async fn save_global_analysis(&self, analysis: &GlobalAnalysis) -> StoreResult<()> {
        logged("save global analysis", self.replace(analysis))
    }

    pub async fn get_latest_global_analysis(&self) -> StoreResult<Option<GlobalAnalysis>> {
        logged("get global analysis", self.latest())
    }

    fn replace(&self, analysis: &GlobalAnalysis) -> StoreResult<()> {
        let conn = connection(&self.pool)?;
        let data = serde_json::to_string(analysis)?;
        conn.execute(
            "INSERT OR REPLACE INTO global_analysis (id, data) VALUES (?1, ?2)",
            params![GLOBAL_ANALYSIS_KEY, data],
        )?;
        info!("Saved global analysis ({} patterns)", analysis.patterns.len());
        Ok(())
    }

    fn latest(&self) -> StoreResult<Option<GlobalAnalysis>> {
        let conn = connection(&self.pool)?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM global_analysis WHERE id = ?1",
                [GLOBAL_ANALYSIS_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data
            .map(|json| serde_json::from_str::<GlobalAnalysis>(&json))
            .transpose()?)
    }
}
