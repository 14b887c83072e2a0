//! Theme analysis storage, keyed by the lower-cased theme name
use crate::error::StoreResult;
use crate::journal_db::schema::ThemeAnalysis;
use crate::journal_db::{connection, logged, SharedPool};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

pub struct ThemeStore {
    pool: SharedPool,
}

impl ThemeStore {
    pub(crate) fn new(pool: SharedPool) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        connection(&self.pool)
    }

    /// Upsert by theme name. The stored `theme` field is normalized to lower case.
    pub async fn add_or_replace_theme_analysis(&self, analysis: &ThemeAnalysis) -> StoreResult<()> {
        logged("store theme analysis", self.upsert(analysis))
    }

    /// Remove by theme name, compared case-insensitively. Unknown themes are ignored.
    pub async fn delete_theme_analysis(&self, theme: &str) -> StoreResult<bool> {
        logged("delete theme analysis", self.remove(theme))
    }

    pub async fn get_theme_analysis(&self, theme: &str) -> StoreResult<Option<ThemeAnalysis>> {
        logged("get theme analysis", self.find(theme))
    }

    pub async fn get_all_theme_analyses(&self) -> StoreResult<Vec<ThemeAnalysis>> {
        logged("get theme analyses", self.load_all())
    }

    /// Case-insensitive substring match on the theme name or its explanation.
    pub async fn search_theme_analyses(&self, query: &str) -> StoreResult<Vec<ThemeAnalysis>> {
        let needle = query.to_lowercase();
        let matches: Vec<ThemeAnalysis> = logged("search theme analyses", self.load_all())?
            .into_iter()
            .filter(|analysis| {
                analysis.theme.to_lowercase().contains(&needle)
                    || analysis.explanation.to_lowercase().contains(&needle)
            })
            .collect();
        debug!("Theme search '{}' matched {} analyses", query, matches.len());
        Ok(matches)
    }

    fn upsert(&self, analysis: &ThemeAnalysis) -> StoreResult<()> {
        let key = ThemeAnalysis::normalize_key(&analysis.theme);
        let normalized = ThemeAnalysis { theme: key.clone(), ..analysis.clone() };
        let data = serde_json::to_string(&normalized)?;

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO theme_analyses (theme, data) VALUES (?1, ?2)
             ON CONFLICT(theme) DO UPDATE SET data = excluded.data",
            params![key, data],
        )?;
        info!("Stored analysis for theme '{}'", key);
        Ok(())
    }

    fn remove(&self, theme: &str) -> StoreResult<bool> {
        let key = ThemeAnalysis::normalize_key(theme);
        let conn = self.get_conn()?;
        let deleted = conn.execute("DELETE FROM theme_analyses WHERE theme = ?1", [&key])?;
        debug!("Deleted {} analyses for theme '{}'", deleted, key);
        Ok(deleted > 0)
    }

    fn find(&self, theme: &str) -> StoreResult<Option<ThemeAnalysis>> {
        let key = ThemeAnalysis::normalize_key(theme);
        let conn = self.get_conn()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM theme_analyses WHERE theme = ?1",
                [&key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data
            .map(|json| serde_json::from_str::<ThemeAnalysis>(&json))
            .transpose()?)
    }

    fn load_all(&self) -> StoreResult<Vec<ThemeAnalysis>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT data FROM theme_analyses")?;
        let mut rows = stmt.query([])?;
        let mut analyses = Vec::new();
        while let Some(row) = rows.next()? {
            let json: String = row.get(0)?;
            analyses.push(serde_json::from_str(&json)?);
        }
        Ok(analyses)
    }
}
