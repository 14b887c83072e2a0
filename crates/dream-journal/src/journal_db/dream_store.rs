//! Dream storage and retrieval operations
use crate::error::{StoreError, StoreResult};
use crate::journal_db::schema::Dream;
use crate::journal_db::{connection, logged, SharedPool};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

pub struct DreamStore {
    pool: SharedPool,
}

impl DreamStore {
    pub(crate) fn new(pool: SharedPool) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        connection(&self.pool)
    }

    /// Insert a new dream. Fails with `DuplicateKey` when the id is taken
    /// and with `Invalid` when the content is blank.
    pub async fn add_dream(&self, dream: &Dream) -> StoreResult<()> {
        logged("add dream", self.insert(dream))
    }

    /// Insert or replace the dream with the same id.
    pub async fn update_dream(&self, dream: &Dream) -> StoreResult<()> {
        logged("update dream", self.upsert(dream))
    }

    /// Replace a dream only if it is still stored. Returns whether it was.
    pub async fn replace_existing(&self, dream: &Dream) -> StoreResult<bool> {
        logged("replace dream", self.replace(dream))
    }

    /// Remove a dream. Returns whether a record was deleted; an unknown id is not an error.
    pub async fn delete_dream(&self, id: &str) -> StoreResult<bool> {
        logged("delete dream", self.remove(id))
    }

    pub async fn get_dream(&self, id: &str) -> StoreResult<Option<Dream>> {
        logged("get dream", self.find(id))
    }

    /// Every stored dream. Order is unspecified; callers sort.
    pub async fn get_all_dreams(&self) -> StoreResult<Vec<Dream>> {
        logged("get dreams", self.load_all())
    }

    fn insert(&self, dream: &Dream) -> StoreResult<()> {
        if dream.content.trim().is_empty() {
            return Err(StoreError::Invalid(format!("dream {} has no content", dream.id)));
        }
        let conn = self.get_conn()?;
        let data = serde_json::to_string(dream)?;

        match conn.execute(
            "INSERT INTO dreams (id, date, data) VALUES (?1, ?2, ?3)",
            params![&dream.id, dream.date, data],
        ) {
            Ok(_) => {
                debug!("Stored dream {}", dream.id);
                Ok(())
            }
            Err(e) if StoreError::is_constraint_violation(&e) => {
                Err(StoreError::DuplicateKey(dream.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn upsert(&self, dream: &Dream) -> StoreResult<()> {
        let conn = self.get_conn()?;
        let data = serde_json::to_string(dream)?;
        conn.execute(
            "INSERT INTO dreams (id, date, data) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET date = excluded.date, data = excluded.data",
            params![&dream.id, dream.date, data],
        )?;
        debug!("Updated dream {}", dream.id);
        Ok(())
    }

    fn replace(&self, dream: &Dream) -> StoreResult<bool> {
        let conn = self.get_conn()?;
        let data = serde_json::to_string(dream)?;
        let updated = conn.execute(
            "UPDATE dreams SET date = ?2, data = ?3 WHERE id = ?1",
            params![&dream.id, dream.date, data],
        )?;
        Ok(updated > 0)
    }

    fn remove(&self, id: &str) -> StoreResult<bool> {
        let conn = self.get_conn()?;
        let deleted = conn.execute("DELETE FROM dreams WHERE id = ?1", [id])?;
        if deleted > 0 {
            info!("Deleted dream {}", id);
        } else {
            debug!("No dream {} to delete", id);
        }
        Ok(deleted > 0)
    }

    fn find(&self, id: &str) -> StoreResult<Option<Dream>> {
        let conn = self.get_conn()?;
        let data: Option<String> = conn
            .query_row("SELECT data FROM dreams WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        Ok(data.map(|json| serde_json::from_str::<Dream>(&json)).transpose()?)
    }

    fn load_all(&self) -> StoreResult<Vec<Dream>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT data FROM dreams")?;
        let mut rows = stmt.query([])?;
        let mut dreams = Vec::new();
        while let Some(row) = rows.next()? {
            let json: String = row.get(0)?;
            dreams.push(serde_json::from_str(&json)?);
        }
        debug!("Loaded {} dreams", dreams.len());
        Ok(dreams)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::StoreError;
    use crate::journal_db::schema::*;
    use crate::journal_db::JournalDatabase;

    async fn ready_db() -> JournalDatabase {
        let db = JournalDatabase::in_memory();
        db.initialize().await.unwrap();
        db
    }

    fn dream(id: &str, date: i64, content: &str) -> Dream {
        Dream {
            id: id.to_string(),
            date,
            title: String::new(),
            content: content.to_string(),
            analysis: None,
            thumbnail: None,
        }
    }

    fn analyzed(mut dream: Dream) -> Dream {
        dream.title = "La forêt".into();
        dream.analysis = Some(DreamAnalysis {
            interpretations: vec![Interpretation {
                aspect: "forêt".into(),
                explanations: vec![
                    Explanation { explanation: "inconnu".into(), confidence: 70, is_validated: false },
                    Explanation { explanation: "croissance".into(), confidence: 55, is_validated: true },
                ],
            }],
            overall_mood: "mystérieux".into(),
            keywords: vec!["forêt".into(), "nuit".into()],
            timestamp: 1_700_000_100_000,
        });
        dream.thumbnail = Some("data:image/png;base64,AAAA".into());
        dream
    }

    #[tokio::test]
    async fn test_added_dreams_round_trip_exactly_once() {
        let db = ready_db().await;
        let first = analyzed(dream("a", 1_700_000_000_000, "Je marchais dans une forêt 🌲"));
        let second = dream("b", 1_700_000_500_000, "Un train sans fin\nsur deux lignes");

        db.dreams.add_dream(&first).await.unwrap();
        db.dreams.add_dream(&second).await.unwrap();

        let all = db.dreams.get_all_dreams().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().filter(|d| d.id == "a").count(), 1);
        assert_eq!(all.iter().filter(|d| d.id == "b").count(), 1);
        assert!(all.contains(&first));
        assert!(all.contains(&second));
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_id() {
        let db = ready_db().await;
        db.dreams.add_dream(&dream("a", 1, "first")).await.unwrap();

        let err = db.dreams.add_dream(&dream("a", 2, "second")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(id) if id == "a"));

        let all = db.dreams.get_all_dreams().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "first");
    }

    #[tokio::test]
    async fn test_add_rejects_blank_content() {
        let db = ready_db().await;
        let err = db.dreams.add_dream(&dream("a", 1, "   ")).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(db.dreams.get_all_dreams().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_existing_record() {
        let db = ready_db().await;
        let original = dream("a", 1_700_000_000_000, "Je marchais dans une forêt");
        db.dreams.add_dream(&original).await.unwrap();

        let updated = analyzed(original.clone());
        db.dreams.update_dream(&updated).await.unwrap();

        let all = db.dreams.get_all_dreams().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], updated);
    }

    #[tokio::test]
    async fn test_update_inserts_missing_record() {
        let db = ready_db().await;
        let fresh = dream("new", 5, "never added");
        db.dreams.update_dream(&fresh).await.unwrap();
        db.dreams.update_dream(&fresh).await.unwrap();

        let all = db.dreams.get_all_dreams().await.unwrap();
        assert_eq!(all, vec![fresh]);
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_ignores_unknown_id() {
        let db = ready_db().await;
        db.dreams.add_dream(&dream("a", 1, "one")).await.unwrap();
        db.dreams.add_dream(&dream("b", 2, "two")).await.unwrap();

        assert!(db.dreams.delete_dream("a").await.unwrap());
        let remaining = db.dreams.get_all_dreams().await.unwrap();
        assert!(remaining.iter().all(|d| d.id != "a"));

        assert!(!db.dreams.delete_dream("missing").await.unwrap());
        assert_eq!(db.dreams.get_all_dreams().await.unwrap(), remaining);
    }

    #[tokio::test]
    async fn test_replace_existing_never_inserts() {
        let db = ready_db().await;
        let ghost = dream("ghost", 1, "gone");
        assert!(!db.dreams.replace_existing(&ghost).await.unwrap());
        assert!(db.dreams.get_all_dreams().await.unwrap().is_empty());

        db.dreams.add_dream(&dream("a", 1, "one")).await.unwrap();
        let mut changed = dream("a", 1, "one");
        changed.thumbnail = Some("https://images.test/a.png".into());
        assert!(db.dreams.replace_existing(&changed).await.unwrap());
        assert_eq!(db.dreams.get_dream("a").await.unwrap(), Some(changed));
    }

    #[tokio::test]
    async fn test_get_dream_by_id() {
        let db = ready_db().await;
        let stored = dream("a", 1, "one");
        db.dreams.add_dream(&stored).await.unwrap();

        assert_eq!(db.dreams.get_dream("a").await.unwrap(), Some(stored));
        assert_eq!(db.dreams.get_dream("zzz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dreams_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dreams.db");
        let stored = analyzed(dream("persist", 1_700_000_000_000, "Une maison inconnue"));

        {
            let db = JournalDatabase::open(&path);
            db.initialize().await.unwrap();
            db.dreams.add_dream(&stored).await.unwrap();
        }

        let reopened = JournalDatabase::open(&path);
        reopened.initialize().await.unwrap();
        assert_eq!(reopened.dreams.get_all_dreams().await.unwrap(), vec![stored]);
    }
}
