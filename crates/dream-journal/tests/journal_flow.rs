use std::sync::Arc;

use dream_journal::{
    AnalysisClient, AnalysisConfig, AnalysisError, DreamJournal, ImageFormat, JournalDatabase,
    JournalError, Language, StoreError,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

const DREAM_REPLY: &str = r#"```json
{
  "title": "Le lac gelé",
  "imagePrompt": "a frozen lake under a violet moon",
  "interpretations": [
    {
      "aspect": "glace",
      "explanations": [
        {"explanation": "émotions mises en pause", "confidence": 80},
        {"explanation": "besoin de clarté", "confidence": 60}
      ]
    }
  ],
  "overallMood": "calme",
  "keywords": ["lac", "hiver"]
}
```"#;

fn completion(content: &str) -> String {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
}

async fn journal_for(server: &ServerGuard, language: Language) -> (DreamJournal, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(JournalDatabase::open(dir.path().join("dreams.db")));
    db.initialize().await.unwrap();
    let client = AnalysisClient::new(AnalysisConfig {
        api_key: Some("test-key".into()),
        base_url: server.url(),
        image_format: ImageFormat::B64Json,
        language,
        ..AnalysisConfig::default()
    });
    (DreamJournal::new(db, Arc::new(client)), dir)
}

#[tokio::test]
async fn analyze_then_thumbnail_updates_record_twice() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("Rêve: Je marchais sur un lac gelé".into()))
        .with_body(completion(DREAM_REPLY))
        .create_async()
        .await;
    let image = server
        .mock("POST", "/images/generations")
        .match_body(Matcher::PartialJson(json!({"prompt": "a frozen lake under a violet moon"})))
        .with_body(r#"{"data": [{"b64_json": "iVBORw0KGgo="}]}"#)
        .create_async()
        .await;

    let (journal, _dir) = journal_for(&server, Language::Fr).await;
    let dream = journal.record_dream("Je marchais sur un lac gelé").await.unwrap();

    let analyzed = journal.analyze_dream(&dream.id).await.unwrap();
    assert_eq!(analyzed.dream.title, "Le lac gelé");
    let analysis = analyzed.dream.analysis.as_ref().unwrap();
    assert_eq!(analysis.overall_mood, "calme");
    assert!(analysis.explanations().all(|e| !e.is_validated));
    assert!(analyzed.dream.thumbnail.is_none());

    analyzed.thumbnail_task.expect("image prompt present").await.unwrap();
    image.assert_async().await;

    let stored = journal.get(&dream.id).await.unwrap();
    assert_eq!(stored.thumbnail.as_deref(), Some("data:image/png;base64,iVBORw0KGgo="));
    assert_eq!(stored.analysis, analyzed.dream.analysis);
}

#[tokio::test]
async fn thumbnail_failure_keeps_analysis() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_body(completion(DREAM_REPLY))
        .create_async()
        .await;
    server
        .mock("POST", "/images/generations")
        .with_status(500)
        .create_async()
        .await;

    let (journal, _dir) = journal_for(&server, Language::Fr).await;
    let dream = journal.record_dream("Un lac").await.unwrap();
    let analyzed = journal.analyze_dream(&dream.id).await.unwrap();
    analyzed.thumbnail_task.unwrap().await.unwrap();

    let stored = journal.get(&dream.id).await.unwrap();
    assert!(stored.is_analyzed());
    assert!(stored.thumbnail.is_none());
}

#[tokio::test]
async fn thumbnail_for_deleted_dream_is_dropped() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_body(completion(DREAM_REPLY))
        .create_async()
        .await;
    server
        .mock("POST", "/images/generations")
        .with_body(r#"{"data": [{"b64_json": "AAAA"}]}"#)
        .create_async()
        .await;

    let (journal, _dir) = journal_for(&server, Language::Fr).await;
    let dream = journal.record_dream("Un lac").await.unwrap();
    let analyzed = journal.analyze_dream(&dream.id).await.unwrap();
    assert!(journal.delete(&dream.id).await.unwrap());
    analyzed.thumbnail_task.unwrap().await.unwrap();

    assert!(journal.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn analysis_of_dream_deleted_mid_request_is_not_stored() {
    let mut server = Server::new_async().await;
    let (journal, _dir) = journal_for(&server, Language::Fr).await;
    let dream = journal.record_dream("Un lac").await.unwrap();

    // The record disappears while the model is still answering.
    let db_path = journal.database().path().unwrap().to_path_buf();
    let id = dream.id.clone();
    server
        .mock("POST", "/chat/completions")
        .with_body_from_request(move |_| {
            let conn = rusqlite::Connection::open(&db_path).unwrap();
            conn.busy_timeout(std::time::Duration::from_secs(5)).unwrap();
            conn.execute("DELETE FROM dreams WHERE id = ?1", [&id]).unwrap();
            completion(DREAM_REPLY).into_bytes()
        })
        .create_async()
        .await;
    let image = server
        .mock("POST", "/images/generations")
        .expect(0)
        .create_async()
        .await;

    let err = journal.analyze_dream(&dream.id).await.err().unwrap();
    assert!(matches!(err, JournalError::Store(StoreError::NotFound(_))));
    assert!(journal.load_all().await.unwrap().is_empty());
    image.assert_async().await;
}

#[tokio::test]
async fn failed_analysis_leaves_record_untouched() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_body(completion("Je ne peux pas interpréter ce rêve."))
        .create_async()
        .await;

    let (journal, _dir) = journal_for(&server, Language::Fr).await;
    let dream = journal.record_dream("Un couloir").await.unwrap();
    let err = journal.analyze_dream(&dream.id).await.err().unwrap();
    assert!(matches!(err, JournalError::Analysis(AnalysisError::Parse(_))));
    assert_eq!(journal.get(&dream.id).await.unwrap(), dream);
}

#[tokio::test]
async fn validated_explanations_feed_global_analysis() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("Analyze this dream".into()))
        .with_body(completion(DREAM_REPLY))
        .create_async()
        .await;
    server
        .mock("POST", "/images/generations")
        .with_body(r#"{"data": [{"b64_json": "AAAA"}]}"#)
        .create_async()
        .await;
    let global = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("Analyze these 1 recent dreams".into()),
            Matcher::Regex("- glace: besoin de clarté".into()),
        ]))
        .with_body(completion(
            r#"{
              "patterns": [{"title": "Gel", "description": "Le froid revient", "frequency": 100, "relatedDreams": [1]}],
              "psychologicalInsights": "Besoin de ralentir",
              "recommendations": ["Noter les rêves au réveil"],
              "emotionalThemes": {"dominant": "calme", "secondary": ["nostalgie"], "evolution": "stable"}
            }"#,
        ))
        .create_async()
        .await;

    let (journal, _dir) = journal_for(&server, Language::En).await;
    let dream = journal.record_dream("I walked on a frozen lake").await.unwrap();
    let analyzed = journal.analyze_dream(&dream.id).await.unwrap();
    if let Some(task) = analyzed.thumbnail_task {
        task.await.unwrap();
    }
    journal.toggle_explanation_validation(&dream.id, 0, 1).await.unwrap();

    let analysis = journal.refresh_global_analysis().await.unwrap();
    global.assert_async().await;
    assert_eq!(analysis.patterns[0].title, "Gel");
    assert_eq!(journal.latest_global_analysis().await.unwrap(), Some(analysis));

    let insights = journal.insights().await.unwrap();
    assert_eq!(insights.total_dreams, 1);
    assert_eq!(insights.validated_interpretations, 1);
    assert!((insights.average_confidence - 70.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn explored_theme_is_stored_and_reused() {
    let mut server = Server::new_async().await;
    let theme = server
        .mock("POST", "/chat/completions")
        .with_body(completion(
            r#"{"theme": "Eau", "explanation": "Les émotions", "examples": ["nager"], "relatedThemes": ["mer"]}"#,
        ))
        .expect(1)
        .create_async()
        .await;

    let (journal, _dir) = journal_for(&server, Language::Fr).await;
    let first = journal.explore_theme("Eau").await.unwrap();
    let second = journal.explore_theme("EAU").await.unwrap();
    theme.assert_async().await;

    assert_eq!(first.theme, "eau");
    assert_eq!(first, second);
    assert_eq!(journal.search_themes("émotions").await.unwrap(), vec![first]);
    assert!(journal.delete_theme("eau").await.unwrap());
    assert!(journal.saved_themes().await.unwrap().is_empty());
}

#[tokio::test]
async fn calendar_counts_recorded_dreams_today() {
    let server = Server::new_async().await;
    let (journal, _dir) = journal_for(&server, Language::Fr).await;
    journal.record_dream("Premier").await.unwrap();
    journal.record_dream("Second").await.unwrap();

    let calendar = journal.calendar(7).await.unwrap();
    assert_eq!(calendar.len(), 7);
    assert_eq!(calendar.last().unwrap().dreams, 2);
}
