//! services/api/tests/db.rs
//!
//! Document-store adapter against an in-memory SQLite database.

use chrono::{Duration, Utc};
use planner_lib::adapters::DbAdapter;
use planner_lib::services::accounts::hash_password;
use sqlx::sqlite::SqlitePoolOptions;
use study_planner_core::domain::{ChatRole, DocumentSummary, User};
use study_planner_core::ports::{
    AuthSessionStore, ChatRepository, PdfDocumentRepository, PortError, UserRepository,
};
use uuid::Uuid;

async fn adapter() -> DbAdapter {
    // One connection, so every query sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let db = DbAdapter::new(pool);
    db.run_migrations().await.unwrap();
    db
}

fn user(username: &str, email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: email.to_string(),
        full_name: "Ada Lovelace".to_string(),
        password_hash: hash_password("secret1").unwrap(),
        created_at: Utc::now(),
    }
}

fn summary(name: &str, text: &str) -> DocumentSummary {
    DocumentSummary {
        document_id: None,
        file_name: name.to_string(),
        summary: text.to_string(),
        models_used: "BERT".to_string(),
        upload_date: Utc::now(),
        file_size: 2048,
        page_count: 9,
    }
}

#[tokio::test]
async fn users_are_found_by_username_email_and_id() {
    let db = adapter().await;
    let ada = db.insert(user("ada", "ada@example.com")).await.unwrap();

    assert_eq!(db.find_by_username("ada").await.unwrap().unwrap().id, ada.id);
    assert_eq!(
        db.find_by_email("ADA@example.com").await.unwrap().unwrap().id,
        ada.id
    );
    assert_eq!(
        db.find_by_identifier("ada@example.com").await.unwrap().unwrap().id,
        ada.id
    );
    assert_eq!(db.find_by_identifier("ada").await.unwrap().unwrap().id, ada.id);
    let loaded = db.find_by_id(ada.id).await.unwrap().unwrap();
    assert_eq!(loaded.username, "ada");
    assert_eq!(loaded.password_hash, ada.password_hash);
    assert!(db.find_by_identifier("grace").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_usernames_conflict() {
    let db = adapter().await;
    db.insert(user("ada", "ada@example.com")).await.unwrap();
    let err = db.insert(user("ada", "other@example.com")).await.unwrap_err();
    assert!(matches!(err, PortError::Conflict(_)));
}

#[tokio::test]
async fn update_reports_whether_a_row_changed() {
    let db = adapter().await;
    let mut ada = db.insert(user("ada", "ada@example.com")).await.unwrap();
    ada.full_name = "Augusta Ada King".to_string();
    assert!(db.update(&ada).await.unwrap());
    assert_eq!(
        db.find_by_id(ada.id).await.unwrap().unwrap().full_name,
        "Augusta Ada King"
    );

    let ghost = user("ghost", "ghost@example.com");
    assert!(!db.update(&ghost).await.unwrap());
}

#[tokio::test]
async fn upsert_keeps_one_record_per_user_and_path() {
    let db = adapter().await;
    let ada = db.insert(user("ada", "ada@example.com")).await.unwrap();

    let first = db
        .upsert_from_summary(ada.id, "/papers/bert.pdf", &summary("bert.pdf", "v1"))
        .await
        .unwrap();
    let second = db
        .upsert_from_summary(ada.id, "/papers/bert.pdf", &summary("bert.pdf", "v2"))
        .await
        .unwrap();
    assert_eq!(first, second);

    let docs = db.get_by_user(ada.id, 0).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].summary, "v2");
    assert_eq!(docs[0].page_count, 9);
    assert_eq!(docs[0].file_size, 2048);

    assert!(db
        .upsert_from_summary(ada.id, "  ", &summary("x.pdf", ""))
        .await
        .is_err());
}

#[tokio::test]
async fn documents_are_private_to_their_owner() {
    let db = adapter().await;
    let ada = db.insert(user("ada", "ada@example.com")).await.unwrap();
    let grace = db.insert(user("grace", "grace@example.com")).await.unwrap();
    let id = db
        .upsert_from_summary(ada.id, "/papers/a.pdf", &summary("a.pdf", "s"))
        .await
        .unwrap();

    assert!(db.get_by_id(ada.id, id).await.unwrap().is_some());
    assert!(db.get_by_id(grace.id, id).await.unwrap().is_none());
    assert!(db.get_by_user(grace.id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn chat_reads_back_in_chronological_order() {
    let db = adapter().await;
    let ada = db.insert(user("ada", "ada@example.com")).await.unwrap();
    let doc = db
        .upsert_from_summary(ada.id, "/papers/a.pdf", &summary("a.pdf", "s"))
        .await
        .unwrap();

    let start = Utc::now();
    // Inserted out of order on purpose.
    db.add_message(ada.id, doc, ChatRole::Assistant, "An answer", start + Duration::seconds(1))
        .await
        .unwrap();
    db.add_message(ada.id, doc, ChatRole::User, "A question", start)
        .await
        .unwrap();

    let messages = db.get_messages(ada.id, doc, -1).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::User);
    assert_eq!(messages[0].content, "A question");
    assert_eq!(messages[1].role, ChatRole::Assistant);

    let limited = db.get_messages(ada.id, doc, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn sessions_expire_and_can_be_deleted() {
    let db = adapter().await;
    let ada = db.insert(user("ada", "ada@example.com")).await.unwrap();

    db.create_auth_session("live", ada.id, Utc::now() + Duration::days(1))
        .await
        .unwrap();
    db.create_auth_session("stale", ada.id, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();

    assert_eq!(db.validate_auth_session("live").await.unwrap(), ada.id);
    assert!(matches!(
        db.validate_auth_session("stale").await,
        Err(PortError::Unauthorized)
    ));
    assert!(matches!(
        db.validate_auth_session("unknown").await,
        Err(PortError::Unauthorized)
    ));

    db.delete_auth_session("live").await.unwrap();
    assert!(db.validate_auth_session("live").await.is_err());
}
