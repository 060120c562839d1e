//! services/api/tests/api.rs
//!
//! The HTTP surface end to end: in-memory SQLite, temp-dir files, a canned AI.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use planner_lib::{
    adapters::{
        gemini::AiError,
        CredentialStore, DbAdapter, LopdfTextService, MemoryVault, ReportExporter,
        XmlLibraryStore, XmlPlanArchive,
    },
    config::Config,
    services::{AccountService, AnalyzerService, LibraryService},
    web::{self, state::AppState},
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use study_planner_core::{
    focus::FocusTimer,
    plans::InMemoryPlanRepository,
    ports::{AiService, PortResult},
    StudyPlanItem,
};
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower::ServiceExt;

struct CannedAi;

#[async_trait]
impl AiService for CannedAi {
    async fn generate_summary(&self, text: &str) -> PortResult<String> {
        Ok(format!("Summary of {} characters", text.chars().count()))
    }

    async fn extract_models(&self, _text: &str) -> PortResult<String> {
        Ok("Courier".to_string())
    }

    async fn ask_question(&self, question: &str, _context: &str) -> PortResult<String> {
        Ok(format!("Answer to: {}", question))
    }
}

/// Every call fails the way an exhausted endpoint fallback does.
struct RejectingAi;

const REJECTION: &str = "API error (403): PERMISSION_DENIED - API key not valid. (key source: GOOGLE_API_KEY)";

#[async_trait]
impl AiService for RejectingAi {
    async fn generate_summary(&self, _text: &str) -> PortResult<String> {
        Err(AiError::Api { status: 403, message: REJECTION.to_string() }.into())
    }

    async fn extract_models(&self, _text: &str) -> PortResult<String> {
        Err(AiError::Api { status: 403, message: REJECTION.to_string() }.into())
    }

    async fn ask_question(&self, _question: &str, _context: &str) -> PortResult<String> {
        Err(AiError::Api { status: 403, message: REJECTION.to_string() }.into())
    }
}

struct TestApp {
    router: Router,
    dir: TempDir,
}

async fn app() -> TestApp {
    app_with(Arc::new(CannedAi)).await
}

async fn app_with(ai: Arc<dyn AiService>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".to_string(),
        log_level: tracing::Level::DEBUG,
        data_dir: dir.path().to_path_buf(),
        google_api_key: None,
        api_key_source: "not configured".to_string(),
        gemini_api_root: "http://127.0.0.1:9".to_string(),
        gemini_base_url: None,
        gemini_model_candidates: None,
        gemini_temperature: 0.1,
        gemini_max_output_tokens: 256,
        gemini_timeout: Duration::from_secs(1),
    });

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await
        .unwrap();
    let db = Arc::new(DbAdapter::new(pool));
    db.run_migrations().await.unwrap();
    let pdf = Arc::new(LopdfTextService::new());

    let state = Arc::new(AppState {
        config: config.clone(),
        accounts: AccountService::new(db.clone(), db.clone()),
        analyzer: AnalyzerService::new(ai, pdf.clone(), db.clone(), db),
        library: Arc::new(LibraryService::new(
            Arc::new(XmlLibraryStore::new(config.library_file())),
            pdf,
            config.library_dir(),
        )),
        plans: Arc::new(InMemoryPlanRepository::new()),
        archive: Arc::new(XmlPlanArchive::new(config.plans_file())),
        exporter: ReportExporter::new(),
        credentials: Arc::new(CredentialStore::in_dir(
            &config.data_dir,
            Arc::new(MemoryVault::default()),
        )),
        focus: Arc::new(Mutex::new(FocusTimer::default())),
    });

    TestApp {
        router: web::router(state),
        dir,
    }
}

struct Reply {
    status: StatusCode,
    cookie: Option<String>,
    body: Value,
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, body: Option<Value>, cookie: Option<&str>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        Reply {
            status,
            cookie,
            body,
        }
    }

    async fn register(&self, username: &str, remember_me: bool) -> String {
        let reply = self
            .send(
                "POST",
                "/auth/register",
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "full_name": "Test Student",
                    "password": "secret1",
                    "remember_me": remember_me,
                })),
                None,
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        reply.cookie.unwrap()
    }
}

//=========================================================================================
// Accounts
//=========================================================================================

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let reply = app.send("GET", "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
}

#[tokio::test]
async fn registration_signs_the_user_in() {
    let app = app().await;
    let cookie = app.register("ada", false).await;
    assert!(cookie.starts_with("session="));

    let me = app.send("GET", "/auth/me", None, Some(&cookie)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "ada");
    assert_eq!(me.body["email"], "ada@example.com");

    let anonymous = app.send("GET", "/auth/me", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    let forged = app.send("GET", "/auth/me", None, Some("session=forged")).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_rejects_bad_input_and_duplicates() {
    let app = app().await;
    app.register("ada", false).await;

    let duplicate = app
        .send(
            "POST",
            "/auth/register",
            Some(json!({
                "username": "ada",
                "email": "other@example.com",
                "full_name": "Someone Else",
                "password": "secret1",
            })),
            None,
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let weak = app
        .send(
            "POST",
            "/auth/register",
            Some(json!({
                "username": "grace",
                "email": "grace@example.com",
                "full_name": "Grace Hopper",
                "password": "123",
            })),
            None,
        )
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_distinguishes_unknown_users_from_wrong_passwords() {
    let app = app().await;
    app.register("ada", false).await;

    let wrong = app
        .send(
            "POST",
            "/auth/login",
            Some(json!({ "identifier": "ada", "password": "nope!!" })),
            None,
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let unknown = app
        .send(
            "POST",
            "/auth/login",
            Some(json!({ "identifier": "nobody", "password": "secret1" })),
            None,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let blank = app
        .send(
            "POST",
            "/auth/login",
            Some(json!({ "identifier": "ada", "password": "" })),
            None,
        )
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let by_email = app
        .send(
            "POST",
            "/auth/login",
            Some(json!({ "identifier": "ADA@example.com", "password": "secret1" })),
            None,
        )
        .await;
    assert_eq!(by_email.status, StatusCode::OK);
    assert!(by_email.cookie.is_some());
}

#[tokio::test]
async fn remembered_credentials_allow_auto_login_until_logout() {
    let app = app().await;
    let nothing = app.send("POST", "/auth/auto-login", None, None).await;
    assert_eq!(nothing.status, StatusCode::NOT_FOUND);

    app.register("ada", false).await;
    let login = app
        .send(
            "POST",
            "/auth/login",
            Some(json!({ "identifier": "ada", "password": "secret1", "remember_me": true })),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);

    let auto = app.send("POST", "/auth/auto-login", None, None).await;
    assert_eq!(auto.status, StatusCode::OK);
    assert_eq!(auto.body["username"], "ada");
    let cookie = auto.cookie.unwrap();

    let logout = app.send("POST", "/auth/logout", None, Some(&cookie)).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.cookie.as_deref(), Some("session="));

    let after = app.send("POST", "/auth/auto-login", None, None).await;
    assert_eq!(after.status, StatusCode::NOT_FOUND);
    let me = app.send("GET", "/auth/me", None, Some(&cookie)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_and_password_can_be_changed() {
    let app = app().await;
    let cookie = app.register("ada", false).await;

    let profile = app
        .send(
            "PUT",
            "/auth/profile",
            Some(json!({ "full_name": "Ada King", "email": "Countess@Example.com" })),
            Some(&cookie),
        )
        .await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["email"], "countess@example.com");

    let wrong_current = app
        .send(
            "POST",
            "/auth/password",
            Some(json!({ "current_password": "nope!!", "new_password": "better1" })),
            Some(&cookie),
        )
        .await;
    assert_eq!(wrong_current.status, StatusCode::BAD_REQUEST);

    let changed = app
        .send(
            "POST",
            "/auth/password",
            Some(json!({ "current_password": "secret1", "new_password": "better1" })),
            Some(&cookie),
        )
        .await;
    assert_eq!(changed.status, StatusCode::NO_CONTENT);

    let login = app
        .send(
            "POST",
            "/auth/login",
            Some(json!({ "identifier": "countess@example.com", "password": "better1" })),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

//=========================================================================================
// Plans
//=========================================================================================

#[tokio::test]
async fn plan_crud_keeps_the_list_consistent() {
    let app = app().await;

    let created = app
        .send(
            "POST",
            "/plans",
            Some(json!({
                "subject": "Linear Algebra",
                "date": "2024-05-02T10:00:00",
                "duration_minutes": 60,
                "priority": "high",
                "category": "Mathematics",
            })),
            None,
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.body["priority"], "High");
    let id = created.body["id"].as_str().unwrap().to_string();

    let list = app.send("GET", "/plans", None, None).await;
    assert_eq!(list.body.as_array().unwrap().len(), 1);

    let toggled = app.send("POST", &format!("/plans/{}/toggle", id), None, None).await;
    assert_eq!(toggled.body["is_completed"], true);
    let completed = app.send("GET", "/plans?completed_only=true", None, None).await;
    assert_eq!(completed.body.as_array().unwrap().len(), 1);

    let updated = app
        .send(
            "PUT",
            &format!("/plans/{}", id),
            Some(json!({ "subject": "Abstract Algebra", "duration_minutes": 45, "is_completed": true })),
            None,
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["subject"], "Abstract Algebra");
    assert_eq!(updated.body["duration_minutes"], 45);

    let search = app.send("GET", "/plans?search=abstract", None, None).await;
    assert_eq!(search.body.as_array().unwrap().len(), 1);

    let deleted = app.send("DELETE", &format!("/plans/{}", id), None, None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let again = app.send("DELETE", &format!("/plans/{}", id), None, None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    let empty = app.send("GET", "/plans", None, None).await;
    assert!(empty.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_plans_are_rejected() {
    let app = app().await;
    let blank = app.send("POST", "/plans", Some(json!({ "subject": "   " })), None).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let priority = app
        .send("POST", "/plans", Some(json!({ "subject": "History", "priority": "urgent" })), None)
        .await;
    assert_eq!(priority.status, StatusCode::BAD_REQUEST);

    let negative = app
        .send("POST", "/plans", Some(json!({ "subject": "History", "duration_minutes": -5 })), None)
        .await;
    assert!(negative.status.is_client_error());

    let count = app.send("GET", "/plans", None, None).await;
    assert!(count.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn saved_plans_load_back() {
    let app = app().await;
    for subject in ["Biology", "Chemistry"] {
        app.send("POST", "/plans", Some(json!({ "subject": subject })), None)
            .await;
    }

    let saved = app.send("POST", "/plans/save", None, None).await;
    assert_eq!(saved.status, StatusCode::OK);
    assert_eq!(saved.body["count"], 2);
    assert!(app.dir.path().join("studyplans.xml").exists());

    let custom = app.dir.path().join("backup").join("plans.xml");
    let saved_custom = app
        .send(
            "POST",
            "/plans/save",
            Some(json!({ "path": custom.to_string_lossy() })),
            None,
        )
        .await;
    assert_eq!(saved_custom.status, StatusCode::OK);

    let before = app.send("GET", "/plans", None, None).await;
    let id = before.body[0]["id"].as_str().unwrap().to_string();
    app.send("DELETE", &format!("/plans/{}", id), None, None).await;

    let loaded = app
        .send(
            "POST",
            "/plans/load",
            Some(json!({ "path": custom.to_string_lossy() })),
            None,
        )
        .await;
    assert_eq!(loaded.status, StatusCode::OK);
    assert_eq!(loaded.body.as_array().unwrap().len(), 2);

    let loaded_items: Vec<StudyPlanItem> = serde_json::from_value(loaded.body).unwrap();
    let before_items: Vec<StudyPlanItem> = serde_json::from_value(before.body).unwrap();
    for item in &before_items {
        assert!(loaded_items.contains(item));
    }
}

#[tokio::test]
async fn a_file_with_duplicate_ids_leaves_the_list_alone() {
    let app = app().await;
    app.send("POST", "/plans", Some(json!({ "subject": "Existing" })), None)
        .await;

    let id = uuid::Uuid::new_v4();
    let entry = format!(
        "<StudyPlanItem><Id>{}</Id><CreatedDate>2024-03-01T09:00:00Z</CreatedDate>\
         <ModifiedDate>2024-03-01T09:00:00Z</ModifiedDate><Date>2024-03-05T18:00:00</Date>\
         <DurationMinutes>45</DurationMinutes><Subject>Dup</Subject></StudyPlanItem>",
        id
    );
    let path = app.dir.path().join("broken.xml");
    std::fs::write(
        &path,
        format!("<ArrayOfStudyPlanItem>{}{}</ArrayOfStudyPlanItem>", entry, entry),
    )
    .unwrap();

    let loaded = app
        .send("POST", "/plans/load", Some(json!({ "path": path.to_string_lossy() })), None)
        .await;
    assert_eq!(loaded.status, StatusCode::CONFLICT);

    let list = app.send("GET", "/plans", None, None).await;
    let list = list.body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["subject"], "Existing");
}

#[tokio::test]
async fn stats_and_reports_reflect_the_list() {
    let app = app().await;
    app.send(
        "POST",
        "/plans",
        Some(json!({ "subject": "Optics", "duration_minutes": 90, "is_completed": true, "category": "Physics" })),
        None,
    )
    .await;
    app.send("POST", "/plans", Some(json!({ "subject": "Poetry", "category": "Literature" })), None)
        .await;

    let stats = app.send("GET", "/plans/stats", None, None).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["total_plans"], 2);
    assert_eq!(stats.body["completed_plans"], 1);
    assert_eq!(stats.body["total_study_minutes"], 90);
    assert_eq!(stats.body["most_studied_category"], "Physics");
    assert_eq!(stats.body["weekly"].as_array().unwrap().len(), 7);

    for kind in ["plans", "statistics"] {
        let path = app.dir.path().join(format!("{}.pdf", kind));
        let reply = app
            .send(
                "POST",
                "/plans/export",
                Some(json!({ "path": path.to_string_lossy(), "kind": kind })),
                None,
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{:?}", reply.body);
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}

//=========================================================================================
// Analyzer and history
//=========================================================================================

async fn sample_pdf(app: &TestApp) -> String {
    let path = app.dir.path().join("paper.pdf");
    let mut item = StudyPlanItem::new("Attention Is All You Need");
    item.category = "Research".to_string();
    ReportExporter::new()
        .export_plans(&[item], &path)
        .await
        .unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn signed_in_analysis_is_recorded_with_its_chat() {
    let app = app().await;
    let cookie = app.register("ada", false).await;
    let path = sample_pdf(&app).await;

    let processed = app
        .send("POST", "/analyzer/process", Some(json!({ "path": path })), Some(&cookie))
        .await;
    assert_eq!(processed.status, StatusCode::OK, "{:?}", processed.body);
    assert!(processed.body["summary"]["summary"]
        .as_str()
        .unwrap()
        .starts_with("Summary of"));
    assert_eq!(processed.body["summary"]["models_used"], "Courier");
    assert_eq!(processed.body["summary"]["page_count"], 1);
    let document_id = processed.body["summary"]["document_id"]
        .as_str()
        .unwrap()
        .to_string();

    let answer = app
        .send(
            "POST",
            "/analyzer/ask",
            Some(json!({ "question": "What is it about?", "document_id": document_id })),
            Some(&cookie),
        )
        .await;
    assert_eq!(answer.status, StatusCode::OK, "{:?}", answer.body);
    assert_eq!(answer.body["answer"], "Answer to: What is it about?");
    assert_eq!(answer.body["saved"], true);

    let history = app.send("GET", "/history", None, Some(&cookie)).await;
    assert_eq!(history.body.as_array().unwrap().len(), 1);
    assert_eq!(history.body[0]["file_name"], "paper.pdf");

    let chat = app
        .send("GET", &format!("/history/{}/chat", document_id), None, Some(&cookie))
        .await;
    let turns = chat.body.as_array().unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0]["role"], "user");
    assert_eq!(turns[1]["role"], "assistant");

    // Other users cannot read it.
    let other = app.register("grace", false).await;
    let foreign = app
        .send("GET", &format!("/history/{}/chat", document_id), None, Some(&other))
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_analysis_keeps_no_history() {
    let app = app().await;
    let path = sample_pdf(&app).await;

    let processed = app
        .send("POST", "/analyzer/process", Some(json!({ "path": path })), None)
        .await;
    assert_eq!(processed.status, StatusCode::OK);
    assert!(processed.body["summary"]["document_id"].is_null());

    let answer = app
        .send(
            "POST",
            "/analyzer/ask",
            Some(json!({ "question": "Why?", "context": processed.body["text"] })),
            None,
        )
        .await;
    assert_eq!(answer.status, StatusCode::OK);
    assert_eq!(answer.body["saved"], false);

    let blank = app
        .send("POST", "/analyzer/ask", Some(json!({ "question": "  ", "context": "x" })), None)
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let missing = app
        .send("POST", "/analyzer/process", Some(json!({ "path": "/no/such/file.pdf" })), None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let history = app.send("GET", "/history", None, None).await;
    assert_eq!(history.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ai_failures_reach_the_caller() {
    let app = app_with(Arc::new(RejectingAi)).await;
    let path = sample_pdf(&app).await;

    // Analysis degrades to warning texts.
    let processed = app
        .send("POST", "/analyzer/process", Some(json!({ "path": path })), None)
        .await;
    assert_eq!(processed.status, StatusCode::OK);
    let summary = processed.body["summary"]["summary"].as_str().unwrap();
    assert!(summary.starts_with("⚠️"));
    assert!(summary.contains("key source: GOOGLE_API_KEY"));

    let answer = app
        .send(
            "POST",
            "/analyzer/ask",
            Some(json!({ "question": "Why?", "context": "Some text" })),
            None,
        )
        .await;
    assert_eq!(answer.status, StatusCode::BAD_GATEWAY);
    assert_eq!(answer.body, Value::String(REJECTION.to_string()));
}

#[tokio::test]
async fn questions_about_another_users_document_are_refused() {
    let app = app().await;
    let ada = app.register("ada", false).await;
    let path = sample_pdf(&app).await;
    let processed = app
        .send("POST", "/analyzer/process", Some(json!({ "path": path })), Some(&ada))
        .await;
    let document_id = processed.body["summary"]["document_id"]
        .as_str()
        .unwrap()
        .to_string();

    let grace = app.register("grace", false).await;
    let refused = app
        .send(
            "POST",
            "/analyzer/ask",
            Some(json!({ "question": "Whose is this?", "context": "text", "document_id": document_id })),
            Some(&grace),
        )
        .await;
    assert_eq!(refused.status, StatusCode::NOT_FOUND);

    let chat = app
        .send("GET", &format!("/history/{}/chat", document_id), None, Some(&ada))
        .await;
    assert!(chat.body.as_array().unwrap().is_empty());
}

//=========================================================================================
// Library and focus timer
//=========================================================================================

#[tokio::test]
async fn library_files_documents_under_categories() {
    let app = app().await;
    let defaults = app.send("GET", "/library/categories", None, None).await;
    assert_eq!(defaults.body.as_array().unwrap().len(), 5);

    let created = app
        .send("POST", "/library/categories", Some(json!({ "name": "Research" })), None)
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["id"], 6);
    assert_eq!(created.body["icon"], "📁");

    let path = sample_pdf(&app).await;
    let added = app
        .send(
            "POST",
            "/library/categories/6/documents",
            Some(json!({ "path": path })),
            None,
        )
        .await;
    assert_eq!(added.status, StatusCode::CREATED, "{:?}", added.body);
    assert_eq!(added.body["title"], "paper");
    assert_eq!(added.body["page_count"], 1);

    let summary = app
        .send(
            "PUT",
            "/library/categories/6/documents/1/summary",
            Some(json!({ "summary": "Transformers." })),
            None,
        )
        .await;
    assert_eq!(summary.status, StatusCode::OK);
    assert_eq!(summary.body["summary"], "Transformers.");

    let removed = app
        .send("DELETE", "/library/categories/6/documents/1", None, None)
        .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    let gone = app.send("DELETE", "/library/categories/6", None, None).await;
    assert_eq!(gone.status, StatusCode::NO_CONTENT);
    let unknown = app.send("DELETE", "/library/categories/6", None, None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let blank = app
        .send("POST", "/library/categories", Some(json!({ "name": " " })), None)
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn focus_timer_is_controlled_over_http() {
    let app = app().await;
    let status = app.send("GET", "/focus", None, None).await;
    assert_eq!(status.body["remaining"], "25:00");
    assert_eq!(status.body["state"], "Idle");

    let longer = app
        .send("PUT", "/focus/duration", Some(json!({ "minutes": 500 })), None)
        .await;
    assert_eq!(longer.body["duration_minutes"], 180);

    let running = app.send("POST", "/focus/toggle", None, None).await;
    assert_eq!(running.body["state"], "Running");
    let ignored = app
        .send("PUT", "/focus/duration", Some(json!({ "minutes": 50 })), None)
        .await;
    assert_eq!(ignored.body["duration_minutes"], 180);

    let paused = app.send("POST", "/focus/toggle", None, None).await;
    assert_eq!(paused.body["state"], "Paused");
    let reset = app.send("POST", "/focus/reset", None, None).await;
    assert_eq!(reset.body["state"], "Idle");
    assert_eq!(reset.body["remaining"], "180:00");
}
