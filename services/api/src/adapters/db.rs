//! services/api/src/adapters/db.rs
//!
//! This module contains the document-store adapter, the concrete implementation
//! of the user, PDF document, chat and auth-session ports from the `core` crate.
//! It handles all interactions with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use study_planner_core::domain::{ChatMessage, ChatRole, DocumentSummary, StoredPdfDocument, User};
use study_planner_core::ports::{
    AuthSessionStore, ChatRepository, PdfDocumentRepository, PortError, PortResult,
    UserRepository, DEFAULT_CHAT_LIMIT, DEFAULT_HISTORY_LIMIT,
};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter implementing every document-store port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Unique violations become `Conflict`, everything else `Unexpected`.
fn map_write_error(e: sqlx::Error, what: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(format!("{} already exists", what))
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    full_name: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            password_hash: self.password_hash,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct PdfDocumentRecord {
    id: Uuid,
    user_id: Uuid,
    file_name: String,
    local_file_path: String,
    summary: String,
    models_used: String,
    uploaded_at: DateTime<Utc>,
    file_size: i64,
    page_count: i64,
}
impl PdfDocumentRecord {
    fn to_domain(self) -> StoredPdfDocument {
        StoredPdfDocument {
            id: self.id,
            user_id: self.user_id,
            file_name: self.file_name,
            local_file_path: self.local_file_path,
            summary: self.summary,
            models_used: self.models_used,
            uploaded_at: self.uploaded_at,
            file_size: self.file_size.max(0) as u64,
            page_count: self.page_count.max(0) as u32,
        }
    }
}

#[derive(FromRow)]
struct ChatMessageRecord {
    id: Uuid,
    user_id: Uuid,
    document_id: Uuid,
    role: String,
    content: String,
    timestamp: DateTime<Utc>,
}
impl ChatMessageRecord {
    fn to_domain(self) -> ChatMessage {
        let role = if self.role == "user" {
            ChatRole::User
        } else {
            ChatRole::Assistant
        };
        ChatMessage {
            id: self.id,
            user_id: self.user_id,
            document_id: self.document_id,
            role,
            content: self.content,
            timestamp: self.timestamp,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, created_at";
const PDF_COLUMNS: &str = "id, user_id, file_name, local_file_path, summary, models_used, uploaded_at, file_size, page_count";

//=========================================================================================
// `UserRepository` Trait Implementation
//=========================================================================================

impl DbAdapter {
    async fn find_user_where(&self, clause: &str, value: &str) -> PortResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, clause);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }
}

#[async_trait]
impl UserRepository for DbAdapter {
    async fn find_by_username(&self, username: &str) -> PortResult<Option<User>> {
        self.find_user_where("username", username.trim()).await
    }

    async fn find_by_email(&self, email: &str) -> PortResult<Option<User>> {
        self.find_user_where("email", &email.trim().to_lowercase()).await
    }

    async fn find_by_identifier(&self, identifier: &str) -> PortResult<Option<User>> {
        let identifier = identifier.trim();
        let sql = format!(
            "SELECT {} FROM users WHERE username = ? OR email = ? LIMIT 1",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(identifier)
            .bind(identifier.to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn find_by_id(&self, id: Uuid) -> PortResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn insert(&self, user: User) -> PortResult<User> {
        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, password_hash, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "A user with this username or email"))?;
        Ok(user)
    }

    async fn update(&self, user: &User) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET username = ?, email = ?, full_name = ?, password_hash = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "A user with this username or email"))?;
        Ok(result.rows_affected() > 0)
    }
}

//=========================================================================================
// `PdfDocumentRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl PdfDocumentRepository for DbAdapter {
    async fn upsert_from_summary(
        &self,
        user_id: Uuid,
        local_file_path: &str,
        summary: &DocumentSummary,
    ) -> PortResult<Uuid> {
        if local_file_path.trim().is_empty() {
            return Err(PortError::Validation("Local file path is required".to_string()));
        }

        let id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO pdf_documents
                (id, user_id, file_name, local_file_path, summary, models_used, uploaded_at, file_size, page_count)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (user_id, local_file_path) DO UPDATE SET
                   file_name = excluded.file_name,
                   summary = excluded.summary,
                   models_used = excluded.models_used,
                   uploaded_at = excluded.uploaded_at,
                   file_size = excluded.file_size,
                   page_count = excluded.page_count
               RETURNING id"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&summary.file_name)
        .bind(local_file_path)
        .bind(&summary.summary)
        .bind(&summary.models_used)
        .bind(summary.upload_date)
        .bind(summary.file_size as i64)
        .bind(summary.page_count as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        debug!("Stored PDF document {} for user {}", id, user_id);
        Ok(id)
    }

    async fn get_by_user(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<StoredPdfDocument>> {
        let limit = if limit <= 0 { DEFAULT_HISTORY_LIMIT } else { limit };
        let sql = format!(
            "SELECT {} FROM pdf_documents WHERE user_id = ? ORDER BY uploaded_at DESC LIMIT ?",
            PDF_COLUMNS
        );
        let records = sqlx::query_as::<_, PdfDocumentRecord>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(PdfDocumentRecord::to_domain).collect())
    }

    async fn get_by_id(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Option<StoredPdfDocument>> {
        let sql = format!(
            "SELECT {} FROM pdf_documents WHERE id = ? AND user_id = ?",
            PDF_COLUMNS
        );
        let record = sqlx::query_as::<_, PdfDocumentRecord>(&sql)
            .bind(document_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(PdfDocumentRecord::to_domain))
    }
}

//=========================================================================================
// `ChatRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatRepository for DbAdapter {
    async fn add_message(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        role: ChatRole,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO chat_messages (id, user_id, document_id, role, content, timestamp) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(document_id)
        .bind(role_str(role))
        .bind(content)
        .bind(timestamp)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_messages(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        limit: i64,
    ) -> PortResult<Vec<ChatMessage>> {
        let limit = if limit <= 0 { DEFAULT_CHAT_LIMIT } else { limit };
        let records = sqlx::query_as::<_, ChatMessageRecord>(
            "SELECT id, user_id, document_id, role, content, timestamp FROM chat_messages WHERE user_id = ? AND document_id = ? ORDER BY timestamp ASC LIMIT ?",
        )
        .bind(user_id)
        .bind(document_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ChatMessageRecord::to_domain).collect())
    }
}

//=========================================================================================
// `AuthSessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthSessionStore for DbAdapter {
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "Session"))?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT user_id, expires_at FROM auth_sessions WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)?;

        if record.expires_at <= Utc::now() {
            self.delete_auth_session(session_id).await?;
            return Err(PortError::Unauthorized);
        }
        Ok(record.user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
