//! crates/study_planner_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific implementations like the database, the XML files
//! or the generative-language API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

use crate::domain::{
    Category, ChatMessage, ChatRole, DocumentSummary, StoredPdfDocument, StudyPlanItem, User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// A remote service (the AI API) failed; the message is meant for the user.
    #[error("{0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Default number of chat turns returned by [`ChatRepository::get_messages`].
pub const DEFAULT_CHAT_LIMIT: i64 = 500;
/// Default number of documents returned by [`PdfDocumentRepository::get_by_user`].
pub const DEFAULT_HISTORY_LIMIT: i64 = 200;

//=========================================================================================
// Study Plans
//=========================================================================================

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn get_all(&self) -> PortResult<Vec<StudyPlanItem>>;

    async fn get_by_id(&self, id: Uuid) -> PortResult<Option<StudyPlanItem>>;

    async fn add(&self, item: StudyPlanItem) -> PortResult<StudyPlanItem>;

    async fn update(&self, item: StudyPlanItem) -> PortResult<StudyPlanItem>;

    /// Returns `true` when an item was removed.
    async fn delete(&self, id: Uuid) -> PortResult<bool>;

    async fn find(
        &self,
        predicate: &(dyn for<'a> Fn(&'a StudyPlanItem) -> bool + Send + Sync),
    ) -> PortResult<Vec<StudyPlanItem>>;

    async fn count(&self) -> PortResult<usize>;

    async fn clear(&self) -> PortResult<()>;

    async fn add_range(&self, items: Vec<StudyPlanItem>) -> PortResult<()> {
        for item in items {
            self.add(item).await?;
        }
        Ok(())
    }

    /// Drops every item and loads `items` in their place.
    async fn replace_all(&self, items: Vec<StudyPlanItem>) -> PortResult<()> {
        self.clear().await?;
        self.add_range(items).await
    }
}

/// File persistence for the plan list.
#[async_trait]
pub trait PlanArchive: Send + Sync {
    async fn load_from(&self, path: &Path) -> PortResult<Vec<StudyPlanItem>>;

    async fn save_to(&self, items: &[StudyPlanItem], path: &Path) -> PortResult<()>;

    /// Loads from the default file.
    async fn load(&self) -> PortResult<Vec<StudyPlanItem>>;

    /// Saves to the default file.
    async fn save(&self, items: &[StudyPlanItem]) -> PortResult<()>;
}

//=========================================================================================
// Document Store
//=========================================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> PortResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> PortResult<Option<User>>;

    /// Matches either the username or the email.
    async fn find_by_identifier(&self, identifier: &str) -> PortResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> PortResult<Option<User>>;

    async fn insert(&self, user: User) -> PortResult<User>;

    /// Returns `true` when a stored user was modified.
    async fn update(&self, user: &User) -> PortResult<bool>;
}

#[async_trait]
pub trait PdfDocumentRepository: Send + Sync {
    /// Inserts or replaces the record for `(user_id, local_file_path)` and returns its id.
    async fn upsert_from_summary(
        &self,
        user_id: Uuid,
        local_file_path: &str,
        summary: &DocumentSummary,
    ) -> PortResult<Uuid>;

    /// Newest first.
    async fn get_by_user(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<StoredPdfDocument>>;

    async fn get_by_id(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Option<StoredPdfDocument>>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn add_message(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        role: ChatRole,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Oldest first.
    async fn get_messages(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        limit: i64,
    ) -> PortResult<Vec<ChatMessage>>;
}

#[async_trait]
pub trait AuthSessionStore: Send + Sync {
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

//=========================================================================================
// AI, PDF, Library, Secrets
//=========================================================================================

#[async_trait]
pub trait AiService: Send + Sync {
    /// A short single-paragraph abstract of a paper.
    async fn generate_summary(&self, text: &str) -> PortResult<String>;

    /// The algorithms, models and techniques named in the text.
    async fn extract_models(&self, text: &str) -> PortResult<String>;

    /// Answers a question using the document text as context.
    async fn ask_question(&self, question: &str, context: &str) -> PortResult<String>;
}

#[async_trait]
pub trait PdfTextService: Send + Sync {
    async fn extract_text(&self, path: &Path) -> PortResult<String>;

    async fn page_count(&self, path: &Path) -> PortResult<u32>;
}

#[async_trait]
pub trait LibraryStore: Send + Sync {
    async fn load_categories(&self) -> PortResult<Vec<Category>>;

    async fn save_categories(&self, categories: &[Category]) -> PortResult<()>;
}

/// OS-protected secret storage.
pub trait SecretVault: Send + Sync {
    fn store(&self, key: &str, secret: &str) -> PortResult<()>;

    fn fetch(&self, key: &str) -> PortResult<String>;

    fn remove(&self, key: &str) -> PortResult<()>;
}
