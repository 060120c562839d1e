//! services/api/src/services/analyzer.rs
//!
//! PDF analysis and question answering. AI failures during analysis degrade to
//! warning texts, and history writes never fail a request.

use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use study_planner_core::domain::{ChatMessage, ChatRole, DocumentSummary, StoredPdfDocument};
use study_planner_core::ports::{
    AiService, ChatRepository, PdfDocumentRepository, PdfTextService, PortError, PortResult,
    DEFAULT_CHAT_LIMIT, DEFAULT_HISTORY_LIMIT,
};
use tracing::{info, warn};
use uuid::Uuid;

/// The analysis result plus the extracted text the client sends back as
/// question context.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDocument {
    pub summary: DocumentSummary,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    /// Whether both turns made it into the chat log.
    pub saved: bool,
}

#[derive(Clone)]
pub struct AnalyzerService {
    ai: Arc<dyn AiService>,
    pdf: Arc<dyn PdfTextService>,
    documents: Arc<dyn PdfDocumentRepository>,
    chat: Arc<dyn ChatRepository>,
}

impl AnalyzerService {
    pub fn new(
        ai: Arc<dyn AiService>,
        pdf: Arc<dyn PdfTextService>,
        documents: Arc<dyn PdfDocumentRepository>,
        chat: Arc<dyn ChatRepository>,
    ) -> Self {
        Self {
            ai,
            pdf,
            documents,
            chat,
        }
    }

    /// Extracts, summarises and (for a signed-in user) records a PDF.
    pub async fn process_pdf(&self, user_id: Option<Uuid>, path: &Path) -> PortResult<ProcessedDocument> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| PortError::NotFound(format!("PDF file {:?} not found", path)))?;
        if !metadata.is_file() {
            return Err(PortError::NotFound(format!("PDF file {:?} not found", path)));
        }

        let text = self.pdf.extract_text(path).await?;

        let summary = match self.ai.generate_summary(&text).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summary generation failed for {:?}: {}", path, e);
                format!(
                    "⚠️ The AI summary could not be generated.\n\nError: {}\n\nNote: the PDF content is ready for analysis, you can still ask questions.",
                    e
                )
            }
        };
        let models_used = match self.ai.extract_models(&text).await {
            Ok(models) => models,
            Err(e) => {
                warn!("Model extraction failed for {:?}: {}", path, e);
                format!("⚠️ Models could not be extracted: {}", e)
            }
        };

        let mut summary = DocumentSummary {
            document_id: None,
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            summary,
            models_used,
            upload_date: Utc::now(),
            file_size: metadata.len(),
            page_count: self.pdf.page_count(path).await?,
        };

        if let Some(user_id) = user_id {
            let local_path = path.to_string_lossy();
            match self
                .documents
                .upsert_from_summary(user_id, &local_path, &summary)
                .await
            {
                Ok(id) => summary.document_id = Some(id),
                Err(e) => warn!("Could not record {:?} for user {}: {}", path, user_id, e),
            }
        }

        info!(
            "Analysed {} ({} pages, {} bytes)",
            summary.file_name, summary.page_count, summary.file_size
        );
        Ok(ProcessedDocument { summary, text })
    }

    /// Answers `question` against `context`. Without a context, a stored
    /// document of the user is re-read from its local path. A document id must
    /// belong to the signed-in user.
    pub async fn ask(
        &self,
        user_id: Option<Uuid>,
        document_id: Option<Uuid>,
        question: &str,
        context: Option<&str>,
    ) -> PortResult<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PortError::Validation("Question must not be empty".to_string()));
        }

        let document = match (user_id, document_id) {
            (Some(user_id), Some(document_id)) => {
                Some(self.owned_document(user_id, document_id).await?)
            }
            _ => None,
        };

        let context = match (context.filter(|c| !c.trim().is_empty()), &document) {
            (Some(context), _) => context.to_string(),
            (None, Some(document)) => {
                self.pdf
                    .extract_text(Path::new(&document.local_file_path))
                    .await?
            }
            (None, None) => {
                return Err(PortError::Validation(
                    "Load a PDF before asking questions".to_string(),
                ))
            }
        };

        let asked_at = Utc::now();
        let answer = self.ai.ask_question(question, &context).await?;
        let answered_at = Utc::now();

        let saved = match &document {
            Some(document) => {
                self.record_turns(
                    document.user_id,
                    document.id,
                    question,
                    asked_at,
                    &answer,
                    answered_at,
                )
                .await
            }
            None => false,
        };

        Ok(Answer {
            question: question.to_string(),
            answer,
            saved,
        })
    }

    async fn owned_document(&self, user_id: Uuid, document_id: Uuid) -> PortResult<StoredPdfDocument> {
        self.documents
            .get_by_id(user_id, document_id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))
    }

    async fn record_turns(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        question: &str,
        asked_at: chrono::DateTime<Utc>,
        answer: &str,
        answered_at: chrono::DateTime<Utc>,
    ) -> bool {
        let turns = [
            (ChatRole::User, question, asked_at),
            (ChatRole::Assistant, answer, answered_at),
        ];
        for (role, content, timestamp) in turns {
            if let Err(e) = self
                .chat
                .add_message(user_id, document_id, role, content, timestamp)
                .await
            {
                warn!("Could not save chat turn for document {}: {}", document_id, e);
                return false;
            }
        }
        true
    }

    /// The user's analysed documents, newest first.
    pub async fn history(&self, user_id: Uuid) -> PortResult<Vec<StoredPdfDocument>> {
        self.documents.get_by_user(user_id, DEFAULT_HISTORY_LIMIT).await
    }

    pub async fn chat(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Vec<ChatMessage>> {
        self.owned_document(user_id, document_id).await?;
        self.chat
            .get_messages(user_id, document_id, DEFAULT_CHAT_LIMIT)
            .await
    }
}
