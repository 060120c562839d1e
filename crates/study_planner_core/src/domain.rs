//! crates/study_planner_core/src/domain.rs
//!
//! Defines the pure, core data structures for the study planner.
//! These structs are independent of any database or file format; adapters map
//! them to their own record types.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Study Plans
//=========================================================================================

/// How urgent a study session is. The ordinal values are part of the saved file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Priority {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    /// Accepts the variant name in any case, or its ordinal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(ordinal) = trimmed.parse::<u8>() {
            return Priority::ALL
                .get(ordinal as usize)
                .copied()
                .ok_or_else(|| format!("'{}' is not a valid priority", s));
        }
        Priority::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("'{}' is not a valid priority", s))
    }
}

/// A scheduled study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyPlanItem {
    pub id: Uuid,
    pub subject: String,
    /// Wall-clock time the session is planned for.
    pub date: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub actual_duration_minutes: u32,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl StudyPlanItem {
    /// A fresh item scheduled for now: 30 minutes, medium priority, not completed.
    pub fn new(subject: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            date: Local::now().naive_local(),
            duration_minutes: 30,
            actual_duration_minutes: 0,
            priority: Priority::Medium,
            is_completed: false,
            notes: String::new(),
            category: String::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.subject.trim().is_empty() {
            return Err("Subject must not be empty".to_string());
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    /// Planned duration as `H:MM`.
    pub fn duration_display(&self) -> String {
        format_minutes(self.duration_minutes)
    }

    pub fn actual_duration_display(&self) -> String {
        format_minutes(self.actual_duration_minutes)
    }
}

fn format_minutes(minutes: u32) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

//=========================================================================================
// Users & Sessions
//=========================================================================================

/// An account in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// Represents a login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// PDF Analysis
//=========================================================================================

/// The result of analysing one PDF: AI summary plus file metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Set once the summary has been stored for a signed-in user.
    pub document_id: Option<Uuid>,
    pub file_name: String,
    pub summary: String,
    pub models_used: String,
    pub upload_date: DateTime<Utc>,
    pub file_size: u64,
    pub page_count: u32,
}

impl DocumentSummary {
    pub fn file_size_display(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// A record in the `pdf_documents` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredPdfDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub local_file_path: String,
    pub summary: String,
    pub models_used: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_size: u64,
    pub page_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn is_user(&self) -> bool {
        matches!(self, ChatRole::User)
    }
}

/// One turn of a conversation about a document. Chat logs are append-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

//=========================================================================================
// PDF Library
//=========================================================================================

pub const DEFAULT_CATEGORY_ICON: &str = "📁";
pub const DEFAULT_CATEGORY_COLOR: &str = "#2196F3";

/// A library shelf such as "Mathematics", holding PDF entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    pub icon: String,
    pub color: String,
    #[serde(default)]
    pub documents: Vec<LibraryDocument>,
}

impl Category {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            icon: DEFAULT_CATEGORY_ICON.to_string(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            documents: Vec::new(),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.icon, self.name)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryDocument {
    pub id: u32,
    pub category_id: u32,
    pub title: String,
    pub file_path: String,
    pub summary: String,
    pub added_at: NaiveDateTime,
    pub file_size: u64,
    pub page_count: u32,
}

impl LibraryDocument {
    /// The summary cut to 100 characters for list views.
    pub fn short_summary(&self) -> String {
        if self.summary.trim().is_empty() {
            return "No summary".to_string();
        }
        if self.summary.chars().count() > 100 {
            let head: String = self.summary.chars().take(97).collect();
            format!("{}...", head)
        } else {
            self.summary.clone()
        }
    }
}

/// Human-readable file size: bytes, KB or MB with two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_names_and_ordinals() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("Critical".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!("0".parse::<Priority>().unwrap(), Priority::Low);
        assert!("7".parse::<Priority>().is_err());
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn new_item_has_desktop_defaults() {
        let item = StudyPlanItem::new("Linear Algebra");
        assert_eq!(item.duration_minutes, 30);
        assert_eq!(item.priority, Priority::Medium);
        assert!(!item.is_completed);
        assert!(item.validate().is_ok());
        assert_eq!(item.duration_display(), "0:30");
    }

    #[test]
    fn blank_subject_is_invalid() {
        let item = StudyPlanItem::new("   ");
        assert!(item.validate().is_err());
    }

    #[test]
    fn negative_duration_is_rejected_at_the_boundary() {
        let mut value = serde_json::to_value(StudyPlanItem::new("Physics")).unwrap();
        value["duration_minutes"] = serde_json::json!(-5);
        assert!(serde_json::from_value::<StudyPlanItem>(value).is_err());
    }

    #[test]
    fn file_sizes_are_human_readable() {
        assert_eq!(format_file_size(512), "512 bytes");
        assert_eq!(format_file_size(2048), "2.00 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn short_summary_is_truncated() {
        let doc = LibraryDocument {
            id: 1,
            category_id: 1,
            title: "Notes".into(),
            file_path: "notes.pdf".into(),
            summary: "x".repeat(150),
            added_at: Local::now().naive_local(),
            file_size: 0,
            page_count: 0,
        };
        let short = doc.short_summary();
        assert_eq!(short.chars().count(), 100);
        assert!(short.ends_with("..."));
    }
}
