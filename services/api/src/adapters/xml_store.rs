//! services/api/src/adapters/xml_store.rs
//!
//! File adapters for the two XML documents the planner keeps on disk: the study
//! plan list (`ArrayOfStudyPlanItem`) and the PDF library (`PdfLibraryData`).
//! Element names are PascalCase so files written by the desktop app load as-is.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesText, Event};
use quick_xml::se::Serializer;
use quick_xml::{Reader, Writer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use study_planner_core::domain::{Category, LibraryDocument, Priority, StudyPlanItem};
use study_planner_core::ports::{LibraryStore, PlanArchive, PortError, PortResult};
use tracing::{info, warn};
use uuid::Uuid;

pub const PLANS_FILE_NAME: &str = "studyplans.xml";
pub const LIBRARY_FILE_NAME: &str = "pdf_library.xml";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

fn to_xml<T: Serialize>(value: &T) -> Result<String, PortError> {
    let mut body = String::new();
    let mut serializer = Serializer::new(&mut body);
    serializer.indent(' ', 2);
    value
        .serialize(serializer)
        .map_err(|e| PortError::Unexpected(format!("Failed to write XML: {}", e)))?;
    Ok(format!("{}{}", XML_DECLARATION, body))
}

/// Parses a document without losing the edge whitespace of element values.
fn from_xml<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let protected = protect_edge_whitespace(raw)?;
    quick_xml::de::from_str(&protected).map_err(|e| e.to_string())
}

/// The serde deserializer trims text values. Rewrites leading and trailing
/// whitespace of every leaf value as character references, which survive the
/// trim and unescape back to the same characters.
fn protect_edge_whitespace(raw: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(raw);
    let mut writer = Writer::new(Vec::new());
    let mut after_start = false;
    // Text directly after a start tag; a leaf value if an end tag follows.
    let mut held: Option<BytesText<'static>> = None;

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match event {
            Event::Eof => break,
            Event::Text(text) if after_start => {
                held = Some(text.into_owned());
                after_start = false;
                continue;
            }
            Event::End(end) => {
                if let Some(text) = held.take() {
                    let escaped = escape_edges(&text)?;
                    writer
                        .write_event(Event::Text(BytesText::from_escaped(escaped)))
                        .map_err(|e| e.to_string())?;
                }
                writer
                    .write_event(Event::End(end))
                    .map_err(|e| e.to_string())?;
                after_start = false;
            }
            other => {
                if let Some(text) = held.take() {
                    writer
                        .write_event(Event::Text(text))
                        .map_err(|e| e.to_string())?;
                }
                after_start = matches!(other, Event::Start(_));
                writer.write_event(other).map_err(|e| e.to_string())?;
            }
        }
    }
    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}

fn escape_edges(text: &[u8]) -> Result<String, String> {
    let raw = std::str::from_utf8(text).map_err(|e| e.to_string())?;
    let rest = raw.trim_start();
    let lead = &raw[..raw.len() - rest.len()];
    let body = rest.trim_end();
    let trail = &rest[body.len()..];
    Ok(format!("{}{}{}", char_refs(lead), body, char_refs(trail)))
}

fn char_refs(whitespace: &str) -> String {
    whitespace
        .chars()
        .map(|c| format!("&#{};", u32::from(c)))
        .collect()
}

async fn write_file(path: &Path, contents: String) -> PortResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PortError::Unexpected(format!("I/O error creating {:?}: {}", parent, e)))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| PortError::Unexpected(format!("I/O error saving {:?}: {}", path, e)))
}

/// Accepts `2024-03-01T09:00:00[.fff]` as well as RFC 3339 with an offset.
fn parse_local_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|d| d.naive_local()))
        .map_err(|_| format!("'{}' is not a valid date", raw))
}

fn parse_utc_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .or_else(|_| parse_local_datetime(raw).map(|d| d.and_utc()))
}

fn format_local_datetime(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

//=========================================================================================
// Study plan archive
//=========================================================================================

#[derive(Serialize, Deserialize)]
#[serde(rename = "ArrayOfStudyPlanItem")]
struct PlanListXml {
    #[serde(rename = "StudyPlanItem", default)]
    items: Vec<PlanItemXml>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlanItemXml {
    id: Uuid,
    created_date: String,
    modified_date: String,
    date: String,
    duration_minutes: u32,
    #[serde(default)]
    actual_duration_minutes: u32,
    subject: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    priority: String,
    #[serde(default)]
    is_completed: bool,
}

impl PlanItemXml {
    fn from_domain(item: &StudyPlanItem) -> Self {
        Self {
            id: item.id,
            created_date: item.created_at.to_rfc3339(),
            modified_date: item.modified_at.to_rfc3339(),
            date: format_local_datetime(&item.date),
            duration_minutes: item.duration_minutes,
            actual_duration_minutes: item.actual_duration_minutes,
            subject: item.subject.clone(),
            notes: item.notes.clone(),
            category: item.category.clone(),
            priority: item.priority.to_string(),
            is_completed: item.is_completed,
        }
    }

    fn to_domain(self) -> Result<StudyPlanItem, String> {
        let priority = if self.priority.trim().is_empty() {
            Priority::default()
        } else {
            self.priority.parse()?
        };
        Ok(StudyPlanItem {
            id: self.id,
            subject: self.subject,
            date: parse_local_datetime(&self.date)?,
            duration_minutes: self.duration_minutes,
            actual_duration_minutes: self.actual_duration_minutes,
            priority,
            is_completed: self.is_completed,
            notes: self.notes,
            category: self.category,
            created_at: parse_utc_datetime(&self.created_date)?,
            modified_at: parse_utc_datetime(&self.modified_date)?,
        })
    }
}

/// Reads and writes the plan list as XML.
#[derive(Clone, Debug)]
pub struct XmlPlanArchive {
    default_path: PathBuf,
}

impl XmlPlanArchive {
    pub fn new(default_path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: default_path.into(),
        }
    }

    /// `{data_dir}/studyplans.xml`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(PLANS_FILE_NAME))
    }

    pub fn default_path(&self) -> &Path {
        &self.default_path
    }
}

fn require_path(path: &Path) -> PortResult<()> {
    if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
        return Err(PortError::Validation("File path must not be empty".to_string()));
    }
    Ok(())
}

#[async_trait]
impl PlanArchive for XmlPlanArchive {
    async fn load_from(&self, path: &Path) -> PortResult<Vec<StudyPlanItem>> {
        require_path(path)?;
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PortError::Unexpected(format!("I/O error loading {:?}: {}", path, e)))?;
        let parsed: PlanListXml = from_xml(&raw)
            .map_err(|e| PortError::Unexpected(format!("I/O error loading {:?}: {}", path, e)))?;

        let items = parsed
            .items
            .into_iter()
            .map(PlanItemXml::to_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PortError::Unexpected(format!("I/O error loading {:?}: {}", path, e)))?;
        info!("Loaded {} study plans from {:?}", items.len(), path);
        Ok(items)
    }

    async fn save_to(&self, items: &[StudyPlanItem], path: &Path) -> PortResult<()> {
        require_path(path)?;
        let document = PlanListXml {
            items: items.iter().map(PlanItemXml::from_domain).collect(),
        };
        write_file(path, to_xml(&document)?).await?;
        info!("Saved {} study plans to {:?}", items.len(), path);
        Ok(())
    }

    async fn load(&self) -> PortResult<Vec<StudyPlanItem>> {
        self.load_from(&self.default_path).await
    }

    async fn save(&self, items: &[StudyPlanItem]) -> PortResult<()> {
        self.save_to(items, &self.default_path).await
    }
}

//=========================================================================================
// PDF library
//=========================================================================================

#[derive(Serialize, Deserialize, Default)]
#[serde(rename = "PdfLibraryData")]
struct LibraryXml {
    #[serde(rename = "Categories", default)]
    categories: CategoryListXml,
}

#[derive(Serialize, Deserialize, Default)]
struct CategoryListXml {
    #[serde(rename = "CategoryData", default)]
    items: Vec<CategoryXml>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CategoryXml {
    id: u32,
    name: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    documents: DocumentListXml,
}

#[derive(Serialize, Deserialize, Default)]
struct DocumentListXml {
    #[serde(rename = "PdfDocumentData", default)]
    items: Vec<DocumentXml>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DocumentXml {
    id: u32,
    category_id: u32,
    title: String,
    file_path: String,
    #[serde(default)]
    summary: String,
    added_date: String,
    #[serde(default)]
    file_size: u64,
    #[serde(default)]
    page_count: u32,
}

impl CategoryXml {
    fn from_domain(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            icon: category.icon.clone(),
            color: category.color.clone(),
            documents: DocumentListXml {
                items: category
                    .documents
                    .iter()
                    .map(|doc| DocumentXml {
                        id: doc.id,
                        category_id: doc.category_id,
                        title: doc.title.clone(),
                        file_path: doc.file_path.clone(),
                        summary: doc.summary.clone(),
                        added_date: format_local_datetime(&doc.added_at),
                        file_size: doc.file_size,
                        page_count: doc.page_count,
                    })
                    .collect(),
            },
        }
    }

    fn to_domain(self) -> Result<Category, String> {
        let documents = self
            .documents
            .items
            .into_iter()
            .map(|doc| {
                Ok(LibraryDocument {
                    id: doc.id,
                    category_id: doc.category_id,
                    title: doc.title,
                    file_path: doc.file_path,
                    summary: doc.summary,
                    added_at: parse_local_datetime(&doc.added_date)?,
                    file_size: doc.file_size,
                    page_count: doc.page_count,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;
        Ok(Category {
            id: self.id,
            name: self.name,
            icon: self.icon,
            color: self.color,
            documents,
        })
    }
}

/// The five shelves a fresh library starts with.
pub fn default_categories() -> Vec<Category> {
    [
        ("Mathematics", "📐", "#2196F3"),
        ("Physics", "⚛️", "#FF5722"),
        ("Chemistry", "🧪", "#4CAF50"),
        ("Biology", "🧬", "#9C27B0"),
        ("Literature", "📚", "#FF9800"),
    ]
    .iter()
    .zip(1u32..)
    .map(|(&(name, icon, color), id)| Category {
        id,
        name: name.to_string(),
        icon: icon.to_string(),
        color: color.to_string(),
        documents: Vec::new(),
    })
    .collect()
}

#[derive(Clone, Debug)]
pub struct XmlLibraryStore {
    path: PathBuf,
}

impl XmlLibraryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `{data_dir}/pdf_library.xml`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(LIBRARY_FILE_NAME))
    }

    async fn read(&self) -> Result<Vec<Category>, String> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| e.to_string())?;
        let parsed: LibraryXml = from_xml(&raw)?;
        parsed
            .categories
            .items
            .into_iter()
            .map(CategoryXml::to_domain)
            .collect()
    }
}

#[async_trait]
impl LibraryStore for XmlLibraryStore {
    async fn load_categories(&self) -> PortResult<Vec<Category>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(default_categories());
        }
        match self.read().await {
            Ok(categories) => Ok(categories),
            Err(e) => {
                warn!(
                    "Library file {:?} is unreadable, using defaults: {}",
                    self.path, e
                );
                Ok(default_categories())
            }
        }
    }

    async fn save_categories(&self, categories: &[Category]) -> PortResult<()> {
        let document = LibraryXml {
            categories: CategoryListXml {
                items: categories.iter().map(CategoryXml::from_domain).collect(),
            },
        };
        write_file(&self.path, to_xml(&document)?).await
    }
}
