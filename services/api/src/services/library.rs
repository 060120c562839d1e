//! services/api/src/services/library.rs
//!
//! The PDF library: categories holding copied PDF files. The whole category
//! list is rewritten through the `LibraryStore` after every change.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use study_planner_core::domain::{Category, LibraryDocument, DEFAULT_CATEGORY_ICON};
use study_planner_core::ports::{LibraryStore, PdfTextService, PortError, PortResult};
use study_planner_core::stats::category_color;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub const LIBRARY_DIR_NAME: &str = "PdfLibrary";
pub const PLACEHOLDER_SUMMARY: &str =
    "Summary not generated yet. Use the document analysis window to summarise it.";

pub struct LibraryService {
    store: Arc<dyn LibraryStore>,
    pdf: Arc<dyn PdfTextService>,
    library_dir: PathBuf,
    // Serialises load-modify-save cycles.
    write_lock: Mutex<()>,
}

impl LibraryService {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        pdf: Arc<dyn PdfTextService>,
        library_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            pdf,
            library_dir: library_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    pub async fn categories(&self) -> PortResult<Vec<Category>> {
        self.store.load_categories().await
    }

    pub async fn add_category(&self, name: &str, icon: Option<&str>) -> PortResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PortError::Validation("Category name is required".to_string()));
        }
        let _guard = self.write_lock.lock().await;
        let mut categories = self.store.load_categories().await?;

        let id = categories.iter().map(|c| c.id).max().map_or(1, |max| max + 1);
        let icon = icon
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .unwrap_or(DEFAULT_CATEGORY_ICON);
        let category = Category {
            id,
            name: name.to_string(),
            icon: icon.to_string(),
            color: category_color(name).to_string(),
            documents: Vec::new(),
        };
        categories.push(category.clone());
        self.store.save_categories(&categories).await?;

        info!("Added library category {} ({})", category.name, category.id);
        Ok(category)
    }

    /// Removes the category and its entries. Copied files stay on disk.
    pub async fn delete_category(&self, category_id: u32) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut categories = self.store.load_categories().await?;
        let before = categories.len();
        categories.retain(|c| c.id != category_id);
        if categories.len() == before {
            return Err(PortError::NotFound(format!("Category {} not found", category_id)));
        }
        self.store.save_categories(&categories).await
    }

    /// Copies `source` into the library folder and files it under the category.
    pub async fn add_document(&self, category_id: u32, source: &Path) -> PortResult<LibraryDocument> {
        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|_| PortError::NotFound(format!("PDF file {:?} not found", source)))?;
        if !metadata.is_file() {
            return Err(PortError::NotFound(format!("PDF file {:?} not found", source)));
        }

        let _guard = self.write_lock.lock().await;
        let mut categories = self.store.load_categories().await?;
        let category = categories
            .iter_mut()
            .find(|c| c.id == category_id)
            .ok_or_else(|| PortError::NotFound(format!("Category {} not found", category_id)))?;

        let page_count = match self.pdf.page_count(source).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!("Could not count pages of {:?}: {}", source, e);
                0
            }
        };
        let file_path = self.copy_to_library(source).await;

        let document = LibraryDocument {
            id: category
                .documents
                .iter()
                .map(|d| d.id)
                .max()
                .map_or(1, |max| max + 1),
            category_id,
            title: source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_path: file_path.to_string_lossy().into_owned(),
            summary: PLACEHOLDER_SUMMARY.to_string(),
            added_at: Local::now().naive_local(),
            file_size: metadata.len(),
            page_count,
        };
        category.documents.push(document.clone());
        self.store.save_categories(&categories).await?;

        info!(
            "Added '{}' to library category {}",
            document.title, category_id
        );
        Ok(document)
    }

    /// Falls back to the original path when the copy fails.
    async fn copy_to_library(&self, source: &Path) -> PathBuf {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let destination = self
            .library_dir
            .join(format!("{}_{}", Uuid::new_v4(), file_name));

        let copied = async {
            tokio::fs::create_dir_all(&self.library_dir).await?;
            tokio::fs::copy(source, &destination).await
        }
        .await;
        match copied {
            Ok(_) => destination,
            Err(e) => {
                warn!("Keeping {:?} in place, copy failed: {}", source, e);
                source.to_path_buf()
            }
        }
    }

    pub async fn delete_document(&self, category_id: u32, document_id: u32) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut categories = self.store.load_categories().await?;
        let category = categories
            .iter_mut()
            .find(|c| c.id == category_id)
            .ok_or_else(|| PortError::NotFound(format!("Category {} not found", category_id)))?;
        let before = category.documents.len();
        category.documents.retain(|d| d.id != document_id);
        if category.documents.len() == before {
            return Err(PortError::NotFound(format!("Document {} not found", document_id)));
        }
        self.store.save_categories(&categories).await
    }

    pub async fn update_summary(
        &self,
        category_id: u32,
        document_id: u32,
        summary: &str,
    ) -> PortResult<LibraryDocument> {
        let _guard = self.write_lock.lock().await;
        let mut categories = self.store.load_categories().await?;
        let document = categories
            .iter_mut()
            .find(|c| c.id == category_id)
            .and_then(|c| c.documents.iter_mut().find(|d| d.id == document_id))
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))?;
        document.summary = summary.to_string();
        let updated = document.clone();
        self.store.save_categories(&categories).await?;
        Ok(updated)
    }
}
