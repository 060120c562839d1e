//! services/api/src/adapters/pdf.rs
//!
//! PDF reading (text and page count for the analyzer and the library) and the
//! plain-text PDF reports exported from the plan list and the statistics view.
//! `lopdf` is synchronous, so every call runs on the blocking pool.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use study_planner_core::domain::StudyPlanItem;
use study_planner_core::ports::{PdfTextService, PortError, PortResult};
use study_planner_core::stats::PlanStatistics;
use tracing::{debug, info};

//=========================================================================================
// Text extraction
//=========================================================================================

#[derive(Clone, Copy, Debug, Default)]
pub struct LopdfTextService;

impl LopdfTextService {
    pub fn new() -> Self {
        Self
    }
}

fn load_document(path: &Path) -> PortResult<Document> {
    if !path.exists() {
        return Err(PortError::NotFound(format!("PDF file {:?} not found", path)));
    }
    Document::load(path)
        .map_err(|e| PortError::Unexpected(format!("Failed to read PDF {:?}: {}", path, e)))
}

async fn blocking<T, F>(task: F) -> PortResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> PortResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| PortError::Unexpected(format!("PDF task failed: {}", e)))?
}

#[async_trait]
impl PdfTextService for LopdfTextService {
    async fn extract_text(&self, path: &Path) -> PortResult<String> {
        let path = path.to_path_buf();
        blocking(move || {
            let document = load_document(&path)?;
            let mut pages = Vec::new();
            for page_number in document.get_pages().keys() {
                // Pages without a text layer (scans, images) extract as empty.
                let text = document.extract_text(&[*page_number]).unwrap_or_default();
                pages.push(text.trim_end().to_string());
            }
            debug!("Extracted {} pages of text from {:?}", pages.len(), path);
            Ok(pages.join("\n"))
        })
        .await
    }

    async fn page_count(&self, path: &Path) -> PortResult<u32> {
        let path = path.to_path_buf();
        blocking(move || Ok(load_document(&path)?.get_pages().len() as u32)).await
    }
}

//=========================================================================================
// Report export
//=========================================================================================

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 10;
const LEADING: i64 = 14;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// Writes one-column Courier reports.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReportExporter;

impl ReportExporter {
    pub fn new() -> Self {
        Self
    }

    pub async fn export_plans(&self, items: &[StudyPlanItem], path: &Path) -> PortResult<()> {
        let lines = plan_report_lines(items, Local::now());
        write_report(lines, path.to_path_buf()).await
    }

    pub async fn export_statistics(&self, stats: &PlanStatistics, path: &Path) -> PortResult<()> {
        let lines = statistics_report_lines(stats, Local::now());
        write_report(lines, path.to_path_buf()).await
    }
}

fn priority_label(item: &StudyPlanItem) -> &'static str {
    item.priority.as_str()
}

fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        format!("{:<width$}", text, width = width)
    } else {
        let head: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

pub fn plan_report_lines(items: &[StudyPlanItem], generated_at: DateTime<Local>) -> Vec<String> {
    let total = items.len();
    let completed = items.iter().filter(|i| i.is_completed).count();
    let rate = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };
    let total_minutes: u64 = items.iter().map(|i| u64::from(i.duration_minutes)).sum();

    let mut lines = vec![
        "Study Plans Report".to_string(),
        format!("Generated: {}", generated_at.format("%d.%m.%Y %H:%M")),
        String::new(),
        "SUMMARY".to_string(),
        format!("Total plans:    {}", total),
        format!("Completed:      {}", completed),
        format!("Success rate:   {:.1}%", rate),
        format!("Total hours:    {:.1}h", total_minutes as f64 / 60.0),
        String::new(),
        "STUDY PLANS".to_string(),
        format!(
            "{} {} {} {} {}",
            fit("Subject", 30),
            fit("Date", 10),
            fit("Duration", 8),
            fit("Priority", 8),
            "Status"
        ),
        "-".repeat(78),
    ];

    let mut sorted: Vec<&StudyPlanItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));
    for item in sorted {
        lines.push(format!(
            "{} {} {} {} {}",
            fit(&item.subject, 30),
            fit(&item.date.format("%d.%m.%Y").to_string(), 10),
            fit(&format!("{}min", item.duration_minutes), 8),
            fit(priority_label(item), 8),
            if item.is_completed { "Completed" } else { "Pending" }
        ));
    }
    lines
}

pub fn statistics_report_lines(stats: &PlanStatistics, generated_at: DateTime<Local>) -> Vec<String> {
    let mut lines = vec![
        "Study Statistics Report".to_string(),
        format!("Report date: {}", generated_at.format("%d.%m.%Y %H:%M")),
        String::new(),
        "GENERAL STATISTICS".to_string(),
        format!("Total plans:    {}", stats.total_plans),
        format!("Completed:      {}", stats.completed_plans),
        format!("Success rate:   {:.1}%", stats.completion_rate),
        format!("Total study:    {:.1}h", stats.total_study_hours()),
        format!("Most studied:   {}", stats.most_studied_category),
        String::new(),
        "LAST 7 DAYS".to_string(),
        format!("{} {} {} {}", fit("Day", 12), fit("Minutes", 8), fit("Plans", 6), "Done"),
    ];
    for day in &stats.weekly {
        lines.push(format!(
            "{} {} {} {}",
            fit(&format!("{} {}", day.day_name, day.date.format("%d.%m")), 12),
            fit(&day.total_minutes.to_string(), 8),
            fit(&day.plan_count.to_string(), 6),
            day.completed_count
        ));
    }

    lines.push(String::new());
    lines.push("CATEGORIES".to_string());
    lines.push(format!(
        "{} {} {} {}",
        fit("Category", 24),
        fit("Hours", 8),
        fit("Plans", 6),
        "Completion"
    ));
    if stats.categories.is_empty() {
        lines.push("No categorised plans yet.".to_string());
    }
    for category in &stats.categories {
        lines.push(format!(
            "{} {} {} {:.1}%",
            fit(&category.category_name, 24),
            fit(&format!("{:.1}", category.hours()), 8),
            fit(&category.plan_count.to_string(), 6),
            category.completion_rate()
        ));
    }
    lines
}

/// Latin-1 subset of WinAnsi; anything else prints as `?`.
fn encode_line(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
        .collect()
}

fn build_document(lines: &[String]) -> Result<Document, lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![&lines[..]]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    let mut kids: Vec<Object> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
        ];
        for line in chunk {
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_line(line))],
            ));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

async fn write_report(lines: Vec<String>, path: PathBuf) -> PortResult<()> {
    if path.as_os_str().is_empty() {
        return Err(PortError::Validation("Export path must not be empty".to_string()));
    }
    blocking(move || {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| PortError::Unexpected(format!("I/O error creating {:?}: {}", parent, e)))?;
        }
        let mut document = build_document(&lines)
            .map_err(|e| PortError::Unexpected(format!("Failed to build PDF: {}", e)))?;
        document
            .save(&path)
            .map_err(|e| PortError::Unexpected(format!("I/O error saving {:?}: {}", path, e)))?;
        info!("Exported report with {} lines to {:?}", lines.len(), path);
        Ok(())
    })
    .await
}
