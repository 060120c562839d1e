//! services/api/src/web/plans.rs
//!
//! Study-plan list: CRUD over the in-memory list, explicit XML save/load,
//! statistics and PDF export.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use study_planner_core::domain::{Priority, StudyPlanItem};
use study_planner_core::plans::PlanFilter;
use study_planner_core::stats::PlanStatistics;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::port_error_response;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// Editable fields of a plan. Omitted fields keep their defaults on create.
#[derive(Deserialize, ToSchema)]
pub struct PlanRequest {
    pub subject: String,
    pub date: Option<NaiveDateTime>,
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub actual_duration_minutes: u32,
    /// `Low`, `Medium`, `High`, `Critical` or the ordinal.
    pub priority: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Deserialize, IntoParams)]
pub struct PlanQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub completed_only: bool,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct FileRequest {
    /// Target file; the default plans file when omitted.
    pub path: Option<String>,
}

#[derive(Deserialize, ToSchema, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    #[default]
    Plans,
    Statistics,
}

#[derive(Deserialize, ToSchema)]
pub struct ExportRequest {
    pub path: String,
    #[serde(default)]
    pub kind: ReportKind,
}

#[derive(Serialize, ToSchema)]
pub struct FileResponse {
    pub path: String,
    pub count: usize,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn apply_request(item: &mut StudyPlanItem, req: PlanRequest) -> Result<(), (StatusCode, String)> {
    item.subject = req.subject.trim().to_string();
    if let Some(date) = req.date {
        item.date = date;
    }
    if let Some(minutes) = req.duration_minutes {
        item.duration_minutes = minutes;
    }
    item.actual_duration_minutes = req.actual_duration_minutes;
    if let Some(raw) = req.priority {
        item.priority = raw
            .parse::<Priority>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    }
    item.is_completed = req.is_completed;
    item.notes = req.notes;
    item.category = req.category.trim().to_string();
    item.validate().map_err(|e| (StatusCode::BAD_REQUEST, e))
}

async fn find_plan(state: &AppState, id: Uuid) -> Result<StudyPlanItem, (StatusCode, String)> {
    state
        .plans
        .get_by_id(id)
        .await
        .map_err(|e| port_error_response(&e))?
        .ok_or((StatusCode::NOT_FOUND, format!("Study plan {} not found", id)))
}

async fn all_plans(state: &AppState) -> Result<Vec<StudyPlanItem>, (StatusCode, String)> {
    state.plans.get_all().await.map_err(|e| {
        error!("Failed to read plans: {:?}", e);
        port_error_response(&e)
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /plans - The filtered plan list, newest first
#[utoipa::path(
    get,
    path = "/plans",
    params(PlanQuery),
    responses((status = 200, description = "Matching study plans"))
)]
pub async fn list_plans_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlanQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let filter = PlanFilter {
        search: query.search,
        completed_only: query.completed_only,
    };
    Ok(Json(filter.apply(all_plans(&state).await?)))
}

/// POST /plans - Add a plan
#[utoipa::path(
    post,
    path = "/plans",
    request_body = PlanRequest,
    responses(
        (status = 201, description = "Plan created"),
        (status = 400, description = "Invalid plan")
    )
)]
pub async fn create_plan_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlanRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut item = StudyPlanItem::new(req.subject.clone());
    apply_request(&mut item, req)?;
    let item = state.plans.add(item).await.map_err(|e| {
        error!("Failed to add plan: {:?}", e);
        port_error_response(&e)
    })?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /plans/{id}
#[utoipa::path(
    get,
    path = "/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan id")),
    responses(
        (status = 200, description = "The plan"),
        (status = 404, description = "Unknown plan")
    )
)]
pub async fn get_plan_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    Ok(Json(find_plan(&state, id).await?))
}

/// PUT /plans/{id} - Replace the editable fields of a plan
#[utoipa::path(
    put,
    path = "/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan id")),
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Plan updated"),
        (status = 400, description = "Invalid plan"),
        (status = 404, description = "Unknown plan")
    )
)]
pub async fn update_plan_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PlanRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut item = find_plan(&state, id).await?;
    apply_request(&mut item, req)?;
    let item = state.plans.update(item).await.map_err(|e| {
        error!("Failed to update plan {}: {:?}", id, e);
        port_error_response(&e)
    })?;
    Ok(Json(item))
}

/// DELETE /plans/{id}
#[utoipa::path(
    delete,
    path = "/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan id")),
    responses(
        (status = 204, description = "Plan deleted"),
        (status = 404, description = "Unknown plan")
    )
)]
pub async fn delete_plan_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let removed = state
        .plans
        .delete(id)
        .await
        .map_err(|e| port_error_response(&e))?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("Study plan {} not found", id)))
    }
}

/// POST /plans/{id}/toggle - Flip the completed flag
#[utoipa::path(
    post,
    path = "/plans/{id}/toggle",
    params(("id" = Uuid, Path, description = "Plan id")),
    responses(
        (status = 200, description = "Plan updated"),
        (status = 404, description = "Unknown plan")
    )
)]
pub async fn toggle_plan_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut item = find_plan(&state, id).await?;
    item.is_completed = !item.is_completed;
    let item = state
        .plans
        .update(item)
        .await
        .map_err(|e| port_error_response(&e))?;
    Ok(Json(item))
}

/// POST /plans/save - Write the list to XML
#[utoipa::path(
    post,
    path = "/plans/save",
    request_body = FileRequest,
    responses(
        (status = 200, description = "Plans saved", body = FileResponse),
        (status = 400, description = "Invalid path"),
        (status = 500, description = "Write failed")
    )
)]
pub async fn save_plans_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<FileRequest>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let items = all_plans(&state).await?;

    let path = match req.path {
        Some(path) => {
            let path = PathBuf::from(path);
            state.archive.save_to(&items, &path).await.map(|_| path)
        }
        None => state
            .archive
            .save(&items)
            .await
            .map(|_| state.config.plans_file()),
    }
    .map_err(|e| {
        error!("Failed to save plans: {:?}", e);
        port_error_response(&e)
    })?;

    info!("Saved {} plans to {:?}", items.len(), path);
    Ok(Json(FileResponse {
        path: path.to_string_lossy().into_owned(),
        count: items.len(),
    }))
}

/// POST /plans/load - Replace the list with the contents of an XML file
#[utoipa::path(
    post,
    path = "/plans/load",
    request_body = FileRequest,
    responses(
        (status = 200, description = "The loaded plans"),
        (status = 400, description = "Invalid path"),
        (status = 500, description = "Unreadable file")
    )
)]
pub async fn load_plans_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<FileRequest>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let loaded = match req.path {
        Some(path) => state.archive.load_from(std::path::Path::new(&path)).await,
        None => state.archive.load().await,
    }
    .map_err(|e| {
        error!("Failed to load plans: {:?}", e);
        port_error_response(&e)
    })?;

    state
        .plans
        .replace_all(loaded)
        .await
        .map_err(|e| port_error_response(&e))?;
    let items = all_plans(&state).await?;
    info!("Loaded {} plans", items.len());
    Ok(Json(items))
}

/// GET /plans/stats - Figures of the statistics screen
#[utoipa::path(
    get,
    path = "/plans/stats",
    responses((status = 200, description = "Plan statistics"))
)]
pub async fn plan_stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let items = all_plans(&state).await?;
    Ok(Json(PlanStatistics::compute(&items, Local::now().date_naive())))
}

/// POST /plans/export - Write a PDF report of the plans or of the statistics
#[utoipa::path(
    post,
    path = "/plans/export",
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Report written", body = FileResponse),
        (status = 400, description = "Missing path"),
        (status = 500, description = "Write failed")
    )
)]
pub async fn export_plans_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExportRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.path.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "An export path is required".to_string()));
    }
    let path = PathBuf::from(req.path.trim());
    let items = all_plans(&state).await?;

    let written = match req.kind {
        ReportKind::Plans => state.exporter.export_plans(&items, &path).await,
        ReportKind::Statistics => {
            let stats = PlanStatistics::compute(&items, Local::now().date_naive());
            state.exporter.export_statistics(&stats, &path).await
        }
    };
    written.map_err(|e| {
        error!("Failed to export report to {:?}: {:?}", path, e);
        port_error_response(&e)
    })?;

    Ok(Json(FileResponse {
        path: path.to_string_lossy().into_owned(),
        count: items.len(),
    }))
}
