//! services/api/src/web/library.rs
//!
//! PDF library: categories and the documents filed under them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::error::port_error_response;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
    /// Defaults to a folder icon.
    pub icon: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AddDocumentRequest {
    /// Local path of the PDF to copy into the library.
    pub path: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SummaryRequest {
    pub summary: String,
}

/// GET /library/categories
#[utoipa::path(
    get,
    path = "/library/categories",
    responses((status = 200, description = "Categories with their documents"))
)]
pub async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let categories = state.library.categories().await.map_err(|e| {
        error!("Failed to load library: {:?}", e);
        port_error_response(&e)
    })?;
    Ok(Json(categories))
}

/// POST /library/categories
#[utoipa::path(
    post,
    path = "/library/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created"),
        (status = 400, description = "Blank name")
    )
)]
pub async fn create_category_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let category = state
        .library
        .add_category(&req.name, req.icon.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to add category: {:?}", e);
            port_error_response(&e)
        })?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// DELETE /library/categories/{id}
#[utoipa::path(
    delete,
    path = "/library/categories/{id}",
    params(("id" = u32, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Unknown category")
    )
)]
pub async fn delete_category_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .library
        .delete_category(id)
        .await
        .map_err(|e| port_error_response(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /library/categories/{id}/documents - File a local PDF under a category
#[utoipa::path(
    post,
    path = "/library/categories/{id}/documents",
    params(("id" = u32, Path, description = "Category id")),
    request_body = AddDocumentRequest,
    responses(
        (status = 201, description = "Document added"),
        (status = 404, description = "Unknown category or missing file")
    )
)]
pub async fn add_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(req): Json<AddDocumentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let document = state
        .library
        .add_document(id, std::path::Path::new(req.path.trim()))
        .await
        .map_err(|e| {
            error!("Failed to add {} to category {}: {:?}", req.path, id, e);
            port_error_response(&e)
        })?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// DELETE /library/categories/{id}/documents/{doc_id}
#[utoipa::path(
    delete,
    path = "/library/categories/{id}/documents/{doc_id}",
    params(
        ("id" = u32, Path, description = "Category id"),
        ("doc_id" = u32, Path, description = "Document id")
    ),
    responses(
        (status = 204, description = "Document removed"),
        (status = 404, description = "Unknown category or document")
    )
)]
pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Path((id, doc_id)): Path<(u32, u32)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .library
        .delete_document(id, doc_id)
        .await
        .map_err(|e| port_error_response(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /library/categories/{id}/documents/{doc_id}/summary
#[utoipa::path(
    put,
    path = "/library/categories/{id}/documents/{doc_id}/summary",
    params(
        ("id" = u32, Path, description = "Category id"),
        ("doc_id" = u32, Path, description = "Document id")
    ),
    request_body = SummaryRequest,
    responses(
        (status = 200, description = "Summary stored"),
        (status = 404, description = "Unknown category or document")
    )
)]
pub async fn update_summary_handler(
    State(state): State<Arc<AppState>>,
    Path((id, doc_id)): Path<(u32, u32)>,
    Json(req): Json<SummaryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let document = state
        .library
        .update_summary(id, doc_id, &req.summary)
        .await
        .map_err(|e| port_error_response(&e))?;
    Ok(Json(document))
}
