//! services/api/src/web/rest.rs
//!
//! The health check and the master definition for the OpenAPI specification.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{analyzer, auth, focus, library, plans};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::auto_login_handler,
        auth::logout_handler,
        auth::me_handler,
        auth::update_profile_handler,
        auth::change_password_handler,
        plans::list_plans_handler,
        plans::create_plan_handler,
        plans::get_plan_handler,
        plans::update_plan_handler,
        plans::delete_plan_handler,
        plans::toggle_plan_handler,
        plans::save_plans_handler,
        plans::load_plans_handler,
        plans::plan_stats_handler,
        plans::export_plans_handler,
        library::list_categories_handler,
        library::create_category_handler,
        library::delete_category_handler,
        library::add_document_handler,
        library::delete_document_handler,
        library::update_summary_handler,
        analyzer::process_pdf_handler,
        analyzer::ask_handler,
        analyzer::history_handler,
        analyzer::chat_handler,
        focus::focus_status_handler,
        focus::focus_duration_handler,
        focus::focus_toggle_handler,
        focus::focus_reset_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::ProfileRequest,
            auth::ChangePasswordRequest,
            auth::AuthResponse,
            plans::PlanRequest,
            plans::FileRequest,
            plans::ExportRequest,
            plans::ReportKind,
            plans::FileResponse,
            library::CategoryRequest,
            library::AddDocumentRequest,
            library::SummaryRequest,
            analyzer::ProcessRequest,
            analyzer::AskRequest,
            focus::DurationRequest,
        )
    ),
    tags(
        (name = "Study Planner API", description = "Study plans, PDF library, document analysis and focus timer.")
    )
)]
pub struct ApiDoc;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
