pub mod analyzer;
pub mod auth;
pub mod focus;
pub mod library;
pub mod middleware;
pub mod plans;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::AppState;

/// Every route of the service, with the auth middleware on the per-user ones.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/auto-login", post(auth::auto_login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route(
            "/plans",
            get(plans::list_plans_handler).post(plans::create_plan_handler),
        )
        .route("/plans/save", post(plans::save_plans_handler))
        .route("/plans/load", post(plans::load_plans_handler))
        .route("/plans/stats", get(plans::plan_stats_handler))
        .route("/plans/export", post(plans::export_plans_handler))
        .route(
            "/plans/{id}",
            get(plans::get_plan_handler)
                .put(plans::update_plan_handler)
                .delete(plans::delete_plan_handler),
        )
        .route("/plans/{id}/toggle", post(plans::toggle_plan_handler))
        .route(
            "/library/categories",
            get(library::list_categories_handler).post(library::create_category_handler),
        )
        .route(
            "/library/categories/{id}",
            delete(library::delete_category_handler),
        )
        .route(
            "/library/categories/{id}/documents",
            post(library::add_document_handler),
        )
        .route(
            "/library/categories/{id}/documents/{doc_id}",
            delete(library::delete_document_handler),
        )
        .route(
            "/library/categories/{id}/documents/{doc_id}/summary",
            put(library::update_summary_handler),
        )
        // Session-aware but open to anonymous callers.
        .route("/analyzer/process", post(analyzer::process_pdf_handler))
        .route("/analyzer/ask", post(analyzer::ask_handler))
        .route("/focus", get(focus::focus_status_handler))
        .route("/focus/duration", put(focus::focus_duration_handler))
        .route("/focus/toggle", post(focus::focus_toggle_handler))
        .route("/focus/reset", post(focus::focus_reset_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/profile", put(auth::update_profile_handler))
        .route("/auth/password", post(auth::change_password_handler))
        .route("/history", get(analyzer::history_handler))
        .route("/history/{document_id}/chat", get(analyzer::chat_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(app_state)
}
