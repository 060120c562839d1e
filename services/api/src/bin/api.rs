//! services/api/src/bin/api.rs

use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use planner_lib::{
    adapters::{
        CredentialStore, DbAdapter, GeminiAdapter, KeyringVault, LopdfTextService,
        ReportExporter, XmlLibraryStore, XmlPlanArchive,
    },
    config::Config,
    error::ApiError,
    services::{AccountService, AnalyzerService, LibraryService},
    web::{self, focus::spawn_focus_ticker, state::AppState},
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use study_planner_core::{
    focus::FocusTimer,
    plans::InMemoryPlanRepository,
    ports::{PlanArchive, PlanRepository},
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");
    tokio::fs::create_dir_all(&config.data_dir).await?;
    info!("Data directory: {:?}", config.data_dir);

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    if config.google_api_key.is_none() {
        warn!("No GOOGLE_API_KEY or GEMINI_API_KEY set; analysis requests will fail.");
    }
    let ai_adapter = Arc::new(
        GeminiAdapter::new(config.gemini_settings())
            .map_err(|e| ApiError::Internal(format!("Failed to build the AI client: {}", e)))?,
    );
    let pdf_adapter = Arc::new(LopdfTextService::new());
    let archive = Arc::new(XmlPlanArchive::new(config.plans_file()));

    // The previous session's plans, if any.
    let plans = Arc::new(InMemoryPlanRepository::new());
    let loaded = match archive.load().await {
        Ok(items) => {
            let count = items.len();
            plans.replace_all(items).await.map(|_| count)
        }
        Err(e) => Err(e),
    };
    match loaded {
        Ok(count) => info!("Loaded {} saved plans", count),
        Err(e) => warn!("Starting with an empty plan list: {}", e),
    }

    // --- 4. Build the Shared AppState ---
    let focus = Arc::new(Mutex::new(FocusTimer::default()));
    let app_state = Arc::new(AppState {
        config: config.clone(),
        accounts: AccountService::new(db_adapter.clone(), db_adapter.clone()),
        analyzer: AnalyzerService::new(
            ai_adapter,
            pdf_adapter.clone(),
            db_adapter.clone(),
            db_adapter,
        ),
        library: Arc::new(LibraryService::new(
            Arc::new(XmlLibraryStore::new(config.library_file())),
            pdf_adapter,
            config.library_dir(),
        )),
        plans,
        archive,
        exporter: ReportExporter::new(),
        credentials: Arc::new(CredentialStore::in_dir(
            &config.data_dir,
            Arc::new(KeyringVault::default()),
        )),
        focus: focus.clone(),
    });
    let _ticker = spawn_focus_ticker(focus);

    // --- 5. Create the Web Router ---
    let origin = format!("http://{}", config.bind_address)
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, ACCEPT]);
    let app = web::router(app_state)
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", web::ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
