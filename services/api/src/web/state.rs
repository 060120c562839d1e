//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::{CredentialStore, ReportExporter};
use crate::config::Config;
use crate::services::{AccountService, AnalyzerService, LibraryService};
use std::sync::Arc;
use study_planner_core::focus::FocusTimer;
use study_planner_core::ports::{PlanArchive, PlanRepository};
use tokio::sync::Mutex;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub accounts: AccountService,
    pub analyzer: AnalyzerService,
    pub library: Arc<LibraryService>,
    /// The session's plan list; written to disk only on an explicit save.
    pub plans: Arc<dyn PlanRepository>,
    pub archive: Arc<dyn PlanArchive>,
    pub exporter: ReportExporter,
    pub credentials: Arc<CredentialStore>,
    pub focus: Arc<Mutex<FocusTimer>>,
}
