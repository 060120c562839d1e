pub mod domain;
pub mod focus;
pub mod plans;
pub mod ports;
pub mod stats;

pub use domain::{
    AuthSession, Category, ChatMessage, ChatRole, DocumentSummary, LibraryDocument, Priority,
    StoredPdfDocument, StudyPlanItem, User,
};
pub use focus::{FocusTimer, TickOutcome, TimerState};
pub use plans::{InMemoryPlanRepository, PlanFilter};
pub use ports::{
    AiService, AuthSessionStore, ChatRepository, LibraryStore, PdfDocumentRepository,
    PdfTextService, PlanArchive, PlanRepository, PortError, PortResult, SecretVault,
    UserRepository,
};
pub use stats::PlanStatistics;
