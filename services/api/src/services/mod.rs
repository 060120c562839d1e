pub mod accounts;
pub mod analyzer;
pub mod library;

pub use accounts::AccountService;
pub use analyzer::AnalyzerService;
pub use library::LibraryService;
