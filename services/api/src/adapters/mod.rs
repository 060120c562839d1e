pub mod credentials;
pub mod db;
pub mod gemini;
pub mod pdf;
pub mod xml_store;

pub use credentials::{CredentialStore, KeyringVault, MemoryVault};
pub use db::DbAdapter;
pub use gemini::{GeminiAdapter, GeminiSettings};
pub use pdf::{LopdfTextService, ReportExporter};
pub use xml_store::{XmlLibraryStore, XmlPlanArchive};
