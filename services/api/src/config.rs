//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use crate::adapters::gemini::{self, GeminiSettings};
use crate::adapters::xml_store::{LIBRARY_FILE_NAME, PLANS_FILE_NAME};
use crate::services::library::LIBRARY_DIR_NAME;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Plans, library and remember-me files live here.
    pub data_dir: PathBuf,
    pub google_api_key: Option<String>,
    /// Which variable supplied the key, for error messages.
    pub api_key_source: String,
    pub gemini_api_root: String,
    pub gemini_base_url: Option<String>,
    pub gemini_model_candidates: Option<String>,
    pub gemini_temperature: f64,
    pub gemini_max_output_tokens: u32,
    pub gemini_timeout: Duration,
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        _ => Ok(default),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "StudyPlanner")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://study_planner.db?mode=rwc".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let data_dir = non_empty_var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        // --- Generative-language API ---
        let (google_api_key, api_key_source) = match non_empty_var("GOOGLE_API_KEY") {
            Some(key) => (Some(key), "GOOGLE_API_KEY".to_string()),
            None => match non_empty_var("GEMINI_API_KEY") {
                Some(key) => (Some(key), "GEMINI_API_KEY".to_string()),
                None => (None, "not configured".to_string()),
            },
        };

        let gemini_api_root = non_empty_var("GEMINI_API_ROOT")
            .unwrap_or_else(|| gemini::DEFAULT_API_ROOT.to_string())
            .trim_end_matches('/')
            .to_string();
        let gemini_base_url = non_empty_var("GEMINI_API_BASE_URL");
        let gemini_model_candidates = non_empty_var("GEMINI_MODEL_CANDIDATES");
        let gemini_temperature = parse_var("GEMINI_TEMPERATURE", 0.1f64)?;
        let gemini_max_output_tokens = parse_var("GEMINI_MAX_OUTPUT_TOKENS", 2048u32)?;
        let gemini_timeout = Duration::from_secs(parse_var("GEMINI_TIMEOUT_SECS", 90u64)?);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            data_dir,
            google_api_key,
            api_key_source,
            gemini_api_root,
            gemini_base_url,
            gemini_model_candidates,
            gemini_temperature,
            gemini_max_output_tokens,
            gemini_timeout,
        })
    }

    /// The XML file behind "save" and "load" without an explicit path.
    pub fn plans_file(&self) -> PathBuf {
        self.data_dir.join(PLANS_FILE_NAME)
    }

    pub fn library_file(&self) -> PathBuf {
        self.data_dir.join(LIBRARY_FILE_NAME)
    }

    /// Where added PDFs are copied.
    pub fn library_dir(&self) -> PathBuf {
        self.data_dir.join(LIBRARY_DIR_NAME)
    }

    /// Client settings for the generative-language adapter. A missing key is
    /// kept empty so the adapter reports it on first use.
    pub fn gemini_settings(&self) -> GeminiSettings {
        let mut settings = GeminiSettings::new(self.google_api_key.clone().unwrap_or_default())
            .with_api_root(self.gemini_api_root.clone());
        if let Some(base_url) = &self.gemini_base_url {
            settings.base_url = base_url.clone();
        }
        settings.api_key_source = self.api_key_source.clone();
        settings.model_candidates =
            gemini::parse_model_candidates(self.gemini_model_candidates.as_deref());
        settings.temperature = self.gemini_temperature;
        settings.max_output_tokens = self.gemini_max_output_tokens;
        settings.timeout = self.gemini_timeout;
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_the_config() {
        let config = Config {
            bind_address: "127.0.0.1:3000".parse().unwrap(),
            database_url: "sqlite::memory:".into(),
            log_level: Level::INFO,
            data_dir: PathBuf::from("./data"),
            google_api_key: Some("abc".into()),
            api_key_source: "GEMINI_API_KEY".into(),
            gemini_api_root: "http://localhost:9999".into(),
            gemini_base_url: None,
            gemini_model_candidates: Some("a;b".into()),
            gemini_temperature: 0.4,
            gemini_max_output_tokens: 512,
            gemini_timeout: Duration::from_secs(5),
        };
        let settings = config.gemini_settings();
        assert_eq!(
            settings.base_url,
            "http://localhost:9999/v1/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(settings.model_candidates, vec!["a", "b"]);
        assert_eq!(settings.api_key_source, "GEMINI_API_KEY");
        assert_eq!(settings.max_output_tokens, 512);
        assert_eq!(config.plans_file(), PathBuf::from("./data/studyplans.xml"));
        assert_eq!(config.library_dir(), PathBuf::from("./data/PdfLibrary"));
    }
}
