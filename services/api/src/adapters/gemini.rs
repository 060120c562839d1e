//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for Google's generative-language API.
//! It implements the `AiService` port from the `core` crate.
//!
//! Google moves models between the `v1` and `v1beta` surfaces and retires model
//! names over time, so a configured endpoint that worked last month can answer
//! 404 today. On a 404 the adapter walks a fixed list of fallbacks and caches the
//! first endpoint that answers.

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use regex::Regex;
use std::sync::{LazyLock, Mutex};
use std::time::Duration;
use study_planner_core::ports::{AiService, PortError, PortResult};
use tracing::{debug, info, warn};

pub const DEFAULT_API_ROOT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_MODEL_CANDIDATES: [&str; 5] = [
    "gemini-1.5-flash-latest",
    "gemini-1.5-flash",
    "gemini-1.5-pro-latest",
    "gemini-1.5-pro",
    "gemini-pro",
];

const SUMMARY_INPUT_CHARS: usize = 7000;
const MODELS_INPUT_CHARS: usize = 10000;
const QUESTION_CONTEXT_CHARS: usize = 15000;
const ERROR_BODY_CHARS: usize = 1200;

const SUMMARY_PROMPT: &str = r#"Write a short summary of this academic paper. Highlight the key findings, the research methods and the main arguments.
The summary must be a single paragraph of no more than 3-4 sentences. If the paper describes the models it uses, include them.

Paper:
{text}"#;

const MODELS_PROMPT: &str = r#"From the academic paper text below, identify the names of the algorithms, models and techniques that are used.
List only the specific methods that appear in the text. Do not guess.

Text:
{text}"#;

const QUESTION_PROMPT: &str = r#"You are an AI assistant specialised in academic papers. Answer questions while staying faithful to the paper's content.
If the paper does not contain a piece of information, say so plainly and do not guess.
When asked about the models, algorithms or techniques used in the paper, answer in detail based on what the paper says.

Paper content:
{context}

Question: {question}

Answer:"#;

//=========================================================================================
// Errors
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("The Google API key is empty. Set GOOGLE_API_KEY or GEMINI_API_KEY.")]
    MissingKey,
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Request to the generative-language API failed: {0}")]
    Transport(String),
    #[error("Invalid response from the API (no candidates/content/parts/text found)")]
    InvalidResponse,
}

impl From<AiError> for PortError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::MissingKey => PortError::Validation(e.to_string()),
            other => PortError::Upstream(other.to_string()),
        }
    }
}

/// How a single endpoint ended after its retries.
enum EndpointFailure {
    /// 404: the caller may move on to the next fallback.
    NotFound(AiError),
    Fatal(AiError),
}

//=========================================================================================
// Settings
//=========================================================================================

#[derive(Clone, Debug)]
pub struct GeminiSettings {
    pub api_key: String,
    /// Where the key came from, reported in error messages.
    pub api_key_source: String,
    /// Scheme and host without a trailing slash; the models listing and the
    /// hardcoded defaults are built from it.
    pub api_root: String,
    /// Full `.../models/{model}:generateContent` URL, without the key.
    pub base_url: String,
    pub model_candidates: Vec<String>,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl GeminiSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            api_key_source: "Unknown".to_string(),
            api_root: DEFAULT_API_ROOT.to_string(),
            base_url: default_endpoint(DEFAULT_API_ROOT, "v1"),
            model_candidates: parse_model_candidates(None),
            temperature: 0.1,
            max_output_tokens: 2048,
            timeout: Duration::from_secs(90),
            max_attempts: 3,
            backoff_base: Duration::from_millis(800),
        }
    }

    /// Points the adapter at another API root, moving the default endpoint along with it.
    pub fn with_api_root(mut self, root: impl Into<String>) -> Self {
        let root = root.into().trim_end_matches('/').to_string();
        self.base_url = default_endpoint(&root, "v1");
        self.api_root = root;
        self
    }
}

fn default_endpoint(root: &str, version: &str) -> String {
    format!(
        "{}/{}/models/{}:generateContent",
        root, version, DEFAULT_MODEL
    )
}

/// Splits a candidate list on `,`, `;`, tabs and newlines. Entries are trimmed
/// and lose any `models/` prefix. An empty result falls back to the defaults.
pub fn parse_model_candidates(csv: Option<&str>) -> Vec<String> {
    let parsed: Vec<String> = csv
        .unwrap_or_default()
        .split([',', ';', '\t', '\n', '\r'])
        .map(|part| normalize_model_name(part.trim()).to_string())
        .filter(|part| !part.is_empty())
        .collect();

    if parsed.is_empty() {
        DEFAULT_MODEL_CANDIDATES.iter().map(|m| m.to_string()).collect()
    } else {
        parsed
    }
}

fn normalize_model_name(name: &str) -> &str {
    match name.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("models/") => &name[7..],
        _ => name,
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AiService` against the generative-language API.
pub struct GeminiAdapter {
    client: Client,
    settings: GeminiSettings,
    resolved_endpoint: Mutex<Option<String>>,
}

impl GeminiAdapter {
    pub fn new(settings: GeminiSettings) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            settings,
            resolved_endpoint: Mutex::new(None),
        })
    }

    /// The endpoint that last answered successfully, if any.
    pub fn resolved_endpoint(&self) -> Option<String> {
        self.resolved_endpoint
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn cache_endpoint(&self, url: &str) {
        let mut slot = self
            .resolved_endpoint
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if slot.as_deref() != Some(url) {
            info!("Resolved generative-language endpoint: {}", url);
            *slot = Some(url.to_string());
        }
    }

    /// Sends `prompt` and returns the first candidate's text.
    pub async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        if self.settings.api_key.is_empty() {
            return Err(AiError::MissingKey);
        }

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_output_tokens,
            }
        });

        let first = self
            .resolved_endpoint()
            .unwrap_or_else(|| self.settings.base_url.clone());
        let mut tried = vec![first.clone()];

        let mut last_error = match self.post_with_retries(&first, &body).await {
            Ok(text) => {
                self.cache_endpoint(&first);
                return Ok(text);
            }
            Err(EndpointFailure::Fatal(e)) => return Err(e),
            Err(EndpointFailure::NotFound(e)) => e,
        };

        // a. API version swap, b. candidate models.
        let mut fallbacks: Vec<String> = swap_api_version(&first).into_iter().collect();
        fallbacks.extend(
            self.settings
                .model_candidates
                .iter()
                .filter_map(|model| replace_model(&first, model)),
        );
        for url in fallbacks {
            if let Some(text) = self.try_fallback(&url, &body, &mut tried, &mut last_error).await? {
                return Ok(text);
            }
        }

        // c. Whatever the key can actually see.
        if let Some(model) = self.pick_listed_model().await {
            if let Some(url) = replace_model(&first, &model) {
                if let Some(text) =
                    self.try_fallback(&url, &body, &mut tried, &mut last_error).await?
                {
                    return Ok(text);
                }
            }
        }

        // d. Hardcoded defaults.
        for version in ["v1", "v1beta"] {
            let url = default_endpoint(&self.settings.api_root, version);
            if let Some(text) = self.try_fallback(&url, &body, &mut tried, &mut last_error).await? {
                return Ok(text);
            }
        }

        Err(last_error)
    }

    async fn try_fallback(
        &self,
        url: &str,
        body: &Value,
        tried: &mut Vec<String>,
        last_error: &mut AiError,
    ) -> Result<Option<String>, AiError> {
        if tried.iter().any(|t| t == url) {
            return Ok(None);
        }
        tried.push(url.to_string());
        debug!("Trying fallback endpoint {}", url);

        match self.post_with_retries(url, body).await {
            Ok(text) => {
                self.cache_endpoint(url);
                Ok(Some(text))
            }
            Err(EndpointFailure::NotFound(e)) => {
                *last_error = e;
                Ok(None)
            }
            Err(EndpointFailure::Fatal(e)) => Err(e),
        }
    }

    async fn post_with_retries(&self, url: &str, body: &Value) -> Result<String, EndpointFailure> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_error = AiError::Transport("no attempt was made".to_string());

        for attempt in 1..=max_attempts {
            let response = match self.with_key(self.client.post(url)).json(body).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Attempt {}/{} to {} failed: {}", attempt, max_attempts, url, e);
                    last_error = AiError::Transport(e.to_string());
                    if attempt < max_attempts {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let raw = response
                    .text()
                    .await
                    .map_err(|e| EndpointFailure::Fatal(AiError::Transport(e.to_string())))?;
                return extract_text(&raw).map_err(EndpointFailure::Fatal);
            }

            let retry_after = retry_after(response.headers());
            let raw = response.text().await.unwrap_or_default();
            let error = AiError::Api {
                status: status.as_u16(),
                message: self.compose_error_message(status, url, &raw),
            };

            if status == StatusCode::NOT_FOUND {
                return Err(EndpointFailure::NotFound(error));
            }
            if is_transient(status) && attempt < max_attempts {
                let delay = retry_after.unwrap_or_else(|| self.backoff(attempt));
                warn!(
                    "Transient status {} from {}, retrying in {:?}",
                    status, url, delay
                );
                tokio::time::sleep(delay).await;
                last_error = error;
                continue;
            }
            return Err(EndpointFailure::Fatal(error));
        }

        Err(EndpointFailure::Fatal(last_error))
    }

    /// Picks a model from `{root}/v1/models`: a listed candidate first, else the
    /// first model that supports `generateContent`.
    async fn pick_listed_model(&self) -> Option<String> {
        let url = format!("{}/v1/models", self.settings.api_root);
        let response = self.with_key(self.client.get(&url)).send().await.ok()?;
        if !response.status().is_success() {
            debug!("Models listing answered {}", response.status());
            return None;
        }
        let listing: ModelListing = response.json().await.ok()?;
        let usable: Vec<&str> = listing
            .models
            .iter()
            .filter(|m| m.supports_generate_content())
            .map(|m| normalize_model_name(&m.name))
            .filter(|name| !name.is_empty())
            .collect();

        self.settings
            .model_candidates
            .iter()
            .find(|wanted| usable.iter().any(|name| name.eq_ignore_ascii_case(wanted)))
            .cloned()
            .or_else(|| usable.first().map(|name| name.to_string()))
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.query(&[("key", self.settings.api_key.as_str())])
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.settings.backoff_base;
        (base * attempt).min(base * 3)
    }

    fn compose_error_message(&self, status: StatusCode, url: &str, body: &str) -> String {
        let mut message = format!("API error ({}). ", status);

        match parse_provider_error(body) {
            Some((provider_status, provider_message)) => {
                message.push_str(&format!(
                    "Google error: {} - {}. ",
                    provider_status, provider_message
                ));
            }
            None if !body.trim().is_empty() => {
                message.push_str(&format!("Details: {}. ", trim_chars(body, ERROR_BODY_CHARS)));
            }
            None => {}
        }

        let hint = match status {
            StatusCode::BAD_REQUEST => {
                Some("Likely cause: the request format or model parameters are invalid. ")
            }
            StatusCode::UNAUTHORIZED => Some("Likely cause: the API key is invalid. "),
            StatusCode::FORBIDDEN => Some(
                "Likely cause: the API key is restricted or the API is not enabled for the project. ",
            ),
            StatusCode::NOT_FOUND => Some(
                "Likely cause: the model name or endpoint is wrong (check the v1/v1beta and model pairing). ",
            ),
            StatusCode::TOO_MANY_REQUESTS => {
                Some("Likely cause: rate limit or quota exhausted. Wait a moment and retry. ")
            }
            _ => None,
        };
        if let Some(hint) = hint {
            message.push_str(hint);
        }

        message.push_str(&format!(
            "(endpoint: {}, key source: {})",
            url, self.settings.api_key_source
        ));
        message
    }
}

//=========================================================================================
// `AiService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AiService for GeminiAdapter {
    async fn generate_summary(&self, text: &str) -> PortResult<String> {
        let prompt = SUMMARY_PROMPT.replace("{text}", &head_chars(text, SUMMARY_INPUT_CHARS));
        Ok(self.generate(&prompt).await?)
    }

    async fn extract_models(&self, text: &str) -> PortResult<String> {
        let prompt = MODELS_PROMPT.replace("{text}", &head_chars(text, MODELS_INPUT_CHARS));
        Ok(self.generate(&prompt).await?)
    }

    async fn ask_question(&self, question: &str, context: &str) -> PortResult<String> {
        let prompt = QUESTION_PROMPT
            .replace("{context}", &head_chars(context, QUESTION_CONTEXT_CHARS))
            .replace("{question}", question);
        Ok(self.generate(&prompt).await?)
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

#[derive(Deserialize)]
struct ModelListing {
    #[serde(default)]
    models: Vec<ListedModel>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedModel {
    #[serde(default)]
    name: String,
    supported_generation_methods: Option<Vec<String>>,
}

impl ListedModel {
    /// Older listings omit the methods field; those models are assumed usable.
    fn supports_generate_content(&self) -> bool {
        match &self.supported_generation_methods {
            None => true,
            Some(methods) => methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case("generateContent")),
        }
    }
}

fn extract_text(raw: &str) -> Result<String, AiError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| AiError::InvalidResponse)?;
    value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
        .ok_or(AiError::InvalidResponse)
}

fn parse_provider_error(body: &str) -> Option<(String, String)> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    let status = error.get("status").and_then(Value::as_str).unwrap_or_default();
    let message = error.get("message").and_then(Value::as_str).unwrap_or_default();
    if status.trim().is_empty() && message.trim().is_empty() {
        None
    } else {
        Some((status.to_string(), message.to_string()))
    }
}

/// `/v1beta/` becomes `/v1/` and vice versa.
pub fn swap_api_version(url: &str) -> Option<String> {
    if url.contains("/v1beta/") {
        Some(url.replacen("/v1beta/", "/v1/", 1))
    } else if url.contains("/v1/") {
        Some(url.replacen("/v1/", "/v1beta/", 1))
    } else {
        None
    }
}

static MODEL_SEGMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(/models/)([^:/]+)(:generateContent)").ok());

/// Substitutes `model` into the `/models/{model}:generateContent` segment.
pub fn replace_model(url: &str, model: &str) -> Option<String> {
    let model = normalize_model_name(model.trim());
    if model.is_empty() {
        return None;
    }
    let pattern = MODEL_SEGMENT.as_ref()?;
    if !pattern.is_match(url) {
        return None;
    }
    Some(
        pattern
            .replace(url, format!("${{1}}{}${{3}}", model))
            .into_owned(),
    )
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// `Retry-After` as delta seconds or as an HTTP date in the future.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    (date.with_timezone(&chrono::Utc) - chrono::Utc::now())
        .to_std()
        .ok()
}

fn head_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn trim_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}…", head_chars(text, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_are_split_and_normalized() {
        let parsed = parse_model_candidates(Some(" models/gemini-pro ;gemini-1.5-pro,\tx\n"));
        assert_eq!(parsed, vec!["gemini-pro", "gemini-1.5-pro", "x"]);
        assert_eq!(parse_model_candidates(Some(" , ; ")).len(), 5);
        assert_eq!(parse_model_candidates(None)[0], "gemini-1.5-flash-latest");
    }

    #[test]
    fn version_swap_goes_both_ways() {
        let v1 = "https://host/v1/models/m:generateContent";
        let beta = swap_api_version(v1).unwrap();
        assert_eq!(beta, "https://host/v1beta/models/m:generateContent");
        assert_eq!(swap_api_version(&beta).unwrap(), v1);
        assert!(swap_api_version("https://host/models/m").is_none());
    }

    #[test]
    fn model_segment_is_replaced() {
        let url = "https://host/v1beta/models/old-model:generateContent";
        assert_eq!(
            replace_model(url, "models/new-model").unwrap(),
            "https://host/v1beta/models/new-model:generateContent"
        );
        assert!(replace_model("https://host/v1/other", "m").is_none());
    }

    #[test]
    fn text_is_read_from_the_first_candidate() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#;
        assert_eq!(extract_text(raw).unwrap(), "hello");
        assert!(matches!(
            extract_text(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#),
            Err(AiError::InvalidResponse)
        ));
        assert!(matches!(extract_text("{}"), Err(AiError::InvalidResponse)));
    }

    #[test]
    fn backoff_is_linear_and_capped() {
        let adapter = GeminiAdapter::new(GeminiSettings::new("k")).unwrap();
        assert_eq!(adapter.backoff(1), Duration::from_millis(800));
        assert_eq!(adapter.backoff(2), Duration::from_millis(1600));
        assert_eq!(adapter.backoff(5), Duration::from_millis(2400));
    }

    #[test]
    fn error_message_carries_provider_error_hint_and_key_source() {
        let mut settings = GeminiSettings::new("k");
        settings.api_key_source = "GOOGLE_API_KEY".into();
        let adapter = GeminiAdapter::new(settings).unwrap();
        let body = r#"{"error":{"code":403,"status":"PERMISSION_DENIED","message":"API disabled"}}"#;
        let message = adapter.compose_error_message(StatusCode::FORBIDDEN, "https://h/v1/x", body);
        assert!(message.contains("403"));
        assert!(message.contains("PERMISSION_DENIED - API disabled"));
        assert!(message.contains("restricted"));
        assert!(message.contains("key source: GOOGLE_API_KEY"));

        let long = "x".repeat(5000);
        let message = adapter.compose_error_message(StatusCode::BAD_GATEWAY, "u", &long);
        assert!(message.len() < 1400);
    }

    #[test]
    fn retry_after_accepts_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "2".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(2)));
        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        // A date in the past yields no delay override.
        assert_eq!(retry_after(&headers), None);
    }
}
