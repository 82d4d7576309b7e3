//! Document loading from files, URLs, and in-memory JSON.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::core::config::AnalysisConfig;
use crate::schema::{NarrativeDocument, Problem, ValidationError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("source unavailable: {location}: {reason}")]
    SourceUnavailable { location: String, reason: String },
}

impl LoadError {
    fn unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

/// Where a document comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    File(PathBuf),
    Url(String),
    Value(Value),
}

impl DocumentSource {
    /// Treat `http://` and `https://` strings as URLs, anything else as a
    /// file path.
    pub fn detect(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::File(PathBuf::from(location))
        }
    }
}

impl From<Value> for DocumentSource {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

/// Loads and validates NCP documents. URL fetches are bounded by the
/// configured timeout and never retried.
#[derive(Debug, Clone)]
pub struct Loader {
    timeout: Duration,
}

impl Default for Loader {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl Loader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.fetch_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn load(&self, source: impl Into<DocumentSource>) -> Result<NarrativeDocument, LoadError> {
        match source.into() {
            DocumentSource::File(path) => self.load_file(&path),
            DocumentSource::Url(url) => self.load_url(&url),
            DocumentSource::Value(value) => self.load_value(value),
        }
    }

    pub fn load_file(&self, path: &Path) -> Result<NarrativeDocument, LoadError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LoadError::unavailable(path.display().to_string(), e))?;
        self.load_str(&contents)
    }

    pub fn load_url(&self, url: &str) -> Result<NarrativeDocument, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| LoadError::unavailable(url, e))?;
        let body = client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|e| LoadError::unavailable(url, e))?;
        self.load_str(&body)
    }

    /// Parse JSON text. Text that is not JSON at all is a validation issue
    /// at the document root.
    pub fn load_str(&self, json: &str) -> Result<NarrativeDocument, LoadError> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            ValidationError::single("$", Problem::Malformed(format!("invalid JSON: {}", e)))
        })?;
        self.load_value(value)
    }

    pub fn load_value(&self, value: Value) -> Result<NarrativeDocument, LoadError> {
        match NarrativeDocument::from_value(value) {
            Ok(document) => {
                tracing::info!(
                    title = document.title(),
                    players = document.players().len(),
                    perspectives = document.perspectives().len(),
                    beats = document.beats().len(),
                    storypoints = document.storypoints().len(),
                    moments = document.moments().len(),
                    "loaded narrative document"
                );
                Ok(document)
            }
            Err(err) => {
                tracing::warn!(issues = err.issues.len(), "narrative document failed validation");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detect_distinguishes_urls() {
        assert!(matches!(
            DocumentSource::detect("https://example.com/story.json"),
            DocumentSource::Url(_)
        ));
        assert!(matches!(
            DocumentSource::detect("stories/story.json"),
            DocumentSource::File(_)
        ));
    }

    #[test]
    fn load_value_builds_document() {
        let doc = Loader::default()
            .load(json!({"title": "Tiny", "storybeats": [{"storybeat_id": "b1"}]}))
            .unwrap();
        assert_eq!(doc.title(), "Tiny");
        assert_eq!(doc.beats().len(), 1);
    }

    #[test]
    fn invalid_json_text_is_a_validation_error() {
        let err = Loader::default().load_str("{ not json").unwrap_err();
        match err {
            LoadError::Validation(v) => {
                assert_eq!(v.issues.len(), 1);
                assert_eq!(v.issues[0].path, "$");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let err = Loader::default()
            .load(Path::new("tests/fixtures/does_not_exist.json"))
            .unwrap_err();
        assert!(matches!(err, LoadError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("does_not_exist.json"));
    }

    #[test]
    fn unreachable_url_is_source_unavailable() {
        let loader = Loader::new(Duration::from_millis(500));
        let err = loader.load_url("http://127.0.0.1:9/story.json").unwrap_err();
        assert!(matches!(err, LoadError::SourceUnavailable { .. }));
    }

    #[test]
    fn timeout_comes_from_config() {
        let config = AnalysisConfig {
            fetch_timeout_secs: 7,
            ..AnalysisConfig::default()
        };
        assert_eq!(Loader::from_config(&config).timeout(), Duration::from_secs(7));
    }
}
