//! Analysis configuration, loadable from RON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Words dropped when deriving search terms from a perspective.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "but", "by", "can", "could", "did", "do",
    "does", "for", "from", "has", "have", "her", "his", "how", "if", "in", "into", "is", "it",
    "its", "of", "on", "one", "or", "our", "she", "should", "so", "than", "that", "the", "their",
    "them", "they", "this", "to", "versus", "vs", "was", "we", "were", "what", "when", "where",
    "which", "who", "whom", "why", "will", "with", "would", "you", "your",
];

/// Tunables for loading and analysis. Every field has a default, so a RON
/// file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper bound on a URL fetch, in seconds.
    pub fetch_timeout_secs: u64,
    pub stop_words: Vec<String>,
    /// Search terms shorter than this (in characters) are dropped.
    pub min_term_length: usize,
    /// Matched beat count at which a theme is a major pillar.
    pub major_theme_threshold: usize,
    /// Matched beat count at which a theme is moderately explored.
    pub moderate_theme_threshold: usize,
    /// Optional RON lexicon merged over the built-in one.
    pub lexicon_path: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            min_term_length: 3,
            major_theme_threshold: 5,
            moderate_theme_threshold: 3,
            lexicon_path: None,
        }
    }
}

impl AnalysisConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.iter().any(|w| w.eq_ignore_ascii_case(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = AnalysisConfig::parse_ron("(fetch_timeout_secs: 5, min_term_length: 4)").unwrap();
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(config.min_term_length, 4);
        assert_eq!(config.major_theme_threshold, 5);
        assert!(config.is_stop_word("What"));
    }

    #[test]
    fn stop_words_can_be_replaced() {
        let config = AnalysisConfig::parse_ron(r#"(stop_words: ["cost"])"#).unwrap();
        assert!(config.is_stop_word("cost"));
        assert!(!config.is_stop_word("what"));
    }

    #[test]
    fn invalid_ron_is_an_error() {
        assert!(matches!(
            AnalysisConfig::parse_ron("(fetch_timeout_secs: \"soon\")"),
            Err(ConfigError::Ron(_))
        ));
    }

    #[test]
    fn load_from_fixture() {
        let config =
            AnalysisConfig::load_from_ron(Path::new("tests/fixtures/analysis.ron")).unwrap();
        assert_eq!(config.major_theme_threshold, 3);
        assert_eq!(config.moderate_theme_threshold, 2);
    }
}
