//! The top-level analyzer, tying loading, classification and reporting to a
//! single configuration.

use std::path::{Path, PathBuf};

use crate::core::arc::{self, ArcBatch, ArcReport};
use crate::core::classifier::{
    self, BeatClassification, Classification, Lexicon, RuleBasedClassifier, ToneClassifier,
};
use crate::core::config::{AnalysisConfig, ConfigError};
use crate::core::loader::{DocumentSource, LoadError, Loader};
use crate::core::thematic::{self, ThematicReport, ThemeRanking};
use crate::core::traversal::{self, ArcPoint, Query, Traversal};
use crate::schema::{NarrativeDocument, NotFound, PerspectiveId, PlayerId};

/// Built via `NarrativeAnalyzer::builder()`.
pub struct NarrativeAnalyzer {
    config: AnalysisConfig,
    loader: Loader,
    classifier: Box<dyn ToneClassifier>,
}

/// Builder for constructing a `NarrativeAnalyzer`.
#[derive(Default)]
pub struct NarrativeAnalyzerBuilder {
    config: Option<AnalysisConfig>,
    config_path: Option<PathBuf>,
    lexicon: Option<Lexicon>,
    classifier: Option<Box<dyn ToneClassifier>>,
}

impl NarrativeAnalyzerBuilder {
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Read the configuration from a RON file at build time. Takes
    /// precedence over `with_config`.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replace the built-in lexicon. A lexicon named by the configuration
    /// is still merged over it.
    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    /// Use a custom strategy instead of the rule-based classifier. The
    /// lexicon settings are then ignored.
    pub fn with_classifier(mut self, classifier: impl ToneClassifier + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    pub fn build(self) -> Result<NarrativeAnalyzer, ConfigError> {
        let config = match &self.config_path {
            Some(path) => AnalysisConfig::load_from_ron(path)?,
            None => self.config.unwrap_or_default(),
        };

        let classifier = match self.classifier {
            Some(classifier) => classifier,
            None => {
                let mut lexicon = self.lexicon.unwrap_or_default();
                if let Some(path) = &config.lexicon_path {
                    lexicon.merge(Lexicon::load_from_ron(path)?);
                }
                Box::new(RuleBasedClassifier::new(lexicon)) as Box<dyn ToneClassifier>
            }
        };

        tracing::debug!(
            classifier = classifier.name(),
            timeout_secs = config.fetch_timeout_secs,
            "analyzer ready"
        );
        Ok(NarrativeAnalyzer {
            loader: Loader::from_config(&config),
            config,
            classifier,
        })
    }
}

impl Default for NarrativeAnalyzer {
    fn default() -> Self {
        let config = AnalysisConfig::default();
        Self {
            loader: Loader::from_config(&config),
            config,
            classifier: Box::new(RuleBasedClassifier::default()),
        }
    }
}

impl NarrativeAnalyzer {
    pub fn builder() -> NarrativeAnalyzerBuilder {
        NarrativeAnalyzerBuilder::default()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn classifier(&self) -> &dyn ToneClassifier {
        self.classifier.as_ref()
    }

    /// Load a document from a path, URL or JSON value.
    pub fn load(&self, source: impl Into<DocumentSource>) -> Result<NarrativeDocument, LoadError> {
        self.loader.load(source)
    }

    /// Load from a location string, treating http(s) strings as URLs.
    pub fn load_location(&self, location: &str) -> Result<NarrativeDocument, LoadError> {
        self.loader.load(DocumentSource::detect(location))
    }

    pub fn character_arc(
        &self,
        document: &NarrativeDocument,
        player_id: &PlayerId,
    ) -> Result<ArcReport, NotFound> {
        arc::generate(document, player_id, self.classifier())
    }

    pub fn character_arcs(&self, document: &NarrativeDocument, player_ids: &[PlayerId]) -> ArcBatch {
        arc::generate_batch(document, player_ids, self.classifier())
    }

    pub fn thematic_tension(
        &self,
        document: &NarrativeDocument,
        perspective_id: &PerspectiveId,
    ) -> Result<ThematicReport, NotFound> {
        thematic::analyze(document, perspective_id, self.classifier(), &self.config)
    }

    pub fn theme_strengths(&self, document: &NarrativeDocument) -> Vec<ThemeRanking> {
        thematic::theme_strengths(document, &self.config)
    }

    pub fn classify_text(&self, text: &str) -> Classification {
        self.classifier.classify(text)
    }

    /// Classify every beat of the document from its text.
    pub fn classify_beats(&self, document: &NarrativeDocument) -> Vec<BeatClassification> {
        classifier::classify_batch(document.beats(), self.classifier())
    }

    pub fn emotional_arc<'a>(
        &self,
        document: &'a NarrativeDocument,
        player_id: Option<&PlayerId>,
    ) -> Result<Vec<ArcPoint<'a>>, NotFound> {
        traversal::emotional_arc(document, player_id, self.classifier())
    }

    pub fn traverse<'a>(
        &self,
        document: &'a NarrativeDocument,
        query: &Query,
    ) -> Result<Traversal<'a>, NotFound> {
        traversal::traverse(document, query, self.classifier())
    }
}
