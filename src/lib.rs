//! Narrative Intelligence: analysis of NCP story documents.
//!
//! Loads a validated narrative document (players, perspectives, story
//! beats, story points and moments), answers traversal queries over it,
//! classifies the emotional tone of beats, and produces character-arc and
//! thematic-tension reports as structured records and markdown.
//!
//! ```no_run
//! use narrative_intelligence::{NarrativeAnalyzer, PlayerId};
//!
//! let analyzer = NarrativeAnalyzer::builder().build()?;
//! let document = analyzer.load_location("story.json")?;
//! let report = analyzer.character_arc(&document, &PlayerId::from("mara"))?;
//! println!("{}", report.to_markdown());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod schema;

pub use crate::core::analyzer::{NarrativeAnalyzer, NarrativeAnalyzerBuilder};
pub use crate::core::arc::{ArcBatch, ArcReport};
pub use crate::core::classifier::{
    BeatClassification, Classification, EmotionalLabel, LabelSource, Lexicon, RuleBasedClassifier,
    ToneClassifier, ToneSummary,
};
pub use crate::core::config::{AnalysisConfig, ConfigError};
pub use crate::core::loader::{DocumentSource, LoadError, Loader};
pub use crate::core::thematic::{ThematicReport, ThemeRanking, ThemeStrength};
pub use crate::core::traversal::{Query, ThemeQuery, Traversal};
pub use crate::schema::{
    BeatId, EmotionalTone, MomentId, NarrativeDocument, NotFound, PerspectiveId, PlayerId,
    StoryPointId, ValidationError,
};
