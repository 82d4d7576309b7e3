//! The NCP document model: typed ids, the five element kinds, and the
//! validated document that owns them.

pub mod beat;
pub mod document;
pub mod ids;
pub mod perspective;
pub mod player;
pub mod tone;
pub mod validate;

/// Free-form metadata attached to elements. Ordered so serialization is
/// deterministic.
pub type Metadata = std::collections::BTreeMap<String, serde_json::Value>;

pub use beat::{Moment, StoryBeat, StoryPoint, StoryPointKind};
pub use document::{DocumentMeta, EntityKind, NarrativeDocument, NotFound};
pub use ids::{BeatId, MomentId, PerspectiveId, PlayerId, StoryPointId};
pub use perspective::{Perspective, ThematicPoles};
pub use player::Player;
pub use tone::EmotionalTone;
pub use validate::{Problem, ValidationError, ValidationIssue};
