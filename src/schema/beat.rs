use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{BeatId, MomentId, PerspectiveId, PlayerId, StoryPointId};
use super::Metadata;

/// A narrative unit (scene-equivalent). Beats are kept in document order,
/// which is the canonical sequence for journeys and arcs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryBeat {
    pub storybeat_id: BeatId,
    /// Position index as authored. Not required to increase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Author-assigned emotional tone, e.g. "Devastating".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotional_weight: Option<String>,
    #[serde(default)]
    pub related_players: Vec<PlayerId>,
    #[serde(default)]
    pub related_perspectives: Vec<PerspectiveId>,
    #[serde(default)]
    pub related_storypoints: Vec<StoryPointId>,
    #[serde(default)]
    pub related_moments: Vec<MomentId>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// Authored position, or one past the previous beat's when left out.
    #[serde(skip)]
    pub(crate) resolved_position: u32,
    /// Index in document order.
    #[serde(skip)]
    pub(crate) sequence: usize,
}

impl StoryBeat {
    /// The beat's position index: the authored one, or one past the
    /// previous beat's. Set when the document is loaded.
    pub fn position(&self) -> u32 {
        self.resolved_position
    }

    /// Zero-based index in document order, the canonical sequence.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// Title and description joined, the text searched and classified.
    pub fn text(&self) -> String {
        match (self.title.trim(), self.description.trim()) {
            ("", description) => description.to_string(),
            (title, "") => title.to_string(),
            (title, description) => format!("{} {}", title, description),
        }
    }

    pub fn has_player(&self, player: &PlayerId) -> bool {
        self.related_players.contains(player)
    }

    pub fn has_perspective(&self, perspective: &PerspectiveId) -> bool {
        self.related_perspectives.contains(perspective)
    }

    /// A display name: the title, or the id for untitled beats.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            self.storybeat_id.as_str()
        } else {
            &self.title
        }
    }
}

/// Plot-structure role of a story point, parsed from its authored `type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoryPointKind {
    IncitingIncident,
    RisingAction,
    TurningPoint,
    Midpoint,
    Climax,
    Resolution,
    Custom(String),
}

impl StoryPointKind {
    pub fn name(&self) -> &str {
        match self {
            Self::IncitingIncident => "inciting_incident",
            Self::RisingAction => "rising_action",
            Self::TurningPoint => "turning_point",
            Self::Midpoint => "midpoint",
            Self::Climax => "climax",
            Self::Resolution => "resolution",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for StoryPointKind {
    fn from(value: &str) -> Self {
        let normalized = value.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "inciting_incident" => Self::IncitingIncident,
            "rising_action" => Self::RisingAction,
            "turning_point" => Self::TurningPoint,
            "midpoint" => Self::Midpoint,
            "climax" => Self::Climax,
            "resolution" => Self::Resolution,
            _ => Self::Custom(value.to_string()),
        }
    }
}

impl fmt::Display for StoryPointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A plot milestone owned by a beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryPoint {
    pub storypoint_id: StoryPointId,
    /// The `type` as authored, e.g. "inciting incident".
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// The owning beat.
    pub storybeat_id: BeatId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub related_players: Vec<PlayerId>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl StoryPoint {
    pub fn kind(&self) -> Option<StoryPointKind> {
        self.kind.as_deref().map(StoryPointKind::from)
    }
}

/// The finest-grained recorded event, owned by a beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    pub moment_id: MomentId,
    /// The owning beat.
    pub storybeat_id: BeatId,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}
