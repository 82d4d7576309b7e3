//! The aggregate root: a validated, read-only NCP document.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::beat::{Moment, StoryBeat, StoryPoint};
use super::ids::{BeatId, MomentId, PerspectiveId, PlayerId, StoryPointId};
use super::perspective::Perspective;
use super::player::Player;
use super::validate::{self, ValidationError};
use super::Metadata;

/// The kinds of element a document holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Perspective,
    StoryBeat,
    StoryPoint,
    Moment,
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Perspective => "perspective",
            Self::StoryBeat => "story beat",
            Self::StoryPoint => "story point",
            Self::Moment => "moment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A query referenced an id the document does not contain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} not found: {id}")]
pub struct NotFound {
    pub kind: EntityKind,
    pub id: String,
}

impl NotFound {
    pub fn new(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self {
            kind,
            id: id.to_string(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

/// A loaded story. Only constructed through validation, and never mutated
/// afterwards: every accessor hands out shared references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeDocument {
    #[serde(flatten)]
    meta: DocumentMeta,
    players: Vec<Player>,
    perspectives: Vec<Perspective>,
    storybeats: Vec<StoryBeat>,
    storypoints: Vec<StoryPoint>,
    moments: Vec<Moment>,
}

impl NarrativeDocument {
    /// Validate a JSON value and build a document from it.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        validate::build_document(value)
    }

    pub(crate) fn from_parts(
        meta: DocumentMeta,
        players: Vec<Player>,
        perspectives: Vec<Perspective>,
        storybeats: Vec<StoryBeat>,
        storypoints: Vec<StoryPoint>,
        moments: Vec<Moment>,
    ) -> Self {
        Self {
            meta,
            players,
            perspectives,
            storybeats,
            storypoints,
            moments,
        }
    }

    /// Serialize back to the NCP JSON shape.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    pub fn title(&self) -> &str {
        &self.meta.title
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn perspectives(&self) -> &[Perspective] {
        &self.perspectives
    }

    /// Beats in document order.
    pub fn beats(&self) -> &[StoryBeat] {
        &self.storybeats
    }

    pub fn storypoints(&self) -> &[StoryPoint] {
        &self.storypoints
    }

    pub fn moments(&self) -> &[Moment] {
        &self.moments
    }

    pub fn player(&self, id: &PlayerId) -> Result<&Player, NotFound> {
        self.players
            .iter()
            .find(|p| &p.player_id == id)
            .ok_or_else(|| NotFound::new(EntityKind::Player, id))
    }

    pub fn perspective(&self, id: &PerspectiveId) -> Result<&Perspective, NotFound> {
        self.perspectives
            .iter()
            .find(|p| &p.perspective_id == id)
            .ok_or_else(|| NotFound::new(EntityKind::Perspective, id))
    }

    pub fn beat(&self, id: &BeatId) -> Result<&StoryBeat, NotFound> {
        self.storybeats
            .iter()
            .find(|b| &b.storybeat_id == id)
            .ok_or_else(|| NotFound::new(EntityKind::StoryBeat, id))
    }

    pub fn storypoint(&self, id: &StoryPointId) -> Result<&StoryPoint, NotFound> {
        self.storypoints
            .iter()
            .find(|sp| &sp.storypoint_id == id)
            .ok_or_else(|| NotFound::new(EntityKind::StoryPoint, id))
    }

    pub fn moment(&self, id: &MomentId) -> Result<&Moment, NotFound> {
        self.moments
            .iter()
            .find(|m| &m.moment_id == id)
            .ok_or_else(|| NotFound::new(EntityKind::Moment, id))
    }

    /// Story points owned by a beat, in document order.
    pub fn storypoints_of<'a>(&'a self, beat: &'a BeatId) -> impl Iterator<Item = &'a StoryPoint> {
        self.storypoints
            .iter()
            .filter(move |sp| &sp.storybeat_id == beat)
    }

    /// Moments owned by a beat, in document order.
    pub fn moments_of<'a>(&'a self, beat: &'a BeatId) -> impl Iterator<Item = &'a Moment> {
        self.moments.iter().filter(move |m| &m.storybeat_id == beat)
    }
}
