use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::PerspectiveId;
use super::Metadata;

/// The two opposing poles of a thematic tension, written in NCP documents
/// as `"Safety vs Vulnerability"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThematicPoles {
    pub first: String,
    pub second: String,
}

impl ThematicPoles {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Split `"A vs B"` (or `"A vs. B"`, any case) into its two poles.
    /// `None` when the text names no opposition.
    pub fn parse(input: &str) -> Option<Self> {
        let lowered = input.to_ascii_lowercase();
        let (at, sep_len) = [" vs. ", " vs "]
            .iter()
            .find_map(|sep| lowered.find(sep).map(|at| (at, sep.len())))?;

        let first = input[..at].trim();
        let second = input[at + sep_len..].trim();
        if first.is_empty() || second.is_empty() {
            return None;
        }
        Some(Self::new(first, second))
    }
}

impl fmt::Display for ThematicPoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.first, self.second)
    }
}

/// A thematic lens: the tension it explores and the question the story
/// asks about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perspective {
    pub perspective_id: PerspectiveId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The tension as authored, usually `"A vs B"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thematic_question: Option<String>,
    /// How strongly the tension is felt, in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tension_intensity: Option<f64>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Perspective {
    /// The tension's two poles, when it is written as an opposition.
    pub fn poles(&self) -> Option<ThematicPoles> {
        self.tension.as_deref().and_then(ThematicPoles::parse)
    }
}
