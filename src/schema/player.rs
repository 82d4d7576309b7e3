use serde::{Deserialize, Serialize};

use super::ids::PlayerId;
use super::Metadata;

/// A character in the narrative.
///
/// Wound, desire, and arc are the three foundation fields the character-arc
/// report is built around; any of them may be left out by the author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: PlayerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desire: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arc: Option<String>,
    /// Role tag, e.g. "protagonist", "mentor".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Player {
    /// Names of the foundation fields (wound, desire, arc) that are absent
    /// or blank.
    pub fn missing_foundation(&self) -> Vec<&'static str> {
        [
            ("wound", &self.wound),
            ("desire", &self.desire),
            ("arc", &self.arc),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }
}
