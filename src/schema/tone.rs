use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of emotional tones a beat can be classified into.
///
/// Declaration order is the tie-break priority used by the classifier:
/// earlier variants win ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EmotionalTone {
    Devastating,
    Hopeful,
    Tense,
    Triumphant,
    Melancholic,
    Anxious,
    Peaceful,
    Bitter,
    Relieved,
    Neutral,
}

impl EmotionalTone {
    /// Every tone, in priority order.
    pub const ALL: [EmotionalTone; 10] = [
        Self::Devastating,
        Self::Hopeful,
        Self::Tense,
        Self::Triumphant,
        Self::Melancholic,
        Self::Anxious,
        Self::Peaceful,
        Self::Bitter,
        Self::Relieved,
        Self::Neutral,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Devastating => "Devastating",
            Self::Hopeful => "Hopeful",
            Self::Tense => "Tense",
            Self::Triumphant => "Triumphant",
            Self::Melancholic => "Melancholic",
            Self::Anxious => "Anxious",
            Self::Peaceful => "Peaceful",
            Self::Bitter => "Bitter",
            Self::Relieved => "Relieved",
            Self::Neutral => "Neutral",
        }
    }

    /// Look up a tone by its label, ignoring case and surrounding space.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|tone| tone.label().eq_ignore_ascii_case(label))
    }

    /// Position in the tie-break order, lower wins.
    pub fn priority(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EmotionalTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for tone in EmotionalTone::ALL {
            assert_eq!(EmotionalTone::from_label(tone.label()), Some(tone));
        }
        assert_eq!(
            EmotionalTone::from_label("  devastating "),
            Some(EmotionalTone::Devastating)
        );
        assert_eq!(EmotionalTone::from_label("Joyful"), None);
    }

    #[test]
    fn priority_follows_declaration_order() {
        assert!(EmotionalTone::Devastating.priority() < EmotionalTone::Bitter.priority());
        assert_eq!(EmotionalTone::Neutral.priority(), EmotionalTone::ALL.len() - 1);
    }
}
