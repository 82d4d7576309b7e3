//! Character arc reports.
//!
//! A report is a structured record first; the markdown rendering is derived
//! from it, so the two cannot disagree.

use serde::Serialize;
use std::fmt::{self, Write};

use crate::core::classifier::{EmotionalLabel, ToneClassifier};
use crate::core::traversal::{self, JourneyStep};
use crate::schema::{BeatId, MomentId, NarrativeDocument, NotFound, PlayerId, StoryPointId};

/// Who the character is before the story starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Foundation {
    pub name: String,
    pub role: Option<String>,
    pub wound: Option<String>,
    pub desire: Option<String>,
    pub arc: Option<String>,
    /// Foundation fields the author left blank.
    pub missing: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryPointEntry {
    pub storypoint_id: StoryPointId,
    pub kind: Option<String>,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentEntry {
    pub moment_id: MomentId,
    pub description: String,
}

/// One beat of the character's journey.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyEntry {
    pub beat_id: BeatId,
    pub position: u32,
    pub title: String,
    pub description: String,
    pub label: EmotionalLabel,
    pub storypoints: Vec<StoryPointEntry>,
    pub moments: Vec<MomentEntry>,
}

/// How the character changes: the authored arc and the emotional
/// trajectory from the first beat to the last.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transformation {
    pub arc: Option<String>,
    pub opening_label: Option<String>,
    pub closing_label: Option<String>,
    pub statement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArcReport {
    pub player_id: PlayerId,
    pub foundation: Foundation,
    pub journey: Vec<JourneyEntry>,
    pub transformation: Transformation,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn journey_entry(step: &JourneyStep<'_>, classifier: &dyn ToneClassifier) -> JourneyEntry {
    JourneyEntry {
        beat_id: step.beat.storybeat_id.clone(),
        position: step.beat.position(),
        title: step.beat.display_title().to_string(),
        description: step.beat.description.trim().to_string(),
        label: EmotionalLabel::for_beat(step.beat, classifier),
        storypoints: step
            .storypoints
            .iter()
            .map(|sp| StoryPointEntry {
                storypoint_id: sp.storypoint_id.clone(),
                kind: sp.kind().map(|k| k.name().to_string()),
                title: sp.title.clone(),
            })
            .collect(),
        moments: step
            .moments
            .iter()
            .map(|m| MomentEntry {
                moment_id: m.moment_id.clone(),
                description: m.description.clone(),
            })
            .collect(),
    }
}

fn transformation(arc: Option<String>, journey: &[JourneyEntry]) -> Transformation {
    let opening_label = journey.first().map(|e| e.label.label.clone());
    let closing_label = journey.last().map(|e| e.label.label.clone());

    let trajectory = match (&opening_label, &closing_label) {
        (Some(open), Some(close)) if journey.len() > 1 => Some(format!(
            "Across {} beats the emotional register moves from {} to {}.",
            journey.len(),
            open,
            close
        )),
        (Some(only), _) => Some(format!("The character appears in a single {} beat.", only)),
        _ => None,
    };

    let statement = match (&arc, trajectory) {
        (Some(arc), Some(trajectory)) => format!("{} {}", arc, trajectory),
        (Some(arc), None) => arc.clone(),
        (None, Some(trajectory)) => trajectory,
        (None, None) => "Character arc to be determined.".to_string(),
    };

    Transformation {
        arc,
        opening_label,
        closing_label,
        statement,
    }
}

/// Build the arc report for one player.
pub fn generate(
    document: &NarrativeDocument,
    player_id: &PlayerId,
    classifier: &dyn ToneClassifier,
) -> Result<ArcReport, NotFound> {
    let player = document.player(player_id)?;
    let steps = traversal::player_journey(document, player_id)?;
    let journey: Vec<JourneyEntry> = steps
        .iter()
        .map(|step| journey_entry(step, classifier))
        .collect();

    let foundation = Foundation {
        name: player.name.clone(),
        role: non_blank(&player.role),
        wound: non_blank(&player.wound),
        desire: non_blank(&player.desire),
        arc: non_blank(&player.arc),
        missing: player.missing_foundation(),
    };
    let transformation = transformation(foundation.arc.clone(), &journey);

    Ok(ArcReport {
        player_id: player.player_id.clone(),
        foundation,
        journey,
        transformation,
    })
}

/// Reports for several players. One slot per requested id, in request
/// order.
#[derive(Debug)]
pub struct ArcBatch {
    pub results: Vec<(PlayerId, Result<ArcReport, NotFound>)>,
}

impl ArcBatch {
    pub fn reports(&self) -> impl Iterator<Item = &ArcReport> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = &NotFound> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().err())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Generate a report per player. A missing player fails only its own slot.
pub fn generate_batch(
    document: &NarrativeDocument,
    player_ids: &[PlayerId],
    classifier: &dyn ToneClassifier,
) -> ArcBatch {
    let results = player_ids
        .iter()
        .map(|id| {
            let result = generate(document, id, classifier);
            if let Err(err) = &result {
                tracing::warn!(player = %id, error = %err, "arc report skipped");
            }
            (id.clone(), result)
        })
        .collect();
    ArcBatch { results }
}

impl ArcReport {
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        // fmt::Write for String never fails.
        let _ = self.write_markdown(&mut out);
        out
    }

    pub fn write_markdown(&self, out: &mut impl Write) -> fmt::Result {
        let f = &self.foundation;
        writeln!(out, "# Character Arc: {}\n", f.name)?;

        writeln!(out, "## Foundation\n")?;
        if let Some(role) = &f.role {
            writeln!(out, "**Role**: {}\n", role)?;
        }
        for (name, value) in [("Wound", &f.wound), ("Desire", &f.desire), ("Arc", &f.arc)] {
            if let Some(value) = value {
                writeln!(out, "**{}**: {}\n", name, value)?;
            }
        }
        if !f.missing.is_empty() {
            writeln!(out, "*Missing foundation: {}*\n", f.missing.join(", "))?;
        }

        writeln!(out, "## Journey\n")?;
        if self.journey.is_empty() {
            writeln!(out, "*No story beats found for this character.*\n")?;
        }
        for (i, entry) in self.journey.iter().enumerate() {
            writeln!(out, "### {}. {}\n", i + 1, entry.title)?;
            if !entry.description.is_empty() {
                writeln!(out, "{}\n", entry.description)?;
            }
            writeln!(out, "*Emotional tone: {}*\n", entry.label.label)?;
            if !entry.storypoints.is_empty() {
                writeln!(out, "**Story Points:**")?;
                for sp in &entry.storypoints {
                    let title = match sp.title.trim() {
                        "" => sp.storypoint_id.as_str(),
                        title => title,
                    };
                    match &sp.kind {
                        Some(kind) => writeln!(out, "- {} ({})", title, kind)?,
                        None => writeln!(out, "- {}", title)?,
                    }
                }
                writeln!(out)?;
            }
            if !entry.moments.is_empty() {
                writeln!(out, "**Key Moments:**")?;
                for moment in &entry.moments {
                    writeln!(out, "- {}", moment.description)?;
                }
                writeln!(out)?;
            }
        }

        writeln!(out, "## Transformation\n")?;
        writeln!(out, "{}", self.transformation.statement)
    }
}
