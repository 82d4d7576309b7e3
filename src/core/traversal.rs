//! Queries over a loaded document: journeys, thematic traces, emotional
//! arcs and one-hop neighbourhoods.
//!
//! Every query is a single pass over the document's beats in document
//! order, so results follow the document's beat sequence and are identical
//! across repeated calls.

use serde::{Deserialize, Serialize};

use crate::core::classifier::{EmotionalLabel, ToneClassifier};
use crate::core::text;
use crate::schema::{
    BeatId, Moment, NarrativeDocument, NotFound, Perspective, PerspectiveId, Player,
    PlayerId, StoryBeat, StoryPoint,
};

/// A beat on a player's journey, with the story points and moments it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct JourneyStep<'a> {
    pub beat: &'a StoryBeat,
    pub storypoints: Vec<&'a StoryPoint>,
    pub moments: Vec<&'a Moment>,
}

/// Which beats a thematic trace should match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeQuery {
    /// Match beats tagged with this perspective.
    pub perspective: Option<PerspectiveId>,
    /// Match beats whose text contains any of these (case-insensitive).
    pub keywords: Vec<String>,
}

impl ThemeQuery {
    pub fn perspective(id: impl Into<PerspectiveId>) -> Self {
        Self {
            perspective: Some(id.into()),
            keywords: Vec::new(),
        }
    }

    pub fn keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            perspective: None,
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// Add keywords to a perspective query; a beat then matches on either.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }
}

/// A beat matched by a thematic trace.
#[derive(Debug, Clone, PartialEq)]
pub struct ThematicHit<'a> {
    pub beat: &'a StoryBeat,
    /// The beat is tagged with the queried perspective.
    pub tagged: bool,
    /// Query keywords found in the beat's text, in query order.
    pub matched_terms: Vec<String>,
}

/// A beat on an emotional arc.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcPoint<'a> {
    pub beat: &'a StoryBeat,
    pub label: EmotionalLabel,
}

/// Everything a beat references directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Connected<'a> {
    pub beat: &'a StoryBeat,
    pub players: Vec<&'a Player>,
    pub perspectives: Vec<&'a Perspective>,
    pub storypoints: Vec<&'a StoryPoint>,
    pub moments: Vec<&'a Moment>,
}

/// A traversal request, for callers that pick the mode at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Query {
    PlayerJourney { player_id: PlayerId },
    ThematicTrace { query: ThemeQuery },
    EmotionalArc { player_id: Option<PlayerId> },
    ConnectedElements { beat_id: BeatId },
}

/// The result of `traverse`, one variant per `Query` mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Traversal<'a> {
    PlayerJourney(Vec<JourneyStep<'a>>),
    ThematicTrace(Vec<ThematicHit<'a>>),
    EmotionalArc(Vec<ArcPoint<'a>>),
    ConnectedElements(Connected<'a>),
}

impl<'a> Traversal<'a> {
    /// The beats in the result, in document order.
    pub fn beat_ids(&self) -> Vec<&'a BeatId> {
        match self {
            Self::PlayerJourney(steps) => steps.iter().map(|s| &s.beat.storybeat_id).collect(),
            Self::ThematicTrace(hits) => hits.iter().map(|h| &h.beat.storybeat_id).collect(),
            Self::EmotionalArc(points) => points.iter().map(|p| &p.beat.storybeat_id).collect(),
            Self::ConnectedElements(connected) => vec![&connected.beat.storybeat_id],
        }
    }
}

/// Run a query in the mode it names.
pub fn traverse<'a>(
    document: &'a NarrativeDocument,
    query: &Query,
    classifier: &dyn ToneClassifier,
) -> Result<Traversal<'a>, NotFound> {
    Ok(match query {
        Query::PlayerJourney { player_id } => {
            Traversal::PlayerJourney(player_journey(document, player_id)?)
        }
        Query::ThematicTrace { query } => Traversal::ThematicTrace(thematic_trace(document, query)?),
        Query::EmotionalArc { player_id } => {
            Traversal::EmotionalArc(emotional_arc(document, player_id.as_ref(), classifier)?)
        }
        Query::ConnectedElements { beat_id } => {
            Traversal::ConnectedElements(connected_elements(document, beat_id)?)
        }
    })
}

fn journey_step<'a>(document: &'a NarrativeDocument, beat: &'a StoryBeat) -> JourneyStep<'a> {
    JourneyStep {
        beat,
        storypoints: document.storypoints_of(&beat.storybeat_id).collect(),
        moments: document.moments_of(&beat.storybeat_id).collect(),
    }
}

/// Every beat the player appears in.
pub fn player_journey<'a>(
    document: &'a NarrativeDocument,
    player: &PlayerId,
) -> Result<Vec<JourneyStep<'a>>, NotFound> {
    player_journey_filtered(document, player, |_| true)
}

/// Every beat the player appears in that also satisfies `keep`.
pub fn player_journey_filtered<'a, F>(
    document: &'a NarrativeDocument,
    player: &PlayerId,
    keep: F,
) -> Result<Vec<JourneyStep<'a>>, NotFound>
where
    F: Fn(&StoryBeat) -> bool,
{
    document.player(player)?;
    let steps: Vec<JourneyStep<'a>> = document
        .beats()
        .iter()
        .filter(|beat| beat.has_player(player) && keep(beat))
        .map(|beat| journey_step(document, beat))
        .collect();
    tracing::debug!(player = %player, beats = steps.len(), "player journey");
    Ok(steps)
}

/// Beats tagged with the query's perspective or mentioning any of its
/// keywords. Each beat appears at most once.
pub fn thematic_trace<'a>(
    document: &'a NarrativeDocument,
    query: &ThemeQuery,
) -> Result<Vec<ThematicHit<'a>>, NotFound> {
    if let Some(perspective) = &query.perspective {
        document.perspective(perspective)?;
    }
    Ok(trace_hits(document, query.perspective.as_ref(), &query.keywords))
}

/// The trace itself, for callers that already hold a perspective from
/// the document.
pub(crate) fn trace_hits<'a>(
    document: &'a NarrativeDocument,
    perspective: Option<&PerspectiveId>,
    keywords: &[String],
) -> Vec<ThematicHit<'a>> {
    let mut terms: Vec<String> = Vec::new();
    for keyword in keywords {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !terms.contains(&keyword) {
            terms.push(keyword);
        }
    }

    let mut hits = Vec::new();
    for beat in document.beats() {
        let tagged = perspective.is_some_and(|p| beat.has_perspective(p));
        let haystack = beat.text().to_lowercase();
        let matched_terms: Vec<String> = terms
            .iter()
            .filter(|term| text::contains_term(&haystack, term))
            .cloned()
            .collect();
        if tagged || !matched_terms.is_empty() {
            hits.push(ThematicHit {
                beat,
                tagged,
                matched_terms,
            });
        }
    }
    tracing::debug!(
        perspective = ?perspective,
        terms = terms.len(),
        beats = hits.len(),
        "thematic trace"
    );
    hits
}

/// Beats labelled with their emotional tone, optionally only those the
/// player appears in.
pub fn emotional_arc<'a>(
    document: &'a NarrativeDocument,
    player: Option<&PlayerId>,
    classifier: &dyn ToneClassifier,
) -> Result<Vec<ArcPoint<'a>>, NotFound> {
    if let Some(player) = player {
        document.player(player)?;
    }
    let points: Vec<ArcPoint<'a>> = document
        .beats()
        .iter()
        .filter(|beat| player.map_or(true, |p| beat.has_player(p)))
        .map(|beat| ArcPoint {
            beat,
            label: EmotionalLabel::for_beat(beat, classifier),
        })
        .collect();
    tracing::debug!(player = ?player, beats = points.len(), "emotional arc");
    Ok(points)
}

/// The beat's players, perspectives, and the story points and moments it
/// owns. One hop only.
pub fn connected_elements<'a>(
    document: &'a NarrativeDocument,
    beat_id: &BeatId,
) -> Result<Connected<'a>, NotFound> {
    let beat = document.beat(beat_id)?;
    let players = beat
        .related_players
        .iter()
        .map(|id| document.player(id))
        .collect::<Result<Vec<_>, _>>()?;
    let perspectives = beat
        .related_perspectives
        .iter()
        .map(|id| document.perspective(id))
        .collect::<Result<Vec<_>, _>>()?;
    let step = journey_step(document, beat);
    Ok(Connected {
        beat,
        players,
        perspectives,
        storypoints: step.storypoints,
        moments: step.moments,
    })
}

/// Beats whose authored emotional weight equals `label`, ignoring case.
pub fn beats_with_emotional_weight<'a>(
    document: &'a NarrativeDocument,
    label: &str,
) -> Vec<&'a StoryBeat> {
    let label = label.trim();
    document
        .beats()
        .iter()
        .filter(|beat| {
            beat.emotional_weight
                .as_deref()
                .is_some_and(|w| w.trim().eq_ignore_ascii_case(label))
        })
        .collect()
}

/// Beats in which every one of the given players appears.
pub fn shared_beats<'a>(
    document: &'a NarrativeDocument,
    players: &[PlayerId],
) -> Result<Vec<&'a StoryBeat>, NotFound> {
    for player in players {
        document.player(player)?;
    }
    if players.is_empty() {
        return Ok(Vec::new());
    }
    Ok(document
        .beats()
        .iter()
        .filter(|beat| players.iter().all(|p| beat.has_player(p)))
        .collect())
}
