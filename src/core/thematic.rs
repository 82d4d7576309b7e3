//! Thematic tension analysis: how a perspective shows up across the beats.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt::{self, Write};

use crate::core::classifier::{EmotionalLabel, ToneClassifier};
use crate::core::config::AnalysisConfig;
use crate::core::text;
use crate::core::traversal::{self, ThemeQuery, ThematicHit};
use crate::schema::{BeatId, NarrativeDocument, NotFound, Perspective, PerspectiveId, PlayerId};

/// How prominent a theme is, by matched beat count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ThemeStrength {
    Absent,
    Light,
    Moderate,
    Major,
}

impl ThemeStrength {
    pub fn from_count(count: usize, config: &AnalysisConfig) -> Self {
        if count >= config.major_theme_threshold {
            Self::Major
        } else if count >= config.moderate_theme_threshold {
            Self::Moderate
        } else if count >= 1 {
            Self::Light
        } else {
            Self::Absent
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Major => "a major thematic pillar of the narrative",
            Self::Moderate => "moderately explored",
            Self::Light => "lightly touched upon",
            Self::Absent => "absent from the narrative beats",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerCoverage {
    pub player_id: PlayerId,
    pub name: String,
    /// Matched beats the player appears in.
    pub beats: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecondaryTheme {
    pub perspective_id: PerspectiveId,
    pub name: String,
    /// Matched beats also tagged with this perspective.
    pub co_occurrences: usize,
    pub first_position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionEntry {
    pub beat_id: BeatId,
    pub position: u32,
    pub title: String,
    pub tagged: bool,
    pub matched_terms: Vec<String>,
    pub label: EmotionalLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThematicReport {
    pub perspective_id: PerspectiveId,
    pub name: String,
    pub description: Option<String>,
    pub tension: Option<String>,
    pub thematic_question: Option<String>,
    pub search_terms: Vec<String>,
    pub matched_beats: usize,
    pub total_beats: usize,
    pub strength: ThemeStrength,
    pub player_coverage: Vec<PlayerCoverage>,
    pub secondary_themes: Vec<SecondaryTheme>,
    pub evolution: Vec<EvolutionEntry>,
    pub opportunities: Vec<String>,
}

/// Search terms for a perspective: the words of its tension and thematic
/// question, lowercased, without stop words or short words, first
/// occurrence kept. The "vs" between two poles is itself a stop word.
pub fn derive_search_terms(perspective: &Perspective, config: &AnalysisConfig) -> Vec<String> {
    let mut sources: Vec<&str> = Vec::new();
    if let Some(tension) = &perspective.tension {
        sources.push(tension);
    }
    if let Some(question) = &perspective.thematic_question {
        sources.push(question);
    }

    let mut terms: Vec<String> = Vec::new();
    for word in sources.into_iter().flat_map(text::words) {
        if word.chars().count() < config.min_term_length || config.is_stop_word(&word) {
            continue;
        }
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}

fn player_coverage(document: &NarrativeDocument, hits: &[ThematicHit<'_>]) -> Vec<PlayerCoverage> {
    let mut coverage: Vec<PlayerCoverage> = Vec::new();
    let mut index: FxHashMap<&PlayerId, usize> = FxHashMap::default();
    for hit in hits {
        for player_id in &hit.beat.related_players {
            if let Some(&i) = index.get(player_id) {
                coverage[i].beats += 1;
                continue;
            }
            let Ok(player) = document.player(player_id) else {
                continue;
            };
            index.insert(player_id, coverage.len());
            coverage.push(PlayerCoverage {
                player_id: player_id.clone(),
                name: player.name.clone(),
                beats: 1,
            });
        }
    }
    coverage
}

/// Other perspectives tagged on the matched beats, most frequent first;
/// ties go to the one that co-occurs earliest.
fn secondary_themes(
    document: &NarrativeDocument,
    primary: &PerspectiveId,
    hits: &[ThematicHit<'_>],
) -> Vec<SecondaryTheme> {
    let mut themes: Vec<SecondaryTheme> = Vec::new();
    let mut index: FxHashMap<&PerspectiveId, usize> = FxHashMap::default();
    for hit in hits {
        for perspective_id in &hit.beat.related_perspectives {
            if perspective_id == primary {
                continue;
            }
            if let Some(&i) = index.get(perspective_id) {
                themes[i].co_occurrences += 1;
                continue;
            }
            let Ok(perspective) = document.perspective(perspective_id) else {
                continue;
            };
            index.insert(perspective_id, themes.len());
            themes.push(SecondaryTheme {
                perspective_id: perspective_id.clone(),
                name: perspective.name.clone(),
                co_occurrences: 1,
                first_position: hit.beat.position(),
            });
        }
    }
    // Themes were pushed in document order; the stable sort keeps it
    // among equal counts.
    themes.sort_by(|a, b| b.co_occurrences.cmp(&a.co_occurrences));
    themes
}

fn opportunities(
    perspective: &Perspective,
    hits: &[ThematicHit<'_>],
    strength: ThemeStrength,
) -> Vec<String> {
    let mut notes = Vec::new();
    if hits.iter().all(|hit| hit.matched_terms.is_empty()) {
        notes.push(format!(
            "{} is declared but never explored in the text of any beat.",
            perspective.name
        ));
    }
    for hit in hits.iter().filter(|h| h.tagged && h.matched_terms.is_empty()) {
        notes.push(format!(
            "\"{}\" is tagged with {} but its text never touches the tension.",
            hit.beat.display_title(),
            perspective.name
        ));
    }
    if strength == ThemeStrength::Light {
        notes.push(format!(
            "{} is lightly touched upon and could be developed further.",
            perspective.name
        ));
    }
    notes
}

/// Analyze how one perspective plays out across the document.
pub fn analyze(
    document: &NarrativeDocument,
    perspective_id: &PerspectiveId,
    classifier: &dyn ToneClassifier,
    config: &AnalysisConfig,
) -> Result<ThematicReport, NotFound> {
    let perspective = document.perspective(perspective_id)?;
    let search_terms = derive_search_terms(perspective, config);
    let query = ThemeQuery::perspective(perspective_id.clone()).with_keywords(search_terms.clone());
    let hits = traversal::thematic_trace(document, &query)?;

    let strength = ThemeStrength::from_count(hits.len(), config);
    let evolution = hits
        .iter()
        .map(|hit| EvolutionEntry {
            beat_id: hit.beat.storybeat_id.clone(),
            position: hit.beat.position(),
            title: hit.beat.display_title().to_string(),
            tagged: hit.tagged,
            matched_terms: hit.matched_terms.clone(),
            label: EmotionalLabel::for_beat(hit.beat, classifier),
        })
        .collect();

    let report = ThematicReport {
        perspective_id: perspective.perspective_id.clone(),
        name: perspective.name.clone(),
        description: perspective.description.clone(),
        tension: perspective.tension.clone(),
        thematic_question: perspective.thematic_question.clone(),
        matched_beats: hits.len(),
        total_beats: document.beats().len(),
        strength,
        player_coverage: player_coverage(document, &hits),
        secondary_themes: secondary_themes(document, perspective_id, &hits),
        evolution,
        opportunities: opportunities(perspective, &hits, strength),
        search_terms,
    };
    tracing::debug!(
        perspective = %perspective_id,
        matched = report.matched_beats,
        strength = ?report.strength,
        "thematic analysis"
    );
    Ok(report)
}

/// One row of a cross-perspective comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeRanking {
    pub perspective_id: PerspectiveId,
    pub name: String,
    pub matched_beats: usize,
    pub strength: ThemeStrength,
}

/// Every perspective ranked by matched beat count, strongest first; equal
/// counts keep document order.
pub fn theme_strengths(document: &NarrativeDocument, config: &AnalysisConfig) -> Vec<ThemeRanking> {
    let mut rankings: Vec<ThemeRanking> = document
        .perspectives()
        .iter()
        .map(|perspective| {
            let terms = derive_search_terms(perspective, config);
            let matched_beats =
                traversal::trace_hits(document, Some(&perspective.perspective_id), &terms).len();
            ThemeRanking {
                perspective_id: perspective.perspective_id.clone(),
                name: perspective.name.clone(),
                matched_beats,
                strength: ThemeStrength::from_count(matched_beats, config),
            }
        })
        .collect();
    rankings.sort_by(|a, b| b.matched_beats.cmp(&a.matched_beats));
    rankings
}

impl ThematicReport {
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        // fmt::Write for String never fails.
        let _ = self.write_markdown(&mut out);
        out
    }

    pub fn write_markdown(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "# Thematic Analysis: {}\n", self.name)?;

        writeln!(out, "## Primary Theme\n")?;
        if let Some(description) = &self.description {
            writeln!(out, "{}\n", description)?;
        }
        if let Some(tension) = &self.tension {
            writeln!(out, "**Core Tension**: {}\n", tension)?;
        }
        if let Some(question) = &self.thematic_question {
            writeln!(out, "**Thematic Question**: {}\n", question)?;
        }
        writeln!(
            out,
            "Appears in **{}** of {} story beats, {}.\n",
            self.matched_beats,
            self.total_beats,
            self.strength.describe()
        )?;
        if !self.player_coverage.is_empty() {
            writeln!(out, "**Carried by:**")?;
            for player in &self.player_coverage {
                writeln!(out, "- {} ({} beats)", player.name, player.beats)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "## Secondary Themes\n")?;
        if self.secondary_themes.is_empty() {
            writeln!(out, "*No other perspectives share these beats.*\n")?;
        } else {
            for theme in &self.secondary_themes {
                writeln!(out, "- {} ({} shared beats)", theme.name, theme.co_occurrences)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "## Evolution\n")?;
        if self.evolution.is_empty() {
            writeln!(out, "*No story beats explore this theme.*\n")?;
        }
        for (i, entry) in self.evolution.iter().enumerate() {
            write!(out, "{}. **{}** ({})", i + 1, entry.title, entry.label.label)?;
            if !entry.matched_terms.is_empty() {
                write!(out, " via {}", entry.matched_terms.join(", "))?;
            }
            if entry.tagged {
                write!(out, " [tagged]")?;
            }
            writeln!(out)?;
        }
        if !self.evolution.is_empty() {
            writeln!(out)?;
        }

        writeln!(out, "## Opportunities\n")?;
        if self.opportunities.is_empty() {
            writeln!(out, "*None identified.*")?;
        }
        for note in &self.opportunities {
            writeln!(out, "- {}", note)?;
        }
        Ok(())
    }
}
