//! Emotional tone classification: the keyword lexicon, the rule-based
//! strategy, batch classification and CSV export.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io;
use std::path::Path;

use crate::core::config::ConfigError;
use crate::core::text;
use crate::schema::{BeatId, EmotionalTone, StoryBeat};

/// A tone with the classifier's confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub tone: EmotionalTone,
    pub confidence: f64,
}

impl Classification {
    /// The result for text that matches nothing.
    pub const NEUTRAL: Classification = Classification {
        tone: EmotionalTone::Neutral,
        confidence: 0.0,
    };
}

/// Strategy for deriving a tone from beat text.
///
/// `RuleBasedClassifier` is the default. Model-backed strategies implement
/// this trait and are handed to the analyzer in its place; nothing else in
/// the crate depends on which strategy is used.
pub trait ToneClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Classification;

    /// Short name recorded alongside derived labels.
    fn name(&self) -> &str {
        "custom"
    }
}

/// One lexicon entry as written in RON: `(tone: Bitter, keywords: ["betray"])`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub tone: EmotionalTone,
    pub keywords: Vec<String>,
}

/// Keyword stems per tone.
///
/// A single-word keyword matches when a word of the text starts with it
/// ("devastat" matches "devastated"), except that keywords shorter than
/// `MIN_STEM_LEN` must match the whole word and a "-less" ending negates
/// the stem ("hopeless" is not Hopeful). A keyword containing spaces
/// matches a run of whole words starting at a word boundary ("give up").
#[derive(Debug, Clone)]
pub struct Lexicon {
    keywords: FxHashMap<EmotionalTone, Vec<String>>,
}

/// Shorter keywords only match whole words ("sad" but not "saddle").
pub const MIN_STEM_LEN: usize = 4;

const BUILTIN_LEXICON: &[(EmotionalTone, &[&str])] = &[
    (
        EmotionalTone::Devastating,
        &["devastat", "destroy", "tragedy", "tragic", "grief", "griev", "death", "shatter", "ruin", "heartbreak"],
    ),
    (
        EmotionalTone::Hopeful,
        &["hope", "promise", "bright", "dream", "optimis", "faith", "possibilit", "new beginning"],
    ),
    (
        EmotionalTone::Tense,
        &["tense", "tension", "suspense", "standoff", "confront", "threat", "danger", "on edge"],
    ),
    (
        EmotionalTone::Triumphant,
        &["triumph", "victor", "conquer", "prevail", "succeed", "success", "overcom", "champion"],
    ),
    (
        EmotionalTone::Melancholic,
        &["melanchol", "sorrow", "sad", "sadly", "sadness", "wistful", "longing", "regret", "mourn", "lonel"],
    ),
    (
        EmotionalTone::Anxious,
        &["anxi", "nervous", "worr", "panic", "fear", "dread", "uneas", "restless"],
    ),
    (
        EmotionalTone::Peaceful,
        &["peace", "calm", "serene", "tranquil", "quiet", "gentle", "content"],
    ),
    (
        EmotionalTone::Bitter,
        &["bitter", "betray", "resent", "grudge", "spite", "reveng", "jealous", "envy"],
    ),
    (
        EmotionalTone::Relieved,
        &["relief", "relieved", "rescued", "exhale", "reunit", "safe at last", "let go"],
    ),
];

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Lexicon {
    /// A lexicon with no keywords; everything classifies as Neutral.
    pub fn empty() -> Self {
        Self {
            keywords: FxHashMap::default(),
        }
    }

    /// The built-in English keyword set.
    pub fn builtin() -> Self {
        let mut lexicon = Self::empty();
        for (tone, keywords) in BUILTIN_LEXICON {
            lexicon.register(*tone, keywords.iter().copied());
        }
        lexicon
    }

    /// Add keywords to a tone. Keywords are lowercased; blanks and
    /// duplicates are skipped. Neutral is what matching nothing means, so
    /// keywords for it are ignored.
    pub fn register<I, S>(&mut self, tone: EmotionalTone, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if tone == EmotionalTone::Neutral {
            tracing::warn!("ignoring lexicon keywords registered for Neutral");
            return;
        }
        let entry = self.keywords.entry(tone).or_default();
        for keyword in keywords {
            let keyword = text::normalized(keyword.as_ref());
            if !keyword.is_empty() && !entry.contains(&keyword) {
                entry.push(keyword);
            }
        }
    }

    pub fn keywords(&self, tone: EmotionalTone) -> &[String] {
        self.keywords.get(&tone).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fold another lexicon's keywords into this one.
    pub fn merge(&mut self, other: Lexicon) {
        for (tone, keywords) in other.keywords {
            self.register(tone, keywords);
        }
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a list of `LexiconEntry` into a lexicon (without the built-in
    /// keywords).
    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        let entries: Vec<LexiconEntry> = ron::from_str(input)?;
        let mut lexicon = Self::empty();
        for entry in entries {
            lexicon.register(entry.tone, entry.keywords);
        }
        Ok(lexicon)
    }

    fn score(&self, tone: EmotionalTone, words: &[String], phrase: &str) -> usize {
        self.keywords(tone)
            .iter()
            .filter(|keyword| {
                if keyword.contains(' ') {
                    phrase.contains(&format!(" {}", keyword))
                } else {
                    words.iter().any(|w| stem_matches(keyword, w))
                }
            })
            .count()
    }
}

fn stem_matches(keyword: &str, word: &str) -> bool {
    match word.strip_prefix(keyword) {
        Some("") => true,
        Some(rest) => keyword.chars().count() >= MIN_STEM_LEN && !rest.starts_with("less"),
        None => false,
    }
}

/// Deterministic keyword classifier.
///
/// Each tone scores the number of its keywords found in the text. The
/// highest score wins, ties go to the tone earlier in `EmotionalTone::ALL`,
/// and confidence is the winner's score over the total score of all tones.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedClassifier {
    lexicon: Lexicon,
}

impl RuleBasedClassifier {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }
}

impl ToneClassifier for RuleBasedClassifier {
    fn classify(&self, text: &str) -> Classification {
        let words = text::words(text);
        if words.is_empty() {
            return Classification::NEUTRAL;
        }
        let phrase = format!(" {}", words.join(" "));

        let mut best: Option<(EmotionalTone, usize)> = None;
        let mut total = 0usize;
        for tone in EmotionalTone::ALL {
            let score = self.lexicon.score(tone, &words, &phrase);
            total += score;
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((tone, score));
            }
        }

        match best {
            Some((tone, score)) => Classification {
                tone,
                confidence: score as f64 / total as f64,
            },
            None => Classification::NEUTRAL,
        }
    }

    fn name(&self) -> &str {
        "rule_based"
    }
}

/// Where a beat's emotional label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelSource {
    /// The author's `emotional_weight`.
    Authored,
    /// Produced by a `ToneClassifier`.
    Derived,
}

/// The emotional label attached to a beat in arcs and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalLabel {
    pub label: String,
    pub source: LabelSource,
    pub confidence: f64,
}

impl EmotionalLabel {
    /// The authored label when present, otherwise the classifier's.
    pub fn for_beat(beat: &StoryBeat, classifier: &dyn ToneClassifier) -> Self {
        match beat.emotional_weight.as_deref().map(str::trim) {
            Some(authored) if !authored.is_empty() => Self {
                label: authored.to_string(),
                source: LabelSource::Authored,
                confidence: 1.0,
            },
            _ => {
                let derived = classifier.classify(&beat.text());
                Self {
                    label: derived.tone.label().to_string(),
                    source: LabelSource::Derived,
                    confidence: derived.confidence,
                }
            }
        }
    }

    /// The closed-set tone this label names, if any.
    pub fn tone(&self) -> Option<EmotionalTone> {
        EmotionalTone::from_label(&self.label)
    }
}

/// One row of a batch classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatClassification {
    pub beat_id: BeatId,
    pub label: EmotionalTone,
    pub confidence: f64,
}

/// Classify the text of each beat. One record per beat, input order
/// preserved; beats with no text come back Neutral with confidence 0.
pub fn classify_batch<'a, I>(beats: I, classifier: &dyn ToneClassifier) -> Vec<BeatClassification>
where
    I: IntoIterator<Item = &'a StoryBeat>,
{
    let records: Vec<BeatClassification> = beats
        .into_iter()
        .map(|beat| {
            let result = classifier.classify(&beat.text());
            BeatClassification {
                beat_id: beat.storybeat_id.clone(),
                label: result.tone,
                confidence: result.confidence,
            }
        })
        .collect();
    tracing::debug!(
        classifier = classifier.name(),
        count = records.len(),
        "classified beats"
    );
    records
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Write records as CSV with the columns `beat_id,label,confidence`.
pub fn write_csv<W: io::Write>(records: &[BeatClassification], mut out: W) -> io::Result<()> {
    writeln!(out, "beat_id,label,confidence")?;
    for record in records {
        writeln!(
            out,
            "{},{},{:.3}",
            csv_field(record.beat_id.as_str()),
            record.label,
            record.confidence
        )?;
    }
    Ok(())
}

pub fn to_csv(records: &[BeatClassification]) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_csv(records, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// How often each tone occurs across a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToneSummary {
    pub total: usize,
    /// Non-zero counts, most frequent first, ties in tone priority order.
    pub counts: Vec<(EmotionalTone, usize)>,
    pub mean_confidence: f64,
}

impl ToneSummary {
    pub fn from_records(records: &[BeatClassification]) -> Self {
        let mut tally: FxHashMap<EmotionalTone, usize> = FxHashMap::default();
        for record in records {
            *tally.entry(record.label).or_default() += 1;
        }
        let mut counts: Vec<(EmotionalTone, usize)> = EmotionalTone::ALL
            .into_iter()
            .filter_map(|tone| tally.get(&tone).map(|count| (tone, *count)))
            .collect();
        // Stable sort keeps priority order among equal counts.
        counts.sort_by(|a, b| b.1.cmp(&a.1));

        let mean_confidence = if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| r.confidence).sum::<f64>() / records.len() as f64
        };

        Self {
            total: records.len(),
            counts,
            mean_confidence,
        }
    }

    pub fn dominant(&self) -> Option<EmotionalTone> {
        self.counts.first().map(|(tone, _)| *tone)
    }
}

/// The prompt a model-backed `ToneClassifier` would send for a beat,
/// with optional caller-supplied context (surrounding beats, genre notes)
/// appended in its own section.
pub fn classification_prompt(
    beat: &StoryBeat,
    tones: &[EmotionalTone],
    context: Option<&str>,
) -> String {
    let labels: Vec<&str> = tones.iter().map(|t| t.label()).collect();

    let mut prompt = String::new();
    prompt.push_str("Classify the emotional tone of this story beat.\n\n");
    prompt.push_str(&format!("Story Beat: {}\n", beat.display_title()));
    prompt.push_str(&format!("Description: {}\n\n", beat.description));
    prompt.push_str(&format!("Available categories: {}\n\n", labels.join(", ")));
    prompt.push_str("Consider the language and imagery, the actions and events described, and the overall mood.\n");
    prompt.push_str("Respond with the single most appropriate category and a confidence between 0.0 and 1.0.\n");
    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("\nAdditional Context:\n{}\n", context));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn beat(id: &str, title: &str, description: &str) -> StoryBeat {
        serde_json::from_value(json!({
            "storybeat_id": id,
            "title": title,
            "description": description
        }))
        .unwrap()
    }

    #[test]
    fn devastated_beats_betrayed_on_priority() {
        let classifier = RuleBasedClassifier::default();
        let result = classifier.classify("She felt devastated and betrayed");
        assert_eq!(result.tone, EmotionalTone::Devastating);
        assert!((result.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn no_match_is_neutral_zero() {
        let classifier = RuleBasedClassifier::default();
        assert_eq!(classifier.classify("The kettle boils."), Classification::NEUTRAL);
        assert_eq!(classifier.classify(""), Classification::NEUTRAL);
        assert_eq!(classifier.classify("   ?! "), Classification::NEUTRAL);
    }

    #[test]
    fn higher_score_wins_over_priority() {
        let classifier = RuleBasedClassifier::default();
        let result = classifier.classify("A bitter betrayal fed his resentment, though grief lingered.");
        assert_eq!(result.tone, EmotionalTone::Bitter);
        assert!((result.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn single_tone_text_is_fully_confident() {
        let classifier = RuleBasedClassifier::default();
        let result = classifier.classify("Calm water, a serene dawn.");
        assert_eq!(result.tone, EmotionalTone::Peaceful);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn classification_is_deterministic_and_bounded() {
        let classifier = RuleBasedClassifier::default();
        let texts = [
            "Victory at last, and a bright hope for the future.",
            "Nervous hands, a tense standoff, a quiet threat.",
            "Nothing happens here.",
        ];
        for text in texts {
            let first = classifier.classify(text);
            let second = classifier.classify(text);
            assert_eq!(first, second);
            assert!((0.0..=1.0).contains(&first.confidence));
        }
    }

    #[test]
    fn multi_word_keywords_match_at_word_boundary() {
        let classifier = RuleBasedClassifier::default();
        assert_eq!(
            classifier.classify("At dawn she was safe at last.").tone,
            EmotionalTone::Relieved
        );
        assert_eq!(
            classifier.classify("unsafe at lasting risk").tone,
            EmotionalTone::Neutral
        );
    }

    #[test]
    fn registered_keywords_extend_the_lexicon() {
        let mut lexicon = Lexicon::empty();
        lexicon.register(EmotionalTone::Hopeful, ["Sunrise", "", "sunrise"]);
        assert_eq!(lexicon.keywords(EmotionalTone::Hopeful), ["sunrise".to_string()]);

        let classifier = RuleBasedClassifier::new(lexicon);
        let result = classifier.classify("The sunrise over the bay");
        assert_eq!(result.tone, EmotionalTone::Hopeful);
        assert_eq!(classifier.classify("devastated").tone, EmotionalTone::Neutral);
    }

    #[test]
    fn lexicon_parses_ron_entries() {
        let lexicon = Lexicon::parse_ron(
            r#"[
                (tone: Bitter, keywords: ["double-cross", "backstab"]),
                (tone: Relieved, keywords: ["phew"]),
            ]"#,
        )
        .unwrap();
        assert_eq!(
            lexicon.keywords(EmotionalTone::Bitter),
            ["double cross".to_string(), "backstab".to_string()]
        );

        let mut merged = Lexicon::builtin();
        merged.merge(lexicon);
        let classifier = RuleBasedClassifier::new(merged);
        assert_eq!(classifier.classify("Phew.").tone, EmotionalTone::Relieved);
        assert_eq!(
            classifier.classify("A double-cross at the docks").tone,
            EmotionalTone::Bitter
        );
    }

    #[test]
    fn authored_label_takes_precedence() {
        let classifier = RuleBasedClassifier::default();
        let mut b = beat("b1", "Storm", "Everything is destroyed");
        b.emotional_weight = Some("Hopeful".to_string());
        let label = EmotionalLabel::for_beat(&b, &classifier);
        assert_eq!(label.source, LabelSource::Authored);
        assert_eq!(label.tone(), Some(EmotionalTone::Hopeful));
        assert_eq!(label.confidence, 1.0);

        b.emotional_weight = Some("  ".to_string());
        let label = EmotionalLabel::for_beat(&b, &classifier);
        assert_eq!(label.source, LabelSource::Derived);
        assert_eq!(label.label, "Devastating");
    }

    #[test]
    fn batch_preserves_order_and_handles_empty_text() {
        let beats = vec![
            beat("b1", "", ""),
            beat("b2", "Victory", "They conquer the hill."),
            beat("b3", "", "   "),
        ];
        let records = classify_batch(&beats, &RuleBasedClassifier::default());
        assert_eq!(records.len(), 3);
        let ids: Vec<&str> = records.iter().map(|r| r.beat_id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2", "b3"]);
        assert_eq!(records[0].label, EmotionalTone::Neutral);
        assert_eq!(records[0].confidence, 0.0);
        assert_eq!(records[1].label, EmotionalTone::Triumphant);
        assert_eq!(records[2].label, EmotionalTone::Neutral);
    }

    #[test]
    fn csv_has_fixed_columns_and_quotes() {
        let records = vec![
            BeatClassification {
                beat_id: BeatId::from("b1"),
                label: EmotionalTone::Hopeful,
                confidence: 0.5,
            },
            BeatClassification {
                beat_id: BeatId::from("odd,\"id\""),
                label: EmotionalTone::Neutral,
                confidence: 0.0,
            },
        ];
        assert_eq!(
            to_csv(&records),
            "beat_id,label,confidence\nb1,Hopeful,0.500\n\"odd,\"\"id\"\"\",Neutral,0.000\n"
        );
    }

    #[test]
    fn summary_counts_and_dominant_tone() {
        let record = |id: &str, label, confidence| BeatClassification {
            beat_id: BeatId::from(id),
            label,
            confidence,
        };
        let records = vec![
            record("b1", EmotionalTone::Tense, 1.0),
            record("b2", EmotionalTone::Hopeful, 0.5),
            record("b3", EmotionalTone::Tense, 0.5),
            record("b4", EmotionalTone::Hopeful, 0.0),
            record("b5", EmotionalTone::Bitter, 1.0),
        ];
        let summary = ToneSummary::from_records(&records);
        assert_eq!(summary.total, 5);
        assert_eq!(
            summary.counts,
            vec![
                (EmotionalTone::Hopeful, 2),
                (EmotionalTone::Tense, 2),
                (EmotionalTone::Bitter, 1)
            ]
        );
        assert_eq!(summary.dominant(), Some(EmotionalTone::Hopeful));
        assert!((summary.mean_confidence - 0.6).abs() < 1e-9);

        assert_eq!(ToneSummary::from_records(&[]).dominant(), None);
    }

    #[test]
    fn prompt_lists_categories() {
        let b = beat("b1", "The Letter", "She reads it twice.");
        let prompt = classification_prompt(&b, &EmotionalTone::ALL, None);
        assert!(prompt.contains("Story Beat: The Letter"));
        assert!(prompt.contains("Devastating, Hopeful, Tense"));
        assert!(!prompt.contains("Additional Context"));
    }

    #[test]
    fn prompt_appends_context_section() {
        let b = beat("b1", "The Letter", "She reads it twice.");
        let prompt = classification_prompt(
            &b,
            &EmotionalTone::ALL,
            Some("The letter is from her estranged father."),
        );
        assert!(prompt.ends_with(
            "\nAdditional Context:\nThe letter is from her estranged father.\n"
        ));
        assert_eq!(
            classification_prompt(&b, &EmotionalTone::ALL, Some("  ")),
            classification_prompt(&b, &EmotionalTone::ALL, None)
        );
    }

    #[test]
    fn negated_and_embedded_stems_do_not_match() {
        let classifier = RuleBasedClassifier::default();
        for text in ["hopeless", "fearless", "saddle", "The saddle was fearless and hopeless."] {
            assert_eq!(classifier.classify(text), Classification::NEUTRAL, "{text}");
        }
        for text in ["sad", "sadly", "sadness"] {
            assert_eq!(classifier.classify(text).tone, EmotionalTone::Melancholic, "{text}");
        }
        assert_eq!(classifier.classify("hopeful").tone, EmotionalTone::Hopeful);
        assert_eq!(classifier.classify("restless").tone, EmotionalTone::Anxious);
    }

    #[test]
    fn neutral_keywords_are_ignored() {
        let mut lexicon = Lexicon::empty();
        lexicon.register(EmotionalTone::Neutral, ["kettle"]);
        assert!(lexicon.keywords(EmotionalTone::Neutral).is_empty());

        let parsed = Lexicon::parse_ron(
            r#"[
                (tone: Neutral, keywords: ["boils"]),
                (tone: Peaceful, keywords: ["kettle"]),
            ]"#,
        )
        .unwrap();
        assert!(parsed.keywords(EmotionalTone::Neutral).is_empty());
        let classifier = RuleBasedClassifier::new(parsed);
        assert_eq!(classifier.classify("The water boils."), Classification::NEUTRAL);
        assert_eq!(classifier.classify("The kettle boils.").tone, EmotionalTone::Peaceful);
        assert_eq!(classifier.classify("The kettle boils.").confidence, 1.0);
    }
}
