/// Report and analyzer integration tests: character arcs, thematic tension
/// and batch classification end to end.

use narrative_intelligence::core::classifier::{to_csv, ToneSummary};
use narrative_intelligence::core::thematic::ThemeStrength;
use narrative_intelligence::{
    AnalysisConfig, EmotionalTone, NarrativeAnalyzer, NarrativeDocument, PerspectiveId, PlayerId,
};
use std::path::Path;

fn analyzer() -> NarrativeAnalyzer {
    NarrativeAnalyzer::builder().build().unwrap()
}

fn load(analyzer: &NarrativeAnalyzer, name: &str) -> NarrativeDocument {
    analyzer
        .load(Path::new(&format!("tests/fixtures/{}", name)))
        .unwrap()
}

#[test]
fn unknown_player_arc_fails_and_leaves_document_untouched() {
    let analyzer = analyzer();
    let doc = load(&analyzer, "betrayal.json");
    let before = doc.clone();
    let err = analyzer
        .character_arc(&doc, &PlayerId::from("ghost_id"))
        .unwrap_err();
    assert_eq!(err.to_string(), "player not found: ghost_id");
    assert_eq!(doc, before);
}

#[test]
fn devastated_and_betrayed_tie_goes_to_priority() {
    let result = analyzer().classify_text("She felt devastated and betrayed");
    assert_eq!(result.tone, EmotionalTone::Devastating);
    assert!((result.confidence - 0.5).abs() < 1e-9);
}

#[test]
fn mara_arc_moves_from_melancholy_to_hope() {
    let analyzer = analyzer();
    let doc = load(&analyzer, "harbor.json");
    let report = analyzer.character_arc(&doc, &PlayerId::from("mara")).unwrap();
    assert_eq!(report.journey.len(), 5);
    assert_eq!(report.foundation.role.as_deref(), Some("protagonist"));
    assert_eq!(report.transformation.opening_label.as_deref(), Some("Melancholic"));
    assert_eq!(report.transformation.closing_label.as_deref(), Some("Hopeful"));

    let md = report.to_markdown();
    assert!(md.starts_with("# Character Arc: Mara"));
    assert!(md.contains("### 3. The Lamp Fails"));
    assert!(md.contains("*Emotional tone: Devastating*"));
    assert!(md.contains("- She folds his coat and cannot put it away."));
    assert!(md.contains("- Help refused (inciting_incident)"));
}

#[test]
fn arc_batch_covers_every_player() {
    let analyzer = analyzer();
    let doc = load(&analyzer, "harbor.json");
    let ids: Vec<PlayerId> = doc.players().iter().map(|p| p.player_id.clone()).collect();
    let batch = analyzer.character_arcs(&doc, &ids);
    assert_eq!(batch.reports().count(), 3);
    assert_eq!(batch.errors().count(), 0);

    let tomas = batch.reports().find(|r| r.player_id == "tomas").unwrap();
    assert_eq!(tomas.foundation.missing, vec!["arc"]);
}

#[test]
fn report_serializes_to_json() {
    let analyzer = analyzer();
    let doc = load(&analyzer, "harbor.json");
    let report = analyzer.character_arc(&doc, &PlayerId::from("lio")).unwrap();
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["player_id"], "lio");
    assert_eq!(value["journey"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["journey"][0]["label"]["source"], "Authored");
}

#[test]
fn safety_theme_is_moderate_with_one_silent_beat() {
    let analyzer = analyzer();
    let doc = load(&analyzer, "harbor.json");
    let report = analyzer
        .thematic_tension(&doc, &PerspectiveId::from("safety_vulnerability"))
        .unwrap();
    assert_eq!(report.matched_beats, 3);
    assert_eq!(report.strength, ThemeStrength::Moderate);
    assert!(report.search_terms.starts_with(&["safety".to_string(), "vulnerability".to_string()]));

    let coverage: Vec<(&str, usize)> = report
        .player_coverage
        .iter()
        .map(|p| (p.player_id.as_str(), p.beats))
        .collect();
    assert_eq!(coverage, vec![("mara", 3), ("tomas", 3), ("lio", 2)]);

    assert_eq!(report.secondary_themes.len(), 1);
    assert_eq!(report.secondary_themes[0].perspective_id, "duty_freedom");
    assert_eq!(report.secondary_themes[0].co_occurrences, 2);

    assert_eq!(report.opportunities.len(), 1);
    assert!(report.opportunities[0].contains("First Light"));
}

#[test]
fn grief_theme_is_declared_but_never_written() {
    let analyzer = analyzer();
    let doc = load(&analyzer, "harbor.json");
    let report = analyzer
        .thematic_tension(&doc, &PerspectiveId::from("grief"))
        .unwrap();
    assert!(report.search_terms.is_empty());
    assert_eq!(report.strength, ThemeStrength::Light);
    // Never explored in text, two silent tagged beats, light strength.
    assert_eq!(report.opportunities.len(), 4);
    let md = report.to_markdown();
    assert!(md.contains("## Opportunities"));
    assert!(md.contains("lightly touched upon"));
}

#[test]
fn configured_thresholds_change_strength() {
    let analyzer = NarrativeAnalyzer::builder()
        .config_file("tests/fixtures/analysis.ron")
        .build()
        .unwrap();
    let doc = load(&analyzer, "harbor.json");
    let report = analyzer
        .thematic_tension(&doc, &PerspectiveId::from("grief"))
        .unwrap();
    assert_eq!(report.strength, ThemeStrength::Moderate);

    let rankings = analyzer.theme_strengths(&doc);
    assert_eq!(rankings[0].strength, ThemeStrength::Major);
}

#[test]
fn theme_strengths_rank_harbor_perspectives() {
    let analyzer = analyzer();
    let doc = load(&analyzer, "harbor.json");
    let strengths = analyzer.theme_strengths(&doc);
    let ranked: Vec<(&str, usize)> = strengths
        .iter()
        .map(|r| (r.perspective_id.as_str(), r.matched_beats))
        .collect();
    assert_eq!(
        ranked,
        vec![("safety_vulnerability", 3), ("duty_freedom", 3), ("grief", 2)]
    );
}

#[test]
fn batch_classification_exports_csv() {
    let analyzer = analyzer();
    let doc = load(&analyzer, "harbor.json");
    let records = analyzer.classify_beats(&doc);
    assert_eq!(records.len(), doc.beats().len());
    assert!(records.iter().all(|r| (0.0..=1.0).contains(&r.confidence)));

    let csv = to_csv(&records);
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("beat_id,label,confidence"));
    assert_eq!(lines.next(), Some("b1,Melancholic,1.000"));
    assert_eq!(csv.lines().count(), 6);

    let summary = ToneSummary::from_records(&records);
    assert_eq!(summary.total, 5);
}

#[test]
fn project_lexicon_extends_builtin() {
    let analyzer = NarrativeAnalyzer::builder()
        .with_config(AnalysisConfig {
            lexicon_path: Some("tests/fixtures/lexicon.ron".into()),
            ..AnalysisConfig::default()
        })
        .build()
        .unwrap();
    assert_eq!(analyzer.classifier().name(), "rule_based");
    let doc = load(&analyzer, "harbor.json");
    let records = analyzer.classify_beats(&doc);
    // "Squall Warning" only scores with the project lexicon.
    assert_eq!(records[1].label, EmotionalTone::Tense);
    // Built-in keywords still apply.
    assert_eq!(records[0].label, EmotionalTone::Melancholic);
}
