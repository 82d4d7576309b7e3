/// NCP Linter: validates a narrative document and flags thin spots.
///
/// Usage: ncp_lint <document.json|url> [--config <analysis.ron>]

use narrative_intelligence::core::config::AnalysisConfig;
use narrative_intelligence::core::loader::{DocumentSource, LoadError, Loader};
use narrative_intelligence::NarrativeDocument;
use std::path::Path;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "narrative_intelligence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: ncp_lint <document.json|url> [--config <analysis.ron>]");
        process::exit(0);
    }

    let location = &args[1];
    let mut config_path = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            i += 1;
            config_path = Some(args[i].clone());
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => match AnalysisConfig::load_from_ron(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config '{}': {}", path, e);
                process::exit(1);
            }
        },
        None => AnalysisConfig::default(),
    };

    let document = match Loader::from_config(&config).load(DocumentSource::detect(location)) {
        Ok(document) => document,
        Err(LoadError::Validation(err)) => {
            println!("\n=== NCP Lint Report ===\n");
            for issue in &err.issues {
                println!("ERROR: {}", issue);
            }
            println!("\nSummary: {} errors", err.issues.len());
            process::exit(1);
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let warnings = lint_document(&document);

    println!("\n=== NCP Lint Report: {} ===\n", document.title());
    if warnings.is_empty() {
        println!("All checks passed!");
    }
    for warning in &warnings {
        println!("WARNING: {}", warning);
    }
    println!(
        "\nSummary: {} players, {} perspectives, {} beats; 0 errors, {} warnings",
        document.players().len(),
        document.perspectives().len(),
        document.beats().len(),
        warnings.len()
    );
}

/// Structural soft spots in a document that validated cleanly.
fn lint_document(document: &NarrativeDocument) -> Vec<String> {
    let mut warnings = Vec::new();

    for player in document.players() {
        let missing = player.missing_foundation();
        if !missing.is_empty() {
            warnings.push(format!(
                "Player '{}' has no {}",
                player.player_id,
                missing.join(", ")
            ));
        }
        if !document.beats().iter().any(|b| b.has_player(&player.player_id)) {
            warnings.push(format!("Player '{}' appears in no story beat", player.player_id));
        }
    }

    for perspective in document.perspectives() {
        match &perspective.tension {
            None => warnings.push(format!(
                "Perspective '{}' declares no tension",
                perspective.perspective_id
            )),
            Some(tension) if perspective.poles().is_none() => warnings.push(format!(
                "Perspective '{}' tension '{}' is not written as 'A vs B'",
                perspective.perspective_id, tension
            )),
            Some(_) => {}
        }
        if !document
            .beats()
            .iter()
            .any(|b| b.has_perspective(&perspective.perspective_id))
        {
            warnings.push(format!(
                "Perspective '{}' is not tagged on any story beat",
                perspective.perspective_id
            ));
        }
    }

    for beat in document.beats() {
        if beat.text().is_empty() {
            warnings.push(format!("Beat '{}' has no title or description", beat.storybeat_id));
        }
        if beat.related_players.is_empty() {
            warnings.push(format!("Beat '{}' involves no players", beat.storybeat_id));
        }
    }

    warnings
}
