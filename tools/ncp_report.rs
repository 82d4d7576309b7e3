/// NCP Report: character arcs, thematic analysis and tone classification
/// from the command line.
///
/// Usage: ncp_report <document.json|url> <command> [ids...] [--config <analysis.ron>] [--json]
///
/// Commands:
///   arc <player_id>...        character arc report per player
///   theme <perspective_id>    thematic tension report
///   themes                    every perspective ranked by strength
///   classify                  beat tone classification as CSV

use narrative_intelligence::core::classifier::{write_csv, ToneSummary};
use narrative_intelligence::{NarrativeAnalyzer, PerspectiveId, PlayerId};
use serde::Serialize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str =
    "Usage: ncp_report <document.json|url> <arc|theme|themes|classify> [ids...] [--config <analysis.ron>] [--json]";

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "narrative_intelligence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 || args[1] == "--help" || args[1] == "-h" {
        println!("{}", USAGE);
        process::exit(0);
    }

    let location = &args[1];
    let command = args[2].as_str();
    let mut config_path = None;
    let mut json = false;
    let mut ids = Vec::new();

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--json" => json = true,
            other => ids.push(other.to_string()),
        }
        i += 1;
    }

    let mut builder = NarrativeAnalyzer::builder();
    if let Some(path) = &config_path {
        builder = builder.config_file(path);
    }
    let analyzer = match builder.build() {
        Ok(analyzer) => analyzer,
        Err(e) => {
            eprintln!("ERROR: Failed to configure analyzer: {}", e);
            process::exit(1);
        }
    };

    let document = match analyzer.load_location(location) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    match command {
        "arc" => {
            if ids.is_empty() {
                ids = document
                    .players()
                    .iter()
                    .map(|p| p.player_id.to_string())
                    .collect();
            }
            let player_ids: Vec<PlayerId> = ids.into_iter().map(PlayerId::from).collect();
            let batch = analyzer.character_arcs(&document, &player_ids);
            if json {
                let reports: Vec<_> = batch.reports().collect();
                print_json(&reports);
            } else {
                for report in batch.reports() {
                    println!("{}", report.to_markdown());
                }
            }
            for err in batch.errors() {
                eprintln!("ERROR: {}", err);
            }
            if batch.errors().next().is_some() {
                process::exit(1);
            }
        }
        "theme" => {
            let Some(id) = ids.first() else {
                eprintln!("ERROR: theme needs a perspective id");
                process::exit(1);
            };
            match analyzer.thematic_tension(&document, &PerspectiveId::from(id.as_str())) {
                Ok(report) if json => print_json(&report),
                Ok(report) => println!("{}", report.to_markdown()),
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    process::exit(1);
                }
            }
        }
        "themes" => {
            let rankings = analyzer.theme_strengths(&document);
            if json {
                print_json(&rankings);
            } else {
                for ranking in &rankings {
                    println!(
                        "{:<32} {:>3} beats  {:?}",
                        ranking.name, ranking.matched_beats, ranking.strength
                    );
                }
            }
        }
        "classify" => {
            let records = analyzer.classify_beats(&document);
            if json {
                print_json(&records);
            } else if let Err(e) = write_csv(&records, std::io::stdout().lock()) {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
            let summary = ToneSummary::from_records(&records);
            if let Some(tone) = summary.dominant() {
                tracing::info!(
                    dominant = %tone,
                    mean_confidence = summary.mean_confidence,
                    "emotional landscape"
                );
            }
        }
        other => {
            eprintln!("ERROR: Unknown command '{}'\n{}", other, USAGE);
            process::exit(1);
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    }
}
