//! Structural and referential validation of raw NCP JSON.
//!
//! Every collection entry is deserialized on its own so that one malformed
//! entity does not hide the problems of the others, and every reference is
//! checked after that. All issues are collected before failing.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use super::beat::{Moment, StoryBeat, StoryPoint};
use super::document::{DocumentMeta, EntityKind, NarrativeDocument};
use super::perspective::Perspective;
use super::player::Player;

/// What is wrong at a given path.
#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    /// Missing required field, wrong type, unparsable value.
    Malformed(String),
    DuplicateId(String),
    EmptyId,
    DanglingReference { kind: EntityKind, id: String },
    /// A beat lists a story point or moment owned by a different beat.
    WrongOwner { id: String, owner: String },
    OutOfRange(String),
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "{}", msg),
            Self::DuplicateId(id) => write!(f, "duplicate id '{}'", id),
            Self::EmptyId => write!(f, "id must not be empty"),
            Self::DanglingReference { kind, id } => {
                write!(f, "references unknown {} '{}'", kind, id)
            }
            Self::WrongOwner { id, owner } => {
                write!(f, "'{}' is owned by beat '{}'", id, owner)
            }
            Self::OutOfRange(msg) => write!(f, "{}", msg),
        }
    }
}

/// One validation failure, located by a field path such as
/// `storybeats[2].related_players[0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub path: String,
    pub problem: Problem,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, problem: Problem) -> Self {
        Self {
            path: path.into(),
            problem,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.problem)
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    let listed: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
    format!("{} issue(s): {}", issues.len(), listed.join("; "))
}

/// A document was malformed or referentially inconsistent.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("document failed validation with {}", summarize(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn single(path: impl Into<String>, problem: Problem) -> Self {
        Self {
            issues: vec![ValidationIssue::new(path, problem)],
        }
    }

    /// Issues whose path starts with the given prefix.
    pub fn issues_at<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |i| i.path.starts_with(prefix))
    }
}

/// Entities of one collection that parsed, with their source index, plus
/// the ids of entries that did not parse (so references to them are not
/// reported a second time as dangling).
struct Collection<T> {
    items: Vec<(usize, T)>,
    broken_ids: Vec<String>,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn take_collection<T: DeserializeOwned>(
    root: &mut Map<String, Value>,
    key: &str,
    id_field: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Collection<T> {
    let mut collection = Collection {
        items: Vec::new(),
        broken_ids: Vec::new(),
    };

    let entries = match root.remove(key) {
        None | Some(Value::Null) => return collection,
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            issues.push(ValidationIssue::new(
                key,
                Problem::Malformed(format!("expected an array, found {}", json_kind(&other))),
            ));
            return collection;
        }
    };

    for (index, entry) in entries.into_iter().enumerate() {
        let raw_id = entry
            .get(id_field)
            .and_then(Value::as_str)
            .map(str::to_string);
        match serde_json::from_value::<T>(entry) {
            Ok(item) => collection.items.push((index, item)),
            Err(e) => {
                issues.push(ValidationIssue::new(
                    format!("{}[{}]", key, index),
                    Problem::Malformed(e.to_string()),
                ));
                collection.broken_ids.extend(raw_id);
            }
        }
    }
    collection
}

/// Check id uniqueness and return the set of every known id, including
/// those of entries that failed to parse.
fn collect_ids<'a, T>(
    collection: &'a Collection<T>,
    key: &str,
    id_field: &str,
    id_of: impl Fn(&T) -> &str,
    issues: &mut Vec<ValidationIssue>,
) -> FxHashSet<&'a str> {
    let mut seen = FxHashSet::default();
    for (index, item) in &collection.items {
        let id = id_of(item);
        let path = format!("{}[{}].{}", key, index, id_field);
        if id.trim().is_empty() {
            issues.push(ValidationIssue::new(path, Problem::EmptyId));
        } else if !seen.insert(id) {
            issues.push(ValidationIssue::new(path, Problem::DuplicateId(id.to_string())));
        }
    }
    seen.extend(collection.broken_ids.iter().map(String::as_str));
    seen
}

fn check_refs<'r, I>(
    refs: I,
    known: &FxHashSet<&str>,
    kind: EntityKind,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) where
    I: IntoIterator<Item = &'r str>,
{
    for (index, id) in refs.into_iter().enumerate() {
        check_ref(id, known, kind, &format!("{}[{}]", path, index), issues);
    }
}

fn check_ref(
    id: &str,
    known: &FxHashSet<&str>,
    kind: EntityKind,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if !known.contains(id) {
        issues.push(ValidationIssue::new(
            path,
            Problem::DanglingReference {
                kind,
                id: id.to_string(),
            },
        ));
    }
}

/// Resolve beat positions and sequence numbers. Document order is the
/// canonical sequence; authored positions are kept even when they do not
/// increase.
fn resolve_positions(beats: &mut Collection<StoryBeat>) {
    let mut previous: Option<u32> = None;
    for (sequence, (index, beat)) in beats.items.iter_mut().enumerate() {
        let position = match (beat.position, previous) {
            (Some(position), Some(prev)) if position <= prev => {
                tracing::warn!(
                    beat = %beat.storybeat_id,
                    index,
                    position,
                    previous = prev,
                    "position does not increase, keeping document order"
                );
                position
            }
            (Some(position), _) => position,
            (None, Some(prev)) => prev.saturating_add(1),
            (None, None) => 0,
        };
        beat.resolved_position = position;
        beat.sequence = sequence;
        previous = Some(position);
    }
}

fn check_perspectives(perspectives: &Collection<Perspective>, issues: &mut Vec<ValidationIssue>) {
    for (index, perspective) in &perspectives.items {
        if let Some(intensity) = perspective.tension_intensity {
            if !(0.0..=1.0).contains(&intensity) {
                issues.push(ValidationIssue::new(
                    format!("perspectives[{}].tension_intensity", index),
                    Problem::OutOfRange(format!("{} is outside [0, 1]", intensity)),
                ));
            }
        }
    }
}

/// Validate raw JSON and build a document, or report every issue found.
pub(crate) fn build_document(value: Value) -> Result<NarrativeDocument, ValidationError> {
    let mut root = match value {
        Value::Object(root) => root,
        other => {
            return Err(ValidationError::single(
                "$",
                Problem::Malformed(format!(
                    "document root must be an object, found {}",
                    json_kind(&other)
                )),
            ))
        }
    };

    let mut issues = Vec::new();

    let players: Collection<Player> = take_collection(&mut root, "players", "player_id", &mut issues);
    let perspectives: Collection<Perspective> =
        take_collection(&mut root, "perspectives", "perspective_id", &mut issues);
    let mut beats: Collection<StoryBeat> =
        take_collection(&mut root, "storybeats", "storybeat_id", &mut issues);
    let storypoints: Collection<StoryPoint> =
        take_collection(&mut root, "storypoints", "storypoint_id", &mut issues);
    let moments: Collection<Moment> = take_collection(&mut root, "moments", "moment_id", &mut issues);

    // What is left of the root is document metadata.
    let meta = match serde_json::from_value::<DocumentMeta>(Value::Object(root)) {
        Ok(meta) => Some(meta),
        Err(e) => {
            issues.push(ValidationIssue::new("$", Problem::Malformed(e.to_string())));
            None
        }
    };

    resolve_positions(&mut beats);
    check_perspectives(&perspectives, &mut issues);

    {
        let player_ids = collect_ids(&players, "players", "player_id", |p| p.player_id.as_str(), &mut issues);
        let perspective_ids = collect_ids(
            &perspectives,
            "perspectives",
            "perspective_id",
            |p| p.perspective_id.as_str(),
            &mut issues,
        );
        let beat_ids = collect_ids(&beats, "storybeats", "storybeat_id", |b| b.storybeat_id.as_str(), &mut issues);
        let storypoint_ids = collect_ids(
            &storypoints,
            "storypoints",
            "storypoint_id",
            |sp| sp.storypoint_id.as_str(),
            &mut issues,
        );
        let moment_ids = collect_ids(&moments, "moments", "moment_id", |m| m.moment_id.as_str(), &mut issues);

        let storypoint_owner: FxHashMap<&str, &str> = storypoints
            .items
            .iter()
            .map(|(_, sp)| (sp.storypoint_id.as_str(), sp.storybeat_id.as_str()))
            .collect();
        let moment_owner: FxHashMap<&str, &str> = moments
            .items
            .iter()
            .map(|(_, m)| (m.moment_id.as_str(), m.storybeat_id.as_str()))
            .collect();

        for (index, beat) in &beats.items {
            let base = format!("storybeats[{}]", index);
            check_refs(
                beat.related_players.iter().map(|id| id.as_str()),
                &player_ids,
                EntityKind::Player,
                &format!("{}.related_players", base),
                &mut issues,
            );
            check_refs(
                beat.related_perspectives.iter().map(|id| id.as_str()),
                &perspective_ids,
                EntityKind::Perspective,
                &format!("{}.related_perspectives", base),
                &mut issues,
            );
            check_refs(
                beat.related_storypoints.iter().map(|id| id.as_str()),
                &storypoint_ids,
                EntityKind::StoryPoint,
                &format!("{}.related_storypoints", base),
                &mut issues,
            );
            check_refs(
                beat.related_moments.iter().map(|id| id.as_str()),
                &moment_ids,
                EntityKind::Moment,
                &format!("{}.related_moments", base),
                &mut issues,
            );

            let beat_id = beat.storybeat_id.as_str();
            let owned = beat
                .related_storypoints
                .iter()
                .map(|id| ("related_storypoints", id.as_str(), storypoint_owner.get(id.as_str())))
                .chain(
                    beat.related_moments
                        .iter()
                        .map(|id| ("related_moments", id.as_str(), moment_owner.get(id.as_str()))),
                );
            for (field, id, owner) in owned {
                if let Some(owner) = owner {
                    if *owner != beat_id {
                        issues.push(ValidationIssue::new(
                            format!("{}.{}", base, field),
                            Problem::WrongOwner {
                                id: id.to_string(),
                                owner: owner.to_string(),
                            },
                        ));
                    }
                }
            }
        }

        for (index, storypoint) in &storypoints.items {
            let base = format!("storypoints[{}]", index);
            check_ref(
                storypoint.storybeat_id.as_str(),
                &beat_ids,
                EntityKind::StoryBeat,
                &format!("{}.storybeat_id", base),
                &mut issues,
            );
            check_refs(
                storypoint.related_players.iter().map(|id| id.as_str()),
                &player_ids,
                EntityKind::Player,
                &format!("{}.related_players", base),
                &mut issues,
            );
        }

        for (index, moment) in &moments.items {
            check_ref(
                moment.storybeat_id.as_str(),
                &beat_ids,
                EntityKind::StoryBeat,
                &format!("moments[{}].storybeat_id", index),
                &mut issues,
            );
        }
    }

    match meta {
        Some(meta) if issues.is_empty() => Ok(NarrativeDocument::from_parts(
            meta,
            strip(players),
            strip(perspectives),
            strip(beats),
            strip(storypoints),
            strip(moments),
        )),
        _ => Err(ValidationError { issues }),
    }
}

fn strip<T>(collection: Collection<T>) -> Vec<T> {
    collection.items.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(err: &ValidationError) -> Vec<&str> {
        err.issues.iter().map(|i| i.path.as_str()).collect()
    }

    #[test]
    fn root_must_be_object() {
        let err = build_document(json!([1, 2, 3])).unwrap_err();
        assert_eq!(paths(&err), vec!["$"]);
    }

    #[test]
    fn missing_title_is_reported() {
        let err = build_document(json!({"players": []})).unwrap_err();
        assert_eq!(paths(&err), vec!["$"]);
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn collects_every_malformed_entity() {
        let err = build_document(json!({
            "title": "Broken",
            "players": [
                {"player_id": "a"},
                {"player_id": "b", "name": "B"},
                {"name": "no id"}
            ],
            "storybeats": [
                {"storybeat_id": "b1", "related_players": "a"}
            ]
        }))
        .unwrap_err();
        assert_eq!(paths(&err), vec!["players[0]", "players[2]", "storybeats[0]"]);
    }

    #[test]
    fn references_to_malformed_entities_are_not_dangling() {
        let err = build_document(json!({
            "title": "Broken",
            "players": [{"player_id": "a"}],
            "storybeats": [{"storybeat_id": "b1", "related_players": ["a"]}]
        }))
        .unwrap_err();
        assert_eq!(paths(&err), vec!["players[0]"]);
    }

    #[test]
    fn dangling_references_carry_field_paths() {
        let err = build_document(json!({
            "title": "Dangling",
            "players": [{"player_id": "a", "name": "A"}],
            "storybeats": [
                {"storybeat_id": "b1", "related_players": ["a", "ghost"], "related_perspectives": ["nowhere"]}
            ],
            "moments": [{"moment_id": "m1", "storybeat_id": "b9", "description": "lost"}]
        }))
        .unwrap_err();
        assert_eq!(
            paths(&err),
            vec![
                "storybeats[0].related_players[1]",
                "storybeats[0].related_perspectives[0]",
                "moments[0].storybeat_id"
            ]
        );
        assert_eq!(
            err.issues[0].problem,
            Problem::DanglingReference {
                kind: EntityKind::Player,
                id: "ghost".to_string()
            }
        );
    }

    #[test]
    fn duplicate_and_empty_ids() {
        let err = build_document(json!({
            "title": "Dupes",
            "players": [
                {"player_id": "a", "name": "A"},
                {"player_id": "a", "name": "A again"},
                {"player_id": "", "name": "Nobody"}
            ]
        }))
        .unwrap_err();
        assert_eq!(err.issues[0].problem, Problem::DuplicateId("a".to_string()));
        assert_eq!(err.issues[1].problem, Problem::EmptyId);
    }

    #[test]
    fn beat_listing_foreign_moment_is_rejected() {
        let err = build_document(json!({
            "title": "Owners",
            "storybeats": [
                {"storybeat_id": "b1", "related_moments": ["m2"]},
                {"storybeat_id": "b2"}
            ],
            "moments": [{"moment_id": "m2", "storybeat_id": "b2", "description": "x"}]
        }))
        .unwrap_err();
        assert_eq!(
            err.issues[0].problem,
            Problem::WrongOwner {
                id: "m2".to_string(),
                owner: "b2".to_string()
            }
        );
    }

    #[test]
    fn positions_are_filled_in_document_order() {
        let doc = build_document(json!({
            "title": "Ordered",
            "storybeats": [
                {"storybeat_id": "b1"},
                {"storybeat_id": "b2", "position": 10},
                {"storybeat_id": "b3"}
            ]
        }))
        .unwrap();
        let positions: Vec<u32> = doc.beats().iter().map(|b| b.position()).collect();
        assert_eq!(positions, vec![0, 10, 11]);

        let sequence: Vec<usize> = doc.beats().iter().map(|b| b.sequence()).collect();
        assert_eq!(sequence, vec![0, 1, 2]);
        assert_eq!(doc.beats()[0].position, None);
    }

    #[test]
    fn non_increasing_positions_keep_document_order() {
        let doc = build_document(json!({
            "title": "Unordered",
            "storybeats": [
                {"storybeat_id": "b1", "position": 5},
                {"storybeat_id": "b2", "position": 5},
                {"storybeat_id": "b3", "position": 2},
                {"storybeat_id": "b4"}
            ]
        }))
        .unwrap();
        let ids: Vec<&str> = doc.beats().iter().map(|b| b.storybeat_id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2", "b3", "b4"]);
        let positions: Vec<u32> = doc.beats().iter().map(|b| b.position()).collect();
        assert_eq!(positions, vec![5, 5, 2, 3]);
        assert_eq!(doc.beats()[2].position, Some(2));
    }

    #[test]
    fn intensity_must_be_unit_interval() {
        let err = build_document(json!({
            "title": "Intense",
            "perspectives": [{"perspective_id": "p", "name": "P", "tension_intensity": 1.5}]
        }))
        .unwrap_err();
        assert_eq!(paths(&err), vec!["perspectives[0].tension_intensity"]);
    }

    #[test]
    fn collection_must_be_array() {
        let err = build_document(json!({"title": "Odd", "moments": {"m1": {}}})).unwrap_err();
        assert_eq!(paths(&err), vec!["moments"]);
        assert!(err.to_string().contains("expected an array, found an object"));
    }
}
