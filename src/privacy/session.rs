// Anonymization Session
// Stateful bijection between real entities and placeholder tokens.
// A given real entity always maps to the same placeholder within a
// session, and the mapping can be reversed. Derived, reconstructable
// state: never persisted.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::privacy::resolver::{Entity, EntityKind, EntityResolver, ParticipantRoster};

/// Text that has passed through `AnonymizationSession::anonymize`.
/// Only the session can construct one, which is the provenance proof the
/// trust-tier router demands before anything crosses the remote boundary.
#[derive(Debug, Clone)]
pub struct AnonymizedText {
    text: String,
}

impl AnonymizedText {
    pub(crate) fn new(text: String) -> Self {
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_inner(self) -> String {
        self.text
    }
}

/// One replacement made during `anonymize`. The list is for local audit
/// logging only and must never be sent to a remote collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Substitution {
    pub kind: EntityKind,
    pub original: String,
    pub placeholder: String,
    pub start: usize,
    pub end: usize,
}

/// Result of one `anonymize` call: the transformed text plus the audit
/// list of replacements, in detection (position) order.
#[derive(Debug, Clone)]
pub struct AnonymizationOutcome {
    pub text: AnonymizedText,
    pub substitutions: Vec<Substitution>,
}

#[derive(Default)]
struct SessionState {
    forward: HashMap<(EntityKind, String), String>,
    reverse: HashMap<String, String>,
    counters: HashMap<EntityKind, usize>,
    roster: ParticipantRoster,
    custom_identifiers: Vec<String>,
}

impl SessionState {
    /// Look up or assign the placeholder for a normalized entity.
    /// Append-only: once assigned, a pair never changes this session.
    fn placeholder_for(&mut self, entity: &Entity) -> String {
        let key = (entity.kind, entity.normalized.clone());
        if let Some(existing) = self.forward.get(&key) {
            return existing.clone();
        }

        let counter = self.counters.entry(entity.kind).or_insert(0);
        *counter += 1;
        let placeholder = format_placeholder(entity.kind, *counter);

        self.forward.insert(key, placeholder.clone());
        self.reverse
            .insert(placeholder.clone(), entity.original.clone());
        placeholder
    }
}

/// Placeholders are shape-preserving per kind so a remote collaborator's
/// structural assumptions ("this looks like an email") still hold.
fn format_placeholder(kind: EntityKind, n: usize) -> String {
    match kind {
        EntityKind::Person => format!("[PERSON_{}]", n),
        EntityKind::Email => format!("person{}@example.com", n),
        EntityKind::Phone => format!("[PHONE_{}]", n),
        EntityKind::Domain => format!("company{}.example.com", n),
        EntityKind::IpAddress => format!("192.0.2.{}", n),
        EntityKind::Custom => format!("[CUSTOM_{}]", n),
    }
}

/// Session-scoped anonymizer. Shared across in-flight analysis requests
/// for one situation; the combined state sits behind one lock so
/// check-then-insert of a placeholder is atomic and concurrent callers
/// agree on one assignment (first registration wins).
pub struct AnonymizationSession {
    id: String,
    resolver: EntityResolver,
    state: Mutex<SessionState>,
}

impl Default for AnonymizationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnonymizationSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            resolver: EntityResolver::new(),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Opaque session identity, for hashed audit-log correlation only.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Seed known participant names and emails. Additive only.
    pub fn register_participants(&self, roster: &ParticipantRoster) {
        self.state.lock().roster.merge(roster);
    }

    /// Register caller-defined identifiers (project codenames, company
    /// names) to redact as whole words.
    pub fn register_custom_identifiers(&self, identifiers: &[String]) {
        let mut state = self.state.lock();
        for id in identifiers {
            let trimmed = id.trim();
            if trimmed.is_empty() {
                continue;
            }
            let lower = trimmed.to_lowercase();
            if !state
                .custom_identifiers
                .iter()
                .any(|x| x.to_lowercase() == lower)
            {
                state.custom_identifiers.push(trimmed.to_string());
            }
        }
    }

    /// Replace every detected entity with its session placeholder.
    /// Detection itself is pure; placeholder assignment happens under one
    /// lock and completes before this returns, so a caller cancelling a
    /// downstream network call leaves the maps valid for reuse.
    pub fn anonymize(&self, text: &str) -> AnonymizationOutcome {
        let (roster, custom) = {
            let state = self.state.lock();
            (state.roster.clone(), state.custom_identifiers.clone())
        };
        let entities = self.resolver.detect(text, &roster, &custom);

        let mut state = self.state.lock();
        let mut output = String::with_capacity(text.len());
        let mut substitutions = Vec::with_capacity(entities.len());
        let mut cursor = 0;

        // Entities are non-overlapping and position-sorted; replacements
        // apply left-to-right on the original offsets
        for entity in entities {
            let placeholder = state.placeholder_for(&entity);
            output.push_str(&text[cursor..entity.start]);
            output.push_str(&placeholder);
            cursor = entity.end;
            substitutions.push(Substitution {
                kind: entity.kind,
                original: entity.original,
                placeholder,
                start: entity.start,
                end: entity.end,
            });
        }
        output.push_str(&text[cursor..]);

        AnonymizationOutcome {
            text: AnonymizedText::new(output),
            substitutions,
        }
    }

    /// Replace every known placeholder with its original value. Unknown
    /// placeholder-shaped substrings (from a different session, or
    /// incidental brackets in model prose) are left untouched.
    pub fn deanonymize(&self, text: &str) -> String {
        let state = self.state.lock();
        let mut pairs: Vec<(&String, &String)> = state.reverse.iter().collect();
        // Longest placeholder first so [PERSON_1] never clobbers [PERSON_12]
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

        let mut result = text.to_string();
        for (placeholder, original) in pairs {
            if result.contains(placeholder.as_str()) {
                result = result.replace(placeholder.as_str(), original);
            }
        }
        result
    }

    /// Counts of substitutions by kind; safe to log.
    pub fn substitution_counts(substitutions: &[Substitution]) -> HashMap<EntityKind, usize> {
        let mut counts = HashMap::new();
        for sub in substitutions {
            *counts.entry(sub.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Clear all maps, counters, and the roster. Used between unrelated
    /// situations so placeholder reuse cannot leak identities across them.
    pub fn reset(&self) {
        *self.state.lock() = SessionState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn session_with(names: &[&str]) -> AnonymizationSession {
        let session = AnonymizationSession::new();
        let mut roster = ParticipantRoster::new();
        for name in names {
            roster.add_name(name);
        }
        session.register_participants(&roster);
        session
    }

    #[test]
    fn test_reach_jane_scenario() {
        let session = session_with(&["Jane Doe"]);
        let input = "Reach Jane Doe at jane.doe@corp.com or 555-123-4567";
        let outcome = session.anonymize(input);
        let text = outcome.text.as_str();

        assert!(text.contains("[PERSON_1]"));
        assert!(text.contains("person1@example.com"));
        assert!(text.contains("[PHONE_1]"));
        assert!(!text.contains("Jane"));
        assert!(!text.contains("jane.doe@corp.com"));
        assert!(!text.contains("555-123-4567"));
        assert_eq!(outcome.substitutions.len(), 3);

        let restored = session.deanonymize(text);
        assert_eq!(restored, input);
    }

    #[test]
    fn test_same_entity_same_placeholder_across_calls() {
        let session = session_with(&["Jane Doe"]);
        let a = session.anonymize("JANE wrote first");
        let b = session.anonymize("then jane replied");
        assert!(a.text.as_str().contains("[PERSON_1]"));
        assert!(b.text.as_str().contains("[PERSON_1]"));
    }

    #[test]
    fn test_all_occurrences_replaced() {
        let session = session_with(&["Jane Doe"]);
        let outcome = session.anonymize("jane asked, then Jane asked again");
        assert!(!outcome.text.as_str().to_lowercase().contains("jane"));
        assert_eq!(outcome.substitutions.len(), 2);
        assert_eq!(outcome.substitutions[0].placeholder, "[PERSON_1]");
        assert_eq!(outcome.substitutions[1].placeholder, "[PERSON_1]");
    }

    #[test]
    fn test_counters_are_per_kind_and_dense() {
        let session = session_with(&["Jane Doe", "Sam Reyes"]);
        let outcome =
            session.anonymize("Jane Doe and Sam Reyes met; mail a@x.com and b@y.com");
        let text = outcome.text.as_str();
        assert!(text.contains("[PERSON_1]"));
        assert!(text.contains("[PERSON_2]"));
        assert!(text.contains("person1@example.com"));
        assert!(text.contains("person2@example.com"));
    }

    #[test]
    fn test_url_path_preserved() {
        let session = AnonymizationSession::new();
        let outcome = session.anonymize("see https://acme-corp.com/docs/plan?rev=2");
        assert_eq!(
            outcome.text.as_str(),
            "see https://company1.example.com/docs/plan?rev=2"
        );
        let restored = session.deanonymize(outcome.text.as_str());
        assert_eq!(restored, "see https://acme-corp.com/docs/plan?rev=2");
    }

    #[test]
    fn test_unknown_placeholder_left_untouched() {
        let session = session_with(&["Jane Doe"]);
        session.anonymize("Jane Doe was here");
        let text = "per [PERSON_1], ask [PERSON_9] about [other brackets]";
        let restored = session.deanonymize(text);
        assert!(restored.contains("Jane Doe"));
        assert!(restored.contains("[PERSON_9]"));
        assert!(restored.contains("[other brackets]"));
    }

    #[test]
    fn test_deanonymize_handles_double_digit_placeholders() {
        let session = AnonymizationSession::new();
        let mut roster = ParticipantRoster::new();
        let names: Vec<String> = (0..12).map(|i| format!("Person{} Surname{}", i, i)).collect();
        for name in &names {
            roster.add_name(name);
        }
        session.register_participants(&roster);
        let joined = names.join(", ");
        let outcome = session.anonymize(&joined);
        assert!(outcome.text.as_str().contains("[PERSON_12]"));
        assert_eq!(session.deanonymize(outcome.text.as_str()), joined);
    }

    #[test]
    fn test_reset_clears_mappings() {
        let session = session_with(&["Jane Doe"]);
        let outcome = session.anonymize("Jane Doe");
        session.reset();
        // After reset the placeholder is unknown and stays as-is
        assert_eq!(
            session.deanonymize(outcome.text.as_str()),
            outcome.text.as_str()
        );
        // And the roster is gone too
        let again = session.anonymize("Jane Doe");
        assert!(again.substitutions.is_empty());
    }

    #[test]
    fn test_concurrent_callers_agree_on_placeholder() {
        let session = Arc::new(session_with(&["Jane Doe"]));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let session = Arc::clone(&session);
            handles.push(std::thread::spawn(move || {
                session.anonymize("status from Jane Doe").text.into_inner()
            }));
        }
        let results: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for text in &results {
            assert_eq!(text, &results[0]);
            assert!(text.contains("[PERSON_1]"));
        }
    }

    #[test]
    fn test_custom_identifier_redacted() {
        let session = AnonymizationSession::new();
        session.register_custom_identifiers(&["Nightjar".to_string()]);
        let outcome = session.anonymize("Nightjar slips a week");
        assert_eq!(outcome.text.as_str(), "[CUSTOM_1] slips a week");
    }
}
