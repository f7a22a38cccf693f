// Entity Resolver
// Deterministic, rule-based PII detection over free text. No trained
// model: an ordered list of pattern matchers plus the registered roster,
// merged by one conflict-resolution rule (priority order, and spans
// already claimed by an earlier rule are never re-matched).

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Participant;

/// Name fragments shorter than this are not matched, to avoid
/// over-matching initials.
const MIN_FRAGMENT_LEN: usize = 3;

/// Kinds of PII-bearing spans, in detection priority order:
/// email > phone > mention > name/custom > url-host > ip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Email,
    Phone,
    Domain,
    IpAddress,
    Custom,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Person => "PERSON",
            EntityKind::Email => "EMAIL",
            EntityKind::Phone => "PHONE",
            EntityKind::Domain => "DOMAIN",
            EntityKind::IpAddress => "IP",
            EntityKind::Custom => "CUSTOM",
        }
    }
}

/// One detected PII span. `normalized` is the case/format-insensitive
/// identity used for map lookups, so "John", "john" and "JOHN" collapse
/// to one entity, as do "555-123-4567" and "(555) 123-4567".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub original: String,
    pub normalized: String,
    pub start: usize,
    pub end: usize,
}

/// Registered participant names and emails for a situation. Seeds name
/// detection beyond what the regex patterns alone would catch; patterns
/// can find emails and phones but not arbitrary human names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantRoster {
    names: Vec<String>,
    emails: Vec<String>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_participants(participants: &[Participant]) -> Self {
        let mut roster = Self::new();
        for p in participants {
            roster.add_name(&p.display_name);
            if let Some(email) = &p.email {
                roster.add_email(email);
            }
        }
        roster
    }

    pub fn add_name(&mut self, name: &str) {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return;
        }
        let lower = trimmed.to_lowercase();
        if !self.names.iter().any(|n| n.to_lowercase() == lower) {
            self.names.push(trimmed.to_string());
        }
    }

    pub fn add_email(&mut self, email: &str) {
        let trimmed = email.trim();
        if trimmed.is_empty() {
            return;
        }
        let lower = trimmed.to_lowercase();
        if !self.emails.iter().any(|e| e.to_lowercase() == lower) {
            self.emails.push(trimmed.to_string());
        }
    }

    /// Additive merge; registered entries are never removed.
    pub fn merge(&mut self, other: &ParticipantRoster) {
        for name in &other.names {
            self.add_name(name);
        }
        for email in &other.emails {
            self.add_email(email);
        }
    }

    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.emails.is_empty()
    }

    /// Full names plus whitespace-split fragments of at least
    /// `MIN_FRAGMENT_LEN` characters, deduplicated case-insensitively.
    pub fn name_terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        let mut push = |term: &str| {
            let lower = term.to_lowercase();
            if !terms.iter().any(|t: &String| t.to_lowercase() == lower) {
                terms.push(term.to_string());
            }
        };
        for name in &self.names {
            push(name);
            for fragment in name.split_whitespace() {
                if fragment.chars().count() >= MIN_FRAGMENT_LEN {
                    push(fragment);
                }
            }
        }
        terms
    }
}

pub struct EntityResolver {
    email_re: Regex,
    phone_re: Regex,
    mention_re: Regex,
    url_re: Regex,
    ipv4_re: Regex,
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityResolver {
    pub fn new() -> Self {
        Self {
            // Email: RFC-lite local@domain shape
            email_re: Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").unwrap(),

            // Phone: common separator conventions, optional country code
            phone_re: Regex::new(
                r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{3}\)[\s.-]?|\d{3}[\s.-]?)\d{3}[\s.-]?\d{4}\b",
            )
            .unwrap(),

            // Provider-specific user-mention token, e.g. Slack's <@U04KX9>
            mention_re: Regex::new(r"<@([A-Za-z0-9._-]+)>").unwrap(),

            // URL: the host is capture group 1; path and query stay intact
            url_re: Regex::new(r"(?i)\bhttps?://([a-z0-9][a-z0-9.-]*)(?::\d+)?(?:[/?#][^\s]*)?")
                .unwrap(),

            // Dotted-quad IPv4; octet range checked after matching
            ipv4_re: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap(),
        }
    }

    /// Detect PII spans in priority order. Returned entities are
    /// non-overlapping and sorted by position. Later rules never re-match
    /// text inside a span an earlier rule already claimed.
    pub fn detect(
        &self,
        text: &str,
        roster: &ParticipantRoster,
        custom_identifiers: &[String],
    ) -> Vec<Entity> {
        let mut entities: Vec<Entity> = Vec::new();
        // Spans no later rule may touch; for URLs this covers the whole
        // match even though the entity span is only the host.
        let mut claimed: Vec<(usize, usize)> = Vec::new();

        let overlaps = |claimed: &[(usize, usize)], start: usize, end: usize| {
            claimed.iter().any(|&(s, e)| start < e && end > s)
        };

        // 1. Emails
        for mat in self.email_re.find_iter(text) {
            if overlaps(&claimed, mat.start(), mat.end()) {
                continue;
            }
            claimed.push((mat.start(), mat.end()));
            entities.push(Entity {
                kind: EntityKind::Email,
                original: mat.as_str().to_string(),
                normalized: mat.as_str().to_lowercase(),
                start: mat.start(),
                end: mat.end(),
            });
        }

        // 2. Phone numbers, keyed by digits only so separator variants of
        // one number collapse to one entity
        for mat in self.phone_re.find_iter(text) {
            let digits: String = mat
                .as_str()
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            if digits.len() < 7 || digits.len() > 15 {
                continue;
            }
            if overlaps(&claimed, mat.start(), mat.end()) {
                continue;
            }
            claimed.push((mat.start(), mat.end()));
            entities.push(Entity {
                kind: EntityKind::Phone,
                original: mat.as_str().to_string(),
                normalized: digits,
                start: mat.start(),
                end: mat.end(),
            });
        }

        // 3. Provider user-mention tokens, treated as person kind
        for cap in self.mention_re.captures_iter(text) {
            let mat = cap.get(0).unwrap();
            if overlaps(&claimed, mat.start(), mat.end()) {
                continue;
            }
            claimed.push((mat.start(), mat.end()));
            entities.push(Entity {
                kind: EntityKind::Person,
                original: mat.as_str().to_string(),
                normalized: cap[1].to_lowercase(),
                start: mat.start(),
                end: mat.end(),
            });
        }

        // 4. Roster names, roster emails, and caller-supplied custom
        // identifiers: case-insensitive whole words, longest term first so
        // "Jane Doe" wins over "Jane". A name that is also a common
        // English word is still matched; that tradeoff is deliberate.
        let mut terms: Vec<(String, EntityKind)> = roster
            .name_terms()
            .into_iter()
            .map(|t| (t, EntityKind::Person))
            .collect();
        terms.extend(
            roster
                .emails()
                .iter()
                .map(|e| (e.clone(), EntityKind::Email)),
        );
        terms.extend(
            custom_identifiers
                .iter()
                .filter(|t| !t.trim().is_empty())
                .map(|t| (t.trim().to_string(), EntityKind::Custom)),
        );
        terms.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        for (term, kind) in terms {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(&term));
            let Ok(term_re) = Regex::new(&pattern) else {
                continue;
            };
            for mat in term_re.find_iter(text) {
                if overlaps(&claimed, mat.start(), mat.end()) {
                    continue;
                }
                claimed.push((mat.start(), mat.end()));
                entities.push(Entity {
                    kind,
                    original: mat.as_str().to_string(),
                    normalized: mat.as_str().to_lowercase(),
                    start: mat.start(),
                    end: mat.end(),
                });
            }
        }

        // 5. URLs: only the host is an entity, but the whole URL is
        // claimed so nothing inside the path is flagged separately
        for cap in self.url_re.captures_iter(text) {
            let whole = cap.get(0).unwrap();
            let host = cap.get(1).unwrap();
            if overlaps(&claimed, host.start(), host.end()) {
                continue;
            }
            claimed.push((whole.start(), whole.end()));
            entities.push(Entity {
                kind: EntityKind::Domain,
                original: host.as_str().to_string(),
                normalized: host.as_str().to_lowercase(),
                start: host.start(),
                end: host.end(),
            });
        }

        // 6. IPv4 dotted quads
        for mat in self.ipv4_re.find_iter(text) {
            let valid = mat
                .as_str()
                .split('.')
                .all(|octet| octet.parse::<u16>().map(|n| n <= 255).unwrap_or(false));
            if !valid {
                continue;
            }
            if overlaps(&claimed, mat.start(), mat.end()) {
                continue;
            }
            claimed.push((mat.start(), mat.end()));
            entities.push(Entity {
                kind: EntityKind::IpAddress,
                original: mat.as_str().to_string(),
                normalized: mat.as_str().to_string(),
                start: mat.start(),
                end: mat.end(),
            });
        }

        entities.sort_by_key(|e| e.start);
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_with(names: &[&str]) -> ParticipantRoster {
        let mut roster = ParticipantRoster::new();
        for name in names {
            roster.add_name(name);
        }
        roster
    }

    #[test]
    fn test_roster_from_participants() {
        let participants = vec![
            Participant::new("Jane Doe", Some("jane.doe@corp.com")),
            Participant::new("jane doe", None), // case-insensitive duplicate
        ];
        let roster = ParticipantRoster::from_participants(&participants);
        assert_eq!(roster.name_terms(), vec!["Jane Doe", "Jane", "Doe"]);
        assert_eq!(roster.emails(), &["jane.doe@corp.com".to_string()]);
    }

    #[test]
    fn test_email_detection() {
        let resolver = EntityResolver::new();
        let entities = resolver.detect(
            "Contact jane.doe@corp.com today",
            &ParticipantRoster::new(),
            &[],
        );
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].kind, EntityKind::Email);
        assert_eq!(entities[0].normalized, "jane.doe@corp.com");
    }

    #[test]
    fn test_phone_separator_variants_share_a_key() {
        let resolver = EntityResolver::new();
        let roster = ParticipantRoster::new();
        let a = resolver.detect("call 555-123-4567", &roster, &[]);
        let b = resolver.detect("call (555) 123-4567", &roster, &[]);
        assert_eq!(a[0].kind, EntityKind::Phone);
        assert_eq!(a[0].normalized, b[0].normalized);
        assert_eq!(a[0].normalized, "5551234567");
    }

    #[test]
    fn test_mention_token_is_person() {
        let resolver = EntityResolver::new();
        let entities = resolver.detect("ping <@U04KX9> about it", &ParticipantRoster::new(), &[]);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].kind, EntityKind::Person);
        assert_eq!(entities[0].original, "<@U04KX9>");
        assert_eq!(entities[0].normalized, "u04kx9");
    }

    #[test]
    fn test_roster_name_and_fragments() {
        let resolver = EntityResolver::new();
        let roster = roster_with(&["Jane Doe"]);
        let entities = resolver.detect("Jane Doe said jane would follow up", &roster, &[]);
        assert_eq!(entities.len(), 2);
        // Full name claimed first, then the lone fragment
        assert_eq!(entities[0].original, "Jane Doe");
        assert_eq!(entities[1].original, "jane");
        assert_eq!(entities[1].normalized, "jane");
    }

    #[test]
    fn test_short_fragments_excluded() {
        let resolver = EntityResolver::new();
        let roster = roster_with(&["Jo Li"]);
        // Both fragments are under 3 chars; only the full name matches
        let entities = resolver.detect("Jo said hi, and Jo Li agreed", &roster, &[]);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].original, "Jo Li");
    }

    #[test]
    fn test_email_wins_over_roster_name() {
        let resolver = EntityResolver::new();
        let roster = roster_with(&["Jane Doe"]);
        let entities = resolver.detect("mail jane.doe@corp.com", &roster, &[]);
        // The "jane" and "doe" inside the address stay part of the email span
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].kind, EntityKind::Email);
    }

    #[test]
    fn test_phone_wins_over_roster_name_fragment() {
        let resolver = EntityResolver::new();
        // "123-4567" is a registered fragment of the desk-line label and
        // also the tail of the phone number in the text
        let roster = roster_with(&["Ext 123-4567"]);
        let entities = resolver.detect("call 555-123-4567 about the renewal", &roster, &[]);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].kind, EntityKind::Phone);
        assert_eq!(entities[0].original, "555-123-4567");
    }

    #[test]
    fn test_url_entity_is_host_only() {
        let resolver = EntityResolver::new();
        let text = "see https://acme-corp.com/docs/plan?rev=2 for details";
        let entities = resolver.detect(text, &ParticipantRoster::new(), &[]);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].kind, EntityKind::Domain);
        assert_eq!(entities[0].original, "acme-corp.com");
        // Span covers exactly the host, so path and query survive replacement
        assert_eq!(&text[entities[0].start..entities[0].end], "acme-corp.com");
    }

    #[test]
    fn test_domain_inside_url_not_rematched_by_roster() {
        let resolver = EntityResolver::new();
        let roster = roster_with(&["acme"]);
        let entities = resolver.detect("https://acme.com/x and acme itself", &roster, &[]);
        let domains: Vec<_> = entities
            .iter()
            .filter(|e| e.kind == EntityKind::Domain)
            .collect();
        let persons: Vec<_> = entities
            .iter()
            .filter(|e| e.kind == EntityKind::Person)
            .collect();
        // Roster runs before URLs, so "acme" in the host is claimed as a
        // name; the bare word is too. The host loses its claim to the
        // higher-priority rule.
        assert_eq!(persons.len(), 2);
        assert!(domains.is_empty());
    }

    #[test]
    fn test_ipv4_detection_and_octet_check() {
        let resolver = EntityResolver::new();
        let entities = resolver.detect(
            "host 10.1.2.3 is fine, 999.1.2.3 is not an address",
            &ParticipantRoster::new(),
            &[],
        );
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].kind, EntityKind::IpAddress);
        assert_eq!(entities[0].original, "10.1.2.3");
    }

    #[test]
    fn test_custom_identifier() {
        let resolver = EntityResolver::new();
        let entities = resolver.detect(
            "Project Nightjar ships Friday",
            &ParticipantRoster::new(),
            &["Nightjar".to_string()],
        );
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].kind, EntityKind::Custom);
    }

    #[test]
    fn test_common_word_name_still_matched() {
        let resolver = EntityResolver::new();
        let roster = roster_with(&["Will Hunt"]);
        let entities = resolver.detect("will you ask Will Hunt?", &roster, &[]);
        // "will" the verb is replaced too; deliberate precision tradeoff
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn test_entities_sorted_by_position() {
        let resolver = EntityResolver::new();
        let roster = roster_with(&["Jane Doe"]);
        let entities = resolver.detect(
            "Jane Doe <jane.doe@corp.com> or 555-123-4567",
            &roster,
            &[],
        );
        let starts: Vec<usize> = entities.iter().map(|e| e.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }
}
