// Sanitized audit logging
// Records what the privacy layer did without ever writing the content it
// did it to. Counts, hashes, and enum-ish fields only.

use std::collections::HashMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::privacy::session::Substitution;
use crate::privacy::AnonymizationSession;

/// Fields that are safe to emit. No originals, no placeholder-to-original
/// pairs, no prompt or model text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitutions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_kind: Option<HashMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

pub struct AuditLogger {
    enabled: bool,
    email_re: Regex,
    url_re: Regex,
    phone_re: Regex,
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// Logger that drops events; error sanitization still works.
    pub fn disabled() -> Self {
        Self::with_enabled(false)
    }

    fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            email_re: Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap(),
            url_re: Regex::new(r"https?://[^\s]+").unwrap(),
            phone_re: Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").unwrap(),
        }
    }

    pub fn log_event(&self, event: &str, record: &AuditRecord) {
        if !self.enabled {
            return;
        }
        let json = serde_json::to_string(record).unwrap_or_default();
        eprintln!("[AUDIT] {}: {}", event, json);
    }

    /// Log one anonymization pass: counts per kind, nothing else.
    pub fn log_anonymization(&self, session_id: &str, substitutions: &[Substitution]) {
        let counts = AnonymizationSession::substitution_counts(substitutions);
        let by_kind = counts
            .into_iter()
            .map(|(kind, n)| (kind.label().to_string(), n))
            .collect();
        self.log_event(
            "anonymize",
            &AuditRecord {
                session_hash: Some(hash_for_log(session_id)),
                substitutions: Some(substitutions.len()),
                by_kind: Some(by_kind),
                ..AuditRecord::default()
            },
        );
    }

    /// Strip email/URL/phone shapes out of an error message before it is
    /// logged or attached to an outcome, and cap its length.
    pub fn sanitize_error_message(&self, message: &str) -> String {
        let mut sanitized = self
            .email_re
            .replace_all(message, "[REDACTED_EMAIL]")
            .to_string();
        sanitized = self.url_re.replace_all(&sanitized, "[REDACTED_URL]").to_string();
        sanitized = self
            .phone_re
            .replace_all(&sanitized, "[REDACTED_PHONE]")
            .to_string();

        if sanitized.chars().count() > 200 {
            let truncated: String = sanitized.chars().take(200).collect();
            sanitized = format!("{}...[truncated]", truncated);
        }
        sanitized
    }
}

/// Short stable hash so log lines can be correlated per session without
/// naming the session.
pub fn hash_for_log(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    format!("log_{}", URL_SAFE_NO_PAD.encode(&digest[..8]))
}
