// Privacy settings - user controls for the protection layer

use serde::{Deserialize, Serialize};

use crate::errors::VaultError;
use crate::privacy::AuditLogger;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacySettings {
    /// User-defined words to redact (project codenames, company names)
    pub custom_identifiers: Vec<String>,
    /// How long to keep encrypted communications
    pub retention_days: Option<u32>,
    /// Emit sanitized audit lines for anonymization and analysis events
    pub audit_logging: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            custom_identifiers: Vec::new(),
            retention_days: Some(30),
            audit_logging: true,
        }
    }
}

impl PrivacySettings {
    /// Add an identifier, skipping case-insensitive duplicates.
    pub fn add_custom_identifier(&mut self, identifier: &str) {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return;
        }
        let lower = trimmed.to_lowercase();
        if !self
            .custom_identifiers
            .iter()
            .any(|x| x.to_lowercase() == lower)
        {
            self.custom_identifiers.push(trimmed.to_string());
        }
    }

    /// Audit logger honoring the `audit_logging` toggle.
    pub fn audit_logger(&self) -> AuditLogger {
        if self.audit_logging {
            AuditLogger::new()
        } else {
            AuditLogger::disabled()
        }
    }

    pub fn to_json(&self) -> Result<String, VaultError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, VaultError> {
        Ok(serde_json::from_str(json)?)
    }
}
