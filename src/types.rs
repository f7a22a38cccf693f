// Shared type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source channel a communication was pulled from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Slack,
    Gmail,
    Zoom,
}

/// One raw message record as returned by a provider API client.
/// The text field is plaintext input to `envelope::seal` before storage
/// and candidate input to `AnonymizationSession::anonymize` before any
/// remote analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationRecord {
    pub id: String,
    pub channel: Channel,
    pub author_id: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// A participant in a situation, as registered by the caller from the
/// case file's participant list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Participant {
    pub fn new(display_name: &str, email: Option<&str>) -> Self {
        Self {
            display_name: display_name.to_string(),
            email: email.map(|e| e.to_string()),
        }
    }
}
