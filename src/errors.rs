// Error taxonomy for the data-protection layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    /// The key capability is unavailable (secure storage locked or no key
    /// provisioned). A crypto-class failure, but distinguishable so callers
    /// can prompt the user to unlock rather than report corruption.
    #[error("Key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Encryption error: {0}")]
    Crypto(String),

    /// Authentication tag check failed on read. Never retried; the stored
    /// envelope is tampered or was sealed under a different key.
    #[error("Envelope integrity check failed")]
    Integrity,

    #[error("Malformed envelope: {0}")]
    Format(String),

    /// Non-anonymized content reached the remote boundary. A contract
    /// violation in the calling code, not a transient condition.
    #[error("Trust-tier policy violation: {0}")]
    PolicyViolation(String),

    #[error("Analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
