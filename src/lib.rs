//! CaseVault
//!
//! Trust-boundary data-protection layer for an AI communication
//! case-file assistant: authenticated-encryption envelopes for stored
//! content, deterministic PII anonymization with a session-scoped
//! reversible mapping, and a trust-tier router that keeps raw content on
//! the local tier and only anonymized content on the remote tier.

pub mod analysis;
pub mod custodian;
pub mod envelope;
pub mod errors;
pub mod llm;
pub mod model_output;
pub mod privacy;
pub mod router;
pub mod settings;
pub mod store;
pub mod types;

pub use analysis::{
    RiskSignal, Sentiment, Severity, SituationBrief, StakeholderIntent, SuggestedAction,
    ToneReport, UnresolvedThread,
};
pub use custodian::{CipherParts, KeyCustodian, KeychainCustodian, StaticKeyCustodian};
pub use envelope::EncryptedEnvelope;
pub use errors::VaultError;
pub use llm::{CompletionClient, CompletionOptions, LocalHttpClient, RemoteHttpClient};
pub use privacy::{
    AnonymizationOutcome, AnonymizationSession, AnonymizedText, AuditLogger, Entity, EntityKind,
    EntityResolver, ParticipantRoster, Substitution,
};
pub use router::{AnalysisOutcome, TierPayload, TrustTier, TrustTierRouter};
pub use settings::PrivacySettings;
pub use store::{CommunicationArchive, EnvelopeStore, MemoryStore, ProviderClient};
pub use types::{Channel, CommunicationRecord, Participant};
