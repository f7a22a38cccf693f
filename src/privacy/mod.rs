// Privacy module - the trust-boundary data-protection layer
// Rule-based entity detection, session-scoped anonymization, and
// sanitized audit logging.

pub mod audit;
pub mod resolver;
pub mod session;

pub use audit::{AuditLogger, AuditRecord};
pub use resolver::{Entity, EntityKind, EntityResolver, ParticipantRoster};
pub use session::{AnonymizationOutcome, AnonymizationSession, AnonymizedText, Substitution};
