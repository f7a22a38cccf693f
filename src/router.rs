// Trust-Tier Router
// Decides, per analysis operation, whether raw content (local tier) or
// only anonymized content (remote tier) may reach an LLM collaborator.
// Upstream degradation becomes a tagged Unavailable outcome; policy
// violations are errors, because they are defects in the calling code.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::analysis::{
    RiskSignal, SituationBrief, StakeholderIntent, ToneReport, UnresolvedThread,
};
use crate::errors::VaultError;
use crate::llm::{CompletionClient, CompletionOptions};
use crate::model_output::extract_json;
use crate::privacy::session::AnonymizedText;
use crate::privacy::{AuditLogger, AuditRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustTier {
    /// On-device model; may see raw decrypted content, rosters, metadata.
    Local,
    /// Off-device model; may only see output of the anonymizer.
    Remote,
}

impl TrustTier {
    fn label(&self) -> &'static str {
        match self {
            TrustTier::Local => "local",
            TrustTier::Remote => "remote",
        }
    }
}

/// Payload offered to an analysis operation. The Anonymized variant can
/// only be built from `AnonymizationSession::anonymize`'s return value,
/// which is how a caller proves provenance to the remote path.
#[derive(Debug, Clone)]
pub enum TierPayload {
    Raw(String),
    Anonymized(AnonymizedText),
}

impl TierPayload {
    pub fn raw(text: &str) -> Self {
        TierPayload::Raw(text.to_string())
    }
}

/// Either a parsed analysis value or a tagged "unavailable" state.
/// Degraded analysis never blocks the user from their own data, so
/// callers substitute the operation's documented default on Unavailable
/// instead of surfacing a hard failure.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome<T> {
    Ready(T),
    Unavailable { reason: String },
}

impl<T> AnalysisOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, AnalysisOutcome::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            AnalysisOutcome::Ready(value) => Some(value),
            AnalysisOutcome::Unavailable { .. } => None,
        }
    }

    pub fn value_or(self, fallback: T) -> T {
        match self {
            AnalysisOutcome::Ready(value) => value,
            AnalysisOutcome::Unavailable { .. } => fallback,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AnalysisOutcome<U> {
        match self {
            AnalysisOutcome::Ready(value) => AnalysisOutcome::Ready(f(value)),
            AnalysisOutcome::Unavailable { reason } => AnalysisOutcome::Unavailable { reason },
        }
    }

    /// For callers that need a hard error instead of a degraded default,
    /// e.g. a batch job that should abort rather than archive neutral
    /// placeholder analyses.
    pub fn into_result(self) -> Result<T, VaultError> {
        match self {
            AnalysisOutcome::Ready(value) => Ok(value),
            AnalysisOutcome::Unavailable { reason } => {
                Err(VaultError::AnalysisUnavailable(reason))
            }
        }
    }
}

mod prompts {
    pub fn tone(content: &str) -> String {
        format!(
            "Analyze the tone of this workplace message. Respond with JSON: \
             {{\"sentiment\": \"positive\"|\"neutral\"|\"negative\", \
             \"intensity\": 0.0-1.0, \"summary\": \"one sentence\"}}\n\n\
             Message:\n{content}"
        )
    }

    pub fn intents(content: &str) -> String {
        format!(
            "For each stakeholder in this exchange, infer what they want. \
             Respond with JSON: {{\"intents\": [{{\"stakeholder\": \"name\", \
             \"intent\": \"inform\"|\"request\"|\"escalate\"|\"decide\"|\"stall\", \
             \"rationale\": \"...\"}}]}}\n\nExchange:\n{content}"
        )
    }

    pub fn threads(content: &str) -> String {
        format!(
            "List questions or requests in this exchange that nobody answered. \
             Respond with JSON: {{\"threads\": [{{\"topic\": \"...\", \
             \"last_touched_by\": \"name\", \"blocking\": true|false}}]}}\n\n\
             Exchange:\n{content}"
        )
    }

    pub fn risks(content: &str) -> String {
        format!(
            "Identify risk signals in this exchange (deadlines at risk, \
             escalation, conflict). Respond with JSON: {{\"risks\": \
             [{{\"description\": \"...\", \"severity\": \"low\"|\"medium\"|\"high\"}}]}}\n\n\
             Exchange:\n{content}"
        )
    }

    pub fn brief(content: &str) -> String {
        format!(
            "Summarize this situation and suggest next steps. Refer to people \
             only by the tokens already present in the text. Respond with JSON: \
             {{\"summary\": \"...\", \"actions\": [{{\"action\": \"...\", \
             \"rationale\": \"...\"}}]}}\n\nSituation:\n{content}"
        )
    }
}

pub struct TrustTierRouter {
    local: Arc<dyn CompletionClient>,
    remote: Arc<dyn CompletionClient>,
    options: CompletionOptions,
    audit: AuditLogger,
}

impl TrustTierRouter {
    pub fn new(local: Arc<dyn CompletionClient>, remote: Arc<dyn CompletionClient>) -> Self {
        Self {
            local,
            remote,
            options: CompletionOptions::default(),
            audit: AuditLogger::new(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// Tone/sentiment scoring. Local tier; neutral tone on degradation.
    pub async fn analyze_tone(&self, content: &str) -> AnalysisOutcome<ToneReport> {
        self.local_op("analyze_tone", content, prompts::tone)
            .await
            .map(|value| ToneReport::from_model_value(&value))
    }

    /// Per-stakeholder intent inference. Local tier; empty list on
    /// degradation.
    pub async fn infer_intents(&self, content: &str) -> AnalysisOutcome<Vec<StakeholderIntent>> {
        self.local_op("infer_intents", content, prompts::intents)
            .await
            .map(|value| StakeholderIntent::list_from_model_value(&value))
    }

    /// Unresolved-thread extraction. Local tier; empty list on
    /// degradation.
    pub async fn extract_unresolved_threads(
        &self,
        content: &str,
    ) -> AnalysisOutcome<Vec<UnresolvedThread>> {
        self.local_op("unresolved_threads", content, prompts::threads)
            .await
            .map(|value| UnresolvedThread::list_from_model_value(&value))
    }

    /// Risk-signal detection. Local tier; empty list on degradation.
    pub async fn detect_risk_signals(&self, content: &str) -> AnalysisOutcome<Vec<RiskSignal>> {
        self.local_op("risk_signals", content, prompts::risks)
            .await
            .map(|value| RiskSignal::list_from_model_value(&value))
    }

    /// Situation summary plus suggested actions on either tier. The
    /// remote path refuses raw payloads with `PolicyViolation` before any
    /// network call; on degradation the caller substitutes
    /// `SuggestedAction::generic_fallback`. Remote results are keyed by
    /// placeholders and are de-anonymized by the caller's session.
    pub async fn situation_brief(
        &self,
        tier: TrustTier,
        payload: &TierPayload,
    ) -> Result<AnalysisOutcome<SituationBrief>, VaultError> {
        let outcome = self
            .request_json(tier, payload, "situation_brief", prompts::brief)
            .await?;
        Ok(outcome.map(|value| SituationBrief::from_model_value(&value)))
    }

    /// Local tier never has a policy to violate, so upstream problems are
    /// the only failure mode and they fold into Unavailable.
    async fn local_op(
        &self,
        event: &str,
        content: &str,
        build_prompt: fn(&str) -> String,
    ) -> AnalysisOutcome<Value> {
        let payload = TierPayload::raw(content);
        match self
            .request_json(TrustTier::Local, &payload, event, build_prompt)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => AnalysisOutcome::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    async fn request_json(
        &self,
        tier: TrustTier,
        payload: &TierPayload,
        event: &str,
        build_prompt: fn(&str) -> String,
    ) -> Result<AnalysisOutcome<Value>, VaultError> {
        // Policy gate comes first: nothing raw may even reach the point
        // where a remote request is constructed
        let content = match (tier, payload) {
            (TrustTier::Remote, TierPayload::Raw(_)) => {
                return Err(VaultError::PolicyViolation(format!(
                    "remote-tier operation '{}' invoked with a raw payload",
                    event
                )));
            }
            (_, TierPayload::Raw(text)) => text.as_str(),
            (_, TierPayload::Anonymized(text)) => text.as_str(),
        };

        let client = match tier {
            TrustTier::Local => &self.local,
            TrustTier::Remote => &self.remote,
        };

        let started = Instant::now();
        let reply = client.complete(&build_prompt(content), &self.options).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let record = |error_type: Option<&str>| AuditRecord {
            tier: Some(tier.label().to_string()),
            latency_ms: Some(latency_ms),
            error_type: error_type.map(|e| e.to_string()),
            ..AuditRecord::default()
        };

        match reply {
            Ok(text) => match extract_json(&text) {
                Some(value) => {
                    self.audit.log_event(event, &record(None));
                    Ok(AnalysisOutcome::Ready(value))
                }
                None => {
                    self.audit.log_event(event, &record(Some("unparseable_output")));
                    Ok(AnalysisOutcome::Unavailable {
                        reason: "model output contained no parseable JSON".to_string(),
                    })
                }
            },
            Err(e) => {
                self.audit.log_event(event, &record(Some("upstream_failure")));
                Ok(AnalysisOutcome::Unavailable {
                    reason: self.audit.sanitize_error_message(&e.to_string()),
                })
            }
        }
    }
}
