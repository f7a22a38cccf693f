// Typed analysis results
// Every field of a model response is mapped through an explicit default;
// enum-valued fields are validated against an allow-list. Nothing here
// trusts the model's output shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model_output::{bool_field, f64_field, items, str_field};

/// Overall sentiment of a communication. Defaults to Neutral whenever the
/// model's value is missing or not on the allow-list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|s| s.to_lowercase()).as_deref() {
            Some("positive") => Sentiment::Positive,
            Some("negative") => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

/// Tone/sentiment scoring for one communication. Local tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToneReport {
    pub sentiment: Sentiment,
    /// Clamped to 0.0..=1.0; 0.5 when missing or out of range.
    pub intensity: f64,
    pub summary: String,
}

impl Default for ToneReport {
    fn default() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            intensity: 0.5,
            summary: String::new(),
        }
    }
}

impl ToneReport {
    pub fn from_model_value(value: &Value) -> Self {
        let intensity = f64_field(value, "intensity")
            .filter(|n| n.is_finite())
            .map(|n| n.clamp(0.0, 1.0))
            .unwrap_or(0.5);
        Self {
            sentiment: Sentiment::parse(str_field(value, "sentiment")),
            intensity,
            summary: str_field(value, "summary").unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Inform,
    Request,
    Escalate,
    Decide,
    Stall,
    #[default]
    Unknown,
}

impl IntentKind {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|s| s.to_lowercase()).as_deref() {
            Some("inform") => IntentKind::Inform,
            Some("request") => IntentKind::Request,
            Some("escalate") => IntentKind::Escalate,
            Some("decide") => IntentKind::Decide,
            Some("stall") => IntentKind::Stall,
            _ => IntentKind::Unknown,
        }
    }
}

/// What one stakeholder appears to want. Local tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeholderIntent {
    pub stakeholder: String,
    pub intent: IntentKind,
    pub rationale: String,
}

impl StakeholderIntent {
    fn from_model_value(value: &Value) -> Option<Self> {
        // A stakeholder name is the one field we cannot default
        let stakeholder = str_field(value, "stakeholder")?.trim();
        if stakeholder.is_empty() {
            return None;
        }
        Some(Self {
            stakeholder: stakeholder.to_string(),
            intent: IntentKind::parse(str_field(value, "intent")),
            rationale: str_field(value, "rationale").unwrap_or_default().to_string(),
        })
    }

    pub fn list_from_model_value(value: &Value) -> Vec<Self> {
        items(value, "intents")
            .into_iter()
            .filter_map(Self::from_model_value)
            .collect()
    }
}

/// A question or request nobody has answered yet. Local tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedThread {
    pub topic: String,
    pub last_touched_by: Option<String>,
    pub blocking: bool,
}

impl UnresolvedThread {
    fn from_model_value(value: &Value) -> Option<Self> {
        let topic = str_field(value, "topic")?.trim();
        if topic.is_empty() {
            return None;
        }
        Some(Self {
            topic: topic.to_string(),
            last_touched_by: str_field(value, "last_touched_by").map(|s| s.to_string()),
            blocking: bool_field(value, "blocking").unwrap_or(false),
        })
    }

    pub fn list_from_model_value(value: &Value) -> Vec<Self> {
        items(value, "threads")
            .into_iter()
            .filter_map(Self::from_model_value)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|s| s.to_lowercase()).as_deref() {
            Some("medium") => Severity::Medium,
            Some("high") => Severity::High,
            _ => Severity::Low,
        }
    }
}

/// Something in the communication that could escalate. Local tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSignal {
    pub description: String,
    pub severity: Severity,
}

impl RiskSignal {
    fn from_model_value(value: &Value) -> Option<Self> {
        let description = str_field(value, "description")?.trim();
        if description.is_empty() {
            return None;
        }
        Some(Self {
            description: description.to_string(),
            severity: Severity::parse(str_field(value, "severity")),
        })
    }

    pub fn list_from_model_value(value: &Value) -> Vec<Self> {
        items(value, "risks")
            .into_iter()
            .filter_map(Self::from_model_value)
            .collect()
    }
}

/// A recommended next step. When analysis is unavailable, the documented
/// generic fallback is substituted instead of failing the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub action: String,
    pub rationale: Option<String>,
}

impl SuggestedAction {
    pub fn generic_fallback() -> Self {
        Self {
            action: "Review the conversation and follow up with the participants involved"
                .to_string(),
            rationale: None,
        }
    }

    fn from_model_value(value: &Value) -> Option<Self> {
        let action = str_field(value, "action")?.trim();
        if action.is_empty() {
            return None;
        }
        Some(Self {
            action: action.to_string(),
            rationale: str_field(value, "rationale").map(|s| s.to_string()),
        })
    }

    pub fn list_from_model_value(value: &Value) -> Vec<Self> {
        items(value, "actions")
            .into_iter()
            .filter_map(Self::from_model_value)
            .collect()
    }
}

/// High-level summary of a situation plus suggested actions. Results are
/// keyed by placeholder tokens when produced on the remote tier; callers
/// de-anonymize through the session before surfacing them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SituationBrief {
    pub summary: String,
    pub suggested_actions: Vec<SuggestedAction>,
}

impl SituationBrief {
    pub fn from_model_value(value: &Value) -> Self {
        Self {
            summary: str_field(value, "summary").unwrap_or_default().to_string(),
            suggested_actions: SuggestedAction::list_from_model_value(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_output::extract_json;

    #[test]
    fn test_tone_defaults_on_bad_fields() {
        let value = extract_json(r#"{"sentiment": "furious", "intensity": 7.5}"#).unwrap();
        let report = ToneReport::from_model_value(&value);
        assert_eq!(report.sentiment, Sentiment::Neutral);
        assert_eq!(report.intensity, 1.0);
        assert_eq!(report.summary, "");
    }

    #[test]
    fn test_tone_happy_path() {
        let value = extract_json(
            r#"{"sentiment": "Negative", "intensity": 0.8, "summary": "tense"}"#,
        )
        .unwrap();
        let report = ToneReport::from_model_value(&value);
        assert_eq!(report.sentiment, Sentiment::Negative);
        assert_eq!(report.intensity, 0.8);
        assert_eq!(report.summary, "tense");
    }

    #[test]
    fn test_intent_allow_list() {
        let value = extract_json(
            r#"{"intents": [
                {"stakeholder": "[PERSON_1]", "intent": "escalate"},
                {"stakeholder": "[PERSON_2]", "intent": "world-domination"},
                {"intent": "inform"}
            ]}"#,
        )
        .unwrap();
        let intents = StakeholderIntent::list_from_model_value(&value);
        // The entry with no stakeholder is dropped, not defaulted
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].intent, IntentKind::Escalate);
        assert_eq!(intents[1].intent, IntentKind::Unknown);
    }

    #[test]
    fn test_threads_from_bare_array() {
        let value = extract_json(
            r#"[{"topic": "budget signoff", "blocking": true}, {"topic": "   "}]"#,
        )
        .unwrap();
        let threads = UnresolvedThread::list_from_model_value(&value);
        assert_eq!(threads.len(), 1);
        assert!(threads[0].blocking);
    }

    #[test]
    fn test_risk_severity_defaults_low() {
        let value = extract_json(
            r#"{"risks": [{"description": "deadline slip", "severity": "catastrophic"}]}"#,
        )
        .unwrap();
        let risks = RiskSignal::list_from_model_value(&value);
        assert_eq!(risks[0].severity, Severity::Low);
    }

    #[test]
    fn test_brief_with_actions() {
        let value = extract_json(
            r#"{"summary": "stalled thread", "actions": [{"action": "ping [PERSON_1]"}]}"#,
        )
        .unwrap();
        let brief = SituationBrief::from_model_value(&value);
        assert_eq!(brief.summary, "stalled thread");
        assert_eq!(brief.suggested_actions.len(), 1);
    }
}
