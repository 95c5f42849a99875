use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::baseline::BaselineConfig;

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub council_size: u32,
    pub enable_cross_review: bool,
    pub verification_mode: &'static str,
}

impl<'a> ChatRequest<'a> {
    pub fn new(message: &'a str, config: &BaselineConfig) -> Self {
        Self {
            message,
            council_size: config.council_size,
            enable_cross_review: config.enable_cross_review,
            verification_mode: config.verification_mode.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Stage1,
    Stage2,
    Stage3,
    Stage4,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Stage1, Stage::Stage2, Stage::Stage3, Stage::Stage4];

    /// Maps a completion event name (`stage1.complete`, ...) to its stage.
    /// Progress events such as `stage1.start` are not completions.
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "stage1.complete" => Some(Self::Stage1),
            "stage2.complete" => Some(Self::Stage2),
            "stage3.complete" => Some(Self::Stage3),
            "stage4.complete" => Some(Self::Stage4),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stage1 => "stage1",
            Self::Stage2 => "stage2",
            Self::Stage3 => "stage3",
            Self::Stage4 => "stage4",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelResult {
    pub tokens_used: u64,
}

impl ModelResult {
    /// A missing or non-integer `tokens_used` counts as zero.
    fn from_value(value: &Value) -> Self {
        Self {
            tokens_used: value.get("tokens_used").and_then(Value::as_u64).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArbitrationResult {
    pub final_answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimLabel {
    Verified,
    Consistent,
    Uncertain,
    Contradicted,
}

impl ClaimLabel {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "verified" => Self::Verified,
            "consistent" => Self::Consistent,
            "contradicted" => Self::Contradicted,
            _ => Self::Uncertain,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Claim {
    pub label: ClaimLabel,
}

impl Claim {
    /// A missing or non-string label is `uncertain`.
    fn from_value(value: &Value) -> Self {
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .map_or(ClaimLabel::Uncertain, ClaimLabel::parse);
        Self { label }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VerificationResult {
    pub claims: Vec<Claim>,
}

/// Decoded body of a stage completion event.
#[derive(Debug, Clone)]
pub enum StagePayload {
    Generation(Vec<ModelResult>),
    /// Number of peer reviews received.
    Review(usize),
    Arbitration(ArbitrationResult),
    Verification(VerificationResult),
}

impl StagePayload {
    /// Decodes a stage body field by field. Anything missing or of the
    /// wrong type degrades to its empty value without affecting the
    /// fields around it.
    pub fn decode(stage: Stage, data: Value) -> Self {
        match stage {
            Stage::Stage1 => Self::Generation(
                list_at(&data, "/results")
                    .iter()
                    .map(ModelResult::from_value)
                    .collect(),
            ),
            Stage::Stage2 => Self::Review(list_at(&data, "/results").len()),
            Stage::Stage3 => Self::Arbitration(ArbitrationResult {
                final_answer: data
                    .pointer("/result/final_answer")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            Stage::Stage4 => Self::Verification(VerificationResult {
                claims: list_at(&data, "/result/claims")
                    .iter()
                    .map(Claim::from_value)
                    .collect(),
            }),
        }
    }
}

fn list_at<'a>(data: &'a Value, pointer: &str) -> &'a [Value] {
    data.pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimCounts {
    pub verified: usize,
    pub consistent: usize,
    pub uncertain: usize,
    pub contradicted: usize,
}

impl ClaimCounts {
    pub fn from_claims(claims: &[Claim]) -> Self {
        let mut counts = Self::default();
        for claim in claims {
            match claim.label {
                ClaimLabel::Verified => counts.verified += 1,
                ClaimLabel::Consistent => counts.consistent += 1,
                ClaimLabel::Uncertain => counts.uncertain += 1,
                ClaimLabel::Contradicted => counts.contradicted += 1,
            }
        }
        counts
    }

    pub fn supported(&self) -> usize {
        self.verified + self.consistent
    }

    pub fn total(&self) -> usize {
        self.supported() + self.uncertain + self.contradicted
    }

    pub fn add(&mut self, other: &ClaimCounts) {
        self.verified += other.verified;
        self.consistent += other.consistent;
        self.uncertain += other.uncertain;
        self.contradicted += other.contradicted;
    }
}

/// Everything gathered from one pipeline response stream.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub answer: String,
    pub stage_latencies: BTreeMap<Stage, f64>,
    pub total_latency_ms: f64,
    pub tokens: u64,
    pub claims: Option<Vec<Claim>>,
    pub server_error: Option<String>,
}

impl QueryResult {
    pub fn claim_counts(&self) -> ClaimCounts {
        self.claims
            .as_deref()
            .map(ClaimCounts::from_claims)
            .unwrap_or_default()
    }

    pub fn stage_latency_sum(&self) -> f64 {
        self.stage_latencies.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_body() {
        let config = BaselineConfig::new("full", "Council Full");
        let body = serde_json::to_value(ChatRequest::new("why?", &config)).unwrap();
        assert_eq!(
            body,
            json!({
                "message": "why?",
                "council_size": 3,
                "enable_cross_review": true,
                "verification_mode": "consistency",
            })
        );
    }

    #[test]
    fn test_stage_from_event_name() {
        assert_eq!(Stage::from_event_name("stage3.complete"), Some(Stage::Stage3));
        assert_eq!(Stage::from_event_name("stage1.start"), None);
        assert_eq!(Stage::from_event_name("done"), None);
    }

    #[test]
    fn test_stage_serializes_as_map_key() {
        let mut map = BTreeMap::new();
        map.insert(Stage::Stage2, 1.5);
        map.insert(Stage::Stage1, 2.0);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"stage1":2.0,"stage2":1.5}"#);
    }

    #[test]
    fn test_decode_generation_tokens() {
        let payload = StagePayload::decode(
            Stage::Stage1,
            json!({"results": [{"model_id": "a", "tokens_used": 12}, {"model_id": "b"}, {"tokens_used": null}]}),
        );
        match payload {
            StagePayload::Generation(results) => {
                assert_eq!(results.len(), 3);
                assert_eq!(results[0].tokens_used, 12);
                assert_eq!(results[1].tokens_used, 0);
                assert_eq!(results[2].tokens_used, 0);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_decode_shape_mismatch_degrades() {
        let payload = StagePayload::decode(Stage::Stage1, json!({"results": "oops"}));
        assert!(matches!(payload, StagePayload::Generation(ref r) if r.is_empty()));

        let payload = StagePayload::decode(Stage::Stage3, json!([1, 2, 3]));
        assert!(matches!(payload, StagePayload::Arbitration(ref r) if r.final_answer.is_empty()));
    }

    #[test]
    fn test_claim_label_normalisation() {
        assert_eq!(ClaimLabel::parse(" Verified "), ClaimLabel::Verified);
        assert_eq!(ClaimLabel::parse("CONTRADICTED"), ClaimLabel::Contradicted);
        assert_eq!(ClaimLabel::parse("maybe"), ClaimLabel::Uncertain);
    }

    #[test]
    fn test_claim_counts() {
        let payload = StagePayload::decode(
            Stage::Stage4,
            json!({"result": {"claims": [
                {"label": "verified"},
                {"label": "consistent"},
                {"label": "uncertain"},
                {"label": "contradicted"},
                {"text": "no label"},
                {"label": null},
                {"label": 3}
            ]}}),
        );
        let StagePayload::Verification(result) = payload else {
            panic!("expected verification payload");
        };
        let counts = ClaimCounts::from_claims(&result.claims);
        assert_eq!(counts.supported(), 2);
        assert_eq!(counts.uncertain, 4);
        assert_eq!(counts.contradicted, 1);
        assert_eq!(counts.total(), 7);
    }

    #[test]
    fn test_final_answer_survives_odd_siblings() {
        let payload = StagePayload::decode(
            Stage::Stage3,
            json!({"result": {"final_answer": "Paris", "rationale": "because", "confidence": "high"}}),
        );
        let StagePayload::Arbitration(result) = payload else {
            panic!("expected arbitration payload");
        };
        assert_eq!(result.final_answer, "Paris");
    }

    #[test]
    fn test_null_tokens_keep_other_entries() {
        let payload = StagePayload::decode(
            Stage::Stage1,
            json!({"results": [{"tokens_used": 40}, {"tokens_used": null}, "garbage"]}),
        );
        let StagePayload::Generation(results) = payload else {
            panic!("expected generation payload");
        };
        assert_eq!(results.iter().map(|r| r.tokens_used).sum::<u64>(), 40);
    }

    #[test]
    fn test_null_label_keeps_other_claims() {
        let payload = StagePayload::decode(
            Stage::Stage4,
            json!({"result": {"claims": [{"label": "verified"}, {"label": "verified"}, {"label": null}]}}),
        );
        let StagePayload::Verification(result) = payload else {
            panic!("expected verification payload");
        };
        let counts = ClaimCounts::from_claims(&result.claims);
        assert_eq!(counts.verified, 2);
        assert_eq!(counts.uncertain, 1);
    }

    #[test]
    fn test_review_count() {
        let payload = StagePayload::decode(Stage::Stage2, json!({"results": [{}, {}]}));
        assert!(matches!(payload, StagePayload::Review(2)));
    }
}
