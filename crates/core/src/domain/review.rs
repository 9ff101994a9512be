use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Issue recorded when reviewer output could not be parsed.
pub const PARSE_FAILURE_ISSUE: &str = "Reviewer failed to parse JSON";

/// Score assigned to a synthetic review that never actually happened.
pub const FALLBACK_QUALITY_SCORE: f64 = 0.3;

/// Structured critique of one task's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub revised_output: String,
    #[serde(default)]
    pub issues_found: Vec<String>,
    pub quality_score: f64,
}

impl ReviewResult {
    pub fn new(revised_output: impl Into<String>, issues_found: Vec<String>, quality_score: f64) -> Self {
        Self {
            revised_output: revised_output.into(),
            issues_found,
            quality_score: clamp_score(quality_score),
        }
    }

    /// Stand-in result used when the reviewer's answer is unusable. Keeps the
    /// unreviewed text so downstream readers still have something.
    pub fn parse_failure(original: impl Into<String>) -> Self {
        Self {
            revised_output: original.into(),
            issues_found: vec![PARSE_FAILURE_ISSUE.to_string()],
            quality_score: FALLBACK_QUALITY_SCORE,
        }
    }

    pub fn is_parse_failure(&self) -> bool {
        self.issues_found.len() == 1
            && self.issues_found[0] == PARSE_FAILURE_ISSUE
            && self.quality_score == FALLBACK_QUALITY_SCORE
    }

    pub fn to_value(&self) -> Value {
        json!({
            "revised_output": self.revised_output,
            "issues_found": self.issues_found,
            "quality_score": self.quality_score,
        })
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
