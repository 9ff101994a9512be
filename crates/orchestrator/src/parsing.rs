//! Turning free-form model text into plans and review results.
//!
//! Models wrap JSON in markdown fences, prefix it with prose, or nest the task
//! list under a `tasks` key. Everything here tolerates those shapes and
//! reports anything else as an explicit failure rather than guessing.

use std::sync::OnceLock;

use regex::Regex;
use researcher_core::{CoreError, Plan, ReviewResult};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("response is empty")]
    Empty,

    #[error("no JSON found in response")]
    NoJson,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

/// Outcome of reading a reviewer's answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewParse {
    Parsed(ReviewResult),
    Unparsable(ParseError),
}

impl ReviewParse {
    /// The parsed result, or the low-confidence stand-in built from `original`.
    pub fn into_result(self, original: &str) -> ReviewResult {
        match self {
            ReviewParse::Parsed(result) => result,
            ReviewParse::Unparsable(_) => ReviewResult::parse_failure(original),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawReviewResponse {
    revised_output: String,
    #[serde(default)]
    issues_found: Vec<String>,
    quality_score: f64,
}

/// Matches the body of a fenced code block: ```json ... ```
fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").ok())
        .as_ref()
}

/// Span from the first `open` to the last `close`, if any.
fn bracket_span(text: &str, open: char, close: char) -> Option<(usize, &str)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| (start, &text[start..=end]))
}

/// Slices of a model response that may hold its JSON, most literal first.
///
/// The whole trimmed reply comes first, then fenced block bodies, then the
/// object and array spans ordered by where they start.
pub fn json_candidates(content: &str) -> Vec<&str> {
    let trimmed = content.trim();
    let mut candidates = vec![trimmed];

    if let Some(re) = fence_regex() {
        candidates.extend(
            re.captures_iter(trimmed)
                .filter_map(|caps| caps.get(1))
                .map(|body| body.as_str().trim()),
        );
    }

    let mut spans: Vec<(usize, &str)> = [
        bracket_span(trimmed, '{', '}'),
        bracket_span(trimmed, '[', ']'),
    ]
    .into_iter()
    .flatten()
    .collect();
    spans.sort_by_key(|(start, _)| *start);
    candidates.extend(spans.into_iter().map(|(_, span)| span));

    candidates.dedup();
    candidates
}

/// Parse the JSON embedded in a model response.
///
/// Each candidate from [`json_candidates`] is tried in turn and the first
/// that parses wins.
pub fn parse_json_response(content: &str) -> Result<Value, ParseError> {
    if content.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut first_error = None;
    for candidate in json_candidates(content) {
        if !candidate.starts_with(|c: char| c == '[' || c == '{') {
            continue;
        }
        match serde_json::from_str(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    Err(first_error.map_or(ParseError::NoJson, ParseError::InvalidJson))
}

/// Unwrap `{"tasks": [...]}` into the bare array; other values pass through.
pub fn unwrap_task_list(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.get("tasks").is_some_and(Value::is_array) => {
            map.remove("tasks").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Validate a planner's JSON into a [`Plan`].
pub fn plan_from_value(value: Value) -> Result<Plan, CoreError> {
    Plan::from_value(unwrap_task_list(value))
}

/// Read a reviewer's answer into a [`ReviewResult`].
pub fn parse_review_response(content: &str) -> ReviewParse {
    let reviewed = json_candidates(content)
        .into_iter()
        .filter(|c| c.starts_with('{'))
        .find_map(|c| serde_json::from_str::<RawReviewResponse>(c).ok());

    if let Some(raw) = reviewed {
        debug!(
            issues = raw.issues_found.len(),
            quality_score = raw.quality_score,
            "Parsed review"
        );
        return ReviewParse::Parsed(ReviewResult::new(
            raw.revised_output,
            raw.issues_found,
            raw.quality_score,
        ));
    }

    let error = match parse_json_response(content) {
        Ok(value) => match serde_json::from_value::<RawReviewResponse>(value) {
            Ok(_) => ParseError::NoJson,
            Err(e) => {
                warn!(error = %e, "Reviewer JSON does not match the review shape");
                ParseError::InvalidJson(e.to_string())
            }
        },
        Err(e) => {
            warn!(
                error = %e,
                content_preview = %content.chars().take(200).collect::<String>(),
                "Reviewer response has no usable JSON"
            );
            e
        }
    };
    ReviewParse::Unparsable(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use researcher_core::{FALLBACK_QUALITY_SCORE, PARSE_FAILURE_ISSUE};
    use serde_json::json;

    fn plan_text(content: &str) -> Result<Plan, CoreError> {
        let value = parse_json_response(content)
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        plan_from_value(value)
    }

    #[test]
    fn test_parse_json_from_fence() {
        let content = "Here is the plan:\n```json\n[{\"name\": \"a\"}]\n```\nDone.";
        assert_eq!(parse_json_response(content), Ok(json!([{"name": "a"}])));
    }

    #[test]
    fn test_parse_json_from_bare_fence() {
        let content = "```\n{\"revised_output\": \"x\"}\n```";
        assert_eq!(parse_json_response(content), Ok(json!({"revised_output": "x"})));
    }

    #[test]
    fn test_parse_json_from_prose() {
        let content = "Sure! [{\"name\": \"a\"}, {\"name\": \"b\"}] Hope this helps.";
        assert_eq!(
            parse_json_response(content),
            Ok(json!([{"name": "a"}, {"name": "b"}]))
        );
    }

    #[test]
    fn test_parse_json_object_before_array() {
        let content = "Result: {\"tasks\": [{\"name\": \"a\"}]}";
        assert_eq!(
            parse_json_response(content),
            Ok(json!({"tasks": [{"name": "a"}]}))
        );
    }

    #[test]
    fn test_candidates_start_with_whole_reply() {
        let content = "  Note [1]: {\"a\": 1}  ";
        assert_eq!(
            json_candidates(content),
            vec!["Note [1]: {\"a\": 1}", "[1]", "{\"a\": 1}"]
        );
    }

    #[test]
    fn test_parse_json_response_errors() {
        assert_eq!(parse_json_response("   "), Err(ParseError::Empty));
        assert_eq!(parse_json_response("raw text"), Err(ParseError::NoJson));
        assert!(matches!(
            parse_json_response("[{\"name\": }]"),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_plan_with_wrapper() {
        let plan = plan_text(
            r#"{"tasks": [{"name": "search_papers", "expected_outputs": ["papers"]}, {"name": "summarize_papers", "dependencies": ["search_papers"]}]}"#,
        )
        .unwrap();
        assert_eq!(plan.task_names(), vec!["search_papers", "summarize_papers"]);
    }

    #[test]
    fn test_parse_plan_with_fence_in_description() {
        let content = r#"[{"name": "search_papers", "description": "Query arXiv, e.g. ```python\nfetch(q)\n```"}, {"name": "summarize_papers"}]"#;
        let plan = plan_text(content).unwrap();
        assert_eq!(plan.task_names(), vec!["search_papers", "summarize_papers"]);
        assert!(plan.tasks()[0].description.contains("```python"));
    }

    #[test]
    fn test_parse_plan_rejects_empty_and_objects() {
        assert!(matches!(plan_text("[]"), Err(CoreError::EmptyPlan)));
        assert!(matches!(
            plan_text(r#"{"name": "a"}"#),
            Err(CoreError::NotASequence(_))
        ));
        assert!(matches!(
            plan_text("I cannot plan this."),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_unwrap_only_single_tasks_key() {
        let value = json!({"tasks": [], "note": "x"});
        assert_eq!(unwrap_task_list(value.clone()), value);
        assert_eq!(unwrap_task_list(json!({"tasks": [1]})), json!([1]));
    }

    #[test]
    fn test_parse_review_valid() {
        let content = "```json\n{\"revised_output\": \"better\", \"issues_found\": [\"no citations\"], \"quality_score\": 0.8}\n```";
        match parse_review_response(content) {
            ReviewParse::Parsed(result) => {
                assert_eq!(result.revised_output, "better");
                assert_eq!(result.issues_found, vec!["no citations".to_string()]);
                assert_eq!(result.quality_score, 0.8);
            }
            other => panic!("Expected Parsed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_review_with_fence_inside_revised_text() {
        let content = r#"{"revised_output": "Run it with:\n```bash\npip install x\n```", "issues_found": ["terse"], "quality_score": 0.7}"#;
        match parse_review_response(content) {
            ReviewParse::Parsed(result) => {
                assert!(result.revised_output.contains("pip install x"));
                assert_eq!(result.issues_found, vec!["terse".to_string()]);
                assert_eq!(result.quality_score, 0.7);
            }
            other => panic!("Expected Parsed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_review_after_bracketed_prose() {
        let content = r#"Review [final]: {"revised_output": "ok", "issues_found": ["no sources"], "quality_score": 0.6}"#;
        match parse_review_response(content) {
            ReviewParse::Parsed(result) => {
                assert_eq!(result.revised_output, "ok");
                assert_eq!(result.issues_found, vec!["no sources".to_string()]);
                assert_eq!(result.quality_score, 0.6);
            }
            other => panic!("Expected Parsed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_review_clamps_and_defaults() {
        let result = parse_review_response(r#"{"revised_output": "ok", "quality_score": 7}"#)
            .into_result("orig");
        assert_eq!(result.quality_score, 1.0);
        assert!(result.issues_found.is_empty());
    }

    #[test]
    fn test_parse_review_raw_text_falls_back() {
        let result = parse_review_response("raw text").into_result("original output");
        assert_eq!(result.revised_output, "original output");
        assert_eq!(result.issues_found, vec![PARSE_FAILURE_ISSUE.to_string()]);
        assert_eq!(result.quality_score, FALLBACK_QUALITY_SCORE);
    }

    #[test]
    fn test_parse_review_wrong_shape_falls_back() {
        let parsed = parse_review_response(r#"{"verdict": "fine"}"#);
        assert!(matches!(parsed, ReviewParse::Unparsable(ParseError::InvalidJson(_))));
    }
}
