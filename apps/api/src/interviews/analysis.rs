//! Analysis response validation.
//!
//! The analysis provider is asked for a bare JSON object. A surrounding
//! markdown fence is tolerated and removed; anything else (prose around the
//! object, wrong types, unknown recommendation, out-of-range score) is rejected.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::interviews::prompts::{render, skills_or_default, ANALYSIS_PROMPT_TEMPLATE};
use crate::models::interview::{AnalysisReport, Interview, Recommendation};

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisParseError {
    #[error("response is not valid JSON ({0})")]
    NotJson(String),

    #[error("response JSON is not an object")]
    NotAnObject,

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Builds the prompt sent to the analysis provider.
pub fn build_analysis_prompt(interview: &Interview, transcript: &str) -> String {
    render(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("job_position", interview.job_position.as_str()),
            ("skills", skills_or_default(&interview.skills_to_assess)),
            ("job_description", interview.job_description.as_str()),
            ("transcript", transcript),
        ],
    )
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Parses and validates a raw provider response into an `AnalysisReport`.
pub fn parse_analysis(raw: &str) -> Result<AnalysisReport, AnalysisParseError> {
    let value: Value = serde_json::from_str(strip_json_fences(raw))
        .map_err(|e| AnalysisParseError::NotJson(e.to_string()))?;
    let object = value.as_object().ok_or(AnalysisParseError::NotAnObject)?;

    Ok(AnalysisReport {
        summary: required_text(object, "summary")?,
        strengths: required_text(object, "strengths")?,
        concerns: required_text(object, "concerns")?,
        assessment: required_text(object, "assessment")?,
        score: coerce_score(object.get("score"))?,
        recommendation: parse_recommendation(object.get("recommendation"))?,
    })
}

fn required_text(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<String, AnalysisParseError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(AnalysisParseError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(AnalysisParseError::InvalidField {
            field,
            reason: format!("expected a string, got {}", json_type(other)),
        }),
    }
}

/// Accepts integers, floats (rounded) and numeric strings. Absent means 0.
fn coerce_score(value: Option<&Value>) -> Result<i32, AnalysisParseError> {
    let invalid = |reason: String| AnalysisParseError::InvalidField {
        field: "score",
        reason,
    };

    let score = match value {
        None | Some(Value::Null) => return Ok(0),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => i,
            None => n
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.round() as i64)
                .ok_or_else(|| invalid(format!("{n} is not a usable number")))?,
        },
        Some(Value::String(s)) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => i,
                Err(_) => s
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as i64)
                    .ok_or_else(|| invalid(format!("'{s}' is not a number")))?,
            }
        }
        Some(other) => {
            return Err(invalid(format!(
                "expected a number, got {}",
                json_type(other)
            )))
        }
    };

    if !(0..=100).contains(&score) {
        return Err(invalid(format!("{score} is outside 0-100")));
    }
    Ok(score as i32)
}

fn parse_recommendation(value: Option<&Value>) -> Result<Recommendation, AnalysisParseError> {
    match value {
        None | Some(Value::Null) => Err(AnalysisParseError::MissingField("recommendation")),
        Some(Value::String(s)) => {
            Recommendation::parse(s).ok_or_else(|| AnalysisParseError::InvalidField {
                field: "recommendation",
                reason: format!("'{s}' is not one of Strong Hire, Hire, Maybe, No Hire"),
            })
        }
        Some(other) => Err(AnalysisParseError::InvalidField {
            field: "recommendation",
            reason: format!("expected a string, got {}", json_type(other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
