//! Call-provider webhook intake: payload shapes and classification.
//!
//! Vapi posts every server event to one URL. Only `call-end` events that carry
//! the `interview_id` we attached when placing the call are acted on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::interview::CallResult;

const CALL_END_EVENT: &str = "call-end";

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub message: Option<WebhookMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub call: Option<CallRecord>,
    #[serde(default)]
    pub duration_in_seconds: Option<f64>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
}

/// What an inbound webhook amounts to, before any storage is touched.
#[derive(Debug, PartialEq)]
pub enum CallEvent {
    Ignored(String),
    CallEnded {
        interview_id: i32,
        result: CallResult,
    },
}

/// Classifies a raw webhook body. Never fails: anything unusable is `Ignored`.
pub fn parse_call_event(body: &[u8]) -> CallEvent {
    let payload: WebhookPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => return CallEvent::Ignored(format!("Malformed payload: {e}")),
    };

    let Some(message) = payload.message else {
        return CallEvent::Ignored("Not a call-end event".to_string());
    };
    if message.event_type.as_deref() != Some(CALL_END_EVENT) {
        return CallEvent::Ignored("Not a call-end event".to_string());
    }

    let call = message.call.unwrap_or_default();
    let Some(interview_id) = call.metadata.as_ref().and_then(interview_id_from_metadata) else {
        return CallEvent::Ignored("No interview_id in metadata".to_string());
    };

    let result = CallResult {
        transcript: call.transcript.or(message.transcript),
        duration_in_seconds: message
            .duration_in_seconds
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as i32),
        recording_url: call.recording_url.or(message.recording_url),
    };

    CallEvent::CallEnded {
        interview_id,
        result,
    }
}

/// The id round-trips as a number, but some tooling stringifies metadata.
fn interview_id_from_metadata(metadata: &Value) -> Option<i32> {
    let id = match metadata.get("interview_id")? {
        Value::Number(n) => n.as_i64().and_then(|i| i32::try_from(i).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
}

// ────────────────────────────────────────────────────────────────────────────
// Acknowledgement returned to the provider (always HTTP 200)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Ignored,
    Received,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookAck {
    pub status: WebhookStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self {
            status: WebhookStatus::Received,
            reason: None,
        }
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Self {
            status: WebhookStatus::Ignored,
            reason: Some(reason.into()),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: WebhookStatus::Error,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_call_end_with_metadata_is_parsed() {
        let event = parse_call_event(&body(json!({
            "message": {
                "type": "call-end",
                "durationInSeconds": 312.6,
                "call": {
                    "id": "call_1",
                    "transcript": "Q: Tell me about SQL. A: ...",
                    "recordingUrl": "https://rec.example/1.wav",
                    "metadata": {"interview_id": 4}
                }
            }
        })));
        assert_eq!(
            event,
            CallEvent::CallEnded {
                interview_id: 4,
                result: CallResult {
                    transcript: Some("Q: Tell me about SQL. A: ...".to_string()),
                    duration_in_seconds: Some(313),
                    recording_url: Some("https://rec.example/1.wav".to_string()),
                },
            }
        );
    }

    #[test]
    fn test_other_event_types_are_ignored() {
        let event = parse_call_event(&body(json!({
            "message": {"type": "status-update", "call": {"metadata": {"interview_id": 4}}}
        })));
        assert_eq!(event, CallEvent::Ignored("Not a call-end event".to_string()));
    }

    #[test]
    fn test_missing_message_is_ignored() {
        let event = parse_call_event(&body(json!({"hello": "world"})));
        assert!(matches!(event, CallEvent::Ignored(_)));
    }

    #[test]
    fn test_missing_interview_id_is_ignored() {
        let event = parse_call_event(&body(json!({
            "message": {"type": "call-end", "call": {"metadata": {}}}
        })));
        assert_eq!(
            event,
            CallEvent::Ignored("No interview_id in metadata".to_string())
        );

        let no_call = parse_call_event(&body(json!({"message": {"type": "call-end"}})));
        assert!(matches!(no_call, CallEvent::Ignored(_)));
    }

    #[test]
    fn test_string_interview_id_is_accepted() {
        let event = parse_call_event(&body(json!({
            "message": {"type": "call-end", "call": {"metadata": {"interview_id": "12"}}}
        })));
        assert!(matches!(event, CallEvent::CallEnded { interview_id: 12, .. }));
    }

    #[test]
    fn test_message_level_transcript_is_fallback() {
        let event = parse_call_event(&body(json!({
            "message": {
                "type": "call-end",
                "transcript": "from message",
                "call": {"metadata": {"interview_id": 2}}
            }
        })));
        let CallEvent::CallEnded { result, .. } = event else {
            panic!("expected call-end");
        };
        assert_eq!(result.transcript.as_deref(), Some("from message"));
        assert_eq!(result.duration_in_seconds, None);
    }

    #[test]
    fn test_non_json_body_is_ignored() {
        let event = parse_call_event(b"not json");
        assert!(matches!(event, CallEvent::Ignored(reason) if reason.starts_with("Malformed")));
    }

    #[test]
    fn test_ack_omits_reason_when_received() {
        let json = serde_json::to_value(WebhookAck::received()).unwrap();
        assert_eq!(json, json!({"status": "received"}));
        let json = serde_json::to_value(WebhookAck::ignored("nope")).unwrap();
        assert_eq!(json, json!({"status": "ignored", "reason": "nope"}));
    }
}
