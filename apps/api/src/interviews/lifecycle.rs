//! Interview Lifecycle — owns every status transition of an interview.
//!
//! Flow: create (pending) → start_call (calling) → call-end webhook (analyzing)
//!       → analysis worker (completed | error).
//!
//! Provider failures never escape as faults: they are recorded on the
//! interview as `error` plus a diagnostic in `error_message`.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::interviews::analysis::{build_analysis_prompt, parse_analysis};
use crate::interviews::prompts::{
    render, skills_or_default, FIRST_MESSAGE_TEMPLATE, INTERVIEWER_PROMPT_TEMPLATE,
};
use crate::interviews::queue::AnalysisQueue;
use crate::interviews::store::InterviewStore;
use crate::interviews::webhook::{parse_call_event, CallEvent, WebhookAck};
use crate::llm_client::AnalysisProvider;
use crate::models::interview::{AnalysisReport, Interview, InterviewStatus, NewInterview};
use crate::voice_client::{
    AssistantConfig, AssistantModel, CallMetadata, CallProvider, CallRequest, Customer,
    VoiceConfig,
};

// Voice assistant settings sent with every call.
const ASSISTANT_MODEL_PROVIDER: &str = "google";
const ASSISTANT_MODEL: &str = "gemini-1.5-flash";
const VOICE_PROVIDER: &str = "vapi";
const VOICE_ID: &str = "Neha";

pub const ANALYSIS_NOT_CONFIGURED: &str = "Analysis provider is not configured on the server.";
pub const MISSING_TRANSCRIPT: &str = "Call ended without a transcript; nothing to analyze.";
pub const STALLED_CALL: &str = "Call was never confirmed by the call provider.";

// A claimed interview with no call id after this long is treated as abandoned.
const STALLED_CALL_HOURS: i64 = 1;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

/// Request body for interview creation. Every field is optional at the wire
/// level so a missing field is reported as a validation error, not a 422.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateInterviewRequest {
    #[serde(default)]
    pub candidate_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub job_position: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub skills_to_assess: Option<String>,
}

impl CreateInterviewRequest {
    /// Checks required fields are present and non-blank, naming every one that is not.
    pub fn validate(self) -> Result<NewInterview, AppError> {
        let mut missing = Vec::new();
        let mut required = |name: &'static str, value: Option<String>| -> String {
            match value.map(|v| v.trim().to_string()) {
                Some(v) if !v.is_empty() => v,
                _ => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let candidate_name = required("candidate_name", self.candidate_name);
        let phone_number = required("phone_number", self.phone_number);
        let job_position = required("job_position", self.job_position);
        let job_description = required("job_description", self.job_description);

        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(NewInterview {
            candidate_name,
            phone_number,
            job_position,
            job_description,
            skills_to_assess: self
                .skills_to_assess
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Service
// ────────────────────────────────────────────────────────────────────────────

/// Explicitly constructed in `main` (or a test) with its collaborators.
pub struct InterviewService {
    store: Arc<dyn InterviewStore>,
    calls: Arc<dyn CallProvider>,
    analyzer: Option<Arc<dyn AnalysisProvider>>,
    queue: Arc<dyn AnalysisQueue>,
    phone_number_id: String,
}

impl InterviewService {
    pub fn new(
        store: Arc<dyn InterviewStore>,
        calls: Arc<dyn CallProvider>,
        analyzer: Option<Arc<dyn AnalysisProvider>>,
        queue: Arc<dyn AnalysisQueue>,
        phone_number_id: String,
    ) -> Self {
        Self {
            store,
            calls,
            analyzer,
            queue,
            phone_number_id,
        }
    }

    pub async fn create(&self, request: CreateInterviewRequest) -> Result<Interview, AppError> {
        let new = request.validate()?;
        let interview = self.store.insert(&new).await?;
        info!(
            "Created interview {} for {} ({})",
            interview.id, interview.candidate_name, interview.job_position
        );
        Ok(interview)
    }

    pub async fn list(&self) -> Result<Vec<Interview>, AppError> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: i32) -> Result<Interview, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))
    }

    /// Claims the interview (`pending → calling`) and asks the call provider to dial.
    /// A provider failure moves it to `error` and is returned as `AppError::Provider`.
    pub async fn start_call(&self, id: i32) -> Result<Interview, AppError> {
        let Some(interview) = self
            .store
            .transition(id, InterviewStatus::Pending, InterviewStatus::Calling)
            .await?
        else {
            let current = self.get(id).await?;
            return Err(AppError::Conflict(format!(
                "Interview cannot be started. Current status: {}",
                current.status
            )));
        };

        let request = build_call_request(&interview, &self.phone_number_id);

        match self.calls.place_call(&request).await {
            Ok(placed) => {
                info!("Call placed for interview {id} (call_id={:?})", placed.id);
                let Some(call_id) = placed.id else {
                    return Ok(interview);
                };
                // The call is already placed; report success even if the id is not stored.
                match self.store.set_call_id(id, &call_id).await {
                    Ok(updated) => Ok(updated.unwrap_or(interview)),
                    Err(e) => {
                        error!("Failed to store call id {call_id} for interview {id}: {e}");
                        Ok(interview)
                    }
                }
            }
            Err(e) => {
                let detail = format!("Failed to start call: {e}");
                warn!("Interview {id}: {detail}");
                self.store
                    .mark_error(id, InterviewStatus::Calling, &detail)
                    .await?;
                Err(AppError::Provider(detail))
            }
        }
    }

    /// Webhook intake. Stores the call result and queues analysis; never runs it inline.
    pub async fn handle_call_completion(&self, payload: &[u8]) -> WebhookAck {
        let (interview_id, result) = match parse_call_event(payload) {
            CallEvent::Ignored(reason) => return WebhookAck::ignored(reason),
            CallEvent::CallEnded {
                interview_id,
                result,
            } => (interview_id, result),
        };

        let updated = match self.store.record_call_result(interview_id, &result).await {
            Ok(updated) => updated,
            Err(e) => {
                error!("Failed to store call result for interview {interview_id}: {e}");
                return WebhookAck::error("Failed to store call result");
            }
        };

        if updated.is_none() {
            return match self.store.get(interview_id).await {
                Ok(Some(current)) => {
                    info!(
                        "Ignoring call-end for interview {interview_id} in status {}",
                        current.status
                    );
                    WebhookAck::ignored(format!(
                        "Interview {interview_id} is not awaiting a call result (status: {})",
                        current.status
                    ))
                }
                Ok(None) => {
                    warn!("Call-end webhook for unknown interview {interview_id}");
                    WebhookAck::error(format!("Interview ID {interview_id} not found"))
                }
                Err(e) => {
                    error!("Failed to load interview {interview_id}: {e}");
                    WebhookAck::error("Failed to load interview")
                }
            };
        }

        info!("Interview {interview_id} call ended; status -> analyzing");

        if let Err(e) = self.queue.enqueue(interview_id).await {
            // The row stays in `analyzing` and is picked up by the startup sweep.
            error!("Failed to enqueue analysis for interview {interview_id}: {e}");
            return WebhookAck::error("Call result stored but analysis could not be queued");
        }

        WebhookAck::received()
    }

    /// Analyzes one interview's transcript. Does nothing unless it is `analyzing`.
    /// Returns the interview as it stands afterwards, `None` if it does not exist.
    pub async fn analyze(&self, id: i32) -> Result<Option<Interview>, AppError> {
        let Some(interview) = self.store.get(id).await? else {
            return Ok(None);
        };
        if interview.status != InterviewStatus::Analyzing {
            info!(
                "Skipping analysis for interview {id}: status is {}",
                interview.status
            );
            return Ok(Some(interview));
        }

        let updated = match self.run_analysis(&interview).await {
            Ok(report) => {
                info!(
                    "Interview {id} analyzed: score={} recommendation={}",
                    report.score,
                    report.recommendation.as_str()
                );
                self.store.record_analysis(id, &report).await?
            }
            Err(message) => {
                warn!("Analysis failed for interview {id}: {message}");
                self.store
                    .mark_error(id, InterviewStatus::Analyzing, &message)
                    .await?
            }
        };

        // A concurrent writer moved it on; report what is stored now.
        match updated {
            Some(interview) => Ok(Some(interview)),
            None => Ok(self.store.get(id).await?),
        }
    }

    /// Re-enqueues interviews left in `analyzing`, e.g. by a restart mid-analysis.
    pub async fn recover_pending_analyses(&self) -> Result<usize, AppError> {
        let stranded = self.store.list_by_status(InterviewStatus::Analyzing).await?;
        for interview in &stranded {
            self.queue.enqueue(interview.id).await?;
        }
        Ok(stranded.len())
    }

    /// Moves `calling` interviews that never got a call id to `error`, e.g. after
    /// a crash between the claim and the provider's reply.
    pub async fn fail_stalled_calls(&self) -> Result<usize, AppError> {
        let cutoff = Utc::now() - chrono::Duration::hours(STALLED_CALL_HOURS);
        let failed = self.store.fail_stalled_calls(cutoff, STALLED_CALL).await?;
        for interview in &failed {
            warn!(
                "Interview {} was claimed for a call that was never confirmed; status -> error",
                interview.id
            );
        }
        Ok(failed.len())
    }

    /// Produces a report or the diagnostic to store on the interview.
    async fn run_analysis(&self, interview: &Interview) -> Result<AnalysisReport, String> {
        let analyzer = self
            .analyzer
            .as_ref()
            .ok_or_else(|| ANALYSIS_NOT_CONFIGURED.to_string())?;

        let transcript = interview
            .transcript
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MISSING_TRANSCRIPT.to_string())?;

        let prompt = build_analysis_prompt(interview, transcript);
        let raw = analyzer
            .complete(&prompt)
            .await
            .map_err(|e| format!("Analysis provider request failed: {e}"))?;

        parse_analysis(&raw).map_err(|e| {
            format!("Error during AI analysis: {e}. See raw response below.\n\n{raw}")
        })
    }
}

/// Builds the outbound call for an interview, including the interviewer prompt.
pub fn build_call_request(interview: &Interview, phone_number_id: &str) -> CallRequest {
    let vars = [
        ("candidate_name", interview.candidate_name.as_str()),
        ("job_position", interview.job_position.as_str()),
        ("job_description", interview.job_description.as_str()),
        ("skills", skills_or_default(&interview.skills_to_assess)),
    ];

    CallRequest {
        phone_number_id: phone_number_id.to_string(),
        customer: Customer {
            number: interview.phone_number.clone(),
        },
        assistant: AssistantConfig {
            first_message: render(FIRST_MESSAGE_TEMPLATE, &vars),
            model: AssistantModel {
                provider: ASSISTANT_MODEL_PROVIDER.to_string(),
                model: ASSISTANT_MODEL.to_string(),
                system_prompt: render(INTERVIEWER_PROMPT_TEMPLATE, &vars),
            },
            voice: VoiceConfig {
                provider: VOICE_PROVIDER.to_string(),
                voice_id: VOICE_ID.to_string(),
            },
            recording_enabled: true,
        },
        metadata: CallMetadata {
            interview_id: interview.id,
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
