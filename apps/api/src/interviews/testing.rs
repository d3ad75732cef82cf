//! Test doubles for the lifecycle's collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::interviews::lifecycle::{CreateInterviewRequest, InterviewService};
use crate::interviews::queue::{AnalysisQueue, QueueError};
use crate::interviews::store::InterviewStore;
use crate::llm_client::{AnalysisProvider, LlmError};
use crate::models::interview::{
    AnalysisReport, CallResult, Interview, InterviewStatus, NewInterview,
};
use crate::voice_client::{CallProvider, CallProviderError, CallRequest, PlacedCall};

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

pub fn jane_doe() -> CreateInterviewRequest {
    CreateInterviewRequest {
        candidate_name: Some("Jane Doe".to_string()),
        phone_number: Some("+15551234567".to_string()),
        job_position: Some("Backend Engineer".to_string()),
        job_description: Some("Build APIs".to_string()),
        skills_to_assess: Some("Python, SQL".to_string()),
    }
}

pub fn interview_fixture(id: i32, status: InterviewStatus) -> Interview {
    let now = Utc::now();
    Interview {
        id,
        candidate_name: "Jane Doe".to_string(),
        phone_number: "+15551234567".to_string(),
        job_position: "Backend Engineer".to_string(),
        job_description: "Build APIs".to_string(),
        skills_to_assess: "Python, SQL".to_string(),
        status,
        call_id: None,
        transcript: None,
        duration_in_seconds: None,
        recording_url: None,
        analysis_summary: None,
        analysis_strengths: None,
        analysis_concerns: None,
        assessment: None,
        score: None,
        recommendation: None,
        error_message: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn call_end_payload(interview_id: i32, transcript: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "message": {
            "type": "call-end",
            "durationInSeconds": 180,
            "call": {
                "id": "call_test",
                "transcript": transcript,
                "recordingUrl": "https://recordings.example/call.wav",
                "metadata": {"interview_id": interview_id}
            }
        }
    }))
    .unwrap()
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<Interview>>,
    set_call_id_fails: AtomicBool,
}

impl InMemoryStore {
    pub fn put(&self, interview: Interview) {
        self.rows.lock().unwrap().push(interview);
    }

    /// Makes every later `set_call_id` fail as if the database were down.
    pub fn fail_set_call_id(&self) {
        self.set_call_id_fails.store(true, Ordering::SeqCst);
    }

    /// Pretends the row was last touched `hours` ago.
    pub fn backdate(&self, id: i32, hours: i64) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|i| i.id == id) {
            row.updated_at = Utc::now() - chrono::Duration::hours(hours);
        }
    }

    fn next_id(rows: &[Interview]) -> i32 {
        rows.iter().map(|i| i.id).max().unwrap_or(0) + 1
    }

    /// Applies `change` to the row if its status is `from`.
    fn update_if(
        &self,
        id: i32,
        from: Option<InterviewStatus>,
        change: impl FnOnce(&mut Interview),
    ) -> Option<Interview> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.iter_mut().find(|i| i.id == id)?;
        if from.is_some_and(|s| s != row.status) {
            return None;
        }
        change(row);
        row.updated_at = Utc::now();
        Some(row.clone())
    }
}

#[async_trait]
impl InterviewStore for InMemoryStore {
    async fn insert(&self, new: &NewInterview) -> Result<Interview, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        let mut interview = interview_fixture(Self::next_id(&rows), InterviewStatus::Pending);
        interview.candidate_name = new.candidate_name.clone();
        interview.phone_number = new.phone_number.clone();
        interview.job_position = new.job_position.clone();
        interview.job_description = new.job_description.clone();
        interview.skills_to_assess = new.skills_to_assess.clone();
        rows.push(interview.clone());
        Ok(interview)
    }

    async fn list(&self) -> Result<Vec<Interview>, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn get(&self, id: i32) -> Result<Option<Interview>, sqlx::Error> {
        Ok(self.rows.lock().unwrap().iter().find(|i| i.id == id).cloned())
    }

    async fn list_by_status(
        &self,
        status: InterviewStatus,
    ) -> Result<Vec<Interview>, sqlx::Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.status == status)
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        id: i32,
        from: InterviewStatus,
        to: InterviewStatus,
    ) -> Result<Option<Interview>, sqlx::Error> {
        Ok(self.update_if(id, Some(from), |i| i.status = to))
    }

    async fn set_call_id(&self, id: i32, call_id: &str) -> Result<Option<Interview>, sqlx::Error> {
        if self.set_call_id_fails.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.update_if(id, None, |i| i.call_id = Some(call_id.to_string())))
    }

    async fn record_call_result(
        &self,
        id: i32,
        result: &CallResult,
    ) -> Result<Option<Interview>, sqlx::Error> {
        Ok(self.update_if(id, Some(InterviewStatus::Calling), |i| {
            i.transcript = result.transcript.clone();
            i.duration_in_seconds = result.duration_in_seconds;
            i.recording_url = result.recording_url.clone();
            i.status = InterviewStatus::Analyzing;
        }))
    }

    async fn record_analysis(
        &self,
        id: i32,
        report: &AnalysisReport,
    ) -> Result<Option<Interview>, sqlx::Error> {
        Ok(self.update_if(id, Some(InterviewStatus::Analyzing), |i| {
            i.analysis_summary = Some(report.summary.clone());
            i.analysis_strengths = Some(report.strengths.clone());
            i.analysis_concerns = Some(report.concerns.clone());
            i.assessment = Some(report.assessment.clone());
            i.score = Some(report.score);
            i.recommendation = Some(report.recommendation);
            i.status = InterviewStatus::Completed;
        }))
    }

    async fn mark_error(
        &self,
        id: i32,
        from: InterviewStatus,
        message: &str,
    ) -> Result<Option<Interview>, sqlx::Error> {
        Ok(self.update_if(id, Some(from), |i| {
            i.status = InterviewStatus::Error;
            i.error_message = Some(message.to_string());
        }))
    }

    async fn fail_stalled_calls(
        &self,
        claimed_before: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<Interview>, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        let mut failed = Vec::new();
        for row in rows.iter_mut().filter(|i| {
            i.status == InterviewStatus::Calling
                && i.call_id.is_none()
                && i.updated_at < claimed_before
        }) {
            row.status = InterviewStatus::Error;
            row.error_message = Some(message.to_string());
            row.updated_at = now;
            failed.push(row.clone());
        }
        Ok(failed)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted providers
// ────────────────────────────────────────────────────────────────────────────

pub struct ScriptedCalls {
    failure: Option<(u16, String)>,
    requests: Mutex<Vec<CallRequest>>,
}

impl ScriptedCalls {
    pub fn ok() -> Self {
        Self {
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            failure: Some((status, message.to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CallRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallProvider for ScriptedCalls {
    async fn place_call(&self, request: &CallRequest) -> Result<PlacedCall, CallProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.failure {
            Some((status, message)) => Err(CallProviderError::Api {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(PlacedCall {
                id: Some("call_test".to_string()),
            }),
        }
    }
}

pub struct ScriptedAnalysis {
    response: Result<String, (u16, String)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAnalysis {
    pub fn ok(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            response: Err((status, message.to_string())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisProvider for ScriptedAnalysis {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err((status, message)) => Err(LlmError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory queue
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryQueue {
    items: Mutex<VecDeque<i32>>,
    down: AtomicBool,
}

impl InMemoryQueue {
    /// While down, both enqueue and dequeue fail with a connection error.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check_up(&self) -> Result<(), QueueError> {
        if self.down.load(Ordering::SeqCst) {
            let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "queue is down");
            return Err(QueueError::Redis(io.into()));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<i32> {
        self.items.lock().unwrap().iter().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl AnalysisQueue for InMemoryQueue {
    async fn enqueue(&self, interview_id: i32) -> Result<(), QueueError> {
        self.check_up()?;
        self.items.lock().unwrap().push_back(interview_id);
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<i32>, QueueError> {
        self.check_up()?;
        Ok(self.items.lock().unwrap().pop_front())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Harness
// ────────────────────────────────────────────────────────────────────────────

pub struct Harness {
    pub service: Arc<InterviewService>,
    pub store: Arc<InMemoryStore>,
    pub calls: Arc<ScriptedCalls>,
    pub analysis: Option<Arc<ScriptedAnalysis>>,
    pub queue: Arc<InMemoryQueue>,
}

impl Harness {
    pub fn new(calls: ScriptedCalls, analysis: Option<ScriptedAnalysis>) -> Self {
        let store = Arc::new(InMemoryStore::default());
        let calls = Arc::new(calls);
        let analysis = analysis.map(Arc::new);
        let queue = Arc::new(InMemoryQueue::default());

        let service = Arc::new(InterviewService::new(
            store.clone(),
            calls.clone(),
            analysis
                .clone()
                .map(|a| a as Arc<dyn AnalysisProvider>),
            queue.clone(),
            "pn_test".to_string(),
        ));

        Self {
            service,
            store,
            calls,
            analysis,
            queue,
        }
    }

    /// Inserts an interview directly in the given status, bypassing the lifecycle.
    pub async fn seed(&self, status: InterviewStatus, transcript: Option<&str>) -> i32 {
        let id = InMemoryStore::next_id(&self.store.list().await.unwrap());
        let mut interview = interview_fixture(id, status);
        interview.transcript = transcript.map(str::to_string);
        self.store.put(interview);
        id
    }
}
