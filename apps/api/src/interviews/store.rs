//! Interview persistence.
//!
//! Every mutation is a single-row conditional update keyed on the current
//! status, so two requests racing on the same interview cannot both win.
//! A `None` return means the row was missing or not in the expected status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::interview::{
    AnalysisReport, CallResult, Interview, InterviewStatus, NewInterview,
};

#[async_trait]
pub trait InterviewStore: Send + Sync {
    async fn insert(&self, new: &NewInterview) -> Result<Interview, sqlx::Error>;

    /// All interviews, newest first.
    async fn list(&self) -> Result<Vec<Interview>, sqlx::Error>;

    async fn get(&self, id: i32) -> Result<Option<Interview>, sqlx::Error>;

    async fn list_by_status(&self, status: InterviewStatus)
        -> Result<Vec<Interview>, sqlx::Error>;

    /// Compare-and-set on status.
    async fn transition(
        &self,
        id: i32,
        from: InterviewStatus,
        to: InterviewStatus,
    ) -> Result<Option<Interview>, sqlx::Error>;

    async fn set_call_id(&self, id: i32, call_id: &str) -> Result<Option<Interview>, sqlx::Error>;

    /// `calling → analyzing`, storing what the provider reported.
    async fn record_call_result(
        &self,
        id: i32,
        result: &CallResult,
    ) -> Result<Option<Interview>, sqlx::Error>;

    /// `analyzing → completed`, storing the assessment.
    async fn record_analysis(
        &self,
        id: i32,
        report: &AnalysisReport,
    ) -> Result<Option<Interview>, sqlx::Error>;

    /// `from → error`, storing a diagnostic.
    async fn mark_error(
        &self,
        id: i32,
        from: InterviewStatus,
        message: &str,
    ) -> Result<Option<Interview>, sqlx::Error>;

    /// `calling → error` for rows claimed before `claimed_before` that never
    /// received a call id.
    async fn fail_stalled_calls(
        &self,
        claimed_before: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<Interview>, sqlx::Error>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgInterviewStore {
    pool: PgPool,
}

impl PgInterviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterviewStore for PgInterviewStore {
    async fn insert(&self, new: &NewInterview) -> Result<Interview, sqlx::Error> {
        sqlx::query_as::<_, Interview>(
            r#"
            INSERT INTO interviews
                (candidate_name, phone_number, job_position, job_description, skills_to_assess)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&new.candidate_name)
        .bind(&new.phone_number)
        .bind(&new.job_position)
        .bind(&new.job_description)
        .bind(&new.skills_to_assess)
        .fetch_one(&self.pool)
        .await
    }

    async fn list(&self) -> Result<Vec<Interview>, sqlx::Error> {
        sqlx::query_as::<_, Interview>("SELECT * FROM interviews ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
    }

    async fn get(&self, id: i32) -> Result<Option<Interview>, sqlx::Error> {
        sqlx::query_as::<_, Interview>("SELECT * FROM interviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_by_status(
        &self,
        status: InterviewStatus,
    ) -> Result<Vec<Interview>, sqlx::Error> {
        sqlx::query_as::<_, Interview>("SELECT * FROM interviews WHERE status = $1 ORDER BY id")
            .bind(status)
            .fetch_all(&self.pool)
            .await
    }

    async fn transition(
        &self,
        id: i32,
        from: InterviewStatus,
        to: InterviewStatus,
    ) -> Result<Option<Interview>, sqlx::Error> {
        sqlx::query_as::<_, Interview>(
            r#"
            UPDATE interviews
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_call_id(&self, id: i32, call_id: &str) -> Result<Option<Interview>, sqlx::Error> {
        sqlx::query_as::<_, Interview>(
            "UPDATE interviews SET call_id = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_call_result(
        &self,
        id: i32,
        result: &CallResult,
    ) -> Result<Option<Interview>, sqlx::Error> {
        sqlx::query_as::<_, Interview>(
            r#"
            UPDATE interviews
            SET transcript = $3,
                duration_in_seconds = $4,
                recording_url = $5,
                status = $6,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(InterviewStatus::Calling)
        .bind(&result.transcript)
        .bind(result.duration_in_seconds)
        .bind(&result.recording_url)
        .bind(InterviewStatus::Analyzing)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_analysis(
        &self,
        id: i32,
        report: &AnalysisReport,
    ) -> Result<Option<Interview>, sqlx::Error> {
        sqlx::query_as::<_, Interview>(
            r#"
            UPDATE interviews
            SET analysis_summary = $3,
                analysis_strengths = $4,
                analysis_concerns = $5,
                assessment = $6,
                score = $7,
                recommendation = $8,
                status = $9,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(InterviewStatus::Analyzing)
        .bind(&report.summary)
        .bind(&report.strengths)
        .bind(&report.concerns)
        .bind(&report.assessment)
        .bind(report.score)
        .bind(report.recommendation)
        .bind(InterviewStatus::Completed)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_error(
        &self,
        id: i32,
        from: InterviewStatus,
        message: &str,
    ) -> Result<Option<Interview>, sqlx::Error> {
        sqlx::query_as::<_, Interview>(
            r#"
            UPDATE interviews
            SET status = $3, error_message = $4, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(InterviewStatus::Error)
        .bind(message)
        .fetch_optional(&self.pool)
        .await
    }

    async fn fail_stalled_calls(
        &self,
        claimed_before: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<Interview>, sqlx::Error> {
        sqlx::query_as::<_, Interview>(
            r#"
            UPDATE interviews
            SET status = $3, error_message = $4, updated_at = NOW()
            WHERE status = $1 AND call_id IS NULL AND updated_at < $2
            RETURNING *
            "#,
        )
        .bind(InterviewStatus::Calling)
        .bind(claimed_before)
        .bind(InterviewStatus::Error)
        .bind(message)
        .fetch_all(&self.pool)
        .await
    }
}
