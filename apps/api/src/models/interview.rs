use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of an interview.
///
/// pending → calling → analyzing → completed, with `error` reachable from any
/// non-terminal step. `completed` and `error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "interview_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InterviewStatus {
    Pending,
    Calling,
    Analyzing,
    Completed,
    Error,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Pending => "pending",
            InterviewStatus::Calling => "calling",
            InterviewStatus::Analyzing => "analyzing",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Error => "error",
        }
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final hiring recommendation produced by transcript analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recommendation")]
pub enum Recommendation {
    #[serde(rename = "Strong Hire")]
    #[sqlx(rename = "Strong Hire")]
    StrongHire,
    #[serde(rename = "Hire")]
    #[sqlx(rename = "Hire")]
    Hire,
    #[serde(rename = "Maybe")]
    #[sqlx(rename = "Maybe")]
    Maybe,
    #[serde(rename = "No Hire")]
    #[sqlx(rename = "No Hire")]
    NoHire,
}

impl Recommendation {
    pub const ALL: [Recommendation; 4] = [
        Recommendation::StrongHire,
        Recommendation::Hire,
        Recommendation::Maybe,
        Recommendation::NoHire,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongHire => "Strong Hire",
            Recommendation::Hire => "Hire",
            Recommendation::Maybe => "Maybe",
            Recommendation::NoHire => "No Hire",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// A single screening interview and everything learned about it so far.
/// Serialized as-is for the HTTP API, so field names are part of the contract.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interview {
    pub id: i32,
    pub candidate_name: String,
    pub phone_number: String,
    pub job_position: String,
    pub job_description: String,
    pub skills_to_assess: String,
    pub status: InterviewStatus,
    pub call_id: Option<String>,
    // Call results (webhook)
    pub transcript: Option<String>,
    pub duration_in_seconds: Option<i32>,
    pub recording_url: Option<String>,
    // Analysis results
    pub analysis_summary: Option<String>,
    pub analysis_strengths: Option<String>,
    pub analysis_concerns: Option<String>,
    pub assessment: Option<String>,
    pub score: Option<i32>,
    pub recommendation: Option<Recommendation>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for a new interview.
#[derive(Debug, Clone)]
pub struct NewInterview {
    pub candidate_name: String,
    pub phone_number: String,
    pub job_position: String,
    pub job_description: String,
    pub skills_to_assess: String,
}

/// What the call provider reported when the call ended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallResult {
    pub transcript: Option<String>,
    pub duration_in_seconds: Option<i32>,
    pub recording_url: Option<String>,
}

/// Structured assessment extracted from the analysis provider's response.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub summary: String,
    pub strengths: String,
    pub concerns: String,
    pub assessment: String,
    pub score: i32,
    pub recommendation: Recommendation,
}
