// crates/core/src/job.rs
//! Job record types shared by the persistence layer, the scheduler and the HTTP layer.
//!
//! A job is created `PENDING` by a request handler, executed by exactly one job
//! body, and reaches `COMPLETED` or `FAILED` exactly once:
//!
//! ```text
//! PENDING --> PROCESSING --> COMPLETED
//!                 |
//!                 +--------> FAILED
//! PENDING|PROCESSING --(orphan detected on poll)--> FAILED
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::policy::PartialFailurePolicy;

/// Error message written when a poll finds a job the scheduler no longer runs.
///
/// Clients match on this text to tell infrastructure failures from job failures.
pub const ORPHAN_ERROR_MESSAGE: &str =
    "Task is not active. The server may have restarted or the worker crashed.";

/// Opaque job identifier (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Which job body produced a job. Owns the meaning of the progress payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    GenerateOutline,
    GenerateDescriptions,
    GenerateImages,
    ExportPptx,
    ExportEditablePptx,
    StyleRecommendations,
    StylePreviewRegenerate,
    PptRenovation,
}

impl JobKind {
    pub const ALL: [JobKind; 8] = [
        JobKind::GenerateOutline,
        JobKind::GenerateDescriptions,
        JobKind::GenerateImages,
        JobKind::ExportPptx,
        JobKind::ExportEditablePptx,
        JobKind::StyleRecommendations,
        JobKind::StylePreviewRegenerate,
        JobKind::PptRenovation,
    ];

    pub fn as_db_str(&self) -> &'static str {
        match self {
            JobKind::GenerateOutline => "GENERATE_OUTLINE",
            JobKind::GenerateDescriptions => "GENERATE_DESCRIPTIONS",
            JobKind::GenerateImages => "GENERATE_IMAGES",
            JobKind::ExportPptx => "EXPORT_PPTX",
            JobKind::ExportEditablePptx => "EXPORT_EDITABLE_PPTX",
            JobKind::StyleRecommendations => "STYLE_RECOMMENDATIONS",
            JobKind::StylePreviewRegenerate => "STYLE_PREVIEW_REGENERATE",
            JobKind::PptRenovation => "PPT_RENOVATION",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_db_str() == s)
    }

    /// Whether failed units still allow the job to complete.
    pub fn failure_policy(&self) -> PartialFailurePolicy {
        match self {
            JobKind::GenerateOutline | JobKind::ExportPptx | JobKind::ExportEditablePptx => {
                PartialFailurePolicy::Strict
            }
            JobKind::GenerateDescriptions
            | JobKind::GenerateImages
            | JobKind::StyleRecommendations
            | JobKind::StylePreviewRegenerate
            | JobKind::PptRenovation => PartialFailurePolicy::Tolerant,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Statuses a job may still be mutated in, as stored in the database.
    /// `RUNNING` is a legacy spelling of `PROCESSING`.
    pub const ACTIVE_DB_VALUES: [&'static str; 3] = ["PENDING", "PROCESSING", "RUNNING"];

    pub fn as_db_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(JobStatus::Pending),
            "PROCESSING" | "RUNNING" => Some(JobStatus::Processing),
            "COMPLETED" => Some(JobStatus::Completed),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// A persisted job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Parent aggregate (project) the job operates on. Used for filtering only.
    pub owner_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Kind-owned payload; `Null` until the first progress write.
    pub progress: serde_json::Value,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Whether this record still claims to be running.
    pub fn looks_active(&self) -> bool {
        self.status.is_active() && self.completed_at.is_none()
    }

    pub fn is_orphan_failure(&self) -> bool {
        self.status == JobStatus::Failed
            && self.error_message.as_deref() == Some(ORPHAN_ERROR_MESSAGE)
    }
}
