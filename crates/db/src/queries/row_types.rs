// crates/db/src/queries/row_types.rs
// Row structs decoded by sqlx and converted into core types.

use chrono::{DateTime, SecondsFormat, Utc};
use slidegen_core::{Job, JobId, JobKind, JobStatus};
use sqlx::Row;

use crate::{DbError, DbResult};

/// Canonical timestamp text: fixed-width so lexical order is chronological.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

#[derive(Debug)]
pub(crate) struct JobRow {
    id: String,
    owner_id: String,
    kind: String,
    status: String,
    progress: Option<String>,
    error_message: Option<String>,
    created_at: String,
    completed_at: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for JobRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            kind: row.try_get("kind")?,
            status: row.try_get("status")?,
            progress: row.try_get("progress")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

impl JobRow {
    pub(crate) fn into_job(self) -> DbResult<Job> {
        let corrupt = |message: String| DbError::Corrupt {
            job_id: self.id.clone(),
            message,
        };

        let kind = JobKind::from_db_str(&self.kind)
            .ok_or_else(|| corrupt(format!("unknown kind {}", self.kind)))?;
        let status = JobStatus::from_db_str(&self.status)
            .ok_or_else(|| corrupt(format!("unknown status {}", self.status)))?;
        let progress = match self.progress.as_deref() {
            None | Some("") => serde_json::Value::Null,
            Some(text) => serde_json::from_str(text)
                .map_err(|e| corrupt(format!("progress is not JSON: {e}")))?,
        };
        let created_at = parse_timestamp(&self.created_at).map_err(&corrupt)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(&corrupt)?;

        Ok(Job {
            id: JobId::from(self.id.clone()),
            owner_id: self.owner_id.clone(),
            kind,
            status,
            progress,
            error_message: self.error_message.clone(),
            created_at,
            completed_at,
        })
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp {text}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_sort_lexically() {
        let early = DateTime::parse_from_rfc3339("2026-01-01T09:00:00.5Z").unwrap().with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2026-01-01T10:00:00Z").unwrap().with_timezone(&Utc);
        let (a, b) = (format_timestamp(early), format_timestamp(late));
        assert_eq!(a, "2026-01-01T09:00:00.500000Z");
        assert!(a < b);
        assert_eq!(parse_timestamp(&a).unwrap(), early);
    }
}
