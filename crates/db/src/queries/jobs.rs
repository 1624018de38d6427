// crates/db/src/queries/jobs.rs
// Job record lifecycle: creation, status transitions, progress reads and writes.
//
// Every status write is a conditional UPDATE keyed on the current status, so
// the state machine holds even when a job body and a poller race.

use serde_json::Value;
use slidegen_core::{Job, JobId, JobKind, JobStatus, Progress};

use super::row_types::{now_timestamp, JobRow};
use crate::{Database, DbError, DbResult};

const ACTIVE_STATUSES: &str = "('PENDING', 'PROCESSING', 'RUNNING')";

impl Database {
    /// Persist a new `PENDING` job. The returned record is what was stored.
    pub async fn create_job(
        &self,
        kind: JobKind,
        owner_id: &str,
        progress: &Progress,
    ) -> DbResult<Job> {
        let id = JobId::new();
        let row: JobRow = sqlx::query_as(
            r#"
            INSERT INTO jobs (id, owner_id, kind, status, progress, created_at)
            VALUES (?1, ?2, ?3, 'PENDING', ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(id.as_str())
        .bind(owner_id)
        .bind(kind.as_db_str())
        .bind(progress.to_value().to_string())
        .bind(now_timestamp())
        .fetch_one(self.pool())
        .await?;
        row.into_job()
    }

    pub async fn get_job(&self, job_id: &JobId) -> DbResult<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = ?1")
            .bind(job_id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(JobRow::into_job).transpose()
    }

    /// Most recent jobs for one owner, newest first.
    pub async fn list_jobs_for_owner(&self, owner_id: &str, limit: i64) -> DbResult<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT * FROM jobs WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(JobRow::into_job).collect()
    }

    /// `PENDING -> PROCESSING`. First action of every job body.
    pub async fn mark_processing(&self, job_id: &JobId) -> DbResult<()> {
        let result = sqlx::query("UPDATE jobs SET status = 'PROCESSING' WHERE id = ?1 AND status = 'PENDING'")
            .bind(job_id.as_str())
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(self.transition_error(job_id, JobStatus::Processing).await);
        }
        Ok(())
    }

    /// `PROCESSING -> COMPLETED`, stamping `completed_at`.
    pub async fn complete_job(&self, job_id: &JobId) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                status = 'COMPLETED',
                completed_at = ?2
            WHERE id = ?1 AND status IN ('PROCESSING', 'RUNNING') AND completed_at IS NULL
            "#,
        )
        .bind(job_id.as_str())
        .bind(now_timestamp())
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(self.transition_error(job_id, JobStatus::Completed).await);
        }
        Ok(())
    }

    /// Fail an active job with a body-specific message.
    pub async fn fail_job(&self, job_id: &JobId, error: &str) -> DbResult<()> {
        if !self.fail_if_active(job_id, error).await? {
            return Err(self.transition_error(job_id, JobStatus::Failed).await);
        }
        Ok(())
    }

    /// Recovery transition used when a poll finds no live worker.
    ///
    /// Returns `true` only for the call that performed the transition; a job
    /// that already reached a terminal state is left untouched.
    pub async fn fail_orphaned_job(&self, job_id: &JobId, error: &str) -> DbResult<bool> {
        self.fail_if_active(job_id, error).await
    }

    async fn fail_if_active(&self, job_id: &JobId, error: &str) -> DbResult<bool> {
        let sql = format!(
            r#"
            UPDATE jobs SET
                status = 'FAILED',
                error_message = COALESCE(error_message, ?2),
                completed_at = ?3
            WHERE id = ?1 AND status IN {ACTIVE_STATUSES} AND completed_at IS NULL
            "#
        );
        let result = sqlx::query(&sql)
            .bind(job_id.as_str())
            .bind(error)
            .bind(now_timestamp())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the progress payload of an active job.
    pub async fn set_progress(&self, job_id: &JobId, progress: &Value) -> DbResult<()> {
        let sql = format!("UPDATE jobs SET progress = ?2 WHERE id = ?1 AND status IN {ACTIVE_STATUSES}");
        let result = sqlx::query(&sql)
            .bind(job_id.as_str())
            .bind(progress.to_string())
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(match self.get_job(job_id).await? {
                Some(job) => DbError::NotActive {
                    job_id: job_id.to_string(),
                    status: job.status,
                },
                None => DbError::JobNotFound(job_id.to_string()),
            });
        }
        Ok(())
    }

    /// `None` when the job does not exist; `Some(Null)` before the first write.
    pub async fn get_progress(&self, job_id: &JobId) -> DbResult<Option<Value>> {
        let row: Option<(Option<String>,)> = sqlx::query_as("SELECT progress FROM jobs WHERE id = ?1")
            .bind(job_id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(|(progress,)| match progress {
            None => Ok(Value::Null),
            Some(text) => serde_json::from_str(&text).map_err(|e| DbError::Corrupt {
                job_id: job_id.to_string(),
                message: format!("progress is not JSON: {e}"),
            }),
        })
        .transpose()
    }

    async fn transition_error(&self, job_id: &JobId, to: JobStatus) -> DbError {
        match self.get_job(job_id).await {
            Ok(Some(job)) => DbError::InvalidTransition {
                job_id: job_id.to_string(),
                from: job.status,
                to,
            },
            Ok(None) => DbError::JobNotFound(job_id.to_string()),
            Err(e) => e,
        }
    }
}
