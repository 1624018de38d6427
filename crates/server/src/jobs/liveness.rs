// crates/server/src/jobs/liveness.rs
//! Orphan detection on the status-read path.

use slidegen_core::{Job, ORPHAN_ERROR_MESSAGE};
use slidegen_db::{Database, DbError, DbResult};
use slidegen_server_jobs::TaskScheduler;

use crate::metrics::record_job_orphaned;

/// Fails `job` if its record claims to be running but no worker holds it.
///
/// The check is lazy: it runs only when a client reads the job. A job the
/// scheduler still tracks, queued or running, is returned unchanged. The
/// transition itself is a conditional write, so concurrent polls and a body
/// finishing at the same moment cannot produce a second terminal write.
pub async fn check_liveness(db: &Database, scheduler: &TaskScheduler, job: Job) -> DbResult<Job> {
    if !job.looks_active() || scheduler.is_active(&job.id) {
        return Ok(job);
    }

    if db.fail_orphaned_job(&job.id, ORPHAN_ERROR_MESSAGE).await? {
        tracing::warn!(
            job_id = %job.id,
            kind = %job.kind,
            status = %job.status,
            "job has no live worker, marked failed"
        );
        record_job_orphaned(job.kind);
    }

    db.get_job(&job.id)
        .await?
        .ok_or_else(|| DbError::JobNotFound(job.id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidegen_core::{JobKind, JobStatus, Progress};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_processing_without_worker_is_orphaned_once() {
        let db = Database::new_in_memory().await.unwrap();
        let scheduler = TaskScheduler::new(2);
        let job = db
            .create_job(JobKind::GenerateImages, "proj", &Progress::new(4))
            .await
            .unwrap();
        // Simulates a restart: storage says PROCESSING, nothing in memory.
        db.mark_processing(&job.id).await.unwrap();

        let stale = db.get_job(&job.id).await.unwrap().unwrap();
        let polled = check_liveness(&db, &scheduler, stale.clone()).await.unwrap();
        assert_eq!(polled.status, JobStatus::Failed);
        assert_eq!(polled.error_message.as_deref(), Some(ORPHAN_ERROR_MESSAGE));
        let first_completed_at = polled.completed_at.unwrap();

        // A second poll, even one holding the stale record, changes nothing.
        let again = check_liveness(&db, &scheduler, stale).await.unwrap();
        assert_eq!(again.status, JobStatus::Failed);
        assert_eq!(again.completed_at, Some(first_completed_at));
    }

    #[tokio::test]
    async fn test_pending_without_worker_is_orphaned() {
        let db = Database::new_in_memory().await.unwrap();
        let scheduler = TaskScheduler::new(1);
        let job = db
            .create_job(JobKind::StyleRecommendations, "proj", &Progress::new(3))
            .await
            .unwrap();

        let polled = check_liveness(&db, &scheduler, job).await.unwrap();
        assert!(polled.is_orphan_failure());
    }

    #[tokio::test]
    async fn test_active_job_is_left_alone() {
        let db = Database::new_in_memory().await.unwrap();
        let scheduler = TaskScheduler::new(1);
        let job = db
            .create_job(JobKind::ExportPptx, "proj", &Progress::new(1))
            .await
            .unwrap();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        scheduler
            .submit(job.id.clone(), job.kind, move || async move {
                let _ = release_rx.await;
                Ok::<(), String>(())
            })
            .unwrap();

        let polled = check_liveness(&db, &scheduler, job.clone()).await.unwrap();
        assert_eq!(polled, job);

        release_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_existing_error_message_is_kept() {
        let db = Database::new_in_memory().await.unwrap();
        let scheduler = TaskScheduler::new(1);
        let job = db
            .create_job(JobKind::GenerateImages, "proj", &Progress::new(1))
            .await
            .unwrap();
        db.mark_processing(&job.id).await.unwrap();
        sqlx_set_error(&db, &job, "provider quota exceeded").await;

        let stale = db.get_job(&job.id).await.unwrap().unwrap();
        let polled = check_liveness(&db, &scheduler, stale).await.unwrap();
        assert_eq!(polled.status, JobStatus::Failed);
        assert_eq!(polled.error_message.as_deref(), Some("provider quota exceeded"));
    }

    #[tokio::test]
    async fn test_terminal_job_is_returned_as_is() {
        let db = Database::new_in_memory().await.unwrap();
        let scheduler = TaskScheduler::new(1);
        let job = db
            .create_job(JobKind::GenerateImages, "proj", &Progress::new(1))
            .await
            .unwrap();
        db.mark_processing(&job.id).await.unwrap();
        db.complete_job(&job.id).await.unwrap();

        let done = db.get_job(&job.id).await.unwrap().unwrap();
        let polled = check_liveness(&db, &scheduler, done.clone()).await.unwrap();
        assert_eq!(polled, done);
    }

    /// A body that wrote an error but died before its terminal write.
    async fn sqlx_set_error(db: &Database, job: &Job, message: &str) {
        sqlx::query("UPDATE jobs SET error_message = ?2 WHERE id = ?1")
            .bind(job.id.as_str())
            .bind(message)
            .execute(db.pool())
            .await
            .unwrap();
    }
}
