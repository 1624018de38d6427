// crates/server/src/jobs/sink.rs
use async_trait::async_trait;
use slidegen_core::{JobId, Progress};
use slidegen_db::Database;
use slidegen_server_jobs::{ProgressSink, SinkError};

/// Writes each progress snapshot straight to the job row.
pub struct DbProgressSink {
    db: Database,
}

impl DbProgressSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressSink for DbProgressSink {
    async fn persist(&self, job_id: &JobId, progress: &Progress) -> Result<(), SinkError> {
        self.db
            .set_progress(job_id, &progress.to_value())
            .await
            .map_err(|e| SinkError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidegen_core::JobKind;

    #[tokio::test]
    async fn test_persist_writes_through() {
        let db = Database::new_in_memory().await.unwrap();
        let job = db
            .create_job(JobKind::GenerateImages, "proj", &Progress::new(2))
            .await
            .unwrap();
        let sink = DbProgressSink::new(db.clone());

        let mut progress = Progress::new(2);
        progress.record_completed().unwrap();
        sink.persist(&job.id, &progress).await.unwrap();

        let stored = db.get_progress(&job.id).await.unwrap().unwrap();
        assert_eq!(Progress::from_value(&stored).unwrap(), progress);
    }

    #[tokio::test]
    async fn test_persist_after_terminal_is_an_error() {
        let db = Database::new_in_memory().await.unwrap();
        let job = db
            .create_job(JobKind::GenerateImages, "proj", &Progress::new(1))
            .await
            .unwrap();
        db.fail_job(&job.id, "bad input").await.unwrap();

        let sink = DbProgressSink::new(db);
        assert!(sink.persist(&job.id, &Progress::new(1)).await.is_err());
    }
}
