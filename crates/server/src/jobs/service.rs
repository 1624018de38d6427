// crates/server/src/jobs/service.rs
//! Submission and polling of job records.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use slidegen_core::{Job, JobId, JobKind, JobStatus, Progress, ProgressError};
use slidegen_db::{Database, DbError, DbResult};
use slidegen_server_jobs::{ProgressReporter, SchedulerError, TaskScheduler};
use thiserror::Error;

use super::context::{JobContext, JobEnv};
use super::liveness::check_liveness;
use super::runner::run_job;
use super::sink::DbProgressSink;
use crate::metrics::record_job_submitted;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("No job record {0}")]
    NotFound(JobId),

    #[error("Job {job_id} is {status}, only PENDING jobs can be submitted")]
    NotPending { job_id: JobId, status: JobStatus },

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Job record has unusable progress: {0}")]
    InvalidProgress(#[from] ProgressError),
}

/// Creates job records and hands their bodies to the scheduler.
///
/// Ordering is fixed: the `PENDING` record is persisted before the scheduler
/// sees the job id, so a poll can never observe an id without a record.
#[derive(Clone)]
pub struct JobService {
    db: Database,
    scheduler: Arc<TaskScheduler>,
}

impl JobService {
    pub fn new(db: Database, scheduler: Arc<TaskScheduler>) -> Self {
        Self { db, scheduler }
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Persist a `PENDING` record for `kind` and submit `body` for it.
    ///
    /// Returns the record as created. If the scheduler refuses the job the
    /// record is failed immediately rather than left for orphan detection.
    pub async fn launch<F, Fut, E>(
        &self,
        kind: JobKind,
        owner_id: &str,
        initial: Progress,
        env: JobEnv,
        body: F,
    ) -> Result<Job, SubmitError>
    where
        F: FnOnce(Arc<JobContext>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        initial.check()?;
        let job = self.db.create_job(kind, owner_id, &initial).await?;

        if let Err(e) = self.submit_record(&job, initial, env, body) {
            tracing::error!(job_id = %job.id, kind = %kind, error = %e, "submit failed after record was created");
            self.db.fail_job(&job.id, &e.to_string()).await?;
            return Err(e);
        }
        Ok(job)
    }

    /// Submit `body` for a record created earlier.
    ///
    /// Rejected when the record does not exist or has left `PENDING`.
    pub async fn submit_existing<F, Fut, E>(
        &self,
        job_id: &JobId,
        env: JobEnv,
        body: F,
    ) -> Result<Job, SubmitError>
    where
        F: FnOnce(Arc<JobContext>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let job = self
            .db
            .get_job(job_id)
            .await?
            .ok_or_else(|| SubmitError::NotFound(job_id.clone()))?;
        if !job.status.can_transition_to(JobStatus::Processing) {
            return Err(SubmitError::NotPending {
                job_id: job.id,
                status: job.status,
            });
        }

        let initial = Progress::from_value(&job.progress)?;
        self.submit_record(&job, initial, env, body)?;
        Ok(job)
    }

    fn submit_record<F, Fut, E>(
        &self,
        job: &Job,
        initial: Progress,
        env: JobEnv,
        body: F,
    ) -> Result<(), SubmitError>
    where
        F: FnOnce(Arc<JobContext>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let sink = Arc::new(DbProgressSink::new(self.db.clone()));
        let reporter = Arc::new(ProgressReporter::new(job.id.clone(), initial, sink));
        let ctx = Arc::new(JobContext::new(
            job.id.clone(),
            job.kind,
            job.owner_id.clone(),
            reporter,
            env,
        ));

        self.scheduler
            .submit(job.id.clone(), job.kind, move || run_job(ctx, body))?;
        record_job_submitted(job.kind, self.scheduler.active_count());
        tracing::info!(job_id = %job.id, kind = %job.kind, owner_id = %job.owner_id, "job submitted");
        Ok(())
    }

    /// Read a job, failing it first if it was orphaned.
    pub async fn poll(&self, job_id: &JobId) -> DbResult<Option<Job>> {
        match self.db.get_job(job_id).await? {
            Some(job) => check_liveness(&self.db, &self.scheduler, job).await.map(Some),
            None => Ok(None),
        }
    }

    /// Recent jobs for an owner, as stored. No liveness check runs here.
    pub async fn list(&self, owner_id: &str, limit: i64) -> DbResult<Vec<Job>> {
        self.db.list_jobs_for_owner(owner_id, limit).await
    }
}
