// crates/server/src/jobs/runner.rs
//! Guaranteed-cleanup wrapper every job body runs inside.

use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use slidegen_core::JobStatus;
use slidegen_server_jobs::panic_message;

use super::context::JobContext;
use crate::metrics::record_job_finished;

/// Drives one job record from `PENDING` to a terminal status around `body`.
///
/// The record is moved to `PROCESSING` before the body runs. Afterwards the
/// kind's partial-failure policy is applied to the final progress, and exactly
/// one terminal write follows: `COMPLETED`, or `FAILED` carrying the body's
/// error, the panic text, or the policy verdict. Returns that failure message
/// so the scheduler can log it.
pub async fn run_job<F, Fut, E>(ctx: Arc<JobContext>, body: F) -> Result<(), String>
where
    F: FnOnce(Arc<JobContext>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let started = Instant::now();

    if let Err(e) = ctx.db.mark_processing(&ctx.job_id).await {
        tracing::warn!(job_id = %ctx.job_id, kind = %ctx.kind, error = %e, "job could not start");
        return Err(format!("could not start: {e}"));
    }
    tracing::info!(job_id = %ctx.job_id, kind = %ctx.kind, owner_id = %ctx.owner_id, "job started");

    let body_ctx = Arc::clone(&ctx);
    let outcome = AssertUnwindSafe(async move { body(body_ctx).await })
        .catch_unwind()
        .await;

    let failure = match outcome {
        Ok(Ok(())) => {
            let progress = ctx.reporter.snapshot().await;
            ctx.kind.failure_policy().outcome(&progress).err()
        }
        Ok(Err(e)) => Some(e.to_string()),
        Err(payload) => Some(format!("job panicked: {}", panic_message(payload.as_ref()))),
    };

    if let Some(status) = finish(&ctx, failure.as_deref()).await {
        record_job_finished(ctx.kind, status, started.elapsed());
    }

    match failure {
        None => Ok(()),
        Some(message) => Err(message),
    }
}

/// Writes the terminal status and returns it once stored.
///
/// Persistence errors are logged, not raised, and yield `None`: the record
/// is then left active and the next poll will orphan it.
async fn finish(ctx: &JobContext, failure: Option<&str>) -> Option<JobStatus> {
    match failure {
        None => match ctx.db.complete_job(&ctx.job_id).await {
            Ok(()) => {
                tracing::info!(job_id = %ctx.job_id, kind = %ctx.kind, "job completed");
                Some(JobStatus::Completed)
            }
            Err(e) => {
                tracing::error!(job_id = %ctx.job_id, kind = %ctx.kind, error = %e, "failed to mark job completed");
                None
            }
        },
        Some(message) => match ctx.db.fail_job(&ctx.job_id, message).await {
            Ok(()) => {
                tracing::warn!(job_id = %ctx.job_id, kind = %ctx.kind, error = %message, "job failed");
                Some(JobStatus::Failed)
            }
            Err(e) => {
                tracing::error!(job_id = %ctx.job_id, kind = %ctx.kind, error = %e, "failed to mark job failed");
                None
            }
        },
    }
}
