// crates/server-jobs/src/scheduler.rs
//! Bounded in-process scheduler for job bodies.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::Serialize;
use slidegen_core::{JobId, JobKind};
use tokio::sync::Semaphore;
use utoipa::ToSchema;

use crate::error::SchedulerError;
use crate::panic_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// Submitted, waiting for a worker slot.
    Queued,
    Running,
}

/// Registry entry for a job the scheduler still holds.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveJob {
    #[schema(value_type = String)]
    pub job_id: JobId,
    pub kind: JobKind,
    pub state: SlotState,
    #[schema(value_type = String)]
    pub submitted_at: DateTime<Utc>,
    #[schema(value_type = Option<String>)]
    pub started_at: Option<DateTime<Utc>>,
}

type Registry = HashMap<JobId, ActiveJob>;

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|e| {
        tracing::error!("Mutex poisoned on job registry: {e}");
        e.into_inner()
    })
}

/// Runs job bodies on tokio tasks, at most `capacity` at a time.
///
/// A job is active from the moment `submit` returns until its task exits,
/// including while it waits for a slot. The registry is process-local: after
/// a restart nothing is active, which is what orphan detection relies on.
pub struct TaskScheduler {
    permits: Arc<Semaphore>,
    capacity: usize,
    registry: Arc<Mutex<Registry>>,
}

/// Removes a job from the registry when its task ends, however it ends.
struct Registration {
    registry: Arc<Mutex<Registry>>,
    job_id: JobId,
}

impl Registration {
    fn mark_running(&self) {
        if let Some(entry) = lock(&self.registry).get_mut(&self.job_id) {
            entry.state = SlotState::Running;
            entry.started_at = Some(Utc::now());
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.job_id);
    }
}

impl TaskScheduler {
    /// Create a scheduler with `capacity` worker slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register `job_id` as active and run `work` once a slot frees up.
    ///
    /// Returns as soon as the job is registered. The caller must have persisted
    /// a `PENDING` record for `job_id` first; the scheduler never touches it.
    /// Errors and panics from `work` are logged and the slot is released, but
    /// writing `FAILED` is left to the job body.
    pub fn submit<F, Fut, E>(&self, job_id: JobId, kind: JobKind, work: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| SchedulerError::NoRuntime(job_id.clone()))?;

        {
            let mut registry = lock(&self.registry);
            if registry.contains_key(&job_id) {
                return Err(SchedulerError::AlreadyActive(job_id));
            }
            registry.insert(
                job_id.clone(),
                ActiveJob {
                    job_id: job_id.clone(),
                    kind,
                    state: SlotState::Queued,
                    submitted_at: Utc::now(),
                    started_at: None,
                },
            );
        }

        let registration = Registration {
            registry: Arc::clone(&self.registry),
            job_id: job_id.clone(),
        };
        let permits = Arc::clone(&self.permits);

        tracing::debug!(job_id = %job_id, kind = %kind, "job queued");
        runtime.spawn(async move {
            let registration = registration;
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(job_id = %registration.job_id, "worker pool closed: {e}");
                    return;
                }
            };
            registration.mark_running();

            let started = Instant::now();
            let outcome = AssertUnwindSafe(async move { work().await }).catch_unwind().await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match outcome {
                Ok(Ok(())) => {
                    tracing::debug!(job_id = %registration.job_id, kind = %kind, elapsed_ms, "job finished");
                }
                Ok(Err(e)) => {
                    tracing::warn!(job_id = %registration.job_id, kind = %kind, elapsed_ms, error = %e, "job returned an error");
                }
                Err(payload) => {
                    tracing::error!(
                        job_id = %registration.job_id,
                        kind = %kind,
                        panic = %panic_message(payload.as_ref()),
                        "job panicked"
                    );
                }
            }
        });
        Ok(())
    }

    /// True while the scheduler holds a queued or running task for `job_id`.
    pub fn is_active(&self, job_id: &JobId) -> bool {
        lock(&self.registry).contains_key(job_id)
    }

    /// Snapshot of the registry, oldest submission first.
    pub fn active_jobs(&self) -> Vec<ActiveJob> {
        let mut jobs: Vec<ActiveJob> = lock(&self.registry).values().cloned().collect();
        jobs.sort_by_key(|j| j.submitted_at);
        jobs
    }

    pub fn active_count(&self) -> usize {
        lock(&self.registry).len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free worker slots. Queued jobs take them as they open up.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Slots currently executing a job body.
    pub fn running_count(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }
}
