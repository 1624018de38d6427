// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use slidegen_db::Database;
use slidegen_server_jobs::TaskScheduler;

use crate::jobs::{JobEnv, JobService};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    pub db: Database,
    /// Creates job records and owns the process-wide scheduler.
    pub jobs: JobService,
    /// Settings and collaborator handles cloned into every submitted job.
    pub env: JobEnv,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    ///
    /// `workers` bounds how many job bodies run at once across all kinds.
    pub fn new(env: JobEnv, workers: usize) -> Arc<Self> {
        let db = env.db.clone();
        let scheduler = Arc::new(TaskScheduler::new(workers));
        Arc::new(Self {
            start_time: Instant::now(),
            jobs: JobService::new(db.clone(), scheduler),
            db,
            env,
        })
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        self.jobs.scheduler()
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
