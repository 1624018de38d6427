// crates/server/src/jobs/context.rs
//! Execution context handed to job bodies.

use std::sync::Arc;

use slidegen_core::generation::{DocumentExporter, ImageGenerator, TextGenerator};
use slidegen_core::{FileStore, GenerationSettings, JobId, JobKind};
use slidegen_db::Database;
use slidegen_server_jobs::ProgressReporter;

/// Collaborator handles job bodies call into.
#[derive(Clone)]
pub struct Generators {
    pub text: Arc<dyn TextGenerator>,
    pub image: Arc<dyn ImageGenerator>,
    pub exporter: Arc<dyn DocumentExporter>,
}

/// Shared configuration and handles, cloned into every job at submit time.
#[derive(Clone)]
pub struct JobEnv {
    pub db: Database,
    pub settings: Arc<GenerationSettings>,
    pub generators: Generators,
    pub store: FileStore,
}

/// Everything one running job body may touch.
///
/// Built before the job is queued, so a body never reaches back into request
/// state or globals once it is running.
pub struct JobContext {
    pub job_id: JobId,
    pub kind: JobKind,
    pub owner_id: String,
    pub db: Database,
    pub reporter: Arc<ProgressReporter>,
    pub settings: Arc<GenerationSettings>,
    pub generators: Generators,
    pub store: FileStore,
}

impl JobContext {
    pub fn new(
        job_id: JobId,
        kind: JobKind,
        owner_id: impl Into<String>,
        reporter: Arc<ProgressReporter>,
        env: JobEnv,
    ) -> Self {
        Self {
            job_id,
            kind,
            owner_id: owner_id.into(),
            db: env.db,
            reporter,
            settings: env.settings,
            generators: env.generators,
            store: env.store,
        }
    }
}
