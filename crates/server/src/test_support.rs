// crates/server/src/test_support.rs
//! Fakes and helpers shared by the job and route tests.

use std::future::Future;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use slidegen_core::generation::{
    BundleExporter, DocumentExporter, GeneratedImage, GenerationError, ImageGenerator, ImageRequest,
    TextGenerator, TextRequest,
};
use slidegen_core::{FileStore, GenerationSettings, Job, JobId, JobKind, Progress};
use slidegen_db::Database;
use slidegen_server_jobs::TaskScheduler;

use crate::jobs::{Generators, JobContext, JobEnv, JobService};
use crate::tasks::PageSpec;

type TextFn = dyn Fn(&TextRequest) -> Result<String, GenerationError> + Send + Sync;

pub struct FakeText {
    reply: Box<TextFn>,
}

impl FakeText {
    pub fn replying(text: &str) -> Arc<dyn TextGenerator> {
        let text = text.to_string();
        Self::with(move |_| Ok(text.clone()))
    }

    pub fn with(
        reply: impl Fn(&TextRequest) -> Result<String, GenerationError> + Send + Sync + 'static,
    ) -> Arc<dyn TextGenerator> {
        Arc::new(Self { reply: Box::new(reply) })
    }
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate_text(&self, request: TextRequest) -> Result<String, GenerationError> {
        (self.reply)(&request)
    }

    fn name(&self) -> &str {
        "fake-text"
    }
}

/// Returns a tiny PNG unless the prompt contains `fail_on`.
pub struct FakeImage {
    fail_on: Option<String>,
}

impl FakeImage {
    pub fn ok() -> Arc<dyn ImageGenerator> {
        Arc::new(Self { fail_on: None })
    }

    pub fn failing_when(needle: &str) -> Arc<dyn ImageGenerator> {
        Arc::new(Self {
            fail_on: Some(needle.to_string()),
        })
    }
}

#[async_trait]
impl ImageGenerator for FakeImage {
    async fn generate_image(&self, request: ImageRequest) -> Result<GeneratedImage, GenerationError> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        if let Some(needle) = &self.fail_on {
            if request.prompt.contains(needle.as_str()) {
                return Err(GenerationError::Api {
                    status: 500,
                    message: "image backend exploded".into(),
                });
            }
        }
        Ok(GeneratedImage::png(b"\x89PNG\r\n\x1a\nfake".to_vec()))
    }

    fn name(&self) -> &str {
        "fake-image"
    }
}

pub fn temp_store() -> FileStore {
    FileStore::new(std::env::temp_dir().join(format!("slidegen-test-{}", uuid::Uuid::new_v4())))
}

pub fn test_env(db: Database) -> JobEnv {
    test_env_with(db, None, None, None)
}

/// Environment with the given collaborators. Missing ones get a replying
/// text fake, a succeeding image fake and a bundle exporter over a temp dir.
pub fn test_env_with(
    db: Database,
    text: Option<Arc<dyn TextGenerator>>,
    image: Option<Arc<dyn ImageGenerator>>,
    exporter: Option<Arc<dyn DocumentExporter>>,
) -> JobEnv {
    let store = temp_store();
    let exporter = exporter.unwrap_or_else(|| Arc::new(BundleExporter::new(store.clone())));
    JobEnv {
        db,
        settings: Arc::new(GenerationSettings::default()),
        generators: Generators {
            text: text.unwrap_or_else(|| FakeText::replying("{}")),
            image: image.unwrap_or_else(FakeImage::ok),
            exporter,
        },
        store,
    }
}

pub fn pages(count: usize) -> Vec<PageSpec> {
    (1..=count)
        .map(|i| PageSpec {
            page_id: format!("page-{i}"),
            title: format!("Page {i}"),
            points: Vec::new(),
            part: None,
            description: None,
        })
        .collect()
}

/// Polls until the job reaches a terminal status. Panics after five seconds.
pub async fn wait_terminal(service: &JobService, job_id: &JobId) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let job = service.poll(job_id).await.unwrap().expect("job record exists");
        if job.status.is_terminal() {
            return job;
        }
        assert!(tokio::time::Instant::now() < deadline, "job {job_id} stuck in {}", job.status);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Launches one job for owner `proj` on a fresh database and waits for it.
pub async fn launch_and_wait<M, F, Fut, E>(kind: JobKind, initial: Progress, make_env: M, body: F) -> Job
where
    M: FnOnce(Database) -> JobEnv,
    F: FnOnce(Arc<JobContext>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    launch_and_wait_env(kind, initial, make_env, body).await.0
}

pub async fn launch_and_wait_env<M, F, Fut, E>(
    kind: JobKind,
    initial: Progress,
    make_env: M,
    body: F,
) -> (Job, JobEnv)
where
    M: FnOnce(Database) -> JobEnv,
    F: FnOnce(Arc<JobContext>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let db = Database::new_in_memory().await.unwrap();
    let service = JobService::new(db.clone(), Arc::new(TaskScheduler::new(4)));
    let env = make_env(db);
    let job = service
        .launch(kind, "proj", initial, env.clone(), body)
        .await
        .unwrap();
    (wait_terminal(&service, &job.id).await, env)
}
