// crates/server-jobs/src/progress.rs
//! Per-job progress serialization point.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use slidegen_core::{JobId, Progress, ProgressError};
use tokio::sync::Mutex;

use crate::error::{ReportError, SinkError};

/// Where progress snapshots are persisted.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn persist(&self, job_id: &JobId, progress: &Progress) -> Result<(), SinkError>;
}

/// Owns the in-memory progress of one job and writes every change through
/// to a [`ProgressSink`].
///
/// All sub-workers of a job share one reporter. Each update is applied to a
/// copy under the lock, checked against `completed + failed <= total`,
/// persisted, and only then committed, so persisted snapshots appear in
/// update order and no increment is lost.
pub struct ProgressReporter {
    job_id: JobId,
    state: Mutex<Progress>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressReporter {
    pub fn new(job_id: JobId, initial: Progress, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            job_id,
            state: Mutex::new(initial),
            sink,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Atomic read-modify-write of the payload.
    ///
    /// On any error the in-memory state is left as it was.
    pub async fn update<T, F>(&self, f: F) -> Result<T, ReportError>
    where
        F: FnOnce(&mut Progress) -> Result<T, ProgressError>,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let out = f(&mut next)?;
        next.check()?;
        self.sink.persist(&self.job_id, &next).await?;
        *state = next;
        Ok(out)
    }

    pub async fn record_completed(&self) -> Result<Progress, ReportError> {
        self.update(|p| {
            p.record_completed()?;
            Ok(p.clone())
        })
        .await
    }

    pub async fn record_failed(&self) -> Result<Progress, ReportError> {
        self.update(|p| {
            p.record_failed()?;
            Ok(p.clone())
        })
        .await
    }

    pub async fn set_step(&self, step: &str) -> Result<(), ReportError> {
        self.update(|p| {
            p.set_step(step);
            Ok(())
        })
        .await
    }

    pub async fn insert_extra(&self, key: &str, value: Value) -> Result<(), ReportError> {
        self.update(|p| {
            p.insert_extra(key, value);
            Ok(())
        })
        .await
    }

    /// Stores a per-item result, e.g. `images[page_id] = url`.
    pub async fn insert_entry(&self, map_key: &str, key: &str, value: Value) -> Result<(), ReportError> {
        self.update(|p| {
            p.insert_entry(map_key, key, value);
            Ok(())
        })
        .await
    }

    pub async fn snapshot(&self) -> Progress {
        self.state.lock().await.clone()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Records every persisted snapshot in order.
    #[derive(Default)]
    pub(crate) struct MemorySink {
        pub(crate) snapshots: StdMutex<Vec<Progress>>,
        pub(crate) fail: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl ProgressSink for MemorySink {
        async fn persist(&self, _job_id: &JobId, progress: &Progress) -> Result<(), SinkError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(SinkError("disk full".into()));
            }
            // Yield so concurrent updates interleave if the lock were missing.
            tokio::task::yield_now().await;
            self.snapshots.lock().unwrap().push(progress.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MemorySink;
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;

    fn reporter(total: u64) -> (Arc<ProgressReporter>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let reporter = Arc::new(ProgressReporter::new(
            JobId::new(),
            Progress::new(total),
            sink.clone(),
        ));
        (reporter, sink)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sub_workers_do_not_lose_updates() {
        let (reporter, sink) = reporter(80);

        let mut handles = Vec::new();
        for worker in 0..8 {
            let reporter = Arc::clone(&reporter);
            handles.push(tokio::spawn(async move {
                for unit in 0..10 {
                    if (worker * 10 + unit) % 5 == 0 {
                        reporter.record_failed().await.unwrap();
                    } else {
                        reporter.record_completed().await.unwrap();
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let final_progress = reporter.snapshot().await;
        assert_eq!((final_progress.completed, final_progress.failed), (64, 16));

        let snapshots = sink.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 80);
        for (i, snapshot) in snapshots.iter().enumerate() {
            assert!(snapshot.accounted() <= snapshot.total);
            assert_eq!(snapshot.accounted(), i as u64 + 1, "persisted out of order");
        }
    }

    #[tokio::test]
    async fn test_overflow_is_rejected_and_state_kept() {
        let (reporter, sink) = reporter(1);
        reporter.record_completed().await.unwrap();
        let err = reporter.record_completed().await.unwrap_err();
        assert!(matches!(err, ReportError::Progress(ProgressError::Overflow { .. })));
        assert_eq!(reporter.snapshot().await.completed, 1);
        assert_eq!(sink.snapshots.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_commit() {
        let (reporter, sink) = reporter(2);
        sink.fail.store(true, Ordering::SeqCst);
        assert!(matches!(reporter.record_completed().await, Err(ReportError::Sink(_))));
        assert_eq!(reporter.snapshot().await.completed, 0);

        sink.fail.store(false, Ordering::SeqCst);
        reporter.record_completed().await.unwrap();
        assert_eq!(reporter.snapshot().await.completed, 1);
    }

    #[tokio::test]
    async fn test_entries_and_steps() {
        let (reporter, _sink) = reporter(2);
        reporter.set_step("rendering").await.unwrap();
        reporter
            .insert_entry("preview_images", "slide-1", Value::from("/files/p/previews/1.png"))
            .await
            .unwrap();

        let snapshot = reporter.snapshot().await.to_value();
        assert_eq!(snapshot["current_step"], "rendering");
        assert_eq!(snapshot["preview_images"]["slide-1"], "/files/p/previews/1.png");
    }
}
