// crates/server-jobs/src/fan_out.rs
//! Bounded fan-out of independent units inside one job body.

use std::fmt::{self, Display};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::ReportError;
use crate::panic_message;
use crate::progress::ProgressReporter;

/// Why a single unit did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    Failed(String),
    Panicked(String),
}

impl Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitError::Failed(msg) => write!(f, "{msg}"),
            UnitError::Panicked(msg) => write!(f, "unit panicked: {msg}"),
        }
    }
}

/// Run `work` over `units` with at most `limit` in flight.
///
/// Each sub-worker records its own outcome on `reporter` (one `completed` or
/// one `failed` per unit), so concurrent writers meet at the reporter's lock.
/// Unit errors never abort the other units. Outcomes come back in input order.
/// Returns `Err` only when recording progress failed.
pub async fn fan_out<T, R, E, F, Fut>(
    units: Vec<T>,
    limit: usize,
    reporter: Arc<ProgressReporter>,
    work: F,
) -> Result<Vec<Result<R, UnitError>>, ReportError>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Display + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    let count = units.len();
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let work = Arc::new(work);
    let mut set = JoinSet::new();

    for (index, unit) in units.into_iter().enumerate() {
        let permits = Arc::clone(&permits);
        let work = Arc::clone(&work);
        let reporter = Arc::clone(&reporter);
        set.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let outcome = match AssertUnwindSafe(async move { (*work)(unit).await })
                .catch_unwind()
                .await
            {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(UnitError::Failed(e.to_string())),
                Err(payload) => Err(UnitError::Panicked(panic_message(payload.as_ref()))),
            };
            let recorded = match &outcome {
                Ok(_) => reporter.record_completed().await,
                Err(e) => {
                    tracing::warn!(job_id = %reporter.job_id(), unit = index, error = %e, "unit failed");
                    reporter.record_failed().await
                }
            };
            (index, outcome, recorded.map(|_| ()))
        });
    }

    let mut results: Vec<Option<Result<R, UnitError>>> = (0..count).map(|_| None).collect();
    let mut report_error = None;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, outcome, recorded)) => {
                if let Err(e) = recorded {
                    report_error.get_or_insert(e);
                }
                results[index] = Some(outcome);
            }
            Err(e) => {
                // Only reachable if recording itself panicked or the task was aborted.
                tracing::error!(job_id = %reporter.job_id(), "fan-out task lost: {e}");
                if let Err(e) = reporter.record_failed().await {
                    report_error.get_or_insert(e);
                }
            }
        }
    }

    if let Some(e) = report_error {
        return Err(e);
    }
    Ok(results
        .into_iter()
        .map(|r| r.unwrap_or_else(|| Err(UnitError::Panicked("unit task lost".into()))))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::test_support::MemorySink;
    use slidegen_core::{JobId, Progress};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn reporter(total: u64) -> Arc<ProgressReporter> {
        Arc::new(ProgressReporter::new(
            JobId::new(),
            Progress::new(total),
            Arc::new(MemorySink::default()),
        ))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_outcomes_in_input_order_with_counts() {
        let reporter = reporter(10);
        let outcomes = fan_out((0..10).collect(), 4, Arc::clone(&reporter), |n: u32| async move {
            tokio::time::sleep(Duration::from_millis(u64::from(10 - n))).await;
            if n % 3 == 0 {
                Err(format!("unit {n} rejected"))
            } else {
                Ok(n * 2)
            }
        })
        .await
        .unwrap();

        assert_eq!(outcomes[1], Ok(2));
        assert_eq!(outcomes[9], Err(UnitError::Failed("unit 9 rejected".into())));
        let p = reporter.snapshot().await;
        assert_eq!((p.completed, p.failed), (6, 4));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_limit_bounds_concurrency() {
        let reporter = reporter(16);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r, pk) = (Arc::clone(&running), Arc::clone(&peak));

        fan_out((0..16).collect(), 3, reporter, move |_: usize| {
            let running = Arc::clone(&r);
            let peak = Arc::clone(&pk);
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        })
        .await
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_panicking_unit_counts_as_failed() {
        let reporter = reporter(3);
        let outcomes = fan_out(vec![1, 2, 3], 2, Arc::clone(&reporter), |n: i32| async move {
            if n == 2 {
                panic!("slide renderer crashed");
            }
            Ok::<i32, String>(n)
        })
        .await
        .unwrap();

        assert_eq!(outcomes[1], Err(UnitError::Panicked("slide renderer crashed".into())));
        let p = reporter.snapshot().await;
        assert_eq!((p.completed, p.failed), (2, 1));
    }

    #[tokio::test]
    async fn test_empty_units() {
        let reporter = reporter(0);
        let outcomes = fan_out(Vec::<u8>::new(), 4, reporter, |_| async { Ok::<(), String>(()) })
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }
}
