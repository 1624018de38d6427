// crates/core/src/policy.rs
//! Per-kind rule deciding whether failed units still allow a job to complete.

use serde::{Deserialize, Serialize};

use crate::progress::Progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialFailurePolicy {
    /// Failed units are reported in the counters; the job still completes.
    Tolerant,
    /// Any failed unit fails the whole job.
    Strict,
}

impl PartialFailurePolicy {
    /// Final verdict for a body that returned normally with `progress`.
    /// `Err` carries the message to store on the job.
    pub fn outcome(&self, progress: &Progress) -> Result<(), String> {
        match self {
            PartialFailurePolicy::Tolerant => Ok(()),
            PartialFailurePolicy::Strict if progress.failed > 0 => Err(format!(
                "{} of {} units failed",
                progress.failed, progress.total
            )),
            PartialFailurePolicy::Strict => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seven_of_ten() -> Progress {
        let mut p = Progress::new(10);
        for _ in 0..7 {
            p.record_completed().unwrap();
        }
        for _ in 0..3 {
            p.record_failed().unwrap();
        }
        p
    }

    #[test]
    fn test_tolerant_accepts_partial_failure() {
        assert!(PartialFailurePolicy::Tolerant.outcome(&seven_of_ten()).is_ok());
    }

    #[test]
    fn test_strict_rejects_partial_failure() {
        let err = PartialFailurePolicy::Strict.outcome(&seven_of_ten()).unwrap_err();
        assert_eq!(err, "3 of 10 units failed");
    }

    #[test]
    fn test_strict_accepts_clean_run() {
        let mut p = Progress::new(1);
        p.record_completed().unwrap();
        assert!(PartialFailurePolicy::Strict.outcome(&p).is_ok());
    }
}
