// crates/core/src/progress.rs
//! Progress payload written by job bodies and read by pollers.
//!
//! The persistence layer treats the payload as opaque JSON. The counters below
//! are the part every kind shares; anything kind-specific (per-page urls,
//! recommendation lists) lives in `extra` and is flattened into the same object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProgressError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    pub fn accounted(&self) -> u64 {
        self.completed + self.failed
    }

    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.accounted())
    }

    pub fn is_finished(&self) -> bool {
        self.accounted() >= self.total
    }

    /// Verifies `completed + failed <= total`.
    pub fn check(&self) -> Result<(), ProgressError> {
        if self.accounted() > self.total {
            return Err(self.overflow(self.completed, self.failed));
        }
        Ok(())
    }

    pub fn record_completed(&mut self) -> Result<(), ProgressError> {
        if self.remaining() == 0 {
            return Err(self.overflow(self.completed + 1, self.failed));
        }
        self.completed += 1;
        Ok(())
    }

    pub fn record_failed(&mut self) -> Result<(), ProgressError> {
        if self.remaining() == 0 {
            return Err(self.overflow(self.completed, self.failed + 1));
        }
        self.failed += 1;
        Ok(())
    }

    /// Changes the expected unit count. Multi-phase jobs learn it late.
    pub fn set_total(&mut self, total: u64) -> Result<(), ProgressError> {
        if total < self.accounted() {
            return Err(ProgressError::Overflow {
                total,
                completed: self.completed,
                failed: self.failed,
            });
        }
        self.total = total;
        Ok(())
    }

    pub fn set_step(&mut self, step: impl Into<String>) {
        self.current_step = Some(step.into());
    }

    pub fn insert_extra(&mut self, key: impl Into<String>, value: Value) {
        self.extra.insert(key.into(), value);
    }

    /// Inserts `value` under `key` inside the object stored at `map_key`,
    /// creating the object if needed. Used for per-item results.
    pub fn insert_entry(&mut self, map_key: &str, key: impl Into<String>, value: Value) {
        let slot = self
            .extra
            .entry(map_key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(map) = slot {
            map.insert(key.into(), value);
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, ProgressError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let progress: Progress = serde_json::from_value(value.clone())
            .map_err(|e| ProgressError::Malformed(e.to_string()))?;
        progress.check()?;
        Ok(progress)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn overflow(&self, completed: u64, failed: u64) -> ProgressError {
        ProgressError::Overflow {
            total: self.total,
            completed,
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_counters_stop_at_total() {
        let mut p = Progress::new(2);
        p.record_completed().unwrap();
        p.record_failed().unwrap();
        assert!(p.is_finished());
        assert!(p.record_completed().is_err());
        assert!(p.record_failed().is_err());
        assert_eq!((p.completed, p.failed), (1, 1));
    }

    #[test]
    fn test_set_total_cannot_undercut_accounted_units() {
        let mut p = Progress::new(5);
        p.record_completed().unwrap();
        p.record_completed().unwrap();
        assert!(p.set_total(1).is_err());
        p.set_total(12).unwrap();
        assert_eq!(p.remaining(), 10);
    }

    #[test]
    fn test_extras_flatten_into_payload() {
        let mut p = Progress::new(3).with_step("generating_recommendations");
        p.insert_entry("images", "page-1", json!("/files/p/pages/page-1.png"));
        let value = p.to_value();
        assert_eq!(
            value,
            json!({
                "total": 3,
                "completed": 0,
                "failed": 0,
                "current_step": "generating_recommendations",
                "images": { "page-1": "/files/p/pages/page-1.png" }
            })
        );
        assert_eq!(Progress::from_value(&value).unwrap(), p);
    }

    #[test]
    fn test_from_value_defaults_missing_counters() {
        let p = Progress::from_value(&json!({ "current_step": "queued" })).unwrap();
        assert_eq!(p.total, 0);
        assert_eq!(p.current_step.as_deref(), Some("queued"));
        assert_eq!(Progress::from_value(&Value::Null).unwrap(), Progress::default());
    }

    #[test]
    fn test_from_value_rejects_broken_invariant() {
        let err = Progress::from_value(&json!({ "total": 1, "completed": 1, "failed": 1 }));
        assert!(matches!(err, Err(ProgressError::Overflow { .. })));
        let err = Progress::from_value(&json!({ "total": "ten" }));
        assert!(matches!(err, Err(ProgressError::Malformed(_))));
    }
}
