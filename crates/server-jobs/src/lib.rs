// crates/server-jobs/src/lib.rs
//! In-process job execution: the bounded scheduler, the per-job progress
//! serialization point, and bounded fan-out for job bodies.
//!
//! Nothing here knows how job records are stored. Persistence is reached
//! only through [`ProgressSink`], implemented by the server.

pub mod error;
pub mod fan_out;
pub mod progress;
pub mod scheduler;

pub use error::{ReportError, SchedulerError, SinkError};
pub use fan_out::{fan_out, UnitError};
pub use progress::{ProgressReporter, ProgressSink};
pub use scheduler::{ActiveJob, SlotState, TaskScheduler};

use std::any::Any;

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
