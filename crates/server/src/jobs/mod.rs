// crates/server/src/jobs/mod.rs
//! Job records wired to the in-process scheduler.
//!
//! Provides:
//! - `JobService`: create-then-submit and poll-with-liveness
//! - `JobContext`: the explicit context a job body runs with
//! - `run_job`: the wrapper that writes exactly one terminal status
//! - `check_liveness`: lazy orphan detection for the read path

pub mod context;
pub mod liveness;
pub mod runner;
pub mod service;
pub mod sink;

pub use context::{Generators, JobContext, JobEnv};
pub use liveness::check_liveness;
pub use runner::run_job;
pub use service::{JobService, SubmitError};
pub use sink::DbProgressSink;
