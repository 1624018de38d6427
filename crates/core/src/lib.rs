// crates/core/src/lib.rs
pub mod error;
pub mod generation;
pub mod job;
pub mod paths;
pub mod policy;
pub mod progress;
pub mod settings;
pub mod storage;
pub mod validation;

pub use error::*;
pub use job::*;
pub use policy::PartialFailurePolicy;
pub use progress::Progress;
pub use settings::GenerationSettings;
pub use storage::{FileStore, StoredAsset};
