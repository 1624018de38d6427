// crates/db/src/queries/mod.rs
// Job record CRUD operations for the slidegen SQLite database.

mod jobs;
pub(crate) mod row_types;
