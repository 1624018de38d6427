/// Inline SQL migrations for the slidegen job store.
///
/// Timestamps are RFC 3339 text with fixed microsecond precision so that
/// lexical order matches chronological order.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: jobs table
    r#"
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    progress TEXT,
    error_message TEXT,
    created_at TEXT NOT NULL,
    completed_at TEXT,
    CONSTRAINT valid_status CHECK (status IN ('PENDING', 'PROCESSING', 'RUNNING', 'COMPLETED', 'FAILED'))
);
"#,
    // Migration 2: polling by owner, newest first
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_owner_created ON jobs(owner_id, created_at DESC);"#,
    // Migration 3: active-job scans
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);"#,
];

// ============================================================================
// Tests for migrations
// ============================================================================
