// crates/core/src/validation.rs
//! Argument checks run by request handlers before a job record is created.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::storage::file_component;

pub const MIN_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 16;
pub const MIN_EXPORT_DEPTH: u32 = 1;
pub const MAX_EXPORT_DEPTH: u32 = 5;

/// Internal sub-worker count for kinds that fan out.
pub fn validate_concurrency(name: &'static str, value: i64) -> Result<usize, ValidationError> {
    if value < MIN_CONCURRENCY as i64 || value > MAX_CONCURRENCY as i64 {
        return Err(ValidationError::out_of_range(
            name,
            value,
            MIN_CONCURRENCY as i64,
            MAX_CONCURRENCY as i64,
        ));
    }
    Ok(value as usize)
}

/// Recursion depth for editable export.
pub fn validate_depth(value: i64) -> Result<u32, ValidationError> {
    if value < MIN_EXPORT_DEPTH as i64 || value > MAX_EXPORT_DEPTH as i64 {
        return Err(ValidationError::out_of_range(
            "max_depth",
            value,
            MIN_EXPORT_DEPTH as i64,
            MAX_EXPORT_DEPTH as i64,
        ));
    }
    Ok(value as u32)
}

pub fn require_non_empty<T>(name: &'static str, items: &[T]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::Empty(name));
    }
    Ok(())
}

/// Ids that name per-item outputs must stay distinct once reduced to the
/// file component the store writes, or results would overwrite each other.
pub fn require_unique_ids<'a>(
    name: &'static str,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(file_component(id)) {
            return Err(ValidationError::Duplicate {
                name,
                value: id.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_bounds() {
        assert_eq!(validate_concurrency("max_workers", 1), Ok(1));
        assert_eq!(validate_concurrency("max_workers", 16), Ok(16));
        assert!(validate_concurrency("max_workers", 0).is_err());
        assert!(validate_concurrency("max_workers", 17).is_err());
        assert!(validate_concurrency("max_workers", -3).is_err());
    }

    #[test]
    fn test_depth_bounds() {
        assert_eq!(validate_depth(3), Ok(3));
        assert!(validate_depth(0).is_err());
        assert!(validate_depth(6).is_err());
    }

    #[test]
    fn test_require_non_empty() {
        let empty: [u8; 0] = [];
        assert_eq!(require_non_empty("pages", &empty), Err(ValidationError::Empty("pages")));
        assert!(require_non_empty("pages", &[1]).is_ok());
    }

    #[test]
    fn test_require_unique_ids() {
        assert!(require_unique_ids("page_id", ["p1", "p2", "p-3"]).is_ok());
        assert_eq!(
            require_unique_ids("page_id", ["p1", "p2", "p1"]),
            Err(ValidationError::Duplicate {
                name: "page_id",
                value: "p1".into()
            })
        );
        // Both are stored as `p_2`.
        let err = require_unique_ids("page_id", ["p/2", "p_2"]).unwrap_err();
        assert_eq!(err.to_string(), "duplicate page_id: p_2");
    }
}
