// crates/core/src/error.rs
use thiserror::Error;

/// Errors raised while validating job arguments, before any job record exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("duplicate {name}: {value}")]
    Duplicate { name: &'static str, value: String },

    #[error("Unknown {kind}: {value}")]
    Unknown { kind: &'static str, value: String },
}

/// Errors raised by progress mutations that would break the counter invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("progress overflow: completed ({completed}) + failed ({failed}) would exceed total ({total})")]
    Overflow {
        total: u64,
        completed: u64,
        failed: u64,
    },

    #[error("malformed progress payload: {0}")]
    Malformed(String),
}

impl ValidationError {
    pub fn out_of_range(name: &'static str, value: i64, min: i64, max: i64) -> Self {
        Self::OutOfRange {
            name,
            value,
            min,
            max,
        }
    }

    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::Unknown {
            kind,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = ValidationError::out_of_range("max_workers", 17, 1, 16);
        assert_eq!(err.to_string(), "max_workers must be between 1 and 16, got 17");
    }

    #[test]
    fn test_overflow_message() {
        let err = ProgressError::Overflow {
            total: 3,
            completed: 3,
            failed: 1,
        };
        assert!(err.to_string().contains("exceed total (3)"));
    }
}
