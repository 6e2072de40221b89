//! Error types and result alias shared by every CareCall crate.

/// The result type used throughout CareCall.
pub type Result<T> = std::result::Result<T, CareError>;

/// Errors that can occur in CareCall operations.
#[derive(Debug, thiserror::Error)]
pub enum CareError {
    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// A required reference record (department, team, enrollment) is missing.
    #[error("{resource} not found: {key}")]
    Reference {
        /// Kind of record that was looked up.
        resource: &'static str,
        /// Lookup key (code or id).
        key: String,
    },

    /// Caller input was rejected before reaching the engine.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The requester may not see or change the record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The storage layer failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A payload could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CareError {
    /// Missing reference record.
    pub fn reference(resource: &'static str, key: impl Into<String>) -> Self {
        Self::Reference {
            resource,
            key: key.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(message: impl std::fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }
}

impl From<serde_json::Error> for CareError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_message() {
        let err = CareError::reference("department", "ACADEMIC");
        assert_eq!(err.to_string(), "department not found: ACADEMIC");
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let err: CareError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, CareError::Serialization(_)));
    }
}
