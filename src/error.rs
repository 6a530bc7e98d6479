//! Error types for entity lookups
//!
//! This module defines the error type for the wikibase-context library.
//! Errors are `Clone` so that a single failed bulk fetch can be reported
//! to every caller waiting on it.

use thiserror::Error;

/// Main error type for entity lookups
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WikibaseError {
    /// Input is neither a registered resource key nor a valid entity id
    #[error("Invalid key: {0} is neither a resource key nor a valid entity id")]
    InvalidKey(String),

    /// Resource key already registered with a different entity id
    #[error("Resource key conflict: {key} is already {existing}, refusing to remap to {requested}")]
    Conflict {
        key: String,
        existing: String,
        requested: String,
    },

    /// The bulk fetcher failed (network, decode or upstream error)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A scheduled background refresh failed
    #[error("Refresh error: {0}")]
    Refresh(String),

    /// Store backend error
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl WikibaseError {
    /// Wrap an error raised during a background refresh
    pub fn into_refresh(self) -> Self {
        match self {
            WikibaseError::Refresh(_) => self,
            other => WikibaseError::Refresh(other.to_string()),
        }
    }
}

/// Result type alias for entity lookups
pub type Result<T> = std::result::Result<T, WikibaseError>;

impl From<serde_json::Error> for WikibaseError {
    fn from(e: serde_json::Error) -> Self {
        WikibaseError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = WikibaseError::InvalidKey("foo".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid key: foo is neither a resource key nor a valid entity id"
        );

        let conflict = WikibaseError::Conflict {
            key: "human".to_string(),
            existing: "Q5".to_string(),
            requested: "Q6".to_string(),
        };
        assert!(conflict.to_string().contains("human is already Q5"));

        let fetch = WikibaseError::Fetch("503 Service Unavailable".to_string());
        assert!(fetch.to_string().contains("503"));
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: WikibaseError = json_err.into();
        assert!(matches!(error, WikibaseError::Serialization(_)));
    }

    #[test]
    fn test_into_refresh() {
        let error = WikibaseError::Fetch("timeout".to_string()).into_refresh();
        assert_eq!(
            error,
            WikibaseError::Refresh("Fetch error: timeout".to_string())
        );

        let store = WikibaseError::Store("disk full".to_string()).into_refresh();
        assert_eq!(
            store,
            WikibaseError::Refresh("Store error: disk full".to_string())
        );

        let already = WikibaseError::Refresh("x".to_string()).into_refresh();
        assert_eq!(already, WikibaseError::Refresh("x".to_string()));
    }
}
