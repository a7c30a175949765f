use serde::Serialize;
use thiserror::Error;

/// Error raised when a type reference cannot be turned into a schema.
///
/// Stored by the reference registry and replayed to every later caller that
/// asks for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot resolve type '{ref_key}': {message}")]
pub struct SchemaResolutionError {
    /// Canonical key of the type that failed to resolve
    pub ref_key: String,
    /// Human readable reason
    pub message: String,
}

impl SchemaResolutionError {
    pub fn new(ref_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ref_key: ref_key.into(),
            message: message.into(),
        }
    }
}

/// Structured error produced while generating operations and documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The unit has no single, parsable `url` child.
    #[error("invalid path '{raw}'")]
    InvalidPath { raw: String },

    /// The `verb` child is not a known HTTP method.
    #[error("invalid method '{raw}' for path '{path}'")]
    InvalidMethod { raw: String, path: String },

    /// A body annotation lists no type to build a schema from.
    #[error("{tag} '{name}' does not reference a type")]
    MissingTypeReference { tag: String, name: String },

    #[error(transparent)]
    SchemaResolution(#[from] SchemaResolutionError),

    /// A filter rejected part of the annotation it was applied to.
    #[error("{filter}: {message}")]
    FilterFault { filter: String, message: String },

    /// Another unit already produced the same method and path.
    #[error("duplicate operation {method} {path} in document '{variant}'")]
    DuplicateOperation {
        method: String,
        path: String,
        variant: String,
    },

    /// Document or document-config filters failed; the result is discarded.
    #[error("document stage failed: {0}")]
    DocumentStageFault(String),
}

/// Serializable classification of a [`GenerationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidPath,
    InvalidMethod,
    MissingTypeReference,
    SchemaResolutionError,
    FilterFault,
    DuplicateOperation,
    DocumentStageFault,
}

impl GenerationError {
    /// Shorthand for a [`GenerationError::FilterFault`].
    pub fn fault(filter: &str, message: impl Into<String>) -> Self {
        GenerationError::FilterFault {
            filter: filter.to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::InvalidPath { .. } => ErrorKind::InvalidPath,
            GenerationError::InvalidMethod { .. } => ErrorKind::InvalidMethod,
            GenerationError::MissingTypeReference { .. } => ErrorKind::MissingTypeReference,
            GenerationError::SchemaResolution(_) => ErrorKind::SchemaResolutionError,
            GenerationError::FilterFault { .. } => ErrorKind::FilterFault,
            GenerationError::DuplicateOperation { .. } => ErrorKind::DuplicateOperation,
            GenerationError::DocumentStageFault(_) => ErrorKind::DocumentStageFault,
        }
    }

    /// Fatal errors stop the remaining filters for the current operation and variant.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GenerationError::MissingTypeReference { .. } | GenerationError::SchemaResolution(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let missing = GenerationError::MissingTypeReference {
            tag: "param".to_string(),
            name: "body".to_string(),
        };
        let unresolved: GenerationError = SchemaResolutionError::new("User", "not found").into();
        let fault = GenerationError::fault("ResponseFilter", "bad code");

        assert!(missing.is_fatal());
        assert!(unresolved.is_fatal());
        assert!(!fault.is_fatal());
        assert_eq!(unresolved.kind(), ErrorKind::SchemaResolutionError);
    }

    #[test]
    fn test_display_messages() {
        let err = GenerationError::InvalidMethod {
            raw: "FETCH".to_string(),
            path: "/users".to_string(),
        };
        assert_eq!(err.to_string(), "invalid method 'FETCH' for path '/users'");

        let err: GenerationError = SchemaResolutionError::new("User", "not found").into();
        assert_eq!(err.to_string(), "cannot resolve type 'User': not found");
    }
}
