//! Error taxonomy for the form engine.
//!
//! Only failures a caller can act on are represented here. Unparsable
//! persisted blobs and non-image files in a photo batch are handled in place
//! (logged and skipped) and never reach a caller.

use thiserror::Error;

/// Errors reported by catalog lookups, persistence and import.
#[derive(Debug, Error)]
pub enum FormError {
    /// The requested equipment variant has no template.
    #[error("template not found for variant: {variant}")]
    SchemaNotFound { variant: String },

    /// A template lookup was attempted before any document was loaded.
    #[error("templates not loaded")]
    TemplatesNotLoaded,

    /// The template document could not be parsed.
    #[error("invalid template document: {0}")]
    InvalidTemplate(#[source] serde_json::Error),

    /// The local store refused a write because it would exceed its quota.
    #[error("storage capacity exceeded writing {key}: {required} bytes needed, {capacity} available")]
    StorageCapacityExceeded {
        key: String,
        required: usize,
        capacity: usize,
    },

    /// An import payload was not a JSON object of field values.
    #[error("import failed: {0}")]
    ImportParse(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FormError {
    /// Whether this error should be surfaced to the user as a storage warning.
    pub fn is_capacity(&self) -> bool {
        matches!(self, FormError::StorageCapacityExceeded { .. })
    }
}

pub type Result<T> = std::result::Result<T, FormError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FormError::SchemaNotFound {
            variant: "B737".to_string(),
        };
        assert_eq!(err.to_string(), "template not found for variant: B737");

        let err = FormError::StorageCapacityExceeded {
            key: "k".to_string(),
            required: 10,
            capacity: 4,
        };
        assert!(err.is_capacity());
        assert!(err.to_string().contains("10 bytes needed"));
    }
}
