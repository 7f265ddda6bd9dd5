use thiserror::Error;

/// Reasons an element set cannot be decoded into an orbital state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementSetError {
    #[error("line {line} too short: expected at least 69 columns, got {got}")]
    LineTooShort { line: u8, got: usize },

    #[error("line {line} must start with '{line}'")]
    WrongLineNumber { line: u8 },

    #[error("line {line} contains non-ASCII characters")]
    NonAscii { line: u8 },

    #[error("catalog number mismatch between lines: {line1} vs {line2}")]
    CatalogMismatch { line1: u32, line2: u32 },

    #[error("checksum mismatch on line {line}: expected {expected}, found {found}")]
    Checksum { line: u8, expected: u8, found: u8 },

    #[error("unparsable field {field}: {value:?}")]
    Field { field: &'static str, value: String },

    #[error("non-physical {field}: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Errors surfaced by the anomaly-detection core
#[derive(Debug, Error)]
pub enum AnomalyError {
    #[error("invalid element set{}: {reason}", catalog_suffix(.catalog_number))]
    InvalidElementSet {
        catalog_number: Option<u32>,
        reason: ElementSetError,
    },

    #[error("no valid feature vectors in training batch of {submitted} records")]
    EmptyTrainingSet { submitted: usize },

    #[error("models not trained")]
    ModelsNotTrained,

    #[error("shadow training failed: {0}")]
    TrainingFailed(String),
}

fn catalog_suffix(catalog_number: &Option<u32>) -> String {
    match catalog_number {
        Some(n) => format!(" for object {}", n),
        None => String::new(),
    }
}

impl AnomalyError {
    pub(crate) fn invalid(catalog_number: Option<u32>, reason: ElementSetError) -> Self {
        AnomalyError::InvalidElementSet {
            catalog_number,
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnomalyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnomalyError::invalid(
            Some(26824),
            ElementSetError::Checksum {
                line: 2,
                expected: 5,
                found: 4,
            },
        );
        assert_eq!(
            err.to_string(),
            "invalid element set for object 26824: checksum mismatch on line 2: expected 5, found 4"
        );

        let err = AnomalyError::EmptyTrainingSet { submitted: 3 };
        assert!(err.to_string().contains("3 records"));
    }
}
