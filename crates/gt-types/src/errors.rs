use thiserror::Error;

/// Main error type for GroveTune
#[derive(Error, Debug)]
pub enum GtError {
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Evaluation failed: {message}")]
    EvaluationFailure { message: String },

    #[error("Candidate generator produced no configurations")]
    EmptyCandidateSet,

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GtError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::EvaluationFailure {
            message: message.into(),
        }
    }
}

/// Data-related errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    #[error("Invalid data format: {message}")]
    InvalidFormat { message: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Data parsing error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },
}

/// Result type alias for GroveTune operations
pub type GtResult<T> = Result<T, GtError>;

/// Macro for creating invalid-configuration errors
#[macro_export]
macro_rules! invalid_config {
    ($($arg:tt)*) => {
        $crate::GtError::InvalidConfiguration { message: format!($($arg)*) }
    };
}

/// Macro for creating evaluation errors
#[macro_export]
macro_rules! evaluation_error {
    ($($arg:tt)*) => {
        $crate::GtError::EvaluationFailure { message: format!($($arg)*) }
    };
}

/// Macro for creating configuration-file errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::GtError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DataError::ParseError {
            line: 12,
            message: "column 'V3' is not numeric".to_string(),
        };

        assert!(error.to_string().contains("line 12"));
        assert!(error.to_string().contains("V3"));
    }

    #[test]
    fn test_error_conversion() {
        let data_error = DataError::SourceNotFound("sonar.csv".to_string());
        let gt_error: GtError = data_error.into();

        match gt_error {
            GtError::Data(_) => (),
            _ => panic!("Expected Data error"),
        }
    }

    #[test]
    fn test_macros() {
        let err = invalid_config!("mtry must be in 1..={}, got {}", 60, 0);
        assert!(matches!(err, GtError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("1..=60"));

        let err = evaluation_error!("fold {} is empty", 3);
        assert!(matches!(err, GtError::EvaluationFailure { .. }));

        let err = config_error!("missing field: {}", "plan");
        assert!(matches!(err, GtError::Config(_)));
    }

    #[test]
    fn empty_candidate_set_message() {
        assert_eq!(
            GtError::EmptyCandidateSet.to_string(),
            "Candidate generator produced no configurations"
        );
    }
}
