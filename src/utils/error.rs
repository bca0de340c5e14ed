use thiserror::Error;

/// Process-level failures. Anything that goes wrong with a single startup
/// record is a [`crate::domain::model::RecordError`] instead and never ends up here.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Input collection unreadable: {message}")]
    InputError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Output,
    Network,
    Serialization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnalysisError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalysisError::ConfigError { .. }
            | AnalysisError::InvalidConfigValueError { .. }
            | AnalysisError::MissingConfigError { .. }
            | AnalysisError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            AnalysisError::InputError { .. } | AnalysisError::CsvError(_) => ErrorCategory::Input,
            AnalysisError::ZipError(_)
            | AnalysisError::IoError(_)
            | AnalysisError::StorageError { .. } => ErrorCategory::Output,
            AnalysisError::HttpError(_) => ErrorCategory::Network,
            AnalysisError::SerializationError(_) => ErrorCategory::Serialization,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Serialization => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Output => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AnalysisError::MissingConfigError { .. } => {
                "Provide the missing value in the TOML file, on the command line or in the env"
            }
            AnalysisError::InvalidConfigValueError { .. }
            | AnalysisError::ConfigValidationError { .. }
            | AnalysisError::ConfigError { .. } => "Check the configuration values and try again",
            AnalysisError::InputError { .. } | AnalysisError::CsvError(_) => {
                "Make sure the input exists and is a CSV with a header row or a JSON array"
            }
            AnalysisError::HttpError(_) => {
                "Check network connectivity and the narrative endpoint, then retry"
            }
            AnalysisError::IoError(_) | AnalysisError::StorageError { .. } => {
                "Check that the output location exists and is writable"
            }
            AnalysisError::ZipError(_) => "Retry without --compress",
            AnalysisError::SerializationError(_) => {
                "Inspect the input for values that cannot be serialized"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Could not read the startup data: {}", self),
            ErrorCategory::Output => format!("Could not write the report: {}", self),
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Serialization => format!("Could not encode the report: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
