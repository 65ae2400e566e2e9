use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Input file not found: {}", path.display())]
    MissingFileError { path: PathBuf },

    #[error("Schema error in {source_name}: required column '{column}' is missing")]
    SchemaError { source_name: String, column: String },

    #[error("Date parse error in {source_name} at line {line}: column '{column}' has unrecognised date '{value}'")]
    DateParseError {
        source_name: String,
        line: u64,
        column: String,
        value: String,
    },

    #[error("Invalid record in {source_name} at line {line}: {message}")]
    InvalidRecordError {
        source_name: String,
        line: u64,
        message: String,
    },

    #[error("Skill '{name}' has no category and no default category is configured")]
    UnknownCategoryError { name: String },

    #[error("Rendering failed for {}: {message}", path.display())]
    RenderBackendError { path: PathBuf, message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Data,
    Configuration,
    Rendering,
    System,
}

impl TimelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TimelineError::MissingFileError { .. } | TimelineError::SchemaError { .. } => {
                ErrorCategory::Input
            }
            TimelineError::DateParseError { .. }
            | TimelineError::InvalidRecordError { .. }
            | TimelineError::UnknownCategoryError { .. }
            | TimelineError::CsvError(_) => ErrorCategory::Data,
            TimelineError::RenderBackendError { .. } => ErrorCategory::Rendering,
            TimelineError::ConfigError { .. }
            | TimelineError::ConfigValidationError { .. }
            | TimelineError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            TimelineError::IoError(_) | TimelineError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    /// Process exit status for this failure. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Data => 1,
            ErrorCategory::Configuration => 2,
            ErrorCategory::Rendering => 3,
            ErrorCategory::System => 4,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            TimelineError::MissingFileError { path } => format!(
                "Check that '{}' exists or pass another CSV with --input",
                path.display()
            ),
            TimelineError::SchemaError { .. } => {
                "The CSV header must contain the columns: name, start, end (category is optional)"
                    .to_string()
            }
            TimelineError::DateParseError { .. } => {
                "Use calendar dates such as 2015-01-01, 2015-01 or 2015; leave 'end' empty for ongoing skills"
                    .to_string()
            }
            TimelineError::InvalidRecordError { .. } => {
                "Every row needs a non-empty name and an end date that is not before its start"
                    .to_string()
            }
            TimelineError::UnknownCategoryError { .. } => {
                "Add a 'category' column value, a matching keyword rule, or set input.default_category"
                    .to_string()
            }
            TimelineError::RenderBackendError { .. } => {
                "Check that the output directory is writable and the chart dimensions are valid"
                    .to_string()
            }
            TimelineError::CsvError(_) => "Check that the input is well-formed CSV".to_string(),
            TimelineError::IoError(_) => "Check file permissions and free disk space".to_string(),
            TimelineError::SerializationError(_) => {
                "Report this as a bug together with the input file".to_string()
            }
            TimelineError::ConfigError { .. }
            | TimelineError::ConfigValidationError { .. }
            | TimelineError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command line flags".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Cannot read skills data: {}", self),
            ErrorCategory::Data => format!("Skills data is invalid: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Rendering => format!("Could not render the timeline: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, TimelineError>;
