use crate::core::commander::CommanderError;
use crate::core::dispatcher::DriverError;
use crate::core::tables::TableError;
use crate::normalizer::NormalizeError;
use crate::parsers::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error(transparent)]
    CommanderError(#[from] CommanderError),

    #[error(transparent)]
    DriverError(#[from] DriverError),

    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error(transparent)]
    NormalizeError(#[from] NormalizeError),

    #[error("Table error: {0}")]
    TableError(#[from] TableError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

/// 錯誤分類，用於日誌與監控
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Connection,
    Parsing,
    Normalization,
    System,
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CollectorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CollectorError::CommanderError(_)
            | CollectorError::ConfigError { .. }
            | CollectorError::MissingConfigError { .. }
            | CollectorError::InvalidConfigValueError { .. }
            | CollectorError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            CollectorError::DriverError(_) => ErrorCategory::Connection,
            CollectorError::ParseError(_) | CollectorError::TableError(_) => ErrorCategory::Parsing,
            CollectorError::NormalizeError(_) | CollectorError::ProcessingError { .. } => {
                ErrorCategory::Normalization
            }
            CollectorError::IoError(_) | CollectorError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Connection => ErrorSeverity::Medium,
            ErrorCategory::Configuration
            | ErrorCategory::Parsing
            | ErrorCategory::Normalization => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Connection => format!("Could not collect from device: {}", self),
            ErrorCategory::Parsing => format!("Device output could not be parsed: {}", self),
            ErrorCategory::Normalization => format!("Collected data could not be modeled: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the device type, collector names and COLLECTOR_* environment variables"
            }
            ErrorCategory::Connection => {
                "Verify reachability, credentials and that ssh/sshpass are installed; the next round may succeed"
            }
            ErrorCategory::Parsing => {
                "Run the command manually on the device and compare with the supported output format"
            }
            ErrorCategory::Normalization => {
                "The collector does not support this device type or output shape yet"
            }
            ErrorCategory::System => "Check file permissions and free disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;
