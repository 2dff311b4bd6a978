use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Connection failed: {message}")]
    ConnectionError { message: String },

    #[error("Request timed out after {0:?}")]
    TimeoutError(Duration),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid {field}: {reason}")]
    FormValidationError { field: String, reason: String },

    #[error("Request could not be built: {message}")]
    RequestBuildError { message: String },

    #[error("Unexpected status {status} from {endpoint}")]
    UnexpectedStatusError { status: u16, endpoint: String },

    #[error("A submission is already in flight")]
    AlreadyInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Input,
    Data,
    State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SubmitError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SubmitError::HttpError(_)
            | SubmitError::ConnectionError { .. }
            | SubmitError::TimeoutError(_)
            | SubmitError::UnexpectedStatusError { .. } => ErrorCategory::Network,
            SubmitError::ConfigError { .. }
            | SubmitError::ConfigValidationError { .. }
            | SubmitError::MissingConfigError { .. }
            | SubmitError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            SubmitError::FormValidationError { .. } | SubmitError::RequestBuildError { .. } => {
                ErrorCategory::Input
            }
            SubmitError::IoError(_) | SubmitError::SerializationError(_) => ErrorCategory::Data,
            SubmitError::AlreadyInFlight => ErrorCategory::State,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::State => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// The request was rejected locally, so nothing reached the server.
    pub fn is_unsent(&self) -> bool {
        matches!(self, SubmitError::RequestBuildError { .. })
    }

    /// Whether retrying the same action later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Network | ErrorCategory::State)
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SubmitError::HttpError(_) | SubmitError::ConnectionError { .. } => {
                "Network error. Please check your connection.".to_string()
            }
            SubmitError::TimeoutError(_) => {
                "The server took too long to respond. Please try again.".to_string()
            }
            SubmitError::UnexpectedStatusError { status, .. } => {
                format!("The server returned an unexpected response (Error {}).", status)
            }
            SubmitError::FormValidationError { field, reason } => {
                format!("Please correct the {} field: {}", field, reason)
            }
            SubmitError::RequestBuildError { message } => {
                format!("The submission could not be prepared: {}", message)
            }
            SubmitError::AlreadyInFlight => {
                "Your submission is still being processed.".to_string()
            }
            SubmitError::IoError(e) => format!("Could not read a file: {}", e),
            other => format!("Configuration problem: {}", other),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check your network connection and try again later",
            ErrorCategory::Configuration => {
                "Check the configuration file and command line flags"
            }
            ErrorCategory::Input => "Fix the highlighted field and submit again",
            ErrorCategory::Data => "Make sure the attachment files exist and are readable",
            ErrorCategory::State => "Wait for the current submission to finish",
        }
    }
}

pub type Result<T> = std::result::Result<T, SubmitError>;
