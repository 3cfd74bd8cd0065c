use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Feed parsing error: {0}")]
    FeedError(#[from] quick_xml::Error),

    #[error("Invalid date '{value}': {source}")]
    DateError {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Unexpected empty page at offset {offset}")]
    UnexpectedEmptyPage { offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Storage,
    Data,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MonitorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MonitorError::ApiError(_) | MonitorError::HttpStatusError { .. } => {
                ErrorCategory::Network
            }
            MonitorError::IoError(_) => ErrorCategory::Storage,
            MonitorError::SerializationError(_)
            | MonitorError::FeedError(_)
            | MonitorError::DateError { .. }
            | MonitorError::ProcessingError { .. }
            | MonitorError::UnexpectedEmptyPage { .. } => ErrorCategory::Data,
            MonitorError::ConfigValidationError { .. }
            | MonitorError::InvalidConfigValueError { .. }
            | MonitorError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// Transient failures worth another attempt: network errors, HTTP 429
    /// and 5xx, and a page that came back empty. Used by the arXiv and PDF
    /// clients; other 4xx responses fail at once.
    pub fn is_retryable(&self) -> bool {
        match self {
            MonitorError::ApiError(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            MonitorError::HttpStatusError { status, .. } => *status == 429 || *status >= 500,
            MonitorError::UnexpectedEmptyPage { .. } => true,
            _ => false,
        }
    }

    /// HTTP 429 only. Semantic Scholar lookups retry nothing else.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, MonitorError::HttpStatusError { status: 429, .. })
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            MonitorError::ApiError(_) | MonitorError::HttpStatusError { .. } => {
                "Check network connectivity and the arXiv API status, then rerun".to_string()
            }
            MonitorError::IoError(_) => {
                "Check that the output directories exist and are writable".to_string()
            }
            MonitorError::SerializationError(_) => {
                "The paper index may be corrupt; restore it from version control".to_string()
            }
            MonitorError::FeedError(_) => {
                "The arXiv feed was malformed; retry the run later".to_string()
            }
            MonitorError::DateError { .. } => {
                "Write the last run date as YYYY-MM-DD, e.g. 2024-01-31".to_string()
            }
            MonitorError::ConfigValidationError { field, .. }
            | MonitorError::InvalidConfigValueError { field, .. }
            | MonitorError::MissingConfigError { field } => {
                format!("Fix the '{}' setting in the configuration file", field)
            }
            MonitorError::ProcessingError { .. } => {
                "Rerun with --verbose to see which paper failed".to_string()
            }
            MonitorError::UnexpectedEmptyPage { .. } => {
                "arXiv returned fewer results than announced; rerun later to pick up the rest"
                    .to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach a remote service: {}", self),
            ErrorCategory::Storage => format!("Could not read or write a file: {}", self),
            ErrorCategory::Data => format!("Could not process paper data: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
