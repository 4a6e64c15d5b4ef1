use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("No authenticated session")]
    Unauthenticated,

    #[error("Slot already taken for doctor {doctor_id} at {starts_at}")]
    SlotConflict {
        doctor_id: String,
        starts_at: DateTime<Utc>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Directory store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Directory store rejected the request (HTTP {status}): {message}")]
    StoreRejected { status: u16, message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Authentication,
    Conflict,
    Store,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BookingError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        BookingError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        BookingError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        BookingError::StoreUnavailable {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BookingError::InvalidInput { .. } | BookingError::NotFound { .. } => {
                ErrorCategory::Input
            }
            BookingError::Unauthenticated => ErrorCategory::Authentication,
            BookingError::SlotConflict { .. } => ErrorCategory::Conflict,
            BookingError::StoreUnavailable { .. }
            | BookingError::StoreRejected { .. }
            | BookingError::ApiError(_) => ErrorCategory::Store,
            BookingError::ConfigError { .. }
            | BookingError::ConfigValidationError { .. }
            | BookingError::InvalidConfigValueError { .. }
            | BookingError::MissingConfigError { .. } => ErrorCategory::Configuration,
            BookingError::IoError(_) | BookingError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Conflict => ErrorSeverity::Low,
            ErrorCategory::Input | ErrorCategory::Authentication => ErrorSeverity::Medium,
            ErrorCategory::Store | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// True when the store could not be reached or failed on its side.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            BookingError::StoreUnavailable { .. } | BookingError::ApiError(_)
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BookingError::InvalidInput { field, reason } => {
                format!("The request is not valid ({}): {}", field, reason)
            }
            BookingError::Unauthenticated => {
                "You need to sign in before booking or managing appointments".to_string()
            }
            BookingError::SlotConflict { starts_at, .. } => format!(
                "The slot at {} is already taken, please pick another one",
                starts_at.format("%Y-%m-%d %H:%M UTC")
            ),
            BookingError::NotFound { entity, id } => format!("No {} found with id {}", entity, id),
            BookingError::StoreUnavailable { .. } | BookingError::ApiError(_) => {
                "The booking service is not reachable right now".to_string()
            }
            BookingError::StoreRejected { status, .. } => {
                format!("The booking service refused the request (HTTP {})", status)
            }
            BookingError::ConfigError { .. }
            | BookingError::ConfigValidationError { .. }
            | BookingError::InvalidConfigValueError { .. }
            | BookingError::MissingConfigError { .. } => format!("Configuration problem: {}", self),
            BookingError::IoError(_) | BookingError::SerializationError(_) => {
                format!("Unexpected local failure: {}", self)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the doctor id, date, time and duration and try again",
            ErrorCategory::Authentication => {
                "Sign in and pass the access token with --access-token or CLINIC_ACCESS_TOKEN"
            }
            ErrorCategory::Conflict => "List open slots with the `slots` command and choose a free one",
            ErrorCategory::Store => "Check the backend URL, API key and network connectivity",
            ErrorCategory::Configuration => "Fix the configuration file and run the command again",
            ErrorCategory::System => "Check file permissions and the data file contents",
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
