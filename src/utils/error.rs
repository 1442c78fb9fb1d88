use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API responded with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Registration failed: {message}")]
    RegistrationFailed { message: String },

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Upload failed: {message}")]
    UploadFailed { message: String },

    #[error("No dataset selected")]
    NoDatasetSelected,

    #[error("No raw data loaded")]
    NoDataLoaded,

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Chart rendering error: {message}")]
    RenderError { message: String },

    #[error("PDF export error: {message}")]
    PdfError { message: String },
}

pub type Result<T> = std::result::Result<T, DashError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Configuration,
    Input,
    Rendering,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DashError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        DashError::ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DashError::HttpError(_) => ErrorCategory::Network,
            DashError::ApiError { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Authentication
            }
            DashError::ApiError { .. } => ErrorCategory::Network,
            DashError::InvalidCredentials
            | DashError::RegistrationFailed { .. }
            | DashError::NotAuthenticated => ErrorCategory::Authentication,
            DashError::ConfigError { .. }
            | DashError::MissingConfigError { .. }
            | DashError::InvalidConfigValueError { .. }
            | DashError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            DashError::CsvError(_)
            | DashError::UploadFailed { .. }
            | DashError::NoDatasetSelected
            | DashError::NoDataLoaded
            | DashError::ValidationError { .. } => ErrorCategory::Input,
            DashError::RenderError { .. } | DashError::PdfError { .. } => {
                ErrorCategory::Rendering
            }
            DashError::IoError(_) | DashError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Medium,
            ErrorCategory::Network | ErrorCategory::Authentication => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Rendering => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Short message shown to the user in place of a blocking alert.
    pub fn user_friendly_message(&self) -> String {
        match self {
            DashError::InvalidCredentials => "Invalid Credentials".to_string(),
            DashError::RegistrationFailed { .. } => "Registration Failed".to_string(),
            DashError::UploadFailed { .. } => "Upload failed".to_string(),
            DashError::NoDatasetSelected => "Select dataset first".to_string(),
            DashError::NoDataLoaded => "No dataset data loaded".to_string(),
            DashError::NotAuthenticated => "Please log in first".to_string(),
            DashError::ApiError { status: 404, .. } => "Not found on server".to_string(),
            DashError::ApiError { status, .. } if *status == 401 || *status == 403 => {
                "Session expired or invalid, please log in again".to_string()
            }
            DashError::HttpError(_) => "Could not reach the server".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the server URL and that the backend is running",
            ErrorCategory::Authentication => "Run `equipment-dash login` and retry",
            ErrorCategory::Configuration => "Fix the configuration file or command-line flags",
            ErrorCategory::Input => "Check the command arguments and input file",
            ErrorCategory::Rendering => "Retry with a smaller dataset or report an issue",
            ErrorCategory::System => "Check file permissions and free disk space",
        }
    }
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for DashError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        DashError::RenderError {
            message: e.to_string(),
        }
    }
}

impl From<printpdf::Error> for DashError {
    fn from(e: printpdf::Error) -> Self {
        DashError::PdfError {
            message: format!("{:?}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_match_alerts() {
        assert_eq!(
            DashError::InvalidCredentials.user_friendly_message(),
            "Invalid Credentials"
        );
        assert_eq!(
            DashError::RegistrationFailed {
                message: "username taken".into()
            }
            .user_friendly_message(),
            "Registration Failed"
        );
        assert_eq!(
            DashError::NoDatasetSelected.user_friendly_message(),
            "Select dataset first"
        );
    }

    #[test]
    fn test_unauthorized_is_authentication() {
        let err = DashError::api(401, "Invalid token.");
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(DashError::api(500, "boom").category(), ErrorCategory::Network);
    }
}
