use reqwest::StatusCode;

/// Stable error codes carried by every [`CtError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    AuthenticationError,
    RequestError,
    VerificationFailed,
    ConfigError,
    RequestFailed,
    S3ClientError,
    CliError,
    Timeout,
    Cancelled,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthenticationError => "CSM_REST_AUTHENTICATION_ERROR",
            ErrorCode::RequestError => "CSM_REST_REQUEST_ERROR",
            ErrorCode::VerificationFailed => "CSM_REST_VERIFICATION_FAILED",
            ErrorCode::ConfigError => "CT_CONFIG_ERROR",
            ErrorCode::RequestFailed => "CSM_REST_GET_REQUEST_FAILED",
            ErrorCode::S3ClientError => "S3_CLIENT_ERROR",
            ErrorCode::CliError => "CLI_ERROR",
            ErrorCode::Timeout => "CT_TIMEOUT",
            ErrorCode::Cancelled => "CT_CANCELLED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CtError {
    #[error("login failed with status {status}: {message}")]
    Authentication { status: u16, message: String },
    #[error("failed to build request: {0}")]
    RequestConstruction(String),
    #[error("verification failed: {0}")]
    Verification(String),
    #[error("config key '{0}' is not defined")]
    MissingConfig(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("S3 request failed with status {status}: {code}")]
    S3 { status: u16, code: String },
    #[error("failed to run '{program}': {message}")]
    Tool { program: String, message: String },
    #[error("gave up after {0:?}")]
    Timeout(std::time::Duration),
    #[error("concurrent actor did not finish: {0}")]
    Cancelled(String),
}

impl CtError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CtError::Authentication { .. } => ErrorCode::AuthenticationError,
            CtError::RequestConstruction(_) => ErrorCode::RequestError,
            CtError::Verification(_) => ErrorCode::VerificationFailed,
            CtError::MissingConfig(_) | CtError::Config(_) => ErrorCode::ConfigError,
            CtError::Http(_) => ErrorCode::RequestFailed,
            CtError::S3 { .. } => ErrorCode::S3ClientError,
            CtError::Tool { .. } => ErrorCode::CliError,
            CtError::Timeout(_) => ErrorCode::Timeout,
            CtError::Cancelled(_) => ErrorCode::Cancelled,
        }
    }

    /// HTTP status attached to the failure, if the server produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CtError::Authentication { status, .. } | CtError::S3 { status, .. } => {
                StatusCode::from_u16(*status).ok()
            }
            CtError::Http(e) => e.status(),
            _ => None,
        }
    }

    pub(crate) fn construction(err: impl std::fmt::Display) -> Self {
        let message = err.to_string();
        tracing::error!(error = %message, "Request construction failed");
        CtError::RequestConstruction(message)
    }
}

pub type Result<T, E = CtError> = std::result::Result<T, E>;
