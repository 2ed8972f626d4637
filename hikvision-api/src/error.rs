use isapi_client::TransportError;
use thiserror::Error;

/// High-level API errors for device operations
///
/// Distinguishes failures the caller reacts to differently: a device that
/// cannot be reached, a device that answered with an error status, and a
/// document that does not look the way we expected.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required construction input was not supplied
    ///
    /// Raised before any network traffic; no client is produced.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// A construction input was supplied but is out of range or malformed
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Transport-level failure: DNS, refused connection, timeout, TLS
    ///
    /// Fatal during construction. After construction the caller may retry.
    #[error("Device unreachable: {0}")]
    DeviceUnreachable(String),

    /// The device answered with a status other than 200
    #[error("Request failed with HTTP status {status}")]
    RequestFailed {
        status: u16,
        /// Start of the response body, when the device sent one
        body: Option<String>,
    },

    /// The device's authentication challenge could not be answered
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No element matched the field path
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// More than one element matched the field path
    #[error("Field '{field}' is not unique ({count} matches)")]
    FieldNotUnique { field: String, count: usize },

    /// The response body, or a field value in it, could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ApiError {
    /// Whether the error came from the network rather than from the device's answer
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::DeviceUnreachable(_))
    }

    /// HTTP status carried by a `RequestFailed` error
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<TransportError> for ApiError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Connection(msg) => ApiError::DeviceUnreachable(msg),
            TransportError::Body(msg) => ApiError::DeviceUnreachable(msg),
            TransportError::InvalidUrl(msg) => ApiError::InvalidParameter(msg),
            TransportError::Status { code, body } => ApiError::RequestFailed { status: code, body },
            TransportError::Auth(msg) => ApiError::AuthenticationFailed(msg),
        }
    }
}
