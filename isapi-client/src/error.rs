//! Error types for the ISAPI transport

use thiserror::Error;

/// Longest response body kept on a [`TransportError::Status`] for diagnostics
pub const BODY_SNIPPET_LEN: usize = 512;

/// Errors that can occur while talking HTTP to a device
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device could not be reached (DNS, refused connection, timeout, TLS...)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The request URL could not be built or parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The device answered with a status other than 200
    #[error("HTTP status {code}")]
    Status {
        code: u16,
        body: Option<String>,
    },

    /// The device sent an authentication challenge we cannot answer
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The response body could not be read
    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl TransportError {
    /// Build a status error, keeping at most [`BODY_SNIPPET_LEN`] characters of the body
    pub fn status(code: u16, body: Option<String>) -> Self {
        let body = body
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .map(|b| match b.char_indices().nth(BODY_SNIPPET_LEN) {
                Some((idx, _)) => format!("{}...", &b[..idx]),
                None => b,
            });
        TransportError::Status { code, body }
    }

    /// Whether this error means the device never produced an HTTP response
    pub fn is_connection(&self) -> bool {
        matches!(self, TransportError::Connection(_) | TransportError::Body(_))
    }
}

impl From<ureq::Transport> for TransportError {
    fn from(transport: ureq::Transport) -> Self {
        match transport.kind() {
            ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
                TransportError::InvalidUrl(transport.to_string())
            }
            _ => TransportError::Connection(transport.to_string()),
        }
    }
}
