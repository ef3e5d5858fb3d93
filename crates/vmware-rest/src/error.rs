//! Error types for the vSphere REST reconciliation crate.

use std::fmt;

/// Categorised error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmwareErrorKind {
    /// Required connection parameter missing or empty
    ConfigurationError,
    /// vSphere REST API unreachable
    ConnectionError,
    /// Authentication failed (401)
    AuthenticationError,
    /// Server-side failure while creating a resource
    ServerError(u16),
    /// HTTP / API error with status code
    ApiError(u16),
    /// End-to-end session timeout elapsed
    Timeout,
    /// JSON parse / deserialization error
    ParseError,
    /// URL template could not be rendered
    UrlError,
    /// Uniqueness lookup matched more than one object
    AmbiguousMatch,
    /// Resource does not declare the requested operation
    UnsupportedOperation,
    /// Generic
    Other,
}

/// Crate error type carrying a kind + human-readable message.
///
/// HTTP failures also keep the raw response text so the host can surface it
/// verbatim.
#[derive(Debug, Clone)]
pub struct VmwareError {
    pub kind: VmwareErrorKind,
    pub message: String,
    pub body: Option<String>,
}

impl VmwareError {
    pub fn new(kind: VmwareErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            body: None,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::ConfigurationError, msg)
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::ConnectionError, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::AuthenticationError, msg)
    }

    pub fn api(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            kind: VmwareErrorKind::ApiError(status),
            message: format!("Request has failed: status={status}, {body}"),
            body: Some(body),
        }
    }

    pub fn server(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            kind: VmwareErrorKind::ServerError(status),
            message: format!("Request has failed: status={status}, {body}"),
            body: Some(body),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::ParseError, msg)
    }

    pub fn url(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::UrlError, msg)
    }

    pub fn ambiguous(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::AmbiguousMatch, msg)
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::UnsupportedOperation, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::Timeout, msg)
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            VmwareErrorKind::ServerError(s) | VmwareErrorKind::ApiError(s) => Some(s),
            VmwareErrorKind::AuthenticationError => Some(401),
            _ => None,
        }
    }
}

impl fmt::Display for VmwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for VmwareError {}

impl From<VmwareError> for String {
    fn from(e: VmwareError) -> String {
        e.to_string()
    }
}

impl From<reqwest::Error> for VmwareError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("HTTP timeout: {e}"))
        } else if e.is_connect() {
            Self::connection(format!("Connection failed: {e}"))
        } else {
            Self::new(VmwareErrorKind::Other, format!("HTTP error: {e}"))
        }
    }
}

impl From<serde_json::Error> for VmwareError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {e}"))
    }
}

impl From<url::ParseError> for VmwareError {
    fn from(e: url::ParseError) -> Self {
        Self::url(format!("Invalid URL: {e}"))
    }
}

/// Convenience alias.
pub type VmwareResult<T> = Result<T, VmwareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_carries_status_and_body() {
        let err = VmwareError::api(404, "{\"error_type\":\"NOT_FOUND\"}");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.body.as_deref(), Some("{\"error_type\":\"NOT_FOUND\"}"));
        assert!(err.to_string().contains("status=404"));
    }

    #[test]
    fn server_error_kind() {
        let err = VmwareError::server(500, "boom");
        assert_eq!(err.kind, VmwareErrorKind::ServerError(500));
        assert_eq!(String::from(err), "[ServerError(500)] Request has failed: status=500, boom");
    }

    #[test]
    fn configuration_error_has_no_status() {
        let err = VmwareError::configuration("hostname cannot be empty");
        assert_eq!(err.status(), None);
        assert!(err.body.is_none());
    }
}
