use super::transport::TransportError;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The request never reached the server.
    Network,
    /// 401 from the server.
    Unauthorized { status: u16 },
    /// Any other non-2xx status.
    Http { status: u16 },
    /// 2xx with a body we could not understand.
    Parse,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn network(base_url: &str, cause: &TransportError) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: format!(
                "Failed to reach backend API at {base_url} ({cause}). This is usually a network, \
                 CORS, or HTTP/HTTPS protocol mismatch error. Check that the API base URL uses the \
                 correct protocol (https:// for hosted deployments, http:// for local), host, and \
                 port, and that the backend is running and reachable from the browser."
            ),
        }
    }

    /// Non-success status. The raw body is the message when there is one.
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        let message = if body.trim().is_empty() {
            format!("API error ({status})")
        } else {
            body
        };

        let kind = if status == 401 {
            ApiErrorKind::Unauthorized { status }
        } else {
            ApiErrorKind::Http { status }
        };

        Self { kind, message }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: format!("Invalid response from server: {e}"),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ApiErrorKind::Unauthorized { status } | ApiErrorKind::Http { status } => Some(status),
            ApiErrorKind::Network | ApiErrorKind::Parse => None,
        }
    }

    pub fn is_network(&self) -> bool {
        self.kind == ApiErrorKind::Network
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Unauthorized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_uses_body_verbatim() {
        let e = ApiError::from_status(400, "Title is required".to_string());
        assert_eq!(e.kind, ApiErrorKind::Http { status: 400 });
        assert_eq!(e.to_string(), "Title is required");
        assert_eq!(e.status(), Some(400));
    }

    #[test]
    fn test_status_error_falls_back_to_generic_message() {
        let e = ApiError::from_status(500, "  ".to_string());
        assert_eq!(e.message, "API error (500)");
    }

    #[test]
    fn test_401_is_classified_unauthorized() {
        let e = ApiError::from_status(401, "Invalid token".to_string());
        assert!(e.is_unauthorized());
        assert!(!e.is_network());
        assert_eq!(e.message, "Invalid token");
    }

    #[test]
    fn test_network_error_carries_guidance() {
        let e = ApiError::network(
            "https://notes.example.com",
            &TransportError("connection refused".to_string()),
        );
        assert!(e.is_network());
        assert_eq!(e.status(), None);
        assert!(e.message.contains("https://notes.example.com"));
        assert!(e.message.contains("CORS"));
        assert!(e.message.contains("port"));
    }
}
