use crate::api::ApiError;

/// Failure classes of workspace operations.
///
/// Network-facing operations never return these to callers; they are turned
/// into a single banner string in [`WorkspaceState::error`](super::WorkspaceState).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    /// No usable session; the dashboard renders as logged out.
    #[error("Not logged in")]
    AuthMissing,
    /// Rejected before any I/O.
    #[error("{0}")]
    Validation(String),
    #[error("Error: {status}")]
    Http { status: u16, detail: Option<String> },
    /// No response: connection, timeout or undecodable body.
    #[error("{0}")]
    Network(String),
    /// A non-admin asked for the all-files scope. Never shown as a banner.
    #[error("the all-files scope requires an admin session")]
    ScopeViolation,
    /// The controller was closed while the operation was in flight.
    #[error("workspace closed")]
    Closed,
}

impl From<ApiError> for WorkspaceError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http { status, detail } => Self::Http { status, detail },
            other => Self::Network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn api_errors_collapse_into_http_or_network() {
        let http: WorkspaceError = ApiError::Http {
            status: 404,
            detail: Some("File not found".into()),
        }
        .into();
        assert_eq!(http.to_string(), "Error: 404");

        let timeout: WorkspaceError = ApiError::Timeout(Duration::from_secs(3)).into();
        assert!(matches!(timeout, WorkspaceError::Network(_)));
    }
}
