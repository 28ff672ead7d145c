//! Directory fault taxonomy and user-facing messages

use serde::Serialize;

/// Coarse class of a directory or identity failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    ConnectionNotReady,
    Unknown,
}

/// Directory service errors
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Directory fault (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("{0}")]
    Fault(String),

    #[error("Directory connection not ready")]
    NotReady,

    #[error("Outbound request throttled")]
    Throttled,
}

impl DirectoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { status: 401 | 403, .. } => ErrorKind::Unauthorized,
            Self::Api { status: 404, .. } => ErrorKind::NotFound,
            Self::Api { body, .. } => classify(body),
            Self::Request(e) if e.is_connect() || e.is_timeout() => ErrorKind::ConnectionNotReady,
            Self::Request(_) | Self::Parse(_) | Self::Throttled => ErrorKind::Unknown,
            Self::Fault(text) => classify(text),
            Self::NotReady => ErrorKind::ConnectionNotReady,
        }
    }

    /// Sentence suitable for a toast
    pub fn user_message(&self) -> &'static str {
        user_message(self.kind(), &self.to_string())
    }
}

/// Identity provider errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Login rejected: {0}")]
    Rejected(String),
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::ConnectionNotReady,
            Self::Rejected(_) => ErrorKind::Unauthorized,
        }
    }

    pub fn user_message(&self) -> &'static str {
        user_message(self.kind(), &self.to_string())
    }
}

/// Classify raw fault text by the markers the directory puts in it
pub fn classify(fault: &str) -> ErrorKind {
    let lower = fault.to_ascii_lowercase();
    if fault.contains("Unauthorized") || lower.contains("anonymous") {
        ErrorKind::Unauthorized
    } else if lower.contains("not found") {
        ErrorKind::NotFound
    } else if lower.contains("not available") || lower.contains("not ready") || lower.contains("connection") {
        ErrorKind::ConnectionNotReady
    } else {
        ErrorKind::Unknown
    }
}

pub fn user_message(kind: ErrorKind, fault: &str) -> &'static str {
    match kind {
        ErrorKind::Unauthorized if fault.contains("authenticated users") => {
            "You must be signed in to perform this action"
        }
        ErrorKind::Unauthorized if fault.to_ascii_lowercase().contains("anonymous") => {
            "Please sign in to continue"
        }
        ErrorKind::Unauthorized => "You do not have permission to perform this action",
        ErrorKind::NotFound => "The requested resource was not found",
        ErrorKind::ConnectionNotReady => "Still connecting to the game service, please try again",
        ErrorKind::Unknown => "An unexpected error occurred",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_classify_by_marker() {
        assert_eq!(classify("Unauthorized: only the lobby owner can start the game"), ErrorKind::Unauthorized);
        assert_eq!(classify("anonymous caller"), ErrorKind::Unauthorized);
        assert_eq!(classify("Lobby not found"), ErrorKind::NotFound);
        assert_eq!(classify("Actor not available yet"), ErrorKind::ConnectionNotReady);
        assert_eq!(classify("boom"), ErrorKind::Unknown);
    }

    #[test]
    fn messages_follow_fault_detail() {
        let signed_out = DirectoryError::Fault("Unauthorized: only authenticated users can join lobbies".into());
        assert_eq!(signed_out.user_message(), "You must be signed in to perform this action");

        let guest = DirectoryError::Fault("Unauthorized: only the lobby owner can select the map".into());
        assert_eq!(guest.user_message(), "You do not have permission to perform this action");

        let anonymous = DirectoryError::Fault("Unauthorized: anonymous caller".into());
        assert_eq!(anonymous.user_message(), "Please sign in to continue");

        assert_eq!(DirectoryError::Throttled.kind(), ErrorKind::Unknown);
        assert_eq!(DirectoryError::NotReady.kind(), ErrorKind::ConnectionNotReady);
    }

    #[test]
    fn http_status_takes_precedence() {
        let err = DirectoryError::Api {
            status: 403,
            body: "boom".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = DirectoryError::Api {
            status: 500,
            body: "Game not found".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
