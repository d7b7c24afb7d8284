//! Custom error types for the analysis engine
//!
//! Every failure crossing a component boundary is one of these typed values.
//! Nothing here is fatal to the process; failures stay scoped to one session.

use serde::Serialize;
use thiserror::Error;

use crate::constants::{limits::MAX_FEEDBACK_CHARS, messages};
use crate::session::SessionId;

/// Input rejected before any network call is made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("target id must not be empty")]
    EmptyTargetId,

    #[error("feedback must not be empty")]
    EmptyFeedback,

    #[error("feedback is {len} characters (max: {max})")]
    FeedbackTooLong { len: usize, max: usize },

    #[error("credential must not be blank")]
    BlankCredential,

    #[error("regenerate requires a feedback descriptor")]
    MissingFeedback,
}

impl ValidationError {
    /// Text for a local form error
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::EmptyFeedback | ValidationError::MissingFeedback => {
                messages::EMPTY_FEEDBACK.to_string()
            }
            ValidationError::FeedbackTooLong { len, .. } => format!(
                "{}（{} / {} 字）",
                messages::FEEDBACK_TOO_LONG,
                len,
                MAX_FEEDBACK_CHARS
            ),
            ValidationError::BlankCredential => messages::MISSING_CREDENTIAL.to_string(),
            ValidationError::EmptyTargetId => self.to_string(),
        }
    }
}

/// Outcome of a failed analysis call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("no credential configured")]
    MissingCredential,

    #[error("analysis service unavailable: {message}")]
    ServiceUnavailable { status: Option<u16>, message: String },

    #[error("request rejected with HTTP {status}: {message}")]
    RequestRejected { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
}

/// Transport-level failures, before any HTTP status is known
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl From<TransportError> for AnalysisError {
    fn from(err: TransportError) -> Self {
        AnalysisError::ServiceUnavailable {
            status: None,
            message: err.to_string(),
        }
    }
}

/// Errors returned by the engine's collaborator-facing operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Cause classification carried by a failed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredential,
    ServiceUnavailable,
    RequestRejected,
    MalformedResponse,
}

/// What the adapter needs to render a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
    pub retryable: bool,
}

impl From<&AnalysisError> for ErrorDetail {
    fn from(err: &AnalysisError) -> Self {
        match err {
            AnalysisError::MissingCredential => ErrorDetail {
                kind: ErrorKind::MissingCredential,
                status: None,
                message: messages::MISSING_CREDENTIAL.to_string(),
                retryable: true,
            },
            AnalysisError::ServiceUnavailable { status, .. } => ErrorDetail {
                kind: ErrorKind::ServiceUnavailable,
                status: *status,
                message: messages::SERVICE_UNAVAILABLE.to_string(),
                retryable: true,
            },
            AnalysisError::RequestRejected { status, message } => ErrorDetail {
                kind: ErrorKind::RequestRejected,
                status: Some(*status),
                message: if message.trim().is_empty() {
                    messages::REQUEST_REJECTED.to_string()
                } else {
                    format!("{}：{}", messages::REQUEST_REJECTED, message)
                },
                retryable: false,
            },
            AnalysisError::MalformedResponse(_) => ErrorDetail {
                kind: ErrorKind::MalformedResponse,
                status: None,
                message: messages::MALFORMED_RESPONSE.to_string(),
                retryable: true,
            },
            // Validation is caught before issuance; reaching here means a
            // backend refused its own descriptor.
            AnalysisError::Validation(v) => ErrorDetail {
                kind: ErrorKind::RequestRejected,
                status: None,
                message: v.user_message(),
                retryable: false,
            },
        }
    }
}

impl From<AnalysisError> for ErrorDetail {
    fn from(err: AnalysisError) -> Self {
        ErrorDetail::from(&err)
    }
}
