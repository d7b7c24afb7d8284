//! Per-item analysis state machine.
//!
//! `AnalysisSession::apply` is total over (state, event) and side-effect
//! free: it returns the request to issue, if any, and leaves execution to
//! the engine.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::credential::Credential;
use crate::domain::{AnalysisResult, AnalysisTarget};
use crate::error::{AnalysisError, ErrorDetail, ValidationError};
use crate::request::{RequestBuilder, RequestDescriptor};

/// Monotonic per-session request counter
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Pending {
        token: RequestToken,
        feedback: Option<String>,
    },
    Succeeded {
        result: AnalysisResult,
        feedback: Option<String>,
        completed_at: DateTime<Utc>,
    },
    Failed {
        error: ErrorDetail,
    },
}

impl SessionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Pending { .. })
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            SessionState::Succeeded { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorDetail> {
        match self {
            SessionState::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Pending { .. } => "pending",
            SessionState::Succeeded { .. } => "succeeded",
            SessionState::Failed { .. } => "failed",
        }
    }
}

#[derive(Clone, Debug)]
pub enum SessionEvent {
    RequestAnalysis,
    ResponseArrived {
        token: RequestToken,
        result: AnalysisResult,
    },
    ResponseFailed {
        token: RequestToken,
        error: AnalysisError,
    },
    SubmitFeedback(String),
    Reset,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::RequestAnalysis => "RequestAnalysis",
            SessionEvent::ResponseArrived { .. } => "ResponseArrived",
            SessionEvent::ResponseFailed { .. } => "ResponseFailed",
            SessionEvent::SubmitFeedback(_) => "SubmitFeedback",
            SessionEvent::Reset => "Reset",
        }
    }
}

/// A request the engine must execute on behalf of the session
#[derive(Clone, Debug)]
pub struct IssuedRequest {
    pub token: RequestToken,
    pub descriptor: RequestDescriptor,
    pub credential: Credential,
}

#[derive(Clone, Debug, Default)]
pub struct Transition {
    pub changed: bool,
    pub issue: Option<IssuedRequest>,
}

impl Transition {
    fn unchanged() -> Self {
        Self::default()
    }

    fn changed() -> Self {
        Self {
            changed: true,
            issue: None,
        }
    }

    fn issue(request: IssuedRequest) -> Self {
        Self {
            changed: true,
            issue: Some(request),
        }
    }
}

#[derive(Debug)]
pub struct AnalysisSession {
    target: AnalysisTarget,
    state: SessionState,
    last_token: u64,
}

impl AnalysisSession {
    pub fn new(target: AnalysisTarget) -> Self {
        Self {
            target,
            state: SessionState::Idle,
            last_token: 0,
        }
    }

    pub fn target(&self) -> &AnalysisTarget {
        &self.target
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Token of the request currently in flight
    pub fn pending_token(&self) -> Option<RequestToken> {
        match &self.state {
            SessionState::Pending { token, .. } => Some(*token),
            _ => None,
        }
    }

    /// Apply one event. `credential` is the store's value at the time the
    /// event is processed; it is captured into any request issued.
    ///
    /// Only blank or oversized feedback on a completed session is an
    /// error, and it leaves the state untouched.
    pub fn apply(
        &mut self,
        event: SessionEvent,
        credential: Option<Credential>,
    ) -> Result<Transition, ValidationError> {
        match (&self.state, event) {
            (_, SessionEvent::Reset) => {
                let changed = !matches!(self.state, SessionState::Idle);
                self.state = SessionState::Idle;
                Ok(Transition {
                    changed,
                    issue: None,
                })
            }

            (SessionState::Idle | SessionState::Failed { .. }, SessionEvent::RequestAnalysis) => {
                let descriptor = RequestBuilder::fetch(&self.target);
                Ok(self.issue_or_fail(descriptor, credential))
            }

            (SessionState::Succeeded { .. }, SessionEvent::RequestAnalysis) => {
                debug!("🧠 [SESSION] {} already analysed, keeping cached result", self.target);
                Ok(Transition::unchanged())
            }

            (SessionState::Succeeded { .. }, SessionEvent::SubmitFeedback(text)) => {
                let descriptor = RequestBuilder::regenerate(&self.target, &text)?;
                Ok(self.issue_or_fail(descriptor, credential))
            }

            (
                SessionState::Pending { token, feedback },
                SessionEvent::ResponseArrived {
                    token: reply,
                    result,
                },
            ) if *token == reply => {
                self.state = SessionState::Succeeded {
                    result,
                    feedback: feedback.clone(),
                    completed_at: Utc::now(),
                };
                Ok(Transition::changed())
            }

            (
                SessionState::Pending { token, .. },
                SessionEvent::ResponseFailed {
                    token: reply,
                    error,
                },
            ) if *token == reply => {
                self.state = SessionState::Failed {
                    error: ErrorDetail::from(&error),
                };
                Ok(Transition::changed())
            }

            (
                _,
                SessionEvent::ResponseArrived { token, .. }
                | SessionEvent::ResponseFailed { token, .. },
            ) => {
                debug!("🧠 [SESSION] Discarding stale reply {} for {}", token, self.target);
                Ok(Transition::unchanged())
            }

            (SessionState::Pending { token, .. }, event) => {
                debug!(
                    "🧠 [SESSION] {} ignored for {}: request {} in flight",
                    event.name(),
                    self.target,
                    token
                );
                Ok(Transition::unchanged())
            }

            (state, SessionEvent::SubmitFeedback(_)) => {
                debug!(
                    "🧠 [SESSION] Feedback ignored for {} in state {}",
                    self.target,
                    state.label()
                );
                Ok(Transition::unchanged())
            }
        }
    }

    fn issue_or_fail(
        &mut self,
        descriptor: RequestDescriptor,
        credential: Option<Credential>,
    ) -> Transition {
        let Some(credential) = credential else {
            self.state = SessionState::Failed {
                error: ErrorDetail::from(&AnalysisError::MissingCredential),
            };
            return Transition::changed();
        };

        self.last_token += 1;
        let token = RequestToken(self.last_token);
        self.state = SessionState::Pending {
            token,
            feedback: descriptor.feedback.clone(),
        };
        Transition::issue(IssuedRequest {
            token,
            descriptor,
            credential,
        })
    }
}
