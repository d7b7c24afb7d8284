//! Builds transport-independent request descriptors.
//!
//! The builder is a pure function of (target, feedback). It never reads the
//! credential store; the credential is attached by whoever executes the
//! descriptor.

use serde::Serialize;
use serde_json::{json, Value};

use crate::constants::{endpoints, limits::MAX_FEEDBACK_CHARS};
use crate::domain::{AnalysisTarget, AnalysisTargetKind};
use crate::error::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// Idempotent, safe to retry
    Fetch,
    /// Carries user feedback
    Regenerate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    pub mode: RequestMode,
    pub method: HttpMethod,
    /// Unencoded path segments; the executor encodes them
    pub path_segments: Vec<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub target: AnalysisTarget,
    pub feedback: Option<String>,
}

impl RequestDescriptor {
    pub fn kind(&self) -> AnalysisTargetKind {
        self.target.kind()
    }

    /// Display form of the path, e.g. `/api/analyze/event/12-10-fomc`
    pub fn path(&self) -> String {
        format!("/{}", self.path_segments.join("/"))
    }
}

pub struct RequestBuilder;

impl RequestBuilder {
    /// Fetch descriptor when `feedback` is `None`, regenerate descriptor
    /// otherwise. Blank or oversized feedback is rejected here, before any
    /// network call.
    pub fn build(
        target: &AnalysisTarget,
        feedback: Option<&str>,
    ) -> Result<RequestDescriptor, ValidationError> {
        match feedback {
            None => Ok(Self::fetch(target)),
            Some(raw) => Self::regenerate(target, raw),
        }
    }

    /// Addressed by `(kind, id)` only
    pub fn fetch(target: &AnalysisTarget) -> RequestDescriptor {
        RequestDescriptor {
            mode: RequestMode::Fetch,
            method: HttpMethod::Get,
            path_segments: Self::target_segments(target),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: None,
            target: target.clone(),
            feedback: None,
        }
    }

    pub fn regenerate(
        target: &AnalysisTarget,
        feedback: &str,
    ) -> Result<RequestDescriptor, ValidationError> {
        let feedback = validate_feedback(feedback)?;

        let mut path_segments = Self::target_segments(target);
        path_segments.push(endpoints::REGENERATE_SUFFIX.to_string());

        Ok(RequestDescriptor {
            mode: RequestMode::Regenerate,
            method: HttpMethod::Post,
            path_segments,
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: Some(json!({ "feedback": feedback })),
            target: target.clone(),
            feedback: Some(feedback),
        })
    }

    fn target_segments(target: &AnalysisTarget) -> Vec<String> {
        endpoints::ANALYZE_PREFIX
            .iter()
            .map(|s| s.to_string())
            .chain([target.kind().as_str().to_string(), target.id().to_string()])
            .collect()
    }
}

/// Trim and bound-check feedback text
pub fn validate_feedback(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyFeedback);
    }
    let len = trimmed.chars().count();
    if len > MAX_FEEDBACK_CHARS {
        return Err(ValidationError::FeedbackTooLong {
            len,
            max: MAX_FEEDBACK_CHARS,
        });
    }
    Ok(trimmed.to_string())
}
