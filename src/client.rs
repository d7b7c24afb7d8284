//! Client of the remote analysis service.
//!
//! Maps transport and HTTP outcomes onto `AnalysisError` and parses both
//! supported result shapes. Performs no retries; retry is a user decision
//! made at the session layer.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::constants::{endpoints::API_KEY_HEADER, messages};
use crate::credential::Credential;
use crate::domain::{AnalysisResult, AnalysisTargetKind};
use crate::error::{AnalysisError, ValidationError};
use crate::request::{RequestDescriptor, RequestMode};
use crate::transport::{Transport, TransportRequest, TransportResponse};

pub type AnalysisOutcome = Result<AnalysisResult, AnalysisError>;

/// Something that can turn a descriptor into an analysis
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        credential: Option<&Credential>,
    ) -> AnalysisOutcome;
}

#[derive(Deserialize)]
struct AnalysisEnvelope {
    analysis: Value,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    detail: String,
}

#[derive(Clone)]
pub struct AnalysisClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
}

impl AnalysisClient {
    pub fn new(transport: Arc<dyn Transport>, base_url: Url) -> Self {
        Self {
            transport,
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn fetch(
        &self,
        descriptor: &RequestDescriptor,
        credential: Option<&Credential>,
    ) -> AnalysisOutcome {
        self.send(descriptor, credential).await
    }

    /// Same contract as `fetch`; the descriptor already carries the feedback.
    pub async fn regenerate(
        &self,
        descriptor: &RequestDescriptor,
        credential: Option<&Credential>,
    ) -> AnalysisOutcome {
        if descriptor.mode != RequestMode::Regenerate {
            return Err(ValidationError::MissingFeedback.into());
        }
        self.send(descriptor, credential).await
    }

    async fn send(
        &self,
        descriptor: &RequestDescriptor,
        credential: Option<&Credential>,
    ) -> AnalysisOutcome {
        let Some(credential) = credential else {
            warn!("📡 [CLIENT] No credential for {}, request not sent", descriptor.target);
            return Err(AnalysisError::MissingCredential);
        };

        let url = self.endpoint(descriptor)?;
        let mut headers = descriptor.headers.clone();
        headers.push((API_KEY_HEADER.to_string(), credential.expose().to_string()));

        info!(
            "📡 [CLIENT] {} {} ({:?})",
            descriptor.method.as_str(),
            descriptor.path(),
            descriptor.mode
        );

        let response = self
            .transport
            .send(TransportRequest {
                method: descriptor.method,
                url,
                headers,
                body: descriptor.body.clone(),
            })
            .await
            .map_err(|e| {
                warn!("📡 [CLIENT] Transport failed for {}: {}", descriptor.target, e);
                AnalysisError::from(e)
            })?;

        interpret_response(descriptor.kind(), response)
    }

    fn endpoint(&self, descriptor: &RequestDescriptor) -> Result<Url, AnalysisError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AnalysisError::ServiceUnavailable {
                    status: None,
                    message: format!("base URL {} cannot carry a path", self.base_url),
                }
            })?;
            segments.pop_if_empty();
            segments.extend(descriptor.path_segments.iter().map(String::as_str));
        }
        Ok(url)
    }
}

/// Map a reply onto the result taxonomy: 2xx parses, 408 and 5xx are
/// retryable outages, everything else is an explicit rejection.
pub fn interpret_response(kind: AnalysisTargetKind, response: TransportResponse) -> AnalysisOutcome {
    let status = response.status;

    if response.is_success() {
        let envelope: AnalysisEnvelope = serde_json::from_str(&response.body)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
        return AnalysisResult::from_value(kind, envelope.analysis)
            .map_err(AnalysisError::MalformedResponse);
    }

    let detail = serde_json::from_str::<ErrorEnvelope>(&response.body)
        .ok()
        .map(|e| e.detail);

    warn!("📡 [CLIENT] HTTP {} for {} analysis: {:?}", status, kind, detail);

    Err(status_error(status, detail))
}

/// Status table shared by every HTTP backend. A missing detail falls back
/// to the generic service-unavailable text.
pub fn status_error(status: u16, detail: Option<String>) -> AnalysisError {
    let message = detail
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| messages::SERVICE_UNAVAILABLE.to_string());

    if status == 408 || status >= 500 {
        AnalysisError::ServiceUnavailable {
            status: Some(status),
            message,
        }
    } else {
        AnalysisError::RequestRejected { status, message }
    }
}

#[async_trait]
impl AnalysisBackend for AnalysisClient {
    fn name(&self) -> &'static str {
        "service"
    }

    async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        credential: Option<&Credential>,
    ) -> AnalysisOutcome {
        match descriptor.mode {
            RequestMode::Fetch => self.fetch(descriptor, credential).await,
            RequestMode::Regenerate => self.regenerate(descriptor, credential).await,
        }
    }
}
